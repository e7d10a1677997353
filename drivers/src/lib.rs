#![cfg_attr(not(test), no_std)]
#![allow(unsafe_op_in_unsafe_fn)]

pub mod debug;
pub mod irq;
pub mod pic;
pub mod pit;
pub mod serial;
pub mod vga;
