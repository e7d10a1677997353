//! Exception metadata for x86.
//!
//! Exception names live here so both the boot-crate dispatcher and test
//! code can use them without touching any hardware path.

/// Human-readable name for a CPU exception vector.
///
/// Vectors 20-31 are reserved by the architecture and reported as such;
/// anything at or above 32 is not an exception at all.
pub fn exception_name(vector: u8) -> &'static str {
    match vector {
        0 => "Divide Error",
        1 => "Debug",
        2 => "Non-Maskable Interrupt",
        3 => "Breakpoint",
        4 => "Overflow",
        5 => "Bound Range Exceeded",
        6 => "Invalid Opcode",
        7 => "Device Not Available",
        8 => "Double Fault",
        9 => "Coprocessor Segment Overrun",
        10 => "Invalid TSS",
        11 => "Segment Not Present",
        12 => "Stack Segment Fault",
        13 => "General Protection Fault",
        14 => "Page Fault",
        15 => "Reserved",
        16 => "x87 FPU Error",
        17 => "Alignment Check",
        18 => "Machine Check",
        19 => "SIMD Floating-Point Exception",
        20..=31 => "Reserved",
        _ => "Unknown",
    }
}
