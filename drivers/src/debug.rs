//! Debug console: the klog backend that mirrors kernel log lines to the
//! serial port and, for Info and above, to the screen with per-level
//! colours.

use core::fmt::{self, Write};

use mica_lib::klog::{KlogLevel, klog_register_backend};

use crate::serial;
use crate::vga::{self, ColorCode, VgaColor};

fn level_color(level: KlogLevel) -> ColorCode {
    match level {
        KlogLevel::Error => ColorCode::new(VgaColor::LightRed, VgaColor::Black),
        KlogLevel::Warn => ColorCode::new(VgaColor::Yellow, VgaColor::Black),
        _ => ColorCode::new(VgaColor::LightGrey, VgaColor::Black),
    }
}

fn console_backend(level: KlogLevel, args: fmt::Arguments<'_>) {
    {
        let mut port = serial::writer();
        let _ = write!(port, "[{}] ", level.label());
        let _ = port.write_fmt(args);
        let _ = port.write_str("\n");
    }

    // Debug/Trace stay serial-only; the screen is for the operator.
    if level as u8 <= KlogLevel::Info as u8 {
        let mut screen = vga::writer();
        let saved = screen.color();
        screen.set_color(level_color(level));
        let _ = write!(screen, "[{}] ", level.label());
        let _ = screen.write_fmt(args);
        let _ = screen.write_str("\n");
        screen.set_color(saved);
    }
}

/// Bring up the serial port and route klog through the dual console.
pub fn debug_init() {
    serial::init();
    klog_register_backend(console_backend);
}
