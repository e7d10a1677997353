//! VGA text mode driver.
//!
//! The 80x25 text buffer lives at physical 0xB8000, two bytes per cell:
//! character, then a colour attribute (foreground | background << 4).
//! Cursor handling matches the original bring-up behaviour: wrap back to
//! the top row on overflow rather than scrolling.

use core::fmt::{self, Write};

use mica_lib::IrqMutex;

pub const VGA_WIDTH: usize = 80;
pub const VGA_HEIGHT: usize = 25;

#[cfg(target_arch = "x86")]
const VGA_MEMORY: usize = 0xB8000;

/// The 16 VGA text palette entries.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VgaColor {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGrey = 7,
    DarkGrey = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    LightMagenta = 13,
    Yellow = 14,
    White = 15,
}

/// A foreground/background attribute byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorCode(u8);

impl ColorCode {
    pub const fn new(foreground: VgaColor, background: VgaColor) -> Self {
        Self((foreground as u8) | ((background as u8) << 4))
    }

    pub const fn attribute(self) -> u8 {
        self.0
    }
}

pub const DEFAULT_COLOR: ColorCode = ColorCode::new(VgaColor::LightGrey, VgaColor::Black);

pub struct VgaWriter {
    row: usize,
    col: usize,
    color: ColorCode,
}

impl VgaWriter {
    const fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            color: DEFAULT_COLOR,
        }
    }

    pub fn color(&self) -> ColorCode {
        self.color
    }

    pub fn set_color(&mut self, color: ColorCode) {
        self.color = color;
    }

    fn write_cell(&self, index: usize, byte: u8) {
        #[cfg(target_arch = "x86")]
        {
            let cell = (byte as u16) | ((self.color.attribute() as u16) << 8);
            // SAFETY: index is bounded by the 80x25 geometry and the text
            // buffer is identity-mapped at boot.
            unsafe {
                let buffer = VGA_MEMORY as *mut u16;
                core::ptr::write_volatile(buffer.add(index), cell);
            }
        }
        #[cfg(not(target_arch = "x86"))]
        {
            let _ = (index, byte);
        }
    }

    /// Blank the screen with the current colour and home the cursor.
    pub fn clear(&mut self) {
        for index in 0..VGA_WIDTH * VGA_HEIGHT {
            self.write_cell(index, b' ');
        }
        self.row = 0;
        self.col = 0;
    }

    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.col = 0;
                self.row += 1;
                if self.row >= VGA_HEIGHT {
                    self.row = 0;
                }
            }
            b'\r' => {
                self.col = 0;
            }
            _ => {
                if self.col >= VGA_WIDTH {
                    self.col = 0;
                    self.row += 1;
                    if self.row >= VGA_HEIGHT {
                        self.row = 0;
                    }
                }
                self.write_cell(self.row * VGA_WIDTH + self.col, byte);
                self.col += 1;
            }
        }
    }
}

impl Write for VgaWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

static VGA: IrqMutex<VgaWriter> = IrqMutex::new(VgaWriter::new());

/// Exclusive access to the screen writer, for the console backend.
pub fn writer() -> mica_lib::IrqMutexGuard<'static, VgaWriter> {
    VGA.lock()
}

pub fn clear() {
    VGA.lock().clear();
}

pub fn set_color(color: ColorCode) {
    VGA.lock().set_color(color);
}

pub fn write_str(s: &str) {
    let _ = VGA.lock().write_str(s);
}

pub fn print_args(args: fmt::Arguments<'_>) {
    let _ = VGA.lock().write_fmt(args);
}
