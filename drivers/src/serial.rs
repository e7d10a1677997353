//! COM1 serial driver.
//!
//! Polled transmit only; the UART never raises an interrupt in this
//! design. Output funnels through an `IrqMutex` so lines from normal and
//! interrupt context cannot interleave.

use core::fmt::{self, Write};

use mica_lib::IrqMutex;
use mica_lib::io::Port;
use mica_lib::ports::{
    COM1, UART_BAUD_DIVISOR, UART_FCR_14_BYTE_THRESHOLD as FCR_14_BYTE_THRESHOLD,
    UART_FCR_CLEAR_RX as FCR_CLEAR_RX, UART_FCR_CLEAR_TX as FCR_CLEAR_TX,
    UART_FCR_ENABLE_FIFO as FCR_ENABLE_FIFO, UART_LCR_8N1 as LCR_8N1, UART_LCR_DLAB as LCR_DLAB,
    UART_MCR_AUX2 as MCR_AUX2, UART_MCR_DTR as MCR_DTR, UART_MCR_RTS as MCR_RTS,
    UART_REG_DLL as REG_DLL, UART_REG_DLM as REG_DLM, UART_REG_FCR as REG_FCR,
    UART_REG_IER as REG_IER, UART_REG_LCR as REG_LCR, UART_REG_MCR as REG_MCR, serial_putc,
};

static SERIAL: IrqMutex<SerialPort> = IrqMutex::new(SerialPort::new(COM1));

pub struct SerialPort {
    base: Port<u8>,
}

impl SerialPort {
    pub const fn new(base: Port<u8>) -> Self {
        Self { base }
    }

    /// Program the UART: no interrupts, 38400 baud, 8N1, FIFOs on.
    ///
    /// # Safety
    ///
    /// Port I/O against the UART register bank.
    unsafe fn init(&mut self) {
        unsafe {
            self.base.offset(REG_IER).write(0x00);
            self.base.offset(REG_LCR).write(LCR_DLAB);
            self.base.offset(REG_DLL).write((UART_BAUD_DIVISOR & 0xFF) as u8);
            self.base.offset(REG_DLM).write((UART_BAUD_DIVISOR >> 8) as u8);
            self.base.offset(REG_LCR).write(LCR_8N1);
            self.base
                .offset(REG_FCR)
                .write(FCR_ENABLE_FIFO | FCR_CLEAR_RX | FCR_CLEAR_TX | FCR_14_BYTE_THRESHOLD);
            self.base.offset(REG_MCR).write(MCR_DTR | MCR_RTS | MCR_AUX2);
        }
    }

    /// Transmit one byte, expanding `\n` to `\r\n`.
    pub fn write_byte(&mut self, byte: u8) {
        // SAFETY: the port was initialised by `init` and the caller holds
        // the SERIAL lock.
        unsafe {
            if byte == b'\n' {
                serial_putc(self.base, b'\r');
            }
            serial_putc(self.base, byte);
        }
    }
}

impl Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// Initialise COM1.
pub fn init() {
    let mut port = SERIAL.lock();
    // SAFETY: single-threaded early boot, lock held.
    unsafe { port.init() }
}

/// Exclusive access to the serial writer, for the console backend.
pub fn writer() -> mica_lib::IrqMutexGuard<'static, SerialPort> {
    SERIAL.lock()
}

pub fn write_str(s: &str) {
    let _ = SERIAL.lock().write_str(s);
}

pub fn print_args(args: fmt::Arguments<'_>) {
    let _ = SERIAL.lock().write_fmt(args);
}
