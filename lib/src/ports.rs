use crate::io::Port;

pub const COM1: Port<u8> = Port::new(0x3F8);
pub const COM2: Port<u8> = Port::new(0x2F8);

// 8259 programmable interrupt controllers (master + cascaded slave).
// Raw port numbers: the PIC driver goes through the `PortIo` seam.
pub const PIC1_COMMAND: u16 = 0x20;
pub const PIC1_DATA: u16 = 0x21;
pub const PIC2_COMMAND: u16 = 0xA0;
pub const PIC2_DATA: u16 = 0xA1;

pub const PIC_ICW1_INIT: u8 = 0x10;
pub const PIC_ICW1_ICW4: u8 = 0x01;
pub const PIC_ICW3_CASCADE_MASTER: u8 = 0x04;
pub const PIC_ICW3_CASCADE_SLAVE: u8 = 0x02;
pub const PIC_ICW4_8086: u8 = 0x01;
pub const PIC_EOI: u8 = 0x20;

/// Vector the master PIC delivers IRQ 0 on after the remap.
pub const PIC1_VECTOR_OFFSET: u8 = 32;
/// Vector the slave PIC delivers IRQ 8 on after the remap.
pub const PIC2_VECTOR_OFFSET: u8 = 40;

// 8254 programmable interval timer. Channel 0 drives IRQ 0.
pub const PIT_CHANNEL0: u16 = 0x40;
pub const PIT_COMMAND: u16 = 0x43;

pub const PIT_BASE_FREQUENCY_HZ: u32 = 1_193_182;
pub const PIT_DEFAULT_FREQUENCY_HZ: u32 = 100;
pub const PIT_COMMAND_CHANNEL0: u8 = 0x00;
pub const PIT_COMMAND_ACCESS_LOHI: u8 = 0x30;
pub const PIT_COMMAND_MODE_SQUARE: u8 = 0x06;
pub const PIT_COMMAND_BINARY: u8 = 0x00;
pub const PIT_IRQ_LINE: u8 = 0;

// 8250/16550 UART register bank, as offsets from the port base.
pub const UART_REG_THR: u16 = 0;
pub const UART_REG_IER: u16 = 1;
pub const UART_REG_FCR: u16 = 2;
pub const UART_REG_LCR: u16 = 3;
pub const UART_REG_MCR: u16 = 4;
pub const UART_REG_LSR: u16 = 5;
pub const UART_REG_DLL: u16 = 0;
pub const UART_REG_DLM: u16 = 1;

pub const UART_LCR_DLAB: u8 = 0x80;
pub const UART_LCR_8N1: u8 = 0x03;
pub const UART_FCR_ENABLE_FIFO: u8 = 0x01;
pub const UART_FCR_CLEAR_RX: u8 = 0x02;
pub const UART_FCR_CLEAR_TX: u8 = 0x04;
pub const UART_FCR_14_BYTE_THRESHOLD: u8 = 0xC0;
pub const UART_LSR_TX_EMPTY: u8 = 0x20;
pub const UART_MCR_DTR: u8 = 0x01;
pub const UART_MCR_RTS: u8 = 0x02;
pub const UART_MCR_AUX2: u8 = 0x08;

/// Divisor latch value for 38400 baud (115200 / 3).
pub const UART_BAUD_DIVISOR: u16 = 3;

// ---------------------------------------------------------------------------
// Low-level serial I/O primitives
// ---------------------------------------------------------------------------
//
// Single source of truth for putting bytes on a UART. The early-boot klog
// fallback and the serial driver both funnel through here. Intentionally
// lock-free: callers are responsible for serialisation.

/// Write one byte to a UART, polling the Line Status Register until the
/// transmit holding register is empty.
///
/// # Safety
///
/// Port I/O. Caller must ensure `base` refers to a valid, initialised
/// 8250/16550-compatible UART and that concurrent access is serialised.
#[inline(always)]
pub unsafe fn serial_putc(base: Port<u8>, byte: u8) {
    let lsr = base.offset(UART_REG_LSR);
    let thr = base.offset(UART_REG_THR);
    unsafe {
        while (lsr.read() & UART_LSR_TX_EMPTY) == 0 {
            core::hint::spin_loop();
        }
        thr.write(byte);
    }
}

/// Write a byte slice to a UART, converting lone `\n` into `\r\n`.
///
/// # Safety
///
/// Same requirements as [`serial_putc`].
#[inline]
pub unsafe fn serial_write_bytes(base: Port<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == b'\n' {
            unsafe { serial_putc(base, b'\r') };
        }
        unsafe { serial_putc(base, b) };
    }
}
