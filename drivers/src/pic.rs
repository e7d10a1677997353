//! Legacy 8259 PIC driver (master + cascaded slave).
//!
//! The remap moves hardware IRQ lines 0-15 off the CPU exception range and
//! onto vectors 32-47. Mask and EOI register protocols are written against
//! the `PortIo` seam so they can be exercised without the hardware.

use mica_lib::cpu;
use mica_lib::io::{HwPortIo, PortIo};
use mica_lib::ports::{
    PIC_EOI, PIC_ICW1_ICW4, PIC_ICW1_INIT, PIC_ICW3_CASCADE_MASTER, PIC_ICW3_CASCADE_SLAVE,
    PIC_ICW4_8086, PIC1_COMMAND, PIC1_DATA, PIC1_VECTOR_OFFSET, PIC2_COMMAND, PIC2_DATA,
    PIC2_VECTOR_OFFSET,
};
use mica_lib::klog_debug;

/// Run the 4-word initialisation handshake on both controllers.
///
/// The masks in force before the call are preserved across it, so a remap
/// never enables a line by accident.
fn remap(io: &mut impl PortIo) {
    let saved_master_mask = io.read8(PIC1_DATA);
    let saved_slave_mask = io.read8(PIC2_DATA);

    // ICW1: start initialisation, ICW4 will follow.
    io.write8(PIC1_COMMAND, PIC_ICW1_INIT | PIC_ICW1_ICW4);
    io.write8(PIC2_COMMAND, PIC_ICW1_INIT | PIC_ICW1_ICW4);

    // ICW2: vector offsets (IRQ 0-7 -> 32-39, IRQ 8-15 -> 40-47).
    io.write8(PIC1_DATA, PIC1_VECTOR_OFFSET);
    io.write8(PIC2_DATA, PIC2_VECTOR_OFFSET);

    // ICW3: slave sits on the master's line 2, and knows it is cascade id 2.
    io.write8(PIC1_DATA, PIC_ICW3_CASCADE_MASTER);
    io.write8(PIC2_DATA, PIC_ICW3_CASCADE_SLAVE);

    // ICW4: 8086/88 operating mode.
    io.write8(PIC1_DATA, PIC_ICW4_8086);
    io.write8(PIC2_DATA, PIC_ICW4_8086);

    io.write8(PIC1_DATA, saved_master_mask);
    io.write8(PIC2_DATA, saved_slave_mask);
}

/// Single-bit read-modify-write on the mask register owning `line`.
/// Bit set means the line is disabled. Idempotent.
fn set_line_masked(io: &mut impl PortIo, line: u8, masked: bool) {
    let (port, bit) = if line < 8 {
        (PIC1_DATA, line)
    } else {
        (PIC2_DATA, line - 8)
    };

    let mask = io.read8(port);
    let mask = if masked {
        mask | (1 << bit)
    } else {
        mask & !(1 << bit)
    };
    io.write8(port, mask);
}

/// Acknowledge an interrupt on `line`.
///
/// Slave-routed lines must acknowledge the slave controller first, then the
/// master that cascades it; the master alone otherwise. The cascade
/// protocol fixes this order.
pub(crate) fn eoi(io: &mut impl PortIo, line: u8) {
    if line >= 8 {
        io.write8(PIC2_COMMAND, PIC_EOI);
    }
    io.write8(PIC1_COMMAND, PIC_EOI);
}

/// Remap hardware IRQs to vectors 32-47, preserving the current masks.
///
/// Must run before interrupts are enabled; the handshake itself is guarded
/// by irqsave so a half-initialised controller is never observable.
pub fn pic_init() {
    let flags = cpu::save_flags_cli();
    remap(&mut HwPortIo);
    cpu::restore_flags(flags);
    klog_debug!(
        "PIC: remapped IRQ 0-15 to vectors {}-{}",
        PIC1_VECTOR_OFFSET,
        PIC2_VECTOR_OFFSET + 7
    );
}

/// Unmask one IRQ line.
pub fn pic_enable_irq(line: u8) {
    let flags = cpu::save_flags_cli();
    set_line_masked(&mut HwPortIo, line, false);
    cpu::restore_flags(flags);
}

/// Mask one IRQ line.
pub fn pic_disable_irq(line: u8) {
    let flags = cpu::save_flags_cli();
    set_line_masked(&mut HwPortIo, line, true);
    cpu::restore_flags(flags);
}

/// Acknowledge an interrupt on `line` (hardware path).
pub fn pic_send_eoi(line: u8) {
    eoi(&mut HwPortIo, line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testio::FakePortIo;

    #[test]
    fn remap_runs_the_documented_handshake() {
        let mut io = FakePortIo::new();
        remap(&mut io);
        assert_eq!(
            io.writes,
            [
                (PIC1_COMMAND, 0x11),
                (PIC2_COMMAND, 0x11),
                (PIC1_DATA, 32),
                (PIC2_DATA, 40),
                (PIC1_DATA, 0x04),
                (PIC2_DATA, 0x02),
                (PIC1_DATA, 0x01),
                (PIC2_DATA, 0x01),
                (PIC1_DATA, 0x00),
                (PIC2_DATA, 0x00),
            ]
        );
    }

    #[test]
    fn remap_preserves_preexisting_masks() {
        let mut io = FakePortIo::new()
            .preset(PIC1_DATA, 0xFF)
            .preset(PIC2_DATA, 0xFF);
        remap(&mut io);
        assert_eq!(io.reg(PIC1_DATA), 0xFF);
        assert_eq!(io.reg(PIC2_DATA), 0xFF);
    }

    #[test]
    fn enable_clears_exactly_one_master_bit() {
        let mut io = FakePortIo::new()
            .preset(PIC1_DATA, 0xFF)
            .preset(PIC2_DATA, 0xFF);
        set_line_masked(&mut io, 1, false);
        assert_eq!(io.reg(PIC1_DATA), 0xFD);
        assert_eq!(io.reg(PIC2_DATA), 0xFF);

        set_line_masked(&mut io, 1, true);
        assert_eq!(io.reg(PIC1_DATA), 0xFF);
        assert_eq!(io.reg(PIC2_DATA), 0xFF);
    }

    #[test]
    fn slave_lines_use_the_slave_mask_register() {
        let mut io = FakePortIo::new()
            .preset(PIC1_DATA, 0xFF)
            .preset(PIC2_DATA, 0xFF);
        set_line_masked(&mut io, 10, false);
        assert_eq!(io.reg(PIC1_DATA), 0xFF);
        assert_eq!(io.reg(PIC2_DATA), 0xFB);
    }

    #[test]
    fn masking_is_idempotent() {
        let mut io = FakePortIo::new().preset(PIC1_DATA, 0x00);
        set_line_masked(&mut io, 4, true);
        set_line_masked(&mut io, 4, true);
        assert_eq!(io.reg(PIC1_DATA), 0x10);
    }

    #[test]
    fn eoi_master_only_for_low_lines() {
        let mut io = FakePortIo::new();
        eoi(&mut io, 3);
        assert_eq!(io.writes, [(PIC1_COMMAND, PIC_EOI)]);
    }

    #[test]
    fn eoi_slave_then_master_for_high_lines() {
        let mut io = FakePortIo::new();
        eoi(&mut io, 10);
        assert_eq!(io.writes, [(PIC2_COMMAND, PIC_EOI), (PIC1_COMMAND, PIC_EOI)]);
    }
}
