//! Hardware interrupt dispatch for vectors 32-47.
//!
//! Routing is a fixed table by design: line 0 is the PIT tick, every other
//! line is reported and acknowledged. The trampoline hands us the vector;
//! we translate to the IRQ line, do the per-line work, and issue the EOI so
//! the controller re-arms. This path always returns; an IRQ is a
//! notification, never a fault.

use mica_lib::arch::idt::{IRQ_BASE_VECTOR, IRQ_LINES};
use mica_lib::io::{HwPortIo, PortIo};
use mica_lib::ports::PIT_IRQ_LINE;
use mica_lib::{klog_trace, klog_warn};

use crate::pic;
use crate::pit;

pub(crate) fn dispatch(io: &mut impl PortIo, vector: u32) {
    let Some(line) = vector.checked_sub(IRQ_BASE_VECTOR as u32) else {
        klog_warn!("IRQ: received exception vector {}", vector);
        return;
    };
    if line >= IRQ_LINES as u32 {
        klog_warn!("IRQ: spurious vector {}", vector);
        return;
    }
    let line = line as u8;

    klog_trace!("IRQ: line {}", line);

    if line == PIT_IRQ_LINE {
        pit::pit_tick();
    }

    pic::eoi(io, line);
}

/// Entry point from the IRQ trampolines.
pub fn irq_dispatch(vector: u32) {
    dispatch(&mut HwPortIo, vector);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testio::FakePortIo;
    use mica_lib::ports::{PIC_EOI, PIC1_COMMAND, PIC2_COMMAND};

    #[test]
    fn master_line_is_acknowledged_on_the_master_only() {
        let mut io = FakePortIo::new();
        dispatch(&mut io, 35);
        assert_eq!(io.writes, [(PIC1_COMMAND, PIC_EOI)]);
    }

    #[test]
    fn slave_line_is_acknowledged_slave_first() {
        let mut io = FakePortIo::new();
        dispatch(&mut io, 42);
        assert_eq!(io.writes, [(PIC2_COMMAND, PIC_EOI), (PIC1_COMMAND, PIC_EOI)]);
    }

    #[test]
    fn exception_vectors_are_not_acknowledged() {
        let mut io = FakePortIo::new();
        dispatch(&mut io, 13);
        assert!(io.writes.is_empty());
    }

    #[test]
    fn vectors_past_the_irq_window_are_ignored() {
        let mut io = FakePortIo::new();
        dispatch(&mut io, 48);
        dispatch(&mut io, 255);
        assert!(io.writes.is_empty());
    }
}
