//! Fatal halt path.

use mica_drivers::vga::{self, ColorCode, VgaColor};
use mica_lib::cpu;
use mica_lib::klog_error;

/// Paint the halt banner, report, and park the CPU with interrupts
/// disabled. There is no recovery path by design.
pub fn halt() -> ! {
    vga::set_color(ColorCode::new(VgaColor::White, VgaColor::Red));
    klog_error!("System halted");
    cpu::halt_loop()
}
