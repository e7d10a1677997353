//! Panic reporting.

use core::panic::PanicInfo;

use mica_lib::klog_error;

/// Behind the kernel binary's `#[panic_handler]`: report and halt.
pub fn panic_handler_impl(info: &PanicInfo) -> ! {
    klog_error!("PANIC: {}", info);
    crate::shutdown::halt()
}
