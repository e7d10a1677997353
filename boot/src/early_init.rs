//! Ordered bring-up sequence.
//!
//! The entry assembly hands over the bootloader registers and this runs the
//! whole initialisation in one fixed order: console first so everything
//! later can log, then the vector table, then the interrupt controller,
//! then the tick source, and only then `sti`.

#[cfg(target_arch = "x86")]
use mica_drivers::{debug, pic, pit, vga};
#[cfg(target_arch = "x86")]
use mica_lib::{cpu, klog, klog_info, klog_warn};

#[cfg(target_arch = "x86")]
use crate::idt;
#[cfg(target_arch = "x86")]
use crate::multiboot::{self, MULTIBOOT_BOOTLOADER_MAGIC, MultibootInfo};

#[cfg(target_arch = "x86")]
fn banner() {
    use mica_drivers::vga::{ColorCode, DEFAULT_COLOR, VgaColor};

    vga::clear();
    vga::set_color(ColorCode::new(VgaColor::LightGreen, VgaColor::Black));
    vga::write_str("micaOS\n======\n\n");
    vga::set_color(DEFAULT_COLOR);
}

/// Kernel entry, called from `multiboot_entry.s` with the bootloader's
/// EAX/EBX values.
#[cfg(target_arch = "x86")]
#[unsafe(no_mangle)]
pub extern "C" fn kernel_main(magic: u32, info: *const MultibootInfo) -> ! {
    klog::klog_init();
    debug::debug_init();
    klog_info!("Debug console initialized");

    if magic != MULTIBOOT_BOOTLOADER_MAGIC {
        panic!("invalid bootloader magic 0x{:x}", magic);
    }
    // SAFETY: the magic checked out, so EBX carried a multiboot info
    // structure that the bootloader keeps mapped.
    let boot_info = multiboot::record(unsafe { &*info });
    klog_info!("Multiboot magic verified");

    banner();
    if boot_info.has_memory_info {
        klog_info!(
            "Memory: {} KB lower, {} KB upper",
            boot_info.mem_lower_kb,
            boot_info.mem_upper_kb
        );
    } else {
        klog_warn!("Memory information not available");
    }

    idt::idt_init();
    idt::idt_load();
    pic::pic_init();
    pit::pit_init();
    cpu::enable_interrupts();
    klog_info!("Interrupts enabled");
    klog_info!("System ready");

    loop {
        cpu::halt();
    }
}
