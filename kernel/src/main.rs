#![cfg_attr(target_arch = "x86", no_std)]
#![cfg_attr(target_arch = "x86", no_main)]

// Multiboot entry trampoline: stack setup, then into mica_boot's
// kernel_main with the bootloader registers.
#[cfg(target_arch = "x86")]
core::arch::global_asm!(include_str!("../../boot/multiboot_entry.s"));

// Keep the multiboot header (and with it the boot crate) in the final
// image; the linker script pins its placement.
#[used]
static MULTIBOOT_HEADER_LINK: &mica_boot::multiboot::MultibootHeader =
    &mica_boot::multiboot::MULTIBOOT_HEADER;

#[cfg(target_arch = "x86")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    mica_boot::panic_handler_impl(info)
}

// The image has no hosted entry point; building for the build machine only
// type-checks the crate graph.
#[cfg(not(target_arch = "x86"))]
fn main() {}
