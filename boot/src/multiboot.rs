//! Multiboot boot protocol (GRUB).
//!
//! The header static is emitted into its own `.multiboot` section and the
//! linker script keeps it within the first 8 KiB of the image, where the
//! bootloader scans for it. The info structure arrives by pointer in EBX;
//! boot verifies the magic, snapshots the interesting fields once, and
//! later consumers read the snapshot.

use bitflags::bitflags;
use spin::Once;

/// Magic the header carries so the bootloader recognises the kernel.
pub const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;

/// Magic a compliant bootloader leaves in EAX when it enters the kernel.
pub const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

/// Header request bits: page-align modules, provide memory information.
pub const MULTIBOOT_HEADER_FLAGS: u32 = 0x0000_0003;

#[repr(C)]
pub struct MultibootHeader {
    pub magic: u32,
    pub flags: u32,
    pub checksum: u32,
}

/// magic + flags + checksum must sum to zero (mod 2^32).
#[used]
#[unsafe(link_section = ".multiboot")]
pub static MULTIBOOT_HEADER: MultibootHeader = MultibootHeader {
    magic: MULTIBOOT_HEADER_MAGIC,
    flags: MULTIBOOT_HEADER_FLAGS,
    checksum: 0u32
        .wrapping_sub(MULTIBOOT_HEADER_MAGIC)
        .wrapping_sub(MULTIBOOT_HEADER_FLAGS),
};

bitflags! {
    /// Which `MultibootInfo` fields the bootloader filled in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InfoFlags: u32 {
        const MEMORY = 1 << 0;
        const BOOT_DEVICE = 1 << 1;
        const CMDLINE = 1 << 2;
        const MODULES = 1 << 3;
        const MEMORY_MAP = 1 << 6;
        const BOOT_LOADER_NAME = 1 << 9;
    }
}

/// The information structure the bootloader hands over in EBX.
#[repr(C)]
pub struct MultibootInfo {
    pub flags: u32,
    pub mem_lower: u32,
    pub mem_upper: u32,
    pub boot_device: u32,
    pub cmdline: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    pub syms: [u32; 4],
    pub mmap_length: u32,
    pub mmap_addr: u32,
    pub drives_length: u32,
    pub drives_addr: u32,
    pub config_table: u32,
    pub boot_loader_name: u32,
    pub apm_table: u32,
    pub vbe_control_info: u32,
    pub vbe_mode_info: u32,
    pub vbe_mode: u16,
    pub vbe_interface_seg: u16,
    pub vbe_interface_off: u16,
    pub vbe_interface_len: u16,
}

static_assertions::const_assert_eq!(core::mem::size_of::<MultibootInfo>(), 88);

impl MultibootInfo {
    /// All-zero structure, mostly useful for tests.
    pub const fn empty() -> Self {
        Self {
            flags: 0,
            mem_lower: 0,
            mem_upper: 0,
            boot_device: 0,
            cmdline: 0,
            mods_count: 0,
            mods_addr: 0,
            syms: [0; 4],
            mmap_length: 0,
            mmap_addr: 0,
            drives_length: 0,
            drives_addr: 0,
            config_table: 0,
            boot_loader_name: 0,
            apm_table: 0,
            vbe_control_info: 0,
            vbe_mode_info: 0,
            vbe_mode: 0,
            vbe_interface_seg: 0,
            vbe_interface_off: 0,
            vbe_interface_len: 0,
        }
    }

    pub fn info_flags(&self) -> InfoFlags {
        InfoFlags::from_bits_truncate(self.flags)
    }

    /// (lower, upper) memory sizes in KiB, if the bootloader provided them.
    pub fn memory_kb(&self) -> Option<(u32, u32)> {
        if self.info_flags().contains(InfoFlags::MEMORY) {
            Some((self.mem_lower, self.mem_upper))
        } else {
            None
        }
    }
}

/// What boot captured from the bootloader, for later consumers.
#[derive(Clone, Copy, Debug)]
pub struct BootInfo {
    pub mem_lower_kb: u32,
    pub mem_upper_kb: u32,
    pub has_memory_info: bool,
}

static BOOT_INFO: Once<BootInfo> = Once::new();

pub fn snapshot(info: &MultibootInfo) -> BootInfo {
    match info.memory_kb() {
        Some((lower, upper)) => BootInfo {
            mem_lower_kb: lower,
            mem_upper_kb: upper,
            has_memory_info: true,
        },
        None => BootInfo {
            mem_lower_kb: 0,
            mem_upper_kb: 0,
            has_memory_info: false,
        },
    }
}

/// Record the bootloader-provided info. The first caller wins; there is
/// exactly one in the boot sequence.
pub fn record(info: &MultibootInfo) -> &'static BootInfo {
    BOOT_INFO.call_once(|| snapshot(info))
}

pub fn boot_info() -> Option<&'static BootInfo> {
    BOOT_INFO.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_checksum_sums_to_zero() {
        let sum = MULTIBOOT_HEADER
            .magic
            .wrapping_add(MULTIBOOT_HEADER.flags)
            .wrapping_add(MULTIBOOT_HEADER.checksum);
        assert_eq!(sum, 0);
        assert_eq!(MULTIBOOT_HEADER.magic, 0x1BAD_B002);
    }

    #[test]
    fn memory_info_requires_the_flag_bit() {
        let mut info = MultibootInfo::empty();
        info.mem_lower = 640;
        info.mem_upper = 31744;
        assert_eq!(info.memory_kb(), None);

        info.flags = InfoFlags::MEMORY.bits();
        assert_eq!(info.memory_kb(), Some((640, 31744)));
    }

    #[test]
    fn unknown_flag_bits_are_dropped() {
        let mut info = MultibootInfo::empty();
        info.flags = 0xFFFF_FFFF;
        assert!(info.info_flags().contains(InfoFlags::MEMORY_MAP));
        assert_eq!(info.info_flags().bits() & 0xFFFF_FC00, 0);
    }

    #[test]
    fn record_is_first_caller_wins() {
        let mut info = MultibootInfo::empty();
        info.flags = InfoFlags::MEMORY.bits();
        info.mem_lower = 640;
        info.mem_upper = 65536;

        let recorded = record(&info);
        assert!(recorded.has_memory_info);
        assert_eq!(recorded.mem_upper_kb, 65536);

        let other = MultibootInfo::empty();
        let second = record(&other);
        assert!(second.has_memory_info, "snapshot must not be replaced");
        assert!(boot_info().is_some());
    }
}
