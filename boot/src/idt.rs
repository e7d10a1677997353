//! IDT construction, trampoline wiring and the exception dispatcher.
//!
//! The trampoline stubs live in `idt_handlers.s`; this module installs one
//! gate per stub, loads the table, and receives the dispatched vectors.
//! Exceptions are unconditionally fatal here: report, then halt. Extending
//! this to per-vector recovery would mean giving `exception_entry` a way to
//! return, which the current signature deliberately rules out.

use mica_lib::arch::exception::exception_name;
use mica_lib::arch::idt::EXCEPTION_VECTORS;
use mica_lib::klog_error;

#[cfg(target_arch = "x86")]
use core::arch::{asm, global_asm};
#[cfg(target_arch = "x86")]
use core::cell::UnsafeCell;
#[cfg(target_arch = "x86")]
use mica_lib::arch::idt::{IDT_GATE_INTERRUPT, IRQ_BASE_VECTOR, IdtTable, KERNEL_CODE_SELECTOR};
#[cfg(target_arch = "x86")]
use mica_lib::klog_debug;

#[cfg(target_arch = "x86")]
global_asm!(include_str!("../idt_handlers.s"));

/// Descriptor register image for `lidt`: 16-bit limit, 32-bit base.
#[cfg(target_arch = "x86")]
#[repr(C, packed)]
struct IdtPtr {
    limit: u16,
    base: u32,
}

#[cfg(target_arch = "x86")]
static_assertions::const_assert_eq!(core::mem::size_of::<IdtPtr>(), 6);

#[cfg(target_arch = "x86")]
unsafe extern "C" {
    fn isr0();
    fn isr1();
    fn isr2();
    fn isr3();
    fn isr4();
    fn isr5();
    fn isr6();
    fn isr7();
    fn isr8();
    fn isr9();
    fn isr10();
    fn isr11();
    fn isr12();
    fn isr13();
    fn isr14();
    fn isr15();
    fn isr16();
    fn isr17();
    fn isr18();
    fn isr19();
    fn isr20();
    fn isr21();
    fn isr22();
    fn isr23();
    fn isr24();
    fn isr25();
    fn isr26();
    fn isr27();
    fn isr28();
    fn isr29();
    fn isr30();
    fn isr31();

    fn irq0();
    fn irq1();
    fn irq2();
    fn irq3();
    fn irq4();
    fn irq5();
    fn irq6();
    fn irq7();
    fn irq8();
    fn irq9();
    fn irq10();
    fn irq11();
    fn irq12();
    fn irq13();
    fn irq14();
    fn irq15();
}

#[cfg(target_arch = "x86")]
struct IdtCell(UnsafeCell<IdtTable>);

// SAFETY: mutated only during single-threaded early boot with interrupts
// disabled; read-only for the CPU afterwards.
#[cfg(target_arch = "x86")]
unsafe impl Sync for IdtCell {}

#[cfg(target_arch = "x86")]
static IDT: IdtCell = IdtCell(UnsafeCell::new(IdtTable::new()));

#[cfg(target_arch = "x86")]
#[inline(always)]
fn handler_ptr(f: unsafe extern "C" fn()) -> u32 {
    f as *const () as u32
}

/// Zero all 256 slots, then install the 48 supported gates: exception
/// trampolines on vectors 0-31, IRQ trampolines on 32-47.
///
/// Must run with interrupts disabled, before [`idt_load`].
#[cfg(target_arch = "x86")]
pub fn idt_init() {
    const EXCEPTION_STUBS: [unsafe extern "C" fn(); 32] = [
        isr0, isr1, isr2, isr3, isr4, isr5, isr6, isr7, isr8, isr9, isr10, isr11, isr12, isr13,
        isr14, isr15, isr16, isr17, isr18, isr19, isr20, isr21, isr22, isr23, isr24, isr25, isr26,
        isr27, isr28, isr29, isr30, isr31,
    ];
    const IRQ_STUBS: [unsafe extern "C" fn(); 16] = [
        irq0, irq1, irq2, irq3, irq4, irq5, irq6, irq7, irq8, irq9, irq10, irq11, irq12, irq13,
        irq14, irq15,
    ];

    // SAFETY: single-threaded early boot; the CPU does not look at the
    // table until idt_load().
    let table = unsafe { &mut *IDT.0.get() };
    table.reset();

    for (vector, stub) in EXCEPTION_STUBS.iter().enumerate() {
        table.set_gate(
            vector as u8,
            handler_ptr(*stub),
            KERNEL_CODE_SELECTOR,
            IDT_GATE_INTERRUPT,
        );
    }
    for (line, stub) in IRQ_STUBS.iter().enumerate() {
        table.set_gate(
            IRQ_BASE_VECTOR + line as u8,
            handler_ptr(*stub),
            KERNEL_CODE_SELECTOR,
            IDT_GATE_INTERRUPT,
        );
    }

    klog_debug!(
        "IDT: {} gates installed",
        EXCEPTION_STUBS.len() + IRQ_STUBS.len()
    );
}

/// Make the table authoritative. Call after [`idt_init`], before `sti`.
#[cfg(target_arch = "x86")]
pub fn idt_load() {
    let pointer = IdtPtr {
        limit: IdtTable::byte_limit(),
        base: IDT.0.get() as u32,
    };
    // SAFETY: the table is fully populated and has static lifetime; the
    // register image only needs to live across the instruction.
    unsafe {
        let idtr = &raw const pointer;
        asm!("lidt [{}]", in(reg) idtr, options(readonly, nostack, preserves_flags));
    }
    klog_debug!(
        "IDT: loaded base=0x{:x} limit=0x{:x}",
        IDT.0.get() as u32,
        IdtTable::byte_limit()
    );
}

/// Report a dispatched fault: named for the exception range, raw otherwise.
pub fn fault_report(vector: u32) {
    if vector < EXCEPTION_VECTORS as u32 {
        klog_error!("EXCEPTION: {} ({})", exception_name(vector as u8), vector);
    } else {
        klog_error!("EXCEPTION: unknown vector {}", vector);
    }
}

/// Exception dispatcher, called from the `isr*` trampolines with the
/// vector number on the stack.
#[cfg(target_arch = "x86")]
#[unsafe(no_mangle)]
extern "C" fn exception_entry(vector: u32) -> ! {
    fault_report(vector);
    crate::shutdown::halt();
}

/// IRQ dispatcher entry, called from the `irq*` trampolines. Unlike
/// exceptions this path returns and the interrupted code resumes.
#[cfg(target_arch = "x86")]
#[unsafe(no_mangle)]
extern "C" fn irq_entry(vector: u32) {
    mica_drivers::irq::irq_dispatch(vector);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt;
    use mica_lib::arch::idt::pushes_error_code;
    use mica_lib::klog::{KlogLevel, klog_register_backend};
    use std::string::String;
    use std::sync::Mutex;
    use std::vec::Vec;

    const HANDLERS_ASM: &str = include_str!("../idt_handlers.s");

    fn macro_body(name: &str) -> &'static str {
        let start = HANDLERS_ASM
            .find(&format!(".macro {name}"))
            .unwrap_or_else(|| panic!("macro {name} not defined"));
        let rest = &HANDLERS_ASM[start..];
        let end = rest.find(".endm").expect("unterminated macro");
        &rest[..end]
    }

    fn count_pops(body: &str) -> usize {
        body.lines()
            .filter(|line| line.trim() == "add esp, 4")
            .count()
    }

    #[test]
    fn stub_families_match_the_error_code_metadata() {
        let mut noerr: Vec<u8> = Vec::new();
        let mut err: Vec<u8> = Vec::new();
        let mut irqs: Vec<(u8, u8)> = Vec::new();

        for line in HANDLERS_ASM.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("isr_noerr ") {
                noerr.push(rest.trim().parse().unwrap());
            } else if let Some(rest) = line.strip_prefix("isr_err ") {
                err.push(rest.trim().parse().unwrap());
            } else if let Some(rest) = line.strip_prefix("irq_stub ") {
                let (line_no, vector) = rest.split_once(',').unwrap();
                irqs.push((
                    line_no.trim().parse().unwrap(),
                    vector.trim().parse().unwrap(),
                ));
            }
        }

        assert_eq!(noerr.len() + err.len(), 32, "one stub per exception vector");
        for vector in 0..32u8 {
            assert_eq!(
                err.contains(&vector),
                pushes_error_code(vector),
                "vector {vector} in the wrong stub family"
            );
            assert!(noerr.contains(&vector) != err.contains(&vector));
        }

        assert_eq!(irqs.len(), 16);
        for (line_no, vector) in irqs {
            assert_eq!(vector, 32 + line_no, "IRQ {line_no} remapped wrong");
            assert!(!pushes_error_code(vector));
        }
    }

    // The error-code stub must unwind exactly one more word than the
    // others before iretd: the vector argument plus the CPU-pushed error
    // code. Getting this wrong corrupts the interrupted EIP.
    #[test]
    fn error_code_stub_pops_exactly_one_extra_word() {
        assert_eq!(count_pops(macro_body("isr_noerr")), 1);
        assert_eq!(count_pops(macro_body("isr_err")), 2);
        assert_eq!(count_pops(macro_body("irq_stub")), 1);
    }

    static CAPTURED: Mutex<String> = Mutex::new(String::new());

    fn capture_backend(level: KlogLevel, args: fmt::Arguments<'_>) {
        let mut buf = CAPTURED.lock().unwrap();
        buf.push_str(&format!("[{}] {}\n", level.label(), args));
    }

    #[test]
    fn general_protection_fault_is_reported_by_name_and_number() {
        klog_register_backend(capture_backend);
        fault_report(13);
        fault_report(200);

        let captured = CAPTURED.lock().unwrap().clone();
        assert!(captured.contains("General Protection Fault"));
        assert!(captured.contains("(13)"));
        assert!(captured.contains("unknown vector 200"));
    }
}
