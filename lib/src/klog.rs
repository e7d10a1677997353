//! Kernel logging subsystem.
//!
//! All kernel log output funnels through a single **backend** function
//! pointer. During early boot (before the console driver is ready) the
//! backend writes directly to COM1 via raw port I/O. Once the debug console
//! initialises it registers itself as the backend and lines start reaching
//! the screen as well.
//!
//! # Backend contract
//!
//! The backend receives the level and the pre-formatted arguments for a
//! **single log line** and is responsible for:
//!
//! 1. Writing the level tag and text atomically (no interleaving with
//!    interrupt-context output).
//! 2. Appending a trailing newline after the text.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// Log levels
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KlogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl KlogLevel {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => KlogLevel::Error,
            1 => KlogLevel::Warn,
            2 => KlogLevel::Info,
            3 => KlogLevel::Debug,
            _ => KlogLevel::Trace,
        }
    }

    /// Tag printed in front of the line, as in `[INFO] message`.
    pub fn label(self) -> &'static str {
        match self {
            KlogLevel::Error => "ERROR",
            KlogLevel::Warn => "WARN",
            KlogLevel::Info => "INFO",
            KlogLevel::Debug => "DEBUG",
            KlogLevel::Trace => "TRACE",
        }
    }
}

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(KlogLevel::Info as u8);

#[inline(always)]
fn is_enabled(level: KlogLevel) -> bool {
    level as u8 <= CURRENT_LEVEL.load(Ordering::Relaxed)
}

// ---------------------------------------------------------------------------
// Backend dispatch
// ---------------------------------------------------------------------------

/// Signature of a klog backend.
///
/// The backend must write the level tag, the formatted text **and** a
/// trailing newline under a single lock acquisition (if applicable).
pub type KlogBackend = fn(KlogLevel, fmt::Arguments<'_>);

/// Stored as a raw pointer; `null` means "use early-boot fallback".
static BACKEND: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

fn early_backend(level: KlogLevel, args: fmt::Arguments<'_>) {
    #[cfg(target_arch = "x86")]
    {
        use crate::ports::{COM1, serial_write_bytes};

        struct EarlyWriter;

        impl fmt::Write for EarlyWriter {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                unsafe { serial_write_bytes(COM1, s.as_bytes()) };
                Ok(())
            }
        }

        let _ = fmt::write(&mut EarlyWriter, format_args!("[{}] {}\n", level.label(), args));
    }
    #[cfg(not(target_arch = "x86"))]
    {
        let _ = (level, args);
    }
}

/// Dispatch a log line through the active backend.
///
/// If no backend has been registered yet the early-boot fallback is used.
#[inline]
fn dispatch(level: KlogLevel, args: fmt::Arguments<'_>) {
    let ptr = BACKEND.load(Ordering::Acquire);
    if ptr.is_null() {
        early_backend(level, args);
    } else {
        // SAFETY: `klog_register_backend` only stores valid `KlogBackend` fn
        // pointers, which are the same size as `*mut ()` on all supported
        // targets.
        let backend: KlogBackend = unsafe { core::mem::transmute(ptr) };
        backend(level, args);
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Register a backend that replaces the early-boot COM1 fallback.
///
/// Called once by the debug console during its initialisation.
pub fn klog_register_backend(backend: KlogBackend) {
    BACKEND.store(backend as *mut (), Ordering::Release);
}

/// Initialise klog (sets default level). Called very early in boot.
pub fn klog_init() {
    CURRENT_LEVEL.store(KlogLevel::Info as u8, Ordering::Relaxed);
}

pub fn klog_set_level(level: KlogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn klog_get_level() -> KlogLevel {
    KlogLevel::from_raw(CURRENT_LEVEL.load(Ordering::Relaxed))
}

pub fn klog_is_enabled(level: KlogLevel) -> bool {
    is_enabled(level)
}

/// Emit a formatted log line at the given level.
///
/// The backend appends the trailing newline — callers should **not**
/// include one in their format string.
pub fn log_args(level: KlogLevel, args: fmt::Arguments<'_>) {
    if !is_enabled(level) {
        return;
    }
    dispatch(level, args);
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::klog::log_args($level, ::core::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Error, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Warn, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Info, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Debug, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_trace {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Trace, ::core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;
    use std::sync::Mutex;

    static CAPTURED: Mutex<String> = Mutex::new(String::new());

    fn capture_backend(level: KlogLevel, args: fmt::Arguments<'_>) {
        let mut buf = CAPTURED.lock().unwrap();
        buf.push_str(&format!("[{}] {}\n", level.label(), args));
    }

    // Backend and level live in process-wide statics, so exercise the whole
    // surface from one test to keep the harness order-independent.
    #[test]
    fn level_filter_and_backend_dispatch() {
        klog_register_backend(capture_backend);
        klog_set_level(KlogLevel::Info);

        klog_info!("hello {}", 42);
        klog_debug!("filtered out");
        klog_error!("broken: {:#x}", 0xDEADu32);

        let captured = CAPTURED.lock().unwrap().clone();
        assert!(captured.contains("[INFO] hello 42\n"));
        assert!(!captured.contains("filtered out"));
        assert!(captured.contains("[ERROR] broken: 0xdead\n"));

        assert_eq!(klog_get_level(), KlogLevel::Info);
        assert!(klog_is_enabled(KlogLevel::Warn));
        assert!(!klog_is_enabled(KlogLevel::Trace));
    }
}
