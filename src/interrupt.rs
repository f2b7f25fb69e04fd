//! Cooperative cancellation of orchestrator runs.
//!
//! SIGINT (Ctrl+C, via `ctrlc`) and SIGHUP (terminal hangup, via
//! `signal_hook`) both set one shared flag. Orchestrators check it before
//! starting each plugin and once more after the last one; a plugin already
//! running is allowed to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    interrupted: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register SIGINT and SIGHUP handlers that set this flag.
    ///
    /// Safe to call more than once; a second `ctrlc` registration is ignored.
    pub fn register_signal_handlers(&self) {
        let flag = self.interrupted.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .ok(); // Ignore if handler already set

        #[cfg(unix)]
        {
            use signal_hook::flag::register;
            let _ = register(libc::SIGHUP, self.interrupted.clone());
        }
    }

    /// Whether an interrupt was requested.
    pub fn is_set(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Request an interrupt, as a signal would.
    pub fn trigger(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}
