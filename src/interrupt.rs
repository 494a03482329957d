use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use anyhow::{Context, Result};
use log::debug;
use thiserror::Error;

/// Returned by long-running loops once an interrupt has been requested.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("interrupted by user")]
pub struct Interrupted;

/// Shared cancellation flag checked between units of work.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag that is raised when the process receives Ctrl-C.
    ///
    /// The signal is awaited on a dedicated thread running a single-threaded
    /// tokio runtime; the work itself stays synchronous.
    pub fn listen_for_ctrl_c() -> Result<Self> {
        let interrupt = Self::new();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Building signal runtime")?;
        let handle = interrupt.clone();
        thread::Builder::new()
            .name("ctrl-c".to_string())
            .spawn(move || {
                if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                    debug!("Ctrl-C received");
                    handle.trigger();
                }
            })
            .context("Spawning signal listener")?;
        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_triggered() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

/// True when `err` (or anything it wraps) is an [`Interrupted`].
pub fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Interrupted>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn clones_share_the_flag() {
        let interrupt = Interrupt::new();
        let observer = interrupt.clone();
        assert!(observer.check().is_ok());
        interrupt.trigger();
        assert!(observer.is_triggered());
        assert_eq!(observer.check(), Err(Interrupted));
    }

    #[test]
    fn interruption_is_detected_through_context() {
        let err = Err::<(), _>(Interrupted)
            .context("Loading row 12")
            .context("Adding file titles.tsv")
            .unwrap_err();
        assert!(is_interrupted(&err));
        assert!(!is_interrupted(&anyhow::anyhow!("constraint failed")));
    }
}
