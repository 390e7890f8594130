//! Process-wide interrupt flag.
//!
//! Ctrl-C must stop the run promptly but never tear a file: the handler only
//! raises a flag, and the evaluation loops poll it at safe points.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use thiserror::Error;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Marker error carried through the call stack when the user interrupted the
/// run. `main` recognizes it by downcast and exits cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted")]
pub struct Interrupted;

/// Install the Ctrl-C handler. Call once at startup.
pub fn install() -> Result<()> {
    ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst))
        .context("install interrupt handler")?;
    Ok(())
}

pub fn requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
