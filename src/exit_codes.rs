//! Stable exit codes for the runbook CLI.

/// Run completed. An interrupted run also counts: stopping on Ctrl-C is the
/// requested behavior, not a failure.
pub const OK: i32 = 0;
/// At least one file could not be processed (unreadable, malformed, or an
/// evaluation infrastructure fault), or setup failed.
pub const FAILURE: i32 = 1;
