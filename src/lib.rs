//! Literate-notebook processor: plain-text documents whose fenced code
//! blocks are runnable shell commands.
//!
//! A notebook interleaves prose with fenced regions whose info string is a
//! command line; the fenced body is the command's stdin. runbook parses the
//! text, evaluates the blocks a strategy selects, and records each result in
//! a `::: {.output exit_code="N"}` annotation directly after the closing
//! fence, rewriting the file in place (with a `.orig` backup). The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (block model, parser, selection
//!   strategies). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (process execution, file
//!   backup/rewrite, interrupt handling).
//!
//! The orchestration module ([`run`]) coordinates core logic with I/O to
//! implement the CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
