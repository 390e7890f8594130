//! Evaluating a single code block against the shell.

use std::process::{Command, ExitStatus};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::block::{CodeBlock, OutputBlock};
use crate::io::interrupt::Interrupted;
use crate::io::process::run_command_with_timeout;

/// Run a block's command with its body on stdin and record the result.
///
/// The command line goes to `sh -c` verbatim. Captured stdout becomes the
/// block's new output annotation, replacing any previous one wholesale.
/// Command failures of every kind end up in the recorded exit code rather
/// than in `Err`; a command the shell cannot resolve records 127 like any
/// other shell failure. Only infrastructure faults (spawn, pipes) and a user
/// interrupt abort the run.
#[instrument(skip_all, fields(command = block.command()))]
pub fn evaluate_block(block: &mut CodeBlock, timeout: Duration) -> Result<i32> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(block.command());

    let output = run_command_with_timeout(cmd, Some(block.input().as_bytes()), timeout)?;
    if output.interrupted {
        return Err(Interrupted.into());
    }
    if !output.stderr.is_empty() {
        debug!(
            stderr = %String::from_utf8_lossy(&output.stderr),
            "command wrote to stderr"
        );
    }

    let exit_code = exit_code_of(output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    block.set_output(OutputBlock::from_captured(exit_code, &stdout));
    debug!(exit_code, timed_out = output.timed_out, "recorded block output");
    Ok(exit_code)
}

/// The integer recorded in the annotation. Signal deaths map to the shell
/// convention `128 + signal`, so a deadline kill records 137.
#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::core::block::Block;
    use crate::core::document::Document;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn first_code_block(text: &str) -> CodeBlock {
        let doc = Document::parse(text).expect("parse");
        doc.blocks()
            .iter()
            .find_map(|block| match block {
                Block::Code(code) => Some(code.clone()),
                _ => None,
            })
            .expect("no code block in fixture")
    }

    #[test]
    fn silent_success_records_a_bare_annotation() {
        let mut block = first_code_block("```true\n```\n");
        let code = evaluate_block(&mut block, TIMEOUT).expect("evaluate");
        assert_eq!(code, 0);
        assert_eq!(
            block.output().expect("output").to_string(),
            "::: {.output exit_code=\"0\"}\n:::\n"
        );
    }

    #[test]
    fn exit_code_is_recorded_verbatim() {
        let mut block = first_code_block("```exit 7\n```\n");
        assert_eq!(evaluate_block(&mut block, TIMEOUT).expect("evaluate"), 7);
        assert_eq!(block.exit_code(), Some(7));
    }

    #[test]
    fn stdout_is_captured_and_indented() {
        let mut block = first_code_block("```echo hi\n```\n");
        evaluate_block(&mut block, TIMEOUT).expect("evaluate");
        assert_eq!(
            block.output().expect("output").to_string(),
            "::: {.output exit_code=\"0\"}\n    hi\n:::\n"
        );
    }

    #[test]
    fn body_is_fed_as_stdin() {
        let mut block = first_code_block("```cat\nalpha\nbeta\n```\n");
        evaluate_block(&mut block, TIMEOUT).expect("evaluate");
        // The body has no trailing newline, so one is appended on capture.
        assert_eq!(block.output().expect("output").captured(), "alpha\nbeta\n");
    }

    #[test]
    fn stderr_never_lands_in_the_annotation() {
        let mut block = first_code_block("```echo visible; echo hidden >&2\n```\n");
        evaluate_block(&mut block, TIMEOUT).expect("evaluate");
        let captured = block.output().expect("output").captured();
        assert_eq!(captured, "visible\n");
    }

    #[test]
    fn unresolvable_command_records_127() {
        let mut block = first_code_block("```definitely-not-a-real-program-xyz\n```\n");
        let code = evaluate_block(&mut block, TIMEOUT).expect("evaluate");
        assert_eq!(code, 127);
    }

    #[test]
    fn reevaluation_replaces_the_previous_output() {
        let recorded = "```echo hi\n```\n::: {.output exit_code=\"9\"}\n    stale\n:::\n";
        let mut block = first_code_block(recorded);
        evaluate_block(&mut block, TIMEOUT).expect("evaluate");
        assert_eq!(block.exit_code(), Some(0));
        assert_eq!(
            block.to_string(),
            "```echo hi\n```\n::: {.output exit_code=\"0\"}\n    hi\n:::\n"
        );
    }

    #[test]
    fn timed_out_block_records_a_kill_exit_code() {
        let mut block = first_code_block("```sleep 30\n```\n");
        let started = Instant::now();
        let code = evaluate_block(&mut block, Duration::from_millis(200)).expect("evaluate");
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_ne!(code, 0);
        if cfg!(unix) {
            assert_eq!(code, 137);
        }
    }
}
