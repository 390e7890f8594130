//! Helpers for running child processes with deadlines and captured output.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::interrupt;

/// How often the wait and drain loops wake up to check the deadline and the
/// interrupt flag.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
    pub interrupted: bool,
}

/// Run a command with a wall-clock deadline, feeding `stdin` and capturing
/// stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs, and stdin is written
/// from its own thread: a command that never reads its input must not wedge
/// the wait loop, and a command that exits early turns the write into an
/// EPIPE, which is not an error here.
///
/// The child becomes its own process-group leader, and on deadline or
/// interrupt the whole group is killed, so descendants spawned by the command
/// die with it. The same deadline bounds the drain after the child exits:
/// descendants that keep the pipes open past it are killed too, instead of
/// holding up the run for as long as they live.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs()))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<CommandOutput> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdin_handle = match stdin {
        Some(input) => {
            let mut child_stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("stdin was not piped"))?;
            let input = input.to_vec();
            Some(thread::spawn(move || {
                let _ = child_stdin.write_all(&input);
            }))
        }
        None => None,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream(stdout));
    let stderr_handle = thread::spawn(move || read_stream(stderr));

    let deadline = Instant::now() + timeout;
    let mut timed_out = false;
    let mut interrupted = false;
    let status = loop {
        let slice = deadline.saturating_duration_since(Instant::now()).min(WAIT_SLICE);
        if let Some(status) = child.wait_timeout(slice).context("wait for command")? {
            break status;
        }
        if interrupt::requested() {
            debug!("interrupt requested, killing process group");
            interrupted = true;
            kill_group(&mut child)?;
            break child.wait().context("wait command after kill")?;
        }
        if Instant::now() >= deadline {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing process group"
            );
            timed_out = true;
            kill_group(&mut child)?;
            break child.wait().context("wait command after kill")?;
        }
    };

    // The pipes stay open while any descendant of the child still holds
    // them, and the joins below block until they close. Unless the group was
    // already killed, keep draining under the same deadline and interrupt
    // policy as the wait.
    while !timed_out
        && !interrupted
        && !(stdout_handle.is_finished()
            && stderr_handle.is_finished()
            && stdin_handle.as_ref().is_none_or(|h| h.is_finished()))
    {
        if interrupt::requested() {
            debug!("interrupt requested, killing lingering descendants");
            interrupted = true;
            kill_group(&mut child)?;
        } else if Instant::now() >= deadline {
            warn!("command left descendants holding its pipes, killing the group");
            timed_out = true;
            kill_group(&mut child)?;
        } else {
            thread::sleep(deadline.saturating_duration_since(Instant::now()).min(WAIT_SLICE));
        }
    }

    if let Some(handle) = stdin_handle {
        let _ = handle.join();
    }
    let stdout = join_output(stdout_handle).context("join stdout")?;
    let stderr = join_output(stderr_handle).context("join stderr")?;

    debug!(exit_code = ?status.code(), timed_out, interrupted, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        timed_out,
        interrupted,
    })
}

/// Kill the child's whole process group. The child was spawned as its own
/// group leader, so its pid doubles as the group id. A plain `Child::kill`
/// would leave grandchildren running after a timeout.
#[cfg(unix)]
fn kill_group(child: &mut Child) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        // ESRCH: the group is already gone, nothing left to kill.
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(anyhow!("kill process group: {e}")),
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> Result<()> {
    match child.kill() {
        Ok(()) => Ok(()),
        // The child was already reaped; there is no group to signal here.
        Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e).context("kill command"),
    }
}

fn join_output(handle: thread::JoinHandle<Result<Vec<u8>>>) -> Result<Vec<u8>> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).context("read output")?;
    Ok(buf)
}
