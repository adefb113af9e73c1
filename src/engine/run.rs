use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

use super::types::{CommandResult, EngineCommand, OutputLine};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn base_command(cmd: &EngineCommand) -> Command {
    let mut command = Command::new(&cmd.program);
    command.args(&cmd.args);
    if let Some(dir) = &cmd.cwd {
        command.current_dir(dir);
    }
    command
}

/// Spawn a non-interactive engine command and return a channel that streams
/// its output.
///
/// The caller receives [`OutputLine::Stdout`]/[`OutputLine::Stderr`] as they
/// arrive, followed by exactly one [`OutputLine::Done`] carrying the result.
pub fn spawn(cmd: EngineCommand) -> Result<Receiver<OutputLine>> {
    tracing::debug!(command = %cmd, "spawning");
    let mut child = base_command(&cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn `{}`", cmd.program))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("child stderr was not captured"))?;

    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        supervise(child, stdout, stderr, tx, cmd.timeout, cmd.log_path);
    });

    Ok(rx)
}

/// Run an engine command attached to the caller's terminal (`-it` steps).
///
/// Blocks until the command exits. Output is not captured.
pub fn run_interactive(cmd: &EngineCommand) -> Result<CommandResult> {
    tracing::debug!(command = %cmd, "running interactively");
    let status = base_command(cmd)
        .status()
        .with_context(|| format!("failed to run `{}`", cmd.program))?;
    Ok(CommandResult {
        success: status.success(),
        exit_code: status.code(),
        ..CommandResult::default()
    })
}

fn forward_lines<R, F>(
    source: R,
    buf: Arc<Mutex<String>>,
    tx: Sender<OutputLine>,
    wrap: F,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
    F: Fn(String) -> OutputLine + Send + 'static,
{
    std::thread::spawn(move || {
        for line in BufReader::new(source).lines() {
            let Ok(line) = line else { break };
            if let Ok(mut log) = buf.lock() {
                log.push_str(&line);
                log.push('\n');
            }
            // Receiver may be dropped; keep draining so the child never blocks.
            let _ = tx.send(wrap(line));
        }
    })
}

fn supervise(
    mut child: Child,
    stdout: std::process::ChildStdout,
    stderr: std::process::ChildStderr,
    tx: Sender<OutputLine>,
    timeout: Option<Duration>,
    log_path: Option<PathBuf>,
) {
    let log_buf = Arc::new(Mutex::new(String::new()));

    let stdout_handle = forward_lines(stdout, log_buf.clone(), tx.clone(), OutputLine::Stdout);
    let stderr_handle = forward_lines(stderr, log_buf.clone(), tx.clone(), OutputLine::Stderr);

    let start = Instant::now();
    let mut timed_out = false;

    let exit_status: Option<ExitStatus> = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(_) => break None,
        }

        if let Some(timeout) = timeout
            && start.elapsed() > timeout
        {
            timed_out = true;
            tracing::warn!(?timeout, "engine command timed out, killing it");
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    let _ = stdout_handle.join();
    let _ = stderr_handle.join();

    let exit_code = exit_status.and_then(|s| s.code());
    let log = log_buf.lock().map(|b| b.clone()).unwrap_or_default();

    if let Some(path) = log_path
        && let Err(e) = std::fs::write(&path, &log)
    {
        tracing::warn!(path = %path.display(), error = %e, "could not write command log");
    }

    let _ = tx.send(OutputLine::Done(CommandResult {
        success: exit_code == Some(0),
        exit_code,
        log,
        timed_out,
    }));
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> EngineCommand {
        EngineCommand::new("sh", vec!["-c".into(), script.into()])
    }

    fn drain(rx: Receiver<OutputLine>) -> (Vec<OutputLine>, CommandResult) {
        let mut lines = Vec::new();
        for line in rx {
            if let OutputLine::Done(result) = line {
                return (lines, result);
            }
            lines.push(line);
        }
        panic!("stream ended without Done");
    }

    #[test]
    fn spawn_streams_both_channels_then_done() {
        let rx = spawn(sh("echo out; echo err >&2")).unwrap();
        let (lines, result) = drain(rx);
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(lines.iter().any(|l| matches!(l, OutputLine::Stdout(s) if s == "out")));
        assert!(lines.iter().any(|l| matches!(l, OutputLine::Stderr(s) if s == "err")));
        assert!(result.log.contains("out\n"));
    }

    #[test]
    fn spawn_reports_failure_exit_code() {
        let rx = spawn(sh("exit 3")).unwrap();
        let (_, result) = drain(rx);
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
    }

    #[test]
    fn spawn_honours_timeout() {
        let mut cmd = sh("sleep 5");
        cmd.timeout = Some(Duration::from_millis(100));
        let (_, result) = drain(spawn(cmd).unwrap());
        assert!(result.timed_out);
        assert!(!result.success);
    }

    #[test]
    fn spawn_without_timeout_waits_for_exit() {
        let cmd = sh("sleep 1; echo late");
        assert_eq!(cmd.timeout, None);
        let (lines, result) = drain(spawn(cmd).unwrap());
        assert!(result.success);
        assert!(!result.timed_out);
        assert!(lines.iter().any(|l| matches!(l, OutputLine::Stdout(s) if s == "late")));
    }

    #[test]
    fn spawn_writes_log_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.log");
        let mut cmd = sh("echo logged");
        cmd.log_path = Some(path.clone());
        let _ = drain(spawn(cmd).unwrap());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "logged\n");
    }

    #[test]
    fn spawn_runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let mut cmd = sh("ls");
        cmd.cwd = Some(dir.path().to_path_buf());
        let (lines, _) = drain(spawn(cmd).unwrap());
        assert!(lines.iter().any(|l| matches!(l, OutputLine::Stdout(s) if s == "marker")));
    }

    #[test]
    fn run_interactive_returns_exit_code() {
        let result = run_interactive(&sh("exit 7")).unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(7));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let cmd = EngineCommand::new("ctrflow-no-such-engine", Vec::new());
        assert!(spawn(cmd.clone()).is_err());
        assert!(run_interactive(&cmd).is_err());
    }
}
