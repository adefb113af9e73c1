use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// One invocation of the container engine. `args` is the full argument list
/// after the program name; the workflow layer assembles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Kill a non-interactive run after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    pub log_path: Option<PathBuf>,
    /// Attach the caller's terminal instead of capturing output.
    pub interactive: bool,
}

impl EngineCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
            timeout: None,
            log_path: None,
            interactive: false,
        }
    }

    /// Shell-quoted command line, as a user would type it.
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_if_needed)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Leave words made of shell-inert characters bare; quote the rest.
fn quote_if_needed(word: &str) -> Cow<'_, str> {
    let inert = |c: char| c.is_ascii_alphanumeric() || "_./:=@%+,-".contains(c);
    if !word.is_empty() && word.chars().all(inert) {
        Cow::Borrowed(word)
    } else {
        shell_words::quote(word)
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Outcome of an engine invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Captured output; empty for interactive runs.
    pub log: String,
    pub timed_out: bool,
}

/// Streamed output from a non-interactive engine invocation.
#[derive(Debug)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
    Done(CommandResult),
}

/// `.State.Status` of a container as reported by `container inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Exited,
    Dead,
    Other(String),
}

impl ContainerState {
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "exited" | "stopped" => Self::Exited,
            "dead" => Self::Dead,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// True when `start` is the way to get a shell again.
    pub fn is_startable(&self) -> bool {
        matches!(self, Self::Created | Self::Exited)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Running => f.write_str("running"),
            Self::Paused => f.write_str("paused"),
            Self::Restarting => f.write_str("restarting"),
            Self::Exited => f.write_str("exited"),
            Self::Dead => f.write_str("dead"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_quotes_arguments_with_spaces() {
        let cmd = EngineCommand::new(
            "docker",
            ["exec", "-it", "c", "sh", "-c", "pip install ."]
                .map(String::from)
                .to_vec(),
        );
        assert_eq!(cmd.render(), "docker exec -it c sh -c 'pip install .'");
    }

    #[test]
    fn render_leaves_inert_words_bare() {
        let cmd = EngineCommand::new(
            "docker",
            ["run", "--ipc=host", "-p", "8896:8896", "-v", "/a/b:/c", "img:0.1", "", "a$b"]
                .map(String::from)
                .to_vec(),
        );
        assert_eq!(
            cmd.render(),
            "docker run --ipc=host -p 8896:8896 -v /a/b:/c img:0.1 '' 'a$b'"
        );
    }

    #[test]
    fn new_command_has_no_deadline() {
        assert_eq!(EngineCommand::new("docker", Vec::new()).timeout, None);
    }

    #[test]
    fn container_state_parses_engine_statuses() {
        assert_eq!(ContainerState::parse("running\n"), ContainerState::Running);
        assert_eq!(ContainerState::parse("Exited"), ContainerState::Exited);
        assert_eq!(
            ContainerState::parse("removing"),
            ContainerState::Other("removing".into())
        );
        assert!(ContainerState::Created.is_startable());
        assert!(!ContainerState::Paused.is_startable());
        assert!(ContainerState::Running.is_running());
    }
}
