use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// One engine invocation in the build → run → start → exec chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Build,
    Run,
    Start,
    Exec,
    Install,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Build,
        Step::Run,
        Step::Start,
        Step::Install,
        Step::Exec,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Build => "build",
            Step::Run => "run",
            Step::Start => "start",
            Step::Exec => "exec",
            Step::Install => "install",
        }
    }

    /// Steps that attach the caller's terminal (`-it`).
    pub fn is_interactive(self) -> bool {
        matches!(self, Step::Run | Step::Exec | Step::Install)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pass,
    Fail,
    /// Dry run: rendered, not executed.
    Skipped,
    /// An earlier step failed.
    NotRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: Step,
    pub command: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub log: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn tally(steps: &[StepResult]) -> Self {
        let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();
        Self {
            total: steps.len(),
            passed: count(StepStatus::Pass),
            failed: count(StepStatus::Fail),
            skipped: count(StepStatus::Skipped) + count(StepStatus::NotRun),
        }
    }
}

/// JSON-serializable record of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub image: String,
    pub container: String,
    pub dry_run: bool,
    pub steps: Vec<StepResult>,
    pub summary: Summary,
}

impl WorkflowReport {
    pub fn success(&self) -> bool {
        self.summary.failed == 0
    }

    /// Exit code of the first failed step, if it reported one.
    pub fn failed_exit_code(&self) -> Option<i32> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Fail)
            .and_then(|s| s.exit_code)
    }
}

/// Input to the workflow orchestrator.
#[derive(Debug, Clone)]
pub struct WorkflowInput {
    pub config: Config,
    pub project_dir: PathBuf,
    pub steps: Vec<Step>,
    pub dry_run: bool,
    /// Replaces the shell for the `exec` step.
    pub exec: Option<Vec<String>>,
    /// Where the captured output of the build step is written.
    pub build_log: Option<PathBuf>,
}

impl WorkflowInput {
    pub fn new(config: Config, project_dir: PathBuf, steps: Vec<Step>) -> Self {
        Self {
            config,
            project_dir,
            steps,
            dry_run: false,
            exec: None,
            build_log: None,
        }
    }
}

/// Events emitted by the workflow orchestrator.
#[derive(Debug)]
pub enum WorkflowEvent {
    StepStarted {
        step: Step,
        command: String,
        interactive: bool,
    },
    Log { step: Step, line: String },
    StepFinished { step: Step, status: StepStatus },
    Completed(WorkflowReport),
    Aborted(String),
}
