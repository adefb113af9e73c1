use std::sync::mpsc::{self, Receiver, Sender};

use crate::engine::{self, CommandResult, EngineCommand, OutputLine};

use super::commands::step_command;
use super::types::{
    Step, StepResult, StepStatus, Summary, WorkflowEvent, WorkflowInput, WorkflowReport,
};

/// Launch the workflow on a background thread.
///
/// Steps run strictly in order and the first failure stops the chain; the
/// remaining steps are reported as not run. The final event is always either
/// `Completed`, or `Aborted` when a step's command cannot be assembled.
pub fn run_workflow(input: WorkflowInput) -> Receiver<WorkflowEvent> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        run_inner(input, tx);
    });
    rx
}

fn run_inner(input: WorkflowInput, tx: Sender<WorkflowEvent>) {
    let cfg = &input.config;
    let mut results: Vec<StepResult> = Vec::with_capacity(input.steps.len());
    let mut failed = false;

    for &step in &input.steps {
        let cmd = match step_command(step, cfg, &input.project_dir, input.exec.as_deref()) {
            Ok(mut cmd) => {
                if step == Step::Build {
                    cmd.log_path.clone_from(&input.build_log);
                }
                cmd
            }
            Err(e) => {
                let _ = tx.send(WorkflowEvent::Aborted(format!("{step}: {e:#}")));
                return;
            }
        };
        let command = cmd.render();

        if failed {
            results.push(StepResult {
                step,
                command,
                status: StepStatus::NotRun,
                exit_code: None,
                log: String::new(),
            });
            continue;
        }

        let _ = tx.send(WorkflowEvent::StepStarted {
            step,
            command: command.clone(),
            interactive: cmd.interactive,
        });

        if input.dry_run {
            let _ = tx.send(WorkflowEvent::StepFinished {
                step,
                status: StepStatus::Skipped,
            });
            results.push(StepResult {
                step,
                command,
                status: StepStatus::Skipped,
                exit_code: None,
                log: String::new(),
            });
            continue;
        }

        tracing::info!(%step, %command, "running step");
        let outcome = if cmd.interactive {
            engine::run_interactive(&cmd).unwrap_or_else(|e| CommandResult {
                log: format!("Failed to run {}: {e:#}", cmd.program),
                ..CommandResult::default()
            })
        } else {
            run_streamed(cmd, step, &tx)
        };

        let status = if outcome.success {
            StepStatus::Pass
        } else {
            failed = true;
            if outcome.timed_out {
                tracing::warn!(%step, "step timed out");
            }
            StepStatus::Fail
        };
        tracing::info!(%step, ?status, exit_code = ?outcome.exit_code, "step finished");

        let _ = tx.send(WorkflowEvent::StepFinished { step, status });
        results.push(StepResult {
            step,
            command,
            status,
            exit_code: outcome.exit_code,
            log: outcome.log,
        });
    }

    let report = WorkflowReport {
        image: cfg.image.clone(),
        container: cfg.container.clone(),
        dry_run: input.dry_run,
        summary: Summary::tally(&results),
        steps: results,
    };

    let _ = tx.send(WorkflowEvent::Completed(report));
}

/// Run a non-interactive step, forwarding its output as `WorkflowEvent::Log`.
fn run_streamed(cmd: EngineCommand, step: Step, tx: &Sender<WorkflowEvent>) -> CommandResult {
    let program = cmd.program.clone();
    let output = match engine::spawn(cmd) {
        Ok(rx) => rx,
        Err(e) => {
            return CommandResult {
                log: format!("Failed to spawn {program}: {e:#}"),
                ..CommandResult::default()
            };
        }
    };

    for line in output {
        match line {
            OutputLine::Stdout(line) | OutputLine::Stderr(line) => {
                let _ = tx.send(WorkflowEvent::Log { step, line });
            }
            OutputLine::Done(result) => return result,
        }
    }

    CommandResult {
        log: format!("{program} exited without reporting a result"),
        ..CommandResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    #[cfg(unix)]
    use std::path::Path;

    fn collect(rx: Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
        rx.into_iter().collect()
    }

    fn completed(events: &[WorkflowEvent]) -> &WorkflowReport {
        match events.last() {
            Some(WorkflowEvent::Completed(report)) => report,
            other => panic!("expected Completed, got: {other:?}"),
        }
    }

    #[test]
    fn dry_run_renders_every_step_without_executing() {
        let input = WorkflowInput {
            dry_run: true,
            ..WorkflowInput::new(
                Config {
                    engine: "ctrflow-no-such-engine".into(),
                    ..Config::default()
                },
                "/tmp".into(),
                vec![Step::Build, Step::Run, Step::Start, Step::Exec],
            )
        };

        let events = collect(run_workflow(input));
        let report = completed(&events);
        assert!(report.dry_run);
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.skipped, 4);
        assert!(report.success());
        assert!(report.steps[0].command.starts_with("ctrflow-no-such-engine build"));

        let started = events
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::StepStarted { .. }))
            .count();
        assert_eq!(started, 4);
    }

    #[test]
    fn missing_install_command_aborts() {
        let input = WorkflowInput {
            dry_run: true,
            ..WorkflowInput::new(
                Config {
                    install: None,
                    ..Config::default()
                },
                "/tmp".into(),
                vec![Step::Install],
            )
        };
        let events = collect(run_workflow(input));
        assert!(matches!(
            events.last(),
            Some(WorkflowEvent::Aborted(msg)) if msg.starts_with("install")
        ));
    }

    // `sh <step> ...` runs a script named after the engine subcommand from
    // the project dir, standing in for a real engine.
    #[cfg(unix)]
    fn fake_engine_project(dir: &Path, start_exit: i32) -> Config {
        std::fs::write(dir.join("build"), "echo \"building $2\"\n").unwrap();
        std::fs::write(dir.join("start"), format!("echo starting\nexit {start_exit}\n")).unwrap();
        std::fs::write(dir.join("exec"), "exit 0\n").unwrap();
        Config {
            engine: "sh".into(),
            ..Config::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn failing_step_stops_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = fake_engine_project(dir.path(), 4);
        let input = WorkflowInput::new(
            cfg,
            dir.path().to_path_buf(),
            vec![Step::Build, Step::Start, Step::Exec],
        );

        let events = collect(run_workflow(input));
        let report = completed(&events);

        assert_eq!(report.steps[0].status, StepStatus::Pass);
        assert_eq!(report.steps[0].log, "building test_trans:0.1\n");
        assert_eq!(report.steps[1].status, StepStatus::Fail);
        assert_eq!(report.steps[1].exit_code, Some(4));
        assert_eq!(report.steps[2].status, StepStatus::NotRun);
        assert_eq!(report.failed_exit_code(), Some(4));
        assert_eq!(
            report.summary,
            Summary {
                total: 3,
                passed: 1,
                failed: 1,
                skipped: 1
            }
        );

        let logs: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WorkflowEvent::Log { step, line } => Some((*step, line.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            logs,
            [(Step::Build, "building test_trans:0.1"), (Step::Start, "starting")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn successful_chain_passes_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = fake_engine_project(dir.path(), 0);
        let log_path = dir.path().join("build.log");
        let input = WorkflowInput {
            build_log: Some(log_path.clone()),
            ..WorkflowInput::new(
                cfg,
                dir.path().to_path_buf(),
                vec![Step::Build, Step::Start, Step::Exec],
            )
        };

        let events = collect(run_workflow(input));
        let report = completed(&events);
        assert!(report.success());
        assert_eq!(report.summary.passed, 3);
        assert_eq!(
            std::fs::read_to_string(log_path).unwrap(),
            "building test_trans:0.1\n"
        );
    }
}
