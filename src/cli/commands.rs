use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use super::args::{Cli, Command, RmArgs, UpArgs};
use crate::config::{self, Config};
use crate::engine::{self, EngineCommand};
use crate::project;
use crate::validate::{self, Checks, ValidationError};
use crate::workflow::{
    self, EngineSnapshot, Step, UpRequest, WorkflowEvent, WorkflowInput, WorkflowReport,
};

/// Exit code for configuration problems found before touching the engine.
const EXIT_INVALID: u8 = 2;

/// Resolved config plus the global flags every subcommand needs.
struct Session {
    config: Config,
    project_dir: PathBuf,
    dry_run: bool,
    json: bool,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let project_dir = std::fs::canonicalize(&cli.dir)
            .with_context(|| format!("project directory {} not found", cli.dir.display()))?;
        let config = match &cli.config {
            Some(path) => config::load_from(path)?,
            None => config::load(&project_dir)?,
        };
        Ok(Self {
            config,
            project_dir,
            dry_run: cli.dry_run,
            json: cli.json,
        })
    }
}

/// Dispatches the parsed CLI command to its handler.
pub fn execute(cli: Cli) -> Result<ExitCode> {
    let session = Session::open(&cli)?;

    match cli.command {
        Command::Build(args) => run_steps(&session, vec![Step::Build], None, args.log, None),
        Command::Run => run_steps(&session, vec![Step::Run], None, None, None),
        Command::Start => run_steps(&session, vec![Step::Start], None, None, None),
        Command::Exec(args) => {
            let exec = (!args.command.is_empty()).then_some(args.command);
            run_steps(&session, vec![Step::Exec], exec, None, None)
        }
        Command::Install => run_steps(&session, vec![Step::Install], None, None, None),
        Command::Up(args) => up(&session, args),
        Command::Status => status(&session),
        Command::Stop => {
            let cmd = workflow::commands::stop_command(&session.config, &session.project_dir);
            run_single(&session, &cmd)
        }
        Command::Rm(RmArgs { force }) => {
            let cmd =
                workflow::commands::remove_command(&session.config, &session.project_dir, force);
            run_single(&session, &cmd)
        }
        Command::Check => check(&session),
        Command::Config => print_config(&session),
        Command::Print => print_workflow(&session),
    }
}

/// Static checks always; host path checks only for the steps that use them.
fn preflight(session: &Session, steps: &[Step]) -> Vec<ValidationError> {
    let cfg = &session.config;
    let checks = Checks { filesystem: false };
    let mut errors = validate::validate_config(cfg, &session.project_dir, checks);
    if session.dry_run {
        return errors;
    }

    if steps.contains(&Step::Build) {
        let context = session.project_dir.join(&cfg.context);
        let build_file = session.project_dir.join(&cfg.build_file);
        if let Err(e) = validate::validate_build_inputs(&context, &build_file) {
            errors.push(e);
        }
    }
    // The engine would silently create a missing bind source as root.
    if steps.contains(&Step::Run) {
        for volume in &cfg.volumes {
            let source = session.project_dir.join(&volume.host);
            if let Err(e) = validate::validate_mount_source(&source) {
                errors.push(e);
            }
        }
    }
    errors
}

fn report_invalid(errors: &[ValidationError]) -> ExitCode {
    for e in errors {
        eprintln!("error: {e}");
    }
    ExitCode::from(EXIT_INVALID)
}

fn run_steps(
    session: &Session,
    steps: Vec<Step>,
    exec: Option<Vec<String>>,
    build_log: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let errors = preflight(session, &steps);
    if !errors.is_empty() {
        return Ok(report_invalid(&errors));
    }
    if !session.dry_run {
        engine::ensure_available(&session.config.engine)?;
    }

    let input = WorkflowInput {
        dry_run: session.dry_run,
        exec,
        build_log,
        ..WorkflowInput::new(session.config.clone(), session.project_dir.clone(), steps)
    };
    let attached = !session.dry_run && input.steps.iter().any(|s| s.is_interactive());
    let report = drive(input, session.json)?;

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }
    // An attached session already wrote to stdout; the report goes to --report only.
    if session.json && attached {
        tracing::warn!("interactive steps share stdout; use --report for the JSON report");
    } else if session.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(exit_code_for(&report))
}

/// Consume workflow events, echoing progress on stderr.
fn drive(input: WorkflowInput, json: bool) -> Result<WorkflowReport> {
    let dry_run = input.dry_run;
    let events = workflow::run_workflow(input);

    for event in events {
        match event {
            WorkflowEvent::StepStarted { step, command, .. } => {
                if dry_run && !json {
                    println!("{command}");
                } else {
                    eprintln!("==> {step}: {command}");
                }
            }
            WorkflowEvent::Log { line, .. } => {
                if json {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
            WorkflowEvent::StepFinished { step, status } => {
                tracing::debug!(%step, ?status, "step finished");
            }
            WorkflowEvent::Completed(report) => return Ok(report),
            WorkflowEvent::Aborted(reason) => bail!("workflow aborted: {reason}"),
        }
    }

    bail!("workflow ended without a report")
}

fn exit_code_for(report: &WorkflowReport) -> ExitCode {
    if report.success() {
        return ExitCode::SUCCESS;
    }
    match report.failed_exit_code().and_then(|c| u8::try_from(c).ok()) {
        Some(code) if code != 0 => ExitCode::from(code),
        _ => ExitCode::FAILURE,
    }
}

fn up(session: &Session, args: UpArgs) -> Result<ExitCode> {
    let request = UpRequest {
        rebuild: args.rebuild,
        install: args.install,
    };

    let snapshot = if session.dry_run {
        // Without probing, assume a fresh host: the full chain gets printed.
        EngineSnapshot {
            image_present: false,
            container: None,
        }
    } else {
        engine::ensure_available(&session.config.engine)?;
        EngineSnapshot::probe(&session.config)?
    };
    tracing::debug!(?snapshot, "engine state");

    let steps = workflow::plan(&snapshot, request, &session.config)?;
    tracing::info!(?steps, "planned workflow");
    run_steps(session, steps, None, None, args.report)
}

#[derive(Serialize)]
struct StatusReport {
    image: String,
    image_present: bool,
    container: String,
    state: Option<String>,
}

fn status(session: &Session) -> Result<ExitCode> {
    let cfg = &session.config;
    engine::ensure_available(&cfg.engine)?;
    let snapshot = EngineSnapshot::probe(cfg)?;

    let report = StatusReport {
        image: cfg.image.clone(),
        image_present: snapshot.image_present,
        container: cfg.container.clone(),
        state: snapshot.container.map(|s| s.to_string()),
    };

    if session.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let image = if report.image_present { "present" } else { "missing" };
        println!("image     {}  {image}", report.image);
        println!(
            "container {}  {}",
            report.container,
            report.state.as_deref().unwrap_or("absent")
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Run one engine command that is not part of the workflow chain.
fn run_single(session: &Session, cmd: &EngineCommand) -> Result<ExitCode> {
    if session.dry_run {
        println!("{cmd}");
        return Ok(ExitCode::SUCCESS);
    }
    engine::ensure_available(&cmd.program)?;
    eprintln!("==> {cmd}");
    let result = engine::run_interactive(cmd)?;
    if result.success {
        return Ok(ExitCode::SUCCESS);
    }
    Ok(match result.exit_code.and_then(|c| u8::try_from(c).ok()) {
        Some(code) if code != 0 => ExitCode::from(code),
        _ => ExitCode::FAILURE,
    })
}

#[derive(Serialize)]
struct CheckReport {
    errors: Vec<String>,
    warnings: Vec<String>,
}

fn check(session: &Session) -> Result<ExitCode> {
    let cfg = &session.config;
    let checks = Checks {
        filesystem: !session.dry_run,
    };
    let errors = validate::validate_config(cfg, &session.project_dir, checks);
    let mut warnings = Vec::new();

    if checks.filesystem {
        let context = session.project_dir.join(&cfg.context);
        let build_file_missing = errors
            .iter()
            .any(|e| matches!(e, ValidationError::BuildFileMissing(_)));
        if build_file_missing && context.is_dir() {
            // Suggest `build_file` values, which the engine reads relative to the project dir.
            let found: Vec<String> = project::discover_build_files(&context, cfg.search_depth)?
                .iter()
                .map(|f| Path::new(&cfg.context).join(f))
                .map(|p| p.strip_prefix(".").unwrap_or(&p).display().to_string())
                .collect();
            if !found.is_empty() {
                warnings.push(format!("build files found: {}", found.join(", ")));
            }
        }

        if cfg.install.is_some() {
            for volume in &cfg.volumes {
                let host = session.project_dir.join(&volume.host);
                if host.is_dir() && project::detect_package(&host).is_none() {
                    warnings.push(format!(
                        "no setup.py, pyproject.toml or setup.cfg in {}",
                        host.display()
                    ));
                }
            }
        }
    }

    let report = CheckReport {
        errors: errors.iter().map(ToString::to_string).collect(),
        warnings,
    };

    if session.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for w in &report.warnings {
            eprintln!("warning: {w}");
        }
        for e in &report.errors {
            eprintln!("error: {e}");
        }
        if report.errors.is_empty() {
            println!("config ok");
        }
    }

    Ok(if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_INVALID)
    })
}

fn print_config(session: &Session) -> Result<ExitCode> {
    if session.json {
        println!("{}", serde_json::to_string_pretty(&session.config)?);
    } else {
        print!("{}", serde_yaml::to_string(&session.config)?);
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct PrintedStep {
    step: Step,
    command: String,
}

fn print_workflow(session: &Session) -> Result<ExitCode> {
    let cfg = &session.config;
    let mut printed = Vec::new();
    for step in [Step::Build, Step::Run, Step::Start, Step::Exec, Step::Install] {
        if step == Step::Install && cfg.install.is_none() {
            continue;
        }
        let cmd = workflow::commands::step_command(step, cfg, &session.project_dir, None)?;
        printed.push(PrintedStep {
            step,
            command: cmd.render(),
        });
    }

    if session.json {
        println!("{}", serde_json::to_string_pretty(&printed)?);
    } else {
        for p in &printed {
            println!("{}", p.command);
        }
    }
    Ok(ExitCode::SUCCESS)
}
