use std::path::Path;
use std::time::Duration;

use anyhow::{Result, bail};

use super::types::Step;
use crate::config::Config;
use crate::engine::{self, EngineCommand};

fn engine_command(cfg: &Config, project_dir: &Path, args: Vec<String>) -> EngineCommand {
    EngineCommand {
        cwd: Some(project_dir.to_path_buf()),
        ..EngineCommand::new(cfg.engine.clone(), args)
    }
}

/// `build -t <image:tag> <context> -f <build-file>`
pub fn build_command(cfg: &Config, project_dir: &Path) -> EngineCommand {
    let args = vec![
        "build".into(),
        "-t".into(),
        cfg.image.clone(),
        cfg.context.clone(),
        "-f".into(),
        cfg.build_file.clone(),
    ];
    EngineCommand {
        timeout: cfg.build_timeout.map(Duration::from_secs),
        ..engine_command(cfg, project_dir, args)
    }
}

/// `run --gpus all -p H:C --name <container> --ipc=host -it -v H:C <image:tag>`
///
/// Relative mount sources are resolved against `project_dir`; the engine
/// would otherwise read them as named volumes.
pub fn run_command(cfg: &Config, project_dir: &Path) -> EngineCommand {
    let mut args: Vec<String> = vec!["run".into()];
    if let Some(gpus) = &cfg.gpus {
        args.extend(["--gpus".into(), gpus.clone()]);
    }
    for port in &cfg.ports {
        args.extend(["-p".into(), port.to_string()]);
    }
    args.extend(["--name".into(), cfg.container.clone()]);
    if cfg.ipc_host {
        args.push("--ipc=host".into());
    }
    args.push("-it".into());
    for volume in &cfg.volumes {
        let mut resolved = volume.clone();
        resolved.host = project_dir.join(&volume.host);
        args.extend(["-v".into(), resolved.to_string()]);
    }
    if cfg.run_as_host_user {
        args.extend(engine::user_args());
    }
    args.push(cfg.image.clone());

    EngineCommand {
        interactive: true,
        ..engine_command(cfg, project_dir, args)
    }
}

/// `start <container>`
pub fn start_command(cfg: &Config, project_dir: &Path) -> EngineCommand {
    engine_command(cfg, project_dir, vec!["start".into(), cfg.container.clone()])
}

/// `exec -it <container> <shell>`, or an explicit command instead of the shell.
pub fn exec_command(cfg: &Config, project_dir: &Path, command: Option<&[String]>) -> EngineCommand {
    let mut args = vec!["exec".into(), "-it".into(), cfg.container.clone()];
    match command {
        Some(argv) if !argv.is_empty() => args.extend(argv.iter().cloned()),
        _ => args.push(cfg.shell.clone()),
    }
    EngineCommand {
        interactive: true,
        ..engine_command(cfg, project_dir, args)
    }
}

/// `exec -it [-w <dir>] <container> <install argv…>`
///
/// The install string is split with shell rules and passed through untouched.
pub fn install_command(cfg: &Config, project_dir: &Path) -> Result<EngineCommand> {
    let Some(install) = &cfg.install else {
        bail!("no install command configured (set `install` in .ctrflow)");
    };
    let argv = shell_words::split(install)?;
    if argv.is_empty() {
        bail!("install command is empty");
    }

    let mut args = vec!["exec".into(), "-it".into()];
    if let Some(dir) = cfg.effective_install_workdir() {
        args.extend(["-w".into(), dir.to_string()]);
    }
    args.push(cfg.container.clone());
    args.extend(argv);

    Ok(EngineCommand {
        interactive: true,
        ..engine_command(cfg, project_dir, args)
    })
}

/// `stop <container>`
pub fn stop_command(cfg: &Config, project_dir: &Path) -> EngineCommand {
    engine_command(cfg, project_dir, vec!["stop".into(), cfg.container.clone()])
}

/// `rm [-f] <container>`
pub fn remove_command(cfg: &Config, project_dir: &Path, force: bool) -> EngineCommand {
    let mut args = vec!["rm".into()];
    if force {
        args.push("-f".into());
    }
    args.push(cfg.container.clone());
    engine_command(cfg, project_dir, args)
}

/// The engine command for one workflow step.
pub fn step_command(
    step: Step,
    cfg: &Config,
    project_dir: &Path,
    exec: Option<&[String]>,
) -> Result<EngineCommand> {
    Ok(match step {
        Step::Build => build_command(cfg, project_dir),
        Step::Run => run_command(cfg, project_dir),
        Step::Start => start_command(cfg, project_dir),
        Step::Exec => exec_command(cfg, project_dir, exec),
        Step::Install => install_command(cfg, project_dir)?,
    })
}
