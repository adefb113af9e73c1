use anyhow::{Result, bail};

use super::types::Step;
use crate::config::Config;
use crate::engine::{self, ContainerState};

/// What the engine currently knows about the project's image and container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub image_present: bool,
    pub container: Option<ContainerState>,
}

impl EngineSnapshot {
    /// Ask the engine about the configured image and container.
    pub fn probe(cfg: &Config) -> Result<Self> {
        Ok(Self {
            image_present: engine::image_exists(&cfg.engine, &cfg.image)?,
            container: engine::container_state(&cfg.engine, &cfg.container)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpRequest {
    /// Build even if the image is already present.
    pub rebuild: bool,
    /// Run the install command before handing over the shell.
    pub install: bool,
}

/// Pick the shortest linear chain that ends in an interactive shell.
///
/// `run -it` attaches its own shell, so a fresh container gets no separate
/// `exec` unless an install is requested; in that case the shell from `run`
/// is followed by `start`, `install`, `exec` once it exits.
pub fn plan(snapshot: &EngineSnapshot, request: UpRequest, cfg: &Config) -> Result<Vec<Step>> {
    if request.install && cfg.install.is_none() {
        bail!("--install requested but no install command is configured");
    }

    let mut steps = Vec::new();
    if request.rebuild || !snapshot.image_present {
        steps.push(Step::Build);
    }

    match &snapshot.container {
        None => {
            steps.push(Step::Run);
            if request.install {
                steps.extend([Step::Start, Step::Install, Step::Exec]);
            }
        }
        Some(state) if state.is_startable() => {
            steps.push(Step::Start);
            if request.install {
                steps.push(Step::Install);
            }
            steps.push(Step::Exec);
        }
        Some(ContainerState::Running) => {
            if request.install {
                steps.push(Step::Install);
            }
            steps.push(Step::Exec);
        }
        Some(state) => bail!(
            "container `{}` is {state}; resolve it with the engine before continuing",
            cfg.container
        ),
    }

    if request.rebuild && snapshot.container.is_some() {
        tracing::warn!(
            container = %cfg.container,
            "existing container keeps the old image; remove it to pick up the rebuild"
        );
    }

    Ok(steps)
}
