use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

use super::types::ContainerState;

/// Verify that the engine binary runs and its daemon answers.
pub fn ensure_available(engine: &str) -> Result<()> {
    let status = Command::new(engine)
        .args(["version", "--format", "{{.Server.Version}}"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to invoke `{engine}`; is it installed and on PATH?"))?;

    if !status.success() {
        bail!("{engine} daemon is not reachable ({status})");
    }
    Ok(())
}

/// Returns `["--user", "uid:gid"]` on Unix so files written into bind mounts
/// belong to the invoking user. Empty on other platforms.
pub fn user_args() -> Vec<String> {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() and getegid() are POSIX getters that always succeed
        // and have no side effects.
        let uid = unsafe { libc::geteuid() };
        let gid = unsafe { libc::getegid() };
        vec!["--user".into(), format!("{uid}:{gid}")]
    }

    #[cfg(not(unix))]
    {
        Vec::new()
    }
}

/// Whether `image` is present locally (never pulls).
pub fn image_exists(engine: &str, image: &str) -> Result<bool> {
    let status = Command::new(engine)
        .args(["image", "inspect", image])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to invoke `{engine} image inspect`"))?;
    tracing::debug!(image, present = status.success(), "probed image");
    Ok(status.success())
}

/// State of the named container, or `None` if the engine does not know it.
pub fn container_state(engine: &str, name: &str) -> Result<Option<ContainerState>> {
    let output = Command::new(engine)
        .args(["container", "inspect", "--format", "{{.State.Status}}", name])
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to invoke `{engine} container inspect`"))?;

    if !output.status.success() {
        tracing::debug!(container = name, "container not found");
        return Ok(None);
    }
    let state = ContainerState::parse(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(container = name, %state, "probed container");
    Ok(Some(state))
}
