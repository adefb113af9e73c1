use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::error::ValidationError;
use crate::config::{Config, PortMapping, VolumeMount};

// Registry host, optional port, then lowercase path components.
static IMAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?",
        r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*(?::[0-9]+)?/)?",
        r"[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*",
        r"(?:/[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*)*$",
    ))
    .expect("image name pattern is valid")
});

static IMAGE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("image tag pattern is valid")
});

static CONTAINER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("container name pattern is valid")
});

/// Which checks touch the host filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checks {
    pub filesystem: bool,
}

impl Default for Checks {
    fn default() -> Self {
        Self { filesystem: true }
    }
}

/// Split `repo[:tag]` into its name and tag. A colon before the last `/`
/// belongs to a registry port, not a tag.
pub fn split_image_ref(value: &str) -> (&str, Option<&str>) {
    let last_slash = value.rfind('/').map_or(0, |i| i + 1);
    match value[last_slash..].rfind(':') {
        Some(i) => {
            let at = last_slash + i;
            (&value[..at], Some(&value[at + 1..]))
        }
        None => (value, None),
    }
}

/// Check a `name:tag` image reference. The tag is mandatory.
pub fn validate_image_ref(value: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidImageRef {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("empty"));
    }
    if value.contains('@') {
        return Err(invalid("digest references are not supported"));
    }

    let (name, tag) = split_image_ref(value);
    if !IMAGE_NAME.is_match(name) {
        return Err(invalid(
            "name must be lowercase path components, optionally prefixed by a registry host",
        ));
    }
    match tag {
        None => Err(ValidationError::MissingTag(value.to_string())),
        Some(tag) if !IMAGE_TAG.is_match(tag) => Err(invalid(
            "tag must be 1-128 of [A-Za-z0-9_.-] and not start with `.` or `-`",
        )),
        Some(_) => Ok(()),
    }
}

pub fn validate_container_name(value: &str) -> Result<(), ValidationError> {
    if CONTAINER_NAME.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidContainerName(value.to_string()))
    }
}

/// Parse `host:container`. Both sides must be ports in 1-65535.
pub fn parse_port_mapping(value: &str) -> Result<PortMapping, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidPortMapping {
        value: value.to_string(),
        reason,
    };

    let Some((host, container)) = value.trim().split_once(':') else {
        return Err(invalid("expected host:container".into()));
    };
    let parse = |side: &str| -> Result<u16, ValidationError> {
        let port: u32 = side
            .parse()
            .map_err(|_| invalid(format!("`{side}` is not a port number")))?;
        match u16::try_from(port) {
            Ok(p) if p > 0 => Ok(p),
            _ => Err(invalid(format!("{port} is out of range 1-65535"))),
        }
    };

    Ok(PortMapping {
        host: parse(host)?,
        container: parse(container)?,
    })
}

/// Parse `host:container[:ro|:rw]`.
pub fn parse_volume_mount(value: &str) -> Result<VolumeMount, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidVolume {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = value.split(':').collect();
    let (host, container, read_only) = match parts.as_slice() {
        [host, container] => (*host, *container, false),
        [host, container, "ro"] => (*host, *container, true),
        [host, container, "rw"] => (*host, *container, false),
        [_, _, _] => return Err(invalid("mode must be `ro` or `rw`")),
        _ => return Err(invalid("expected host:container[:ro]")),
    };

    if host.is_empty() {
        return Err(invalid("host path is empty"));
    }
    if !container.starts_with('/') {
        return Err(invalid("container path must be absolute"));
    }

    Ok(VolumeMount {
        host: PathBuf::from(host),
        container: container.to_string(),
        read_only,
    })
}

pub fn validate_mount_source(path: &Path) -> Result<(), ValidationError> {
    if !path.exists() {
        return Err(ValidationError::MountSourceMissing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ValidationError::MountSourceNotDir(path.to_path_buf()));
    }
    Ok(())
}

/// The context must be a directory and the build file must exist. Both paths
/// are already resolved: the engine reads a relative `-f` from its working
/// directory, not from the context.
pub fn validate_build_inputs(context: &Path, build_file: &Path) -> Result<(), ValidationError> {
    if !context.is_dir() {
        return Err(ValidationError::ContextMissing(context.to_path_buf()));
    }
    if !build_file.is_file() {
        return Err(ValidationError::BuildFileMissing(build_file.to_path_buf()));
    }
    Ok(())
}

/// Run every check against `cfg` and collect all problems.
///
/// Relative paths are resolved against `project_dir`.
pub fn validate_config(cfg: &Config, project_dir: &Path, checks: Checks) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(e) = validate_image_ref(&cfg.image) {
        errors.push(e);
    }
    if let Err(e) = validate_container_name(&cfg.container) {
        errors.push(e);
    }

    let mut seen = HashSet::new();
    for port in &cfg.ports {
        if !seen.insert(port.host) {
            errors.push(ValidationError::DuplicateHostPort(port.host));
        }
    }

    if cfg.shell.trim().is_empty() {
        errors.push(ValidationError::EmptyShell);
    }

    if let Some(install) = &cfg.install {
        match shell_words::split(install) {
            Ok(argv) if argv.is_empty() => errors.push(ValidationError::InvalidInstallCommand {
                value: install.clone(),
                reason: "empty command".into(),
            }),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidInstallCommand {
                value: install.clone(),
                reason: e.to_string(),
            }),
        }
    }
    if let Some(dir) = &cfg.install_workdir
        && !dir.starts_with('/')
    {
        errors.push(ValidationError::RelativeInstallWorkdir(dir.clone()));
    }

    if checks.filesystem {
        let context = project_dir.join(&cfg.context);
        let build_file = project_dir.join(&cfg.build_file);
        if let Err(e) = validate_build_inputs(&context, &build_file) {
            errors.push(e);
        }
        for volume in &cfg.volumes {
            if let Err(e) = validate_mount_source(&project_dir.join(&volume.host)) {
                errors.push(e);
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn image_ref_accepts_documented_tag() {
        assert!(validate_image_ref("test_trans:0.1").is_ok());
    }

    #[test]
    fn image_ref_accepts_registry_with_port() {
        assert!(validate_image_ref("registry.local:5000/team/app:v1.2-rc").is_ok());
    }

    #[test]
    fn image_ref_requires_tag() {
        assert_eq!(
            validate_image_ref("test_trans"),
            Err(ValidationError::MissingTag("test_trans".into()))
        );
        // The colon here is a registry port, not a tag.
        assert!(matches!(
            validate_image_ref("localhost:5000/app"),
            Err(ValidationError::MissingTag(_))
        ));
    }

    #[test]
    fn image_ref_rejects_uppercase_and_bad_tags() {
        assert!(validate_image_ref("Test:1").is_err());
        assert!(validate_image_ref("test:.hidden").is_err());
        assert!(validate_image_ref("test:").is_err());
        assert!(validate_image_ref("").is_err());
        assert!(validate_image_ref("app@sha256:abc").is_err());
    }

    #[test]
    fn split_image_ref_handles_registry_ports() {
        assert_eq!(split_image_ref("a:1"), ("a", Some("1")));
        assert_eq!(split_image_ref("host:5000/a"), ("host:5000/a", None));
        assert_eq!(split_image_ref("host:5000/a:2"), ("host:5000/a", Some("2")));
    }

    #[test]
    fn container_name_rules() {
        assert!(validate_container_name("cont_trans").is_ok());
        assert!(validate_container_name("a.b-c").is_ok());
        assert!(validate_container_name("-leading").is_err());
        assert!(validate_container_name("has space").is_err());
        assert!(validate_container_name("").is_err());
    }

    #[test]
    fn port_mapping_parses_and_bounds() {
        let p = parse_port_mapping("8896:8896").unwrap();
        assert_eq!(p, PortMapping::same(8896));
        assert!(parse_port_mapping("8896").is_err());
        assert!(parse_port_mapping("0:80").is_err());
        assert!(parse_port_mapping("70000:80").is_err());
        assert!(parse_port_mapping("http:80").is_err());
    }

    #[test]
    fn volume_mount_parses_modes() {
        let v = parse_volume_mount("/a:/b").unwrap();
        assert!(!v.read_only);
        assert!(parse_volume_mount("/a:/b:ro").unwrap().read_only);
        assert!(!parse_volume_mount("/a:/b:rw").unwrap().read_only);
        assert!(parse_volume_mount("/a:/b:zz").is_err());
        assert!(parse_volume_mount("/a:relative").is_err());
        assert!(parse_volume_mount(":/b").is_err());
        assert!(parse_volume_mount("/only").is_err());
    }

    #[test]
    fn mount_source_must_be_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_mount_source(dir.path()).is_ok());

        let file = dir.path().join("f");
        fs::write(&file, "").unwrap();
        assert_eq!(
            validate_mount_source(&file),
            Err(ValidationError::MountSourceNotDir(file.clone()))
        );
        assert!(matches!(
            validate_mount_source(&dir.path().join("missing")),
            Err(ValidationError::MountSourceMissing(_))
        ));
    }

    #[test]
    fn build_inputs_require_context_dir_and_build_file() {
        let dir = tempfile::tempdir().unwrap();
        let build_file = dir.path().join("Dockerfile");
        assert!(matches!(
            validate_build_inputs(dir.path(), &build_file),
            Err(ValidationError::BuildFileMissing(_))
        ));
        fs::write(&build_file, "FROM scratch\n").unwrap();
        assert!(validate_build_inputs(dir.path(), &build_file).is_ok());
        assert!(matches!(
            validate_build_inputs(&dir.path().join("missing"), &build_file),
            Err(ValidationError::ContextMissing(_))
        ));
    }

    #[test]
    fn build_file_is_relative_to_project_not_context() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docker")).unwrap();
        fs::write(dir.path().join("docker/Dockerfile"), "FROM scratch\n").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let base = Config {
            context: "docker".into(),
            volumes: vec!["src:/workspace/src".parse().unwrap()],
            ..Config::default()
        };

        let nested = Config {
            build_file: "docker/Dockerfile".into(),
            ..base.clone()
        };
        let errors = validate_config(&nested, dir.path(), Checks::default());
        assert!(errors.is_empty(), "{errors:?}");

        // `Dockerfile` would only exist inside the context, where the engine does not look.
        let errors = validate_config(&base, dir.path(), Checks::default());
        assert_eq!(
            errors,
            vec![ValidationError::BuildFileMissing(dir.path().join("Dockerfile"))]
        );
    }

    fn project_config(dir: &Path) -> Config {
        fs::write(dir.join("Dockerfile"), "FROM scratch\n").unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        Config {
            volumes: vec!["src:/workspace/src".parse().unwrap()],
            ..Config::default()
        }
    }

    #[test]
    fn validate_config_passes_for_complete_project() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = project_config(dir.path());
        assert!(validate_config(&cfg, dir.path(), Checks::default()).is_empty());
    }

    #[test]
    fn validate_config_collects_every_problem() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            image: "NoTag".into(),
            container: "bad name".into(),
            ports: vec![PortMapping::same(80), PortMapping::same(80)],
            shell: " ".into(),
            install: Some("python 'unterminated".into()),
            install_workdir: Some("relative".into()),
            ..Config::default()
        };
        let errors = validate_config(&cfg, dir.path(), Checks::default());
        // image, name, duplicate port, shell, install, workdir, build file, mount source
        assert_eq!(errors.len(), 8, "{errors:?}");
        assert!(errors.contains(&ValidationError::DuplicateHostPort(80)));
        assert!(errors.contains(&ValidationError::EmptyShell));
    }

    #[test]
    fn validate_config_can_skip_filesystem_checks() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::default();
        let errors = validate_config(&cfg, dir.path(), Checks { filesystem: false });
        assert!(errors.is_empty(), "{errors:?}");
    }
}
