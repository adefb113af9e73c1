use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::validate::{self, ValidationError};

/// A published port, `host:container` on the engine command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl PortMapping {
    pub fn same(port: u16) -> Self {
        Self {
            host: port,
            container: port,
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

impl FromStr for PortMapping {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate::parse_port_mapping(s)
    }
}

impl Serialize for PortMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PortMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PortVisitor;

        impl<'de> Visitor<'de> for PortVisitor {
            type Value = PortMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("\"host:container\" or a single port number")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<PortMapping, E> {
                match u16::try_from(value) {
                    Ok(port) if port > 0 => Ok(PortMapping::same(port)),
                    _ => Err(E::custom(format!("port {value} is out of range 1-65535"))),
                }
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<PortMapping, E> {
                match u64::try_from(value) {
                    Ok(v) => self.visit_u64(v),
                    Err(_) => Err(E::custom(format!("port {value} is out of range 1-65535"))),
                }
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<PortMapping, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PortVisitor)
    }
}

/// A bind mount, `host:container[:ro]` on the engine command line.
///
/// A relative `host` path is resolved against the project directory when the
/// run command is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VolumeMount {
    pub host: PathBuf,
    pub container: String,
    pub read_only: bool,
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container)?;
        if self.read_only {
            f.write_str(":ro")?;
        }
        Ok(())
    }
}

impl FromStr for VolumeMount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate::parse_volume_mount(s)
    }
}

impl TryFrom<String> for VolumeMount {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VolumeMount> for String {
    fn from(mount: VolumeMount) -> Self {
        mount.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine binary: `docker`, `podman`, or an absolute path.
    pub engine: String,
    pub image: String,
    pub build_file: String,
    pub context: String,
    pub container: String,
    /// Value for `--gpus`; `None` runs without GPU access.
    pub gpus: Option<String>,
    pub ports: Vec<PortMapping>,
    pub ipc_host: bool,
    pub volumes: Vec<VolumeMount>,
    pub shell: String,
    /// Package install command run inside the container. Opaque to us.
    pub install: Option<String>,
    /// Working directory for `install`; defaults to the first mount target.
    pub install_workdir: Option<String>,
    pub run_as_host_user: bool,
    /// Seconds before a build is killed. Unset lets the engine run to completion.
    pub build_timeout: Option<u64>,
    pub search_depth: usize,
}

impl Config {
    /// Directory the install command runs in, if any is known.
    pub fn effective_install_workdir(&self) -> Option<&str> {
        self.install_workdir
            .as_deref()
            .or_else(|| self.volumes.first().map(|v| v.container.as_str()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            image: "test_trans:0.1".to_string(),
            build_file: "Dockerfile".to_string(),
            context: ".".to_string(),
            container: "cont_trans".to_string(),
            gpus: Some("all".to_string()),
            ports: vec![PortMapping::same(8896)],
            ipc_host: true,
            volumes: vec![VolumeMount {
                host: PathBuf::from("/nfs/homes/jxiong/code/transducer"),
                container: "/workspace/trans".to_string(),
                read_only: false,
            }],
            shell: "bash".to_string(),
            install: Some("python setup.py install".to_string()),
            install_workdir: None,
            run_as_host_user: false,
            build_timeout: None,
            search_depth: 3,
        }
    }
}
