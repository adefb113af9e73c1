// Project configuration — `.ctrflow` YAML with defaults for the stock GPU workflow.

mod loader;
mod types;

pub use loader::{CONFIG_FILE, load, load_from};
pub use types::{Config, PortMapping, VolumeMount};
