// Container engine plumbing — probes, streamed and interactive runs.

pub mod probe;
pub mod run;
pub mod types;

pub use probe::{container_state, ensure_available, image_exists, user_args};
pub use run::{run_interactive, spawn};
pub use types::{CommandResult, ContainerState, EngineCommand, OutputLine};
