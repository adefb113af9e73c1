pub mod commands;
pub mod orchestrator;
pub mod plan;
mod types;

pub use orchestrator::run_workflow;
pub use plan::{EngineSnapshot, UpRequest, plan};
pub use types::{
    Step, StepResult, StepStatus, Summary, WorkflowEvent, WorkflowInput, WorkflowReport,
};
