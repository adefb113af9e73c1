//! ctrflow — build, run and enter a GPU development container.
//!
//! The workflow is the usual linear chain against an external container
//! engine (`docker` by default): build the image, run the container with GPU
//! access, a published port, host IPC and a bind-mounted source tree, start it
//! again later, exec a shell in it, and optionally run a package install from
//! the mounted sources. Every step is a plain engine invocation; failures are
//! the engine's own and stop the chain.

pub mod cli;
pub mod config;
pub mod engine;
pub mod project;
pub mod validate;
pub mod workflow;
