//! Command-line interface: argument definitions and subcommand dispatch.

mod args;
mod commands;

pub use args::{BuildArgs, Cli, Command, ExecArgs, RmArgs, UpArgs};
pub use commands::execute;
