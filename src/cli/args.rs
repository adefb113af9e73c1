use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Build, run and enter a GPU dev container from a project's `.ctrflow`.
#[derive(Parser, Debug)]
#[command(name = "ctrflow", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file to use instead of `<dir>/.ctrflow`.
    #[arg(long, global = true, env = "CTRFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project directory: build context root and base for relative paths.
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Print the engine commands instead of running them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Emit machine-readable JSON on stdout. Steps attached to the terminal
    /// (run, exec, install) own stdout, so their report goes to `up --report`.
    #[arg(long, global = true)]
    pub json: bool,

    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the image from the configured build file.
    Build(BuildArgs),
    /// Create the container and attach a shell.
    Run,
    /// Start the stopped container.
    Start,
    /// Open a shell (or run a command) in the running container.
    Exec(ExecArgs),
    /// Run the package install command inside the container.
    Install,
    /// Do whatever is needed to end up in the container's shell.
    Up(UpArgs),
    /// Show whether the image and container exist.
    Status,
    /// Stop the container.
    Stop,
    /// Remove the container.
    Rm(RmArgs),
    /// Validate the config and the host paths it refers to.
    Check,
    /// Print the effective config as YAML.
    Config,
    /// Print every step's engine command, in workflow order.
    Print,
}

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Write the build output to this file as well.
    #[arg(long)]
    pub log: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct ExecArgs {
    /// Command to run instead of the configured shell.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct UpArgs {
    /// Rebuild the image even if it exists.
    #[arg(long)]
    pub rebuild: bool,

    /// Run the install command before the shell.
    #[arg(long)]
    pub install: bool,

    /// Write the JSON workflow report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct RmArgs {
    /// Remove even if running.
    #[arg(short, long)]
    pub force: bool,
}
