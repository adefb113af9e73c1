use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ctrflow::cli::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli::execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so interactive sessions and `--json` output stay clean.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "ctrflow=warn",
        1 => "ctrflow=debug",
        _ => "ctrflow=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
