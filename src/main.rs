//! snapbase CLI entry point
//!
//! main.rs only parses args, installs logging, and dispatches — it never
//! touches the workspace engine directly.

use std::process;

use snapbase::cli::{run_command, Cli};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse_args();

    if let Err(e) = run_command(cli.workspace.as_deref(), cli.command) {
        eprintln!("error: {}", e);
        process::exit(e.exit_code());
    }
}
