//! snapbase CLI (§6).
//!
//! Subcommands `init`, `snapshot`, `status`, `diff`, `query`, `export`,
//! `stats`, one variant per `Command`. `main.rs` is the only caller of
//! `run_command`; it owns process exit, this module only returns `Result`.

mod args;
mod commands;

pub use args::{Cli, Command};
pub use commands::run_command;
