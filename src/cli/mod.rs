//! CLI module
//!
//! Command-line interface over the traversal engine and resource operations.
//!
//! # Commands
//!
//! - `list` - Stream records for every resource under a folder
//! - `resolve` - Turn a name or path into an identifier
//! - `mkdir` / `copy` / `delete` / `put` - Resource mutations
//! - `validate` - Check a reader configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands, KindArg, ListModeArg, OutputFormat};
pub use runner::Runner;
