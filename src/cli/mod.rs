//! # Command-Line Interface
//!
//! The interactive shell around [`crate::sql::SqlEngine`]:
//!
//! - `repl`: the read-eval-print loop (rustyline line editing, multi-line
//!   statements terminated by `;`)
//! - `commands`: SQLite-style dot commands (`.help`, `.tables`, `.quit`)
//! - `table`: ASCII table rendering for `SELECT *` results
//! - `history`: location of the persistent history file

mod commands;
mod history;
mod repl;
mod table;

pub use commands::{CommandHandler, CommandResult};
pub use repl::Repl;
pub use table::TableFormatter;
