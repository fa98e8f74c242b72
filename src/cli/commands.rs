//! # Dot Command Handler
//!
//! SQLite-style dot commands for shell control and introspection. Dot
//! commands start with a period, are case-insensitive, and execute
//! immediately (no terminating semicolon).
//!
//! | Command           | Description                             |
//! |-------------------|-----------------------------------------|
//! | `.quit` / `.exit` | Exit the shell                          |
//! | `.tables`         | List tables in the working directory    |
//! | `.help`           | Show available commands                 |

use std::path::Path;

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    Output(String),
    Exit,
    Continue,
    Error(String),
}

pub struct CommandHandler;

impl CommandHandler {
    pub fn is_command(input: &str) -> bool {
        input.trim().starts_with('.')
    }

    pub fn execute(input: &str, base_dir: &Path) -> CommandResult {
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        let Some(cmd) = parts.first() else {
            return CommandResult::Continue;
        };

        match cmd.to_lowercase().as_str() {
            ".quit" | ".exit" | ".q" => CommandResult::Exit,
            ".help" | ".h" | ".?" => CommandResult::Output(help_text()),
            ".tables" => list_tables(base_dir),
            _ => CommandResult::Error(format!(
                "Unknown command: {}. Type .help for available commands.",
                cmd
            )),
        }
    }
}

fn help_text() -> String {
    r#"rookdb shell commands:

  .quit, .exit, .q     Exit the shell
  .help, .h, .?        Show this help message
  .tables              List tables in the working directory

SQL statements end with a semicolon (;):

  SELECT key FROM movies WHERE key > 1990 AND key < 2000;
  SELECT count(*) FROM movies;
  LOAD movies FROM 'movies.del' WITH INDEX;"#
        .to_string()
}

fn list_tables(base_dir: &Path) -> CommandResult {
    let entries = match std::fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(err) => return CommandResult::Error(format!("cannot list tables: {}", err)),
    };

    let mut tables: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            match (path.file_stem(), path.extension()) {
                (Some(stem), Some(ext)) if ext == "tbl" => {
                    Some(stem.to_string_lossy().into_owned())
                }
                _ => None,
            }
        })
        .collect();

    if tables.is_empty() {
        CommandResult::Output("No tables found.".to_string())
    } else {
        tables.sort();
        CommandResult::Output(tables.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn recognizes_dot_commands() {
        assert!(CommandHandler::is_command(".help"));
        assert!(CommandHandler::is_command("  .tables"));
        assert!(!CommandHandler::is_command("SELECT * FROM t"));
    }

    #[test]
    fn quit_variants_exit() {
        let dir = tempdir().unwrap();
        for cmd in [".quit", ".exit", ".q", ".QUIT"] {
            assert_eq!(
                CommandHandler::execute(cmd, dir.path()),
                CommandResult::Exit
            );
        }
    }

    #[test]
    fn tables_lists_tbl_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("movies.tbl"), b"").unwrap();
        std::fs::write(dir.path().join("movies.idx"), b"").unwrap();
        std::fs::write(dir.path().join("books.tbl"), b"").unwrap();

        let result = CommandHandler::execute(".tables", dir.path());
        assert_eq!(result, CommandResult::Output("books\nmovies".to_string()));
    }

    #[test]
    fn unknown_command_errors() {
        let dir = tempdir().unwrap();
        let result = CommandHandler::execute(".bogus", dir.path());
        assert!(matches!(result, CommandResult::Error(_)));
    }
}
