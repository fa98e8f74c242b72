//! History file location for the REPL. The `ROOKDB_HISTORY` environment
//! variable wins when set (an empty value turns persistence off
//! entirely); otherwise history lands in `~/.rookdb_history`. rustyline
//! handles the actual file I/O.

use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_HISTORY_FILE: &str = ".rookdb_history";
const HISTORY_ENV_VAR: &str = "ROOKDB_HISTORY";

pub fn history_path() -> Option<PathBuf> {
    match env::var(HISTORY_ENV_VAR) {
        Ok(overridden) if overridden.is_empty() => None,
        Ok(overridden) => Some(PathBuf::from(overridden)),
        Err(_) => env::var("HOME")
            .ok()
            .map(|home| Path::new(&home).join(DEFAULT_HISTORY_FILE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_overrides_and_disables() {
        env::set_var(HISTORY_ENV_VAR, "/custom/path");
        assert_eq!(history_path(), Some(PathBuf::from("/custom/path")));

        env::set_var(HISTORY_ENV_VAR, "");
        assert_eq!(history_path(), None);

        env::remove_var(HISTORY_ENV_VAR);
    }
}
