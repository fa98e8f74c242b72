//! # REPL
//!
//! The interactive loop: reads lines with rustyline, dispatches dot
//! commands immediately, and accumulates SQL until a terminating `;`.
//! The prompt switches from `rookdb>` to `    ->` in continuation mode.
//! Statement errors are printed and the loop continues; exit with
//! `.quit` or Ctrl+D.

use std::time::Instant;

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::cli::commands::{CommandHandler, CommandResult};
use crate::cli::history::history_path;
use crate::cli::table::TableFormatter;
use crate::sql::{ExecuteResult, SelectOutput, SqlEngine};

const PRIMARY_PROMPT: &str = "rookdb> ";
const CONTINUATION_PROMPT: &str = "    -> ";

pub struct Repl {
    engine: SqlEngine,
    editor: DefaultEditor,
    sql_buffer: String,
}

impl Repl {
    pub fn new(engine: SqlEngine) -> Result<Self> {
        let mut editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;

        if let Some(history_file) = history_path() {
            let _ = editor.load_history(&history_file);
        }

        Ok(Self {
            engine,
            editor,
            sql_buffer: String::new(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        println!(
            "rookdb {} over {}",
            env!("CARGO_PKG_VERSION"),
            self.engine.base_dir().display()
        );
        println!("Statements end with ';'. Type .help for commands, .quit to leave.");

        let mut keep_going = true;
        while keep_going {
            let prompt = if self.sql_buffer.is_empty() {
                PRIMARY_PROMPT
            } else {
                CONTINUATION_PROMPT
            };

            keep_going = match self.editor.readline(prompt) {
                Ok(line) => self.handle_line(&line)?,
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C drops any half-typed statement but keeps the shell
                    self.sql_buffer.clear();
                    true
                }
                Err(ReadlineError::Eof) => false,
                Err(err) => return Err(err).wrap_err("failed to read input"),
            };
        }

        if let Some(history_file) = history_path() {
            let _ = self.editor.save_history(&history_file);
        }
        println!("Goodbye.");
        Ok(())
    }

    // Returns false when the REPL should exit.
    fn handle_line(&mut self, line: &str) -> Result<bool> {
        if self.sql_buffer.is_empty() && CommandHandler::is_command(line) {
            let _ = self.editor.add_history_entry(line.trim());
            match CommandHandler::execute(line, self.engine.base_dir()) {
                CommandResult::Output(text) => println!("{}", text),
                CommandResult::Error(message) => eprintln!("{}", message),
                CommandResult::Exit => return Ok(false),
                CommandResult::Continue => {}
            }
            return Ok(true);
        }

        if !self.sql_buffer.is_empty() {
            self.sql_buffer.push('\n');
        }
        self.sql_buffer.push_str(line);

        if self.sql_buffer.trim_end().ends_with(';') {
            let sql = std::mem::take(&mut self.sql_buffer);
            let _ = self.editor.add_history_entry(sql.trim());
            self.execute_sql(&sql);
        }
        Ok(true)
    }

    fn execute_sql(&self, sql: &str) {
        let started = Instant::now();
        match self.engine.execute(sql) {
            Ok(result) => print_result(result, started.elapsed().as_secs_f64()),
            Err(err) => eprintln!("Error: {:#}", err),
        }
    }
}

fn print_result(result: ExecuteResult, elapsed: f64) {
    match result {
        ExecuteResult::Select(SelectOutput::Keys(keys)) => {
            let count = keys.len();
            for key in keys {
                println!("{}", key);
            }
            println!("{} rows in set ({:.3} sec)", count, elapsed);
        }
        ExecuteResult::Select(SelectOutput::Values(values)) => {
            let count = values.len();
            for value in values {
                println!("{}", value);
            }
            println!("{} rows in set ({:.3} sec)", count, elapsed);
        }
        ExecuteResult::Select(SelectOutput::Tuples(tuples)) => {
            let count = tuples.len();
            let rows = tuples
                .into_iter()
                .map(|(key, value)| vec![key.to_string(), value])
                .collect();
            let formatter = TableFormatter::new(vec!["key".to_string(), "value".to_string()], rows);
            print!("{}", formatter.render());
            println!("{} rows in set ({:.3} sec)", count, elapsed);
        }
        ExecuteResult::Select(SelectOutput::Count(count)) => {
            println!("{}", count);
            println!("1 row in set ({:.3} sec)", elapsed);
        }
        ExecuteResult::Load { rows, indexed } => {
            if indexed {
                println!("Loaded {} rows with index ({:.3} sec)", rows, elapsed);
            } else {
                println!("Loaded {} rows ({:.3} sec)", rows, elapsed);
            }
        }
    }
}
