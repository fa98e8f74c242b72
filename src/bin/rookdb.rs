//! # rookdb Shell Entry Point
//!
//! ```bash
//! # open a shell over the current directory
//! rookdb
//!
//! # open a shell over a specific directory of .tbl/.idx files
//! rookdb ./data
//! ```

use std::env;
use std::path::PathBuf;

use eyre::{bail, Result};
use rookdb::cli::Repl;
use rookdb::sql::SqlEngine;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut base_dir: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("rookdb {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            arg if arg.starts_with('-') => bail!("unknown option: {}", arg),
            path => {
                if base_dir.is_some() {
                    bail!("multiple directories specified");
                }
                base_dir = Some(PathBuf::from(path));
            }
        }
    }

    let base_dir = base_dir.unwrap_or_else(|| PathBuf::from("."));
    if !base_dir.is_dir() {
        bail!("'{}' is not a directory", base_dir.display());
    }

    let engine = SqlEngine::new(base_dir);
    let mut repl = Repl::new(engine)?;
    repl.run()
}

fn print_usage() {
    println!("rookdb - small relational engine with a B+tree index");
    println!();
    println!("USAGE:");
    println!("    rookdb [OPTIONS] [DIRECTORY]");
    println!();
    println!("ARGS:");
    println!("    [DIRECTORY]    Directory holding .tbl/.idx files (default: .)");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}
