//! # SQL Layer
//!
//! The mini-SQL dialect understood by rookdb:
//!
//! ```text
//! SELECT key FROM movies WHERE key > 1990 AND key <= 2005
//! SELECT * FROM movies WHERE value = 'Heat'
//! SELECT count(*) FROM movies
//! LOAD movies FROM 'movies.del' WITH INDEX
//! ```
//!
//! A `SELECT` projects `key`, `value`, `*`, or `count(*)` from one table
//! under a conjunction of comparisons; `LOAD` bulk-loads a `key,value`
//! file into a table, optionally building its B+tree index as it goes.
//!
//! ## Pipeline
//!
//! - `lexer`: zero-copy tokenizer, keywords via a perfect hash map
//! - `ast`: statement and condition types
//! - `parser`: recursive descent over the token stream
//! - `engine`: plans the access path (index range scan vs. full heap
//!   scan) and executes

mod ast;
mod engine;
mod lexer;
mod parser;

pub use ast::{
    Attr, CompareOp, Condition, Literal, LoadStatement, Projection, SelectStatement, Statement,
};
pub use engine::{ExecuteResult, SelectOutput, SqlEngine};
pub use lexer::{Keyword, Lexer, Token};
pub use parser::parse;
