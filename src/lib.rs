//! # rookdb - Small Relational Engine
//!
//! rookdb is a toy relational engine built around one serious piece of
//! machinery: a disk-backed B+tree secondary index over integer keys.
//! Tables are heap files of `(key, value)` records; the index maps a key
//! to the record id of its tuple and supports point lookup, insertion,
//! and forward range scans.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------+
//! |        CLI / REPL (rookdb bin)       |
//! +--------------------------------------+
//! |   SQL layer (lexer/parser/executor)  |
//! +------------------+-------------------+
//! |  Record files    |   B+tree index    |
//! |  (heap tuples)   |  (key -> record)  |
//! +------------------+-------------------+
//! |   Paged file storage (1KB pages)     |
//! +--------------------------------------+
//! ```
//!
//! ## File Layout
//!
//! Each table is a pair of files in the working directory:
//!
//! ```text
//! movies.tbl    # heap file of (key, value) records
//! movies.idx    # B+tree index over the keys (optional)
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: memory-mapped paged files and on-disk headers
//! - [`records`]: heap record files addressed by `(page, slot)` ids
//! - [`btree`]: the B+tree node codecs, facade, and scan cursor
//! - [`sql`]: the mini-SQL dialect (`SELECT`, `LOAD`)
//! - [`cli`]: interactive REPL

pub mod btree;
pub mod cli;
pub mod records;
pub mod sql;
pub mod storage;

pub use btree::{BTreeIndex, IndexCursor};
pub use records::{RecordFile, RecordId};
pub use sql::{ExecuteResult, SelectOutput, SqlEngine};
pub use storage::{AccessMode, PageFile, PAGE_SIZE};
