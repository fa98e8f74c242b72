//! # SQL Executor
//!
//! Plans and runs parsed statements against the table files in a base
//! directory. Table `t` lives in `t.tbl` (heap records) and, when
//! indexed, `t.idx` (B+tree over the keys).
//!
//! ## Access Path Selection
//!
//! Key conditions are folded into a single `[lower, upper]` range: `=`
//! pins both bounds, `>`/`>=` raise the lower bound, `<`/`<=` lower the
//! upper bound, and `<>` contributes nothing. The index is used when it
//! exists on disk and either the range is bounded or the projection is
//! `count(*)`; everything else falls back to a full heap scan. Every
//! surviving row is still checked against the full condition list, so
//! the range is a pruning device, not the filter of record.
//!
//! ## Heap Reads
//!
//! On the index path the heap tuple is fetched only when a value
//! condition or a value-bearing projection requires it; a `count(*)`
//! over key conditions alone never touches the heap.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use eyre::{bail, Result, WrapErr};
use tracing::debug;

use crate::btree::BTreeIndex;
use crate::records::RecordFile;
use crate::storage::AccessMode;

use super::ast::{
    Attr, CompareOp, Condition, Literal, LoadStatement, Projection, SelectStatement, Statement,
};
use super::parser::parse;

#[derive(Debug, Clone)]
pub struct SqlEngine {
    base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteResult {
    Select(SelectOutput),
    Load { rows: usize, indexed: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutput {
    Keys(Vec<i32>),
    Values(Vec<String>),
    Tuples(Vec<(i32, String)>),
    Count(usize),
}

impl SqlEngine {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn execute(&self, sql: &str) -> Result<ExecuteResult> {
        match parse(sql)? {
            Statement::Select(stmt) => self.select(&stmt).map(ExecuteResult::Select),
            Statement::Load(stmt) => {
                let rows = self.load(&stmt)?;
                Ok(ExecuteResult::Load {
                    rows,
                    indexed: stmt.with_index,
                })
            }
        }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.base_dir.join(format!("{}.tbl", table))
    }

    fn index_path(&self, table: &str) -> PathBuf {
        self.base_dir.join(format!("{}.idx", table))
    }

    fn select(&self, stmt: &SelectStatement) -> Result<SelectOutput> {
        let table = RecordFile::open(self.table_path(&stmt.table), AccessMode::Read)
            .wrap_err_with(|| format!("table '{}' does not exist", stmt.table))?;

        let plan = Plan::from_conditions(&stmt.conditions)?;
        let needs_value = !plan.value_conds.is_empty()
            || matches!(stmt.projection, Projection::Value | Projection::All);

        let mut out = match stmt.projection {
            Projection::Key => SelectOutput::Keys(Vec::new()),
            Projection::Value => SelectOutput::Values(Vec::new()),
            Projection::All => SelectOutput::Tuples(Vec::new()),
            Projection::Count => SelectOutput::Count(0),
        };

        let index_path = self.index_path(&stmt.table);
        let use_index =
            index_path.exists() && (plan.bounded || stmt.projection == Projection::Count);

        if use_index {
            debug!(table = %stmt.table, lower = plan.lower, upper = plan.upper, "index scan");
            let mut index = BTreeIndex::open(&index_path, AccessMode::Read)?;
            let (mut cursor, _) = index.locate(plan.lower)?;
            while let Some((key, rid)) = index.read_forward(&mut cursor)? {
                if key > plan.upper {
                    break;
                }
                if !plan.key_matches(key) {
                    continue;
                }
                if needs_value {
                    let (_, value) = table.read(rid)?;
                    if !plan.value_matches(&value) {
                        continue;
                    }
                    push_row(&mut out, key, Some(value));
                } else {
                    push_row(&mut out, key, None);
                }
            }
        } else {
            debug!(table = %stmt.table, "full heap scan");
            for record in table.scan() {
                let (_, key, value) = record?;
                if !plan.key_matches(key) || !plan.value_matches(&value) {
                    continue;
                }
                push_row(&mut out, key, Some(value));
            }
        }

        Ok(out)
    }

    fn load(&self, stmt: &LoadStatement) -> Result<usize> {
        let mut table = RecordFile::open(self.table_path(&stmt.table), AccessMode::Write)
            .wrap_err_with(|| format!("cannot open table '{}'", stmt.table))?;
        let mut index = if stmt.with_index {
            let index = BTreeIndex::open(self.index_path(&stmt.table), AccessMode::Write)
                .wrap_err_with(|| format!("cannot create index for table '{}'", stmt.table))?;
            Some(index)
        } else {
            None
        };

        let file = Path::new(&stmt.file);
        let file = if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.base_dir.join(file)
        };
        let content = std::fs::read_to_string(&file)
            .wrap_err_with(|| format!("cannot read load file '{}'", file.display()))?;

        let mut rows = 0;
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = parse_load_line(line)
                .wrap_err_with(|| format!("invalid file format at line {}", lineno + 1))?;
            let rid = table.append(key, &value)?;
            if let Some(index) = &mut index {
                index.insert(key, rid)?;
            }
            rows += 1;
        }

        table.close()?;
        if let Some(index) = index {
            index.close()?;
        }
        debug!(table = %stmt.table, rows, indexed = stmt.with_index, "loaded table");
        Ok(rows)
    }
}

fn push_row(out: &mut SelectOutput, key: i32, value: Option<String>) {
    match out {
        SelectOutput::Keys(keys) => keys.push(key),
        SelectOutput::Values(values) => {
            if let Some(value) = value {
                values.push(value);
            }
        }
        SelectOutput::Tuples(tuples) => {
            if let Some(value) = value {
                tuples.push((key, value));
            }
        }
        SelectOutput::Count(count) => *count += 1,
    }
}

#[derive(Debug)]
struct Plan {
    lower: i32,
    upper: i32,
    bounded: bool,
    key_conds: Vec<(CompareOp, i32)>,
    value_conds: Vec<(CompareOp, String)>,
}

impl Plan {
    fn from_conditions(conditions: &[Condition]) -> Result<Self> {
        let mut plan = Plan {
            lower: i32::MIN,
            upper: i32::MAX,
            bounded: false,
            key_conds: Vec::new(),
            value_conds: Vec::new(),
        };

        for cond in conditions {
            match cond.attr {
                Attr::Key => {
                    let Literal::Int(v) = &cond.value else {
                        bail!("key conditions require an integer literal");
                    };
                    let v = *v;
                    // the range prunes; the saved condition decides
                    match cond.op {
                        CompareOp::Eq => {
                            plan.lower = plan.lower.max(v);
                            plan.upper = plan.upper.min(v);
                            plan.bounded = true;
                        }
                        CompareOp::Gt => {
                            plan.lower = plan.lower.max(v.saturating_add(1));
                            plan.bounded = true;
                        }
                        CompareOp::Ge => {
                            plan.lower = plan.lower.max(v);
                            plan.bounded = true;
                        }
                        CompareOp::Lt => {
                            plan.upper = plan.upper.min(v.saturating_sub(1));
                            plan.bounded = true;
                        }
                        CompareOp::Le => {
                            plan.upper = plan.upper.min(v);
                            plan.bounded = true;
                        }
                        CompareOp::Ne => {}
                    }
                    plan.key_conds.push((cond.op, v));
                }
                Attr::Value => {
                    let text = match &cond.value {
                        Literal::Str(s) => s.clone(),
                        Literal::Int(n) => n.to_string(),
                    };
                    plan.value_conds.push((cond.op, text));
                }
            }
        }

        Ok(plan)
    }

    fn key_matches(&self, key: i32) -> bool {
        self.key_conds
            .iter()
            .all(|&(op, v)| compare_matches(op, key.cmp(&v)))
    }

    fn value_matches(&self, value: &str) -> bool {
        self.value_conds
            .iter()
            .all(|(op, text)| compare_matches(*op, value.cmp(text.as_str())))
    }
}

fn compare_matches(op: CompareOp, ord: Ordering) -> bool {
    match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Ge => ord != Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
    }
}

fn parse_load_line(line: &str) -> Result<(i32, String)> {
    let Some((key_part, value_part)) = line.split_once(',') else {
        bail!("missing comma separator");
    };

    let key = key_part
        .trim()
        .parse::<i32>()
        .wrap_err_with(|| format!("bad key '{}'", key_part.trim()))?;

    let value_part = value_part.trim_start();
    let value = match value_part.bytes().next() {
        Some(quote @ (b'\'' | b'"')) => {
            let rest = &value_part[1..];
            match rest.find(quote as char) {
                Some(end) => rest[..end].to_string(),
                None => rest.to_string(),
            }
        }
        _ => value_part.to_string(),
    };

    Ok((key, value))
}
