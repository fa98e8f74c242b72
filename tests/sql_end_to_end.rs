//! End-to-end SQL tests: LOAD into heap and index files, then SELECT
//! through both access paths.

use std::fs;

use rookdb::sql::{ExecuteResult, SelectOutput, SqlEngine};
use tempfile::tempdir;

fn write_load_file(dir: &tempfile::TempDir, name: &str, rows: &[(i32, &str)]) {
    let mut content = String::new();
    for (key, value) in rows {
        content.push_str(&format!("{},'{}'\n", key, value));
    }
    fs::write(dir.path().join(name), content).unwrap();
}

#[test]
fn load_then_point_query() {
    let dir = tempdir().unwrap();
    let engine = SqlEngine::new(dir.path());
    write_load_file(
        &dir,
        "movies.del",
        &[(1997, "Titanic"), (1999, "The Matrix"), (1995, "Heat")],
    );

    let result = engine
        .execute("LOAD movies FROM 'movies.del' WITH INDEX")
        .unwrap();
    assert_eq!(
        result,
        ExecuteResult::Load {
            rows: 3,
            indexed: true
        }
    );

    let result = engine
        .execute("SELECT * FROM movies WHERE key = 1999")
        .unwrap();
    assert_eq!(
        result,
        ExecuteResult::Select(SelectOutput::Tuples(vec![(
            1999,
            "The Matrix".to_string()
        )]))
    );
}

#[test]
fn range_query_over_large_indexed_table() {
    let dir = tempdir().unwrap();
    let engine = SqlEngine::new(dir.path());

    let mut content = String::new();
    for key in 1..=1000 {
        content.push_str(&format!("{},'row {}'\n", key, key));
    }
    fs::write(dir.path().join("big.del"), content).unwrap();

    engine.execute("LOAD big FROM 'big.del' WITH INDEX").unwrap();

    let result = engine
        .execute("SELECT key FROM big WHERE key >= 100 AND key <= 500")
        .unwrap();
    assert_eq!(
        result,
        ExecuteResult::Select(SelectOutput::Keys((100..=500).collect()))
    );

    let result = engine.execute("SELECT count(*) FROM big").unwrap();
    assert_eq!(result, ExecuteResult::Select(SelectOutput::Count(1000)));
}

#[test]
fn unindexed_table_answers_by_heap_scan() {
    let dir = tempdir().unwrap();
    let engine = SqlEngine::new(dir.path());
    write_load_file(&dir, "t.del", &[(3, "c"), (1, "a"), (2, "b")]);

    engine.execute("LOAD t FROM 't.del'").unwrap();
    assert!(!dir.path().join("t.idx").exists());

    // heap scan preserves load order
    let result = engine.execute("SELECT key FROM t").unwrap();
    assert_eq!(result, ExecuteResult::Select(SelectOutput::Keys(vec![3, 1, 2])));

    let result = engine.execute("SELECT value FROM t WHERE key > 1").unwrap();
    assert_eq!(
        result,
        ExecuteResult::Select(SelectOutput::Values(vec![
            "c".to_string(),
            "b".to_string()
        ]))
    );
}

#[test]
fn value_conditions_filter_on_both_paths() {
    let dir = tempdir().unwrap();
    let engine = SqlEngine::new(dir.path());
    let rows: Vec<(i32, &str)> = vec![(1, "apple"), (2, "banana"), (3, "apple"), (4, "cherry")];
    write_load_file(&dir, "fruit.del", &rows);

    engine
        .execute("LOAD fruit FROM 'fruit.del' WITH INDEX")
        .unwrap();

    // indexed path (bounded key range) and heap path agree
    let indexed = engine
        .execute("SELECT key FROM fruit WHERE key >= 1 AND value = 'apple'")
        .unwrap();
    let scanned = engine
        .execute("SELECT key FROM fruit WHERE value = 'apple'")
        .unwrap();
    assert_eq!(indexed, ExecuteResult::Select(SelectOutput::Keys(vec![1, 3])));
    assert_eq!(scanned, ExecuteResult::Select(SelectOutput::Keys(vec![1, 3])));
}

#[test]
fn loads_accumulate_into_existing_table() {
    let dir = tempdir().unwrap();
    let engine = SqlEngine::new(dir.path());
    write_load_file(&dir, "a.del", &[(1, "one"), (2, "two")]);
    write_load_file(&dir, "b.del", &[(3, "three")]);

    engine.execute("LOAD t FROM 'a.del' WITH INDEX").unwrap();
    engine.execute("LOAD t FROM 'b.del' WITH INDEX").unwrap();

    let result = engine.execute("SELECT count(*) FROM t").unwrap();
    assert_eq!(result, ExecuteResult::Select(SelectOutput::Count(3)));

    let result = engine.execute("SELECT value FROM t WHERE key = 3").unwrap();
    assert_eq!(
        result,
        ExecuteResult::Select(SelectOutput::Values(vec!["three".to_string()]))
    );
}

#[test]
fn quoted_values_with_commas_load_intact() {
    let dir = tempdir().unwrap();
    let engine = SqlEngine::new(dir.path());
    fs::write(
        dir.path().join("q.del"),
        "1,'Hello, World'\n2,\"Commas, everywhere, here\"\n3,unquoted value\n",
    )
    .unwrap();

    engine.execute("LOAD q FROM 'q.del'").unwrap();

    let result = engine.execute("SELECT * FROM q").unwrap();
    assert_eq!(
        result,
        ExecuteResult::Select(SelectOutput::Tuples(vec![
            (1, "Hello, World".to_string()),
            (2, "Commas, everywhere, here".to_string()),
            (3, "unquoted value".to_string()),
        ]))
    );
}

#[test]
fn count_star_uses_index_without_conditions() {
    let dir = tempdir().unwrap();
    let engine = SqlEngine::new(dir.path());

    let mut content = String::new();
    for key in (1..=200).rev() {
        content.push_str(&format!("{},'v{}'\n", key, key));
    }
    fs::write(dir.path().join("r.del"), content).unwrap();

    engine.execute("LOAD r FROM 'r.del' WITH INDEX").unwrap();

    let result = engine.execute("SELECT count(*) FROM r").unwrap();
    assert_eq!(result, ExecuteResult::Select(SelectOutput::Count(200)));

    let result = engine
        .execute("SELECT count(*) FROM r WHERE key <> 100")
        .unwrap();
    assert_eq!(result, ExecuteResult::Select(SelectOutput::Count(199)));
}
