//! B+tree benchmarks: sequential and shuffled insertion plus point
//! lookups, measured over a temp-directory index file.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rookdb::{AccessMode, BTreeIndex, RecordId};
use tempfile::tempdir;

fn shuffled(count: i32) -> Vec<i32> {
    let mut keys: Vec<i32> = (1..=count).collect();
    let mut state: u64 = 0x9E3779B97F4A7C15;
    for i in (1..keys.len()).rev() {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let j = (state >> 33) as usize % (i + 1);
        keys.swap(i, j);
    }
    keys
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_insert");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("sequential", count), count, |b, &count| {
            b.iter_with_setup(tempdir, |dir| {
                let dir = dir.unwrap();
                let mut index =
                    BTreeIndex::open(dir.path().join("bench.idx"), AccessMode::Write).unwrap();
                for key in 1..=count {
                    index.insert(key, RecordId::new(key as u32, 0)).unwrap();
                }
                dir
            });
        });

        group.bench_with_input(BenchmarkId::new("shuffled", count), count, |b, &count| {
            b.iter_with_setup(
                || (tempdir().unwrap(), shuffled(count)),
                |(dir, keys)| {
                    let mut index =
                        BTreeIndex::open(dir.path().join("bench.idx"), AccessMode::Write).unwrap();
                    for key in keys {
                        index.insert(key, RecordId::new(key as u32, 0)).unwrap();
                    }
                    dir
                },
            );
        });
    }

    group.finish();
}

fn bench_locate(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.idx");
    {
        let mut index = BTreeIndex::open(&path, AccessMode::Write).unwrap();
        for key in 1..=100_000 {
            index.insert(key, RecordId::new(key as u32, 0)).unwrap();
        }
        index.close().unwrap();
    }

    let mut index = BTreeIndex::open(&path, AccessMode::Read).unwrap();
    let mut next = 0i32;

    c.bench_function("btree_locate", |b| {
        b.iter(|| {
            next = next % 100_000 + 1;
            let (cursor, found) = index.locate(black_box(next)).unwrap();
            assert!(found);
            black_box(cursor)
        });
    });
}

criterion_group!(benches, bench_insert, bench_locate);
criterion_main!(benches);
