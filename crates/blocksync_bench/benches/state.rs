//! Sync state benchmarks.

use blocksync_bench::large_document;
use blocksync_engine::{content_hash, SyncStateStore};
use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

/// Benchmark hashing document bodies.
fn bench_content_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");

    for copies in [1, 10, 50] {
        let text = format!("---\ntitle: Bench\n---\n\n{}", large_document(copies));
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(copies), &text, |b, text| {
            b.iter(|| black_box(content_hash(black_box(text))));
        });
    }

    group.finish();
}

/// Benchmark classifying documents against a populated store.
fn bench_check_status(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_status");
    let dir = TempDir::new().unwrap();
    let mut store = SyncStateStore::open(dir.path().join("state.json"), dir.path()).unwrap();
    let synced_at = Utc::now();
    let body = large_document(1);

    for i in 0..200 {
        let id = format!("{i:032x}");
        store
            .mark_synced(&id, &format!("doc-{i}.md--FINAL.md"), "Doc", synced_at, content_hash(&body))
            .unwrap();
    }
    let id = format!("{:032x}", 100);

    group.bench_function("synced", |b| {
        b.iter(|| black_box(store.check_status(black_box(&id), synced_at, Some(&body))));
    });

    group.bench_function("conflict", |b| {
        let later = synced_at + Duration::seconds(5);
        b.iter(|| black_box(store.check_status(black_box(&id), later, Some("edited"))));
    });

    group.bench_function("new", |b| {
        b.iter(|| black_box(store.check_status(black_box("ffffffffffffffffffffffffffffffff"), synced_at, None)));
    });

    group.finish();
}

/// Benchmark rewriting the whole state file.
fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");

    for count in [10, 100, 500] {
        let dir = TempDir::new().unwrap();
        let mut store = SyncStateStore::open(dir.path().join("state.json"), dir.path()).unwrap();
        for i in 0..count {
            let id = format!("{i:032x}");
            store
                .mark_synced(&id, &format!("doc-{i}.md--FINAL.md"), "Doc", Utc::now(), String::new())
                .unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(count), &store, |b, store| {
            b.iter(|| store.save().unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_content_hash, bench_check_status, bench_save);
criterion_main!(benches);
