use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};

use hutch_db::Database;
use hutch_store::MemoryBlobStore;

/// Database with a "bench" collection indexed on "score", holding `n` items
/// with scores cycling 0..100.
fn seeded_database(n: usize) -> Database<MemoryBlobStore> {
    let mut db = Database::new(MemoryBlobStore::new(), &json!({})).unwrap();
    db.handle_heartbeat();
    let result = db.execute_query(&json!({
        "query": "create",
        "collection": "bench",
        "indices": [{ "name": "score" }]
    }));
    assert!(!result.has_errors());

    let items: Vec<Value> = (0..n)
        .map(|i| json!({ "label": format!("item-{i}"), "score": (i % 100) as i64 }))
        .collect();
    let result = db.execute_query(&json!({
        "query": "insert",
        "collection": "bench",
        "value": items
    }));
    assert!(!result.has_errors());
    db
}

fn bench_find_all_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_all_range");
    for n in [1_000, 10_000] {
        let mut db = seeded_database(n);
        let query = json!({
            "query": "find_all",
            "collection": "bench",
            "index": "score",
            "criteria": { "min": 10, "max": 20 },
            "result": "$label"
        });
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let result = db.execute_query(&query);
                assert!(!result.has_errors());
                result.into_result()
            })
        });
    }
    group.finish();
}

fn bench_find_by_id(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_by_id");
    for n in [1_000, 10_000] {
        let mut db = seeded_database(n);
        let query = json!({
            "query": "find",
            "collection": "bench",
            "criteria": { "like": (n / 2) as i64 }
        });
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| db.execute_query(&query).into_result())
        });
    }
    group.finish();
}

fn bench_update_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_all");
    for n in [1_000] {
        let mut db = seeded_database(n);
        let query = json!({
            "query": "update_all",
            "collection": "bench",
            "index": "score",
            "criteria": { "min": 0, "max": 100 },
            "set": { "touched": true, "rank": { "$add": ["$score", 1] } }
        });
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let result = db.execute_query(&query);
                assert!(!result.has_errors());
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find_all_range, bench_find_by_id, bench_update_all);
criterion_main!(benches);
