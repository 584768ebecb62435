use std::sync::Arc;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tasker_bulk::driver::callback;
use tasker_bulk::record::PostRecord;
use tasker_bulk::store::MemoryStore;
use tasker_bulk::{BulkTask, FetchContext, QueryArgs, Record, SourceRegistry};

fn store_with(ids: impl Iterator<Item = i64>) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for id in ids {
        store.insert_post(PostRecord {
            id,
            post_type: "post".to_string(),
            post_status: "publish".to_string(),
            title: String::new(),
            modified_at: Utc::now(),
        });
    }
    Arc::new(store)
}

fn scan(runtime: &tokio::runtime::Runtime, store: &Arc<MemoryStore>, page_size: i64) -> i64 {
    runtime.block_on(async {
        let task = BulkTask::new("bench", SourceRegistry::with_store(store.clone()));
        let mut sum = 0i64;
        let outcome = task
            .run(
                "post",
                QueryArgs::new().with("posts_per_page", page_size),
                callback::from_fn(|record: &Record, _: &FetchContext| {
                    sum += record.ordering_key();
                }),
            )
            .await;
        outcome.map(|o| o.watermark()).unwrap_or_default() + black_box(sum)
    })
}

fn benchmark_dense_scan(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let store = store_with(1..=20_000);

    let mut group = c.benchmark_group("dense_scan");
    for page_size in [100i64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(page_size), &page_size, |b, &size| {
            b.iter(|| scan(&runtime, &store, size))
        });
    }
    group.finish();
}

fn benchmark_sparse_scan(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let store = store_with((1..=1_000).map(|n| n * 997));

    c.bench_function("sparse_scan", |b| b.iter(|| scan(&runtime, &store, 100)));
}

criterion_group!(benches, benchmark_dense_scan, benchmark_sparse_scan);
criterion_main!(benches);
