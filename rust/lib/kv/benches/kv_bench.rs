use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use filmrate_kv::{KVStore, MemoryKV, RedbStore};

fn populate(store: &dyn KVStore) {
    for film in 0..100 {
        for user in 0..10 {
            let key = format!("film:like:{:020}:{:020}", film, user);
            store.set(&key, b"").unwrap();
        }
    }
}

fn bench_redb_like_scan(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = RedbStore::open(&tmp.path().join("bench.redb")).unwrap();
    populate(&store);

    c.bench_function("redb_scan_likes_of_film", |b| {
        b.iter(|| {
            let prefix = format!("film:like:{:020}:", 42);
            let results = store.scan(black_box(&prefix)).unwrap();
            assert_eq!(results.len(), 10);
        });
    });
}

fn bench_memory_like_scan(c: &mut Criterion) {
    let store = MemoryKV::new();
    populate(&store);

    c.bench_function("memory_scan_likes_of_film", |b| {
        b.iter(|| {
            let prefix = format!("film:like:{:020}:", 42);
            let results = store.scan(black_box(&prefix)).unwrap();
            assert_eq!(results.len(), 10);
        });
    });
}

fn bench_memory_batch_set(c: &mut Criterion) {
    let store = MemoryKV::new();

    c.bench_function("memory_batch_set_vote", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let vote = format!("film:vote:{:020}:{:020}", i % 50, i);
            let review = format!("film:review:{:020}", i % 50);
            store
                .batch_set(black_box(&[(vote.as_str(), b"LIKE".as_slice()), (review.as_str(), b"{}".as_slice())]))
                .unwrap();
            i += 1;
        });
    });
}

criterion_group!(
    benches,
    bench_redb_like_scan,
    bench_memory_like_scan,
    bench_memory_batch_set
);
criterion_main!(benches);
