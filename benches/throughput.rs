use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use venus::cache::{MemoryBackend, MultiLevelCache};
use venus::codec::{Base62, Encoder};
use venus::config::CacheConfig;

fn codec_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));

    group.bench_function("base62_encode", |b| {
        b.iter(|| Base62.encode(black_box(1_357_986_420)))
    });
    group.bench_function("base62_decode", |b| {
        b.iter(|| Base62.decode(black_box("Bd38Sw")))
    });

    group.finish();
}

// First-level hits are the redirect hot path.
fn cache_benchmark(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => panic!("failed to build runtime: {e}"),
    };
    let cache = MultiLevelCache::new(
        "bench",
        &CacheConfig::default(),
        Arc::new(MemoryBackend::new()),
        "bench:0",
    );
    runtime.block_on(async {
        cache
            .put("B", Some(&"https://example.com".to_string()))
            .await
            .ok();
    });

    let mut group = c.benchmark_group("cache");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_with_hit", |b| {
        b.to_async(&runtime).iter(|| async {
            cache
                .get_with("B", || async { Ok::<_, std::io::Error>(None::<String>) })
                .await
        })
    });
    group.bench_function("get_with_null", |b| {
        b.to_async(&runtime).iter(|| async {
            cache
                .get_with("missing", || async { Ok::<_, std::io::Error>(None::<String>) })
                .await
        })
    });

    group.finish();
}

criterion_group!(benches, codec_benchmark, cache_benchmark);
criterion_main!(benches);
