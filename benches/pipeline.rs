//! Performance benchmarks for the subscription pipeline.
//!
//! Run with: `cargo bench --bench pipeline`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | JSON-LD adapter | <20µs | Flat node object |
//! | Subscribe (allow-all) | <100µs p99 | Resolve, construct, serialize |
//! | Registry resolve | <1µs | BTreeMap lookup |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use notification_channels::types::vocab::notify;
use notification_channels::{
    AllowAll, ChannelTypeRegistry, Credentials, Graph, NotificationConfig, SubscriptionPipeline,
};

fn webhook_doc(state: bool) -> serde_json::Value {
    let mut doc = json!({
        "@context": ["https://www.w3.org/ns/solid/notification/v1"],
        "type": "WebhookChannel2023",
        "topic": "https://pod.example/data/resource1",
        "target": "https://example.org/hook",
        "rate": "PT10S",
    });
    if state {
        doc["state"] = json!("etag-1");
    }
    doc
}

/// Benchmark the JSON-LD adapter.
fn bench_adapter(c: &mut Criterion) {
    let body = webhook_doc(true).to_string();

    let mut group = c.benchmark_group("json_ld_adapter");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("webhook_payload", |b| {
        b.iter(|| Graph::from_json_ld_str(black_box(&body)).unwrap())
    });
    group.finish();
}

/// Benchmark a full subscription with an allow-all authorizer.
fn bench_subscribe(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let config = NotificationConfig::with_base_url("https://pod.example/");
    let registry = Arc::new(ChannelTypeRegistry::with_defaults(&config).unwrap());
    let pipeline = SubscriptionPipeline::from_config(registry, Arc::new(AllowAll), &config);
    let credentials = Credentials::for_agent("https://alice.example/profile#me");

    let mut group = c.benchmark_group("subscribe");
    for state in [false, true] {
        let graph = Graph::from_json_ld(&webhook_doc(state)).unwrap();
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("webhook_state", state), &graph, |b, graph| {
            b.to_async(&runtime).iter(|| async {
                let subscription = pipeline
                    .subscribe(black_box(graph), &credentials, &CancellationToken::new())
                    .await
                    .unwrap();
                subscription.body
            })
        });
    }
    group.finish();
}

/// Benchmark registry lookups.
fn bench_resolve(c: &mut Criterion) {
    let config = NotificationConfig::with_base_url("https://pod.example/");
    let registry = ChannelTypeRegistry::with_defaults(&config).unwrap();
    let hit = notify("WebhookChannel2023");
    let miss = notify("Carrier");

    let mut group = c.benchmark_group("registry_resolve");
    group.bench_function("hit", |b| b.iter(|| registry.resolve(black_box(&hit)).is_ok()));
    group.bench_function("miss", |b| b.iter(|| registry.resolve(black_box(&miss)).is_err()));
    group.finish();
}

criterion_group!(benches, bench_adapter, bench_subscribe, bench_resolve);
criterion_main!(benches);
