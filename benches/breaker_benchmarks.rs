//! Hot-path benchmarks for telegate
//!
//! Breaker admission, route resolution and dependency ordering run on every
//! proxied request or health sweep.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;
use telegate::config::{BreakerConfig, RouteConfig, default_routes};
use telegate::core::circuit_breaker::CircuitBreakerManager;
use telegate::core::registry::{ServiceDescriptor, ServiceRegistration, topological_order};
use telegate::core::router::RouteTable;
use tokio::runtime::Runtime;

/// Admission and outcome recording on a closed breaker
fn bench_breaker_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("breaker_admission");
    group.throughput(Throughput::Elements(1));

    let manager = CircuitBreakerManager::new(BreakerConfig::default());
    manager.get_or_create("core");

    group.bench_function("acquire_and_succeed", |b| {
        b.iter(|| {
            black_box(manager.acquire("core")).ok();
            manager.record_success("core");
        })
    });

    manager.force_open("core").ok();
    group.bench_function("reject_open", |b| {
        b.iter(|| black_box(manager.acquire("core")).is_err())
    });

    group.finish();
}

/// Concurrent callers sharing one breaker
fn bench_breaker_contention(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("breaker_contention");

    for tasks in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("execute", tasks), tasks, |b, &tasks| {
            let manager = Arc::new(CircuitBreakerManager::new(BreakerConfig::default()));
            b.iter(|| {
                rt.block_on(async {
                    let mut handles = Vec::with_capacity(tasks);
                    for i in 0..tasks {
                        let manager = Arc::clone(&manager);
                        handles.push(tokio::spawn(async move {
                            manager
                                .execute("core", || async move {
                                    Ok::<_, telegate::GatewayError>(i)
                                })
                                .await
                        }));
                    }
                    for handle in handles {
                        black_box(handle.await.unwrap()).ok();
                    }
                })
            });
        });
    }

    group.finish();
}

/// Longest-prefix lookup over the default route table
fn bench_route_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_resolution");
    let table = RouteTable::from_config(&default_routes()).unwrap();

    group.bench_function("grouped_prefix", |b| {
        b.iter(|| black_box(table.resolve(black_box("/content/posts/42"))))
    });
    group.bench_function("compat_prefix", |b| {
        b.iter(|| black_box(table.resolve(black_box("/api/tdlib/chats"))))
    });
    group.bench_function("miss", |b| {
        b.iter(|| black_box(table.resolve(black_box("/unknown/path"))))
    });

    let mut routes = default_routes();
    for i in 0..100 {
        routes.push(RouteConfig::new(
            &format!("svc{}", i),
            &format!("/svc{}", i),
            "http://localhost:4000",
            true,
        ));
    }
    let large = RouteTable::from_config(&routes).unwrap();
    group.bench_function("large_table", |b| {
        b.iter(|| black_box(large.resolve(black_box("/svc99/items"))))
    });

    group.finish();
}

/// Dependency ordering of a layered service graph
fn bench_topology(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology");

    for size in [10, 100, 1000].iter() {
        let mut services = HashMap::new();
        for i in 0..*size {
            let registration = ServiceRegistration::new(format!("s{}", i), "http://localhost:4000")
                .depends_on((i.saturating_sub(3)..i).map(|d| format!("s{}", d)));
            let descriptor = ServiceDescriptor::from_registration(registration);
            services.insert(descriptor.id.clone(), descriptor);
        }

        group.bench_with_input(BenchmarkId::new("order", size), &services, |b, services| {
            b.iter(|| black_box(topological_order(services)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_breaker_admission,
    bench_breaker_contention,
    bench_route_resolution,
    bench_topology
);
criterion_main!(benches);
