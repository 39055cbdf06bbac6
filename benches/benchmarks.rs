use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::executor::block_on;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::hint::black_box;

use statebind::{subscribe, Handler, HeadlessHost, Props, Store};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn store_creation_benchmark(c: &mut Criterion) {
    let initial = object(json!({ "count": 0, "name": "test" }));

    c.bench_function("store_creation", |b| {
        b.iter(|| Store::new(black_box(initial.clone())));
    });
}

fn store_read_benchmark(c: &mut Criterion) {
    let store = Store::new(object(json!({ "count": 42 })));

    c.bench_function("store_read", |b| {
        b.iter(|| {
            black_box(store.get_state());
        });
    });
}

fn store_set_state_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_set_state");

    for subscriber_count in [1, 10, 100].iter() {
        let store = Store::new(object(json!({ "value": 0 })));
        let handler = Handler::from_fn(|_| Ok(()));

        for _ in 0..*subscriber_count {
            store.subscribe(&handler);
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(subscriber_count),
            subscriber_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    let patch = object(json!({ "value": black_box(i) }));
                    block_on(store.set_state(patch)).ok();
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

/// Every bound consumer subscribes to every store, then each store is
/// updated once.
fn bound_fan_out_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("bound_fan_out");
    group.sample_size(10);

    for size in [10, 50].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let stores: Vec<Store> = (0..size)
                    .map(|_| {
                        let initial = (0..size)
                            .map(|i| (format!("prop{i}"), Value::from(i)))
                            .collect::<Map<String, Value>>();
                        Store::new(initial)
                    })
                    .collect();

                let bound = subscribe(|props: &Props| props.len(), stores.clone())
                    .expect("stores are present");
                let views: Vec<_> = (0..size)
                    .map(|_| bound.mount(Props::new(), HeadlessHost::new()))
                    .collect();

                let patch = (0..size)
                    .map(|i| (format!("newProp{i}"), Value::from(i)))
                    .collect::<Map<String, Value>>();
                black_box(block_on(join_all(
                    stores.iter().map(|store| store.set_state(patch.clone())),
                )));

                drop(views);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    store_creation_benchmark,
    store_read_benchmark,
    store_set_state_benchmark,
    bound_fan_out_benchmark,
);
criterion_main!(benches);
