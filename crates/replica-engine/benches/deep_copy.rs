use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use replica_engine::object::Class;
use replica_engine::{Runtime, Value};

fn wide_sequence(len: usize) -> (Runtime, Value) {
    let mut rt = Runtime::new();
    let elements = (0..len).map(|i| Value::i64(i as i64)).collect();
    let slice = rt.alloc_slice(elements);
    (rt, slice)
}

/// Ring of `len` pointers, the last pointing back at the first
fn pointer_ring(len: usize) -> (Runtime, Value) {
    let mut rt = Runtime::new();
    let head = rt.alloc_ptr(Value::Nil);
    let mut prev = head.clone();
    for _ in 1..len {
        let next = rt.alloc_ptr(Value::Nil);
        rt.store(&prev, next.clone()).unwrap();
        prev = next;
    }
    rt.store(&prev, head.clone()).unwrap();
    (rt, head)
}

/// Map whose values all point at a handful of shared records
fn shared_map(entries: usize) -> (Runtime, Value) {
    let mut rt = Runtime::new();
    let class = rt.register_class(Class::new("Item").with_field("id").with_hidden_field("tag"));
    let targets: Vec<Value> = (0..8)
        .map(|i| {
            let record = rt
                .instantiate(class, vec![Value::i64(i), Value::str("tag")])
                .unwrap();
            rt.alloc_ptr(record)
        })
        .collect();
    let map = rt.alloc_map((0..entries).map(|i| (Value::i64(i as i64), targets[i % 8].clone())));
    (rt, map)
}

fn bench_wide_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_sequence");
    for len in [16usize, 1024, 16 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter_batched(
                || wide_sequence(len),
                |(mut rt, slice)| rt.deep_copy(black_box(&slice)).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_pointer_ring(c: &mut Criterion) {
    c.bench_function("pointer_ring_1000", |b| {
        b.iter_batched(
            || pointer_ring(1000),
            |(mut rt, head)| rt.deep_copy(black_box(&head)).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn bench_shared_map(c: &mut Criterion) {
    c.bench_function("shared_map_4096", |b| {
        b.iter_batched(
            || shared_map(4096),
            |(mut rt, map)| rt.deep_copy(black_box(&map)).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_wide_sequence, bench_pointer_ring, bench_shared_map);
criterion_main!(benches);
