//! Compares the cost of invoking and cloning the different kinds of `Callable` target.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use inline_fn::Callable;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn add_one(x: u64) -> u64 {
    x.wrapping_add(1)
}

struct Adder {
    amount: u64,
}

impl Adder {
    fn add(&self, x: u64) -> u64 {
        x.wrapping_add(self.amount)
    }
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("inline_fn_call");

    let function = Callable::<u64, u64>::from_fn(add_one);
    group.bench_function("function", |b| {
        b.iter(|| black_box(function.call(black_box(1))));
    });

    let amount = 7_u64;
    let closure = Callable::<u64, u64>::from_closure(move |x: u64| x.wrapping_add(amount));
    group.bench_function("closure", |b| {
        b.iter(|| black_box(closure.call(black_box(1))));
    });

    let shared = Callable::<u64, u64>::from_shared_method(Arc::new(Adder { amount: 7 }), Adder::add);
    group.bench_function("shared_method", |b| {
        b.iter(|| black_box(shared.call(black_box(1))));
    });

    let boxed: Box<dyn Fn(u64) -> u64> = Box::new(move |x: u64| x.wrapping_add(amount));
    group.bench_function("boxed_dyn_fn", |b| {
        b.iter(|| black_box(boxed(black_box(1))));
    });

    group.finish();

    let mut group = c.benchmark_group("inline_fn_clone");

    group.bench_function("closure", |b| {
        b.iter(|| black_box(closure.clone()));
    });

    group.bench_function("shared_method", |b| {
        b.iter(|| black_box(shared.clone()));
    });

    group.finish();
}
