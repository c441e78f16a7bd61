//! Evaluator step-loop throughput, grounded on the teacher's own
//! `[[bench]] name = "main"` criterion bench. No cross-language comparison
//! baseline is bundled (nothing to compare against).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ren_core::resource::NoLimitTracker;
use ren_core::tracer::NoopTracer;
use ren_core::Interpreter;

fn bench_arithmetic_chain(c: &mut Criterion) {
    c.bench_function("arithmetic_chain", |b| {
        b.iter(|| {
            let mut interp = Interpreter::startup(NoLimitTracker::default(), NoopTracer).expect("boot");
            let value = interp.evaluate("1 + 2 * 3 + 4 * 5 + 6 * 7 + 8 * 9").expect("evaluate");
            black_box(value);
        });
    });
}

fn bench_recursive_func(c: &mut Criterion) {
    c.bench_function("recursive_func_factorial", |b| {
        b.iter(|| {
            let mut interp = Interpreter::startup(NoLimitTracker::default(), NoopTracer).expect("boot");
            let value = interp
                .evaluate("f: func [n] [if n = 0 [return 1] n * f n - 1]\nf 10")
                .expect("evaluate");
            black_box(value);
        });
    });
}

fn bench_reduce_invisible(c: &mut Criterion) {
    c.bench_function("reduce_with_invisible_elements", |b| {
        b.iter(|| {
            let mut interp = Interpreter::startup(NoLimitTracker::default(), NoopTracer).expect("boot");
            let value = interp
                .evaluate("reduce [1 comment \"a\" 2 elide 3 comment \"b\" 4]")
                .expect("evaluate");
            black_box(value);
        });
    });
}

criterion_group!(benches, bench_arithmetic_chain, bench_recursive_func, bench_reduce_invisible);
criterion_main!(benches);
