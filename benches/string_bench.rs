use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rc_collections::{one_at_a_time, RcStr};
use std::time::Duration;

fn bench_hash(c: &mut Criterion) {
    let short = RcStr::new("identifier");
    let long = RcStr::from_fn(4096, |i| b'a' + (i % 26) as u8);
    c.bench_function("rcstr_hash_short", |b| {
        b.iter(|| black_box(short.content_hash()))
    });
    c.bench_function("rcstr_hash_4k", |b| {
        b.iter(|| black_box(one_at_a_time(black_box(long.as_bytes()))))
    });
}

fn bench_copy_release(c: &mut Criterion) {
    c.bench_function("rcstr_copy_release", |b| {
        let s = RcStr::new("shared");
        b.iter(|| {
            let x = s.copy();
            black_box(&x);
            x.release()
        })
    });
}

fn bench_copy_on_write(c: &mut Criterion) {
    c.bench_function("rcstr_lower_in_place_shared", |b| {
        let s = RcStr::new("Mixed Case Content");
        b.iter(|| {
            let mut x = s.copy();
            x.to_lower_in_place();
            black_box(x)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_hash, bench_copy_release, bench_copy_on_write
}
criterion_main!(benches);
