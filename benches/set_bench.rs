use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rc_collections::{ByteStr, Map, RcStr, Set};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> RcStr {
    RcStr::format(format_args!("k{:016x}", n))
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("set_insert_10k", |b| {
        let keys: Vec<_> = lcg(1).take(10_000).map(key).collect();
        b.iter_batched(
            || Set::new(ByteStr::<RcStr>::new()),
            |mut s| {
                for k in &keys {
                    s.insert(k.copy());
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_exists_hit(c: &mut Criterion) {
    c.bench_function("set_exists_hit", |b| {
        let mut s = Set::new(ByteStr::<RcStr>::new());
        let keys: Vec<_> = lcg(7).take(10_000).map(key).collect();
        for k in &keys {
            s.insert(k.copy());
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(s.exists(k));
        })
    });
}

fn bench_exists_miss(c: &mut Criterion) {
    c.bench_function("set_exists_miss", |b| {
        let mut s = Set::new(ByteStr::<RcStr>::new());
        for x in lcg(11).take(10_000) {
            s.insert(key(x));
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            let k = key(miss.next().unwrap());
            black_box(s.exists(&k));
        })
    });
}

fn bench_scoped_lookup(c: &mut Criterion) {
    c.bench_function("map_lookup_depth_4", |b| {
        let mut root: Map<RcStr, u64, _> = Map::new(ByteStr::new());
        let keys: Vec<_> = lcg(3).take(4_000).map(key).collect();
        let mut node = &mut root;
        for chunk in keys.chunks(1_000) {
            for (i, k) in chunk.iter().enumerate() {
                node.insert(k.copy(), i as u64);
            }
            node = node.create_sub_map();
        }
        let mut it = keys.iter().rev().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(root.value(k));
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
    targets = bench_insert, bench_exists_hit, bench_exists_miss, bench_scoped_lookup
}
criterion_main!(benches);
