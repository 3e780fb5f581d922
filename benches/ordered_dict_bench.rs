use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rt_collections::OrderedDict;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("ordered_dict_insert_10k", |b| {
        b.iter_batched(
            || {
                let keys: Vec<_> = lcg(1).take(10_000).map(key).collect();
                (OrderedDict::<String, u64>::new(), keys)
            },
            |(mut d, keys)| {
                for (i, k) in keys.into_iter().enumerate() {
                    d.set(k, i as u64);
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("ordered_dict_get_hit", |b| {
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        let d: OrderedDict<String, u64> = keys
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, k)| (k, i as u64))
            .collect();
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(d.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("ordered_dict_get_miss", |b| {
        let d: OrderedDict<String, u64> = lcg(11)
            .take(10_000)
            .enumerate()
            .map(|(i, x)| (key(x), i as u64))
            .collect();
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generate keys unlikely in map
            let k = key(miss.next().unwrap());
            black_box(d.get(&k));
        })
    });
}

fn bench_delete_reinsert_churn(c: &mut Criterion) {
    c.bench_function("ordered_dict_delete_reinsert_1k_of_10k", |b| {
        b.iter_batched(
            || {
                let keys: Vec<_> = lcg(3).take(10_000).map(key).collect();
                let d: OrderedDict<String, u64> =
                    keys.iter().cloned().map(|k| (k, 0)).collect();
                (d, keys)
            },
            |(mut d, keys)| {
                for k in keys.iter().step_by(10) {
                    let v = d.pop(k).unwrap();
                    d.set(k.clone(), v + 1);
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_move_to_end(c: &mut Criterion) {
    c.bench_function("ordered_dict_move_to_end", |b| {
        let keys: Vec<_> = lcg(5).take(1_000).map(key).collect();
        let mut d: OrderedDict<String, u64> = keys.iter().cloned().map(|k| (k, 0)).collect();
        let mut it = keys.iter().cycle();
        let mut last = false;
        b.iter(|| {
            last = !last;
            d.move_to_end(it.next().unwrap(), last).unwrap();
        })
    });
}

fn bench_iterate(c: &mut Criterion) {
    c.bench_function("ordered_dict_iterate_10k", |b| {
        let mut d: OrderedDict<String, u64> = lcg(13)
            .take(12_000)
            .enumerate()
            .map(|(i, x)| (key(x), i as u64))
            .collect();
        let doomed: Vec<String> = d.keys().step_by(6).cloned().collect();
        for k in &doomed {
            d.delete(k).unwrap();
        }
        b.iter(|| black_box(d.values().sum::<u64>()))
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
    targets = bench_insert, bench_get_hit, bench_get_miss, bench_delete_reinsert_churn,
        bench_move_to_end, bench_iterate
}
criterion_main!(benches);
