use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rt_collections::index_table::IndexTable;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// Fill to just under the two-thirds load the dict allows.
fn filled(num_slots: usize, seed: u64) -> (IndexTable, Vec<u64>) {
    let mut t = IndexTable::with_slots(num_slots);
    let hashes: Vec<u64> = lcg(seed).take(num_slots * 2 / 3 - 1).collect();
    for (offset, &h) in hashes.iter().enumerate() {
        let slot = t.find_insert_slot(h);
        t.set_valid(slot, offset);
    }
    (t, hashes)
}

fn bench_find_by_width(c: &mut Criterion) {
    for (name, slots) in [
        ("index_table_find_byte_256", 256),
        ("index_table_find_short_64k", 1 << 16),
        ("index_table_find_int_256k", 1 << 18),
    ] {
        c.bench_function(name, |b| {
            let (t, hashes) = filled(slots, 17);
            let mut it = hashes.iter().enumerate().cycle();
            b.iter(|| {
                let (offset, &h) = it.next().unwrap();
                black_box(t.find(h, |o| o == offset))
            })
        });
    }
}

fn bench_tombstone_chains(c: &mut Criterion) {
    c.bench_function("index_table_find_through_tombstones", |b| {
        let (mut t, hashes) = filled(1 << 12, 23);
        for (offset, &h) in hashes.iter().enumerate().step_by(2) {
            if let Some(slot) = t.find_slot_of(h, offset) {
                t.set_deleted(slot);
            }
        }
        let mut it = hashes.iter().enumerate().skip(1).step_by(2).cycle();
        b.iter(|| {
            let (offset, &h) = it.next().unwrap();
            black_box(t.find_slot_of(h, offset))
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_find_by_width, bench_tombstone_chains
}
criterion_main!(benches);
