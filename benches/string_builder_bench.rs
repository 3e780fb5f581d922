use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rt_collections::StringBuilder;
use std::time::Duration;

fn bench_small_appends(c: &mut Criterion) {
    c.bench_function("string_builder_append_10k_words", |b| {
        b.iter(|| {
            let mut sb = StringBuilder::new(0);
            for _ in 0..10_000 {
                sb.append("word ").unwrap();
            }
            black_box(sb.into_string())
        })
    });
}

fn bench_append_char(c: &mut Criterion) {
    c.bench_function("string_builder_append_char_100k", |b| {
        b.iter(|| {
            let mut sb = StringBuilder::new(16);
            for i in 0..100_000u32 {
                sb.append_char(if i % 7 == 0 { 'é' } else { 'a' }).unwrap();
            }
            black_box(sb.into_string())
        })
    });
}

fn bench_adopt_large(c: &mut Criterion) {
    let chunk = "x".repeat(64 * 1024);
    c.bench_function("string_builder_adopt_64k_x16", |b| {
        b.iter(|| {
            let mut sb = StringBuilder::new(0);
            for _ in 0..16 {
                sb.append_string(chunk.clone()).unwrap();
                sb.append_char('\n').unwrap();
            }
            black_box(sb.into_string())
        })
    });
}

fn bench_vs_string_push(c: &mut Criterion) {
    c.bench_function("std_string_push_str_10k_words", |b| {
        b.iter(|| {
            let mut s = String::new();
            for _ in 0..10_000 {
                s.push_str("word ");
            }
            black_box(s)
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
    targets = bench_small_appends, bench_append_char, bench_adopt_large, bench_vs_string_push
}
criterion_main!(benches);
