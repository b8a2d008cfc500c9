use coinbank_core::decoder::{decode, decode_weight};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Instant;

// Mix of the line shapes the firmware prints, plus boot chatter.
fn synth_lines(n: usize, seed: u32) -> Vec<String> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    (0..n)
        .map(|i| {
            let mg = next() % 50_000;
            match i % 4 {
                0 => format!("{}.{:03}g", mg / 1000, mg % 1000),
                1 => format!("Weight: {}.{:03}g|stable", mg / 1000, mg % 1000),
                2 => format!("reading {}.{:03}", mg / 1000, mg % 1000),
                _ => "HX711 calibrating...".to_string(),
            }
        })
        .collect()
}

pub fn bench_decode(c: &mut Criterion) {
    let mut g = c.benchmark_group("decoder");
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(1));
    }
    let lines = synth_lines(1024, 0xC01B);
    let at = Instant::now();

    g.bench_function("unit_marker", |b| {
        b.iter(|| decode(black_box("12.345g"), at))
    });
    g.bench_function("regex_fallback", |b| {
        b.iter(|| decode(black_box("reading 12.345 stable"), at))
    });
    g.bench_function("mixed_stream", |b| {
        b.iter(|| {
            let mut ok = 0usize;
            for l in &lines {
                if decode_weight(black_box(l), at).is_ok() {
                    ok += 1;
                }
            }
            ok
        })
    });
    g.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
