use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, criterion_group, criterion_main};
use lanefall_chart::{ChartSource, validate};

fn synthetic_chart(events: usize, keys: usize) -> String {
    let mut text = format!("[Difficulty]\nCircleSize:{keys}\n\n[HitObjects]\n");
    let width = 512 / keys;
    for i in 0..events {
        let column = (i % keys) * width + width / 2;
        text.push_str(&format!("{column},192,{},1,0,0:0:0:0:\n", i * 125));
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let chart = synthetic_chart(10_000, 7);

    c.bench_function("parse_10k_events", |b| {
        b.iter(|| {
            let source = ChartSource::from_text(black_box(&chart)).unwrap();
            source.filter_map(Result::ok).count()
        })
    });

    c.bench_function("validate_10k_events", |b| {
        b.iter(|| validate(Cursor::new(black_box(chart.as_bytes()))).unwrap())
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
