use criterion::{criterion_group, criterion_main, Criterion};
use seqmetric::{Mode, SchemeType, Seqeval};

const LABELS: [&str; 3] = ["PER", "LOC", "ORG"];

/// A synthetic batch cycling over a handful of entity shapes.
fn build_batch(sequences: usize) -> (Vec<Vec<&'static str>>, Vec<Vec<&'static str>>) {
    const REFERENCES: [&[&str]; 3] = [
        &["O", "B-PER", "I-PER", "O", "B-LOC", "O"],
        &["B-ORG", "I-ORG", "I-ORG", "O", "B-PER", "O"],
        &["O", "O", "B-LOC", "O", "O", "O"],
    ];
    const PREDICTIONS: [&[&str]; 3] = [
        &["O", "B-PER", "I-PER", "O", "O", "O"],
        &["B-ORG", "I-ORG", "O", "O", "B-PER", "O"],
        &["O", "B-LOC", "I-LOC", "O", "O", "O"],
    ];
    let references = (0..sequences)
        .map(|i| REFERENCES[i % REFERENCES.len()].to_vec())
        .collect();
    let predictions = (0..sequences)
        .map(|i| PREDICTIONS[i % PREDICTIONS.len()].to_vec())
        .collect();
    (references, predictions)
}

fn benchmark_lenient_updates(c: &mut Criterion) {
    let (references, predictions) = build_batch(1000);
    c.bench_function("lenient_update_compute", |b| {
        b.iter(|| {
            let mut metric = Seqeval::new(&LABELS).unwrap();
            metric.update(&predictions, &references).unwrap();
            metric.compute()
        })
    });
}

fn benchmark_strict_updates(c: &mut Criterion) {
    let (references, predictions) = build_batch(1000);
    c.bench_function("strict_update_compute", |b| {
        b.iter(|| {
            let mut metric = Seqeval::builder()
                .labels(LABELS)
                .scheme(SchemeType::IOB2)
                .mode(Mode::Strict)
                .build()
                .unwrap();
            metric.update(&predictions, &references).unwrap();
            metric.compute()
        })
    });
}

criterion_group!(benches, benchmark_lenient_updates, benchmark_strict_updates);
criterion_main!(benches);
