use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use heart_classifier::preprocessing::Dataset;
use heart_classifier::schema::FeatureSchema;
use heart_classifier::tracking::NoopTracker;
use heart_classifier::training::{CandidateRegistry, SearchEngine, TrainingConfig};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_dataset(n_rows: usize) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let schema = FeatureSchema::standard();

    let target = Array1::from_shape_fn(n_rows, |i| (i % 2) as f64);
    let features = Array2::from_shape_fn((n_rows, schema.len()), |(r, c)| {
        rng.gen::<f64>() * 10.0 + target[r] * (c % 3) as f64
    });

    Dataset::new(features, target, schema).unwrap()
}

fn bench_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    group.sample_size(10);

    let registry = CandidateRegistry::standard(42);
    let engine = SearchEngine::new(TrainingConfig::new()).unwrap();

    for n_rows in [100, 300].iter() {
        let data = create_dataset(*n_rows);
        for candidate in registry.iter() {
            group.bench_with_input(
                BenchmarkId::new(candidate.name.as_str(), n_rows),
                &data,
                |b, data| b.iter(|| engine.evaluate(black_box(data), candidate, &NoopTracker, "bench").unwrap()),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_candidates);
criterion_main!(benches);
