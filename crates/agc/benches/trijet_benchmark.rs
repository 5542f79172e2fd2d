use std::time::Duration;

use agc::{
    classify, compare_all_fields, create_histograms, data::to_columns, reconstruct_trijet_mass,
    AnalysisOptions, Electron, Event, EventBatch, InMemorySource, Jet, Muon, SampleMetadata,
    Value,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn random_event(rng: &mut fastrand::Rng) -> Event {
    let n_jets = rng.usize(2..10);
    let jets = (0..n_jets)
        .map(|_| Jet {
            pt: 25.0 + 150.0 * rng.f64(),
            eta: 5.0 * rng.f64() - 2.5,
            phi: 6.2 * rng.f64() - 3.1,
            mass: 3.0 + 15.0 * rng.f64(),
            btag_csvv2: rng.f64(),
            jet_id: 6,
        })
        .collect();
    let muons = (0..rng.usize(0..2))
        .map(|_| Muon {
            pt: 20.0 + 60.0 * rng.f64(),
            eta: 4.0 * rng.f64() - 2.0,
            phi: 6.2 * rng.f64() - 3.1,
            mass: 0.10566,
            tight_id: rng.bool(),
            sip3d: 5.0 * rng.f64(),
            pf_rel_iso04_all: 0.3 * rng.f64(),
        })
        .collect();
    let electrons = (0..rng.usize(0..2))
        .map(|_| Electron {
            pt: 20.0 + 60.0 * rng.f64(),
            eta: 4.0 * rng.f64() - 2.0,
            phi: 6.2 * rng.f64() - 3.1,
            mass: 0.000511,
            cut_based: rng.i32(0..=4),
            sip3d: 5.0 * rng.f64(),
        })
        .collect();
    Event {
        electrons,
        muons,
        jets,
    }
}

fn random_batch(n_events: usize, seed: u64) -> EventBatch {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..n_events).map(|_| random_event(&mut rng)).collect()
}

fn trijet_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Trijet Reconstruction");
    for n_events in [1_000, 10_000, 100_000] {
        let batch = random_batch(n_events, 0);
        let jets = batch.jets();
        group.bench_with_input(BenchmarkId::new("m_bjj", n_events), &jets, |b, jets| {
            b.iter(|| black_box(reconstruct_trijet_mass(jets)))
        });
        let metadata = SampleMetadata::new("ttbar", "nominal");
        let options = AnalysisOptions::default();
        group.bench_with_input(
            BenchmarkId::new("histograms", n_events),
            &batch,
            |b, batch| b.iter(|| black_box(create_histograms(batch, &metadata, &options))),
        );
    }
    group.finish();
}

fn comparison_benchmark(c: &mut Criterion) {
    let batch = random_batch(50_000, 1);
    let columns = to_columns(&batch);
    let left = InMemorySource::new(columns.clone())
        .unwrap()
        .with_cluster_size(1_000);
    let right = InMemorySource::new(columns.clone())
        .unwrap()
        .with_cluster_size(4_096);
    let fields: Vec<String> = columns.keys().cloned().collect();
    let mut group = c.benchmark_group("NaN-aware Comparison");
    group.bench_function("all fields", |b| {
        b.iter(|| black_box(compare_all_fields(&fields, &left, &right)))
    });
    let jet_pt = Value::List(columns["Jet_pt"].clone());
    group.bench_function("single column", |b| {
        b.iter(|| black_box(classify(&jet_pt, &jet_pt)))
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10)).sample_size(50);
    targets = trijet_benchmark, comparison_benchmark
}
criterion_main!(benches);
