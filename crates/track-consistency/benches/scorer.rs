use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::*;
use rand::prelude::*;
use rand_pcg::Pcg32;
use track_consistency::*;

/// 256x256 ground truth with a few rectangular objects drifting to the right.
fn ground_truth(frames: usize) -> GroundTruthSequence {
    let frames = (0..frames)
        .map(|index| {
            let mut labels = Array2::<u32>::zeros((256, 256));
            for object in 0..4usize {
                let x = (20 + object * 50 + index) % 200;
                let y = 30 + object * 40;
                labels.slice_mut(s![y..y + 30, x..x + 40]).fill(object as u32 + 1);
            }
            GroundTruthFrame::from_labels(&labels)
        })
        .collect();
    GroundTruthSequence::new(frames).unwrap()
}

fn prediction(frames: usize, points: usize) -> Prediction {
    let mut rng = Pcg32::seed_from_u64(0);
    let values = (0..frames * points)
        .flat_map(|_| [rng.gen_range(-10.0..346.0), rng.gen_range(-10.0..346.0), 1.0])
        .collect();
    Prediction::from_shape_vec(&[frames, points, 3], values).unwrap()
}

fn score_video_benchmark(c: &mut Criterion) {
    let ground_truth = ground_truth(24);
    let prediction = prediction(24, 256);
    let config = ScorerConfig::default();

    c.bench_function("score_video 24x256", |b| {
        b.iter(|| {
            score_video(
                "bench",
                black_box(&prediction),
                black_box(&ground_truth),
                &config,
            )
            .unwrap()
        })
    });
}

fn radius_search_benchmark(c: &mut Criterion) {
    let ground_truth = ground_truth(1);
    let frame = ground_truth.get(0).unwrap();
    let mapper = CoordinateMapper::new(336, 336, 256, 256);
    let table = RadiusTable::default();
    let evaluator = ConsistencyEvaluator::new(&mapper, &table);
    let identity = Identity::from_object_id(1);

    c.bench_function("radius_search miss", |b| {
        b.iter(|| evaluator.radius_search(black_box(128), black_box(250), identity, frame))
    });
}

criterion_group!(benches, score_video_benchmark, radius_search_benchmark);
criterion_main!(benches);
