use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stratum::partition::{find_cutpoints, rank_probabilities};
use stratum::{PrioritizedSampler, SamplerConfig};

fn pool(n: usize) -> impl Iterator<Item = (Vec<f32>, Vec<f32>)> {
    (0..n).map(|i| (vec![i as f32; 4], vec![1.0]))
}

fn bench_cutpoints(c: &mut Criterion) {
    let mut group = c.benchmark_group("cutpoints");
    let sizes = [1_000, 10_000, 100_000];
    let k = 64;

    for &size in &sizes {
        let probs = rank_probabilities(size, 0.7).expect("alpha ok");
        group.bench_function(format!("n{}_k{}", size, k), |b| {
            b.iter(|| {
                black_box(find_cutpoints(black_box(&probs), k));
            })
        });
    }
    group.finish();
}

fn bench_repartition(c: &mut Criterion) {
    let mut group = c.benchmark_group("repartition");
    let sizes = [1_000, 10_000, 100_000];
    let k = 64;

    for &size in &sizes {
        let config = SamplerConfig::new(k);
        let mut sampler = PrioritizedSampler::new(pool(size), &config).expect("config ok");
        group.bench_function(format!("n{}_k{}", size, k), |b| {
            b.iter(|| {
                sampler.repartition(k, 0.7, 0.5).expect("config ok");
            })
        });
    }
    group.finish();
}

fn bench_sample_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_update");
    let sizes = [10_000, 100_000];
    let k = 64;

    for &size in &sizes {
        let config = SamplerConfig::new(k);
        let mut sampler = PrioritizedSampler::new(pool(size), &config).expect("config ok");
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut priorities = vec![0.0f64; k];

        group.bench_function(format!("sample_n{}_k{}", size, k), |b| {
            b.iter(|| {
                black_box(sampler.sample_batch_with_rng(&mut rng).len());
            })
        });

        group.bench_function(format!("sample_update_n{}_k{}", size, k), |b| {
            b.iter(|| {
                sampler.sample_batch_with_rng(&mut rng);
                for p in &mut priorities {
                    *p = -rng.random_range(0.0..10.0);
                }
                sampler
                    .update_priorities(black_box(&priorities))
                    .expect("one per slot");
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cutpoints,
    bench_repartition,
    bench_sample_update
);
criterion_main!(benches);
