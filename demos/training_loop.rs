//! Prioritized SGD on a toy regression problem.
//!
//! Fits `y = w * x` where a handful of examples are outliers. After the first
//! epoch the outliers carry the largest losses, so they rank first and are
//! drawn far more often than the rest; the importance weights scale their
//! gradient contribution back down.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stratum::{PrioritizedSampler, SamplerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n = 1_000usize;
    let examples: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let x = i as f64 / n as f64;
            let y = if i % 100 == 0 { 10.0 * x } else { 3.0 * x };
            (x, y)
        })
        .collect();

    let batch_size = 32;
    let config = SamplerConfig::new(batch_size)
        .with_alpha(0.7)
        .with_beta(0.5);
    let mut sampler = PrioritizedSampler::new(examples, &config)?;
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let mut w = 0.0f64;
    let lr = 0.5;
    for epoch in 0..5 {
        let mut epoch_loss = 0.0;
        for _ in 0..sampler.batches_per_epoch() {
            let batch = sampler.sample_batch_with_rng(&mut rng);
            let mut grad = 0.0;
            let mut losses = Vec::with_capacity(batch.len());
            for ((&&x, &&y), &iw) in batch.inputs.iter().zip(&batch.targets).zip(batch.weights) {
                let err = w * x - y;
                losses.push(err * err);
                grad += iw * 2.0 * err * x;
            }
            w -= lr * grad / batch.len() as f64;
            epoch_loss += losses.iter().sum::<f64>();

            let priorities: Vec<f64> = losses.iter().map(|l| -l).collect();
            sampler.update_priorities(&priorities)?;
        }
        sampler.repartition(batch_size, 0.7, 0.5)?;

        let top = sampler.example_at(0).map(|e| e.input).unwrap_or_default();
        println!(
            "epoch {epoch}: w={w:.4} loss={:.4} top-ranked x={top:.3} smallest weight={:.3}",
            epoch_loss / n as f64,
            sampler.importance_weights()[0],
        );
    }

    Ok(())
}
