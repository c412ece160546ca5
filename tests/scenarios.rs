use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stratum::{PrioritizedSampler, SamplerConfig};

type Sampler = PrioritizedSampler<usize, f32>;

fn pool(n: usize) -> Vec<(usize, f32)> {
    (0..n).map(|i| (i, i as f32 * 0.5)).collect()
}

fn priority_of(s: &Sampler, id: usize) -> f64 {
    s.entries()
        .iter()
        .find(|e| e.item().input == id)
        .map(|e| e.priority())
        .expect("id in pool")
}

#[test]
fn uniform_pool_splits_into_equal_pairs() {
    let config = SamplerConfig::new(5).with_alpha(0.0).with_beta(0.0);
    let mut s = Sampler::new(pool(10), &config).unwrap();

    assert_eq!(s.cutpoints(), &[2, 4, 6, 8, 10]);
    assert_eq!(s.partition_sizes(), &[2; 5]);
    assert_eq!(s.importance_weights(), &[1.0; 5]);

    // Equal priorities: the later-inserted example ranks first, so partition
    // i holds examples 9 - 2i and 8 - 2i.
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..20 {
        let batch = s.sample_batch_with_rng(&mut rng);
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.weights, &[1.0; 5]);
        for (slot, &&id) in batch.inputs.iter().enumerate() {
            assert!(
                id == 9 - 2 * slot || id == 8 - 2 * slot,
                "slot {slot} drew example {id}"
            );
        }
    }
}

#[test]
fn skewed_ranks_give_the_head_a_small_partition() {
    // One partition per example, so the batch covers the whole pool.
    let config = SamplerConfig::new(10).with_alpha(0.0).with_beta(0.0);
    let mut s = Sampler::new(pool(10), &config).unwrap();
    let ids: Vec<usize> = s.sample_batch().inputs.into_iter().copied().collect();
    let priorities: Vec<f64> = ids.iter().map(|&id| id as f64).collect();
    s.update_priorities(&priorities).unwrap();

    s.repartition(2, 1.0, 0.0).unwrap();

    assert_eq!(s.cutpoints(), &[1, 10]);
    let sizes = s.partition_sizes();
    assert!(sizes[0] < sizes[1], "sizes={sizes:?}");
    assert_eq!(s.example_at(0).unwrap().input, 0);
    for pos in 0..10 {
        assert_eq!(s.priority_at(pos), Some(pos as f64));
    }
    assert_eq!(s.importance_weights(), &[1.0, 1.0]);
}

#[test]
fn priority_below_root_becomes_new_root() {
    let config = SamplerConfig::new(5).with_alpha(0.0).with_beta(0.0);
    let mut s = Sampler::new(pool(10), &config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let ids: Vec<usize> = s
        .sample_batch_with_rng(&mut rng)
        .inputs
        .into_iter()
        .copied()
        .collect();

    let root = s.priority_at(0).unwrap();
    let mut priorities = vec![root; 5];
    priorities[3] = root - 1.0;
    s.update_priorities(&priorities).unwrap();

    assert_eq!(s.example_at(0).unwrap().input, ids[3]);
    assert_eq!(s.sampled_positions().unwrap()[3], 0);
    assert!(s.check_invariants().is_ok());
}

#[test]
fn update_resolves_slots_moved_by_earlier_sifts() {
    let config = SamplerConfig::new(7).with_alpha(0.0).with_beta(0.0);
    let mut s = Sampler::new(pool(7), &config).unwrap();

    // Give position p priority p, then re-sort so physical order is settled.
    s.sample_batch();
    assert_eq!(s.sampled_positions().unwrap(), &[0, 1, 2, 3, 4, 5, 6]);
    s.update_priorities(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    s.repartition(7, 0.0, 0.0).unwrap();

    let ids: Vec<usize> = s.sample_batch().inputs.into_iter().copied().collect();
    assert_eq!(s.sampled_positions().unwrap(), &[0, 1, 2, 3, 4, 5, 6]);

    // Slot 1 sinks into index 3, pushing slot 3's example up to index 1
    // before slot 3 is processed.
    let priorities = [0.0, 100.0, 2.0, -10.0, 4.0, 5.0, 6.0];
    s.update_priorities(&priorities).unwrap();

    for (&id, &p) in ids.iter().zip(&priorities) {
        assert_eq!(priority_of(&s, id), p, "example {id}");
    }
    assert_eq!(s.example_at(0).unwrap().input, ids[3]);
    assert_eq!(s.example_at(3).unwrap().input, ids[1]);
    assert_eq!(s.sampled_positions().unwrap()[1], 3);
    assert!(s.check_invariants().is_ok());
}

#[test]
fn epoch_loop_keeps_invariants() {
    let config = SamplerConfig::new(16).with_alpha(0.7).with_beta(0.5);
    let mut s = Sampler::new(pool(500), &config).unwrap().with_seed(17);
    let mut rng = ChaCha8Rng::seed_from_u64(99);

    for _epoch in 0..3 {
        for _ in 0..s.batches_per_epoch() {
            let n = s.sample_batch().len();
            let priorities: Vec<f64> = (0..n)
                .map(|_| -rand::Rng::random_range(&mut rng, 0.0..10.0))
                .collect();
            s.update_priorities(&priorities).unwrap();
            assert!(s.check_invariants().is_ok());
        }
        s.repartition(16, 0.7, 0.5).unwrap();
        assert!(s.check_invariants().is_ok());
        let w = s.importance_weights();
        assert!(w.windows(2).all(|p| p[0] <= p[1] + 1e-12), "weights={w:?}");
    }
}
