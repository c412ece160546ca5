//! Stratified prioritized sampler.
//!
//! Holds a fixed pool of examples in a [`PriorityHeap`]. [`repartition`]
//! sorts the pool by priority and cuts the ranking into `batch_size`
//! equal-mass segments ([`find_cutpoints`]). [`sample_batch`] draws one
//! example uniformly from each segment and returns it with the segment's
//! importance weight. [`update_priorities`] writes back one new priority per
//! slot of that batch and repairs heap order.
//!
//! Segments are only recomputed by [`repartition`]. Between calls the heap
//! contents drift under updates while the cutpoints stay put; refreshing them
//! (typically once per epoch) is the caller's job.
//!
//! ```
//! use stratum::{PrioritizedSampler, SamplerConfig};
//!
//! let pool = (0..100).map(|i| (vec![i as f32], vec![(i % 2) as f32]));
//! let config = SamplerConfig::new(8).with_alpha(0.7).with_beta(0.5);
//! let mut sampler = PrioritizedSampler::new(pool, &config)?.with_seed(7);
//!
//! for _epoch in 0..2 {
//!     for _ in 0..sampler.batches_per_epoch() {
//!         let batch = sampler.sample_batch();
//!         assert_eq!(batch.len(), 8);
//!         // Train on `batch`; use the negated per-example losses as priorities.
//!         let losses: Vec<f64> = batch.inputs.iter().map(|x| x[0] as f64).collect();
//!         let priorities: Vec<f64> = losses.iter().map(|l| -l).collect();
//!         sampler.update_priorities(&priorities)?;
//!     }
//!     sampler.repartition(8, 0.7, 0.5)?;
//! }
//! # Ok::<(), stratum::SamplerError>(())
//! ```
//!
//! [`repartition`]: PrioritizedSampler::repartition
//! [`sample_batch`]: PrioritizedSampler::sample_batch
//! [`update_priorities`]: PrioritizedSampler::update_priorities

use rand::prelude::*;
use tracing::{debug, trace};

use crate::config::{validate_partitioning, SamplerConfig};
use crate::error::{InvariantError, SamplerError};
use crate::heap::{HeapEntry, PositionTracker, PriorityHeap};
use crate::partition::{find_cutpoints, importance_weights, partition_sizes, rank_probabilities};

/// A stored `(input, target)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Example<X, Y> {
    /// Model input.
    pub input: X,
    /// Training target.
    pub target: Y,
}

/// One sampled minibatch. Slot `i` comes from partition `i`.
#[derive(Debug, Clone)]
pub struct Batch<'a, X, Y> {
    /// Inputs, one per slot.
    pub inputs: Vec<&'a X>,
    /// Targets, one per slot.
    pub targets: Vec<&'a Y>,
    /// Importance weight per slot (max 1).
    pub weights: &'a [f64],
}

impl<X, Y> Batch<'_, X, Y> {
    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the batch has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Rank-stratified prioritized sampler over a fixed example pool.
///
/// Not synchronized: `sample_batch` and `update_priorities` both mutate the
/// heap and the sampled-slot table, so a shared instance needs one exclusive
/// owner or an external lock.
#[derive(Debug, Clone)]
pub struct PrioritizedSampler<X, Y> {
    heap: PriorityHeap<Example<X, Y>>,
    batch_size: usize,
    alpha: f64,
    beta: f64,
    cutpoints: Vec<usize>,
    partition_sizes: Vec<usize>,
    importance_weights: Vec<f64>,
    /// Heap index per slot of the last batch.
    sampled: Option<Vec<usize>>,
    rng: Option<StdRng>,
}

impl<X, Y> PrioritizedSampler<X, Y> {
    /// Load `examples` at `config.initial_priority` and partition them.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid for the pool (see
    /// [`SamplerConfig::validate`]) or `alpha` collapses the rank
    /// distribution.
    pub fn new<I>(examples: I, config: &SamplerConfig) -> Result<Self, SamplerError>
    where
        I: IntoIterator<Item = (X, Y)>,
    {
        let examples: Vec<(X, Y)> = examples.into_iter().collect();
        config.validate(examples.len())?;

        let priority = config.initial_priority;
        let heap = PriorityHeap::from_items(
            examples
                .into_iter()
                .map(|(input, target)| (Example { input, target }, priority)),
        );
        debug!(
            pool_size = heap.len(),
            batch_size = config.batch_size,
            initial_priority = priority,
            "built prioritized sampler"
        );

        let mut sampler = Self {
            heap,
            batch_size: config.batch_size,
            alpha: config.alpha,
            beta: config.beta,
            cutpoints: Vec::new(),
            partition_sizes: Vec::new(),
            importance_weights: Vec::new(),
            sampled: None,
            rng: None,
        };
        sampler.repartition(config.batch_size, config.alpha, config.beta)?;
        Ok(sampler)
    }

    /// Draw from a seeded RNG instead of the thread RNG in
    /// [`sample_batch`](Self::sample_batch).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Sort the pool by priority and recompute partitions and weights.
    ///
    /// The sort keeps the heap invariant (a sorted array is a heap) and makes
    /// physical index equal rank. It also relocates entries, so the
    /// sampled-slot table is cleared: call [`sample_batch`](Self::sample_batch)
    /// before the next [`update_priorities`](Self::update_priorities).
    ///
    /// # Errors
    ///
    /// Rejects `batch_size == 0`, `batch_size > len()`, `alpha < 0`,
    /// `beta` outside `[0, 1]`, and an `alpha` under which the lowest rank
    /// has zero probability. Nothing is modified on error.
    pub fn repartition(
        &mut self,
        batch_size: usize,
        alpha: f64,
        beta: f64,
    ) -> Result<(), SamplerError> {
        let n = self.heap.len();
        validate_partitioning(n, batch_size, alpha, beta)?;
        let probs = rank_probabilities(n, alpha)?;

        self.heap.sort_in_place();
        let cutpoints = find_cutpoints(&probs, batch_size);
        let sizes = partition_sizes(&cutpoints);
        let weights = importance_weights(&sizes, n, beta);

        debug!(
            batch_size,
            alpha,
            beta,
            smallest_partition = sizes.iter().copied().min().unwrap_or(0),
            largest_partition = sizes.iter().copied().max().unwrap_or(0),
            smallest_weight = weights.iter().copied().fold(f64::INFINITY, f64::min),
            "repartitioned"
        );

        self.batch_size = batch_size;
        self.alpha = alpha;
        self.beta = beta;
        self.cutpoints = cutpoints;
        self.partition_sizes = sizes;
        self.importance_weights = weights;
        self.sampled = None;
        Ok(())
    }

    /// Draw one example per partition.
    ///
    /// Uses the seeded RNG if [`with_seed`](Self::with_seed) was called,
    /// otherwise `rand::rng()`.
    pub fn sample_batch(&mut self) -> Batch<'_, X, Y> {
        match self.rng.take() {
            Some(mut rng) => {
                self.draw_positions(&mut rng);
                self.rng = Some(rng);
            }
            None => self.draw_positions(&mut rand::rng()),
        }
        self.current_batch()
    }

    /// Draw one example per partition using a caller-supplied RNG.
    pub fn sample_batch_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Batch<'_, X, Y> {
        self.draw_positions(rng);
        self.current_batch()
    }

    /// Replace the priorities of the last batch's examples, one per slot.
    ///
    /// Slots are applied in order. Each sift may relocate examples that later
    /// slots still refer to, so every slot's current position is resolved
    /// through a [`PositionTracker`] rather than the index recorded at
    /// sampling time. The final positions are remembered, so a further call
    /// before the next batch again targets the same examples.
    ///
    /// # Errors
    ///
    /// - [`SamplerError::NoBatchSampled`] if no batch was drawn since
    ///   construction or the last repartition.
    /// - [`SamplerError::SlotCountMismatch`] unless exactly one priority per
    ///   slot is given.
    /// - [`SamplerError::NonFinitePriority`] for NaN or infinite values.
    ///
    /// Nothing is modified on error.
    pub fn update_priorities(&mut self, priorities: &[f64]) -> Result<(), SamplerError> {
        let positions = self.sampled.as_ref().ok_or(SamplerError::NoBatchSampled)?;
        if priorities.len() != positions.len() {
            return Err(SamplerError::SlotCountMismatch {
                expected: positions.len(),
                got: priorities.len(),
            });
        }
        if let Some((slot, &priority)) = priorities
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite())
        {
            return Err(SamplerError::NonFinitePriority { slot, priority });
        }

        let mut tracker = PositionTracker::new(positions.iter().copied());
        for (slot, &priority) in priorities.iter().enumerate() {
            let from = tracker.position(slot);
            let to = self.heap.set_priority(from, priority, &mut tracker);
            debug_assert_eq!(to, tracker.position(slot));
            trace!(slot, from, to, priority, "priority updated");
        }
        self.sampled = Some(tracker.into_positions());
        Ok(())
    }

    /// Number of examples in the pool.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Always `false`: construction rejects an empty pool.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Examples per batch (= number of partitions).
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rank exponent of the current partitioning.
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Importance-sampling exponent of the current weights.
    #[inline]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// `sample_batch` calls per pass over the pool: `ceil(len / batch_size)`.
    #[inline]
    pub fn batches_per_epoch(&self) -> usize {
        self.heap.len().div_ceil(self.batch_size)
    }

    /// Exclusive end of each partition, in heap-index space.
    #[inline]
    pub fn cutpoints(&self) -> &[usize] {
        &self.cutpoints
    }

    /// Number of examples in each partition.
    #[inline]
    pub fn partition_sizes(&self) -> &[usize] {
        &self.partition_sizes
    }

    /// Importance weight of each partition.
    #[inline]
    pub fn importance_weights(&self) -> &[f64] {
        &self.importance_weights
    }

    /// Heap index per slot of the last batch, if one is pending.
    #[inline]
    pub fn sampled_positions(&self) -> Option<&[usize]> {
        self.sampled.as_deref()
    }

    /// Priority of the entry at heap index `index`.
    #[inline]
    pub fn priority_at(&self, index: usize) -> Option<f64> {
        self.heap.get(index).map(HeapEntry::priority)
    }

    /// Example at heap index `index`.
    #[inline]
    pub fn example_at(&self, index: usize) -> Option<&Example<X, Y>> {
        self.heap.get(index).map(HeapEntry::item)
    }

    /// All heap entries in physical order.
    #[inline]
    pub fn entries(&self) -> &[HeapEntry<Example<X, Y>>] {
        self.heap.entries()
    }

    /// Verify heap order, partition coverage and weight normalization.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.heap.check_invariants()?;

        if self.cutpoints.len() != self.batch_size {
            return Err(InvariantError::new(format!(
                "{} cutpoints for batch_size {}",
                self.cutpoints.len(),
                self.batch_size
            )));
        }
        let mut prev = 0;
        for &c in &self.cutpoints {
            if c <= prev {
                return Err(InvariantError::new(format!(
                    "cutpoints not strictly increasing: {:?}",
                    self.cutpoints
                )));
            }
            prev = c;
        }
        if self.cutpoints.last() != Some(&self.heap.len()) {
            return Err(InvariantError::new(format!(
                "last cutpoint {:?} != pool size {}",
                self.cutpoints.last(),
                self.heap.len()
            )));
        }

        let max = self
            .importance_weights
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if (max - 1.0).abs() > 1e-12 || self.importance_weights.iter().any(|&w| w <= 0.0) {
            return Err(InvariantError::new(format!(
                "importance weights not normalized to max 1: {:?}",
                self.importance_weights
            )));
        }

        if let Some(positions) = &self.sampled {
            if positions.len() != self.batch_size {
                return Err(InvariantError::new(format!(
                    "{} sampled slots for batch_size {}",
                    positions.len(),
                    self.batch_size
                )));
            }
        }
        Ok(())
    }

    fn draw_positions<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut positions = self.sampled.take().unwrap_or_default();
        positions.clear();
        let mut start = 0;
        for &end in &self.cutpoints {
            positions.push(rng.random_range(start..end));
            start = end;
        }
        self.sampled = Some(positions);
    }

    fn current_batch(&self) -> Batch<'_, X, Y> {
        let positions = self.sampled.as_deref().unwrap_or(&[]);
        let mut inputs = Vec::with_capacity(positions.len());
        let mut targets = Vec::with_capacity(positions.len());
        for &pos in positions {
            let example = self.heap.entries()[pos].item();
            inputs.push(&example.input);
            targets.push(&example.target);
        }
        Batch {
            inputs,
            targets,
            weights: &self.importance_weights,
        }
    }
}
