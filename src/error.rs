//! Error types.
//!
//! - [`SamplerError`]: a rejected call (bad configuration, or an update that
//!   does not match the last drawn batch). A rejected call never mutates the
//!   sampler.
//! - [`InvariantError`]: a broken heap order, cutpoint table or weight
//!   vector found by `check_invariants`.

use thiserror::Error;

/// Errors returned by fallible sampler operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    /// The example pool has no examples.
    #[error("example pool must be non-empty")]
    EmptyPool,
    /// `batch_size` is zero.
    #[error("batch_size must be >= 1")]
    ZeroBatchSize,
    /// More partitions were requested than there are examples.
    #[error("batch_size ({batch_size}) must be <= pool size ({pool_size})")]
    BatchLargerThanPool {
        /// Requested batch size.
        batch_size: usize,
        /// Number of examples in the pool.
        pool_size: usize,
    },
    /// `alpha` is negative or not finite.
    #[error("alpha must be finite and >= 0 (got {0})")]
    InvalidAlpha(f64),
    /// `beta` is outside `[0, 1]`.
    #[error("beta must be in [0, 1] (got {0})")]
    InvalidBeta(f64),
    /// The configured starting priority is NaN or infinite.
    #[error("initial priority must be finite (got {0})")]
    InvalidInitialPriority(f64),
    /// `rank^-alpha` underflows to zero somewhere in the pool.
    #[error("alpha {alpha} concentrates all mass on the top ranks of a pool of {pool_size}; lowest rank has zero probability")]
    DegenerateDistribution {
        /// Offending exponent.
        alpha: f64,
        /// Number of examples in the pool.
        pool_size: usize,
    },
    /// A new priority is NaN or infinite.
    #[error("priority for slot {slot} must be finite (got {priority})")]
    NonFinitePriority {
        /// Batch slot the priority was supplied for.
        slot: usize,
        /// Offending value.
        priority: f64,
    },
    /// `update_priorities` was called with no batch to apply it to.
    #[error("no batch has been sampled since construction or the last repartition")]
    NoBatchSampled,
    /// One priority per slot of the last batch is required.
    #[error("expected {expected} priorities (one per batch slot), got {got}")]
    SlotCountMismatch {
        /// Slots in the last sampled batch.
        expected: usize,
        /// Priorities supplied.
        got: usize,
    },
}

/// A failed `check_invariants` self-check.
///
/// Raised by [`PriorityHeap::check_invariants`](crate::heap::PriorityHeap::check_invariants)
/// when an entry sorts before its parent, and by
/// [`PrioritizedSampler::check_invariants`](crate::PrioritizedSampler::check_invariants)
/// when cutpoints stop covering the pool, importance weights lose their
/// max-1 normalization, or the sampled-slot table disagrees with the batch size.
/// The message names the offending index or values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sampler state inconsistent: {0}")]
pub struct InvariantError(String);

impl InvariantError {
    pub(crate) fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }

    /// What was found wrong, without the prefix.
    pub fn message(&self) -> &str {
        &self.0
    }
}
