//! `stratum`: rank-stratified prioritized minibatch sampling.
//!
//! Draws training examples from a fixed pool with probability skewed toward
//! examples the model currently handles poorly, and returns importance
//! weights that undo the resulting bias.
//!
//! Exposed modules:
//! - `heap`: fixed-size min-heap with in-place priority replacement and
//!   position tracking across sifts.
//! - `partition`: `rank^-alpha` masses, equal-mass cutpoints, bias-correction
//!   weights.
//! - `sampler`: the sampler tying them together (sample, update, repartition).
//! - `config`, `error`: configuration and error types.
//!
//! ## References
//!
//! - Schaul, Quan, Antonoglou, Silver (2016): *Prioritized Experience Replay*
//!   (rank-based variant, stratified sampling).

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod heap;
pub mod partition;
pub mod sampler;

pub use config::SamplerConfig;
pub use error::{InvariantError, SamplerError};
pub use heap::{HeapEntry, MoveObserver, PositionTracker, PriorityHeap};
pub use partition::{find_cutpoints, importance_weights, partition_sizes, rank_probabilities};
pub use sampler::{Batch, Example, PrioritizedSampler};
