//! Rank-based stratification.
//!
//! Element `r` (1-based rank, rank 1 = smallest heap key) gets probability
//! mass proportional to `r^-alpha`. [`find_cutpoints`] carves the ranked
//! sequence into `K` contiguous segments of roughly `1/K` mass each, so that
//! drawing one element uniformly per segment samples each element with
//! approximately its rank probability.
//!
//! ## Cutpoints
//!
//! A forward pass accumulates mass. When including the next element would
//! overshoot the per-segment target, the pass either cuts before it or, if
//! earlier cuts came in light (positive residual), takes it too and cuts
//! after. The residual is carried from cut to cut so rounding does not pile up
//! in the last segment.
//!
//! Heavy head elements can make the pass produce fewer than `K` segments. The
//! earliest segment spanning more than one element is then found and the
//! range from there on is re-partitioned with a reduced count and a target
//! re-derived from that range's own mass. The residual restarts at zero there,
//! since it was measured against the old target. Each step strictly shrinks
//! the range being worked on.
//!
//! Range masses come from suffix sums. Every refined range runs to the end
//! of the sequence, so its mass is read off without cancellation even when
//! the tail holds masses many orders of magnitude below the head.
//!
//! ```
//! use stratum::partition::{find_cutpoints, rank_probabilities};
//!
//! let probs = rank_probabilities(10, 0.0).unwrap();
//! assert_eq!(find_cutpoints(&probs, 5), vec![2, 4, 6, 8, 10]);
//! ```

use tracing::debug;

use crate::error::SamplerError;

/// Slack, relative to the per-segment target, used when comparing masses.
pub const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Normalized `rank^-alpha` masses for ranks `1..=n`.
///
/// # Errors
///
/// - [`SamplerError::EmptyPool`] if `n == 0`.
/// - [`SamplerError::InvalidAlpha`] if `alpha` is negative or not finite.
/// - [`SamplerError::DegenerateDistribution`] if the lowest rank's mass
///   underflows to zero.
pub fn rank_probabilities(n: usize, alpha: f64) -> Result<Vec<f64>, SamplerError> {
    if n == 0 {
        return Err(SamplerError::EmptyPool);
    }
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(SamplerError::InvalidAlpha(alpha));
    }

    let mut probs: Vec<f64> = (1..=n).map(|r| (r as f64).powf(-alpha)).collect();
    let total: f64 = probs.iter().sum();
    for p in &mut probs {
        *p /= total;
    }

    // Masses are non-increasing in rank, so the last one is the smallest.
    if probs[n - 1] <= 0.0 {
        return Err(SamplerError::DegenerateDistribution {
            alpha,
            pool_size: n,
        });
    }
    Ok(probs)
}

/// Split `probs` into `num_partitions` contiguous segments of near-equal mass.
///
/// Returns the exclusive end of each segment: strictly increasing, the last
/// equal to `probs.len()`, every segment non-empty.
///
/// # Panics
///
/// Panics if `num_partitions == 0` or `num_partitions > probs.len()`.
pub fn find_cutpoints(probs: &[f64], num_partitions: usize) -> Vec<usize> {
    assert!(num_partitions > 0, "find_cutpoints: num_partitions must be > 0");
    assert!(
        num_partitions <= probs.len(),
        "find_cutpoints: num_partitions ({num_partitions}) must be <= probs.len() ({})",
        probs.len()
    );

    let remaining = suffix_sums(probs);
    let mut cutpoints = Vec::with_capacity(num_partitions);
    let mut pending = Some(SubRange {
        start: 0,
        end: probs.len(),
        parts: num_partitions,
    });
    let mut refinements = 0usize;

    while let Some(range) = pending.take() {
        pending = range.split(probs, &remaining, &mut cutpoints);
        if pending.is_some() {
            refinements += 1;
        }
    }

    if refinements > 0 {
        debug!(
            refinements,
            num_partitions,
            len = probs.len(),
            "forward cutpoint pass fell short; re-partitioned tail"
        );
    }
    debug_assert_eq!(cutpoints.len(), num_partitions);
    cutpoints
}

/// Segment sizes implied by `cutpoints`.
pub fn partition_sizes(cutpoints: &[usize]) -> Vec<usize> {
    let mut start = 0;
    cutpoints
        .iter()
        .map(|&c| {
            let size = c - start;
            start = c;
            size
        })
        .collect()
}

/// Per-segment bias-correction weights, normalized so the largest is 1.
///
/// An element of segment `i` is drawn with probability
/// `P_i = 1 / (K * size_i)` per batch; its weight is `(N * P_i)^-beta`.
/// `beta = 0` gives all ones, `beta = 1` fully offsets the oversampling of
/// small (high-priority) segments.
pub fn importance_weights(sizes: &[usize], pool_size: usize, beta: f64) -> Vec<f64> {
    let k = sizes.len() as f64;
    let n = pool_size as f64;
    let mut weights: Vec<f64> = sizes
        .iter()
        .map(|&size| (n / (k * size as f64)).powf(-beta))
        .collect();

    let max = weights.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if max.is_finite() && max > 0.0 {
        for w in &mut weights {
            *w /= max;
        }
    }
    weights
}

/// `out[i]` is the mass of `probs[i..]`, accumulated from the light end.
fn suffix_sums(probs: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; probs.len() + 1];
    for i in (0..probs.len()).rev() {
        out[i] = out[i + 1] + probs[i];
    }
    out
}

/// A range `[start, end)` still to be cut into `parts` segments.
#[derive(Debug, Clone, Copy)]
struct SubRange {
    start: usize,
    end: usize,
    parts: usize,
}

impl SubRange {
    /// Emit this range's cutpoints into `out`, or as many as are settled plus
    /// the remaining range to refine.
    fn split(self, probs: &[f64], remaining: &[f64], out: &mut Vec<usize>) -> Option<SubRange> {
        let Self { start, end, parts } = self;
        let len = end - start;
        debug_assert!(parts >= 1 && parts <= len);

        if parts == 1 {
            out.push(end);
            return None;
        }
        if parts == len {
            out.extend(start + 1..=end);
            return None;
        }

        let target = (remaining[start] - remaining[end]) / parts as f64;
        let mut cuts = forward_pass(&probs[start..end], start, target);

        // Uncovered trailing elements: their own segment while short, merged
        // into the last one otherwise.
        if cuts.last() != Some(&end) && cuts.len() < parts {
            cuts.push(end);
        }
        if cuts.len() >= parts {
            cuts.truncate(parts);
            cuts[parts - 1] = end;
            out.extend_from_slice(&cuts);
            return None;
        }

        // Shortfall. Segments before `wide` are singletons.
        let mut seg_start = start;
        let mut wide = 0;
        while cuts[wide] - seg_start == 1 {
            seg_start = cuts[wide];
            wide += 1;
        }

        out.extend_from_slice(&cuts[..wide]);
        if wide > 0 {
            return Some(SubRange {
                start: seg_start,
                end,
                parts: parts - wide,
            });
        }

        // The first segment is the wide one: give up its last element (and
        // more if the tail could not otherwise hold the remaining parts).
        let cut = (cuts[0] - 1).min(end - (parts - 1));
        out.push(cut);
        Some(SubRange {
            start: cut,
            end,
            parts: parts - 1,
        })
    }
}

/// One greedy pass over `slice`, returning absolute cutpoints.
fn forward_pass(slice: &[f64], offset: usize, target: f64) -> Vec<usize> {
    let tolerance = target * RELATIVE_TOLERANCE;
    // Mass owed from earlier cuts: positive when they came in light.
    let mut residual = 0.0;
    let mut cuts = Vec::new();
    let mut cur = 0.0;
    let mut skip = false;

    for i in 0..slice.len().saturating_sub(1) {
        // The previous cut already took this element.
        if skip {
            skip = false;
            continue;
        }

        cur += slice[i];
        let next = cur + slice[i + 1];
        if next > target + tolerance {
            if residual > tolerance {
                cuts.push(offset + i + 2);
                residual += target - next;
                skip = true;
            } else {
                cuts.push(offset + i + 1);
                residual += target - cur;
            }
            cur = 0.0;
        }
    }

    cuts
}
