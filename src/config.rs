//! Sampler configuration.

use crate::error::SamplerError;

/// Default rank exponent.
pub const DEFAULT_ALPHA: f64 = 0.7;
/// Default importance-sampling exponent.
pub const DEFAULT_BETA: f64 = 0.5;
/// Priority every example starts with. Smaller sorts first, so a very
/// negative value makes each example a top candidate until it is first
/// updated.
pub const DEFAULT_INITIAL_PRIORITY: f64 = -1000.0;

/// Configuration for [`PrioritizedSampler`](crate::PrioritizedSampler).
///
/// ```
/// use stratum::SamplerConfig;
///
/// let config = SamplerConfig::new(32).with_alpha(0.6).with_beta(0.4);
/// assert!(config.validate(1_000).is_ok());
/// assert!(config.validate(16).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Examples per batch; also the number of partitions.
    pub batch_size: usize,
    /// Rank exponent. 0 = uniform, larger = sharper focus on top ranks.
    pub alpha: f64,
    /// Importance-sampling exponent. 0 = no correction, 1 = full correction.
    pub beta: f64,
    /// Priority assigned to every example at construction.
    pub initial_priority: f64,
}

impl SamplerConfig {
    /// Configuration with default exponents.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            initial_priority: DEFAULT_INITIAL_PRIORITY,
        }
    }

    /// Set the rank exponent.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the importance-sampling exponent.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Set the priority examples start with.
    pub fn with_initial_priority(mut self, priority: f64) -> Self {
        self.initial_priority = priority;
        self
    }

    /// Check this configuration against a pool of `pool_size` examples.
    pub fn validate(&self, pool_size: usize) -> Result<(), SamplerError> {
        if !self.initial_priority.is_finite() {
            return Err(SamplerError::InvalidInitialPriority(
                self.initial_priority,
            ));
        }
        validate_partitioning(pool_size, self.batch_size, self.alpha, self.beta)
    }
}

/// Checks shared by construction and `repartition`.
pub(crate) fn validate_partitioning(
    pool_size: usize,
    batch_size: usize,
    alpha: f64,
    beta: f64,
) -> Result<(), SamplerError> {
    if pool_size == 0 {
        return Err(SamplerError::EmptyPool);
    }
    if batch_size == 0 {
        return Err(SamplerError::ZeroBatchSize);
    }
    if batch_size > pool_size {
        return Err(SamplerError::BatchLargerThanPool {
            batch_size,
            pool_size,
        });
    }
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(SamplerError::InvalidAlpha(alpha));
    }
    if !(0.0..=1.0).contains(&beta) {
        return Err(SamplerError::InvalidBeta(beta));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SamplerConfig::new(4);
        assert_eq!(c.batch_size, 4);
        assert_eq!(c.alpha, DEFAULT_ALPHA);
        assert_eq!(c.beta, DEFAULT_BETA);
        assert_eq!(c.initial_priority, DEFAULT_INITIAL_PRIORITY);
    }

    #[test]
    fn validate_accepts_boundaries() {
        let c = SamplerConfig::new(10).with_alpha(0.0).with_beta(0.0);
        assert!(c.validate(10).is_ok());
        assert!(c.with_beta(1.0).validate(10).is_ok());
    }

    #[test]
    fn validate_rejects_each_bad_field() {
        assert_eq!(
            SamplerConfig::new(0).validate(5),
            Err(SamplerError::ZeroBatchSize)
        );
        assert_eq!(
            SamplerConfig::new(6).validate(5),
            Err(SamplerError::BatchLargerThanPool {
                batch_size: 6,
                pool_size: 5,
            })
        );
        assert_eq!(SamplerConfig::new(1).validate(0), Err(SamplerError::EmptyPool));
        assert_eq!(
            SamplerConfig::new(2).with_alpha(-1.0).validate(5),
            Err(SamplerError::InvalidAlpha(-1.0))
        );
        assert_eq!(
            SamplerConfig::new(2).with_beta(1.01).validate(5),
            Err(SamplerError::InvalidBeta(1.01))
        );
        assert!(matches!(
            SamplerConfig::new(2).with_beta(f64::NAN).validate(5),
            Err(SamplerError::InvalidBeta(b)) if b.is_nan()
        ));
        assert_eq!(
            SamplerConfig::new(2)
                .with_initial_priority(f64::INFINITY)
                .validate(5),
            Err(SamplerError::InvalidInitialPriority(f64::INFINITY))
        );
    }
}
