#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted sampler that turns a requested enemy count into a size-class roster.
//!
//! Every enemy is classified individually against cumulative thresholds, so
//! the composition always sums to the requested count and reproduces the
//! requested ratios in expectation. The sampler never picks a preset on its
//! own; it consumes whatever weight triple the caller passes.

use arena_waves_core::{AccountingMode, SizeClass, SpawnComposition, SpawnWeights, WeightPresets};
use rand::Rng;
use thiserror::Error;
use tracing::debug;

const SIZE_CLASSES: [SizeClass; 3] = [SizeClass::Large, SizeClass::Medium, SizeClass::Small];

/// Reasons a composition request is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum SampleError {
    /// The requested enemy count was negative.
    #[error("spawn count must not be negative, got {0}")]
    NegativeCount(i64),
    /// The requested enemy count does not fit the composition counters.
    #[error("spawn count {0} exceeds the supported maximum")]
    CountTooLarge(i64),
    /// A weight was negative, NaN or infinite.
    #[error("weight for {class:?} must be finite and non-negative, got {value}")]
    InvalidWeight {
        /// Size class carrying the offending weight.
        class: SizeClass,
        /// Offending weight.
        value: f64,
    },
    /// Every weight was zero.
    #[error("at least one spawn weight must be strictly positive")]
    NoPositiveWeight,
}

/// Draws `total_count` size classes from `weights` using `rng`.
///
/// # Errors
///
/// Returns [`SampleError`] when the count is negative or too large, or when the
/// weights are invalid or all zero.
pub fn sample<R>(
    total_count: i64,
    weights: &SpawnWeights,
    rng: &mut R,
) -> Result<SpawnComposition, SampleError>
where
    R: Rng + ?Sized,
{
    if total_count < 0 {
        return Err(SampleError::NegativeCount(total_count));
    }
    let draws = u32::try_from(total_count).map_err(|_| SampleError::CountTooLarge(total_count))?;
    let thresholds = Thresholds::from_weights(weights)?;

    let mut composition = SpawnComposition::default();
    for _ in 0..draws {
        match thresholds.classify(rng.gen::<f64>()) {
            SizeClass::Large => composition.large += 1,
            SizeClass::Medium => composition.medium += 1,
            SizeClass::Small => composition.small += 1,
        }
    }

    debug!(
        total_count,
        large = composition.large,
        medium = composition.medium,
        small = composition.small,
        "sampled spawn composition"
    );
    Ok(composition)
}

/// Call-site helper that samples with the preset matching an accounting mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpawnCompositionSampler {
    presets: WeightPresets,
}

impl SpawnCompositionSampler {
    /// Creates a sampler bound to the provided presets.
    #[must_use]
    pub const fn new(presets: WeightPresets) -> Self {
        Self { presets }
    }

    /// Presets the sampler chooses from.
    #[must_use]
    pub const fn presets(&self) -> &WeightPresets {
        &self.presets
    }

    /// Samples a roster of `total_count` enemies with the preset for `mode`.
    ///
    /// # Errors
    ///
    /// Propagates [`SampleError`] from [`sample`].
    pub fn compose<R>(
        &self,
        total_count: i64,
        mode: AccountingMode,
        rng: &mut R,
    ) -> Result<SpawnComposition, SampleError>
    where
        R: Rng + ?Sized,
    {
        sample(total_count, &self.presets.for_mode(mode), rng)
    }
}

/// Cumulative upper bounds for the large and medium buckets.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Thresholds {
    large: f64,
    medium: f64,
}

impl Thresholds {
    fn from_weights(weights: &SpawnWeights) -> Result<Self, SampleError> {
        let mut peak = 0.0_f64;
        for class in SIZE_CLASSES {
            let value = weights.weight(class);
            if !value.is_finite() || value < 0.0 {
                return Err(SampleError::InvalidWeight { class, value });
            }
            peak = peak.max(value);
        }

        if peak <= 0.0 {
            return Err(SampleError::NoPositiveWeight);
        }

        // Scaling by the peak first keeps the sum finite for huge weights.
        let large = weights.large / peak;
        let medium = weights.medium / peak;
        let small = weights.small / peak;
        let sum = large + medium + small;

        Ok(Self {
            large: large / sum,
            medium: (large + medium) / sum,
        })
    }

    fn classify(&self, draw: f64) -> SizeClass {
        if draw < self.large {
            SizeClass::Large
        } else if draw < self.medium {
            SizeClass::Medium
        } else {
            SizeClass::Small
        }
    }
}
