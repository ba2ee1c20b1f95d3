// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

use rand::Rng;

use crate::base::error::{ConfigField, FigurerError};

/// An opaque probability distribution over real vectors.
///
/// A `Distribution` is built from a pair of user-supplied callables plus
/// dimension metadata: `sample_fn` turns a seed vector of independent
/// uniform[0,1) draws into a point, and `density_fn` reports the relative
/// likelihood of a point under the distribution. Only ratios of `density`
/// values are meaningful — this is not a normalized PDF.
///
/// Sampling is seed-based rather than calling a caller-owned RNG directly:
/// this lets `sample_fn` be a pure function of its seed, while `Context`
/// owns the one RNG that actually produces randomness (see
/// [`Context::seed`](crate::Context::seed)).
pub struct Distribution {
    dimension: Option<usize>,
    seed_dimension: Option<usize>,
    sample_fn: Option<Box<dyn Fn(&[f64]) -> Vec<f64>>>,
    density_fn: Option<Box<dyn Fn(&[f64]) -> f64>>,
}

impl Distribution {
    /// Creates an unconfigured distribution; callers must set at least
    /// `sample_fn`, `density_fn`, and one of `dimension`/`seed_dimension`
    /// before calling `sample`.
    pub fn new() -> Self {
        Distribution {
            dimension: None,
            seed_dimension: None,
            sample_fn: None,
            density_fn: None,
        }
    }

    pub fn set_dimension(&mut self, dimension: usize) -> &mut Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn set_seed_dimension(&mut self, seed_dimension: usize) -> &mut Self {
        self.seed_dimension = Some(seed_dimension);
        self
    }

    pub fn set_sample_fn(&mut self, sample_fn: impl Fn(&[f64]) -> Vec<f64> + 'static) -> &mut Self {
        self.sample_fn = Some(Box::new(sample_fn));
        self
    }

    pub fn set_density_fn(&mut self, density_fn: impl Fn(&[f64]) -> f64 + 'static) -> &mut Self {
        self.density_fn = Some(Box::new(density_fn));
        self
    }

    /// The output dimension declared for this distribution, if any was set.
    /// `Context` uses this to cross-check a freshly built `Distribution`
    /// against a configured `state_size`/`actuation_size` without having to
    /// sample it first.
    pub(crate) fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Draws a seed of independent uniform[0,1) coordinates and maps it
    /// through `sample_fn`.
    ///
    /// The seed length is `seed_dimension` if set, else `dimension`.
    ///
    /// # Errors
    /// Returns `FigurerError::ConfigMissing(ConfigField::SeedDimension)` if
    /// neither `dimension` nor `seed_dimension` was set.
    pub fn sample(&self, rng: &mut impl Rng) -> Result<Vec<f64>, FigurerError> {
        let size = self
            .seed_dimension
            .or(self.dimension)
            .ok_or(FigurerError::ConfigMissing(ConfigField::SeedDimension))?;

        let seed: Vec<f64> = (0..size).map(|_| rng.random_range(0.0..1.0)).collect();
        let sample_fn = self
            .sample_fn
            .as_ref()
            .ok_or(FigurerError::ConfigMissing(ConfigField::SampleFn))?;
        Ok(sample_fn(&seed))
    }

    /// Relative density at `point`. Semantics are "relative density", not a
    /// normalized PDF — only ratios between calls are meaningful.
    pub fn density(&self, point: &[f64]) -> f64 {
        match &self.density_fn {
            Some(density_fn) => density_fn(point),
            None => 0.0,
        }
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a `Distribution` uniform over an axis-aligned box.
///
/// `bounds` is a flat sequence of `(lo, hi)` pairs, one pair per dimension:
/// `[lo_0, hi_0, lo_1, hi_1, ...]`. `sample` linearly maps the seed into the
/// box; `density` is `1.0` for points inside the (half-open) box and `0.0`
/// outside.
///
/// # Errors
/// Returns `FigurerError::ConfigInconsistent` if `bounds` has odd length.
pub fn uniform(bounds: Vec<f64>) -> Result<Distribution, FigurerError> {
    if bounds.len() % 2 != 0 {
        return Err(FigurerError::ConfigInconsistent(format!(
            "uniform() bounds vector must have even length (lo,hi pairs), got {}",
            bounds.len()
        )));
    }
    let dimension = bounds.len() / 2;
    let pairs: Vec<(f64, f64)> = bounds.chunks(2).map(|c| (c[0], c[1])).collect();

    let mut dist = Distribution::new();
    dist.set_dimension(dimension);
    dist.set_seed_dimension(dimension);

    let sample_pairs = pairs.clone();
    dist.set_sample_fn(move |seed| {
        seed.iter()
            .zip(sample_pairs.iter())
            .map(|(s, (lo, hi))| lo + s * (hi - lo))
            .collect()
    });

    let density_pairs = pairs;
    dist.set_density_fn(move |point| {
        let inside = point.len() == density_pairs.len()
            && point
                .iter()
                .zip(density_pairs.iter())
                .all(|(v, (lo, hi))| *v >= *lo && *v < *hi);
        if inside {
            1.0
        } else {
            0.0
        }
    });

    Ok(dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn uniform_density_inside_and_outside() {
        let dist = uniform(vec![7.0, 9.0, -4.0, -1.0]).unwrap();
        assert_eq!(dist.density(&[8.0, -3.0]), 1.0);
        assert_eq!(dist.density(&[8.0, 1.0]), 0.0);
        assert_eq!(dist.density(&[6.0, -3.0]), 0.0);
    }

    #[test]
    fn uniform_rejects_odd_length_bounds() {
        let err = uniform(vec![0.0, 1.0, 2.0]).unwrap_err();
        assert!(matches!(err, FigurerError::ConfigInconsistent(_)));
    }

    #[test]
    fn sample_stays_in_box_and_covers_both_halves() {
        let dist = uniform(vec![7.0, 9.0, -4.0, -1.0]).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);

        let mut found_low_x = false;
        let mut found_high_x = false;
        for _ in 0..40 {
            let s = dist.sample(&mut rng).unwrap();
            assert!(s[0] >= 7.0 && s[0] < 9.0);
            assert!(s[1] >= -4.0 && s[1] < -1.0);
            if s[0] < 8.0 {
                found_low_x = true;
            }
            if s[0] >= 8.0 {
                found_high_x = true;
            }
        }
        assert!(found_low_x && found_high_x);
    }

    #[test]
    fn missing_dimension_fails() {
        let mut dist = Distribution::new();
        dist.set_sample_fn(|seed| seed.to_vec());
        let mut rng = SmallRng::seed_from_u64(1);
        let err = dist.sample(&mut rng).unwrap_err();
        assert_eq!(err, FigurerError::ConfigMissing(ConfigField::SeedDimension));
    }
}
