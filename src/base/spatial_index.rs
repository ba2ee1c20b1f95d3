// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

use crate::base::error::FigurerError;

/// Squared Euclidean distance between two points of equal length.
pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Euclidean distance between two points of equal length.
///
/// # Errors
/// Returns `FigurerError::DimensionMismatch` if the vectors have unequal length.
pub fn distance(a: &[f64], b: &[f64]) -> Result<f64, FigurerError> {
    if a.len() != b.len() {
        return Err(FigurerError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(squared_distance(a, b).sqrt())
}

/// A flat, exact-nearest-neighbor index from integer id to a point in R^d.
///
/// Backed by a plain `Vec`; `closest` is a linear scan using squared
/// Euclidean distance. This is deliberately approximation-free — an
/// index-free brute force is sufficient at the scale the search engine
/// exercises it (a handful to a few thousand points per tree).
pub struct SpatialIndex {
    dimension: Option<usize>,
    entries: Vec<(u64, Vec<f64>)>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        SpatialIndex {
            dimension: None,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `(id, point)`. The first addition pins the index's
    /// dimension; later additions of a different dimension fail.
    ///
    /// # Errors
    /// Returns `FigurerError::DimensionMismatch` if `point`'s length
    /// differs from the dimension established by the first `add`.
    pub fn add(&mut self, id: u64, point: Vec<f64>) -> Result<(), FigurerError> {
        match self.dimension {
            None => self.dimension = Some(point.len()),
            Some(dim) if dim != point.len() => {
                return Err(FigurerError::DimensionMismatch {
                    expected: dim,
                    found: point.len(),
                });
            }
            Some(_) => {}
        }
        self.entries.push((id, point));
        Ok(())
    }

    /// Exact nearest neighbor of `query` by squared Euclidean distance.
    /// Ties are broken by insertion order (lowest-index entry wins).
    ///
    /// # Errors
    /// Returns `FigurerError::Empty` if the index holds no points, or
    /// `FigurerError::DimensionMismatch` if `query`'s length doesn't match
    /// the index's dimension.
    pub fn closest(&self, query: &[f64]) -> Result<(u64, Vec<f64>), FigurerError> {
        let dim = self.dimension.ok_or(FigurerError::Empty)?;
        if self.entries.is_empty() {
            return Err(FigurerError::Empty);
        }
        if query.len() != dim {
            return Err(FigurerError::DimensionMismatch {
                expected: dim,
                found: query.len(),
            });
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, (_, point)) in self.entries.iter().enumerate() {
            let d = squared_distance(query, point);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        let (idx, _) = best.expect("entries is non-empty");
        let (id, point) = &self.entries[idx];
        Ok((*id, point.clone()))
    }

    /// Euclidean distance from `query` to the nearest indexed point.
    pub fn closest_distance(&self, query: &[f64]) -> Result<f64, FigurerError> {
        let (_, point) = self.closest(query)?;
        distance(query, &point)
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_matches_nearest_by_squared_euclidean() {
        let mut index = SpatialIndex::new();
        index.add(101, vec![10.0, 20.0, 30.0]).unwrap();
        index.add(102, vec![20.0, 30.0, 40.0]).unwrap();
        index.add(103, vec![30.0, 40.0, 50.0]).unwrap();
        index.add(104, vec![40.0, 20.0, 30.0]).unwrap();
        index.add(105, vec![20.0, 40.0, 30.0]).unwrap();

        let (id, _) = index.closest(&[41.0, 19.0, 29.0]).unwrap();
        assert_eq!(id, 104);
    }

    #[test]
    fn closest_on_empty_index_fails() {
        let index = SpatialIndex::new();
        assert_eq!(index.closest(&[1.0, 2.0]).unwrap_err(), FigurerError::Empty);
    }

    #[test]
    fn add_rejects_dimension_mismatch() {
        let mut index = SpatialIndex::new();
        index.add(1, vec![1.0, 2.0]).unwrap();
        let err = index.add(2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            FigurerError::DimensionMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn ties_broken_by_insertion_order() {
        let mut index = SpatialIndex::new();
        index.add(1, vec![0.0, 0.0]).unwrap();
        index.add(2, vec![0.0, 0.0]).unwrap();
        let (id, _) = index.closest(&[0.0, 0.0]).unwrap();
        assert_eq!(id, 1);
    }
}
