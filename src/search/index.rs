//! Exact nearest-neighbor index over normalized vectors.
//!
//! Vectors are L2-normalized at build time, so inner product equals cosine
//! similarity and scores land in [-1, 1]. The index is immutable once built;
//! staleness is handled by rebuilding a fresh instance (see `cache.rs`),
//! never by mutating in place.

/// A single search hit: entity id plus cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub id: i64,
    pub score: f32,
}

/// Immutable flat inner-product index.
#[derive(Debug, Default)]
pub struct VectorIndex {
    ids: Vec<i64>,
    // Row-major, `ids.len()` rows of `dimensions` each, L2-normalized.
    vectors: Vec<f32>,
    dimensions: usize,
}

/// Errors from index queries.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: index has {expected}, query has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot search with a zero-norm query vector")]
    ZeroNormQuery,
}

impl VectorIndex {
    /// Build from (id, vector) pairs. Zero-norm or wrong-dimension vectors
    /// are skipped with a log line; an empty input yields an empty index,
    /// which is a valid "no results" state rather than an error.
    pub fn build(entries: Vec<(i64, Vec<f32>)>) -> Self {
        let dimensions = entries
            .iter()
            .map(|(_, v)| v.len())
            .find(|len| *len > 0)
            .unwrap_or(0);

        let mut ids = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len() * dimensions);
        for (id, mut vector) in entries {
            if vector.len() != dimensions {
                log::warn!(
                    "skipping vector for id {}: {} dimensions, index has {}",
                    id,
                    vector.len(),
                    dimensions
                );
                continue;
            }
            let norm = l2_norm(&vector);
            if norm < f32::EPSILON {
                log::warn!("skipping zero-norm vector for id {}", id);
                continue;
            }
            for value in &mut vector {
                *value /= norm;
            }
            ids.push(id);
            vectors.extend_from_slice(&vector);
        }

        Self {
            ids,
            vectors,
            dimensions,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Top-`k` entries by inner product against the normalized query.
    /// `k` is clamped to the number of stored vectors; an empty index
    /// returns an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Scored>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }
        let query_norm = l2_norm(query);
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormQuery);
        }

        let mut results: Vec<Scored> = self
            .ids
            .iter()
            .enumerate()
            .map(|(row, &id)| {
                let start = row * self.dimensions;
                let stored = &self.vectors[start..start + self.dimensions];
                let dot: f32 = query.iter().zip(stored).map(|(a, b)| a * b).sum();
                Scored {
                    id,
                    score: dot / query_norm,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k.min(self.ids.len()));
        Ok(results)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_returns_no_results() {
        let index = VectorIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn nearest_vector_ranks_first() {
        let index = VectorIndex::build(vec![
            (10, vec![1.0, 0.0, 0.0]),
            (20, vec![0.0, 1.0, 0.0]),
        ]);
        let results = index.search(&[1.0, 0.1, 0.0], 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 10);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn scores_stay_in_cosine_range() {
        let index = VectorIndex::build(vec![
            (1, vec![3.0, 0.0]),
            (2, vec![-5.0, 0.0]),
            (3, vec![0.0, 2.0]),
        ]);
        // Stored vectors are normalized at build time, so magnitude is
        // irrelevant and opposite vectors score -1.
        let results = index.search(&[2.0, 0.0], 10).unwrap();
        for hit in &results {
            assert!(hit.score >= -1.0 - 1e-6 && hit.score <= 1.0 + 1e-6);
        }
        assert_eq!(results[0].id, 1);
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!((results[2].score + 1.0).abs() < 1e-5);
    }

    #[test]
    fn k_is_clamped_to_len() {
        let index = VectorIndex::build(vec![(1, vec![1.0, 0.0]), (2, vec![0.5, 0.5])]);
        assert_eq!(index.search(&[1.0, 0.0], 100).unwrap().len(), 2);
        assert_eq!(index.search(&[1.0, 0.0], 1).unwrap().len(), 1);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn zero_norm_entries_skipped() {
        let index = VectorIndex::build(vec![(1, vec![0.0, 0.0]), (2, vec![1.0, 0.0])]);
        assert_eq!(index.len(), 1);
        let results = index.search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let index = VectorIndex::build(vec![(1, vec![1.0, 0.0, 0.0])]);
        assert!(matches!(
            index.search(&[1.0, 0.0], 5),
            Err(IndexError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn zero_norm_query_is_an_error() {
        let index = VectorIndex::build(vec![(1, vec![1.0, 0.0])]);
        assert!(matches!(
            index.search(&[0.0, 0.0], 5),
            Err(IndexError::ZeroNormQuery)
        ));
    }
}
