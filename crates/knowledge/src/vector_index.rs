//! In-memory vector index with exact nearest-neighbor search.
//!
//! Vectors are identified by insertion order: the first vector ever added is
//! position 0, the next is 1, and so on. There is no update or delete, so a
//! position stays valid for the lifetime of the index.

use crate::error::{RetrievalError, RetrievalResult};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A single nearest-neighbor match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Insertion position of the matched vector
    pub position: usize,

    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// Trait for vector index backends.
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored vector must have.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors, assigning the next sequential positions.
    ///
    /// The whole batch is rejected if any vector has the wrong dimension.
    fn add(&mut self, vectors: Vec<Vec<f32>>) -> RetrievalResult<()>;

    /// Return the `min(k, len)` nearest vectors, ascending by distance with
    /// ties broken by ascending position.
    fn search(&self, query: &[f32], k: usize) -> RetrievalResult<Vec<SearchHit>>;
}

/// Brute-force index over squared L2 distance.
///
/// Vectors are stored row-major in one contiguous buffer.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Empty index for vectors of `dimension` components. Zero is rejected.
    pub fn new(dimension: usize) -> RetrievalResult<Self> {
        if dimension == 0 {
            return Err(RetrievalError::ZeroDimension);
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Stored vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    fn check_dimension(&self, vector: &[f32]) -> RetrievalResult<()> {
        if vector.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn add(&mut self, vectors: Vec<Vec<f32>>) -> RetrievalResult<()> {
        for vector in &vectors {
            self.check_dimension(vector)?;
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(&vector);
        }

        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> RetrievalResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(RetrievalError::InvalidK);
        }
        self.check_dimension(query)?;

        if self.is_empty() {
            return Ok(Vec::new());
        }

        let k = k.min(self.len());
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);

        for (position, row) in self.data.chunks_exact(self.dimension).enumerate() {
            let candidate = Candidate {
                distance: squared_l2(query, row),
                position,
            };

            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| SearchHit {
                position: c.position,
                distance: c.distance,
            })
            .collect())
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Heap entry ordered by (distance, position); the max-heap keeps the worst
/// of the current best `k` on top.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}
