//! Normalized embedding vectors.

use std::sync::Arc;

/// L2-normalized embedding. Dot product between two vectors is their cosine
/// similarity. Cloning is cheap; the data is shared and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Arc<[f32]>);

impl EmbeddingVector {
    /// Normalize raw model output.
    ///
    /// Returns `None` for empty or non-finite input. A zero-norm vector is
    /// replaced by the first unit basis vector of the same dimension so that
    /// every produced vector has unit norm.
    pub fn from_raw(raw: &[f32]) -> Option<Self> {
        if raw.is_empty() || raw.iter().any(|x| !x.is_finite()) {
            return None;
        }

        let norm = raw
            .iter()
            .map(|&x| f64::from(x) * f64::from(x))
            .sum::<f64>()
            .sqrt();

        if norm < f64::from(f32::EPSILON) {
            let mut basis = vec![0.0f32; raw.len()];
            basis[0] = 1.0;
            return Some(Self(basis.into()));
        }

        let data: Vec<f32> = raw
            .iter()
            .map(|&x| (f64::from(x) / norm) as f32)
            .collect();
        Some(Self(data.into()))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn norm(&self) -> f64 {
        self.0
            .iter()
            .map(|&x| f64::from(x) * f64::from(x))
            .sum::<f64>()
            .sqrt()
    }

    /// Cosine similarity in [-1, 1].
    pub fn similarity(&self, other: &Self) -> f32 {
        let dot: f64 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum();
        dot.clamp(-1.0, 1.0) as f32
    }

    pub fn negated(&self) -> Self {
        let data: Vec<f32> = self.0.iter().map(|x| -x).collect();
        Self(data.into())
    }
}
