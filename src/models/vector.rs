use serde::{Deserialize, Serialize};

/// Sparse feature vector produced by the text encoder
///
/// `indices` are strictly ascending and `values` has the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodedVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

/// One nearest-neighbor hit: catalog row and its distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

impl EncodedVector {
    /// Builds a vector from `(index, value)` pairs in any order.
    /// Repeated indices are summed and zero values dropped.
    pub fn from_pairs(mut pairs: Vec<(u32, f32)>) -> Self {
        pairs.sort_by_key(|(index, _)| *index);

        let mut indices = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());
        for (index, value) in pairs {
            if indices.last() == Some(&index) {
                if let Some(last) = values.last_mut() {
                    *last += value;
                }
            } else {
                indices.push(index);
                values.push(value);
            }
        }

        let mut vector = Self { indices, values };
        vector.retain_nonzero();
        vector
    }

    fn retain_nonzero(&mut self) {
        let mut keep = 0;
        for i in 0..self.indices.len() {
            if self.values[i] != 0.0 {
                self.indices[keep] = self.indices[i];
                self.values[keep] = self.values[i];
                keep += 1;
            }
        }
        self.indices.truncate(keep);
        self.values.truncate(keep);
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    pub fn dot(&self, other: &EncodedVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Euclidean distance, merged over both index lists
    pub fn euclidean_distance(&self, other: &EncodedVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        while i < self.indices.len() || j < other.indices.len() {
            let a = self.indices.get(i);
            let b = other.indices.get(j);
            let diff = match (a, b) {
                (Some(x), Some(y)) if x == y => {
                    let d = self.values[i] - other.values[j];
                    i += 1;
                    j += 1;
                    d
                }
                (Some(x), Some(y)) if x < y => {
                    i += 1;
                    self.values[i - 1]
                }
                (Some(_), None) => {
                    i += 1;
                    self.values[i - 1]
                }
                _ => {
                    j += 1;
                    other.values[j - 1]
                }
            };
            sum += diff * diff;
        }
        sum.sqrt()
    }

    /// `1 - cosine similarity`; the zero vector is at distance 1 from everything
    pub fn cosine_distance(&self, other: &EncodedVector) -> f32 {
        let magnitude = self.norm() * other.norm();
        if magnitude < f32::EPSILON {
            return 1.0;
        }
        1.0 - self.dot(other) / magnitude
    }

    /// Checks the ordering and bounds invariants against a dimension
    pub fn check(&self, dimension: usize) -> Result<(), String> {
        if self.indices.len() != self.values.len() {
            return Err(format!(
                "{} indices but {} values",
                self.indices.len(),
                self.values.len()
            ));
        }
        if self.indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err("indices are not strictly ascending".to_string());
        }
        if let Some(&last) = self.indices.last() {
            if last as usize >= dimension {
                return Err(format!("index {} out of range for dimension {}", last, dimension));
            }
        }
        Ok(())
    }
}
