use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::{
    error::{LoadError, LoadResult},
    models::EncodedVector,
};

/// Maps text to a feature vector
///
/// Implementations must be deterministic: the reference vectors in the
/// neighbor index were produced by the same function.
#[cfg_attr(test, mockall::automock)]
pub trait TextEncoder: Send + Sync {
    fn encode(&self, text: &str) -> EncodedVector;

    /// Number of features; every index produced is below this
    fn dimension(&self) -> usize;
}

/// Vector normalization applied after weighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    L1,
    None,
}

/// Serialized form of a fitted TF-IDF vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfModel {
    /// Term -> feature index
    pub vocabulary: HashMap<String, u32>,
    /// Inverse document frequency per feature index
    pub idf: Vec<f32>,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Norm,
}

fn default_lowercase() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Pre-fitted TF-IDF encoder
#[derive(Debug, Clone)]
pub struct TfidfEncoder {
    model: TfidfModel,
}

impl TfidfEncoder {
    /// Wraps a model after checking it is internally consistent
    pub fn from_model(model: TfidfModel) -> LoadResult<Self> {
        let dimension = model.idf.len();
        if model.vocabulary.len() != dimension {
            return Err(LoadError::InvalidArtifact(format!(
                "vocabulary has {} terms but idf has {} weights",
                model.vocabulary.len(),
                dimension
            )));
        }
        if let Some((term, index)) = model
            .vocabulary
            .iter()
            .find(|&(_, &index)| index as usize >= dimension)
        {
            return Err(LoadError::InvalidArtifact(format!(
                "term {:?} maps to index {} beyond {} features",
                term, index, dimension
            )));
        }
        let (min_n, max_n) = model.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(LoadError::InvalidArtifact(format!(
                "invalid ngram_range ({}, {})",
                min_n, max_n
            )));
        }

        Ok(Self { model })
    }

    /// Reads a JSON model artifact
    pub fn load(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
        let model: TfidfModel = serde_json::from_slice(&bytes)?;
        let encoder = Self::from_model(model)?;

        tracing::info!(
            path = %path.display(),
            features = encoder.dimension(),
            ngram_range = ?encoder.model.ngram_range,
            "Loaded TF-IDF encoder"
        );

        Ok(encoder)
    }

    pub fn model(&self) -> &TfidfModel {
        &self.model
    }

    fn terms(&self, text: &str) -> Vec<String> {
        let text = if self.model.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens = tokenize(&text);

        let (min_n, max_n) = self.model.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n == 1 {
                terms.extend(tokens.iter().map(|t| t.to_string()));
            } else {
                terms.extend(tokens.windows(n).map(|w| w.join(" ")));
            }
        }
        terms
    }
}

impl TextEncoder for TfidfEncoder {
    fn encode(&self, text: &str) -> EncodedVector {
        let mut counts: HashMap<u32, f32> = HashMap::new();
        for term in self.terms(text) {
            if let Some(&index) = self.model.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let pairs: Vec<(u32, f32)> = counts
            .into_iter()
            .map(|(index, count)| {
                let tf = if self.model.sublinear_tf {
                    1.0 + count.ln()
                } else {
                    count
                };
                (index, tf * self.model.idf[index as usize])
            })
            .collect();

        let mut vector = EncodedVector::from_pairs(pairs);
        normalize(&mut vector, self.model.norm);
        vector
    }

    fn dimension(&self) -> usize {
        self.model.idf.len()
    }
}

/// Maximal runs of word characters, keeping runs of two or more
fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().nth(1).is_some())
        .collect()
}

fn normalize(vector: &mut EncodedVector, norm: Norm) {
    let length = match norm {
        Norm::L2 => vector.norm(),
        Norm::L1 => vector.values.iter().map(|v| v.abs()).sum(),
        Norm::None => return,
    };
    if length > 0.0 {
        for value in &mut vector.values {
            *value /= length;
        }
    }
}
