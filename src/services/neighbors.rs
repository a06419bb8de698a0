use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    catalog::Catalog,
    error::{LoadError, LoadResult},
    models::{EncodedVector, Neighbor},
    services::encoder::TextEncoder,
};

/// Nearest-neighbor lookup over the catalog's reference vectors
#[cfg_attr(test, mockall::automock)]
pub trait NeighborIndex: Send + Sync {
    /// The `min(k, len)` rows closest to `vector`, nearest first
    fn query(&self, vector: &EncodedVector, k: usize) -> Vec<Neighbor>;

    /// Number of indexed rows
    fn len(&self) -> usize;
}

/// Distance function used by the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Euclidean,
    Cosine,
}

impl Metric {
    pub fn distance(&self, a: &EncodedVector, b: &EncodedVector) -> f32 {
        match self {
            Metric::Euclidean => a.euclidean_distance(b),
            Metric::Cosine => a.cosine_distance(b),
        }
    }
}

/// Serialized form of a built index; `vectors[i]` belongs to catalog row `i`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexArtifact {
    #[serde(default)]
    pub metric: Metric,
    pub dimension: usize,
    pub vectors: Vec<EncodedVector>,
}

/// Brute-force index: every query scans all rows
///
/// Ties in distance keep row order, so results are stable for a fixed index.
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    metric: Metric,
    dimension: usize,
    vectors: Vec<EncodedVector>,
}

impl BruteForceIndex {
    /// Wraps an artifact after checking it against the catalog and encoder
    /// it will serve
    pub fn from_artifact(
        artifact: IndexArtifact,
        catalog_len: usize,
        encoder_dimension: usize,
    ) -> LoadResult<Self> {
        let index = Self {
            metric: artifact.metric,
            dimension: artifact.dimension,
            vectors: artifact.vectors,
        };
        index.validate(catalog_len, encoder_dimension)?;
        Ok(index)
    }

    /// Reads and validates a JSON index artifact
    pub fn load(
        path: impl AsRef<Path>,
        catalog_len: usize,
        encoder_dimension: usize,
    ) -> LoadResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
        let artifact: IndexArtifact = serde_json::from_slice(&bytes)?;
        let index = Self::from_artifact(artifact, catalog_len, encoder_dimension)?;

        tracing::info!(
            path = %path.display(),
            rows = index.vectors.len(),
            dimension = index.dimension,
            metric = ?index.metric,
            "Loaded neighbor index"
        );

        Ok(index)
    }

    /// Encodes every catalog row with `encoder`
    pub fn build(catalog: &Catalog, encoder: &dyn TextEncoder, metric: Metric) -> Self {
        let vectors: Vec<EncodedVector> = catalog
            .iter()
            .map(|movie| encoder.encode(movie.combined_text()))
            .collect();

        tracing::info!(
            rows = vectors.len(),
            dimension = encoder.dimension(),
            metric = ?metric,
            "Built neighbor index from catalog"
        );

        Self {
            metric,
            dimension: encoder.dimension(),
            vectors,
        }
    }

    /// Checks the index lines up with the catalog and encoder it will serve
    fn validate(&self, catalog_len: usize, encoder_dimension: usize) -> LoadResult<()> {
        if self.vectors.len() != catalog_len {
            return Err(LoadError::ArtifactMismatch(format!(
                "index holds {} vectors but the catalog has {} movies",
                self.vectors.len(),
                catalog_len
            )));
        }
        if self.dimension != encoder_dimension {
            return Err(LoadError::ArtifactMismatch(format!(
                "index dimension {} differs from encoder dimension {}",
                self.dimension, encoder_dimension
            )));
        }
        for (row, vector) in self.vectors.iter().enumerate() {
            vector.check(self.dimension).map_err(|reason| {
                LoadError::InvalidArtifact(format!("vector for row {}: {}", row, reason))
            })?;
        }
        Ok(())
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn to_artifact(&self) -> IndexArtifact {
        IndexArtifact {
            metric: self.metric,
            dimension: self.dimension,
            vectors: self.vectors.clone(),
        }
    }
}

impl NeighborIndex for BruteForceIndex {
    fn query(&self, vector: &EncodedVector, k: usize) -> Vec<Neighbor> {
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, candidate)| Neighbor {
                row,
                distance: self.metric.distance(vector, candidate),
            })
            .collect();

        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        neighbors
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(u32, f32)]) -> EncodedVector {
        EncodedVector::from_pairs(pairs.to_vec())
    }

    fn index(metric: Metric, vectors: Vec<EncodedVector>) -> BruteForceIndex {
        BruteForceIndex {
            metric,
            dimension: 4,
            vectors,
        }
    }

    #[test]
    fn test_query_orders_by_distance() {
        let idx = index(
            Metric::Euclidean,
            vec![
                vector(&[(0, 5.0)]),
                vector(&[(0, 1.0)]),
                vector(&[(0, 3.0)]),
            ],
        );

        let hits = idx.query(&vector(&[(0, 1.0)]), 3);
        let rows: Vec<usize> = hits.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![1, 2, 0]);
        assert_eq!(hits[0].distance, 0.0);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_query_truncates_to_k_and_len() {
        let idx = index(
            Metric::Euclidean,
            vec![vector(&[(0, 1.0)]), vector(&[(1, 1.0)])],
        );
        assert_eq!(idx.query(&vector(&[(0, 1.0)]), 1).len(), 1);
        assert_eq!(idx.query(&vector(&[(0, 1.0)]), 10).len(), 2);
        assert!(idx.query(&vector(&[(0, 1.0)]), 0).is_empty());
    }

    #[test]
    fn test_ties_keep_row_order() {
        let idx = index(
            Metric::Euclidean,
            vec![
                vector(&[(1, 1.0)]),
                vector(&[(2, 1.0)]),
                vector(&[(3, 1.0)]),
            ],
        );
        let rows: Vec<usize> = idx
            .query(&vector(&[(0, 1.0)]), 3)
            .iter()
            .map(|n| n.row)
            .collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let idx = index(
            Metric::Cosine,
            vec![vector(&[(0, 10.0)]), vector(&[(0, 1.0), (1, 1.0)])],
        );
        let hits = idx.query(&vector(&[(0, 1.0)]), 2);
        assert_eq!(hits[0].row, 0);
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_validate_detects_mismatches() {
        let idx = index(Metric::Euclidean, vec![vector(&[(0, 1.0)])]);
        assert!(idx.validate(1, 4).is_ok());
        assert!(matches!(
            idx.validate(2, 4),
            Err(LoadError::ArtifactMismatch(_))
        ));
        assert!(matches!(
            idx.validate(1, 5),
            Err(LoadError::ArtifactMismatch(_))
        ));

        let out_of_range = index(Metric::Euclidean, vec![vector(&[(7, 1.0)])]);
        assert!(matches!(
            out_of_range.validate(1, 4),
            Err(LoadError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_artifact_json_shape() {
        let json = r#"{
            "metric": "cosine",
            "dimension": 3,
            "vectors": [{"indices": [0, 2], "values": [0.6, 0.8]}, {"indices": [], "values": []}]
        }"#;
        let artifact: IndexArtifact = serde_json::from_str(json).unwrap();
        let idx = BruteForceIndex::from_artifact(artifact, 2, 3).unwrap();
        assert_eq!(idx.metric(), Metric::Cosine);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.to_artifact().vectors[0].indices, vec![0, 2]);
    }

    #[test]
    fn test_from_artifact_rejects_ragged_vectors() {
        let artifact = IndexArtifact {
            metric: Metric::Euclidean,
            dimension: 4,
            vectors: vec![EncodedVector {
                indices: vec![0, 1],
                values: vec![1.0],
            }],
        };
        assert!(matches!(
            BruteForceIndex::from_artifact(artifact, 1, 4),
            Err(LoadError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_from_artifact_rejects_wrong_row_count() {
        let artifact = IndexArtifact {
            metric: Metric::Euclidean,
            dimension: 4,
            vectors: vec![vector(&[(0, 1.0)])],
        };
        assert!(matches!(
            BruteForceIndex::from_artifact(artifact, 3, 4),
            Err(LoadError::ArtifactMismatch(_))
        ));
    }
}
