use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::{
    catalog::{Catalog, CatalogOptions},
    config::Config,
    services::{
        encoder::{TextEncoder, TfidfEncoder},
        neighbors::{BruteForceIndex, NeighborIndex},
        Recommender,
    },
};

/// Result count limits applied to incoming requests
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub default_count: usize,
    pub max_count: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            default_count: 5,
            max_count: 50,
        }
    }
}

/// Shared application state
///
/// Everything inside is read-only after startup, so clones handed to
/// handlers share it without locks.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub limits: RequestLimits,
    pub loaded_at: DateTime<Utc>,
}

impl AppState {
    /// Creates state around an already assembled recommender
    pub fn new(recommender: Recommender, limits: RequestLimits) -> Self {
        Self {
            recommender: Arc::new(recommender),
            limits,
            loaded_at: Utc::now(),
        }
    }

    /// Loads catalog, encoder and index from the configured artifacts
    ///
    /// Any failure is fatal; nothing is served from a partial load.
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        let options = CatalogOptions {
            reject_duplicate_titles: config.reject_duplicate_titles,
        };
        let catalog = Catalog::load(&config.catalog_path, options)
            .with_context(|| format!("Failed to load catalog from {}", config.catalog_path))?;

        let encoder = TfidfEncoder::load(&config.encoder_path)
            .with_context(|| format!("Failed to load encoder from {}", config.encoder_path))?;

        let index = match &config.index_path {
            Some(path) => BruteForceIndex::load(path, catalog.len(), encoder.dimension())
                .with_context(|| format!("Failed to load neighbor index from {}", path))?,
            None => BruteForceIndex::build(&catalog, &encoder, config.index_metric),
        };

        let recommender = Recommender::new(
            Arc::new(catalog),
            Arc::new(encoder) as Arc<dyn TextEncoder>,
            Arc::new(index) as Arc<dyn NeighborIndex>,
        )
        .with_pool_margin(config.neighbor_pool_margin);

        let limits = RequestLimits {
            default_count: config.default_recommendations,
            max_count: config.max_recommendations,
        };

        tracing::info!(
            movies = recommender.catalog().len(),
            genres = recommender.catalog().all_genres().len(),
            "Recommender ready"
        );

        Ok(Self::new(recommender, limits))
    }
}
