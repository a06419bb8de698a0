use serde::Deserialize;

use crate::services::neighbors::Metric;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Movie catalog CSV (title, genres, overview, popularity)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Pre-fitted TF-IDF model artifact
    #[serde(default = "default_encoder_path")]
    pub encoder_path: String,

    /// Pre-built neighbor index artifact. When unset the index is built
    /// from the catalog with the configured encoder at startup.
    #[serde(default)]
    pub index_path: Option<String>,

    /// Distance metric used when building the index at startup
    #[serde(default)]
    pub index_metric: Metric,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Result count used when a request does not specify one
    #[serde(default = "default_recommendations")]
    pub default_recommendations: usize,

    /// Upper bound on the result count a request may ask for
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,

    /// Extra neighbors requested on top of the result count before
    /// genre filtering
    #[serde(default = "default_pool_margin")]
    pub neighbor_pool_margin: usize,

    /// Fail startup instead of warning when titles repeat in the catalog
    #[serde(default)]
    pub reject_duplicate_titles: bool,
}

fn default_catalog_path() -> String {
    "data/movies.csv".to_string()
}

fn default_encoder_path() -> String {
    "models/tfidf_vectorizer.json".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_recommendations() -> usize {
    5
}

fn default_max_recommendations() -> usize {
    50
}

fn default_pool_margin() -> usize {
    crate::services::recommendations::DEFAULT_POOL_MARGIN
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
