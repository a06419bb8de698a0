use std::cmp::Ordering;
use std::sync::Arc;

use crate::{
    catalog::Catalog,
    error::{AppError, AppResult},
    models::{MovieRecord, Recommendation},
    services::{encoder::TextEncoder, neighbors::NeighborIndex},
};

/// Neighbors requested beyond `top_n + 1` on the first index query
pub const DEFAULT_POOL_MARGIN: usize = 10;

/// Answers genre and genre+seed recommendation queries
///
/// Holds the catalog, encoder and index as shared read-only handles, so a
/// single instance serves concurrent requests without locking.
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<Catalog>,
    encoder: Arc<dyn TextEncoder>,
    index: Arc<dyn NeighborIndex>,
    pool_margin: usize,
}

impl Recommender {
    pub fn new(
        catalog: Arc<Catalog>,
        encoder: Arc<dyn TextEncoder>,
        index: Arc<dyn NeighborIndex>,
    ) -> Self {
        Self {
            catalog,
            encoder,
            index,
            pool_margin: DEFAULT_POOL_MARGIN,
        }
    }

    pub fn with_pool_margin(mut self, pool_margin: usize) -> Self {
        self.pool_margin = pool_margin;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Dispatches to the seeded or genre-only query
    pub fn recommend(
        &self,
        genre: &str,
        seed_title: Option<&str>,
        top_n: usize,
    ) -> AppResult<Vec<Recommendation>> {
        match seed_title {
            Some(seed) => self.recommend_by_genre_and_movie(genre, seed, top_n),
            None => self.recommend_by_genre(genre, top_n),
        }
    }

    /// Most popular movies of a genre
    ///
    /// Equal popularities keep catalog order and unknown popularities (NaN)
    /// sort last. An unknown genre gives an empty list.
    pub fn recommend_by_genre(&self, genre: &str, top_n: usize) -> AppResult<Vec<Recommendation>> {
        ensure_positive(top_n)?;

        let mut matches = self.catalog.by_genre(genre);
        matches.sort_by(|a, b| by_popularity_desc(a.popularity, b.popularity));
        matches.truncate(top_n);

        tracing::debug!(genre = %genre, top_n, returned = matches.len(), "Genre recommendations");

        Ok(matches.into_iter().map(Recommendation::from).collect())
    }

    /// Movies of a genre closest to a seed movie, nearest first
    ///
    /// Fails with `NotFound` when the seed title is not in the catalog. The
    /// seed never appears in its own results, and fewer than `top_n`
    /// results come back when fewer genre matches exist.
    pub fn recommend_by_genre_and_movie(
        &self,
        genre: &str,
        seed_title: &str,
        top_n: usize,
    ) -> AppResult<Vec<Recommendation>> {
        ensure_positive(top_n)?;

        let picks = self.similar_in_genre(genre, seed_title, top_n)?;

        tracing::debug!(
            genre = %genre,
            seed = %seed_title,
            top_n,
            returned = picks.len(),
            "Seeded recommendations"
        );

        Ok(picks
            .into_iter()
            .map(|(movie, _)| Recommendation::from(movie))
            .collect())
    }

    /// Genre-filtered neighbors of the seed with their distances
    ///
    /// The pool starts at `top_n + 1 + margin` and doubles until enough
    /// candidates survive filtering or the whole index has been seen.
    fn similar_in_genre(
        &self,
        genre: &str,
        seed_title: &str,
        top_n: usize,
    ) -> AppResult<Vec<(&MovieRecord, f32)>> {
        let seed = self.catalog.by_title(seed_title)?;

        if !self.catalog.has_genre(genre) {
            return Ok(Vec::new());
        }

        let total = self.index.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let query = self.encoder.encode(seed.combined_text());
        let mut pool = top_n
            .saturating_add(1)
            .saturating_add(self.pool_margin)
            .min(total);

        loop {
            let neighbors = self.index.query(&query, pool);
            let exhausted = pool >= total || neighbors.len() < pool;

            let picks: Vec<(&MovieRecord, f32)> = neighbors
                .iter()
                .filter_map(|n| match self.catalog.get(n.row) {
                    Some(movie) => Some((movie, n.distance)),
                    None => {
                        tracing::warn!(row = n.row, "Neighbor row outside the catalog");
                        None
                    }
                })
                .filter(|(movie, _)| movie.title != seed.title)
                .filter(|(movie, _)| movie.has_genre(genre))
                .take(top_n)
                .collect();

            if picks.len() >= top_n || exhausted {
                return Ok(picks);
            }

            tracing::debug!(
                pool,
                found = picks.len(),
                top_n,
                "Neighbor pool too small, widening"
            );
            pool = pool.saturating_mul(2).min(total);
        }
    }
}

fn by_popularity_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

fn ensure_positive(top_n: usize) -> AppResult<()> {
    if top_n == 0 {
        return Err(AppError::InvalidInput(
            "Number of recommendations must be at least 1".to_string(),
        ));
    }
    Ok(())
}
