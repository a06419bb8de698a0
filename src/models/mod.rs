use serde::{Deserialize, Serialize};

pub mod vector;

pub use vector::{EncodedVector, Neighbor};

/// One catalog entry, normalized at load time
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub title: String,
    /// Trimmed genre names in source order, without blanks or repeats
    pub genres: Vec<String>,
    pub overview: String,
    pub popularity: f64,
    combined_text: String,
}

impl MovieRecord {
    /// Creates a record and derives its encoder input text
    ///
    /// The encoder text joins the genre names exactly as given, so it matches
    /// what a pre-fitted model was trained on. Membership and display use the
    /// cleaned names.
    pub fn new(
        title: impl Into<String>,
        genres: Vec<String>,
        overview: impl Into<String>,
        popularity: f64,
    ) -> Self {
        let overview = overview.into();
        let combined_text = format!("{} {}", overview, genres.join(" "));

        let mut unique: Vec<String> = Vec::with_capacity(genres.len());
        for genre in genres {
            let genre = genre.trim();
            if !genre.is_empty() && !unique.iter().any(|g| g == genre) {
                unique.push(genre.to_string());
            }
        }

        Self {
            title: title.into(),
            genres: unique,
            overview,
            popularity,
            combined_text,
        }
    }

    /// Exact genre membership test
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g == genre)
    }

    /// Genres joined with single spaces, the display form
    pub fn genre_label(&self) -> String {
        self.genres.join(" ")
    }

    /// Overview followed by the genre label; what the encoder sees
    pub fn combined_text(&self) -> &str {
        &self.combined_text
    }
}

/// A recommended movie as returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub genres: String,
    pub overview: String,
}

impl From<&MovieRecord> for Recommendation {
    fn from(movie: &MovieRecord) -> Self {
        Self {
            title: movie.title.clone(),
            genres: movie.genre_label(),
            overview: movie.overview.clone(),
        }
    }
}

/// Request body for the recommendations endpoint
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub genre: String,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

/// Response body for the recommendations endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub genre: String,
    pub seed: Option<String>,
    pub results: Vec<Recommendation>,
}
