use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use crate::{
    error::{AppError, AppResult, LoadError, LoadResult},
    models::MovieRecord,
};

pub mod genres;

pub use genres::parse_genre_field;

/// How many duplicated titles are named in logs and errors
const DUPLICATE_SAMPLE: usize = 5;

/// Load-time policy switches
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogOptions {
    /// Fail instead of warning when a title appears more than once
    pub reject_duplicate_titles: bool,
}

/// Raw CSV row; only the columns the recommender needs
#[derive(Debug, Deserialize)]
struct RawMovie {
    title: String,
    #[serde(default)]
    genres: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    popularity: Option<f64>,
}

/// Immutable, in-memory movie catalog
///
/// Rows keep their source order; that order is what the neighbor index
/// refers to and what breaks popularity ties.
#[derive(Debug)]
pub struct Catalog {
    movies: Vec<MovieRecord>,
    /// Title -> row of its first occurrence
    by_title: HashMap<String, usize>,
    genres: BTreeSet<String>,
    duplicate_titles: Vec<String>,
}

impl Catalog {
    /// Reads and normalizes a catalog CSV file
    pub fn load(path: impl AsRef<Path>, options: CatalogOptions) -> LoadResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| LoadError::io(path, e))?;
        let catalog = Self::from_reader(file, options)?;

        tracing::info!(
            path = %path.display(),
            movies = catalog.len(),
            genres = catalog.genres.len(),
            "Loaded movie catalog"
        );

        Ok(catalog)
    }

    /// Reads and normalizes catalog CSV from any reader
    ///
    /// The first line must be a header naming at least `title`; the
    /// `genres`, `overview` and `popularity` columns default to empty when
    /// absent or blank. A genre cell that cannot be parsed aborts the load.
    pub fn from_reader<R: Read>(reader: R, options: CatalogOptions) -> LoadResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut movies = Vec::new();
        for (i, row) in csv_reader.deserialize::<RawMovie>().enumerate() {
            let raw = row?;
            let row_number = i + 1;

            let genres = parse_genre_field(raw.genres.as_deref().unwrap_or_default()).map_err(
                |reason| LoadError::MalformedGenres {
                    row: row_number,
                    title: raw.title.clone(),
                    reason,
                },
            )?;

            movies.push(MovieRecord::new(
                raw.title,
                genres,
                raw.overview.unwrap_or_default(),
                raw.popularity.unwrap_or(0.0),
            ));
        }

        Self::from_records(movies, options)
    }

    /// Builds a catalog from already-normalized records
    pub fn from_records(movies: Vec<MovieRecord>, options: CatalogOptions) -> LoadResult<Self> {
        let mut by_title = HashMap::with_capacity(movies.len());
        let mut duplicate_titles = Vec::new();
        let mut genres = BTreeSet::new();

        for (row, movie) in movies.iter().enumerate() {
            if by_title.contains_key(&movie.title) {
                if !duplicate_titles.contains(&movie.title) {
                    duplicate_titles.push(movie.title.clone());
                }
            } else {
                by_title.insert(movie.title.clone(), row);
            }
            genres.extend(movie.genres.iter().cloned());
        }

        if !duplicate_titles.is_empty() {
            let sample: Vec<String> = duplicate_titles
                .iter()
                .take(DUPLICATE_SAMPLE)
                .cloned()
                .collect();

            if options.reject_duplicate_titles {
                return Err(LoadError::DuplicateTitles {
                    count: duplicate_titles.len(),
                    sample,
                });
            }

            tracing::warn!(
                count = duplicate_titles.len(),
                sample = ?sample,
                "Catalog has duplicated titles; lookups resolve to the first occurrence"
            );
        }

        Ok(Self {
            movies,
            by_title,
            genres,
            duplicate_titles,
        })
    }

    /// First record carrying exactly this title
    pub fn by_title(&self, title: &str) -> AppResult<&MovieRecord> {
        self.by_title
            .get(title)
            .map(|&row| &self.movies[row])
            .ok_or_else(|| AppError::NotFound(format!("Movie '{}' is not in the catalog", title)))
    }

    /// Records whose genre set contains `genre`, in catalog order
    pub fn by_genre(&self, genre: &str) -> Vec<&MovieRecord> {
        self.movies.iter().filter(|m| m.has_genre(genre)).collect()
    }

    /// Sorted union of every record's genres
    pub fn all_genres(&self) -> &BTreeSet<String> {
        &self.genres
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.contains(genre)
    }

    /// Sorted, de-duplicated titles of the genre's movies
    pub fn titles_in_genre(&self, genre: &str) -> Vec<&str> {
        let titles: BTreeSet<&str> = self
            .movies
            .iter()
            .filter(|m| m.has_genre(genre))
            .map(|m| m.title.as_str())
            .collect();
        titles.into_iter().collect()
    }

    pub fn get(&self, row: usize) -> Option<&MovieRecord> {
        self.movies.get(row)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MovieRecord> {
        self.movies.iter()
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Titles that occur on more than one row
    pub fn duplicate_titles(&self) -> &[String] {
        &self.duplicate_titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = r#"budget,genres,id,overview,popularity,title
237000000,"[{'id': 28, 'name': 'Action'}, {'id': 878, 'name': 'Science Fiction'}]",19995,"In the 22nd century, a paraplegic Marine is dispatched to Pandora.",150.437577,Avatar
300000000,"[{'id': 12, 'name': 'Adventure'}, {'id': 28, 'name': 'Action'}]",285,,139.082615,Pirates of the Caribbean: At World's End
0,,459488,A documentary with no genres.,,Untitled Project
"#;

    fn sample_catalog() -> Catalog {
        Catalog::from_reader(SAMPLE_CSV.as_bytes(), CatalogOptions::default()).unwrap()
    }

    #[test]
    fn test_load_normalizes_rows() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 3);

        let avatar = catalog.by_title("Avatar").unwrap();
        assert_eq!(avatar.genres, vec!["Action", "Science Fiction"]);
        assert!((avatar.popularity - 150.437577).abs() < 1e-9);
        assert!(avatar.combined_text().ends_with("Pandora. Action Science Fiction"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let catalog = sample_catalog();

        let pirates = catalog.by_title("Pirates of the Caribbean: At World's End").unwrap();
        assert_eq!(pirates.overview, "");
        assert_eq!(pirates.combined_text(), " Adventure Action");

        let untitled = catalog.by_title("Untitled Project").unwrap();
        assert!(untitled.genres.is_empty());
        assert_eq!(untitled.popularity, 0.0);
        assert_eq!(untitled.combined_text(), "A documentary with no genres. ");
    }

    #[test]
    fn test_by_title_not_found() {
        let catalog = sample_catalog();
        let err = catalog.by_title("Titanic").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_by_genre_keeps_catalog_order() {
        let catalog = sample_catalog();
        let titles: Vec<&str> = catalog
            .by_genre("Action")
            .iter()
            .map(|m| m.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec!["Avatar", "Pirates of the Caribbean: At World's End"]
        );
        assert!(catalog.by_genre("Western").is_empty());
    }

    #[test]
    fn test_all_genres_is_sorted_union() {
        let catalog = sample_catalog();
        let genres: Vec<&str> = catalog.all_genres().iter().map(String::as_str).collect();
        assert_eq!(genres, vec!["Action", "Adventure", "Science Fiction"]);
        assert!(catalog.has_genre("Adventure"));
        assert!(!catalog.has_genre("Science"));
    }

    #[test]
    fn test_titles_in_genre_sorted_and_unique() {
        let movies = vec![
            MovieRecord::new("Zulu", vec!["War".to_string()], "", 1.0),
            MovieRecord::new("Apocalypse Now", vec!["War".to_string()], "", 2.0),
            MovieRecord::new("Zulu", vec!["War".to_string()], "remake", 3.0),
        ];
        let catalog = Catalog::from_records(movies, CatalogOptions::default()).unwrap();
        assert_eq!(catalog.titles_in_genre("War"), vec!["Apocalypse Now", "Zulu"]);
    }

    #[test]
    fn test_duplicate_titles_resolve_to_first() {
        let movies = vec![
            MovieRecord::new("The Thing", vec!["Horror".to_string()], "1982", 9.0),
            MovieRecord::new("The Thing", vec!["Horror".to_string()], "2011", 4.0),
        ];
        let catalog = Catalog::from_records(movies, CatalogOptions::default()).unwrap();
        assert_eq!(catalog.by_title("The Thing").unwrap().overview, "1982");
        assert_eq!(catalog.duplicate_titles(), &["The Thing".to_string()]);
    }

    #[test]
    fn test_duplicate_titles_rejected_when_configured() {
        let movies = vec![
            MovieRecord::new("The Thing", Vec::new(), "1982", 9.0),
            MovieRecord::new("The Thing", Vec::new(), "2011", 4.0),
        ];
        let options = CatalogOptions {
            reject_duplicate_titles: true,
        };
        let err = Catalog::from_records(movies, options).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateTitles { count: 1, .. }));
    }

    #[test]
    fn test_malformed_genres_fail_the_load() {
        let csv = "title,genres,overview,popularity\nGood,\"[{'name': 'Drama'}]\",,1.0\nBad,Drama|Comedy,,2.0\n";
        let err = Catalog::from_reader(csv.as_bytes(), CatalogOptions::default()).unwrap_err();
        match err {
            LoadError::MalformedGenres { row, title, .. } => {
                assert_eq!(row, 2);
                assert_eq!(title, "Bad");
            }
            other => panic!("expected MalformedGenres, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_popularity_fails_the_load() {
        let csv = "title,genres,overview,popularity\nOdd,[],,very popular\n";
        let err = Catalog::from_reader(csv.as_bytes(), CatalogOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn test_missing_title_column_fails_the_load() {
        let csv = "name,genres,overview,popularity\nAvatar,[],,1.0\n";
        let err = Catalog::from_reader(csv.as_bytes(), CatalogOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Catalog::load("/nonexistent/movies.csv", CatalogOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
