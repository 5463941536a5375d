use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Stable catalog identifier for a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(pub u64);

impl Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a movie or series in the catalog, as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Title {
    /// Unique identifier for the title
    pub id: TitleId,
    /// Display name of the movie or series
    pub name: String,
    /// Type of content (movie or series)
    pub title_type: TitleType,
    /// Original language label (e.g., "English", "Korean")
    pub language: String,
    pub release_year: Option<i32>,
    /// Genre tags, used for post-filtering
    pub genres: Vec<String>,
    /// Popularity score exported with the catalog
    pub popularity: f64,
}

impl Title {
    /// Returns true if any of the title's genres matches one of `genres` (case-insensitive)
    pub fn has_any_genre(&self, genres: &[String]) -> bool {
        genres
            .iter()
            .any(|wanted| self.genres.iter().any(|g| g.eq_ignore_ascii_case(wanted)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TitleType {
    Movie,
    Series,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_title(genres: &[&str]) -> Title {
        Title {
            id: TitleId(7),
            name: "Dark".to_string(),
            title_type: TitleType::Series,
            language: "German".to_string(),
            release_year: Some(2017),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            popularity: 0.8,
        }
    }

    #[test]
    fn test_title_id_display() {
        assert_eq!(format!("{}", TitleId(3173903)), "3173903");
    }

    #[test]
    fn test_title_id_serde_transparent() {
        let json = serde_json::to_string(&TitleId(42)).unwrap();
        assert_eq!(json, "42");

        let deserialized: TitleId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, TitleId(42));
    }

    #[test]
    fn test_title_type_serialization() {
        assert_eq!(serde_json::to_string(&TitleType::Movie).unwrap(), "\"movie\"");
        assert_eq!(serde_json::to_string(&TitleType::Series).unwrap(), "\"series\"");
    }

    #[test]
    fn test_has_any_genre_is_case_insensitive() {
        let title = create_title(&["Sci-Fi", "Thriller"]);
        assert!(title.has_any_genre(&["sci-fi".to_string()]));
        assert!(title.has_any_genre(&["Comedy".to_string(), "THRILLER".to_string()]));
        assert!(!title.has_any_genre(&["Comedy".to_string()]));
        assert!(!title.has_any_genre(&[]));
    }
}
