//! Small hand-checked catalog shared by unit tests.
//!
//! Titles 1-3 and 7 lean on the first feature axis (sci-fi/adventure), 4-5 on the
//! second (Korean drama/reality) and 6 on the third. Title 7 has no latent factors,
//! user 3 has history but no factors, user 4 has factors but no history.

use super::artifacts::{
    InteractionRecord, ItemFactorRecord, Manifest, RawArtifacts, TitleRecord, UserFactorRecord,
};
use crate::models::{TitleId, TitleType, UserId};

pub fn title_record(id: u64, name: &str, features: Vec<f32>) -> TitleRecord {
    TitleRecord {
        id: TitleId(id),
        name: name.to_string(),
        title_type: TitleType::Movie,
        language: "English".to_string(),
        release_year: Some(2010),
        genres: vec![],
        popularity: 0.1,
        features,
    }
}

#[allow(clippy::too_many_arguments)]
fn title(
    id: u64,
    name: &str,
    title_type: TitleType,
    language: &str,
    year: i32,
    genres: &[&str],
    popularity: f64,
    features: [f32; 3],
) -> TitleRecord {
    TitleRecord {
        id: TitleId(id),
        name: name.to_string(),
        title_type,
        language: language.to_string(),
        release_year: Some(year),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        popularity,
        features: features.to_vec(),
    }
}

fn item(id: u64, factors: [f32; 2]) -> ItemFactorRecord {
    ItemFactorRecord {
        title_id: TitleId(id),
        factors: factors.to_vec(),
    }
}

fn user(id: u64, factors: [f32; 2]) -> UserFactorRecord {
    UserFactorRecord {
        user_id: UserId(id),
        factors: factors.to_vec(),
    }
}

fn interaction(user_id: u64, title_id: u64, rating: Option<f32>) -> InteractionRecord {
    InteractionRecord {
        user_id: UserId(user_id),
        title_id: TitleId(title_id),
        rating,
    }
}

pub fn sample_artifacts() -> RawArtifacts {
    use TitleType::{Movie, Series};

    RawArtifacts {
        manifest: Manifest {
            schema_version: 1,
            feature_dim: 3,
            factor_dim: 2,
            exported_at: None,
        },
        titles: vec![
            title(7, "Deep Field", Movie, "English", 2022, &["Documentary", "Sci-Fi"], 0.5, [0.6, 0.0, 0.8]),
            title(1, "Star Voyage", Movie, "English", 2015, &["Sci-Fi", "Adventure"], 0.9, [1.0, 0.0, 0.0]),
            title(2, "Lone Star", Movie, "English", 2008, &["Western", "Drama"], 0.4, [0.9, 0.1, 0.0]),
            title(3, "Galaxy Run", Series, "English", 2019, &["Sci-Fi"], 0.7, [0.8, 0.0, 0.2]),
            title(4, "Seoul Nights", Series, "Korean", 2020, &["Drama", "Romance"], 0.8, [0.0, 1.0, 0.0]),
            title(5, "Kitchen Wars", Series, "Korean", 2021, &["Reality"], 0.3, [0.1, 0.9, 0.1]),
            title(6, "Quiet Harbor", Movie, "French", 1999, &["Drama"], 0.2, [0.0, 0.0, 1.0]),
        ],
        item_factors: vec![
            item(1, [1.0, 0.0]),
            item(2, [0.7, 0.3]),
            item(3, [0.9, 0.1]),
            item(4, [0.0, 1.0]),
            item(5, [0.1, 0.8]),
            item(6, [0.3, 0.3]),
        ],
        user_factors: vec![user(1, [1.0, 0.2]), user(2, [0.0, 1.0]), user(4, [0.5, 0.5])],
        interactions: vec![
            interaction(1, 1, Some(5.0)),
            interaction(1, 3, Some(4.0)),
            interaction(2, 4, Some(5.0)),
            interaction(3, 6, None),
            interaction(3, 2, Some(3.0)),
        ],
    }
}

/// Catalog larger than the minimum candidate pool: 55 English titles sit close to
/// title 1 and four Korean titles sit far from it, closest first by id descending.
pub fn wide_artifacts() -> RawArtifacts {
    let vector = |id: u64| -> Vec<f32> {
        match id {
            1 => vec![1.0, 0.0],
            2..=56 => vec![1.0, 0.01 * id as f32],
            _ => vec![0.1 * (id - 56) as f32, 1.0],
        }
    };

    let titles = (1..=60)
        .map(|id| TitleRecord {
            language: if id > 56 { "Korean" } else { "English" }.to_string(),
            ..title_record(id, &format!("Title {}", id), vector(id))
        })
        .collect();
    let item_factors = (1..=60)
        .map(|id| ItemFactorRecord {
            title_id: TitleId(id),
            factors: vector(id),
        })
        .collect();

    RawArtifacts {
        manifest: Manifest {
            schema_version: 1,
            feature_dim: 2,
            factor_dim: 2,
            exported_at: None,
        },
        titles,
        item_factors,
        user_factors: vec![user(1, [1.0, 0.0])],
        interactions: vec![interaction(1, 1, Some(5.0))],
    }
}
