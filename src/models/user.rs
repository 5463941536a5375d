use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;

use super::TitleId;

/// Identifier for a user with recorded interactions or latent factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single (title, rating) pair from a user's history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    pub title_id: TitleId,
    /// Explicit rating if one was given, otherwise the interaction is implicit
    pub rating: Option<f32>,
}

impl Interaction {
    /// Weight of this interaction when building a taste profile.
    /// Implicit interactions count as 1.0.
    pub fn weight(&self) -> f32 {
        self.rating.unwrap_or(1.0)
    }
}

/// Everything a user has watched, read-only at serving time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserHistory {
    interactions: Vec<Interaction>,
    seen: HashSet<TitleId>,
}

impl UserHistory {
    /// Records an interaction. A repeated title keeps the highest rating.
    pub fn record(&mut self, interaction: Interaction) {
        if self.seen.insert(interaction.title_id) {
            self.interactions.push(interaction);
            return;
        }

        if let Some(existing) = self
            .interactions
            .iter_mut()
            .find(|i| i.title_id == interaction.title_id)
        {
            existing.rating = match (existing.rating, interaction.rating) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn has_seen(&self, title_id: TitleId) -> bool {
        self.seen.contains(&title_id)
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}
