//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use destination_recommender::config::HybridConfig;
use destination_recommender::db::{DestinationStore, RatingStore, UserStore};
use destination_recommender::error::{AppError, Result};
use destination_recommender::models::{
    DestinationId, DestinationLocation, Rating, ScoreMap, User, UserId,
};
use destination_recommender::services::collaborative_filtering::FactorEntry;
use destination_recommender::services::{
    CollaborativeScorer, ContentScorer, DestinationIndex, HybridRecommender, IndexArtifact,
    IndexContentScorer, LatentFactorModel, LatentFactorScorer, QueryExpander, TextEmbedder,
};

pub const CATALOG_SIZE: DestinationId = 30;

pub struct InMemoryRatings {
    pub ratings: Vec<Rating>,
}

#[async_trait]
impl RatingStore for InMemoryRatings {
    async fn ratings_for_user(&self, user_id: UserId) -> Result<Vec<Rating>> {
        let mut rows: Vec<Rating> = self
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .copied()
            .collect();
        rows.sort_by_key(|r| r.destination_id);
        Ok(rows)
    }

    async fn global_mean(&self) -> Result<Option<f64>> {
        if self.ratings.is_empty() {
            return Ok(None);
        }
        let total: f64 = self.ratings.iter().map(|r| r.score).sum();
        Ok(Some(total / self.ratings.len() as f64))
    }
}

pub struct InMemoryDestinations {
    pub locations: Vec<DestinationLocation>,
}

#[async_trait]
impl DestinationStore for InMemoryDestinations {
    async fn all_ids(&self) -> Result<Vec<DestinationId>> {
        let mut ids: Vec<_> = self.locations.iter().map(|l| l.destination_id).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn locations(&self, ids: &[DestinationId]) -> Result<Vec<DestinationLocation>> {
        Ok(self
            .locations
            .iter()
            .filter(|l| ids.contains(&l.destination_id))
            .cloned()
            .collect())
    }
}

/// Catalog ids exist but metadata lookups come back empty
pub struct UnenrichableDestinations;

#[async_trait]
impl DestinationStore for UnenrichableDestinations {
    async fn all_ids(&self) -> Result<Vec<DestinationId>> {
        Ok((1..=CATALOG_SIZE).collect())
    }

    async fn locations(&self, _ids: &[DestinationId]) -> Result<Vec<DestinationLocation>> {
        Ok(Vec::new())
    }
}

pub struct InMemoryUsers {
    pub users: HashMap<UserId, User>,
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn find(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&user_id).cloned())
    }
}

/// Deterministic 3-d embedding: beach, culture, nature
#[derive(Default)]
pub struct KeywordEmbedder {
    pub seen: Mutex<Vec<String>>,
}

impl KeywordEmbedder {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextEmbedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.seen.lock().unwrap().push(text.to_string());

        let text = text.to_lowercase();
        let hit = |needles: &[&str]| {
            if needles.iter().any(|n| text.contains(n)) {
                1.0
            } else {
                0.1
            }
        };

        Ok(vec![
            hit(&["playa", "beach"]),
            hit(&["cultur", "museo"]),
            hit(&["natur", "selva"]),
        ])
    }
}

pub struct FailingExpander;

#[async_trait]
impl QueryExpander for FailingExpander {
    async fn expand(&self, _query: &str) -> Result<String> {
        Err(AppError::QueryExpansion("connection refused".to_string()))
    }
}

/// Scorer fault: every score is NaN
pub struct NanScorer {
    pub ids: Vec<DestinationId>,
}

#[async_trait]
impl CollaborativeScorer for NanScorer {
    async fn score(&self, _user_id: UserId) -> Result<ScoreMap> {
        Ok(self.ids.iter().map(|id| (*id, f64::NAN)).collect())
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[async_trait]
impl ContentScorer for NanScorer {
    async fn score(&self, _query: &str, _top_k: usize) -> Result<ScoreMap> {
        Ok(self.ids.iter().map(|id| (*id, f64::NAN)).collect())
    }

    fn is_ready(&self) -> bool {
        true
    }
}

pub fn catalog() -> Vec<DestinationLocation> {
    (1..=CATALOG_SIZE)
        .map(|id| DestinationLocation {
            destination_id: id,
            city: format!("Ciudad {}", id),
            state: if id % 2 == 0 { "Quintana Roo" } else { "Oaxaca" }.to_string(),
            // every fifth destination has no coordinates
            lat: (id % 5 != 0).then(|| 15.0 + id as f64 / 10.0),
            lng: (id % 5 != 0).then(|| -95.0 - id as f64 / 10.0),
        })
        .collect()
}

fn destination_vector(id: DestinationId) -> Vec<f32> {
    let t = id as f32 / CATALOG_SIZE as f32;
    match id % 3 {
        0 => vec![1.0, t, 0.1],
        1 => vec![t, 1.0, 0.1],
        _ => vec![0.1, t, 1.0],
    }
}

pub fn destination_index() -> DestinationIndex {
    let ids: Vec<DestinationId> = (1..=CATALOG_SIZE).collect();
    DestinationIndex::from_artifact(IndexArtifact {
        dimension: 3,
        vectors: ids.iter().map(|id| destination_vector(*id)).collect(),
        destination_ids: ids,
    })
    .expect("valid test index")
}

pub fn cf_model() -> LatentFactorModel {
    let users = [(1, 0.3, vec![0.4, -0.2]), (2, -0.1, vec![-0.3, 0.5])]
        .into_iter()
        .map(|(id, bias, factors)| (id, FactorEntry { bias, factors }))
        .collect();

    let items = (1..=CATALOG_SIZE)
        .map(|id| {
            let x = id as f64 / CATALOG_SIZE as f64;
            (
                id,
                FactorEntry {
                    bias: x - 0.5,
                    factors: vec![x, 1.0 - x],
                },
            )
        })
        .collect();

    LatentFactorModel {
        global_mean: 3.5,
        rating_scale: (1.0, 5.0),
        users,
        items,
    }
}

pub fn ratings() -> Vec<Rating> {
    [(1, 3, 4.0), (1, 5, 5.0), (1, 27, 3.0), (2, 8, 2.0), (2, 9, 4.0)]
        .into_iter()
        .map(|(user_id, destination_id, score)| Rating {
            user_id,
            destination_id,
            score,
        })
        .collect()
}

pub fn users() -> InMemoryUsers {
    let mut users = HashMap::new();
    users.insert(
        1,
        User {
            user_id: 1,
            name: "Ana".to_string(),
            preferences_text: Some("playas y naturaleza".to_string()),
        },
    );
    users.insert(
        2,
        User {
            user_id: 2,
            name: "Luis".to_string(),
            preferences_text: None,
        },
    );
    InMemoryUsers { users }
}

/// Everything a pipeline needs; the scorers are built on the real CF model
/// and CB index types
pub struct Fixture {
    pub recommender: HybridRecommender,
    pub embedder: Arc<KeywordEmbedder>,
}

pub fn fixture() -> Fixture {
    fixture_with(Arc::new(InMemoryDestinations {
        locations: catalog(),
    }))
}

pub fn fixture_with(destinations: Arc<dyn DestinationStore>) -> Fixture {
    let ratings: Arc<dyn RatingStore> = Arc::new(InMemoryRatings { ratings: ratings() });
    let embedder = Arc::new(KeywordEmbedder::default());

    let cf = LatentFactorScorer::with_model(cf_model(), ratings, destinations.clone());
    let cb = IndexContentScorer::with_index(destination_index(), embedder.clone());

    let recommender = HybridRecommender::new(
        Arc::new(cf),
        Arc::new(cb),
        Arc::new(FailingExpander),
        Arc::new(users()),
        destinations,
        HybridConfig::default(),
    );

    Fixture {
        recommender,
        embedder,
    }
}
