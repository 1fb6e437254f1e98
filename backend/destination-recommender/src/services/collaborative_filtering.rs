// ============================================
// Collaborative Filtering Scorer
// ============================================
//
// Scores destinations with a biased matrix-factorization model trained
// offline on the rating matrix (SVD-style latent factors).
//
//   predict(u, i) = mu + b_u + b_i + p_u · q_i     (clipped to the rating scale)
//
// Users with no ratings at all get the global mean for every destination.

use crate::db::{DestinationStore, RatingStore};
use crate::error::{AppError, ArtifactKind, Result};
use crate::metrics;
use crate::models::{DestinationId, ScoreMap, UserId, NEUTRAL_SCORE, RATING_MAX, RATING_MIN};
use crate::services::artifact::{read_artifact, ArtifactCell};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of per-destination CF scores for a user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollaborativeScorer: Send + Sync {
    /// Scores for every destination the user has not rated yet.
    ///
    /// Values may be non-finite; callers must sanitize.
    async fn score(&self, user_id: UserId) -> Result<ScoreMap>;

    fn is_ready(&self) -> bool;
}

/// Learned bias and factor vector for one user or destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorEntry {
    pub bias: f64,
    pub factors: Vec<f64>,
}

/// Persisted SVD model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatentFactorModel {
    pub global_mean: f64,
    #[serde(default = "default_rating_scale")]
    pub rating_scale: (f64, f64),
    pub users: HashMap<UserId, FactorEntry>,
    pub items: HashMap<DestinationId, FactorEntry>,
}

fn default_rating_scale() -> (f64, f64) {
    (RATING_MIN, RATING_MAX)
}

impl LatentFactorModel {
    pub fn load(path: &Path) -> Result<Self> {
        let model: Self = read_artifact(ArtifactKind::CfModel, path)?;
        model.validate()?;

        info!(
            users = model.users.len(),
            items = model.items.len(),
            factors = model.n_factors(),
            global_mean = model.global_mean,
            "Latent factor model loaded"
        );

        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let (low, high) = self.rating_scale;
        if !(low < high) {
            return Err(AppError::ArtifactCorrupt {
                kind: ArtifactKind::CfModel,
                reason: format!("invalid rating scale ({}, {})", low, high),
            });
        }

        let n_factors = self.n_factors();
        let mismatched = self
            .users
            .values()
            .chain(self.items.values())
            .any(|entry| entry.factors.len() != n_factors);

        if mismatched {
            return Err(AppError::ArtifactCorrupt {
                kind: ArtifactKind::CfModel,
                reason: format!("factor vectors must all have length {}", n_factors),
            });
        }

        Ok(())
    }

    pub fn n_factors(&self) -> usize {
        self.users
            .values()
            .chain(self.items.values())
            .next()
            .map(|entry| entry.factors.len())
            .unwrap_or(0)
    }

    /// Estimated rating of `destination_id` by `user_id`.
    ///
    /// Terms for an unknown user or destination are left out.
    pub fn predict(&self, user_id: UserId, destination_id: DestinationId) -> f64 {
        let user = self.users.get(&user_id);
        let item = self.items.get(&destination_id);

        let mut estimate = self.global_mean;
        if let Some(u) = user {
            estimate += u.bias;
        }
        if let Some(i) = item {
            estimate += i.bias;
        }
        if let (Some(u), Some(i)) = (user, item) {
            estimate += dot(&u.factors, &i.factors);
        }

        let (low, high) = self.rating_scale;
        estimate.clamp(low, high)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// CF scorer backed by the persisted latent factor model
pub struct LatentFactorScorer {
    model: ArtifactCell<LatentFactorModel>,
    ratings: Arc<dyn RatingStore>,
    destinations: Arc<dyn DestinationStore>,
}

impl LatentFactorScorer {
    pub fn new(
        model_path: impl Into<std::path::PathBuf>,
        ratings: Arc<dyn RatingStore>,
        destinations: Arc<dyn DestinationStore>,
    ) -> Self {
        Self {
            model: ArtifactCell::new(ArtifactKind::CfModel, model_path),
            ratings,
            destinations,
        }
    }

    pub fn with_model(
        model: LatentFactorModel,
        ratings: Arc<dyn RatingStore>,
        destinations: Arc<dyn DestinationStore>,
    ) -> Self {
        Self {
            model: ArtifactCell::ready(ArtifactKind::CfModel, model),
            ratings,
            destinations,
        }
    }

    /// Load the model now instead of on the first request
    pub async fn preload(&self) -> Result<()> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<Arc<LatentFactorModel>> {
        self.model
            .get_or_load(|_, path| LatentFactorModel::load(path))
            .await
    }
}

#[async_trait]
impl CollaborativeScorer for LatentFactorScorer {
    async fn score(&self, user_id: UserId) -> Result<ScoreMap> {
        let model = self.model().await?;

        let (all_destinations, rated) = tokio::try_join!(
            self.destinations.all_ids(),
            self.ratings.ratings_for_user(user_id)
        )?;

        if rated.is_empty() {
            let mean = self.ratings.global_mean().await?.unwrap_or(NEUTRAL_SCORE);
            info!(
                user_id,
                mean,
                destinations = all_destinations.len(),
                "Cold start user, CF falls back to the global mean"
            );
            metrics::record_cold_start();

            return Ok(all_destinations.into_iter().map(|id| (id, mean)).collect());
        }

        let rated: HashSet<DestinationId> = rated.iter().map(|r| r.destination_id).collect();
        let scores: ScoreMap = all_destinations
            .into_iter()
            .filter(|id| !rated.contains(id))
            .map(|id| (id, model.predict(user_id, id)))
            .collect();

        debug!(
            user_id,
            rated = rated.len(),
            scored = scores.len(),
            "CF scores predicted"
        );

        Ok(scores)
    }

    fn is_ready(&self) -> bool {
        self.model.is_loaded()
    }
}
