// ============================================
// Content-Based Scorer
// ============================================
//
// Query text → embedding → top-K nearest destinations → similarity
// rescaled into the 1-5 rating range using the batch's own min/max:
//
//   normalized = 1 + 4 * (raw - min) / (max - min + ε)
//
// Scores are therefore relative to the current query's candidate set.

use crate::error::{ArtifactKind, Result};
use crate::models::{ScoreMap, RATING_MAX, RATING_MIN};
use crate::services::artifact::ArtifactCell;
use crate::services::embedding::TextEmbedder;
use crate::services::vector_index::{DestinationIndex, Neighbor};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const NORMALIZATION_EPSILON: f64 = 1e-6;

/// Source of per-destination CB scores for a query
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentScorer: Send + Sync {
    /// Scores for at most `top_k` destinations nearest to `query`.
    ///
    /// Values may be non-finite; callers must sanitize.
    async fn score(&self, query: &str, top_k: usize) -> Result<ScoreMap>;

    fn is_ready(&self) -> bool;
}

pub struct IndexContentScorer {
    index: ArtifactCell<DestinationIndex>,
    embedder: Arc<dyn TextEmbedder>,
}

impl IndexContentScorer {
    pub fn new(index_path: impl Into<PathBuf>, embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            index: ArtifactCell::new(ArtifactKind::CbIndex, index_path),
            embedder,
        }
    }

    pub fn with_index(index: DestinationIndex, embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            index: ArtifactCell::ready(ArtifactKind::CbIndex, index),
            embedder,
        }
    }

    pub async fn preload(&self) -> Result<()> {
        self.index().await.map(|_| ())
    }

    async fn index(&self) -> Result<Arc<DestinationIndex>> {
        self.index
            .get_or_load(|_, path| DestinationIndex::load(path))
            .await
    }
}

#[async_trait]
impl ContentScorer for IndexContentScorer {
    async fn score(&self, query: &str, top_k: usize) -> Result<ScoreMap> {
        // A missing index must fail before any remote call is made
        let index = self.index().await?;

        let embedding = self.embedder.embed(query).await?;
        let neighbors = index.search(&embedding, top_k)?;

        debug!(
            requested = top_k,
            returned = neighbors.len(),
            "CB nearest neighbours retrieved"
        );

        Ok(rescale_similarities(&neighbors))
    }

    fn is_ready(&self) -> bool {
        self.index.is_loaded()
    }
}

/// Min/max rescale of raw similarities into the rating range
pub fn rescale_similarities(neighbors: &[Neighbor]) -> ScoreMap {
    if neighbors.is_empty() {
        return ScoreMap::new();
    }

    let (min, max) = neighbors
        .iter()
        .map(|n| n.similarity as f64)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });

    let span = RATING_MAX - RATING_MIN;
    neighbors
        .iter()
        .map(|n| {
            let raw = n.similarity as f64;
            let normalized = RATING_MIN + span * (raw - min) / (max - min + NORMALIZATION_EPSILON);
            (n.destination_id, normalized)
        })
        .collect()
}
