/// Destination Embedding Index
///
/// Exact inner-product nearest-neighbour search over L2-normalised
/// destination embeddings. The artifact is produced by the offline
/// embedding job: one vector per index slot plus the slot → destination id map.
use crate::error::{AppError, ArtifactKind, Result};
use crate::models::DestinationId;
use crate::services::artifact::read_artifact;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// On-disk layout of the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexArtifact {
    pub dimension: usize,
    #[serde(alias = "dest_ids")]
    pub destination_ids: Vec<DestinationId>,
    #[serde(alias = "embeddings")]
    pub vectors: Vec<Vec<f32>>,
}

/// Neighbour returned by a search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub destination_id: DestinationId,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct DestinationIndex {
    dimension: usize,
    destination_ids: Vec<DestinationId>,
    vectors: Vec<Vec<f32>>,
}

impl DestinationIndex {
    pub fn from_artifact(artifact: IndexArtifact) -> Result<Self> {
        if artifact.destination_ids.len() != artifact.vectors.len() {
            return Err(AppError::ArtifactCorrupt {
                kind: ArtifactKind::CbIndex,
                reason: format!(
                    "{} destination ids for {} vectors",
                    artifact.destination_ids.len(),
                    artifact.vectors.len()
                ),
            });
        }

        if let Some(bad) = artifact
            .vectors
            .iter()
            .position(|v| v.len() != artifact.dimension)
        {
            return Err(AppError::ArtifactCorrupt {
                kind: ArtifactKind::CbIndex,
                reason: format!(
                    "slot {} has dimension {}, expected {}",
                    bad,
                    artifact.vectors[bad].len(),
                    artifact.dimension
                ),
            });
        }

        let vectors = artifact
            .vectors
            .into_iter()
            .map(|mut v| {
                normalize_l2(&mut v);
                v
            })
            .collect();

        Ok(Self {
            dimension: artifact.dimension,
            destination_ids: artifact.destination_ids,
            vectors,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let artifact: IndexArtifact = read_artifact(ArtifactKind::CbIndex, path)?;
        let index = Self::from_artifact(artifact)?;

        info!(
            entries = index.len(),
            dimension = index.dimension,
            "Destination embedding index loaded"
        );

        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Top-`k` destinations by inner product with `query`, most similar first.
    ///
    /// `query` is normalised here; equal similarities keep slot order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(AppError::Embedding(format!(
                "query embedding dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        normalize_l2(&mut query);

        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .zip(self.destination_ids.iter())
            .map(|(vector, &destination_id)| Neighbor {
                destination_id,
                similarity: inner_product(vector, &query),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale to unit length; the zero vector is left untouched
fn normalize_l2(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
