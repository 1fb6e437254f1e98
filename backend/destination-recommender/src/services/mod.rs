// ============================================
// Recommendation Services
// ============================================
//
// Leaves first:
//   collaborative_filtering  latent-factor CF scorer (+ cold start)
//   content_based            embedding + nearest-neighbour CB scorer
//   query_expansion          LLM keyword expansion
//   hybrid                   fusion engine over the three above
//
// The CF model and CB index are loaded once through `artifact` and shared
// read-only by every request.

pub mod artifact;
pub mod collaborative_filtering;
pub mod content_based;
pub mod embedding;
pub mod hybrid;
pub mod query_expansion;
pub mod vector_index;

pub use collaborative_filtering::{CollaborativeScorer, LatentFactorModel, LatentFactorScorer};
pub use content_based::{ContentScorer, IndexContentScorer};
pub use embedding::{OllamaEmbedder, TextEmbedder};
pub use hybrid::{ArtifactStatus, HybridRecommender, QueryPlan, QuerySource};
pub use query_expansion::{OllamaExpander, QueryExpander};
pub use vector_index::{DestinationIndex, IndexArtifact};
