// ============================================
// Hybrid Fusion Engine
// ============================================
//
// Combines CF and CB scores into one ranked, JSON-safe list:
//
//   request → alpha + query resolution → CF ∥ (expand → CB)
//           → sanitize → outer join (neutral fill) → blend → sanitize
//           → stable sort → top N → enrich → output sanitize
//
//   final = alpha * cf + (1 - alpha) * cb
//
// alpha = 0.2 for an explicit query (content-biased), 0.5 for the
// profile path. Every non-finite score becomes NEUTRAL_SCORE at each
// stage boundary.

use crate::config::HybridConfig;
use crate::db::{DestinationStore, UserStore};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    DestinationId, DestinationLocation, RecommendedDestination, ScoreMap, ScoreRecord, UserId,
    NEUTRAL_SCORE,
};
use crate::services::collaborative_filtering::CollaborativeScorer;
use crate::services::content_based::ContentScorer;
use crate::services::query_expansion::QueryExpander;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ALPHA_EXPLICIT_QUERY: f64 = 0.2;
pub const ALPHA_PROFILE: f64 = 0.5;
pub const DEFAULT_PREFERENCES: &str = "culture, nature, tourism";

/// Where the CB query text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Expanded,
    RawQuery,
    Preferences,
    DefaultKeywords,
}

impl QuerySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuerySource::Expanded => "expanded",
            QuerySource::RawQuery => "raw_query",
            QuerySource::Preferences => "preferences",
            QuerySource::DefaultKeywords => "default_keywords",
        }
    }
}

/// Blend weight and effective CB query for one request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub alpha: f64,
    pub query: String,
    pub source: QuerySource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub cf_model: bool,
    pub cb_index: bool,
}

pub struct HybridRecommender {
    cf: Arc<dyn CollaborativeScorer>,
    cb: Arc<dyn ContentScorer>,
    expander: Arc<dyn QueryExpander>,
    users: Arc<dyn UserStore>,
    destinations: Arc<dyn DestinationStore>,
    config: HybridConfig,
}

impl HybridRecommender {
    pub fn new(
        cf: Arc<dyn CollaborativeScorer>,
        cb: Arc<dyn ContentScorer>,
        expander: Arc<dyn QueryExpander>,
        users: Arc<dyn UserStore>,
        destinations: Arc<dyn DestinationStore>,
        config: HybridConfig,
    ) -> Self {
        Self {
            cf,
            cb,
            expander,
            users,
            destinations,
            config,
        }
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn artifacts_ready(&self) -> ArtifactStatus {
        ArtifactStatus {
            cf_model: self.cf.is_ready(),
            cb_index: self.cb.is_ready(),
        }
    }

    /// Ranked recommendations for `user_id`.
    ///
    /// `query_text` selects the explicit-query path when it holds non-blank
    /// text. An empty vector is a valid outcome (nothing survived
    /// selection or enrichment).
    pub async fn recommend(
        &self,
        user_id: UserId,
        top_n: usize,
        query_text: Option<&str>,
    ) -> Result<Vec<RecommendedDestination>> {
        let explicit = query_text.map(str::trim).filter(|q| !q.is_empty());

        // CF does not depend on the query, so it overlaps with expansion
        let (mut cf_scores, plan) = tokio::try_join!(
            self.cf.score(user_id),
            self.resolve_query(user_id, explicit)
        )?;

        let top_k = self.config.cb_top_k.max(top_n.saturating_mul(2));
        let mut cb_scores = self.cb.score(&plan.query, top_k).await?;

        metrics::record_non_finite("cf", sanitize_scores(&mut cf_scores));
        metrics::record_non_finite("cb", sanitize_scores(&mut cb_scores));

        let reconciled = reconcile(&cf_scores, &cb_scores);
        let mut blended = blend(&reconciled, plan.alpha);
        metrics::record_non_finite("blend", sanitize_blended(&mut blended));

        let candidates = blended.len();
        let selected = select_top_n(blended, top_n);

        debug!(
            user_id,
            cf = cf_scores.len(),
            cb = cb_scores.len(),
            candidates,
            selected = selected.len(),
            "Scores reconciled and ranked"
        );

        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<DestinationId> = selected.iter().map(|(id, _)| *id).collect();
        let locations = self.destinations.locations(&ids).await?;
        if locations.is_empty() {
            warn!(
                user_id,
                selected = ids.len(),
                "No catalog metadata for the selected destinations, returning nothing"
            );
            return Ok(Vec::new());
        }

        let results = enrich(&selected, locations);

        info!(
            user_id,
            alpha = plan.alpha,
            query_source = plan.source.as_str(),
            top_k,
            returned = results.len(),
            "Hybrid recommendations computed"
        );

        Ok(results)
    }

    /// Step 1: alpha and the text the CB scorer will embed
    pub async fn resolve_query(&self, user_id: UserId, explicit: Option<&str>) -> Result<QueryPlan> {
        if let Some(query) = explicit {
            let (text, source) = match self.expander.expand(query).await {
                Ok(expanded) if !expanded.trim().is_empty() => {
                    (expanded.trim().to_string(), QuerySource::Expanded)
                }
                Ok(_) => {
                    warn!(user_id, "Query expansion returned nothing, using raw query");
                    metrics::record_expansion_fallback("empty");
                    (query.to_string(), QuerySource::RawQuery)
                }
                Err(err) => {
                    warn!(user_id, error = %err, "Query expansion failed, using raw query");
                    metrics::record_expansion_fallback(expansion_failure_reason(&err));
                    (query.to_string(), QuerySource::RawQuery)
                }
            };

            return Ok(QueryPlan {
                alpha: ALPHA_EXPLICIT_QUERY,
                query: text,
                source,
            });
        }

        let preferences = self
            .users
            .find(user_id)
            .await?
            .and_then(|user| user.preferences_text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        let (query, source) = match preferences {
            Some(text) => (text, QuerySource::Preferences),
            None => {
                debug!(user_id, "No stored preferences, using default keywords");
                (DEFAULT_PREFERENCES.to_string(), QuerySource::DefaultKeywords)
            }
        };

        Ok(QueryPlan {
            alpha: ALPHA_PROFILE,
            query,
            source,
        })
    }
}

fn expansion_failure_reason(err: &AppError) -> &'static str {
    match err {
        AppError::QueryExpansion(_) => "error",
        _ => "unexpected",
    }
}

fn neutral_if_non_finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        NEUTRAL_SCORE
    }
}

/// Replace NaN/±Inf with the neutral score; returns how many were replaced
pub fn sanitize_scores(scores: &mut ScoreMap) -> usize {
    let mut replaced = 0;
    for score in scores.values_mut() {
        if !score.is_finite() {
            *score = NEUTRAL_SCORE;
            replaced += 1;
        }
    }
    replaced
}

fn sanitize_blended(blended: &mut [(DestinationId, f64)]) -> usize {
    let mut replaced = 0;
    for (_, score) in blended.iter_mut() {
        if !score.is_finite() {
            *score = NEUTRAL_SCORE;
            replaced += 1;
        }
    }
    replaced
}

/// Full outer join on destination id, missing sides filled with the
/// neutral score. Rows come out in ascending id order.
pub fn reconcile(cf: &ScoreMap, cb: &ScoreMap) -> Vec<(DestinationId, ScoreRecord)> {
    let ids: BTreeSet<DestinationId> = cf.keys().chain(cb.keys()).copied().collect();

    ids.into_iter()
        .map(|id| {
            let record = ScoreRecord {
                cf_score: cf.get(&id).copied().unwrap_or(NEUTRAL_SCORE),
                cb_score: cb.get(&id).copied().unwrap_or(NEUTRAL_SCORE),
            };
            (id, record)
        })
        .collect()
}

pub fn blend(records: &[(DestinationId, ScoreRecord)], alpha: f64) -> Vec<(DestinationId, f64)> {
    records
        .iter()
        .map(|(id, r)| (*id, alpha * r.cf_score + (1.0 - alpha) * r.cb_score))
        .collect()
}

/// Highest scores first; equal scores keep their merge order
pub fn select_top_n(
    mut blended: Vec<(DestinationId, f64)>,
    top_n: usize,
) -> Vec<(DestinationId, f64)> {
    // sort_by is stable
    blended.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    blended.truncate(top_n);
    blended
}

/// Inner join of the selection with catalog metadata, keeping rank order.
///
/// Missing or non-finite coordinates and scores are coerced to the
/// neutral value so the output is always JSON-finite.
pub fn enrich(
    selected: &[(DestinationId, f64)],
    locations: Vec<DestinationLocation>,
) -> Vec<RecommendedDestination> {
    let mut by_id: HashMap<DestinationId, DestinationLocation> = locations
        .into_iter()
        .map(|loc| (loc.destination_id, loc))
        .collect();

    selected
        .iter()
        .filter_map(|(id, score)| {
            by_id.remove(id).map(|loc| RecommendedDestination {
                destination_id: loc.destination_id,
                city: loc.city,
                state: loc.state,
                lat: neutral_if_non_finite(loc.lat.unwrap_or(NEUTRAL_SCORE)),
                lng: neutral_if_non_finite(loc.lng.unwrap_or(NEUTRAL_SCORE)),
                final_score: neutral_if_non_finite(*score),
            })
        })
        .collect()
}
