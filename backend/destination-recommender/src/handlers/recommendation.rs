/// Recommendation API Handlers
///
/// Profile-based and query-based entry points into the fusion engine
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::config::HybridConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{RecommendedDestination, UserId};
use crate::services::HybridRecommender;

/// Query parameters for GET /recommend/user/{user_id}
#[derive(Debug, Deserialize)]
pub struct UserRecommendationQuery {
    /// Number of recommendations (default 10)
    pub n: Option<usize>,
}

/// Query parameters for POST /recommend/query
#[derive(Debug, Deserialize)]
pub struct QueryRecommendationParams {
    pub query_text: Option<String>,
    pub user_id: UserId,
    pub n: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserRecommendationResponse {
    pub user_id: UserId,
    pub total_recommendations: usize,
    pub recommendations: Vec<RecommendedDestination>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRecommendationResponse {
    pub user_id: UserId,
    pub query: String,
    pub total_recommendations: usize,
    pub recommendations: Vec<RecommendedDestination>,
}

/// Handler state for recommendation endpoints
pub struct RecommendationHandlerState {
    pub recommender: Arc<HybridRecommender>,
}

/// Resolve `n` against the configured default and upper bound
pub fn validate_top_n(n: Option<usize>, config: &HybridConfig) -> Result<usize> {
    let n = n.unwrap_or(config.default_top_n);
    if n == 0 || n > config.max_top_n {
        return Err(AppError::Validation(format!(
            "n must be between 1 and {}",
            config.max_top_n
        )));
    }
    Ok(n)
}

fn outcome_label(result: &Result<Vec<RecommendedDestination>>) -> &'static str {
    match result {
        Ok(recs) if recs.is_empty() => "empty",
        Ok(_) => "ok",
        Err(_) => "error",
    }
}

/// GET /recommend/user/{user_id}
/// Recommendations from the user's ratings and stored preferences
#[get("/recommend/user/{user_id}")]
pub async fn recommend_for_user(
    path: web::Path<UserId>,
    query: web::Query<UserRecommendationQuery>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let n = validate_top_n(query.n, state.recommender.config())?;

    debug!("Profile recommendations for user: {}, n: {}", user_id, n);

    let started = Instant::now();
    let result = state.recommender.recommend(user_id, n, None).await;
    metrics::record_recommendation("profile", outcome_label(&result), started.elapsed());

    let recommendations = result.map_err(|err| {
        error!(user_id, error = %err, "Failed to compute recommendations");
        err
    })?;

    if recommendations.is_empty() {
        return Err(AppError::NotFound(format!(
            "No recommendations found for user {}",
            user_id
        )));
    }

    Ok(HttpResponse::Ok().json(UserRecommendationResponse {
        user_id,
        total_recommendations: recommendations.len(),
        recommendations,
    }))
}

/// POST /recommend/query
/// Recommendations steered by a free-text query
#[post("/recommend/query")]
pub async fn recommend_for_query(
    params: web::Query<QueryRecommendationParams>,
    state: web::Data<RecommendationHandlerState>,
) -> Result<HttpResponse> {
    let params = params.into_inner();
    let query_text = params
        .query_text
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("query_text must not be empty".to_string()))?
        .to_string();
    let n = validate_top_n(params.n, state.recommender.config())?;

    debug!(
        "Query recommendations for user: {}, n: {}, query: {}",
        params.user_id, n, query_text
    );

    let started = Instant::now();
    let result = state
        .recommender
        .recommend(params.user_id, n, Some(&query_text))
        .await;
    metrics::record_recommendation("query", outcome_label(&result), started.elapsed());

    let recommendations = result.map_err(|err| {
        error!(user_id = params.user_id, error = %err, "Failed to compute recommendations");
        err
    })?;

    if recommendations.is_empty() {
        return Err(AppError::NotFound(format!(
            "No recommendations found for query '{}'",
            query_text
        )));
    }

    Ok(HttpResponse::Ok().json(QueryRecommendationResponse {
        user_id: params.user_id,
        query: query_text,
        total_recommendations: recommendations.len(),
        recommendations,
    }))
}
