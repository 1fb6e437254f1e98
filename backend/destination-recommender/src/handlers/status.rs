use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::handlers::RecommendationHandlerState;
use crate::services::ArtifactStatus;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub artifacts: ArtifactStatus,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub recommend_user: &'static str,
    pub recommend_query: &'static str,
    pub status: &'static str,
    pub health: &'static str,
    pub metrics: &'static str,
}

/// GET /status
#[get("/status")]
pub async fn service_status(state: web::Data<RecommendationHandlerState>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: "ok",
        message: "Hybrid destination recommender is running",
        version: env!("CARGO_PKG_VERSION"),
        artifacts: state.recommender.artifacts_ready(),
        endpoints: Endpoints {
            recommend_user: "GET /recommend/user/{user_id}?n=10",
            recommend_query: "POST /recommend/query?query_text=...&user_id=...&n=10",
            status: "GET /status",
            health: "GET /health",
            metrics: "GET /metrics",
        },
    })
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
