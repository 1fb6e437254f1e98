pub mod recommendation;
pub mod status;

pub use recommendation::{
    recommend_for_query, recommend_for_user, validate_top_n, QueryRecommendationResponse,
    RecommendationHandlerState, UserRecommendationResponse,
};
pub use status::{health, service_status};

use actix_web::web;

/// Register every recommender route on an actix `App`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(recommend_for_user)
        .service(recommend_for_query)
        .service(service_status)
        .route("/health", web::get().to(health));
}
