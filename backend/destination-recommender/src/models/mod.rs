use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DestinationId = i32;
pub type UserId = i32;

/// Midpoint of the 1-5 rating scale, used wherever a genuine score is
/// unavailable or non-finite
pub const NEUTRAL_SCORE: f64 = 3.0;

pub const RATING_MIN: f64 = 1.0;
pub const RATING_MAX: f64 = 5.0;

/// Per-destination scores produced by one scorer for one request.
///
/// Ordered by destination id so the reconciliation step has a
/// deterministic merge order.
pub type ScoreMap = BTreeMap<DestinationId, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub preferences_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub destination_id: DestinationId,
    pub score: f64,
}

/// Geographic metadata used to enrich a selected recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationLocation {
    pub destination_id: DestinationId,
    pub city: String,
    pub state: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Reconciled CF/CB pair for a single destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecord {
    pub cf_score: f64,
    pub cb_score: f64,
}

/// One entry of the ranked output; every numeric field is finite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedDestination {
    pub destination_id: DestinationId,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lng: f64,
    pub final_score: f64,
}
