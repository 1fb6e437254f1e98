/// End-to-end fusion engine tests over the real CF model and CB index types
mod common;

use std::sync::Arc;

use common::*;
use destination_recommender::error::{AppError, ArtifactKind};
use destination_recommender::models::{RecommendedDestination, NEUTRAL_SCORE};
use destination_recommender::services::hybrid::{
    blend, reconcile, sanitize_scores, select_top_n, DEFAULT_PREFERENCES,
};
use destination_recommender::services::{
    CollaborativeScorer, ContentScorer, HybridRecommender, IndexContentScorer,
    LatentFactorScorer,
};
use destination_recommender::config::HybridConfig;

fn assert_ranked_and_finite(recs: &[RecommendedDestination]) {
    for pair in recs.windows(2) {
        assert!(pair[0].final_score >= pair[1].final_score);
    }
    for rec in recs {
        assert!(rec.final_score.is_finite());
        assert!(rec.lat.is_finite());
        assert!(rec.lng.is_finite());
        assert!(!rec.city.is_empty());
        assert!(!rec.state.is_empty());
    }
}

#[tokio::test]
async fn profile_path_blends_cf_and_preferences() {
    let fixture = fixture();

    let recs = fixture.recommender.recommend(1, 3, None).await.unwrap();

    assert_eq!(recs.len(), 3);
    assert_ranked_and_finite(&recs);
    assert_eq!(fixture.embedder.seen(), vec!["playas y naturaleza".to_string()]);

    // Recompute the expected ranking from the same scorers
    let destinations = Arc::new(InMemoryDestinations {
        locations: catalog(),
    });
    let cf = LatentFactorScorer::with_model(
        cf_model(),
        Arc::new(InMemoryRatings { ratings: ratings() }),
        destinations,
    );
    let cb = IndexContentScorer::with_index(
        destination_index(),
        Arc::new(KeywordEmbedder::default()),
    );

    let mut cf_scores = cf.score(1).await.unwrap();
    let mut cb_scores = cb.score("playas y naturaleza", 50).await.unwrap();
    for rated in [3, 5, 27] {
        assert!(!cf_scores.contains_key(&rated));
    }
    sanitize_scores(&mut cf_scores);
    sanitize_scores(&mut cb_scores);

    let expected = select_top_n(blend(&reconcile(&cf_scores, &cb_scores), 0.5), 3);
    let got: Vec<_> = recs
        .iter()
        .map(|r| (r.destination_id, r.final_score))
        .collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn explicit_query_with_llm_down_uses_literal_text_and_cold_start_mean() {
    let fixture = fixture();

    let recs = fixture
        .recommender
        .recommend(99, 5, Some("playas tranquilas"))
        .await
        .unwrap();

    assert_eq!(fixture.embedder.seen(), vec!["playas tranquilas".to_string()]);
    assert_eq!(recs.len(), 5);
    assert_ranked_and_finite(&recs);

    // cold start mean of all ratings is 3.6; best CB match rescales to ~5.0
    let best = 0.2 * 3.6 + 0.8 * 5.0;
    assert!((recs[0].final_score - best).abs() < 1e-3);
    for rec in &recs {
        assert!(rec.final_score >= 0.2 * 3.6 + 0.8 * 1.0 - 1e-9);
        assert!(rec.final_score <= best + 1e-9);
    }

    // beach destinations win for a beach query
    assert_eq!(recs[0].destination_id % 3, 0);
}

#[tokio::test]
async fn user_without_preferences_uses_default_keywords() {
    let fixture = fixture();

    let recs = fixture.recommender.recommend(2, 4, None).await.unwrap();

    assert_eq!(recs.len(), 4);
    assert_eq!(fixture.embedder.seen(), vec![DEFAULT_PREFERENCES.to_string()]);
}

#[tokio::test]
async fn n_larger_than_catalog_returns_every_candidate() {
    let fixture = fixture();

    let recs = fixture.recommender.recommend(1, 100, None).await.unwrap();

    assert_eq!(recs.len(), CATALOG_SIZE as usize);
    assert_ranked_and_finite(&recs);

    // destinations without coordinates come out neutral
    let no_coords = recs.iter().find(|r| r.destination_id == 10).unwrap();
    assert_eq!(no_coords.lat, NEUTRAL_SCORE);
    assert_eq!(no_coords.lng, NEUTRAL_SCORE);
}

#[tokio::test]
async fn missing_cb_index_is_a_distinct_fatal_error() {
    let destinations = Arc::new(InMemoryDestinations {
        locations: catalog(),
    });
    let cf = LatentFactorScorer::with_model(
        cf_model(),
        Arc::new(InMemoryRatings { ratings: ratings() }),
        destinations.clone(),
    );
    let cb = IndexContentScorer::new(
        "/nonexistent/destination_index.json",
        Arc::new(KeywordEmbedder::default()),
    );

    let recommender = HybridRecommender::new(
        Arc::new(cf),
        Arc::new(cb),
        Arc::new(FailingExpander),
        Arc::new(users()),
        destinations,
        HybridConfig::default(),
    );

    let err = recommender.recommend(1, 5, None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::ArtifactMissing {
            kind: ArtifactKind::CbIndex,
            ..
        }
    ));
    assert!(err.is_fatal());
    assert!(!recommender.artifacts_ready().cb_index);
    assert!(recommender.artifacts_ready().cf_model);
}

#[tokio::test]
async fn missing_cf_model_is_a_distinct_fatal_error() {
    let destinations = Arc::new(InMemoryDestinations {
        locations: catalog(),
    });
    let cf = LatentFactorScorer::new(
        "/nonexistent/cf_svd_model.json",
        Arc::new(InMemoryRatings { ratings: ratings() }),
        destinations.clone(),
    );
    let cb = IndexContentScorer::with_index(
        destination_index(),
        Arc::new(KeywordEmbedder::default()),
    );

    let recommender = HybridRecommender::new(
        Arc::new(cf),
        Arc::new(cb),
        Arc::new(FailingExpander),
        Arc::new(users()),
        destinations,
        HybridConfig::default(),
    );

    let err = recommender.recommend(1, 5, None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::ArtifactMissing {
            kind: ArtifactKind::CfModel,
            ..
        }
    ));
}

#[tokio::test]
async fn all_nan_scores_come_out_neutral() {
    let ids: Vec<_> = (1..=CATALOG_SIZE).collect();
    let recommender = HybridRecommender::new(
        Arc::new(NanScorer { ids: ids.clone() }),
        Arc::new(NanScorer { ids }),
        Arc::new(FailingExpander),
        Arc::new(users()),
        Arc::new(InMemoryDestinations {
            locations: catalog(),
        }),
        HybridConfig::default(),
    );

    let recs = recommender.recommend(1, 10, None).await.unwrap();

    assert_eq!(recs.len(), 10);
    assert!(recs.iter().all(|r| r.final_score == NEUTRAL_SCORE));

    let json = serde_json::to_string(&recs).unwrap();
    assert!(!json.contains("null"));
}

#[tokio::test]
async fn empty_enrichment_returns_no_recommendations() {
    let fixture = fixture_with(Arc::new(UnenrichableDestinations));

    let recs = fixture.recommender.recommend(1, 5, None).await.unwrap();

    assert!(recs.is_empty());
}
