use actix_cors::Cors;
use actix_web::{dev::Service, web, App, HttpServer};
use anyhow::Context;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use destination_recommender::config::Config;
use destination_recommender::db::{self, PgDestinationStore, PgRatingStore, PgUserStore};
use destination_recommender::handlers::{self, RecommendationHandlerState};
use destination_recommender::services::{
    HybridRecommender, IndexContentScorer, LatentFactorScorer, OllamaEmbedder, OllamaExpander,
};

/// Wire stores, scorers and the fusion engine together
async fn build_recommender(config: &Config) -> anyhow::Result<HybridRecommender> {
    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if config.database.run_migrations {
        db::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
    }

    let ratings = Arc::new(PgRatingStore::new(pool.clone()));
    let destinations = Arc::new(PgDestinationStore::new(pool.clone()));
    let users = Arc::new(PgUserStore::new(pool));

    let embedder = Arc::new(
        OllamaEmbedder::new(&config.embedding).context("Failed to create embedding client")?,
    );
    let expander =
        Arc::new(OllamaExpander::new(&config.llm).context("Failed to create LLM client")?);

    let cf = Arc::new(LatentFactorScorer::new(
        &config.models.cf_model_path,
        ratings,
        destinations.clone(),
    ));
    let cb = Arc::new(IndexContentScorer::new(
        &config.models.cb_index_path,
        embedder,
    ));

    if config.models.preload_artifacts {
        cf.preload().await.context("CF model could not be loaded")?;
        cb.preload().await.context("CB index could not be loaded")?;
        tracing::info!("Scoring artifacts preloaded");
    } else {
        tracing::warn!("Artifact preloading disabled, models load on first request");
    }

    Ok(HybridRecommender::new(
        cf,
        cb,
        expander,
        users,
        destinations,
        config.hybrid,
    ))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},actix_web=info", config.app.log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    tracing::info!(
        "Starting destination-recommender v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Environment: {}", config.app.env);

    let recommender = match build_recommender(&config).await {
        Ok(recommender) => Arc::new(recommender),
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            eprintln!("ERROR: {:#}", e);
            std::process::exit(1);
        }
    };

    let handler_state = web::Data::new(RecommendationHandlerState { recommender });
    let port = config.app.port;

    tracing::info!("HTTP server listening on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            destination_recommender::metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            destination_recommender::metrics::observe_http_request(
                                &method,
                                &path,
                                500,
                                start.elapsed(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .app_data(handler_state.clone())
            .route(
                "/metrics",
                web::get().to(destination_recommender::metrics::serve_metrics),
            )
            .configure(handlers::configure)
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
