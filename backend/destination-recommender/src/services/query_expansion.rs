/// Query Expansion
///
/// Rewrites a short free-text travel query into a richer comma-separated
/// keyword list with a local LLM (Ollama `/api/generate`). The fusion engine
/// treats every failure here as recoverable and keeps the raw query.
use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Marker the prompt asks the model to put in front of its answer
pub const EXPANSION_MARKER: &str = "Expanded keywords:";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExpander: Send + Sync {
    async fn expand(&self, query: &str) -> Result<String>;
}

pub struct OllamaExpander {
    client: HttpClient,
    api_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaExpander {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl QueryExpander for OllamaExpander {
    async fn expand(&self, query: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(query),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::QueryExpansion(format!("LLM unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::QueryExpansion(format!(
                "LLM returned status {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::QueryExpansion(format!("invalid LLM response: {}", e)))?;

        let expanded = clean_expansion(&body.response);
        if expanded.is_empty() {
            return Err(AppError::QueryExpansion("LLM returned no keywords".to_string()));
        }

        debug!(query, expanded = %expanded, "Query expanded");
        Ok(expanded)
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        "You are a travel assistant for tourism in Mexico. The user wrote: \"{}\".\n\
         Expand it into a short comma-separated list of keywords describing the \
         kind of destination, activities and atmosphere they are looking for. \
         Answer with a single line that starts with \"{}\" and nothing else.",
        query, EXPANSION_MARKER
    )
}

/// Keep what follows the last marker and strip colons
pub fn clean_expansion(raw: &str) -> String {
    let text = raw.trim();
    let text = match text.rfind(EXPANSION_MARKER) {
        Some(pos) => &text[pos + EXPANSION_MARKER.len()..],
        None => text,
    };

    text.replace(':', "").trim().to_string()
}
