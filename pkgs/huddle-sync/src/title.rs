//! Session title synthesis - remote generator and deterministic fallback

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SyncConfig;

#[derive(Debug, Error)]
pub enum TitleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Title service returned status {0}")]
    Status(u16),

    #[error("Title service returned an empty title")]
    Empty,
}

/// Produces a human-readable title for an AI conversation
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate(&self, conversation: &str, session_id: &str) -> Result<String, TitleError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitleRequest<'a> {
    conversation: &'a str,
    session_id: &'a str,
}

#[derive(Deserialize)]
struct TitleResponse {
    title: String,
}

/// Title generator backed by `POST {base}/title-generation`
#[derive(Debug, Clone)]
pub struct HttpTitleGenerator {
    client: Client,
    endpoint: String,
}

impl HttpTitleGenerator {
    pub fn new(config: &SyncConfig) -> Result<Self, TitleError> {
        let client = Client::builder()
            .timeout(config.title_request_timeout)
            .build()?;
        Ok(Self::with_client(&config.title_service_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            endpoint: format!("{}/title-generation", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl TitleGenerator for HttpTitleGenerator {
    async fn generate(&self, conversation: &str, session_id: &str) -> Result<String, TitleError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TitleRequest {
                conversation,
                session_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TitleError::Status(status.as_u16()));
        }

        let body: TitleResponse = response.json().await?;
        let title = body.title.trim();
        if title.is_empty() {
            return Err(TitleError::Empty);
        }
        Ok(title.to_string())
    }
}

/// Title derived from a message alone.
///
/// Heading, emphasis and code markers are stripped, the first paragraph is
/// taken with its line breaks folded into spaces, and the result is cut to
/// `max_chars` characters with a trailing ellipsis.
pub fn fallback_title(content: &str, max_chars: usize) -> String {
    let stripped: String = content
        .chars()
        .filter(|c| !matches!(c, '#' | '*' | '_' | '~' | '`'))
        .collect();

    let paragraph = stripped
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or("");
    let line = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");

    if line.chars().count() <= max_chars {
        return line;
    }
    let truncated: String = line.chars().take(max_chars).collect();
    format!("{}...", truncated.trim_end())
}
