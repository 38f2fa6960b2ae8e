// ABOUTME: talks to the ollama generate endpoint to obtain command suggestions.
// ABOUTME: collapses every transport, status, or decode failure into an absent reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// One completed exchange with the backend.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    /// Identifier the backend attached to this exchange, when it has one.
    pub session_id: Option<String>,
}

/// Single best-effort completion call. `None` covers every failure mode;
/// the dispatcher owns the user-facing wording.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Option<Completion>;
}

// Interactive callers never wait minutes; the cap only exists so a wedged
// backend cannot pin a connection task forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to create http client"),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    created_at: Option<String>,
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    async fn complete(&self, prompt: &str) -> Option<Completion> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        debug!(model = %self.model, "sending generate request");
        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "generate request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            error!(status = %response.status(), "backend answered with an error status");
            return None;
        }

        match response.json::<GenerateResponse>().await {
            Ok(body) => Some(Completion {
                text: body.response,
                session_id: body.created_at,
            }),
            Err(err) => {
                error!(error = %err, "generate response body did not decode");
                None
            }
        }
    }
}
