use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sse::{decode_utf8_prefix, drain_sse_frames, flush_sse_tail};
use crate::config::GeneratorSettings;
use crate::proposal::{GenerationRequest, Generator};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

// ── HTTP client builder ───────────────────────────────────────────────────────

pub fn build_http_client(settings: &GeneratorSettings) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_millis(settings.timeout_ms))
        .connect_timeout(Duration::from_secs(10));

    if let Ok(proxy_url) = std::env::var("HTTP_PROXY") {
        builder = builder.proxy(reqwest::Proxy::all(&proxy_url)?);
    }

    builder.build().map_err(Into::into)
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible `/chat/completions` backend.
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    settings: GeneratorSettings,
    api_key: String,
}

impl ChatCompletionsGenerator {
    pub fn new(client: reqwest::Client, settings: GeneratorSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .with_context(|| format!("{} env var not set", settings.api_key_env))?;
        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    pub fn from_settings(settings: &GeneratorSettings) -> Result<Self> {
        let client = build_http_client(settings)?;
        Self::new(client, settings.clone())
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    fn build_request<'a>(&'a self, request: &'a GenerationRequest) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.settings.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ApiMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: (self.settings.max_tokens > 0).then_some(self.settings.max_tokens),
            stream: self.settings.stream.then_some(true),
        }
    }
}

#[async_trait]
impl Generator for ChatCompletionsGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        on_delta: &mut (dyn for<'d> FnMut(&'d str) + Send),
    ) -> Result<String> {
        let base_url = self.settings.base_url.trim_end_matches('/');
        let body = self.build_request(request);
        debug!(
            model = %self.settings.model,
            stream = self.settings.stream,
            user_prompt_chars = request.user_prompt.chars().count(),
            "sending chat completion"
        );

        let mut resp = self
            .client
            .post(format!("{base_url}/chat/completions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("HTTP request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, "chat completion rejected");
            return Err(anyhow!("API error {status}: {text}"));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !content_type.contains("text/event-stream") {
            return parse_non_stream_response(resp).await;
        }

        let mut merged = String::new();
        let mut pending = String::new();
        let mut undecoded = Vec::new();

        while let Some(chunk) = resp.chunk().await.context("failed reading stream chunk")? {
            undecoded.extend_from_slice(&chunk);
            decode_utf8_prefix(&mut undecoded, &mut pending);
            drain_sse_frames(&mut pending, &mut merged, on_delta);
        }
        if !undecoded.is_empty() {
            pending.push_str(&String::from_utf8_lossy(&undecoded));
        }
        flush_sse_tail(&mut pending, &mut merged, on_delta);

        debug!(chars = merged.chars().count(), "stream finished");
        Ok(merged)
    }
}

/// Empty content is passed through as an empty string; deciding what an empty
/// completion means belongs to the proposal layer.
async fn parse_non_stream_response(resp: reqwest::Response) -> Result<String> {
    let parsed: ApiResponse = resp.json().await.context("failed to parse API response")?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    debug!(chars = text.chars().count(), "completion received");
    Ok(text)
}
