//! Turns a (command, current document) pair into a validated full-document
//! [`Proposal`], isolating the document state machine from the unreliable
//! external generator.

pub mod prompt;
pub(crate) mod validate;

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Deserialize;
use tracing::debug;

use self::prompt::{SYSTEM_PROMPT, build_user_prompt};
use self::validate::{
    is_full_document, preview_chars, starter_document, strip_code_fence, wrap_as_document,
};

pub const DEFAULT_INFO: &str = "Rebuilt the full page.";
pub const WRAPPED_INFO: &str = "Response was not a full document; wrapped as plain text.";
pub const DEFAULT_PREVIEW_CHARS: usize = 2000;

const EMPTY_BASE_TITLE: &str = "New Project";
const WRAPPED_TITLE: &str = "Generated page";

// ── Proposal ──────────────────────────────────────────────────────────────────

/// A candidate full-document replacement awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub content: String,
    pub info: String,
    pub source_command: String,
    pub created_at: DateTime<Local>,
}

impl Proposal {
    pub fn new(
        content: impl Into<String>,
        info: impl Into<String>,
        source_command: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            info: info.into(),
            source_command: source_command.into(),
            created_at: Local::now(),
        }
    }
}

// ── Generator boundary ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// The external completion service. Implementations may be slow, fail, or
/// return anything at all; validation happens in [`ProposalService`].
#[async_trait]
pub trait Generator: Send + Sync {
    /// Return the raw completion text. `on_delta` receives streamed pieces
    /// as they arrive (implementations that do not stream may never call it).
    async fn generate(
        &self,
        request: &GenerationRequest,
        on_delta: &mut (dyn for<'d> FnMut(&'d str) + Send),
    ) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("generator request failed: {0}")]
    Transport(String),

    #[error("generator returned an empty response")]
    EmptyResponse,

    #[error("generator returned {total_chars} chars that are not a full HTML document")]
    InvalidDocument {
        /// Raw response, truncated to the configured preview length.
        preview: String,
        total_chars: usize,
    },
}

impl GenerationError {
    /// Bounded diagnostic payload, if the failure carries one.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Transport(detail) => Some(detail),
            Self::InvalidDocument { preview, .. } => Some(preview),
            Self::EmptyCommand | Self::EmptyResponse => None,
        }
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// What to do with a response that fails the document validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnInvalid {
    #[default]
    Reject,
    Wrap,
}

impl OnInvalid {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Wrap => "wrap",
        }
    }
}

impl fmt::Display for OnInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown on_invalid strategy `{0}` (expected \"reject\" or \"wrap\")")]
pub struct UnknownStrategy(pub String);

impl FromStr for OnInvalid {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "wrap" => Ok(Self::Wrap),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalOptions {
    pub on_invalid: OnInvalid,
    /// Upper bound on diagnostic payloads carried by errors.
    pub preview_chars: usize,
}

impl Default for ProposalOptions {
    fn default() -> Self {
        Self {
            on_invalid: OnInvalid::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

// ── Service ───────────────────────────────────────────────────────────────────

pub struct ProposalService {
    generator: Arc<dyn Generator>,
    options: ProposalOptions,
}

impl ProposalService {
    pub fn new(generator: Arc<dyn Generator>, options: ProposalOptions) -> Self {
        Self { generator, options }
    }

    pub fn options(&self) -> &ProposalOptions {
        &self.options
    }

    pub async fn generate(
        &self,
        command: &str,
        current_document: &str,
    ) -> Result<Proposal, GenerationError> {
        self.generate_with(command, current_document, &mut |_: &str| {})
            .await
    }

    /// Same as [`generate`](Self::generate), forwarding streamed pieces to
    /// `on_delta`.
    pub async fn generate_with(
        &self,
        command: &str,
        current_document: &str,
        on_delta: &mut (dyn for<'d> FnMut(&'d str) + Send),
    ) -> Result<Proposal, GenerationError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(GenerationError::EmptyCommand);
        }

        let base = if current_document.trim().is_empty() {
            starter_document(EMPTY_BASE_TITLE)
        } else {
            current_document.to_string()
        };
        let request = GenerationRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(command, &base),
        };
        debug!(
            command_chars = command.chars().count(),
            document_chars = base.chars().count(),
            "requesting proposal"
        );

        let raw = self
            .generator
            .generate(&request, on_delta)
            .await
            .map_err(|e| {
                GenerationError::Transport(preview_chars(
                    &format!("{e:#}"),
                    self.options.preview_chars,
                ))
            })?;

        self.validate(command, &raw)
    }

    fn validate(&self, command: &str, raw: &str) -> Result<Proposal, GenerationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        let body = strip_code_fence(raw);
        if is_full_document(body) {
            return Ok(Proposal::new(body, DEFAULT_INFO, command));
        }

        debug!(
            strategy = %self.options.on_invalid,
            response_chars = raw.chars().count(),
            "response is not a full document"
        );
        match self.options.on_invalid {
            OnInvalid::Reject => Err(GenerationError::InvalidDocument {
                preview: preview_chars(raw, self.options.preview_chars),
                total_chars: raw.chars().count(),
            }),
            OnInvalid::Wrap => Ok(Proposal::new(
                wrap_as_document(raw, WRAPPED_TITLE),
                WRAPPED_INFO,
                command,
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::VecDeque, sync::Mutex};

    use anyhow::anyhow;

    use super::*;

    /// Scripted generator: replays canned replies in order and records every
    /// request it receives.
    #[derive(Default)]
    pub(crate) struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub(crate) requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn reply(self: &Arc<Self>, text: &str) -> Arc<Self> {
            self.replies
                .lock()
                .unwrap()
                .push_back(Ok(text.to_string()));
            Arc::clone(self)
        }

        pub(crate) fn fail(self: &Arc<Self>, message: &str) -> Arc<Self> {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
            Arc::clone(self)
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
            on_delta: &mut (dyn for<'d> FnMut(&'d str) + Send),
        ) -> anyhow::Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("no scripted reply left".to_string()));
            match next {
                Ok(text) => {
                    on_delta(&text);
                    Ok(text)
                }
                Err(message) => Err(anyhow!(message)),
            }
        }
    }

    pub(crate) fn service(
        generator: Arc<ScriptedGenerator>,
        on_invalid: OnInvalid,
    ) -> ProposalService {
        ProposalService::new(
            generator,
            ProposalOptions {
                on_invalid,
                ..ProposalOptions::default()
            },
        )
    }
}
