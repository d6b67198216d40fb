//! Story generation: request types, the frame decoder, and the streaming relay.
//!
//! A [`StoryRequest`] is built once per generation (usually from a settings
//! snapshot) and handed to [`relay::StoryRelay`], which returns a
//! [`StoryStream`] of text deltas.

pub mod decoder;
pub mod relay;

use std::pin::Pin;

use futures::Stream;
use thiserror::Error;

use crate::era::Era;
use crate::provider::Provider;
use crate::settings::{Settings, MAX_TOKENS_RANGE, TEMPERATURE_RANGE};

/// Errors surfaced by story generation.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required credential or setting is missing. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered with a non-success status.
    #[error("upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    /// The provider could not be reached, or the connection failed mid-stream.
    #[error("upstream transport error: {0}")]
    Transport(String),
}

impl RelayError {
    /// Upstream HTTP status, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` for errors that originate at the provider (status or transport).
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Transport(_))
    }
}

/// Lazy, finite sequence of text deltas. Dropping it abandons the upstream
/// connection.
pub type StoryStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

/// Generation parameters shared by story and question requests.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub provider: Provider,
    /// `None` uses the provider's default model.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

impl GenerationParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            provider: settings.provider,
            model: settings
                .selected_model
                .clone()
                .filter(|m| !m.trim().is_empty()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            stream: settings.stream_enabled,
        }
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    fn validate(&self) -> Result<(), RelayError> {
        if !(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(&self.temperature) {
            return Err(RelayError::InvalidRequest(format!(
                "temperature must be between {} and {}",
                TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1
            )));
        }
        if !(MAX_TOKENS_RANGE.0..=MAX_TOKENS_RANGE.1).contains(&self.max_tokens) {
            return Err(RelayError::InvalidRequest(format!(
                "max_tokens must be between {} and {}",
                MAX_TOKENS_RANGE.0, MAX_TOKENS_RANGE.1
            )));
        }
        Ok(())
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// One story generation request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryRequest {
    location: String,
    /// Era as supplied by the caller (id or display name). Unknown values are
    /// kept so the prompt can name them.
    era: String,
    params: GenerationParams,
}

impl StoryRequest {
    pub fn new(
        location: impl Into<String>,
        era: impl Into<String>,
        params: GenerationParams,
    ) -> Result<Self, RelayError> {
        let location = location.into().trim().to_string();
        if location.is_empty() {
            return Err(RelayError::InvalidRequest("location is required".into()));
        }
        params.validate()?;
        Ok(Self {
            location,
            era: era.into(),
            params,
        })
    }

    /// Build a request from a settings snapshot.
    pub fn from_settings(
        location: impl Into<String>,
        era: Era,
        settings: &Settings,
    ) -> Result<Self, RelayError> {
        Self::new(location, era.as_str(), GenerationParams::from_settings(settings))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn era(&self) -> &str {
        &self.era
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }
}

/// A free-form question about a place and era.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRequest {
    story: StoryRequest,
    question: String,
}

impl QuestionRequest {
    pub fn new(story: StoryRequest, question: impl Into<String>) -> Result<Self, RelayError> {
        let question = question.into().trim().to_string();
        if question.is_empty() {
            return Err(RelayError::InvalidRequest("question is required".into()));
        }
        Ok(Self { story, question })
    }

    pub fn story(&self) -> &StoryRequest {
        &self.story
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}
