//! Streaming relay to the upstream chat-completion provider.
//!
//! [`StoryRelay::stream_story`] builds the prompt, issues a single POST with
//! the selected provider's credential, and hands back the decoded deltas as a
//! [`StoryStream`]. Nothing is retried: a failed request surfaces immediately.

use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::decoder::decode_frames;
use super::{QuestionRequest, RelayError, StoryRequest, StoryStream};
use crate::config::ProvidersConfig;
use crate::prompt::{build_prompt, build_question_prompt, Prompt};
use crate::settings::ApiKeys;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// HTTP client for the configured providers. Cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct StoryRelay {
    client: reqwest::Client,
    endpoints: ProvidersConfig,
}

impl StoryRelay {
    /// Create a relay. Generation is long-running, so only the connect phase
    /// has a timeout.
    pub fn new(endpoints: ProvidersConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, endpoints })
    }

    /// Generate a story for the request's location and era.
    pub async fn stream_story(
        &self,
        request: &StoryRequest,
        keys: &ApiKeys,
    ) -> Result<StoryStream, RelayError> {
        let prompt = build_prompt(request.location(), request.era());
        self.generate(request, keys, &prompt).await
    }

    /// Answer a question about the request's location and era.
    pub async fn ask(
        &self,
        request: &QuestionRequest,
        keys: &ApiKeys,
    ) -> Result<StoryStream, RelayError> {
        let story = request.story();
        let prompt = build_question_prompt(story.location(), story.era(), request.question());
        self.generate(story, keys, &prompt).await
    }

    async fn generate(
        &self,
        request: &StoryRequest,
        keys: &ApiKeys,
        prompt: &Prompt,
    ) -> Result<StoryStream, RelayError> {
        let params = request.params();
        if request.location().trim().is_empty() {
            return Err(RelayError::InvalidRequest("location is required".into()));
        }
        let api_key = keys.get(params.provider).ok_or_else(|| {
            RelayError::Configuration(format!(
                "missing credential for provider {provider}; run `timewarp settings set-key {provider} <KEY>`",
                provider = params.provider
            ))
        })?;

        let endpoint = params.provider.endpoint(&self.endpoints);
        let body = ChatRequest {
            model: params.model(),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: params.stream,
        };

        tracing::info!(
            provider = %params.provider,
            model = body.model,
            location = request.location(),
            era = request.era(),
            stream = params.stream,
            "requesting completion"
        );

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "upstream rejected completion request");
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        if params.stream {
            let deltas = decode_frames(response.bytes_stream())
                .map(|item| item.map_err(|e| RelayError::Transport(e.to_string())));
            return Ok(Box::pin(deltas));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        let completion: ChatCompletion =
            serde_json::from_str(&text).map_err(|e| RelayError::Upstream {
                status: status.as_u16(),
                body: format!("malformed completion body: {e}"),
            })?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty());

        tracing::debug!(chars = content.as_ref().map_or(0, |c| c.chars().count()), "completion received");
        Ok(Box::pin(futures::stream::iter(content.map(Ok::<_, RelayError>))))
    }
}
