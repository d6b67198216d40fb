use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;

use super::ApiError;
use crate::era::Era;
use crate::server::SharedState;
use crate::settings::Settings;
use crate::story::{GenerationParams, QuestionRequest, StoryRequest, StoryStream};

#[derive(Debug, Deserialize)]
pub struct StoryBody {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    era: Option<String>,
    #[serde(default)]
    question: Option<String>,
}

impl StoryBody {
    fn into_request(self, settings: &Settings) -> Result<(StoryRequest, Option<String>), ApiError> {
        let location = self
            .location
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("location is required"))?;
        let era = self
            .era
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| Era::default().as_str().to_string());
        let params = GenerationParams::from_settings(settings);
        let request = StoryRequest::new(location, era, params)?;
        Ok((request, self.question))
    }
}

/// `POST /api/history/story`: stream a narrative as `text/plain`.
pub async fn story(
    State(state): State<SharedState>,
    body: Result<Json<StoryBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let settings = state.settings.snapshot();
    let (request, _) = body.into_request(&settings)?;
    let deltas = state.relay.stream_story(&request, &settings.api_keys).await?;
    Ok(text_stream(deltas))
}

/// `POST /api/history/ask`: stream an answer to a question about a place.
pub async fn ask(
    State(state): State<SharedState>,
    body: Result<Json<StoryBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let settings = state.settings.snapshot();
    let (story, question) = body.into_request(&settings)?;
    let request = QuestionRequest::new(story, question.unwrap_or_default())?;
    let deltas = state.relay.ask(&request, &settings.api_keys).await?;
    Ok(text_stream(deltas))
}

/// Forward deltas as a chunked body. The status line is already sent when a
/// mid-stream error arrives, so the error aborts the body and the client sees
/// an incomplete transfer rather than a clean end.
fn text_stream(deltas: StoryStream) -> Response {
    let body = deltas.map(|item| {
        item.map_err(|e| {
            tracing::warn!(error = %e, "upstream stream failed, aborting response body");
            e
        })
    });
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response()
}
