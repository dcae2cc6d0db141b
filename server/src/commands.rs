//! HTTP-команды: страница, конфиг UI, чат (SSE), debug-лог, локальные модели.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use backend_core::ChatTurn;
use futures_util::{stream, StreamExt};
use local_provider::ModelInfo;
use serde::Serialize;
use serde_json::json;

use crate::config::{GenerationDefaults, TITLE};
use crate::state::AppState;

/// Имя финального SSE-события чата.
pub const DONE_EVENT: &str = "done";

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub title: String,
    pub models: Vec<String>,
    pub default_model: Option<String>,
    pub system_message: String,
    pub defaults: GenerationDefaults,
    pub has_token: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalModelsInfo {
    pub installed: Vec<ModelInfo>,
    pub loaded: Option<String>,
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.page.as_str().to_owned())
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

pub async fn ui_config(State(state): State<AppState>) -> Json<UiConfig> {
    let models = state.router.models().to_vec();
    Json(UiConfig {
        title: TITLE.to_string(),
        default_model: models.first().cloned(),
        models,
        system_message: state.config.system_message.clone(),
        defaults: state.config.defaults,
        has_token: state.config.has_token(),
    })
}

fn bad_request(state: &AppState, reason: String) -> Response {
    state.log.warn(format!("Rejected chat request: {}", reason));
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}

/// Ход чата. Невалидный запрос (тело или поля) — 400 с `{error}`; иначе SSE,
/// где каждое `message`-событие несёт полный текст ответа на текущий момент.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatTurn>, JsonRejection>,
) -> Response {
    let turn = match payload {
        Ok(Json(turn)) => turn,
        Err(rejection) => return bad_request(&state, rejection.body_text()),
    };
    if let Err(e) = state.router.validate(&turn) {
        return bad_request(&state, e.to_string());
    }

    let texts = state.dispatcher.respond(turn).map(|text| {
        Ok::<_, Infallible>(Event::default().data(json!({ "text": text }).to_string()))
    });
    let done = stream::once(async { Ok(Event::default().event(DONE_EVENT).data("")) });

    Sse::new(texts.chain(done))
        .keep_alive(KeepAlive::default())
        .into_response()
}

pub async fn logs(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "lines": state.log.snapshot() }))
}

pub async fn local_models(State(state): State<AppState>) -> Json<LocalModelsInfo> {
    Json(LocalModelsInfo {
        installed: state.local.model_manager().list_installed(),
        loaded: state.local.loaded_model().await,
    })
}
