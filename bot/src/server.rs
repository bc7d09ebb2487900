use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pkb_ai::respond::Responder;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub requester_id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub ok: bool,
    pub chunks: usize,
    pub embedding_model: String,
    pub generated_at_utc: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(responder: Arc<Responder>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ask", post(ask))
        .with_state(responder)
}

async fn healthz(State(responder): State<Arc<Responder>>) -> Json<HealthResponse> {
    let index = responder.index();
    Json(HealthResponse {
        ok: true,
        chunks: index.len(),
        embedding_model: index.meta.embedding_model.clone(),
        generated_at_utc: index.meta.generated_at_utc.clone(),
    })
}

async fn ask(
    State(responder): State<Arc<Responder>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if request.requester_id.trim().is_empty() {
        return Err(bad_request("requester_id must not be empty"));
    }

    // Provider calls block; keep them off the async workers.
    let reply = tokio::task::spawn_blocking(move || {
        responder.respond(&request.question, &request.requester_id)
    })
    .await
    .map_err(|e| {
        tracing::error!("ask worker failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                code: "INTERNAL".to_string(),
                message: "request worker failed".to_string(),
            }),
        )
    })?;

    Ok(Json(AskResponse { reply }))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }),
    )
}

pub async fn serve(responder: Arc<Responder>, bind: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let addr: std::net::SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {bind}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("policybot listening on http://{addr}");
    axum::serve(listener, router(responder))
        .await
        .context("server shutdown")?;
    Ok(())
}
