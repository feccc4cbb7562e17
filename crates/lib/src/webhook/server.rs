//! Webhook HTTP server (single port): health probe and the fulfillment endpoint.

use crate::config::Config;
use crate::llm::{AnswerSource, GeminiClient};
use crate::webhook::handler;
use crate::webhook::protocol::{IntentRequest, WebhookRequest};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Header carrying the shared webhook secret when one is configured.
pub const SECRET_HEADER: &str = "X-Webhook-Secret";

/// Shared state for request handlers. Read-only after startup.
#[derive(Clone)]
pub struct WebhookState {
    pub config: Arc<Config>,
    /// Generative backend for unmatched intents (Gemini in production, fakes in tests).
    pub answer_source: Arc<dyn AnswerSource>,
}

impl WebhookState {
    pub fn new(config: Config, answer_source: Arc<dyn AnswerSource>) -> Self {
        Self {
            config: Arc::new(config),
            answer_source,
        }
    }
}

/// Build the router: `GET /` health, `POST /webhook` fulfillment.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", post(webhook))
        .with_state(state)
}

/// Run the webhook server; binds to config.server.bind:config.server.port and blocks until
/// SIGINT/SIGTERM. `config` must already carry environment overrides (see `config::apply_env_overrides`).
pub async fn run_server(config: Config) -> Result<()> {
    let gemini = GeminiClient::new(&config.gemini)
        .context("building gemini client")?;
    if gemini.is_configured() {
        log::info!(
            "gemini model {} at {}",
            config.gemini.model,
            config.gemini.base_url
        );
    } else {
        log::warn!("GEMINI_API_KEY not set; unmatched intents will get the contact-admin reply");
    }
    if config.webhook.secret.is_some() {
        log::info!("webhook secret required in {} header", SECRET_HEADER);
    }

    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let state = WebhookState::new(config, Arc::new(gemini));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("webhook listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server exited")?;
    log::info!("webhook stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /webhook — verifies the optional secret, parses the fulfillment request, always answers 200 with a reply.
async fn webhook(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(ref expected) = state.config.webhook.secret {
        let provided = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            log::debug!("webhook: rejected request with bad or missing secret");
            return StatusCode::FORBIDDEN.into_response();
        }
    }
    let req: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            log::debug!("webhook: unparsable body: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let req = IntentRequest::from(req);
    let reply = handler::fulfill(&req, &state.config, state.answer_source.as_ref()).await;
    Json(reply).into_response()
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<WebhookState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "service": "collegebot",
        "port": state.config.server.port,
    }))
}
