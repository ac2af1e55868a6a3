//! Webhook dispatcher: authenticates inbound callbacks and fans decoded
//! events out to the registered handler.
//!
//! The request body is read exactly once, through the tee-verify pipeline,
//! so the HMAC is computed over the same bytes the JSON decoder sees. The
//! path fails closed: any decode or verification problem rejects the whole
//! request before a handler runs.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;

use crate::config::ChannelConfig;
use crate::error::{LineBotError, Result};
use crate::events::{CallbackEnvelope, EventKind, Message, Operation};
use crate::pipeline;

/// Header carrying the base64 HMAC-SHA256 digest of the raw request body.
pub const SIGNATURE_HEADER: &str = "X-Line-ChannelSignature";

/// Status returned for malformed or unverifiable callback requests.
const INVALID_POST: u16 = 470;

/// Callbacks invoked per decoded event, on the request task itself. Handler
/// panics are not caught here; they propagate to the server's fault boundary.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_message(&self, message: &Message);
    async fn on_operation(&self, operation: &Operation);
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ChannelConfig>,
    pub handler: Arc<dyn EventHandler>,
}

impl AppState {
    pub fn new(config: ChannelConfig, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            config: Arc::new(config),
            handler,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/callback", any(callback))
        .with_state(state)
}

/// The callback endpoint. Exposed so the route can also be mounted on a
/// custom path or merged into a larger router.
pub async fn callback(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    if parts.method != Method::POST {
        return (StatusCode::NOT_FOUND, format!("invalid page, {path:?}")).into_response();
    }

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("application/json") || signature.is_empty() {
        return invalid_post(&path, "");
    }

    let (tee, verify) =
        pipeline::verify_stream(body.into_data_stream(), &state.config.secret, &signature);
    // collect() drains and closes the body, which is what makes the blocking
    // wait below safe.
    let raw = match tee.collect().await {
        Ok(raw) => raw,
        Err(err) => return invalid_post(&path, &err.to_string()),
    };
    match verify.wait().await {
        Ok(true) => {}
        Ok(false) => return invalid_post(&path, "invalid signature"),
        Err(err) => return invalid_post(&path, &err.to_string()),
    }

    let envelope: CallbackEnvelope = match serde_json::from_slice(&raw) {
        Ok(envelope) => envelope,
        Err(err) => return invalid_post(&path, &err.to_string()),
    };

    for event in &envelope.result {
        match event.kind() {
            Ok(EventKind::Message(message)) => state.handler.on_message(&message).await,
            Ok(EventKind::Operation(operation)) => state.handler.on_operation(&operation).await,
            Ok(EventKind::Unrecognized) => {
                tracing::debug!(
                    event_type = %event.event_type,
                    id = %event.id,
                    "skipping event with unrecognized type"
                );
            }
            Err(err) => return invalid_post(&path, &err.to_string()),
        }
    }

    StatusCode::OK.into_response()
}

fn invalid_post(path: &str, err: &str) -> Response {
    let status = StatusCode::from_u16(INVALID_POST).expect("static status code");
    tracing::debug!(path, error = err, "rejecting callback request");
    (status, format!("invalid post request, {path:?} error: {err}")).into_response()
}

pub async fn run(host: &str, port: u16, state: AppState) -> Result<()> {
    run_with_shutdown(host, port, state, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(host: &str, port: u16, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LineBotError::Runtime(e.to_string()))?;
    tracing::info!(%addr, "webhook server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| LineBotError::Runtime(e.to_string()))?;
    Ok(())
}
