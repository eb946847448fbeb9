//! WebSocket transport around the lane detector.
//!
//! Each connection is a [`Session`]. Clients send `{"event": "image", "data":
//! "<data URL>"}` text frames and get back either `response_back` with the
//! annotated JPEG as a data URL, or `processing_error` with a message. The
//! image pipeline runs on tokio's blocking pool, one frame at a time per
//! connection.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::{self, FrameCodecError};
use crate::config::LaneConfig;
use crate::detection::LaneDetector;

pub const BANNER: &str = "Lane Detection Backend Running. Connect via WebSocket.";

/// Message from the browser client
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Message back to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Processed frame as a JPEG data URL
    ResponseBack(String),
    ProcessingError { error: String },
}

impl ServerEvent {
    fn error(message: impl Into<String>) -> Self {
        ServerEvent::ProcessingError { error: message.into() }
    }
}

/// One connected client
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub frames_processed: u64,
    pub errors: u64,
    connected_at: Instant,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            frames_processed: 0,
            errors: 0,
            connected_at: Instant::now(),
        }
    }

    fn record(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::ResponseBack(_) => self.frames_processed += 1,
            ServerEvent::ProcessingError { .. } => self.errors += 1,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, read-only state for every connection
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<LaneDetector>,
    pub allowed_origins: Arc<Vec<String>>,
    pub jpeg_quality: u8,
}

impl AppState {
    pub fn new(config: LaneConfig) -> Self {
        let allowed_origins = Arc::new(config.server.allowed_origins.clone());
        let jpeg_quality = config.server.jpeg_quality;
        Self {
            detector: Arc::new(LaneDetector::new(config)),
            allowed_origins,
            jpeg_quality,
        }
    }
}

/// Requests without an Origin header (non-browser clients) are always let through
pub fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    match origin {
        None => true,
        Some(_) if allowed.is_empty() => true,
        Some(origin) => allowed.iter().any(|a| a == origin),
    }
}

/// Decode, run the detector, re-encode
pub fn process_data_url(
    detector: &LaneDetector,
    data_url: &str,
    jpeg_quality: u8,
) -> Result<String, FrameCodecError> {
    let frame = codec::decode_data_url(data_url)?;
    let processed = detector.detect_lanes(&frame);
    codec::encode_jpeg_data_url(&processed, jpeg_quality)
}

/// Handle one `image` event off the async reactor
pub async fn handle_image_event(state: &AppState, data_url: String) -> ServerEvent {
    let detector = state.detector.clone();
    let quality = state.jpeg_quality;
    let result =
        tokio::task::spawn_blocking(move || process_data_url(&detector, &data_url, quality)).await;

    match result {
        Ok(Ok(encoded)) => ServerEvent::ResponseBack(encoded),
        Ok(Err(err)) => {
            warn!("Error handling image: {err}");
            ServerEvent::error(err.to_string())
        }
        Err(join_err) => {
            warn!("frame task failed: {join_err}");
            ServerEvent::error("frame processing task failed")
        }
    }
}

/// Dispatch one text frame. Unknown events produce no reply.
pub async fn handle_text_message(
    state: &AppState,
    session: &mut Session,
    text: &str,
) -> Option<ServerEvent> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            let event = ServerEvent::error(format!("invalid message: {err}"));
            session.record(&event);
            return Some(event);
        }
    };

    let event = match message.event.as_str() {
        "image" => match message.data {
            serde_json::Value::String(data_url) => handle_image_event(state, data_url).await,
            _ => ServerEvent::error("image event payload must be a data URL string"),
        },
        other => {
            debug!(session = %session.id, event = other, "ignoring unknown event");
            return None;
        }
    };

    session.record(&event);
    Some(event)
}

async fn index() -> &'static str {
    BANNER
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !origin_allowed(&state.allowed_origins, origin) {
        warn!(?origin, "rejecting WebSocket from disallowed origin");
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }
    ws.on_upgrade(move |socket| client_session(socket, state))
}

async fn client_session(mut socket: WebSocket, state: AppState) {
    let mut session = Session::new();
    info!("Client connected: {}", session.id);

    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                debug!(session = %session.id, "receive failed: {err}");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let Some(event) = handle_text_message(&state, &mut session, &text).await else {
                    continue;
                };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!("failed to serialize reply: {err}");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!(
        frames = session.frames_processed,
        errors = session.errors,
        elapsed_ms = session.connected_at.elapsed().as_millis() as u64,
        "Client disconnected: {}",
        session.id
    );
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: LaneConfig) -> Result<()> {
    let bind_addr = config.server.bind_addr.clone();
    let app = router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("Starting server on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    Ok(())
}
