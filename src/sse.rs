use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use futures_util::stream::{Stream, StreamExt};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    capabilities::{ChatRequest, ImageAspectRatio, ImageSize, InlineMedia},
    errors::{LabError, Result},
};

pub type BroadcastSender = broadcast::Sender<String>;

/// HMAC-SHA256 over `access_key:timestamp:nonce`, hex encoded, with a maximum age.
#[derive(Clone)]
pub struct SignatureAuth {
    access_key: String,
    secret_key: String,
    max_age: Duration,
}

impl SignatureAuth {
    pub fn new(access_key: String, secret_key: String, max_age: Duration) -> Self {
        Self {
            access_key,
            secret_key,
            max_age,
        }
    }

    pub fn verify_params(&self, params: &AuthParams) -> bool {
        if params.access_key != self.access_key {
            return false;
        }

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let diff = now.abs_diff(params.timestamp);
        if diff > self.max_age.as_secs() {
            return false;
        }

        let signature_bytes = match hex::decode(&params.signature) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        match self.mac(params) {
            Some(mac) => mac.verify_slice(&signature_bytes).is_ok(),
            None => false,
        }
    }

    fn mac(&self, params: &AuthParams) -> Option<Hmac<Sha256>> {
        let canonical = format!("{}:{}:{}", params.access_key, params.timestamp, params.nonce);
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes()).ok()?;
        mac.update(canonical.as_bytes());
        Some(mac)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthParams {
    access_key: String,
    timestamp: i64,
    nonce: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Chat(ChatRequest),
    GenerateImage {
        prompt: String,
        #[serde(default)]
        aspect_ratio: ImageAspectRatio,
        #[serde(default)]
        image_size: ImageSize,
    },
    EditImage {
        prompt: String,
    },
    GenerateVideo {
        #[serde(default)]
        prompt: String,
        #[serde(default)]
        from_image: bool,
    },
    CancelVideo {
        request_id: Uuid,
    },
    Speak {
        text: String,
    },
    Transcribe {
        audio_base64: String,
        #[serde(default)]
        mime_type: Option<String>,
    },
    Analyze {
        file_base64: String,
        mime_type: String,
    },
}

#[derive(Debug)]
pub enum LabCommand {
    Chat(ChatRequest),
    GenerateImage {
        prompt: String,
        aspect_ratio: ImageAspectRatio,
        size: ImageSize,
    },
    EditImage {
        prompt: String,
    },
    GenerateVideo {
        prompt: String,
        from_image: bool,
    },
    CancelVideo {
        target: Uuid,
    },
    Speak {
        text: String,
    },
    Transcribe {
        audio: InlineMedia,
    },
    Analyze {
        file: InlineMedia,
    },
}

impl LabCommand {
    pub fn origin(&self) -> &'static str {
        match self {
            LabCommand::Chat(_) => "chat",
            LabCommand::GenerateImage { .. } | LabCommand::EditImage { .. } => "image",
            LabCommand::GenerateVideo { .. } | LabCommand::CancelVideo { .. } => "video",
            LabCommand::Speak { .. } | LabCommand::Transcribe { .. } => "audio",
            LabCommand::Analyze { .. } => "analysis",
        }
    }
}

impl TryFrom<ClientMessage> for LabCommand {
    type Error = LabError;

    fn try_from(value: ClientMessage) -> Result<Self> {
        Ok(match value {
            ClientMessage::Chat(request) => LabCommand::Chat(request),
            ClientMessage::GenerateImage {
                prompt,
                aspect_ratio,
                image_size,
            } => LabCommand::GenerateImage {
                prompt,
                aspect_ratio,
                size: image_size,
            },
            ClientMessage::EditImage { prompt } => LabCommand::EditImage { prompt },
            ClientMessage::GenerateVideo { prompt, from_image } => {
                LabCommand::GenerateVideo { prompt, from_image }
            }
            ClientMessage::CancelVideo { request_id } => LabCommand::CancelVideo {
                target: request_id,
            },
            ClientMessage::Speak { text } => LabCommand::Speak { text },
            ClientMessage::Transcribe {
                audio_base64,
                mime_type,
            } => LabCommand::Transcribe {
                audio: InlineMedia::from_base64(mime_type.unwrap_or_default(), &audio_base64)?,
            },
            ClientMessage::Analyze {
                file_base64,
                mime_type,
            } => LabCommand::Analyze {
                file: InlineMedia::from_base64(mime_type, &file_base64)?,
            },
        })
    }
}

/// A decoded command plus the id echoed back in every event it produces.
#[derive(Debug)]
pub struct LabRequest {
    pub id: Uuid,
    pub command: LabCommand,
}

pub fn message_bus() -> (BroadcastSender, broadcast::Receiver<String>) {
    broadcast::channel(256)
}

pub fn encode_message(event: &str, payload: Value) -> String {
    json!({
        "event": event,
        "payload": payload,
    })
    .to_string()
}

pub fn broadcast_json(sender: &BroadcastSender, event: &str, payload: Value) {
    let message = encode_message(event, payload);
    let _ = sender.send(message);
}

pub fn broadcast_status(sender: &BroadcastSender, request_id: Uuid, status: &str) {
    broadcast_json(
        sender,
        "lab.status",
        json!({
            "request_id": request_id,
            "status": status,
        }),
    );
}

#[derive(Clone)]
struct AppState {
    auth: Arc<SignatureAuth>,
    broadcaster: BroadcastSender,
    command_tx: mpsc::Sender<LabRequest>,
}

pub async fn run_server(
    addr: SocketAddr,
    auth: Arc<SignatureAuth>,
    broadcaster: BroadcastSender,
    command_tx: mpsc::Sender<LabRequest>,
) -> Result<()> {
    let state = AppState {
        auth,
        broadcaster,
        command_tx,
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "sse", %addr, "lab endpoint listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|err| LabError::other(format!("lab endpoint error: {err}")))?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", get(sse_handler))
        .route("/command", post(command_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn sse_handler(
    Query(params): Query<AuthParams>,
    State(state): State<AppState>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, StatusCode>
{
    if !state.auth.verify_params(&params) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(message) => Some(Ok(Event::default().data(message))),
            Err(_) => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn command_handler(
    Query(params): Query<AuthParams>,
    State(state): State<AppState>,
    Json(message): Json<ClientMessage>,
) -> std::result::Result<Json<Value>, StatusCode> {
    if !state.auth.verify_params(&params) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let command = LabCommand::try_from(message).map_err(|err| {
        tracing::warn!(target: "sse", error = %err, "rejected malformed command");
        StatusCode::BAD_REQUEST
    })?;
    let id = Uuid::new_v4();

    if state
        .command_tx
        .send(LabRequest { id, command })
        .await
        .is_err()
    {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(json!({ "status": "accepted", "request_id": id })))
}
