use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LabError>;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("submission rejected: {0}")]
    Submission(#[from] SubmissionError),

    #[error("status poll failed: {0}")]
    Poll(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("operation still running after {attempts} polls ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },

    #[error("operation was cancelled by the caller")]
    Cancelled,

    #[error("completed operation carries no usable artifact: {0}")]
    ArtifactMissing(String),

    #[error("artifact download failed: {0}")]
    ArtifactFetch(String),

    #[error("remote service returned status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("empty model response: {0}")]
    EmptyResponse(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("internal error: {0}")]
    Other(String),
}

/// Reasons the remote service refused a request outright. Never retried.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("no billing-enabled API key is available: {0}")]
    Entitlement(String),

    #[error("service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl LabError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Submission(SubmissionError::Invalid(msg.into()))
    }

    pub fn entitlement(msg: impl Into<String>) -> Self {
        Self::Submission(SubmissionError::Entitlement(msg.into()))
    }

    /// Failures worth another poll on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            LabError::Poll(_) => true,
            LabError::Reqwest(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            _ => false,
        }
    }

    /// Short status line shown in the lab panel. Raw payloads stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            LabError::Submission(SubmissionError::Entitlement(_)) => {
                "Error de autenticación. Por favor, selecciona tu llave de API de pago nuevamente."
            }
            LabError::Submission(SubmissionError::Invalid(_)) => "Solicitud inválida.",
            LabError::Submission(SubmissionError::Rejected { .. }) => {
                "El servicio rechazó la solicitud."
            }
            LabError::Timeout { .. } => "La generación tardó demasiado y fue abandonada.",
            LabError::Cancelled => "Generación cancelada.",
            LabError::ArtifactMissing(_) | LabError::ArtifactFetch(_) => {
                "No fue posible recuperar el resultado generado."
            }
            LabError::Poll(_) | LabError::OperationFailed(_) => "La generación de video falló.",
            LabError::MissingConfig(_) => "Servicio no configurado.",
            _ => "Error al procesar la solicitud.",
        }
    }
}

impl From<anyhow::Error> for LabError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}
