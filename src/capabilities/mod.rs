mod analysis;
mod conversation;
mod image;
mod speech;
mod transcription;
mod video;

pub use analysis::EvidenceAnalyst;
pub use conversation::{ChatRequest, ConversationAgent};
pub use image::{ImageAspectRatio, ImageSize, ImageStudio};
pub use speech::SpeechSynthesizer;
pub use transcription::Transcriber;
pub use video::VideoGenerator;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct BinaryArtifact {
    pub data: Bytes,
    pub media_type: String,
    pub file_extension: String,
    pub summary: String,
    pub metadata: Map<String, Value>,
}

impl BinaryArtifact {
    pub fn new(
        data: impl Into<Bytes>,
        media_type: impl Into<String>,
        file_extension: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
            file_extension: file_extension.into(),
            summary: summary.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn as_inline(&self) -> InlineMedia {
        InlineMedia {
            mime_type: self.media_type.clone(),
            data: self.data.clone(),
        }
    }
}

/// Media sent inline with a request, tagged with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    pub data: Bytes,
}

impl InlineMedia {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_base64(mime_type: impl Into<String>, encoded: &str) -> Result<Self> {
        let data = BASE64_STANDARD.decode(encoded.trim())?;
        Ok(Self::new(mime_type, data))
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.data)
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "audio/wav" => "wav",
        _ => "bin",
    }
}
