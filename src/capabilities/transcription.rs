use tracing::debug;

use crate::{
    capabilities::InlineMedia,
    config::ModelConfig,
    errors::{LabError, Result},
    providers::{
        GeminiClientFactory,
        gemini::{GenerateContentRequest, Part},
    },
};

const DEFAULT_AUDIO_MIME: &str = "audio/webm";
const TRANSCRIBE_INSTRUCTION: &str =
    "Transcribe el audio exactamente, manteniendo cualquier terminología legal.";

pub struct Transcriber {
    factory: GeminiClientFactory,
    model: String,
}

impl Transcriber {
    pub fn new(factory: GeminiClientFactory, models: &ModelConfig) -> Self {
        Self {
            factory,
            model: models.transcription.clone(),
        }
    }

    pub async fn transcribe(&self, audio: &InlineMedia) -> Result<String> {
        if audio.data.is_empty() {
            return Err(LabError::invalid("recording is empty"));
        }

        let request = build_request(audio);
        debug!(target: "transcription", size = audio.data.len(), mime = %audio.mime_type, "transcribing recording");

        let response = self
            .factory
            .client()?
            .generate_content(&self.model, &request)
            .await?;

        Ok(response.text().unwrap_or_default())
    }
}

fn build_request(audio: &InlineMedia) -> GenerateContentRequest {
    let audio = if audio.mime_type.trim().is_empty() {
        InlineMedia::new(DEFAULT_AUDIO_MIME, audio.data.clone())
    } else {
        audio.clone()
    };
    GenerateContentRequest::from_parts(vec![Part::inline(&audio), Part::text(TRANSCRIBE_INSTRUCTION)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_mime_defaults_to_webm() {
        let request = build_request(&InlineMedia::new("", vec![1u8, 2, 3]));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["parts"][0]["inlineData"]["mimeType"], "audio/webm");
        assert_eq!(value["contents"][0]["parts"][0]["inlineData"]["data"], "AQID");
        assert_eq!(value["contents"][0]["parts"][1]["text"], TRANSCRIBE_INSTRUCTION);
    }
}
