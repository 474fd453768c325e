use serde_json::{Map, Value};

use crate::{
    capabilities::BinaryArtifact,
    config::ModelConfig,
    errors::{LabError, Result},
    providers::{
        GeminiClientFactory,
        gemini::{GenerateContentRequest, GenerationConfig, SpeechConfig},
    },
    util::audio::{DEFAULT_SAMPLE_RATE, pcm16_to_wav, sample_rate_from_mime},
};

const TONE_INSTRUCTION: &str = "Lee esto con tono profesional y calmado:";

pub struct SpeechSynthesizer {
    factory: GeminiClientFactory,
    model: String,
    voice: String,
}

impl SpeechSynthesizer {
    pub fn new(factory: GeminiClientFactory, models: &ModelConfig) -> Self {
        Self {
            factory,
            model: models.speech.clone(),
            voice: models.speech_voice.clone(),
        }
    }

    fn build_request(&self, text: &str) -> GenerateContentRequest {
        GenerateContentRequest::text(format!("{TONE_INSTRUCTION} {text}")).with_generation_config(
            GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(&self.voice)),
                ..GenerationConfig::default()
            },
        )
    }

    /// Reads `text` aloud. The model answers with mono PCM which is returned as WAV.
    pub async fn speak(&self, text: &str) -> Result<BinaryArtifact> {
        if text.trim().is_empty() {
            return Err(LabError::invalid("nothing to read aloud"));
        }

        let response = self
            .factory
            .client()?
            .generate_content(&self.model, &self.build_request(text))
            .await?;

        let audio = response
            .first_inline_data()
            .ok_or(LabError::EmptyResponse("model returned no audio"))?
            .decode()?;
        let sample_rate = sample_rate_from_mime(&audio.mime_type).unwrap_or(DEFAULT_SAMPLE_RATE);
        let wav = pcm16_to_wav(&audio.data, sample_rate, 1)?;

        let mut metadata = Map::new();
        metadata.insert("text".to_string(), Value::String(text.to_string()));
        metadata.insert("voice".to_string(), Value::String(self.voice.clone()));
        metadata.insert("sample_rate".to_string(), sample_rate.into());

        Ok(BinaryArtifact::new(
            wav,
            "audio/wav",
            "wav",
            format!("Voice: {} | {} Hz", self.voice, sample_rate),
        )
        .with_metadata(metadata))
    }
}
