use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
    capabilities::{BinaryArtifact, extension_for},
    config::ModelConfig,
    errors::{LabError, Result},
    providers::{
        GeminiClientFactory,
        gemini::{GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig, Part},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageAspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "16:9")]
    Wide,
}

impl ImageAspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageAspectRatio::Square => "1:1",
            ImageAspectRatio::Portrait => "3:4",
            ImageAspectRatio::Landscape => "4:3",
            ImageAspectRatio::Tall => "9:16",
            ImageAspectRatio::Wide => "16:9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    K1,
    #[serde(rename = "2K")]
    K2,
    #[serde(rename = "4K")]
    K4,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::K1 => "1K",
            ImageSize::K2 => "2K",
            ImageSize::K4 => "4K",
        }
    }
}

pub struct ImageStudio {
    factory: GeminiClientFactory,
    model: String,
    edit_model: String,
}

impl ImageStudio {
    pub fn new(factory: GeminiClientFactory, models: &ModelConfig) -> Self {
        Self {
            factory,
            model: models.image.clone(),
            edit_model: models.image_edit.clone(),
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: ImageAspectRatio,
        size: ImageSize,
    ) -> Result<BinaryArtifact> {
        if prompt.trim().is_empty() {
            return Err(LabError::invalid("image prompt is empty"));
        }
        self.factory.ensure_entitlement()?;

        let request = generation_request(prompt, aspect_ratio, size);
        let response = self
            .factory
            .client()?
            .generate_content(&self.model, &request)
            .await?;

        let mut metadata = Map::new();
        metadata.insert("prompt".to_string(), Value::String(prompt.to_string()));
        metadata.insert("model".to_string(), Value::String(self.model.clone()));
        metadata.insert("aspect_ratio".to_string(), json!(aspect_ratio.as_str()));
        metadata.insert("image_size".to_string(), json!(size.as_str()));

        Ok(image_artifact(
            &response,
            format!(
                "Model: {} | {} {}",
                self.model,
                aspect_ratio.as_str(),
                size.as_str()
            ),
        )?
        .with_metadata(metadata))
    }

    /// Applies a text instruction to an existing image.
    pub async fn edit(&self, source: &BinaryArtifact, prompt: &str) -> Result<BinaryArtifact> {
        if prompt.trim().is_empty() {
            return Err(LabError::invalid("edit instruction is empty"));
        }

        let request =
            GenerateContentRequest::from_parts(vec![Part::inline(&source.as_inline()), Part::text(prompt)]);
        let response = self
            .factory
            .client()?
            .generate_content(&self.edit_model, &request)
            .await?;

        let mut metadata = source.metadata.clone();
        metadata.insert("edit_prompt".to_string(), Value::String(prompt.to_string()));
        metadata.insert("edit_model".to_string(), Value::String(self.edit_model.clone()));

        Ok(image_artifact(&response, format!("Edited with {}", self.edit_model))?
            .with_metadata(metadata))
    }
}

fn generation_request(
    prompt: &str,
    aspect_ratio: ImageAspectRatio,
    size: ImageSize,
) -> GenerateContentRequest {
    GenerateContentRequest::text(prompt).with_generation_config(GenerationConfig {
        image_config: Some(ImageConfig {
            aspect_ratio: Some(aspect_ratio.as_str().to_string()),
            image_size: Some(size.as_str().to_string()),
        }),
        ..GenerationConfig::default()
    })
}

fn image_artifact(response: &GenerateContentResponse, summary: String) -> Result<BinaryArtifact> {
    let media = response
        .first_inline_data()
        .ok_or(LabError::EmptyResponse("model returned no image"))?
        .decode()?;
    let extension = extension_for(&media.mime_type);
    Ok(BinaryArtifact::new(media.data, media.mime_type, extension, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_request_carries_image_config() {
        let request = generation_request("sello notarial", ImageAspectRatio::Wide, ImageSize::K2);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value["generationConfig"]["imageConfig"],
            json!({"aspectRatio": "16:9", "imageSize": "2K"})
        );
    }

    #[test]
    fn response_without_image_is_an_error() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "no puedo"}]}}]
        }))
        .unwrap();

        assert!(matches!(
            image_artifact(&response, String::new()),
            Err(LabError::EmptyResponse(_))
        ));
    }

    #[test]
    fn inline_image_is_decoded() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"text": "listo"},
                {"inlineData": {"mimeType": "image/png", "data": "iVBORw=="}}
            ]}}]
        }))
        .unwrap();

        let artifact = image_artifact(&response, "s".into()).unwrap();
        assert_eq!(artifact.file_extension, "png");
        assert_eq!(&artifact.data[..4], b"\x89PNG");
    }
}
