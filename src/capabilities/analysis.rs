use crate::{
    capabilities::InlineMedia,
    config::ModelConfig,
    errors::{LabError, Result},
    providers::{
        GeminiClientFactory,
        gemini::{GenerateContentRequest, Part},
    },
};

const EXPERT_INSTRUCTION: &str = "Actúa como perito legal. Analiza este contenido multimedia, identifica evidencias clave, sellos, firmas o rostros y evalúa el contexto procesal.";

/// Forensic reading of an uploaded image or video.
pub struct EvidenceAnalyst {
    factory: GeminiClientFactory,
    model: String,
}

impl EvidenceAnalyst {
    pub fn new(factory: GeminiClientFactory, models: &ModelConfig) -> Self {
        Self {
            factory,
            model: models.analysis.clone(),
        }
    }

    pub fn status_label(file: &InlineMedia) -> String {
        let kind = if file.is_video() { "video" } else { "imagen" };
        format!("Analizando {kind} con Gemini 3 Pro...")
    }

    pub async fn analyze(&self, file: &InlineMedia) -> Result<String> {
        if file.data.is_empty() {
            return Err(LabError::invalid("uploaded file is empty"));
        }
        if !(file.mime_type.starts_with("image/") || file.is_video()) {
            return Err(LabError::invalid(format!(
                "unsupported evidence type {}",
                file.mime_type
            )));
        }

        let request =
            GenerateContentRequest::from_parts(vec![Part::inline(file), Part::text(EXPERT_INSTRUCTION)]);
        let response = self
            .factory
            .client()?
            .generate_content(&self.model, &request)
            .await?;

        Ok(response.text().unwrap_or_default())
    }
}
