use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::ModelConfig,
    errors::{LabError, Result},
    location::{LatLng, LocationHint},
    providers::{
        GeminiClientFactory,
        gemini::{
            EmptyObject, GenerateContentRequest, GenerationConfig, GroundingChunk, RetrievalConfig,
            ThinkingConfig, Tool, ToolConfig,
        },
    },
};

const NO_ANSWER: &str = "Sin respuesta";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub input: String,
    #[serde(default)]
    pub use_search: bool,
    #[serde(default)]
    pub use_maps: bool,
    #[serde(default)]
    pub use_thinking: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub model: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundingSource {
    pub title: Option<String>,
    pub uri: String,
}

/// Single-turn legal consultation. Each message is sent on its own; the
/// panel keeps the visible history.
pub struct ConversationAgent {
    factory: GeminiClientFactory,
    location: LocationHint,
    chat_model: String,
    search_model: String,
    thinking_model: String,
    thinking_budget: u32,
}

impl ConversationAgent {
    pub fn new(factory: GeminiClientFactory, location: LocationHint, models: &ModelConfig) -> Self {
        Self {
            factory,
            location,
            chat_model: models.chat.clone(),
            search_model: models.chat_search.clone(),
            thinking_model: models.chat_thinking.clone(),
            thinking_budget: models.thinking_budget,
        }
    }

    fn select_model(&self, request: &ChatRequest) -> &str {
        if request.use_thinking {
            &self.thinking_model
        } else if request.use_search {
            &self.search_model
        } else {
            &self.chat_model
        }
    }

    fn build_request(&self, request: &ChatRequest, position: Option<LatLng>) -> GenerateContentRequest {
        let mut payload = GenerateContentRequest::text(request.input.trim());

        if request.use_search {
            payload.tools.push(Tool::GoogleSearch(EmptyObject {}));
        }
        if request.use_maps {
            payload.tools.push(Tool::GoogleMaps(EmptyObject {}));
            payload.tool_config = position.map(|lat_lng| ToolConfig {
                retrieval_config: RetrievalConfig { lat_lng },
            });
        }
        // thinking budget is rejected alongside the search tool
        if request.use_thinking && !request.use_search {
            payload.generation_config = Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: self.thinking_budget,
                }),
                ..GenerationConfig::default()
            });
        }

        payload
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        if request.input.trim().is_empty() {
            return Err(LabError::invalid("chat message is empty"));
        }

        let position = if request.use_maps {
            self.location.resolve().await
        } else {
            None
        };

        let model = self.select_model(request).to_string();
        let payload = self.build_request(request, position);
        debug!(target: "conversation", %model, tools = payload.tools.len(), "sending chat message");

        let response = self
            .factory
            .client()?
            .generate_content(&model, &payload)
            .await?;

        Ok(ChatReply {
            text: response.text().unwrap_or_else(|| NO_ANSWER.to_string()),
            sources: collect_sources(response.grounding_chunks()),
            model,
        })
    }
}

fn collect_sources(chunks: &[GroundingChunk]) -> Vec<GroundingSource> {
    chunks
        .iter()
        .filter_map(GroundingChunk::reference)
        .filter_map(|reference| {
            Some(GroundingSource {
                title: reference.title.clone(),
                uri: reference.uri.clone()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{GeminiConfig, LocationConfig};
    use serde_json::json;

    fn agent() -> ConversationAgent {
        let factory = GeminiClientFactory::new(&GeminiConfig {
            api_key: Some("k".to_string()),
            api_key_env: vec![],
            api_base: "http://localhost".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();
        let location = LocationHint::new(factory.http_client(), &LocationConfig::default());
        ConversationAgent::new(factory, location, &ModelConfig::default())
    }

    fn request(search: bool, maps: bool, thinking: bool) -> ChatRequest {
        ChatRequest {
            input: "¿Plazo para apelar?".to_string(),
            use_search: search,
            use_maps: maps,
            use_thinking: thinking,
        }
    }

    #[test]
    fn model_follows_the_toggles() {
        let agent = agent();
        assert_eq!(agent.select_model(&request(false, false, false)), "gemini-2.5-flash-lite");
        assert_eq!(agent.select_model(&request(true, false, false)), "gemini-3-flash-preview");
        assert_eq!(agent.select_model(&request(true, false, true)), "gemini-3-pro-preview");
    }

    #[test]
    fn thinking_budget_only_without_search() {
        let agent = agent();

        let thinking = serde_json::to_value(agent.build_request(&request(false, false, true), None)).unwrap();
        assert_eq!(thinking["generationConfig"]["thinkingConfig"]["thinkingBudget"], 32768);

        let with_search = serde_json::to_value(agent.build_request(&request(true, false, true), None)).unwrap();
        assert!(with_search.get("generationConfig").is_none());
        assert_eq!(with_search["tools"], json!([{"googleSearch": {}}]));
    }

    #[test]
    fn maps_attaches_location_when_known() {
        let agent = agent();
        let position = LatLng {
            latitude: 20.67,
            longitude: -103.35,
        };

        let value = serde_json::to_value(agent.build_request(&request(false, true, false), Some(position))).unwrap();
        assert_eq!(value["tools"], json!([{"googleMaps": {}}]));
        assert_eq!(
            value["toolConfig"]["retrievalConfig"]["latLng"],
            json!({"latitude": 20.67, "longitude": -103.35})
        );

        let without = serde_json::to_value(agent.build_request(&request(false, true, false), None)).unwrap();
        assert!(without.get("toolConfig").is_none());
    }

    #[test]
    fn sources_skip_chunks_without_uri() {
        let chunks: Vec<GroundingChunk> = serde_json::from_value(json!([
            {"web": {"uri": "https://dof.gob.mx", "title": "DOF"}},
            {"maps": {"title": "Juzgado sin enlace"}},
            {}
        ]))
        .unwrap();

        assert_eq!(
            collect_sources(&chunks),
            vec![GroundingSource {
                title: Some("DOF".to_string()),
                uri: "https://dof.gob.mx".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn empty_message_is_rejected_locally() {
        let err = agent().chat(&ChatRequest::default()).await.unwrap_err();
        assert!(matches!(err, LabError::Submission(_)));
    }
}
