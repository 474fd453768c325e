use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    capabilities::{BinaryArtifact, InlineMedia},
    config::{ModelConfig, PollingConfig},
    errors::Result,
    operations::{
        GenerationRequest, PollPolicy, Poller, ProgressMessages, VideoAspectRatio,
        VideoResolution,
    },
    providers::GeminiClientFactory,
};

const SEED_ONLY_PROMPT: &str = "Animate this legal visual professionally";

pub struct VideoGenerator {
    factory: GeminiClientFactory,
    model: String,
    policy: PollPolicy,
    messages: ProgressMessages,
    resolution: VideoResolution,
    aspect_ratio: VideoAspectRatio,
}

impl VideoGenerator {
    pub fn new(factory: GeminiClientFactory, models: &ModelConfig, polling: &PollingConfig) -> Self {
        Self {
            factory,
            model: models.video.clone(),
            policy: polling.policy.clone(),
            messages: polling.messages.clone(),
            resolution: VideoResolution::P720,
            aspect_ratio: VideoAspectRatio::Landscape,
        }
    }

    pub fn request(&self, prompt: &str, seed: Option<InlineMedia>) -> GenerationRequest {
        let prompt = match (prompt.trim(), &seed) {
            ("", Some(_)) => SEED_ONLY_PROMPT,
            (text, _) => text,
        };

        let request = GenerationRequest::new(&self.model, prompt)
            .with_resolution(self.resolution)
            .with_aspect_ratio(self.aspect_ratio)
            .with_outputs(1);

        match seed {
            Some(image) => request.with_seed_image(image),
            None => request,
        }
    }

    /// Runs one video generation to completion. `on_status` receives the
    /// rotating "Veo: ..." line before every poll.
    pub async fn generate<F>(
        &self,
        prompt: &str,
        seed: Option<InlineMedia>,
        cancel: &CancellationToken,
        mut on_status: F,
    ) -> Result<BinaryArtifact>
    where
        F: FnMut(&str) + Send,
    {
        self.factory.ensure_entitlement()?;
        let poller = Poller::new(
            self.factory.client()?,
            self.policy.clone(),
            self.messages.clone(),
        );

        let request = self.request(prompt, seed);
        let animated = request.seed_image.is_some();
        let data = poller
            .generate(&request, cancel, |progress| {
                on_status(&format!("Veo: {}", progress.message))
            })
            .await?;

        info!(target: "video", model = %self.model, size = data.len(), animated, "video generated");

        let mut metadata = Map::new();
        metadata.insert("prompt".to_string(), Value::String(request.prompt.clone()));
        metadata.insert("model".to_string(), Value::String(self.model.clone()));
        metadata.insert("resolution".to_string(), json!(request.resolution.as_str()));
        metadata.insert("aspect_ratio".to_string(), json!(request.aspect_ratio.as_str()));
        metadata.insert("from_image".to_string(), json!(animated));

        Ok(BinaryArtifact::new(
            data,
            "video/mp4",
            "mp4",
            format!(
                "Model: {} | {} {}",
                self.model,
                request.resolution.as_str(),
                request.aspect_ratio.as_str()
            ),
        )
        .with_metadata(metadata))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{config::GeminiConfig, errors::LabError};
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn generator(base: &str, api_key: Option<&str>) -> VideoGenerator {
        let factory = GeminiClientFactory::new(&GeminiConfig {
            api_key: api_key.map(str::to_string),
            api_key_env: vec!["LITIJAL_LAB_UNSET_TEST_KEY".to_string()],
            api_base: format!("{base}/v1beta"),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();
        let polling = PollingConfig {
            policy: PollPolicy {
                interval: Duration::from_millis(20),
                max_attempts: 5,
                timeout: Duration::from_secs(10),
                poll_retries: 1,
                fetch_retries: 1,
            },
            messages: ProgressMessages::new(["Renderizando frames..."]),
        };
        let models = ModelConfig {
            video: "veo-test".to_string(),
            ..ModelConfig::default()
        };
        VideoGenerator::new(factory, &models, &polling)
    }

    #[test]
    fn seed_only_requests_get_a_default_prompt() {
        let generator = generator("http://localhost", Some("k"));

        let seeded = generator.request("  ", Some(InlineMedia::new("image/png", vec![1u8])));
        assert_eq!(seeded.prompt, SEED_ONLY_PROMPT);
        assert_eq!(seeded.resolution, VideoResolution::P720);
        assert_eq!(seeded.aspect_ratio, VideoAspectRatio::Landscape);

        let plain = generator.request("sala de audiencias", None);
        assert_eq!(plain.prompt, "sala de audiencias");
        assert!(plain.seed_image.is_none());
    }

    #[tokio::test]
    async fn no_key_means_nothing_is_submitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = generator(&server.uri(), None)
            .generate("scene", None, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, LabError::Submission(_)));
    }

    #[tokio::test]
    async fn generates_and_downloads_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/veo-test:predictLongRunning"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "models/veo-test/operations/op-9",
                "done": false
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models/veo-test/operations/op-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "models/veo-test/operations/op-9",
                "done": true,
                "response": {"generateVideoResponse": {"generatedSamples": [
                    {"video": {"uri": format!("{}/files/op-9?alt=media", server.uri())}}
                ]}}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/op-9"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-mp4".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let mut statuses = Vec::new();
        let artifact = generator(&server.uri(), Some("test-key"))
            .generate("test scene", None, &CancellationToken::new(), |status| {
                statuses.push(status.to_string())
            })
            .await
            .unwrap();

        assert_eq!(&artifact.data[..], b"fake-mp4");
        assert_eq!(artifact.media_type, "video/mp4");
        assert_eq!(statuses, ["Veo: Renderizando frames..."]);
        assert_eq!(artifact.metadata["prompt"], "test scene");
    }
}
