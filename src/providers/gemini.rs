use std::{env, time::Duration};

use bytes::Bytes;
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    capabilities::InlineMedia,
    config::GeminiConfig,
    errors::{LabError, Result, SubmissionError},
    location::LatLng,
    operations::{
        GenerationRequest, Operation, OperationFault, OperationHandle, OperationsApi,
    },
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const ENTITY_NOT_FOUND: &str = "entity was not found";

/// Builds a fresh [`GeminiClient`] for every request.
///
/// The key is looked up again on each call, so a key rotated through the
/// environment is picked up by the next request without restarting. The
/// underlying HTTP connection pool is shared.
#[derive(Clone)]
pub struct GeminiClientFactory {
    http_client: HttpClient,
    config: GeminiConfig,
}

impl GeminiClientFactory {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .user_agent("LitijalLab/0.1")
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    pub fn http_client(&self) -> HttpClient {
        self.http_client.clone()
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        self.config
            .api_key_env
            .iter()
            .filter_map(|name| env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .or_else(|| self.config.api_key.clone())
    }

    /// Billing-gated models (image generation, video) need a key before anything is sent.
    pub fn ensure_entitlement(&self) -> Result<()> {
        self.resolve_api_key()
            .map(|_| ())
            .ok_or_else(|| LabError::entitlement("no Gemini API key selected"))
    }

    pub fn client(&self) -> Result<GeminiClient> {
        let api_key = self
            .resolve_api_key()
            .ok_or(LabError::MissingConfig("gemini.api_key"))?;

        Ok(GeminiClient {
            http_client: self.http_client.clone(),
            api_base: self.config.api_base.clone(),
            api_key,
        })
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_base: String,
    api_key: String,
}

impl GeminiClient {
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        debug!(target: "gemini", %model, "generateContent");

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }

        Ok(response.json().await?)
    }
}

impl OperationsApi for GeminiClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<Operation> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.api_base, request.model
        );
        let payload = PredictLongRunningRequest::from_request(request);

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }

        let operation: LongRunningOperation = response.json().await?;
        Ok(operation.into_operation())
    }

    async fn fetch_status(&self, handle: &OperationHandle) -> Result<Operation> {
        let url = format!("{}/{}", self.api_base, handle.as_str());

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|err| LabError::Poll(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LabError::Poll(format!("status endpoint returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabError::Remote {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let operation: LongRunningOperation = response
            .json()
            .await
            .map_err(|err| LabError::Poll(format!("unreadable status body: {err}")))?;
        Ok(operation.into_operation())
    }

    async fn fetch_artifact(&self, locator: &str) -> Result<Bytes> {
        let mut url = Url::parse(locator)
            .map_err(|err| LabError::ArtifactMissing(format!("invalid locator {locator}: {err}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|err| LabError::ArtifactFetch(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LabError::ArtifactFetch(format!(
                "download returned status {status}"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|err| LabError::ArtifactFetch(err.to_string()))
    }
}

fn rejection(status: StatusCode, body: &str) -> LabError {
    let message = error_message(body);
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || message.to_lowercase().contains(ENTITY_NOT_FOUND)
    {
        return LabError::entitlement(message);
    }
    if status.is_client_error() {
        return LabError::Submission(SubmissionError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    LabError::Remote {
        status: status.as_u16(),
        message,
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: RpcStatus,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

// generateContent wire format

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::from_parts(vec![Part::text(text)])
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(media: &InlineMedia) -> Self {
        Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: media.mime_type.clone(),
                data: media.to_base64(),
            }),
        }
    }
}

/// Base64 payload with its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Blob {
    pub fn decode(&self) -> Result<InlineMedia> {
        InlineMedia::from_base64(self.mime_type.clone(), &self.data)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EmptyObject {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    GoogleSearch(EmptyObject),
    GoogleMaps(EmptyObject),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub retrieval_config: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub lat_lng: LatLng,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

impl SpeechConfig {
    pub fn prebuilt(voice_name: impl Into<String>) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.into(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    pub fn first_inline_data(&self) -> Option<&Blob> {
        self.first_parts()
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }

    pub fn grounding_chunks(&self) -> &[GroundingChunk] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.grounding_metadata.as_ref())
            .map(|metadata| metadata.grounding_chunks.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<GroundingRef>,
    #[serde(default)]
    pub maps: Option<GroundingRef>,
}

impl GroundingChunk {
    pub fn reference(&self) -> Option<&GroundingRef> {
        self.web.as_ref().or(self.maps.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingRef {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

// predictLongRunning wire format

#[derive(Serialize)]
struct PredictLongRunningRequest<'a> {
    instances: [VideoInstance<'a>; 1],
    parameters: VideoParameters,
}

impl<'a> PredictLongRunningRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            instances: [VideoInstance {
                prompt: &request.prompt,
                image: request.seed_image.as_ref().map(|image| VideoImage {
                    bytes_base64_encoded: image.to_base64(),
                    mime_type: &image.mime_type,
                }),
            }],
            parameters: VideoParameters {
                aspect_ratio: request.aspect_ratio.as_str(),
                resolution: request.resolution.as_str(),
                sample_count: request.number_of_outputs,
            },
        }
    }
}

#[derive(Serialize)]
struct VideoInstance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<VideoImage<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoImage<'a> {
    bytes_base64_encoded: String,
    mime_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    aspect_ratio: &'static str,
    resolution: &'static str,
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LongRunningOperation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<RpcStatus>,
    #[serde(default)]
    response: Option<VideoOperationResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoOperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
    #[serde(default)]
    generated_videos: Vec<GeneratedSample>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    #[serde(default)]
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    #[serde(default)]
    uri: Option<String>,
}

impl LongRunningOperation {
    fn into_operation(self) -> Operation {
        let handle = OperationHandle::new(self.name);
        if !self.done {
            return Operation::pending(handle);
        }
        if let Some(error) = self.error {
            return Operation::failed(
                handle,
                OperationFault {
                    code: error.code,
                    message: error
                        .message
                        .unwrap_or_else(|| "operation reported an error".to_string()),
                },
            );
        }

        let response = self.response.unwrap_or_default();
        let samples = response
            .generate_video_response
            .map(|inner| inner.generated_samples)
            .unwrap_or_default();
        let locators = samples
            .into_iter()
            .chain(response.generated_videos)
            .filter_map(|sample| sample.video?.uri)
            .collect();

        Operation::succeeded(handle, locators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{
        PollPolicy, Poller, ProgressMessages, VideoAspectRatio, VideoResolution,
    };
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path, query_param},
    };

    fn factory(base: &str) -> GeminiClientFactory {
        GeminiClientFactory::new(&GeminiConfig {
            api_key: Some("test-key".to_string()),
            api_key_env: vec!["LITIJAL_LAB_UNSET_TEST_KEY".to_string()],
            api_base: format!("{base}/v1beta"),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn missing_key_blocks_billing_models() {
        let factory = GeminiClientFactory::new(&GeminiConfig {
            api_key: None,
            api_key_env: vec!["LITIJAL_LAB_UNSET_TEST_KEY".to_string()],
            api_base: "http://localhost".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();

        assert!(matches!(
            factory.ensure_entitlement(),
            Err(LabError::Submission(SubmissionError::Entitlement(_)))
        ));
        assert!(matches!(
            factory.client(),
            Err(LabError::MissingConfig(_))
        ));
    }

    #[test]
    fn finished_operation_collects_locators() {
        let raw = json!({
            "name": "models/veo/operations/abc",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        {"video": {"uri": "https://example/video123"}},
                        {"video": {}}
                    ]
                }
            }
        });
        let op: LongRunningOperation = serde_json::from_value(raw).unwrap();
        let op = op.into_operation();

        assert!(op.done);
        assert_eq!(op.first_locator(), Some("https://example/video123"));
    }

    #[test]
    fn finished_operation_with_error_is_a_fault() {
        let raw = json!({
            "name": "models/veo/operations/abc",
            "done": true,
            "error": {"code": 3, "message": "prompt blocked"}
        });
        let op: LongRunningOperation = serde_json::from_value(raw).unwrap();
        let op = op.into_operation();

        assert!(op.done);
        assert_eq!(op.first_locator(), None);
        assert!(matches!(
            op.outcome,
            Some(crate::operations::OperationOutcome::Fault(OperationFault { code: Some(3), .. }))
        ));
    }

    #[test]
    fn tools_serialize_as_empty_objects() {
        let mut request = GenerateContentRequest::text("hola");
        request.tools = vec![
            Tool::GoogleSearch(EmptyObject {}),
            Tool::GoogleMaps(EmptyObject {}),
        ];
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["tools"], json!([{"googleSearch": {}}, {"googleMaps": {}}]));
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hola");
        assert!(value.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn submit_sends_video_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/veo-test:predictLongRunning"))
            .and(header(API_KEY_HEADER, "test-key"))
            .and(body_partial_json(json!({
                "parameters": {"aspectRatio": "16:9", "resolution": "720p", "sampleCount": 1}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "models/veo-test/operations/abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = factory(&server.uri()).client().unwrap();
        let request = GenerationRequest::new("veo-test", "test scene")
            .with_aspect_ratio(VideoAspectRatio::Landscape)
            .with_resolution(VideoResolution::P720);
        let op = client.submit(&request).await.unwrap();

        assert!(!op.done);
        assert_eq!(op.handle.as_str(), "models/veo-test/operations/abc");
    }

    #[tokio::test]
    async fn submit_maps_missing_entity_to_entitlement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/veo-test:predictLongRunning"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}
            })))
            .mount(&server)
            .await;

        let client = factory(&server.uri()).client().unwrap();
        let err = client
            .submit(&GenerationRequest::new("veo-test", "scene"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LabError::Submission(SubmissionError::Entitlement(_))
        ));
    }

    #[tokio::test]
    async fn status_uses_the_handle_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models/veo-test/operations/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "models/veo-test/operations/abc",
                "done": true,
                "response": {"generateVideoResponse": {"generatedSamples": [
                    {"video": {"uri": "https://example/video123"}}
                ]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = factory(&server.uri()).client().unwrap();
        let op = client
            .fetch_status(&OperationHandle::new("models/veo-test/operations/abc"))
            .await
            .unwrap();

        assert_eq!(op.first_locator(), Some("https://example/video123"));
    }

    #[tokio::test]
    async fn unavailable_status_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = factory(&server.uri()).client().unwrap();
        let err = client
            .fetch_status(&OperationHandle::new("operations/abc"))
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn relative_locator_is_missing_not_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let poller = Poller::new(
            factory(&server.uri()).client().unwrap(),
            PollPolicy::default(),
            ProgressMessages::default(),
        );
        let done = Operation::succeeded(
            OperationHandle::new("models/veo/operations/op-1"),
            vec!["files/video123".to_string()],
        );

        let err = poller
            .resolve_artifact(&done, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LabError::ArtifactMissing(_)), "{err:?}");
    }

    #[tokio::test]
    async fn artifact_download_appends_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/video123"))
            .and(query_param("alt", "media"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = factory(&server.uri()).client().unwrap();
        let bytes = client
            .fetch_artifact(&format!("{}/files/video123?alt=media", server.uri()))
            .await
            .unwrap();

        assert_eq!(&bytes[..], b"mp4-bytes");
    }

    #[tokio::test]
    async fn generate_content_extracts_text_and_sources() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hola, "}, {"text": "colega."}]},
                    "groundingMetadata": {"groundingChunks": [
                        {"web": {"uri": "https://scjn.gob.mx", "title": "SCJN"}}
                    ]}
                }]
            })))
            .mount(&server)
            .await;

        let client = factory(&server.uri()).client().unwrap();
        let response = client
            .generate_content("gemini-test", &GenerateContentRequest::text("hola"))
            .await
            .unwrap();

        assert_eq!(response.text().as_deref(), Some("Hola, colega."));
        let source = response.grounding_chunks()[0].reference().unwrap();
        assert_eq!(source.title.as_deref(), Some("SCJN"));
    }
}
