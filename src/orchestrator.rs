use std::{collections::HashMap, future::Future, path::Path, sync::Arc};

use serde_json::{Value, json};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    capabilities::{
        BinaryArtifact, ChatRequest, ConversationAgent, EvidenceAnalyst, ImageAspectRatio,
        ImageSize, ImageStudio, InlineMedia, SpeechSynthesizer, Transcriber, VideoGenerator,
    },
    config::AppConfig,
    errors::{LabError, Result},
    location::LocationHint,
    providers::GeminiClientFactory,
    sse::{BroadcastSender, LabCommand, LabRequest, broadcast_json, broadcast_status},
    util::{ArtifactKind, ArtifactWriter},
};

struct VideoJob {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Capabilities shared by every in-flight request.
struct LabServices {
    conversation: ConversationAgent,
    images: ImageStudio,
    video: VideoGenerator,
    speech: SpeechSynthesizer,
    transcriber: Transcriber,
    analyst: EvidenceAnalyst,
    writer: ArtifactWriter,
    /// Most recent generated or edited image, source for edits and image-to-video.
    last_image: Mutex<Option<BinaryArtifact>>,
    broadcaster: BroadcastSender,
}

/// Routes lab commands to the capabilities and reports back over the event bus.
///
/// Every command runs in its own task so a slow generation never holds up
/// the next command. Video generations additionally get their own poll
/// state and cancellation token and are tracked by request id.
pub struct LabController {
    services: Arc<LabServices>,
    video_jobs: HashMap<Uuid, VideoJob>,
    requests: TaskTracker,
    shutdown: CancellationToken,
}

impl LabController {
    pub async fn new(config: AppConfig, broadcaster: BroadcastSender) -> Result<Self> {
        let AppConfig {
            gemini,
            models,
            polling,
            location,
            artifacts_dir,
            sse: _,
        } = config;

        let writer = ArtifactWriter::new(artifacts_dir).await?;
        let factory = GeminiClientFactory::new(&gemini)?;
        if factory.resolve_api_key().is_none() {
            warn!(target: "lab", "no Gemini API key found yet, requests will fail until one is provided");
        }

        let location = LocationHint::new(factory.http_client(), &location);

        let services = LabServices {
            conversation: ConversationAgent::new(factory.clone(), location, &models),
            images: ImageStudio::new(factory.clone(), &models),
            video: VideoGenerator::new(factory.clone(), &models, &polling),
            speech: SpeechSynthesizer::new(factory.clone(), &models),
            transcriber: Transcriber::new(factory.clone(), &models),
            analyst: EvidenceAnalyst::new(factory, &models),
            writer,
            last_image: Mutex::new(None),
            broadcaster,
        };

        Ok(Self {
            services: Arc::new(services),
            video_jobs: HashMap::new(),
            requests: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn capabilities_overview(&self) -> Vec<&'static str> {
        vec![
            "chat",
            "generate_image",
            "edit_image",
            "generate_video",
            "cancel_video",
            "speak",
            "transcribe",
            "analyze",
        ]
    }

    pub fn active_videos(&self) -> usize {
        self.video_jobs
            .values()
            .filter(|job| !job.task.is_finished())
            .count()
    }

    /// Validates and starts a command. Failures found before the work is
    /// started are returned; later ones are broadcast by the request task.
    pub async fn handle(&mut self, request: LabRequest) -> Result<()> {
        let LabRequest { id, command } = request;
        let origin = command.origin();
        self.prune_finished_jobs();

        let services = self.services.clone();
        match command {
            LabCommand::Chat(chat) => {
                self.spawn_request(id, origin, async move { services.chat(id, chat).await })
            }
            LabCommand::GenerateImage {
                prompt,
                aspect_ratio,
                size,
            } => self.spawn_request(id, origin, async move {
                services
                    .generate_image(id, &prompt, aspect_ratio, size)
                    .await
            }),
            LabCommand::EditImage { prompt } => {
                let source = self
                    .services
                    .last_image()
                    .await
                    .ok_or_else(|| LabError::invalid("there is no generated image to edit"))?;
                self.spawn_request(id, origin, async move {
                    services.edit_image(id, &source, &prompt).await
                })
            }
            LabCommand::GenerateVideo { prompt, from_image } => {
                return self.start_video(id, prompt, from_image).await;
            }
            LabCommand::CancelVideo { target } => return self.cancel_video(id, target),
            LabCommand::Speak { text } => {
                self.spawn_request(id, origin, async move { services.speak(id, &text).await })
            }
            LabCommand::Transcribe { audio } => self.spawn_request(id, origin, async move {
                services.transcribe(id, &audio).await
            }),
            LabCommand::Analyze { file } => {
                self.spawn_request(id, origin, async move { services.analyze(id, &file).await })
            }
        }
        Ok(())
    }

    fn spawn_request<F>(&self, id: Uuid, origin: &'static str, work: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let broadcaster = self.services.broadcaster.clone();
        let shutdown = self.shutdown.clone();

        self.requests.spawn(async move {
            let outcome = tokio::select! {
                _ = shutdown.cancelled() => Err(LabError::Cancelled),
                outcome = work => outcome,
            };
            if let Err(err) = outcome {
                if matches!(err, LabError::Cancelled) {
                    info!(target: "lab", request_id = %id, origin, "lab request cancelled");
                } else {
                    error!(target: "lab", request_id = %id, origin, error = %err, "lab request failed");
                }
                broadcast_error(&broadcaster, id, origin, &err);
            }
        });
    }

    async fn start_video(&mut self, id: Uuid, prompt: String, from_image: bool) -> Result<()> {
        let seed = if from_image {
            let image = self
                .services
                .last_image()
                .await
                .ok_or_else(|| LabError::invalid("there is no generated image to animate"))?;
            Some(image.as_inline())
        } else {
            None
        };
        if prompt.trim().is_empty() && seed.is_none() {
            return Err(LabError::invalid("video prompt is empty"));
        }

        broadcast_status(&self.services.broadcaster, id, "Verificando acceso a Veo 3.1...");

        let cancel = self.shutdown.child_token();
        let task = tokio::spawn(run_video_job(
            id,
            prompt,
            seed,
            self.services.clone(),
            cancel.clone(),
        ));

        self.video_jobs.insert(id, VideoJob { cancel, task });
        info!(target: "lab", request_id = %id, active = self.active_videos(), "video job started");
        Ok(())
    }

    fn cancel_video(&mut self, id: Uuid, target: Uuid) -> Result<()> {
        let job = self
            .video_jobs
            .get(&target)
            .ok_or_else(|| LabError::invalid(format!("no running video job {target}")))?;

        job.cancel.cancel();
        info!(target: "lab", request_id = %id, video = %target, "video job cancellation requested");
        Ok(())
    }

    fn prune_finished_jobs(&mut self) {
        self.video_jobs.retain(|_, job| !job.task.is_finished());
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.shutdown.cancel();

        for (id, job) in self.video_jobs.drain() {
            if let Err(err) = job.task.await {
                warn!(target: "lab", request_id = %id, error = %err, "video job ended abnormally");
            }
        }

        self.requests.close();
        self.requests.wait().await;

        info!(target: "lab", "lab controller stopped");
        Ok(())
    }
}

impl LabServices {
    async fn last_image(&self) -> Option<BinaryArtifact> {
        self.last_image.lock().await.clone()
    }

    async fn remember_image(&self, image: BinaryArtifact) {
        *self.last_image.lock().await = Some(image);
    }

    async fn chat(&self, id: Uuid, request: ChatRequest) -> Result<()> {
        let reply = self.conversation.chat(&request).await?;
        broadcast_json(
            &self.broadcaster,
            "lab.chat",
            json!({
                "request_id": id,
                "text": reply.text,
                "model": reply.model,
                "sources": reply.sources,
            }),
        );
        Ok(())
    }

    async fn generate_image(
        &self,
        id: Uuid,
        prompt: &str,
        aspect_ratio: ImageAspectRatio,
        size: ImageSize,
    ) -> Result<()> {
        broadcast_status(&self.broadcaster, id, "Generando imagen de alta resolución...");
        let artifact = self.images.generate(prompt, aspect_ratio, size).await?;

        let path = self.writer.persist(ArtifactKind::Image, &artifact).await?;
        broadcast_artifact(&self.broadcaster, id, ArtifactKind::Image, &path, &artifact);
        self.remember_image(artifact).await;
        Ok(())
    }

    async fn edit_image(&self, id: Uuid, source: &BinaryArtifact, prompt: &str) -> Result<()> {
        broadcast_status(&self.broadcaster, id, "Editando con Gemini 2.5 Flash Image...");
        let edited = self.images.edit(source, prompt).await?;

        let path = self.writer.persist(ArtifactKind::Image, &edited).await?;
        broadcast_artifact(&self.broadcaster, id, ArtifactKind::Image, &path, &edited);
        self.remember_image(edited).await;
        Ok(())
    }

    async fn speak(&self, id: Uuid, text: &str) -> Result<()> {
        broadcast_status(&self.broadcaster, id, "Generando audio profesional...");
        let artifact = self.speech.speak(text).await?;

        let path = self.writer.persist(ArtifactKind::Speech, &artifact).await?;
        broadcast_artifact(&self.broadcaster, id, ArtifactKind::Speech, &path, &artifact);
        Ok(())
    }

    async fn transcribe(&self, id: Uuid, audio: &InlineMedia) -> Result<()> {
        broadcast_status(&self.broadcaster, id, "Transcribiendo audio con Gemini 3 Flash...");
        let text = self.transcriber.transcribe(audio).await?;

        broadcast_json(
            &self.broadcaster,
            "lab.transcription",
            json!({ "request_id": id, "text": text }),
        );
        Ok(())
    }

    async fn analyze(&self, id: Uuid, file: &InlineMedia) -> Result<()> {
        broadcast_status(&self.broadcaster, id, &EvidenceAnalyst::status_label(file));
        let text = self.analyst.analyze(file).await?;

        broadcast_json(
            &self.broadcaster,
            "lab.analysis",
            json!({ "request_id": id, "text": text }),
        );
        Ok(())
    }
}

async fn run_video_job(
    id: Uuid,
    prompt: String,
    seed: Option<InlineMedia>,
    services: Arc<LabServices>,
    cancel: CancellationToken,
) {
    let broadcaster = &services.broadcaster;
    broadcast_status(broadcaster, id, "Iniciando generación de video Veo...");

    let outcome = match services
        .video
        .generate(&prompt, seed, &cancel, |status| {
            broadcast_status(broadcaster, id, status)
        })
        .await
    {
        Ok(artifact) => services
            .writer
            .persist(ArtifactKind::Video, &artifact)
            .await
            .map(|path| (path, artifact)),
        Err(err) => Err(err),
    };

    match outcome {
        Ok((path, artifact)) => {
            broadcast_artifact(broadcaster, id, ArtifactKind::Video, &path, &artifact);
            broadcast_status(broadcaster, id, "¡Video generado con éxito!");
        }
        Err(err) => {
            if matches!(err, LabError::Cancelled) {
                info!(target: "lab", request_id = %id, "video job cancelled");
            } else {
                error!(target: "lab", request_id = %id, error = %err, "video job failed");
            }
            broadcast_error(broadcaster, id, "video", &err);
        }
    }
}

fn broadcast_artifact(
    broadcaster: &BroadcastSender,
    id: Uuid,
    kind: ArtifactKind,
    path: &Path,
    artifact: &BinaryArtifact,
) {
    broadcast_json(
        broadcaster,
        "lab.artifact",
        json!({
            "request_id": id,
            "kind": kind.to_string(),
            "path": path.to_string_lossy(),
            "media_type": artifact.media_type,
            "description": artifact.summary,
            "metadata": Value::Object(artifact.metadata.clone()),
        }),
    );
}

/// Only the short status line leaves the process; details go to the log.
pub fn broadcast_error(broadcaster: &BroadcastSender, id: Uuid, origin: &str, err: &LabError) {
    broadcast_json(
        broadcaster,
        "lab.error",
        json!({
            "request_id": id,
            "origin": origin,
            "message": err.user_message(),
        }),
    );
}
