use std::{fmt, path::PathBuf};

use crate::{
    capabilities::BinaryArtifact,
    errors::Result,
    util::{format_local, local_rfc3339, now_local},
};
use serde_json::{Map, Value, json};
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Video,
    Speech,
}

impl ArtifactKind {
    pub fn as_prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Video => "video",
            ArtifactKind::Speech => "speech",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_prefix())
    }
}

/// Stores generated media on disk so the panel can play it from a local path.
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub async fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub async fn persist(&self, kind: ArtifactKind, artifact: &BinaryArtifact) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).await?;
        let now = now_local();
        let timestamp = format_local(&now, "%Y%m%d_%H%M%S");
        let id = Uuid::new_v4();
        let base_name = format!("{}_{}_{}", kind.as_prefix(), timestamp, &id.to_string()[..8]);

        let file_name = format!("{}.{}", base_name, artifact.file_extension);
        let file_path = self.root.join(&file_name);
        fs::write(&file_path, &artifact.data).await?;

        let mut meta = Map::new();
        meta.insert("kind".to_string(), json!(kind.to_string()));
        meta.insert("media_type".to_string(), json!(artifact.media_type));
        meta.insert("description".to_string(), json!(artifact.summary));
        meta.insert("artifact".to_string(), json!(file_name));
        meta.insert("size".to_string(), json!(artifact.data.len()));
        meta.insert("created_at".to_string(), json!(local_rfc3339(&now)));

        if let Some(prompt) = artifact
            .metadata
            .get("prompt")
            .and_then(|value| value.as_str())
        {
            meta.insert("prompt".to_string(), Value::String(prompt.to_string()));
        }

        if !artifact.metadata.is_empty() {
            meta.insert(
                "metadata".to_string(),
                Value::Object(artifact.metadata.clone()),
            );
        }

        let meta_path = self.root.join(format!("{}.meta.json", base_name));
        fs::write(&meta_path, serde_json::to_vec_pretty(&Value::Object(meta))?).await?;

        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_media_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("out")).await.unwrap();

        let mut metadata = Map::new();
        metadata.insert("prompt".to_string(), json!("sala de juicio oral"));
        let artifact = BinaryArtifact::new(b"fake-mp4".to_vec(), "video/mp4", "mp4", "Veo")
            .with_metadata(metadata);

        let path = writer.persist(ArtifactKind::Video, &artifact).await.unwrap();

        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("mp4"));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("video_"));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake-mp4");

        let meta_path = path.with_extension("meta.json");
        let meta: Value = serde_json::from_slice(&std::fs::read(meta_path).unwrap()).unwrap();
        assert_eq!(meta["kind"], "video");
        assert_eq!(meta["prompt"], "sala de juicio oral");
        assert_eq!(meta["size"], 8);
    }
}
