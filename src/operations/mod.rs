//! Long-running remote operations.
//!
//! Video generation does not answer with bytes. The service hands back an
//! operation name that has to be polled until it reports `done`, and the
//! finished operation only carries locators that must be downloaded in a
//! second step. [`Poller`] drives that sequence for a single request.

mod poller;
mod progress;

pub use poller::{PollPolicy, Poller};
pub use progress::ProgressMessages;

use std::{fmt, future::Future};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    capabilities::InlineMedia,
    errors::{LabError, Result},
};

/// The remote side of a long-running generation.
pub trait OperationsApi: Send + Sync {
    fn submit(&self, request: &GenerationRequest) -> impl Future<Output = Result<Operation>> + Send;

    fn fetch_status(
        &self,
        handle: &OperationHandle,
    ) -> impl Future<Output = Result<Operation>> + Send;

    /// Downloads the payload behind a result locator, adding credentials as needed.
    fn fetch_artifact(&self, locator: &str) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Opaque operation name. Always sent back exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFault {
    pub code: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Locators(Vec<String>),
    Fault(OperationFault),
}

/// Snapshot of a remote operation. Once `done` is set the outcome never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub handle: OperationHandle,
    pub done: bool,
    pub outcome: Option<OperationOutcome>,
}

impl Operation {
    pub fn pending(handle: OperationHandle) -> Self {
        Self {
            handle,
            done: false,
            outcome: None,
        }
    }

    pub fn succeeded(handle: OperationHandle, locators: Vec<String>) -> Self {
        Self {
            handle,
            done: true,
            outcome: Some(OperationOutcome::Locators(locators)),
        }
    }

    pub fn failed(handle: OperationHandle, fault: OperationFault) -> Self {
        Self {
            handle,
            done: true,
            outcome: Some(OperationOutcome::Fault(fault)),
        }
    }

    pub fn first_locator(&self) -> Option<&str> {
        match &self.outcome {
            Some(OperationOutcome::Locators(locators)) => locators
                .iter()
                .map(String::as_str)
                .find(|locator| !locator.trim().is_empty()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoResolution {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl VideoResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoResolution::P720 => "720p",
            VideoResolution::P1080 => "1080p",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoAspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl VideoAspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoAspectRatio::Landscape => "16:9",
            VideoAspectRatio::Portrait => "9:16",
        }
    }
}

/// Parameters of one generation. Not modified after submission.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub seed_image: Option<InlineMedia>,
    pub resolution: VideoResolution,
    pub aspect_ratio: VideoAspectRatio,
    pub number_of_outputs: u32,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            seed_image: None,
            resolution: VideoResolution::default(),
            aspect_ratio: VideoAspectRatio::default(),
            number_of_outputs: 1,
        }
    }

    pub fn with_seed_image(mut self, image: InlineMedia) -> Self {
        self.seed_image = Some(image);
        self
    }

    pub fn with_resolution(mut self, resolution: VideoResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: VideoAspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_outputs(mut self, count: u32) -> Self {
        self.number_of_outputs = count;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(LabError::invalid("model identifier is empty"));
        }
        if self.prompt.trim().is_empty() && self.seed_image.is_none() {
            return Err(LabError::invalid("a prompt or a seed image is required"));
        }
        if self.number_of_outputs == 0 {
            return Err(LabError::invalid("number_of_outputs must be positive"));
        }
        if let Some(image) = &self.seed_image {
            if image.data.is_empty() {
                return Err(LabError::invalid("seed image is empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_prompt_or_seed() {
        let request = GenerationRequest::new("veo", "   ");
        assert!(matches!(
            request.validate(),
            Err(LabError::Submission(crate::errors::SubmissionError::Invalid(_)))
        ));

        let seeded = request.with_seed_image(InlineMedia::new("image/png", vec![1, 2, 3]));
        assert!(seeded.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_outputs() {
        let request = GenerationRequest::new("veo", "test scene").with_outputs(0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn first_locator_skips_blank_entries() {
        let op = Operation::succeeded(
            OperationHandle::new("operations/1"),
            vec![String::new(), "https://example/video123".into()],
        );
        assert_eq!(op.first_locator(), Some("https://example/video123"));

        let failed = Operation::failed(
            OperationHandle::new("operations/2"),
            OperationFault {
                code: Some(3),
                message: "blocked".into(),
            },
        );
        assert_eq!(failed.first_locator(), None);
    }

    #[test]
    fn enums_serialize_to_wire_strings() {
        assert_eq!(
            serde_json::to_string(&VideoAspectRatio::Portrait).unwrap(),
            "\"9:16\""
        );
        assert_eq!(
            serde_json::from_str::<VideoResolution>("\"1080p\"").unwrap(),
            VideoResolution::P1080
        );
    }
}
