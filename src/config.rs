use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, anyhow};
use serde::Deserialize;

use crate::operations::{PollPolicy, ProgressMessages};

const DEFAULT_CONFIG_PATH: &str = "config/lab.toml";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];
const DEFAULT_THINKING_BUDGET: u32 = 32768;
const DEFAULT_LOCATION_TIMEOUT_SECONDS: u64 = 5;

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// Fallback key when none of `api_key_env` is set.
    pub api_key: Option<String>,
    /// Environment variables consulted, in order, on every request.
    pub api_key_env: Vec<String>,
    pub api_base: String,
    pub request_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub chat: String,
    pub chat_search: String,
    pub chat_thinking: String,
    pub thinking_budget: u32,
    pub image: String,
    pub image_edit: String,
    pub video: String,
    pub speech: String,
    pub speech_voice: String,
    pub transcription: String,
    pub analysis: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        FileModelConfig::default().into_domain()
    }
}

#[derive(Clone, Debug)]
pub struct PollingConfig {
    pub policy: PollPolicy,
    pub messages: ProgressMessages,
}

#[derive(Clone, Debug, Default)]
pub struct LocationConfig {
    pub fixed: Option<(f64, f64)>,
    pub lookup_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct SseConfig {
    pub access_key: String,
    pub secret_key: String,
    pub bind_addr: SocketAddr,
    pub signature_ttl: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub models: ModelConfig,
    pub polling: PollingConfig,
    pub location: LocationConfig,
    pub artifacts_dir: PathBuf,
    pub sse: SseConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            env::var("LAB_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let config_path = Path::new(&config_path);

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file {:?}", config_path))?;

        Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config file {:?}", config_path))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let file_config: FileConfig = toml::from_str(contents)?;

        let artifacts_dir = if let Some(dir) = &file_config.artifacts_dir {
            PathBuf::from(dir)
        } else if let Ok(dir) = env::var("ARTIFACTS_DIR") {
            PathBuf::from(dir)
        } else {
            env::current_dir()?.join("artifacts")
        };

        let sse = file_config
            .sse
            .map(|section| section.into_domain())
            .transpose()?
            .ok_or_else(|| {
                anyhow!("missing [sse] section (access_key, secret_key, bind_addr) in lab config")
            })?;

        Ok(Self {
            gemini: file_config.gemini.unwrap_or_default().into_domain(),
            models: file_config.models.unwrap_or_default().into_domain(),
            polling: file_config.polling.unwrap_or_default().into_domain(),
            location: file_config.location.unwrap_or_default().into_domain(),
            artifacts_dir,
            sse,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    artifacts_dir: Option<String>,
    #[serde(default)]
    gemini: Option<FileGeminiConfig>,
    #[serde(default)]
    models: Option<FileModelConfig>,
    #[serde(default)]
    polling: Option<FilePollingConfig>,
    #[serde(default)]
    location: Option<FileLocationConfig>,
    #[serde(default)]
    sse: Option<FileSseConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct FileGeminiConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_key_env: Option<Vec<String>>,
    #[serde(default)]
    api_base: Option<String>,
    #[serde(default)]
    request_timeout_seconds: Option<u64>,
}

impl FileGeminiConfig {
    fn into_domain(self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.filter(|key| !key.trim().is_empty()),
            api_key_env: self.api_key_env.unwrap_or_else(|| {
                DEFAULT_API_KEY_VARS
                    .iter()
                    .map(|name| name.to_string())
                    .collect()
            }),
            api_base: self
                .api_base
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout: Duration::from_secs(self.request_timeout_seconds.unwrap_or(120)),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileModelConfig {
    #[serde(default)]
    chat: Option<String>,
    #[serde(default)]
    chat_search: Option<String>,
    #[serde(default)]
    chat_thinking: Option<String>,
    #[serde(default)]
    thinking_budget: Option<u32>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_edit: Option<String>,
    #[serde(default)]
    video: Option<String>,
    #[serde(default)]
    speech: Option<String>,
    #[serde(default)]
    speech_voice: Option<String>,
    #[serde(default)]
    transcription: Option<String>,
    #[serde(default)]
    analysis: Option<String>,
}

impl FileModelConfig {
    fn into_domain(self) -> ModelConfig {
        let or = |value: Option<String>, default: &str| value.unwrap_or_else(|| default.to_string());

        ModelConfig {
            chat: or(self.chat, "gemini-2.5-flash-lite"),
            chat_search: or(self.chat_search, "gemini-3-flash-preview"),
            chat_thinking: or(self.chat_thinking, "gemini-3-pro-preview"),
            thinking_budget: self.thinking_budget.unwrap_or(DEFAULT_THINKING_BUDGET),
            image: or(self.image, "gemini-3-pro-image-preview"),
            image_edit: or(self.image_edit, "gemini-2.5-flash-image"),
            video: or(self.video, "veo-3.1-fast-generate-preview"),
            speech: or(self.speech, "gemini-2.5-flash-preview-tts"),
            speech_voice: or(self.speech_voice, "Kore"),
            transcription: or(self.transcription, "gemini-3-flash-preview"),
            analysis: or(self.analysis, "gemini-3-pro-preview"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FilePollingConfig {
    #[serde(default)]
    interval_seconds: Option<u64>,
    #[serde(default)]
    max_attempts: Option<u32>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
    #[serde(default)]
    poll_retries: Option<u32>,
    #[serde(default)]
    fetch_retries: Option<u32>,
    #[serde(default)]
    progress_messages: Option<Vec<String>>,
}

impl FilePollingConfig {
    fn into_domain(self) -> PollingConfig {
        let defaults = PollPolicy::default();

        let policy = PollPolicy {
            interval: self
                .interval_seconds
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or(defaults.interval),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            timeout: self
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            poll_retries: self.poll_retries.unwrap_or(defaults.poll_retries),
            fetch_retries: self.fetch_retries.unwrap_or(defaults.fetch_retries),
        };

        let messages = self
            .progress_messages
            .filter(|messages| !messages.is_empty())
            .map(ProgressMessages::new)
            .unwrap_or_default();

        PollingConfig { policy, messages }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileLocationConfig {
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    lookup_url: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl FileLocationConfig {
    fn into_domain(self) -> LocationConfig {
        LocationConfig {
            fixed: self.latitude.zip(self.longitude),
            lookup_url: self.lookup_url.filter(|url| !url.trim().is_empty()),
            timeout: Duration::from_secs(
                self.timeout_seconds
                    .unwrap_or(DEFAULT_LOCATION_TIMEOUT_SECONDS)
                    .max(1),
            ),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileSseConfig {
    #[serde(default)]
    access_key: Option<String>,
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    bind_addr: Option<String>,
    #[serde(default)]
    signature_ttl_seconds: Option<u64>,
}

impl FileSseConfig {
    fn into_domain(self) -> anyhow::Result<SseConfig> {
        let access_key = self
            .access_key
            .ok_or_else(|| anyhow!("sse.access_key is not set"))?;
        let secret_key = self
            .secret_key
            .ok_or_else(|| anyhow!("sse.secret_key is not set"))?;

        let bind_addr_str = self
            .bind_addr
            .unwrap_or_else(|| "127.0.0.1:9000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid sse.bind_addr: {}", bind_addr_str))?;

        let ttl_seconds = self.signature_ttl_seconds.unwrap_or(300).max(30);

        Ok(SseConfig {
            access_key,
            secret_key,
            bind_addr,
            signature_ttl: Duration::from_secs(ttl_seconds),
        })
    }
}
