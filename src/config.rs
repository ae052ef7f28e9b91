use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub providers: ProvidersConfig,
    pub selector: SelectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the uploaded recording bytes.
    pub recordings_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub nats_url: String,

    /// NATS subject prefix for stage messages ("<prefix>.<stage>").
    pub subject_prefix: String,

    /// Transcription stage: attempt bound and delay between attempts.
    pub transcription_attempts: u32,
    pub transcription_retry_secs: u64,

    /// Speaker-attribution stage: smaller bound, failure never reopens a
    /// completed recording.
    pub speaker_attempts: u32,
    pub speaker_retry_secs: u64,

    /// Whether the pipeline enqueues speaker identification after a
    /// successful transcription.
    pub enable_speaker_identification: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    pub cloud: CloudProviderConfig,
    pub offline: OfflineProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudProviderConfig {
    /// Full transcription endpoint, e.g.
    /// `https://api.openai.com/v1/audio/transcriptions`.
    pub base_url: String,
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfflineProviderConfig {
    /// ggml model name, e.g. "base" or "small".
    pub model_name: String,

    /// Model cache directory; defaults to the platform data dir.
    pub models_dir: Option<String>,
}

/// Injected into the engine selector so the decision function stays pure.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Environment-level default overrides, if set.
    pub default_transcriber: Option<String>,
    pub default_recognizer: Option<String>,

    /// Deployment flag forcing all transcription through the local engine.
    #[serde(default)]
    pub offline_only: bool,

    /// Free-tier budget of premium-engine audio seconds per period.
    pub free_premium_budget_secs: f64,

    /// Free-tier audio longer than this always routes offline.
    pub long_audio_cutoff_secs: f64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "audioscribe".to_string(),
                http: HttpConfig {
                    bind: "127.0.0.1".to_string(),
                    port: 8080,
                },
            },
            storage: StorageConfig {
                recordings_path: "data/recordings".to_string(),
            },
            pipeline: PipelineConfig {
                nats_url: "nats://localhost:4222".to_string(),
                subject_prefix: "audioscribe.pipeline".to_string(),
                transcription_attempts: 3,
                transcription_retry_secs: 5,
                speaker_attempts: 2,
                speaker_retry_secs: 5,
                enable_speaker_identification: true,
            },
            providers: ProvidersConfig {
                cloud: CloudProviderConfig {
                    base_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
                    model: "whisper-1".to_string(),
                    api_key_env: "AUDIOSCRIBE_CLOUD_API_KEY".to_string(),
                },
                offline: OfflineProviderConfig {
                    model_name: "base".to_string(),
                    models_dir: None,
                },
            },
            selector: SelectorConfig {
                default_transcriber: None,
                default_recognizer: None,
                offline_only: false,
                free_premium_budget_secs: 30.0 * 60.0,
                long_audio_cutoff_secs: 10.0 * 60.0,
            },
        }
    }
}
