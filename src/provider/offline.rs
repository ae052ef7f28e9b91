use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{spool_to_temp, TranscriptionResult, Transcriber};
use crate::audio::AudioFile;
use crate::config::OfflineProviderConfig;
use crate::error::ProviderError;
use crate::model::RawSegment;

/// whisper.cpp reports no confidence scoring; segments carry this constant.
const PLACEHOLDER_CONFIDENCE: f32 = 1.0;

/// Whisper consumes 16 kHz mono f32 samples.
const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Audio is decoded in windows of this many seconds, with segment
/// timestamps offset by the window start.
const CHUNK_SECONDS: usize = 30;

/// Offline whisper.cpp backend.
///
/// Loads a local ggml model, downloading it from Hugging Face on first use
/// if absent. Accepts WAV input only; other formats must be converted
/// upstream.
pub struct OfflineTranscriber {
    config: OfflineProviderConfig,
    models_dir: PathBuf,
    context: RwLock<Option<WhisperContext>>,
}

impl OfflineTranscriber {
    pub fn new(config: OfflineProviderConfig) -> Self {
        let models_dir = config
            .models_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join("audioscribe")
                    .join("models")
            });
        Self {
            config,
            models_dir,
            context: RwLock::new(None),
        }
    }

    fn model_path(&self) -> PathBuf {
        self.models_dir
            .join(format!("ggml-{}.bin", self.config.model_name))
    }

    fn model_url(&self) -> String {
        format!(
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-{}.bin",
            self.config.model_name
        )
    }

    async fn download_model(&self, target: &Path) -> Result<(), ProviderError> {
        std::fs::create_dir_all(&self.models_dir)
            .map_err(|e| ProviderError::ModelUnavailable(e.to_string()))?;

        let url = self.model_url();
        info!("Downloading whisper model {} from {}", self.config.model_name, url);

        let response = reqwest::get(&url)
            .await
            .map_err(|e| ProviderError::ModelUnavailable(format!("download failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ProviderError::ModelUnavailable(format!(
                "download failed with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::ModelUnavailable(format!("download failed: {}", e)))?;

        // Write to a scratch name first so a partial download never looks
        // like a usable model.
        let partial = target.with_extension("bin.partial");
        std::fs::write(&partial, &bytes)
            .map_err(|e| ProviderError::ModelUnavailable(e.to_string()))?;
        std::fs::rename(&partial, target)
            .map_err(|e| ProviderError::ModelUnavailable(e.to_string()))?;

        info!("Whisper model saved to {}", target.display());
        Ok(())
    }

    async fn ensure_initialized(&self) -> Result<(), ProviderError> {
        if self.context.read().await.is_some() {
            return Ok(());
        }
        self.initialize().await.map(|_| ())
    }
}

#[async_trait]
impl Transcriber for OfflineTranscriber {
    fn id(&self) -> &'static str {
        "offline"
    }

    async fn initialize(&self) -> Result<String, ProviderError> {
        let model_path = self.model_path();
        if !model_path.exists() {
            self.download_model(&model_path).await?;
        }

        let ctx = WhisperContext::new_with_params(
            &model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| {
            ProviderError::ModelUnavailable(format!(
                "cannot load model {}: {}",
                model_path.display(),
                e
            ))
        })?;

        *self.context.write().await = Some(ctx);
        Ok(format!(
            "Offline whisper model loaded: {}",
            self.config.model_name
        ))
    }

    async fn transcribe(
        &self,
        audio_file: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, ProviderError> {
        self.ensure_initialized().await?;

        if !audio_file.exists() {
            return Err(ProviderError::FileNotFound(
                audio_file.display().to_string(),
            ));
        }
        let is_wav = audio_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if !is_wav {
            return Err(ProviderError::UnsupportedFormat(
                audio_file.display().to_string(),
            ));
        }

        let audio = AudioFile::open(audio_file)
            .map_err(|e| ProviderError::Engine(format!("cannot decode WAV: {}", e)))?;
        let samples = audio.to_mono_resampled(WHISPER_SAMPLE_RATE);
        let duration = samples.len() as f64 / WHISPER_SAMPLE_RATE as f64;

        let ctx_guard = self.context.read().await;
        let ctx = ctx_guard
            .as_ref()
            .ok_or_else(|| ProviderError::ModelUnavailable("model not loaded".to_string()))?;

        let chunk_len = CHUNK_SECONDS * WHISPER_SAMPLE_RATE as usize;
        let mut text = String::new();
        let mut segments: Vec<RawSegment> = Vec::new();

        for (chunk_index, chunk) in samples.chunks(chunk_len).enumerate() {
            // whisper.cpp rejects buffers shorter than one second.
            if chunk.len() < WHISPER_SAMPLE_RATE as usize {
                continue;
            }
            let offset = (chunk_index * CHUNK_SECONDS) as f64;

            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(language);
            params.set_translate(false);
            params.set_print_special(false);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);

            let mut state = ctx
                .create_state()
                .map_err(|e| ProviderError::Engine(format!("whisper state: {}", e)))?;
            state
                .full(params, chunk)
                .map_err(|e| ProviderError::Engine(format!("whisper inference: {}", e)))?;

            let n_segments = state
                .full_n_segments()
                .map_err(|e| ProviderError::Engine(format!("whisper segments: {}", e)))?;

            for i in 0..n_segments {
                let segment_text = match state.full_get_segment_text_lossy(i) {
                    Ok(t) => t.trim().to_string(),
                    Err(_) => continue,
                };
                if segment_text.is_empty() {
                    continue;
                }

                // Timestamps are reported in 10 ms units.
                let t0 = state.full_get_segment_t0(i).unwrap_or(0) as f64 * 0.01;
                let t1 = state.full_get_segment_t1(i).unwrap_or(0) as f64 * 0.01;

                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&segment_text);

                segments.push(RawSegment {
                    start: offset + t0,
                    end: offset + t1,
                    text: segment_text,
                    speaker_id: None,
                    confidence: Some(PLACEHOLDER_CONFIDENCE),
                });
            }
        }

        Ok(TranscriptionResult {
            text,
            segments,
            language: language.unwrap_or("auto").to_string(),
            duration,
        })
    }

    async fn transcribe_stream(
        &self,
        data: &[u8],
        format: &str,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, ProviderError> {
        let temp_path = spool_to_temp(data, format)?;
        let result = self.transcribe(&temp_path, language).await;
        if let Err(e) = std::fs::remove_file(&temp_path) {
            warn!("Failed to remove temp file {}: {}", temp_path.display(), e);
        }
        result
    }

    async fn health_check(&self) -> bool {
        self.context.read().await.is_some() || self.model_path().exists()
    }
}
