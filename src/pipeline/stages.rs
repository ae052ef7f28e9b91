use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::queue::{JobQueue, Stage, StageMessage};
use crate::audio::{extract_metadata, AudioMetadata};
use crate::config::Config;
use crate::error::ProviderError;
use crate::model::{ProcessingStatus, Recording, ServiceType, Transcript, UsageRecord};
use crate::provider::{create_transcriber, ProviderKind, Transcriber};
use crate::quota::{month_start, QuotaContext, QuotaManager};
use crate::selector::{select_recognizer, select_transcriber, SelectionContext};
use crate::speaker::{create_recognizer, RecognizerKind, SpeakerRecognizer};
use crate::store::{bulk_build_segments, Store};

/// Outcome of one stage execution. Failures here are business outcomes
/// (quota denial, retries exhausted), not transport errors.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub success: bool,
    pub message: String,
}

impl StageResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

type TranscriberFactory = Box<dyn Fn(ProviderKind) -> Arc<dyn Transcriber> + Send + Sync>;
type RecognizerFactory = Box<dyn Fn(RecognizerKind) -> Arc<dyn SpeakerRecognizer> + Send + Sync>;

/// Executes pipeline stages against the store and hands work to the next
/// stage through the queue.
pub struct StageRunner {
    store: Arc<dyn Store>,
    queue: Arc<dyn JobQueue>,
    quota: QuotaManager,
    config: Config,
    transcribers: TranscriberFactory,
    recognizers: RecognizerFactory,
}

impl StageRunner {
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn JobQueue>, config: Config) -> Self {
        let providers = config.providers.clone();
        Self {
            quota: QuotaManager::new(store.clone()),
            store,
            queue,
            config,
            transcribers: Box::new(move |kind| create_transcriber(kind, &providers)),
            recognizers: Box::new(create_recognizer),
        }
    }

    /// Replace the engine factories, used to run the pipeline against
    /// stub engines.
    pub fn with_engines(
        mut self,
        transcribers: TranscriberFactory,
        recognizers: RecognizerFactory,
    ) -> Self {
        self.transcribers = transcribers;
        self.recognizers = recognizers;
        self
    }

    pub async fn run(&self, message: &StageMessage) -> Result<StageResult> {
        match message.stage {
            Stage::ExtractMetadata => self.run_extract_metadata(message.recording_id).await,
            Stage::Transcribe => self.run_transcribe(message.recording_id).await,
            Stage::IdentifySpeakers => self.run_identify_speakers(message.recording_id).await,
        }
    }

    async fn save(&self, recording: &Recording) -> Result<()> {
        self.store
            .put_recording(recording.clone())
            .await
            .context("Failed to persist recording")
    }

    /// First stage: probe the audio file and move the recording from
    /// pending to processing. A failed probe is not fatal; fixed defaults
    /// are substituted and the pipeline continues.
    async fn run_extract_metadata(&self, recording_id: Uuid) -> Result<StageResult> {
        let mut recording = self.store.get_recording(recording_id).await?;
        recording.set_status(ProcessingStatus::Processing, "Extracting audio metadata");
        self.save(&recording).await?;

        let probed = match extract_metadata(&recording.storage_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    "Metadata probe failed for recording {}: {:#}",
                    recording_id, e
                );
                AudioMetadata::default()
            }
        };

        let (metadata, substituted) = probed.or_defaults();
        if substituted {
            warn!(
                "Recording {} missing probe fields, proceeding with defaults",
                recording_id
            );
        }
        recording.update_metadata(
            metadata.duration,
            metadata.sample_rate,
            metadata.channels,
            metadata.file_size,
        );
        self.save(&recording).await?;

        self.queue
            .enqueue(StageMessage {
                recording_id,
                stage: Stage::Transcribe,
            })
            .await?;

        Ok(StageResult::ok("Metadata extracted"))
    }

    /// Core stage: quota gate, engine selection, transcription with
    /// retries, then persistence and usage accounting.
    ///
    /// A quota denial fails the recording without writing a usage record.
    async fn run_transcribe(&self, recording_id: Uuid) -> Result<StageResult> {
        let mut recording = self.store.get_recording(recording_id).await?;
        let quota_state = self.store.get_quota_state(recording.user_id).await?;

        let quota_ctx = QuotaContext {
            content_kind: None,
            file_size: recording.file_size,
            duration_secs: recording.duration,
        };
        let decision = self
            .quota
            .check(recording.user_id, ServiceType::Transcription, &quota_ctx)
            .await?;
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "transcription quota exceeded".to_string());
            recording.set_status(ProcessingStatus::Failed, reason.clone());
            self.save(&recording).await?;
            return Ok(StageResult::failed(reason));
        }

        let premium_seconds_used = self
            .store
            .audio_seconds_since(
                recording.user_id,
                ServiceType::Transcription,
                Some("cloud"),
                month_start(Utc::now()),
            )
            .await?;
        let selection = SelectionContext {
            tier: quota_state.tier,
            preference: quota_state.preferred_transcriber.as_deref(),
            audio_seconds: recording.duration.unwrap_or(0.0),
            offline_only: self.config.selector.offline_only,
            premium_seconds_used,
        };
        let kind = select_transcriber(&selection, &self.config.selector);
        let transcriber = (self.transcribers)(kind);

        recording.set_status(
            ProcessingStatus::Processing,
            format!("Transcribing with {} engine", kind.as_str()),
        );
        self.save(&recording).await?;

        let attempts = self.config.pipeline.transcription_attempts.max(1);
        let started = Instant::now();
        let mut last_error = String::new();
        let mut result = None;

        for attempt in 1..=attempts {
            let outcome = match transcriber.initialize().await {
                Ok(_) => {
                    transcriber
                        .transcribe(Path::new(&recording.storage_path), None)
                        .await
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(r) => {
                    result = Some(r);
                    break;
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        "Transcription attempt {}/{} failed for recording {}: {}",
                        attempt, attempts, recording_id, last_error
                    );
                    if attempt < attempts {
                        recording.set_status(
                            ProcessingStatus::Processing,
                            format!(
                                "Transcription attempt {} of {} failed, retrying",
                                attempt, attempts
                            ),
                        );
                        self.save(&recording).await?;
                        tokio::time::sleep(Duration::from_secs(
                            self.config.pipeline.transcription_retry_secs,
                        ))
                        .await;
                    }
                }
            }
        }

        let output = match result {
            Some(output) => output,
            None => {
                let reason = format!(
                    "Transcription failed after {} attempts: {}",
                    attempts, last_error
                );
                error!("Recording {}: {}", recording_id, reason);
                recording.set_status(ProcessingStatus::Failed, reason.clone());
                self.save(&recording).await?;
                // Billable work ran even though it failed; only a quota
                // denial skips the usage log.
                self.quota
                    .log_usage(
                        UsageRecord::new(
                            recording.user_id,
                            ServiceType::Transcription,
                            "transcribe_recording_failed",
                        )
                        .with_resource(recording.id)
                        .with_model(transcriber.id()),
                    )
                    .await?;
                return Ok(StageResult::failed(reason));
            }
        };

        let mut transcript = Transcript::new(recording.id, transcriber.id());
        transcript.language = output.language.clone();
        transcript.processing_seconds = Some(started.elapsed().as_secs_f64());
        transcript.is_processed = true;
        let confidences: Vec<f32> = output
            .segments
            .iter()
            .filter_map(|s| s.confidence)
            .collect();
        if !confidences.is_empty() {
            transcript.confidence =
                Some(confidences.iter().sum::<f32>() / confidences.len() as f32);
        }

        let stored = bulk_build_segments(self.store.as_ref(), &mut transcript, &output.segments)
            .await
            .context("Failed to persist transcript segments")?;

        let audio_seconds = if output.duration > 0.0 {
            output.duration
        } else {
            recording.duration.unwrap_or(0.0)
        };
        self.quota
            .log_usage(
                UsageRecord::new(
                    recording.user_id,
                    ServiceType::Transcription,
                    "transcribe_recording",
                )
                .with_resource(recording.id)
                .with_model(transcriber.id())
                .with_audio_duration(audio_seconds),
            )
            .await?;

        if output.duration > 0.0 {
            recording.update_metadata(Some(output.duration), None, None, None);
        }
        recording.set_status(ProcessingStatus::Completed, "Transcription complete");
        self.save(&recording).await?;

        info!(
            "Recording {} transcribed: {} segments, engine {}",
            recording_id,
            stored.len(),
            transcriber.id()
        );

        if self.config.pipeline.enable_speaker_identification {
            self.queue
                .enqueue(StageMessage {
                    recording_id,
                    stage: Stage::IdentifySpeakers,
                })
                .await?;
        }

        Ok(StageResult::ok("Transcription complete"))
    }

    /// Post-completion stage: label segments with speaker ids. The
    /// recording is already completed when this runs, and nothing here
    /// reopens it; a denial or exhausted retries only logs.
    async fn run_identify_speakers(&self, recording_id: Uuid) -> Result<StageResult> {
        let recording = self.store.get_recording(recording_id).await?;
        let quota_state = self.store.get_quota_state(recording.user_id).await?;

        let decision = self
            .quota
            .check(
                recording.user_id,
                ServiceType::SpeakerIdentification,
                &QuotaContext {
                    duration_secs: recording.duration,
                    ..QuotaContext::default()
                },
            )
            .await?;
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "speaker identification quota exceeded".to_string());
            info!(
                "Skipping speaker identification for recording {}: {}",
                recording_id, reason
            );
            return Ok(StageResult::failed(reason));
        }

        let transcript = self.store.transcript_for_recording(recording_id).await?;
        let segments = self.store.list_segments(transcript.id).await?;
        if segments.is_empty() {
            return Ok(StageResult::failed("No segments to label"));
        }

        let kind = select_recognizer(
            quota_state.preferred_recognizer.as_deref(),
            &self.config.selector,
        );
        let recognizer = (self.recognizers)(kind);

        let attempts = self.config.pipeline.speaker_attempts.max(1);
        let mut last_error = String::new();
        let mut assignments = None;

        for attempt in 1..=attempts {
            let outcome = match recognizer.initialize().await {
                Ok(_) => {
                    recognizer
                        .identify_speakers(Path::new(&recording.storage_path), &segments)
                        .await
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(result) => {
                    assignments = Some(result);
                    break;
                }
                // Too few usable segments will not improve on retry.
                Err(ProviderError::InsufficientSegments) => {
                    last_error = ProviderError::InsufficientSegments.to_string();
                    break;
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        "Speaker identification attempt {}/{} failed for recording {}: {}",
                        attempt, attempts, recording_id, last_error
                    );
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_secs(
                            self.config.pipeline.speaker_retry_secs,
                        ))
                        .await;
                    }
                }
            }
        }

        let assignments = match assignments {
            Some(a) => a,
            None => {
                warn!(
                    "Speaker identification gave up for recording {}: {}",
                    recording_id, last_error
                );
                return Ok(StageResult::failed(last_error));
            }
        };

        let mut labeled = 0usize;
        for mut segment in segments {
            if let Some(assignment) = assignments.iter().find(|a| a.segment_id == segment.id) {
                segment.speaker_id = Some(assignment.speaker_id.clone());
                self.store.update_segment(segment).await?;
                labeled += 1;
            }
        }

        self.quota
            .log_usage(
                UsageRecord::new(
                    recording.user_id,
                    ServiceType::SpeakerIdentification,
                    "identify_speakers",
                )
                .with_resource(recording.id)
                .with_model(recognizer.id())
                .with_audio_duration(recording.duration.unwrap_or(0.0)),
            )
            .await?;

        info!(
            "Labeled {} segments with speakers for recording {}",
            labeled, recording_id
        );
        Ok(StageResult::ok("Speakers identified"))
    }
}
