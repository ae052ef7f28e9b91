use anyhow::{Context, Result};
use async_nats::Client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Pipeline stages, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExtractMetadata,
    Transcribe,
    IdentifySpeakers,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ExtractMetadata => "extract_metadata",
            Stage::Transcribe => "transcribe",
            Stage::IdentifySpeakers => "identify_speakers",
        }
    }
}

/// Hand-off between stages. Carries only the recording id; each stage
/// reloads state from the store so messages stay small and replayable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMessage {
    pub recording_id: Uuid,
    pub stage: Stage,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, message: StageMessage) -> Result<()>;
}

/// NATS-backed queue. Each stage publishes to `<prefix>.<stage>`; workers
/// subscribe to `<prefix>.>` and dispatch on the message payload.
pub struct NatsQueue {
    client: Client,
    subject_prefix: String,
}

impl NatsQueue {
    pub async fn connect(url: &str, subject_prefix: impl Into<String>) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            subject_prefix: subject_prefix.into(),
        })
    }

    pub async fn subscribe_all(&self) -> Result<async_nats::Subscriber> {
        let subject = format!("{}.>", self.subject_prefix);

        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to pipeline subjects")?;

        info!("Subscribed to {}", subject);

        Ok(subscriber)
    }
}

#[async_trait]
impl JobQueue for NatsQueue {
    async fn enqueue(&self, message: StageMessage) -> Result<()> {
        let subject = format!("{}.{}", self.subject_prefix, message.stage.as_str());
        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish stage message")?;

        info!(
            "Enqueued {} for recording {}",
            message.stage.as_str(),
            message.recording_id
        );

        Ok(())
    }
}

/// In-process queue backed by an unbounded channel. Lets the pipeline run
/// without a broker, which integration tests rely on.
pub struct MemoryQueue {
    sender: mpsc::UnboundedSender<StageMessage>,
}

impl MemoryQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StageMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, message: StageMessage) -> Result<()> {
        self.sender
            .send(message)
            .context("Pipeline channel closed")?;
        Ok(())
    }
}
