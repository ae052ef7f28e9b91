//! Asynchronous processing pipeline.
//!
//! A recording moves through three stages: metadata extraction,
//! transcription, and speaker identification. Stages communicate only
//! through [`StageMessage`]s on a [`JobQueue`]; each stage reloads the
//! recording from the store, so a crashed worker loses at most the stage
//! it was running.

pub mod queue;
mod stages;

pub use queue::{JobQueue, MemoryQueue, NatsQueue, Stage, StageMessage};
pub use stages::{StageResult, StageRunner};

use anyhow::Result;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::store::Store;

/// Owns the stage runner and the queue handle used to admit new work.
pub struct Orchestrator {
    runner: StageRunner,
    queue: Arc<dyn JobQueue>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn JobQueue>, config: Config) -> Self {
        Self {
            runner: StageRunner::new(store, queue.clone(), config),
            queue,
        }
    }

    /// Build with custom engine factories, used by tests to avoid real
    /// transcription backends.
    pub fn with_runner(runner: StageRunner, queue: Arc<dyn JobQueue>) -> Self {
        Self { runner, queue }
    }

    /// Admit a recording into the pipeline at the first stage.
    pub async fn submit(&self, recording_id: Uuid) -> Result<()> {
        self.queue
            .enqueue(StageMessage {
                recording_id,
                stage: Stage::ExtractMetadata,
            })
            .await
    }

    pub async fn dispatch(&self, message: &StageMessage) -> Result<StageResult> {
        info!(
            "Running stage {} for recording {}",
            message.stage.as_str(),
            message.recording_id
        );
        self.runner.run(message).await
    }

    /// Consume stage messages from a NATS subscription until it closes.
    pub async fn run_nats_worker(&self, mut subscriber: async_nats::Subscriber) -> Result<()> {
        while let Some(message) = subscriber.next().await {
            let stage_message: StageMessage = match serde_json::from_slice(&message.payload) {
                Ok(m) => m,
                Err(e) => {
                    error!("Discarding malformed stage message: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.dispatch(&stage_message).await {
                error!(
                    "Stage {} failed for recording {}: {:#}",
                    stage_message.stage.as_str(),
                    stage_message.recording_id,
                    e
                );
            }
        }
        info!("Pipeline subscription closed, worker exiting");
        Ok(())
    }

    /// Consume stage messages from an in-process channel. Returns when the
    /// channel is empty or closed; drives the [`MemoryQueue`] in tests.
    pub async fn drain_channel(
        &self,
        receiver: &mut mpsc::UnboundedReceiver<StageMessage>,
    ) -> Result<Vec<StageResult>> {
        let mut results = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            results.push(self.dispatch(&message).await?);
        }
        Ok(results)
    }
}
