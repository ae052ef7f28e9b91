use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states of an uploaded recording.
///
/// `Pending` on creation. `Processing` is re-entered when the pipeline hands
/// off between sub-stages (the status message changes, not the state).
/// `Failed` is terminal; `Completed` is terminal for the main pipeline —
/// later speaker-attribution retries never reopen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

/// One uploaded audio asset, owned exclusively by its uploading user.
///
/// Mutated only by the pipeline orchestrator and the metadata-extraction
/// step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,

    /// Readable local path to the stored audio bytes.
    pub storage_path: String,

    /// Detected format extension ("wav", "mp3", ...), empty until known.
    pub format: String,

    /// Duration in seconds, unknown until metadata extraction ran.
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub file_size: Option<u64>,

    pub status: ProcessingStatus,

    /// Latest human-readable explanation of the current state, including
    /// retry countdowns and final failure text.
    pub status_message: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Recording {
    pub fn new(user_id: Uuid, title: impl Into<String>, storage_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            storage_path: storage_path.into(),
            format: String::new(),
            duration: None,
            sample_rate: None,
            channels: None,
            file_size: None,
            status: ProcessingStatus::Pending,
            status_message: String::new(),
            created_at: now,
            updated_at: now,
            processed_at: None,
        }
    }

    /// Apply a state transition, updating the operator-visible message.
    ///
    /// Entering `Completed` stamps `processed_at`.
    pub fn set_status(&mut self, status: ProcessingStatus, message: impl Into<String>) {
        self.status = status;
        self.status_message = message.into();
        self.updated_at = Utc::now();
        if status == ProcessingStatus::Completed {
            self.processed_at = Some(self.updated_at);
        }
    }

    pub fn update_metadata(
        &mut self,
        duration: Option<f64>,
        sample_rate: Option<u32>,
        channels: Option<u16>,
        file_size: Option<u64>,
    ) {
        if duration.is_some() {
            self.duration = duration;
        }
        if sample_rate.is_some() {
            self.sample_rate = sample_rate;
        }
        if channels.is_some() {
            self.channels = channels;
        }
        if file_size.is_some() {
            self.file_size = file_size;
        }
        self.updated_at = Utc::now();
    }

    /// Duration formatted as `HH:MM:SS`, or `00:00:00` when unknown.
    pub fn duration_display(&self) -> String {
        let total = self.duration.unwrap_or(0.0).max(0.0) as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }

    /// File size in human-readable units, or "unknown".
    pub fn file_size_display(&self) -> String {
        let Some(bytes) = self.file_size else {
            return "unknown".to_string();
        };
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = bytes as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        format!("{:.2} {}", size, UNITS[unit])
    }
}
