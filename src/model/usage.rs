use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Billable service categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Transcription,
    SpeakerIdentification,
    Summary,
    ContentGeneration,
    Search,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Transcription => "transcription",
            ServiceType::SpeakerIdentification => "speaker_identification",
            ServiceType::Summary => "summary",
            ServiceType::ContentGeneration => "content_generation",
            ServiceType::Search => "search",
        }
    }
}

/// Subscription tiers, ordered by capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Basic,
    Premium,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Premium => "premium",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }
}

/// Append-only log entry for one billable operation. Never mutated after
/// creation; used only for aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_type: ServiceType,

    /// Free-text operation description (e.g. "transcribe_recording").
    pub operation: String,

    /// Resource this usage refers to, if any (e.g. a recording id).
    pub resource_id: Option<Uuid>,

    pub tokens_used: u64,

    /// Engine or model name that served the operation.
    pub model_name: String,

    /// Audio duration consumed in seconds, for audio services.
    pub audio_duration: Option<f64>,

    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(user_id: Uuid, service_type: ServiceType, operation: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            service_type,
            operation: operation.into(),
            resource_id: None,
            tokens_used: 0,
            model_name: String::new(),
            audio_duration: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_resource(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_audio_duration(mut self, seconds: f64) -> Self {
        self.audio_duration = Some(seconds);
        self
    }
}

/// Per-user quota state: subscription tier plus allowance/consumption maps.
///
/// A negative allowance means unlimited. Consumed counters are reset to zero
/// on the billing period boundary by an external trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuotaState {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,

    /// Monthly allowance per service type. Negative = unlimited.
    pub monthly_allowance: HashMap<ServiceType, i64>,

    /// Amount consumed during the current period, per service type.
    pub consumed: HashMap<ServiceType, f64>,

    /// Preferred transcription provider kind, if the user set one.
    pub preferred_transcriber: Option<String>,

    /// Preferred speaker recognizer kind, if the user set one.
    pub preferred_recognizer: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserQuotaState {
    pub fn new(user_id: Uuid, tier: SubscriptionTier) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            tier,
            monthly_allowance: HashMap::new(),
            consumed: HashMap::new(),
            preferred_transcriber: None,
            preferred_recognizer: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remaining allowance for a service, or `None` when unlimited.
    pub fn remaining(&self, service: ServiceType) -> Option<f64> {
        let allowance = *self.monthly_allowance.get(&service).unwrap_or(&0);
        if allowance < 0 {
            return None;
        }
        let used = *self.consumed.get(&service).unwrap_or(&0.0);
        Some((allowance as f64 - used).max(0.0))
    }

    /// Add `amount` to the consumed counter for a service.
    pub fn record_consumption(&mut self, service: ServiceType, amount: f64) {
        *self.consumed.entry(service).or_insert(0.0) += amount;
        self.updated_at = Utc::now();
    }

    /// Zero all consumed counters. Invoked on the period boundary.
    pub fn reset_period(&mut self) {
        self.consumed.clear();
        self.updated_at = Utc::now();
    }
}
