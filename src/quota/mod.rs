//! Tiered usage quotas.
//!
//! Every billable operation passes a quota check before running and logs a
//! usage record after succeeding. A denial is a value, not an error:
//! callers branch on [`QuotaDecision`] and no usage record is written for
//! denied work.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{ServiceType, SubscriptionTier, UsageRecord, UserQuotaState};
use crate::store::{Store, UsageTotals};

/// Content-generation sub-types, gated per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Notes,
    Quiz,
    Flashcards,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Notes => "notes",
            ContentKind::Quiz => "quiz",
            ContentKind::Flashcards => "flashcards",
        }
    }
}

/// Static per-tier plan limits. Negative counts mean unlimited, zero means
/// the service is not offered on the plan.
#[derive(Debug, Clone)]
pub struct TierPlan {
    pub transcriptions_per_month: i64,
    pub transcription_max_duration_secs: f64,
    pub transcription_max_file_bytes: u64,
    pub speaker_identifications_per_month: i64,
    pub summaries_per_month: i64,
    pub content_generations_per_month: i64,
    pub allowed_content: &'static [ContentKind],
    pub searches_per_month: i64,
}

const FREE_PLAN: TierPlan = TierPlan {
    transcriptions_per_month: 5,
    transcription_max_duration_secs: 60.0 * 60.0,
    transcription_max_file_bytes: 100 * 1024 * 1024,
    speaker_identifications_per_month: 5,
    summaries_per_month: 5,
    content_generations_per_month: 2,
    allowed_content: &[ContentKind::Notes],
    searches_per_month: 10,
};

const BASIC_PLAN: TierPlan = TierPlan {
    transcriptions_per_month: 20,
    transcription_max_duration_secs: 3.0 * 60.0 * 60.0,
    transcription_max_file_bytes: 500 * 1024 * 1024,
    speaker_identifications_per_month: 20,
    summaries_per_month: 20,
    content_generations_per_month: 10,
    allowed_content: &[ContentKind::Notes, ContentKind::Quiz],
    searches_per_month: 100,
};

const PREMIUM_PLAN: TierPlan = TierPlan {
    transcriptions_per_month: -1,
    transcription_max_duration_secs: 8.0 * 60.0 * 60.0,
    transcription_max_file_bytes: 2 * 1024 * 1024 * 1024,
    speaker_identifications_per_month: -1,
    summaries_per_month: -1,
    content_generations_per_month: -1,
    allowed_content: &[ContentKind::Notes, ContentKind::Quiz, ContentKind::Flashcards],
    searches_per_month: -1,
};

impl TierPlan {
    pub fn for_tier(tier: SubscriptionTier) -> &'static TierPlan {
        match tier {
            SubscriptionTier::Free => &FREE_PLAN,
            SubscriptionTier::Basic => &BASIC_PLAN,
            SubscriptionTier::Premium => &PREMIUM_PLAN,
        }
    }

    pub fn monthly_limit(&self, service: ServiceType) -> i64 {
        match service {
            ServiceType::Transcription => self.transcriptions_per_month,
            ServiceType::SpeakerIdentification => self.speaker_identifications_per_month,
            ServiceType::Summary => self.summaries_per_month,
            ServiceType::ContentGeneration => self.content_generations_per_month,
            ServiceType::Search => self.searches_per_month,
        }
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl QuotaDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Request attributes a check may need beyond the service type.
#[derive(Debug, Clone, Default)]
pub struct QuotaContext {
    pub content_kind: Option<ContentKind>,
    pub file_size: Option<u64>,
    pub duration_secs: Option<f64>,
}

/// Start of the current billing period (calendar month, UTC).
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    // The first of the month at midnight always exists.
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

pub struct QuotaManager {
    store: Arc<dyn Store>,
}

impl QuotaManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Build a fresh quota state seeded with the plan's monthly limits.
    pub fn initial_state(user_id: Uuid, tier: SubscriptionTier) -> UserQuotaState {
        let plan = TierPlan::for_tier(tier);
        let mut state = UserQuotaState::new(user_id, tier);
        for service in [
            ServiceType::Transcription,
            ServiceType::SpeakerIdentification,
            ServiceType::Summary,
            ServiceType::ContentGeneration,
            ServiceType::Search,
        ] {
            state
                .monthly_allowance
                .insert(service, plan.monthly_limit(service));
        }
        state
    }

    /// Decide whether the user may run one more operation of `service`.
    ///
    /// Checks run in a fixed order: plan availability, content sub-type,
    /// file-size ceiling, duration ceiling, then the monthly count against
    /// the plan limit. The first failing check produces the denial.
    pub async fn check(
        &self,
        user_id: Uuid,
        service: ServiceType,
        ctx: &QuotaContext,
    ) -> Result<QuotaDecision, StoreError> {
        let state = self.store.get_quota_state(user_id).await?;
        let plan = TierPlan::for_tier(state.tier);
        let limit = plan.monthly_limit(service);

        if limit == 0 {
            return Ok(QuotaDecision::deny(format!(
                "{} is not available on the {} plan",
                service.as_str(),
                state.tier.as_str()
            )));
        }

        if service == ServiceType::ContentGeneration {
            if let Some(kind) = ctx.content_kind {
                if !plan.allowed_content.contains(&kind) {
                    return Ok(QuotaDecision::deny(format!(
                        "{} generation is not available on the {} plan",
                        kind.as_str(),
                        state.tier.as_str()
                    )));
                }
            }
        }

        if service == ServiceType::Transcription {
            if let Some(size) = ctx.file_size {
                if size > plan.transcription_max_file_bytes {
                    return Ok(QuotaDecision::deny(format!(
                        "file size {} bytes exceeds the {} byte limit for the {} plan",
                        size,
                        plan.transcription_max_file_bytes,
                        state.tier.as_str()
                    )));
                }
            }
        }

        if matches!(
            service,
            ServiceType::Transcription | ServiceType::SpeakerIdentification
        ) {
            if let Some(duration) = ctx.duration_secs {
                if duration > plan.transcription_max_duration_secs {
                    return Ok(QuotaDecision::deny(format!(
                        "duration {:.0}s exceeds the {:.0}s limit for the {} plan",
                        duration,
                        plan.transcription_max_duration_secs,
                        state.tier.as_str()
                    )));
                }
            }
        }

        if limit > 0 {
            let used = self
                .store
                .count_usage_since(user_id, service, month_start(Utc::now()))
                .await?;
            if used >= limit as u64 {
                info!(
                    "Quota denial for user {}: {} used {}/{} this period",
                    user_id,
                    service.as_str(),
                    used,
                    limit
                );
                return Ok(QuotaDecision::deny(format!(
                    "monthly {} limit of {} reached",
                    service.as_str(),
                    limit
                )));
            }
        }

        Ok(QuotaDecision::allow())
    }

    /// Record completed work. Appends to the usage log and bumps the user's
    /// consumed counter; transcription consumption is weighted by audio
    /// minutes, everything else counts one unit per call.
    pub async fn log_usage(&self, record: UsageRecord) -> Result<(), StoreError> {
        let amount = match (record.service_type, record.audio_duration) {
            (ServiceType::Transcription, Some(seconds)) => seconds / 60.0,
            _ => 1.0,
        };

        match self.store.get_quota_state(record.user_id).await {
            Ok(mut state) => {
                state.record_consumption(record.service_type, amount);
                self.store.put_quota_state(state).await?;
            }
            Err(StoreError::QuotaStateNotFound(user)) => {
                warn!("No quota state for user {}, logging usage only", user);
            }
            Err(e) => return Err(e),
        }

        self.store.append_usage(record).await
    }

    /// Per-service usage totals for the current billing period.
    pub async fn usage_summary(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<ServiceType, UsageTotals>, StoreError> {
        self.store
            .usage_summary(user_id, month_start(Utc::now()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_start_truncates_to_first_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 15, 42, 7).unwrap();
        let start = month_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn premium_plan_is_unmetered() {
        let plan = TierPlan::for_tier(SubscriptionTier::Premium);
        assert!(plan.monthly_limit(ServiceType::Transcription) < 0);
        assert!(plan.allowed_content.contains(&ContentKind::Flashcards));
    }

    #[test]
    fn free_plan_gates_content_kinds() {
        let plan = TierPlan::for_tier(SubscriptionTier::Free);
        assert!(plan.allowed_content.contains(&ContentKind::Notes));
        assert!(!plan.allowed_content.contains(&ContentKind::Quiz));
    }
}
