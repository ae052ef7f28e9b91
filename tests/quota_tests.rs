// Integration tests for the quota manager
//
// Checks run against an in-memory store with seeded usage history.

use audioscribe::model::{ServiceType, SubscriptionTier, UsageRecord};
use audioscribe::quota::{month_start, ContentKind, QuotaContext, QuotaManager};
use audioscribe::store::{MemoryStore, Store};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

fn setup() -> (Arc<MemoryStore>, QuotaManager, Uuid) {
    let store = Arc::new(MemoryStore::new());
    let manager = QuotaManager::new(store.clone());
    let user = Uuid::new_v4();
    (store, manager, user)
}

async fn seed_user(store: &MemoryStore, user: Uuid, tier: SubscriptionTier) {
    store
        .put_quota_state(QuotaManager::initial_state(user, tier))
        .await
        .unwrap();
}

async fn append_transcriptions(store: &MemoryStore, user: Uuid, count: usize) {
    for _ in 0..count {
        store
            .append_usage(
                UsageRecord::new(user, ServiceType::Transcription, "transcribe_recording")
                    .with_model("cloud")
                    .with_audio_duration(60.0),
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_free_tier_allows_under_monthly_limit() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Free).await;
    append_transcriptions(&store, user, 4).await;

    let decision = manager
        .check(user, ServiceType::Transcription, &QuotaContext::default())
        .await
        .unwrap();
    assert!(decision.allowed);
    assert!(decision.reason.is_none());
}

#[tokio::test]
async fn test_free_tier_denies_at_monthly_limit() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Free).await;
    append_transcriptions(&store, user, 5).await;

    let decision = manager
        .check(user, ServiceType::Transcription, &QuotaContext::default())
        .await
        .unwrap();
    assert!(!decision.allowed);
    let reason = decision.reason.unwrap();
    assert!(reason.contains("limit"), "Reason explains the denial: {}", reason);
}

#[tokio::test]
async fn test_last_months_usage_does_not_count() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Free).await;

    for _ in 0..5 {
        let mut record =
            UsageRecord::new(user, ServiceType::Transcription, "transcribe_recording");
        record.created_at = month_start(Utc::now()) - Duration::days(3);
        store.append_usage(record).await.unwrap();
    }

    let decision = manager
        .check(user, ServiceType::Transcription, &QuotaContext::default())
        .await
        .unwrap();
    assert!(decision.allowed, "Usage before the period start is ignored");
}

#[tokio::test]
async fn test_premium_tier_is_unlimited() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Premium).await;
    append_transcriptions(&store, user, 500).await;

    let decision = manager
        .check(user, ServiceType::Transcription, &QuotaContext::default())
        .await
        .unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_file_size_ceiling_checked_before_count() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Free).await;

    let ctx = QuotaContext {
        file_size: Some(200 * 1024 * 1024),
        ..Default::default()
    };
    let decision = manager
        .check(user, ServiceType::Transcription, &ctx)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert!(decision.reason.unwrap().contains("file size"));
}

#[tokio::test]
async fn test_duration_ceiling() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Free).await;

    let ctx = QuotaContext {
        duration_secs: Some(2.0 * 60.0 * 60.0),
        ..Default::default()
    };
    let decision = manager
        .check(user, ServiceType::Transcription, &ctx)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert!(decision.reason.unwrap().contains("duration"));

    // Speaker identification shares the ceiling.
    let decision = manager
        .check(user, ServiceType::SpeakerIdentification, &ctx)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert!(decision.reason.unwrap().contains("duration"));

    // The same duration is fine on basic.
    let basic_user = Uuid::new_v4();
    seed_user(&store, basic_user, SubscriptionTier::Basic).await;
    let decision = manager
        .check(basic_user, ServiceType::Transcription, &ctx)
        .await
        .unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_content_kind_gating_per_tier() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Free).await;

    let notes = QuotaContext {
        content_kind: Some(ContentKind::Notes),
        ..Default::default()
    };
    let quiz = QuotaContext {
        content_kind: Some(ContentKind::Quiz),
        ..Default::default()
    };

    assert!(manager
        .check(user, ServiceType::ContentGeneration, &notes)
        .await
        .unwrap()
        .allowed);
    assert!(!manager
        .check(user, ServiceType::ContentGeneration, &quiz)
        .await
        .unwrap()
        .allowed);
}

#[tokio::test]
async fn test_log_usage_weights_transcription_by_minutes() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Free).await;

    manager
        .log_usage(
            UsageRecord::new(user, ServiceType::Transcription, "transcribe_recording")
                .with_model("cloud")
                .with_audio_duration(120.0),
        )
        .await
        .unwrap();
    manager
        .log_usage(UsageRecord::new(
            user,
            ServiceType::Search,
            "search_transcripts",
        ))
        .await
        .unwrap();

    let state = store.get_quota_state(user).await.unwrap();
    assert!((state.consumed[&ServiceType::Transcription] - 2.0).abs() < 1e-9);
    assert!((state.consumed[&ServiceType::Search] - 1.0).abs() < 1e-9);

    let count = store
        .count_usage_since(user, ServiceType::Transcription, month_start(Utc::now()))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_audio_seconds_filter_by_engine() {
    let (store, _manager, user) = setup();

    store
        .append_usage(
            UsageRecord::new(user, ServiceType::Transcription, "transcribe_recording")
                .with_model("cloud")
                .with_audio_duration(300.0),
        )
        .await
        .unwrap();
    store
        .append_usage(
            UsageRecord::new(user, ServiceType::Transcription, "transcribe_recording")
                .with_model("offline")
                .with_audio_duration(900.0),
        )
        .await
        .unwrap();

    let since = month_start(Utc::now());
    let cloud = store
        .audio_seconds_since(user, ServiceType::Transcription, Some("cloud"), since)
        .await
        .unwrap();
    let all = store
        .audio_seconds_since(user, ServiceType::Transcription, None, since)
        .await
        .unwrap();
    assert!((cloud - 300.0).abs() < 1e-9);
    assert!((all - 1200.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_usage_summary_totals() {
    let (store, manager, user) = setup();
    seed_user(&store, user, SubscriptionTier::Basic).await;
    append_transcriptions(&store, user, 3).await;

    let summary = manager.usage_summary(user).await.unwrap();
    let totals = &summary[&ServiceType::Transcription];
    assert_eq!(totals.calls, 3);
    assert!((totals.audio_seconds - 180.0).abs() < 1e-9);
}

#[test]
fn test_period_reset_zeroes_consumed_counters() {
    let mut state = QuotaManager::initial_state(Uuid::new_v4(), SubscriptionTier::Free);
    state.record_consumption(ServiceType::Transcription, 3.5);
    state.record_consumption(ServiceType::Search, 2.0);
    assert_eq!(state.remaining(ServiceType::Transcription), Some(1.5));

    state.reset_period();
    assert_eq!(state.remaining(ServiceType::Transcription), Some(5.0));
    assert_eq!(state.remaining(ServiceType::Search), Some(10.0));
    assert!(state.consumed.is_empty());
}
