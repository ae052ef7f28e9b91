//! Engine selection.
//!
//! Pure decision functions: given a user's tier, their stored preference,
//! and the recording's shape, pick which transcription or recognition
//! backend handles the job. Resolution order is user preference, then tier
//! policy, then configured default, then a hardcoded fallback.

use std::str::FromStr;
use tracing::debug;

use crate::config::SelectorConfig;
use crate::model::SubscriptionTier;
use crate::provider::ProviderKind;
use crate::speaker::RecognizerKind;

/// Everything the transcriber decision depends on.
#[derive(Debug, Clone)]
pub struct SelectionContext<'a> {
    pub tier: SubscriptionTier,

    /// User's stored engine preference, if any.
    pub preference: Option<&'a str>,

    /// Recording length in seconds.
    pub audio_seconds: f64,

    /// Deployment flag forcing local processing regardless of tier.
    pub offline_only: bool,

    /// Premium-engine audio seconds the user has already consumed this
    /// period. Only consulted for the free tier.
    pub premium_seconds_used: f64,
}

pub fn select_transcriber(ctx: &SelectionContext<'_>, config: &SelectorConfig) -> ProviderKind {
    if ctx.offline_only {
        return ProviderKind::Offline;
    }

    // An explicit user preference wins, silently ignoring unknown values.
    if let Some(pref) = ctx.preference {
        if let Ok(kind) = ProviderKind::from_str(pref) {
            debug!("Transcriber chosen by user preference: {}", kind.as_str());
            return kind;
        }
    }

    match ctx.tier {
        SubscriptionTier::Free => {
            // Long recordings always go offline on the free tier, and the
            // cloud engine is rationed by a per-period seconds budget.
            if ctx.audio_seconds > config.long_audio_cutoff_secs {
                debug!(
                    "Free-tier audio of {:.0}s exceeds {:.0}s cutoff, routing offline",
                    ctx.audio_seconds, config.long_audio_cutoff_secs
                );
                return ProviderKind::Offline;
            }
            if ctx.premium_seconds_used + ctx.audio_seconds <= config.free_premium_budget_secs {
                ProviderKind::Cloud
            } else {
                debug!(
                    "Free-tier premium budget exhausted ({:.0}s used), routing offline",
                    ctx.premium_seconds_used
                );
                ProviderKind::Offline
            }
        }
        SubscriptionTier::Basic | SubscriptionTier::Premium => fallback_transcriber(config),
    }
}

fn fallback_transcriber(config: &SelectorConfig) -> ProviderKind {
    config
        .default_transcriber
        .as_deref()
        .and_then(|s| ProviderKind::from_str(s).ok())
        .unwrap_or(ProviderKind::Cloud)
}

pub fn select_recognizer(
    preference: Option<&str>,
    config: &SelectorConfig,
) -> RecognizerKind {
    if let Some(pref) = preference {
        if let Ok(kind) = RecognizerKind::from_str(pref) {
            return kind;
        }
    }
    config
        .default_recognizer
        .as_deref()
        .and_then(|s| RecognizerKind::from_str(s).ok())
        .unwrap_or(RecognizerKind::Clustering)
}
