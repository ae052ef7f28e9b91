use super::state::AppState;
use crate::error::StoreError;
use crate::model::{ProcessingStatus, Recording};
use crate::store::{export_by_speaker, export_srt, export_vtt};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitRecordingRequest {
    pub user_id: Uuid,
    pub title: String,

    /// Path of the already-uploaded audio file.
    pub storage_path: String,

    /// Audio container format (e.g. "wav", "m4a")
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitRecordingResponse {
    pub recording_id: Uuid,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RecordingStatusResponse {
    pub recording_id: Uuid,
    pub status: ProcessingStatus,
    pub status_message: String,
    pub duration: String,
    pub file_size: String,
    pub processed_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript_id: Uuid,
    pub recording_id: Uuid,
    pub full_text: String,
    pub language: String,
    pub engine: String,
    pub word_count: Option<u32>,
    pub segment_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn store_error_response(e: StoreError) -> axum::response::Response {
    let status = match e {
        StoreError::RecordingNotFound(_)
        | StoreError::TranscriptNotFound(_)
        | StoreError::SegmentNotFound(_)
        | StoreError::QuotaStateNotFound(_) => StatusCode::NOT_FOUND,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "audioscribe",
    }))
}

/// POST /recordings
/// Register an uploaded recording and admit it into the pipeline
pub async fn submit_recording(
    State(state): State<AppState>,
    Json(req): Json<SubmitRecordingRequest>,
) -> impl IntoResponse {
    let mut recording = Recording::new(req.user_id, req.title, req.storage_path);
    if let Some(format) = req.format {
        recording.format = format;
    }
    let recording_id = recording.id;

    info!("Submitting recording {} for processing", recording_id);

    if let Err(e) = state.store.put_recording(recording).await {
        return store_error_response(e);
    }

    if let Err(e) = state.orchestrator.submit(recording_id).await {
        error!("Failed to submit recording {}: {:#}", recording_id, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to submit recording: {}", e),
            }),
        )
            .into_response();
    }

    (
        StatusCode::ACCEPTED,
        Json(SubmitRecordingResponse {
            recording_id,
            status: "pending".to_string(),
            message: format!("Recording {} queued for processing", recording_id),
        }),
    )
        .into_response()
}

/// GET /recordings/:recording_id/status
pub async fn get_recording_status(
    State(state): State<AppState>,
    Path(recording_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.get_recording(recording_id).await {
        Ok(recording) => (
            StatusCode::OK,
            Json(RecordingStatusResponse {
                recording_id: recording.id,
                status: recording.status,
                status_message: recording.status_message.clone(),
                duration: recording.duration_display(),
                file_size: recording.file_size_display(),
                processed_at: recording.processed_at.map(|t| t.to_rfc3339()),
            }),
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

/// GET /recordings/:recording_id/transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(recording_id): Path<Uuid>,
) -> impl IntoResponse {
    let transcript = match state.store.transcript_for_recording(recording_id).await {
        Ok(t) => t,
        Err(e) => return store_error_response(e),
    };
    let segments = match state.store.list_segments(transcript.id).await {
        Ok(s) => s,
        Err(e) => return store_error_response(e),
    };

    (
        StatusCode::OK,
        Json(TranscriptResponse {
            transcript_id: transcript.id,
            recording_id: transcript.recording_id,
            full_text: transcript.full_text.clone(),
            language: transcript.language.clone(),
            engine: transcript.engine.clone(),
            word_count: transcript.word_count,
            segment_count: segments.len(),
        }),
    )
        .into_response()
}

/// GET /recordings/:recording_id/transcript.srt
pub async fn get_transcript_srt(
    State(state): State<AppState>,
    Path(recording_id): Path<Uuid>,
) -> impl IntoResponse {
    let transcript = match state.store.transcript_for_recording(recording_id).await {
        Ok(t) => t,
        Err(e) => return store_error_response(e),
    };
    match export_srt(state.store.as_ref(), transcript.id, true).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/x-subrip; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

/// GET /recordings/:recording_id/transcript.vtt
pub async fn get_transcript_vtt(
    State(state): State<AppState>,
    Path(recording_id): Path<Uuid>,
) -> impl IntoResponse {
    let transcript = match state.store.transcript_for_recording(recording_id).await {
        Ok(t) => t,
        Err(e) => return store_error_response(e),
    };
    match export_vtt(state.store.as_ref(), transcript.id, true).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/vtt; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

/// GET /recordings/:recording_id/speakers
/// Transcript text grouped by speaker with per-speaker talk time
pub async fn get_speakers(
    State(state): State<AppState>,
    Path(recording_id): Path<Uuid>,
) -> impl IntoResponse {
    let transcript = match state.store.transcript_for_recording(recording_id).await {
        Ok(t) => t,
        Err(e) => return store_error_response(e),
    };
    match export_by_speaker(state.store.as_ref(), transcript.id).await {
        Ok(grouped) => (StatusCode::OK, Json(grouped)).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// GET /users/:user_id/usage
/// Per-service usage totals for the current billing period
pub async fn get_usage_summary(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.quota.usage_summary(user_id).await {
        Ok(summary) => {
            // ServiceType keys serialize as strings for JSON object keys.
            let body: serde_json::Map<String, serde_json::Value> = summary
                .into_iter()
                .filter_map(|(service, totals)| {
                    serde_json::to_value(totals)
                        .ok()
                        .map(|v| (service.as_str().to_string(), v))
                })
                .collect();
            (StatusCode::OK, Json(serde_json::Value::Object(body))).into_response()
        }
        Err(e) => store_error_response(e),
    }
}
