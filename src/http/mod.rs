//! HTTP API for submitting recordings and reading results
//!
//! - POST /recordings - Register an uploaded file and start processing
//! - GET /recordings/:id/status - Pipeline status for a recording
//! - GET /recordings/:id/transcript - Full transcript text
//! - GET /recordings/:id/transcript.srt - SRT subtitle export
//! - GET /recordings/:id/transcript.vtt - WebVTT subtitle export
//! - GET /recordings/:id/speakers - Text grouped by speaker
//! - GET /users/:id/usage - Current-period usage totals
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
