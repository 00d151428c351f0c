use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for debugging a live session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionDiagnostics {
    pub session_id: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    pub capture_callback_count: u64,
    pub capture_samples_total: u64,
    pub capture_format: String,
    pub audio_chunks_sent: u64,
    /// Chunks produced while not active or while the send slot was busy.
    pub audio_chunks_dropped: u64,
    pub video_frames_sent: u64,
    pub video_frames_dropped: u64,
    /// Ticks that produced no frame (no source frame, zero size, encode failure).
    pub video_ticks_skipped: u64,
    pub inbound_messages: u64,
    pub playback_chunks_scheduled: u64,
    pub tool_calls_started: u64,
    pub tool_results_sent: u64,
}
