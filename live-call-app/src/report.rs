//! Turns session events into log lines and saved images.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use live_call_core::processing::pcm::VolumeSmoother;
use live_call_core::{ImageEvent, SessionDiagnostics, SessionError, SessionEvent, SessionState};

/// Logs session events and optionally writes generated images to disk.
pub struct EventReporter {
    image_dir: Option<PathBuf>,
    images_saved: usize,
    last_error: Option<SessionError>,
    mic_level: VolumeSmoother,
}

impl EventReporter {
    pub fn new(image_dir: Option<PathBuf>) -> Self {
        Self {
            image_dir,
            images_saved: 0,
            last_error: None,
            mic_level: VolumeSmoother::default(),
        }
    }

    /// Error that ended the session, if any.
    pub fn take_error(&mut self) -> Option<SessionError> {
        self.last_error.take()
    }

    pub fn report(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::StateChanged(state) => {
                if !state.is_active() {
                    self.mic_level.reset();
                }
                log::info!("Session {}", state_name(*state));
            }
            SessionEvent::SpeakingChanged(true) => log::info!("Agent speaking"),
            SessionEvent::SpeakingChanged(false) => log::info!("Agent quiet"),
            SessionEvent::Loudness(level) => {
                let smoothed = self.mic_level.push(*level);
                log::trace!("Mic level {:.2}", smoothed.min(1.0));
            }
            SessionEvent::ImageGenerated(image) => self.on_image(image),
            SessionEvent::Error(error) => {
                log::error!("Session failed: {}", error);
                self.last_error = Some(error.clone());
            }
        }
    }

    fn on_image(&mut self, image: &ImageEvent) {
        let Some(dir) = &self.image_dir else {
            log::info!(
                "Image generated ({} chars, shown for {:?})",
                image.reference.len(),
                image.display_for
            );
            return;
        };

        let stem = format!("roast-{}", self.images_saved + 1);
        match save_image(dir, &stem, &image.reference) {
            Ok(path) => {
                self.images_saved += 1;
                log::info!("Image saved to {}", path.display());
            }
            Err(e) => log::warn!("Could not save image: {}", e),
        }
    }
}

pub fn state_name(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "idle",
        SessionState::Connecting => "connecting",
        SessionState::Active => "active",
        SessionState::Closing => "closing",
        SessionState::Closed => "closed",
    }
}

/// Split a `data:<mime>;base64,<data>` URL into mime type and bytes.
pub fn decode_data_url(reference: &str) -> Option<(String, Vec<u8>)> {
    let rest = reference.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(data.as_bytes()).ok()?;
    Some((mime_type.to_string(), bytes))
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

fn save_image(dir: &Path, stem: &str, reference: &str) -> Result<PathBuf, String> {
    let (mime_type, bytes) =
        decode_data_url(reference).ok_or_else(|| "reference is not a base64 data URL".to_string())?;
    fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    let path = dir.join(format!("{}.{}", stem, extension_for(&mime_type)));
    fs::write(&path, bytes).map_err(|e| e.to_string())?;
    Ok(path)
}

/// One-line summary printed when the call ends.
pub fn summarize(diagnostics: &SessionDiagnostics) -> String {
    format!(
        "audio sent {} (dropped {}), video sent {} (dropped {}), inbound {}, played {}, tools {}/{}",
        diagnostics.audio_chunks_sent,
        diagnostics.audio_chunks_dropped,
        diagnostics.video_frames_sent,
        diagnostics.video_frames_dropped,
        diagnostics.inbound_messages,
        diagnostics.playback_chunks_scheduled,
        diagnostics.tool_results_sent,
        diagnostics.tool_calls_started,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn decodes_base64_data_url() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,AAEC").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_plain_urls() {
        assert_eq!(decode_data_url("https://example.com/a.png"), None);
        assert_eq!(decode_data_url("data:image/png,raw"), None);
    }

    #[test]
    fn saves_images_with_matching_extension() {
        let dir = std::env::temp_dir().join(format!("live-call-report-{}", std::process::id()));
        let mut reporter = EventReporter::new(Some(dir.clone()));

        let image = ImageEvent::new("data:image/jpeg;base64,/9j/".into(), Duration::from_secs(8));
        reporter.report(&SessionEvent::ImageGenerated(image));

        let saved = dir.join("roast-1.jpg");
        assert_eq!(fs::read(&saved).unwrap(), vec![0xff, 0xd8, 0xff]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn remembers_the_terminal_error() {
        let mut reporter = EventReporter::new(None);
        reporter.report(&SessionEvent::Error(SessionError::Disconnected));

        assert_eq!(reporter.take_error(), Some(SessionError::Disconnected));
        assert_eq!(reporter.take_error(), None);
    }
}
