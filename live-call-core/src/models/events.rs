use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::error::SessionError;
use super::state::SessionState;

/// Events produced towards the presentation boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    SpeakingChanged(bool),
    /// Raw RMS of one captured buffer. Smoothing is up to the consumer.
    Loudness(f32),
    ImageGenerated(ImageEvent),
    Error(SessionError),
}

/// A generated image reference and how long it should stay on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEvent {
    /// Usually a `data:<mime>;base64,...` URL.
    pub reference: String,
    pub generated_at: DateTime<Utc>,
    pub display_for: Duration,
    received: Instant,
}

impl ImageEvent {
    pub fn new(reference: String, display_for: Duration) -> Self {
        Self {
            reference,
            generated_at: Utc::now(),
            display_for,
            received: Instant::now(),
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.received + self.display_for
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_display_expires_immediately() {
        let event = ImageEvent::new("data:image/png;base64,AA==".into(), Duration::ZERO);
        assert!(event.is_expired());
    }

    #[test]
    fn fresh_image_is_visible() {
        let event = ImageEvent::new("data:image/png;base64,AA==".into(), Duration::from_secs(8));
        assert!(!event.is_expired());
        assert!(event.expires_at() > Instant::now());
    }
}
