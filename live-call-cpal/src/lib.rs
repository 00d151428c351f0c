//! # live-call-cpal
//!
//! Audio device backends for `live-call-core`.
//!
//! Provides:
//! - `PlaybackTimeline`: sample-accurate scheduling clock behind every speaker
//! - `CpalMicCapture`: microphone capture through the default cpal host
//! - `CpalSpeaker`: speaker output rendering a `PlaybackTimeline`
//! - `DeviceEnumerator`: input and output device listing
//!
//! The device types need the `cpal` feature (and the platform audio
//! development libraries, e.g. ALSA headers on Linux). The timeline is
//! always built so it can be driven by hand.
//!
//! ## Usage
//! ```ignore
//! use live_call_cpal::{CpalMicCapture, CpalSpeaker};
//! use live_call_core::{LiveSession, SessionMedia};
//!
//! let media = SessionMedia {
//!     capture: Box::new(CpalMicCapture::default_device()),
//!     output: CpalSpeaker::open_default()?,
//!     video: None,
//! };
//! session.connect(media).await?;
//! ```

pub mod timeline;

#[cfg(feature = "cpal")]
pub mod device_enumerator;
#[cfg(feature = "cpal")]
pub mod mic;
#[cfg(feature = "cpal")]
pub mod speaker;

pub use timeline::PlaybackTimeline;

#[cfg(feature = "cpal")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(feature = "cpal")]
pub use mic::CpalMicCapture;
#[cfg(feature = "cpal")]
pub use speaker::CpalSpeaker;
