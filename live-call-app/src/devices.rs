//! Local audio devices, available when built with the `cpal` feature.

use std::sync::Arc;

use live_call_core::{AudioOutput, SessionError, SessionMedia, VideoSource};

#[cfg(feature = "cpal")]
pub fn open_media(
    mic: Option<&str>,
    video: Option<Arc<dyn VideoSource>>,
) -> Result<SessionMedia, SessionError> {
    use live_call_cpal::{CpalMicCapture, CpalSpeaker};

    let capture = match mic {
        Some(name) => CpalMicCapture::with_device(name),
        None => CpalMicCapture::default_device(),
    };
    Ok(SessionMedia {
        capture: Box::new(capture),
        output: CpalSpeaker::open_default()?,
        video,
    })
}

/// A speaker of its own, separate from the session's playback.
#[cfg(feature = "cpal")]
pub fn open_output() -> Result<Arc<dyn AudioOutput>, SessionError> {
    let speaker: Arc<dyn AudioOutput> = live_call_cpal::CpalSpeaker::open_default()?;
    Ok(speaker)
}

#[cfg(feature = "cpal")]
pub fn list_devices() -> Result<(), SessionError> {
    let devices = live_call_cpal::DeviceEnumerator::new();
    println!("Microphones:");
    for device in devices.list_capture_devices()? {
        println!("  {}{}", device.name, if device.is_default { " (default)" } else { "" });
    }
    println!("Speakers:");
    for device in devices.list_render_devices()? {
        println!("  {}{}", device.name, if device.is_default { " (default)" } else { "" });
    }
    Ok(())
}

#[cfg(not(feature = "cpal"))]
pub fn open_media(
    _mic: Option<&str>,
    _video: Option<Arc<dyn VideoSource>>,
) -> Result<SessionMedia, SessionError> {
    log::error!("Built without audio devices; rebuild with --features cpal");
    Err(SessionError::DeviceNotAvailable)
}

#[cfg(not(feature = "cpal"))]
pub fn open_output() -> Result<Arc<dyn AudioOutput>, SessionError> {
    log::error!("Built without audio devices; rebuild with --features cpal");
    Err(SessionError::DeviceNotAvailable)
}

#[cfg(not(feature = "cpal"))]
pub fn list_devices() -> Result<(), SessionError> {
    log::error!("Built without audio devices; rebuild with --features cpal");
    Err(SessionError::DeviceNotAvailable)
}
