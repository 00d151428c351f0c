//! cpal microphone capture provider.
//!
//! Opens the input device in its default format and forwards interleaved
//! f32 buffers at the device rate to the `AudioBufferCallback`. Rate
//! handling and downmixing happen in the session's encoder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::Mutex;

use live_call_core::{AudioBufferCallback, AudioDevice, CaptureProvider, SessionError};

use crate::device_enumerator::DeviceEnumerator;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Microphone capture through the default cpal host.
///
/// The cpal stream is not `Send` on every platform, so it is created, owned
/// and dropped by a dedicated capture thread.
pub struct CpalMicCapture {
    device_name: Option<String>,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalMicCapture {
    /// Create a capture for the system default microphone.
    pub fn default_device() -> Self {
        Self {
            device_name: None,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
        }
    }

    /// Create a capture for a specific microphone by device name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
            ..Self::default_device()
        }
    }
}

impl CaptureProvider for CpalMicCapture {
    fn is_available(&self) -> bool {
        let devices = DeviceEnumerator::new();
        match &self.device_name {
            Some(name) => devices.input_device(name).is_some(),
            None => devices.default_input_device().is_some(),
        }
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SessionError::ConfigurationFailed(
                "mic capture already running".into(),
            ));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let device_name = self.device_name.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                match open_input_stream(device_name.as_deref(), callback) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        while running.load(Ordering::SeqCst) {
                            thread::sleep(STOP_POLL_INTERVAL);
                        }
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SessionError::CaptureDenied(format!("failed to spawn mic thread: {}", e))
            })?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(SessionError::CaptureDenied("mic thread exited".into())));
        if let Err(e) = ready {
            self.running.store(false, Ordering::SeqCst);
            let _ = handle.join();
            return Err(e);
        }

        log::info!("Mic capture started on {}", self.device_info().name);
        *self.capture_handle.lock() = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
            log::info!("Mic capture stopped");
        }
        Ok(())
    }

    fn device_info(&self) -> AudioDevice {
        AudioDevice {
            id: self
                .device_name
                .clone()
                .unwrap_or_else(|| "default-mic".into()),
            name: self
                .device_name
                .clone()
                .unwrap_or_else(|| "Default Microphone".into()),
            is_default: self.device_name.is_none(),
        }
    }
}

impl Drop for CpalMicCapture {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn open_input_stream(
    device_name: Option<&str>,
    callback: AudioBufferCallback,
) -> Result<cpal::Stream, SessionError> {
    let devices = DeviceEnumerator::new();
    let device = match device_name {
        Some(name) => devices.input_device(name),
        None => devices.default_input_device(),
    }
    .ok_or(SessionError::DeviceNotAvailable)?;

    let config = device
        .default_input_config()
        .map_err(|e| SessionError::CaptureDenied(format!("no usable input config: {}", e)))?;
    let sample_rate = config.sample_rate().0 as f64;
    let channels = config.channels();
    let stream_config: StreamConfig = config.clone().into();

    let stream = match config.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                callback(data, sample_rate, channels);
            },
            stream_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                callback(&samples, sample_rate, channels);
            },
            stream_error,
            None,
        ),
        other => {
            return Err(SessionError::CaptureDenied(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| SessionError::CaptureDenied(format!("failed to open input stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| SessionError::CaptureDenied(format!("failed to start input stream: {}", e)))?;
    Ok(stream)
}

fn stream_error(err: cpal::StreamError) {
    log::warn!("Mic stream error: {}", err);
}
