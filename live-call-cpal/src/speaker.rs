//! cpal speaker output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::Mutex;

use live_call_core::{AudioOutput, PlaybackBuffer, PlaybackEndedCallback, SessionError};

use crate::device_enumerator::DeviceEnumerator;
use crate::timeline::PlaybackTimeline;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Default output device driven by a [`PlaybackTimeline`].
///
/// The output stream lives on its own thread and pulls frames from the
/// timeline; scheduling and the clock go straight to the timeline.
pub struct CpalSpeaker {
    timeline: Arc<PlaybackTimeline>,
    running: Arc<AtomicBool>,
    render_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalSpeaker {
    /// Open the system default output device and start rendering silence.
    pub fn open_default() -> Result<Arc<Self>, SessionError> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let handle = thread::Builder::new()
            .name("cpal-speaker".into())
            .spawn(move || {
                match open_output_stream() {
                    Ok((stream, timeline)) => {
                        let _ = ready_tx.send(Ok(timeline));
                        while thread_running.load(Ordering::SeqCst) {
                            thread::sleep(STOP_POLL_INTERVAL);
                        }
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
                thread_running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| SessionError::PlaybackFailed(format!("failed to spawn speaker thread: {}", e)))?;

        let timeline = match ready_rx.recv() {
            Ok(Ok(timeline)) => timeline,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(SessionError::PlaybackFailed("speaker thread exited".into()));
            }
        };

        log::info!("Speaker opened at {} Hz", timeline.sample_rate());
        Ok(Arc::new(Self {
            timeline,
            running,
            render_handle: Mutex::new(Some(handle)),
        }))
    }

    pub fn timeline(&self) -> &Arc<PlaybackTimeline> {
        &self.timeline
    }
}

impl AudioOutput for CpalSpeaker {
    fn current_time(&self) -> f64 {
        self.timeline.current_time()
    }

    fn schedule(
        &self,
        buffer: PlaybackBuffer,
        start_time: f64,
        on_ended: PlaybackEndedCallback,
    ) -> Result<(), SessionError> {
        self.timeline.schedule(buffer, start_time, on_ended)
    }

    fn close(&self) -> Result<(), SessionError> {
        self.timeline.close()?;
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.render_handle.lock().take() {
            let _ = handle.join();
            log::info!("Speaker closed");
        }
        Ok(())
    }
}

impl Drop for CpalSpeaker {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn open_output_stream() -> Result<(cpal::Stream, Arc<PlaybackTimeline>), SessionError> {
    let device = DeviceEnumerator::new()
        .default_output_device()
        .ok_or(SessionError::DeviceNotAvailable)?;

    let config = device
        .default_output_config()
        .map_err(|e| SessionError::PlaybackFailed(format!("no usable output config: {}", e)))?;
    let channels = config.channels();
    let timeline = Arc::new(PlaybackTimeline::new(config.sample_rate().0));
    let stream_config: StreamConfig = config.clone().into();

    let render_timeline = Arc::clone(&timeline);
    let stream = match config.sample_format() {
        SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                render_timeline.render(data, channels);
            },
            stream_error,
            None,
        ),
        SampleFormat::I16 => {
            let mut scratch: Vec<f32> = Vec::new();
            device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    render_timeline.render(&mut scratch, channels);
                    for (out, sample) in data.iter_mut().zip(&scratch) {
                        *out = (sample * 32767.0) as i16;
                    }
                },
                stream_error,
                None,
            )
        }
        other => {
            return Err(SessionError::PlaybackFailed(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| SessionError::PlaybackFailed(format!("failed to open output stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| SessionError::PlaybackFailed(format!("failed to start output stream: {}", e)))?;
    Ok((stream, timeline))
}

fn stream_error(err: cpal::StreamError) {
    log::warn!("Speaker stream error: {}", err);
}
