//! Local text-to-speech through the espeak-ng command line tool.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::process::Command;

use live_call_core::processing::pcm::downmix_to_mono;
use live_call_core::{PlaybackBuffer, SessionError, SpeechSynthesizer};

const CANDIDATES: [&str; 3] = [
    "/opt/homebrew/bin/espeak-ng",
    "/usr/local/bin/espeak-ng",
    "/usr/bin/espeak-ng",
];

static NEXT_FILE: AtomicU64 = AtomicU64::new(0);

/// Offline `SpeechSynthesizer` used when the Gemini voice is unavailable.
#[derive(Debug, Clone)]
pub struct EspeakSpeech {
    bin_path: PathBuf,
    voice: String,
}

impl EspeakSpeech {
    pub fn new(bin_path: impl Into<PathBuf>) -> Self {
        Self {
            bin_path: bin_path.into(),
            voice: "en-us".into(),
        }
    }

    /// Look for espeak-ng in the usual install locations.
    pub fn auto() -> Option<Self> {
        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Self::new)
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSpeech {
    async fn synthesize(&self, text: &str) -> Result<PlaybackBuffer, SessionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SessionError::PlaybackFailed("nothing to say".into()));
        }

        let wav_path = std::env::temp_dir().join(format!(
            "live-call-espeak-{}-{}.wav",
            std::process::id(),
            NEXT_FILE.fetch_add(1, Ordering::Relaxed)
        ));
        let output = Command::new(&self.bin_path)
            .arg("-q")
            .arg("-v")
            .arg(&self.voice)
            .arg("-w")
            .arg(&wav_path)
            .arg(trimmed)
            .output()
            .await
            .map_err(|e| {
                SessionError::PlaybackFailed(format!(
                    "failed to run {}: {}",
                    self.bin_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&wav_path);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::PlaybackFailed(format!(
                "espeak-ng failed: {}",
                stderr.trim()
            )));
        }

        let buffer = read_wav(&wav_path);
        let _ = std::fs::remove_file(&wav_path);
        buffer
    }
}

/// Read a 16-bit PCM WAV file as mono f32.
pub fn read_wav(path: &Path) -> Result<PlaybackBuffer, SessionError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| SessionError::EncodingFailed(format!("invalid speech WAV: {}", e)))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(SessionError::EncodingFailed(format!(
            "unsupported speech WAV format: {:?} {} bit",
            spec.sample_format, spec.bits_per_sample
        )));
    }

    let interleaved = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect::<Result<Vec<f32>, _>>()
        .map_err(|e| SessionError::EncodingFailed(format!("truncated speech WAV: {}", e)))?;

    Ok(PlaybackBuffer {
        samples: downmix_to_mono(&interleaved, spec.channels.max(1) as usize),
        sample_rate: spec.sample_rate,
    })
}
