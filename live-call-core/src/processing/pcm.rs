/// 16-bit PCM conversion, level metering and simple resampling.
///
/// All functions are pure and operate on mono `&[f32]` buffers in the
/// `[-1.0, 1.0]` range unless noted otherwise.

/// Convert f32 samples to 16-bit signed little-endian PCM.
///
/// Out-of-range values are clamped first. Negative samples scale by 32768 and
/// non-negative ones by 32767, so -1.0 maps to `i16::MIN` and 1.0 to `i16::MAX`.
/// Output length = `samples.len() * 2` bytes.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        data.extend_from_slice(&float_to_i16(sample).to_le_bytes());
    }
    data
}

/// Convert 16-bit signed little-endian PCM back to f32 (`value / 32768.0`).
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

fn float_to_i16(sample: f32) -> i16 {
    // NaN would otherwise slip through clamp
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Root-mean-square level of the samples (0.0 for an empty buffer).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Linear interpolation of mono audio onto exactly `output_count` samples.
///
/// Returns the input unchanged if the length already matches.
pub fn resample_to_length(samples: &[f32], output_count: usize) -> Vec<f32> {
    if output_count == samples.len() {
        return samples.to_vec();
    }
    if output_count == 0 || samples.is_empty() {
        return vec![0.0; output_count];
    }

    let ratio = output_count as f64 / samples.len() as f64;
    let mut output = vec![0.0f32; output_count];
    for (i, sample) in output.iter_mut().enumerate() {
        let source_index = i as f64 / ratio;
        let index = source_index as usize;
        let fraction = (source_index - index as f64) as f32;

        if index + 1 < samples.len() {
            *sample = samples[index] * (1.0 - fraction) + samples[index + 1] * fraction;
        } else if index < samples.len() {
            *sample = samples[index];
        }
    }
    output
}

/// Exponential moving average of loudness samples for meters.
///
/// The session only emits raw per-chunk RMS values; this is the smoothing
/// a volume meter applies on top: `level = level * decay + sample * gain`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSmoother {
    pub decay: f32,
    pub gain: f32,
    level: f32,
}

impl VolumeSmoother {
    pub fn new(decay: f32, gain: f32) -> Self {
        Self {
            decay,
            gain,
            level: 0.0,
        }
    }

    pub fn push(&mut self, sample: f32) -> f32 {
        self.level = self.level * self.decay + sample * self.gain;
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

impl Default for VolumeSmoother {
    fn default() -> Self {
        Self::new(0.8, 20.0)
    }
}
