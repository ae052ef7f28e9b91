use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use tracing::info;

/// A fully decoded WAV file.
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Interleaved samples folded to mono by channel averaging.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.iter().map(|s| *s as f32 / 32768.0).collect();
        }

        let channels = self.channels as usize;
        let mut mono = Vec::with_capacity(self.samples.len() / channels);
        for frame in self.samples.chunks_exact(channels) {
            let sum: i32 = frame.iter().map(|s| *s as i32).sum();
            mono.push(sum as f32 / channels as f32 / 32768.0);
        }
        mono
    }

    /// Mono f32 samples resampled to the target rate by linear
    /// interpolation. Whisper expects 16 kHz mono.
    pub fn to_mono_resampled(&self, target_rate: u32) -> Vec<f32> {
        let mono = self.to_mono();
        if self.sample_rate == target_rate || mono.is_empty() {
            return mono;
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = (mono.len() as f64 / ratio) as usize;
        let mut out = Vec::with_capacity(out_len);

        for i in 0..out_len {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let a = mono[idx.min(mono.len() - 1)];
            let b = mono[(idx + 1).min(mono.len() - 1)];
            out.push(a + (b - a) * frac);
        }
        out
    }
}
