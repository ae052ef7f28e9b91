use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::warn;

/// Defaults substituted when every extraction strategy fails. The pipeline
/// proceeds with these rather than aborting.
pub const DEFAULT_DURATION_SECONDS: f64 = 60.0;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 2;

/// Possibly-partial probe result; missing fields are filled with defaults
/// by [`AudioMetadata::or_defaults`].
#[derive(Debug, Clone, Default)]
pub struct AudioMetadata {
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub file_size: Option<u64>,
}

impl AudioMetadata {
    /// Fill gaps with the fixed defaults. Returns the completed metadata
    /// and whether any substitution happened.
    pub fn or_defaults(self) -> (AudioMetadata, bool) {
        let substituted =
            self.duration.is_none() || self.sample_rate.is_none() || self.channels.is_none();
        let filled = AudioMetadata {
            duration: self.duration.or(Some(DEFAULT_DURATION_SECONDS)),
            sample_rate: self.sample_rate.or(Some(DEFAULT_SAMPLE_RATE)),
            channels: self.channels.or(Some(DEFAULT_CHANNELS)),
            file_size: self.file_size,
        };
        (filled, substituted)
    }
}

/// Probe duration, sample rate, channel count, and byte size for a file.
///
/// Strategies run in order: symphonia container probe, then a hound WAV
/// read for `.wav` files symphonia could not handle. Partial results are
/// returned as-is; a completely failed probe still reports the byte size
/// when the file is readable.
pub fn extract_metadata(path: impl AsRef<Path>) -> Result<AudioMetadata> {
    let path = path.as_ref();

    let file_size = std::fs::metadata(path)
        .with_context(|| format!("Cannot read audio file: {}", path.display()))?
        .len();

    let mut meta = AudioMetadata {
        file_size: Some(file_size),
        ..Default::default()
    };

    match probe_with_symphonia(path) {
        Ok(probed) => {
            meta.duration = probed.duration;
            meta.sample_rate = probed.sample_rate;
            meta.channels = probed.channels;
        }
        Err(e) => {
            warn!("Symphonia probe failed for {}: {}", path.display(), e);
        }
    }

    // WAV headers are cheap to parse exactly; prefer them when available.
    if meta.duration.is_none() {
        if let Ok(reader) = hound::WavReader::open(path) {
            let spec = reader.spec();
            meta.sample_rate = Some(spec.sample_rate);
            meta.channels = Some(spec.channels);
            meta.duration = Some(
                reader.duration() as f64 / spec.sample_rate as f64,
            );
        }
    }

    Ok(meta)
}

fn probe_with_symphonia(path: &Path) -> Result<AudioMetadata> {
    let file = std::fs::File::open(path)?;
    let source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unsupported or unreadable container format")?;

    let format = probed.format;
    let track = format
        .default_track()
        .context("No default audio track in container")?;
    let params = &track.codec_params;

    let duration = match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
        _ => None,
    };

    Ok(AudioMetadata {
        duration,
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count() as u16),
        file_size: None,
    })
}
