use async_trait::async_trait;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use super::{SpeakerAssignment, SpeakerRecognizer};
use crate::audio::AudioFile;
use crate::error::ProviderError;
use crate::model::Segment;

/// Segments shorter than this carry too little audio to characterize a
/// voice; they inherit the label of the nearest usable segment.
const MIN_SEGMENT_SECONDS: f64 = 0.5;

const FFT_SIZE: usize = 1024;
const HOP_SIZE: usize = FFT_SIZE / 2;

/// Spectral band count per feature vector.
const FEATURE_BANDS: usize = 16;

/// Windows quieter than this RMS are treated as silence.
const SILENCE_RMS: f32 = 1e-4;

/// Speaker-count estimation window length.
const ESTIMATE_WINDOW_SECONDS: usize = 3;

/// Speaker-count estimation looks at this much of the recording at most,
/// keeping clustering cost flat regardless of recording length.
const ESTIMATE_SCAN_SECONDS: usize = 30;

/// Unsupervised speaker labeling by agglomerative clustering over
/// per-segment spectral band energies.
///
/// No model to load, so initialization is trivial. Labels are opaque
/// (`speaker_0`, `speaker_1`, ...) and stable only within one recording.
pub struct ClusteringRecognizer {
    _private: (),
}

impl ClusteringRecognizer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Average log band energies over all FFT windows in a sample slice.
    /// Returns `None` for slices too short or too quiet to analyze.
    fn extract_features(samples: &[f32]) -> Option<Vec<f32>> {
        if samples.len() < FFT_SIZE {
            return None;
        }

        let rms =
            (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt();
        if rms < SILENCE_RMS {
            return None;
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        let mut bands = vec![0.0f32; FEATURE_BANDS];
        let mut windows = 0usize;
        let mut buffer = vec![Complex::new(0.0f32, 0.0f32); FFT_SIZE];

        let mut start = 0;
        while start + FFT_SIZE <= samples.len() {
            for (i, sample) in samples[start..start + FFT_SIZE].iter().enumerate() {
                // Hann window.
                let w = 0.5
                    - 0.5
                        * (2.0 * std::f32::consts::PI * i as f32 / (FFT_SIZE - 1) as f32)
                            .cos();
                buffer[i] = Complex::new(sample * w, 0.0);
            }
            fft.process(&mut buffer);

            // Fold the magnitude spectrum below Nyquist into equal bands.
            let bins_per_band = (FFT_SIZE / 2) / FEATURE_BANDS;
            for (band, energy) in bands.iter_mut().enumerate() {
                let lo = band * bins_per_band;
                let hi = lo + bins_per_band;
                let sum: f32 = buffer[lo..hi].iter().map(|c| c.norm_sqr()).sum();
                *energy += (sum + 1e-10).ln();
            }

            windows += 1;
            start += HOP_SIZE;
        }

        if windows == 0 {
            return None;
        }
        for energy in &mut bands {
            *energy /= windows as f32;
        }

        // L2 normalization so louder segments do not dominate distances.
        let norm = bands.iter().map(|e| e * e).sum::<f32>().sqrt();
        if norm > 0.0 {
            for energy in &mut bands {
                *energy /= norm;
            }
        }
        Some(bands)
    }

    /// Feature vectors for speaker-count estimation, one per
    /// `ESTIMATE_WINDOW_SECONDS` window over at most the first
    /// `ESTIMATE_SCAN_SECONDS` of audio.
    fn estimate_features(mono: &[f32], sample_rate: u32) -> Vec<Vec<f32>> {
        let frame_len = sample_rate as usize * ESTIMATE_WINDOW_SECONDS;
        let scan_len = mono.len().min(sample_rate as usize * ESTIMATE_SCAN_SECONDS);
        let mut features = Vec::new();
        for frame in mono[..scan_len].chunks(frame_len) {
            if let Some(f) = Self::extract_features(frame) {
                features.push(f);
            }
        }
        features
    }

    fn distance(a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }

    /// How many speakers to look for given the number of usable segments.
    fn cluster_count(usable: usize) -> usize {
        if usable < 10 {
            2.min(usable)
        } else if usable < 30 {
            3.min(usable / 3)
        } else {
            4.min(usable / 4)
        }
    }

    /// Bottom-up centroid-linkage clustering down to `k` clusters.
    /// Returns a cluster index per feature vector.
    fn agglomerate(features: &[Vec<f32>], k: usize) -> Vec<usize> {
        let n = features.len();
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut centroids: Vec<Vec<f32>> = features.to_vec();

        while members.len() > k {
            let mut best = (0usize, 1usize);
            let mut best_dist = f32::MAX;
            for i in 0..centroids.len() {
                for j in (i + 1)..centroids.len() {
                    let d = Self::distance(&centroids[i], &centroids[j]);
                    if d < best_dist {
                        best_dist = d;
                        best = (i, j);
                    }
                }
            }

            let (i, j) = best;
            let absorbed = members.remove(j);
            let absorbed_centroid = centroids.remove(j);
            let wa = members[i].len() as f32;
            let wb = absorbed.len() as f32;
            for (c, b) in centroids[i].iter_mut().zip(&absorbed_centroid) {
                *c = (*c * wa + b * wb) / (wa + wb);
            }
            members[i].extend(absorbed);
        }

        let mut labels = vec![0usize; n];
        for (cluster, member_ids) in members.iter().enumerate() {
            for &m in member_ids {
                labels[m] = cluster;
            }
        }
        labels
    }

    fn segment_samples<'a>(mono: &'a [f32], sample_rate: u32, segment: &Segment) -> &'a [f32] {
        let start = ((segment.start_time * sample_rate as f64) as usize).min(mono.len());
        let end = ((segment.end_time * sample_rate as f64) as usize).min(mono.len());
        &mono[start..end]
    }
}

impl Default for ClusteringRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeakerRecognizer for ClusteringRecognizer {
    fn id(&self) -> &'static str {
        "clustering"
    }

    async fn initialize(&self) -> Result<String, ProviderError> {
        Ok("Clustering recognizer ready".to_string())
    }

    async fn identify_speakers(
        &self,
        audio_file: &Path,
        segments: &[Segment],
    ) -> Result<Vec<SpeakerAssignment>, ProviderError> {
        // Distinguishing speakers needs at least two segments to compare.
        if segments.len() < 2 {
            return Err(ProviderError::InsufficientSegments);
        }
        if !audio_file.exists() {
            return Err(ProviderError::FileNotFound(
                audio_file.display().to_string(),
            ));
        }

        let audio = AudioFile::open(audio_file)
            .map_err(|e| ProviderError::Engine(format!("cannot decode WAV: {}", e)))?;
        let sample_rate = audio.sample_rate;
        let mono = audio.to_mono();

        let mut ordered: Vec<&Segment> = segments.iter().collect();
        ordered.sort_by(|a, b| a.cmp_order(b));

        // Split into usable segments (long enough and non-silent, so they
        // get a feature vector) and the rest.
        let mut usable: Vec<(usize, Vec<f32>)> = Vec::new();
        for (idx, segment) in ordered.iter().enumerate() {
            if segment.duration() < MIN_SEGMENT_SECONDS {
                continue;
            }
            let slice = Self::segment_samples(&mono, sample_rate, segment);
            if let Some(features) = Self::extract_features(slice) {
                usable.push((idx, features));
            }
        }

        if usable.len() < 2 {
            return Err(ProviderError::InsufficientSegments);
        }

        let k = Self::cluster_count(usable.len());
        debug!(
            "Clustering {} usable segments (of {}) into {} speakers",
            usable.len(),
            ordered.len(),
            k
        );

        let mut labels = vec![None; ordered.len()];
        if k <= 1 {
            for label in &mut labels {
                *label = Some(0usize);
            }
        } else {
            let features: Vec<Vec<f32>> = usable.iter().map(|(_, f)| f.clone()).collect();
            let clusters = Self::agglomerate(&features, k);
            for ((idx, _), cluster) in usable.iter().zip(&clusters) {
                labels[*idx] = Some(*cluster);
            }

            // Segments without features inherit the label of the usable
            // segment whose midpoint is closest.
            for idx in 0..ordered.len() {
                if labels[idx].is_some() {
                    continue;
                }
                let mid = ordered[idx].midpoint();
                let nearest = usable
                    .iter()
                    .zip(&clusters)
                    .min_by(|((a, _), _), ((b, _), _)| {
                        let da = (ordered[*a].midpoint() - mid).abs();
                        let db = (ordered[*b].midpoint() - mid).abs();
                        da.total_cmp(&db)
                    })
                    .map(|(_, cluster)| *cluster);
                labels[idx] = nearest;
            }
        }

        // Number clusters by order of first appearance, so the first voice
        // heard is always speaker_0.
        let mut remap: Vec<usize> = Vec::new();
        let mut assignments = Vec::with_capacity(ordered.len());
        for (idx, segment) in ordered.iter().enumerate() {
            let cluster = labels[idx].unwrap_or(0);
            let speaker = match remap.iter().position(|&c| c == cluster) {
                Some(pos) => pos,
                None => {
                    remap.push(cluster);
                    remap.len() - 1
                }
            };
            assignments.push(SpeakerAssignment {
                segment_id: segment.id,
                speaker_id: format!("speaker_{}", speaker),
            });
        }

        info!(
            "Identified {} speakers across {} segments",
            remap.len().max(1),
            assignments.len()
        );
        Ok(assignments)
    }

    async fn estimate_speaker_count(&self, audio_file: &Path) -> Result<usize, ProviderError> {
        if !audio_file.exists() {
            return Err(ProviderError::FileNotFound(
                audio_file.display().to_string(),
            ));
        }

        let audio = AudioFile::open(audio_file)
            .map_err(|e| ProviderError::Engine(format!("cannot decode WAV: {}", e)))?;
        let mono = audio.to_mono();
        let features = Self::estimate_features(&mono, audio.sample_rate);

        if features.len() < 2 {
            return Ok(1);
        }

        let k = Self::cluster_count(features.len());
        if k <= 1 {
            return Ok(1);
        }
        let clusters = Self::agglomerate(&features, k);
        let mut seen: Vec<usize> = Vec::new();
        for cluster in clusters {
            if !seen.contains(&cluster) {
                seen.push(cluster);
            }
        }
        Ok(seen.len().max(1))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, seconds: f32, rate: u32) -> Vec<f32> {
        (0..(seconds * rate as f32) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn features_distinguish_tones() {
        let low = ClusteringRecognizer::extract_features(&sine(200.0, 1.0, 16_000)).unwrap();
        let high = ClusteringRecognizer::extract_features(&sine(3_000.0, 1.0, 16_000)).unwrap();
        let same = ClusteringRecognizer::extract_features(&sine(200.0, 1.0, 16_000)).unwrap();

        let cross = ClusteringRecognizer::distance(&low, &high);
        let within = ClusteringRecognizer::distance(&low, &same);
        assert!(cross > within);
    }

    #[test]
    fn silence_has_no_features() {
        let silence = vec![0.0f32; 16_000];
        assert!(ClusteringRecognizer::extract_features(&silence).is_none());
    }

    #[test]
    fn cluster_count_buckets() {
        assert_eq!(ClusteringRecognizer::cluster_count(2), 2);
        assert_eq!(ClusteringRecognizer::cluster_count(9), 2);
        assert_eq!(ClusteringRecognizer::cluster_count(12), 3);
        assert_eq!(ClusteringRecognizer::cluster_count(29), 3);
        assert_eq!(ClusteringRecognizer::cluster_count(30), 4);
        assert_eq!(ClusteringRecognizer::cluster_count(100), 4);
    }

    #[test]
    fn estimation_scan_is_capped() {
        let rate = 8_000u32;
        let long = sine(440.0, 120.0, rate);
        let features = ClusteringRecognizer::estimate_features(&long, rate);
        assert!(
            features.len() <= ESTIMATE_SCAN_SECONDS / ESTIMATE_WINDOW_SECONDS,
            "scan must stop after {} seconds, got {} windows",
            ESTIMATE_SCAN_SECONDS,
            features.len()
        );
        assert!(!features.is_empty());
    }

    #[tokio::test]
    async fn too_few_segments_is_an_error() {
        let recognizer = ClusteringRecognizer::new();
        let transcript_id = Uuid::new_v4();
        let path = Path::new("does-not-matter.wav");

        let err = recognizer.identify_speakers(path, &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientSegments));

        let single = Segment::new(transcript_id, 0.0, 2.0, "hello".to_string()).unwrap();
        let err = recognizer
            .identify_speakers(path, &[single])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientSegments));
    }

    #[test]
    fn agglomerate_separates_two_groups() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
        ];
        let labels = ClusteringRecognizer::agglomerate(&features, 2);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }
}
