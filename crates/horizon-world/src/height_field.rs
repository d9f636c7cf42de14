//! Height field storage and fractal noise synthesis.

use std::sync::Arc;

use glam::Vec2;
use horizon_common::GenerationError;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Smallest accepted noise scale; smaller values are clamped up to this.
pub const MIN_NOISE_SCALE: f32 = 0.0001;

/// Immutable grid of elevation samples for one chunk.
///
/// Cloning is cheap: samples are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    samples: Arc<[f32]>,
}

impl HeightField {
    /// Wraps row-major samples (`y * width + x`).
    pub fn new(width: usize, height: usize, samples: Vec<f32>) -> Result<Self, GenerationError> {
        if samples.len() != width * height {
            return Err(GenerationError::Failed(format!(
                "height field {width}x{height} needs {} samples, got {}",
                width * height,
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples: samples.into(),
        })
    }

    /// A field filled with one value.
    #[must_use]
    pub fn flat(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            samples: vec![value; width * height].into(),
        }
    }

    /// Samples along X.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Samples along Y.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Sample at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples.get(y * self.width + x).copied()
    }

    /// All samples, row-major.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// How raw octave sums are mapped into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// Inverse-lerp between this field's own min and max.
    ///
    /// Uses the full range per chunk, but neighboring chunks no longer agree
    /// at their shared edge.
    Local,
    /// Scale by the largest height the octave stack can produce, so every
    /// chunk uses the same mapping and edges line up.
    #[default]
    Global,
}

/// Fractal noise parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Noise seed
    pub seed: u32,
    /// World units per noise period at the first octave
    pub scale: f32,
    /// Number of octaves layered
    pub octaves: u32,
    /// Amplitude multiplier per octave (0..1)
    pub persistence: f32,
    /// Frequency multiplier per octave (>= 1)
    pub lacunarity: f32,
    /// World-plane offset applied to every sample
    pub offset: Vec2,
    /// Normalization mode
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Global,
        }
    }
}

impl NoiseSettings {
    /// Clamps parameters into their usable ranges.
    pub fn sanitize(&mut self) {
        if self.scale <= 0.0 || !self.scale.is_finite() {
            self.scale = MIN_NOISE_SCALE;
        }
        if self.lacunarity < 1.0 || !self.lacunarity.is_finite() {
            self.lacunarity = 1.0;
        }
        self.octaves = self.octaves.max(1);
        self.persistence = self.persistence.clamp(0.0, 1.0);
    }
}

/// Generates a `resolution`×`resolution` field centered on `center`.
///
/// Sample `(x, y)` is taken at world position
/// `(center.x + x - half, center.y - (y - half))`, so rows run towards -Z
/// and adjacent chunks sample a continuous noise plane.
#[must_use]
pub fn generate_height_field(resolution: usize, settings: &NoiseSettings, center: Vec2) -> HeightField {
    let mut settings = settings.clone();
    settings.sanitize();

    let perlin = Perlin::new(settings.seed);
    let mut rng = fastrand::Rng::with_seed(u64::from(settings.seed));

    let mut max_possible = 0.0f64;
    let mut amplitude = 1.0f64;
    let octave_offsets: Vec<[f64; 2]> = (0..settings.octaves)
        .map(|_| {
            max_possible += amplitude;
            amplitude *= f64::from(settings.persistence);
            [
                f64::from(rng.i32(-100_000..100_000)) + f64::from(settings.offset.x),
                f64::from(rng.i32(-100_000..100_000)) + f64::from(settings.offset.y),
            ]
        })
        .collect();

    let half = (resolution.saturating_sub(1)) as f64 / 2.0;
    let scale = f64::from(settings.scale);
    let mut samples = Vec::with_capacity(resolution * resolution);
    let mut min = f64::MAX;
    let mut max = f64::MIN;

    for y in 0..resolution {
        for x in 0..resolution {
            let world_x = f64::from(center.x) + x as f64 - half;
            let world_z = f64::from(center.y) - (y as f64 - half);

            let mut amplitude = 1.0;
            let mut frequency = 1.0;
            let mut value = 0.0;
            for offset in &octave_offsets {
                let sample_x = (world_x + offset[0]) / scale * frequency;
                let sample_z = (world_z + offset[1]) / scale * frequency;
                value += perlin.get([sample_x, sample_z]) * amplitude;
                amplitude *= f64::from(settings.persistence);
                frequency *= f64::from(settings.lacunarity);
            }

            min = min.min(value);
            max = max.max(value);
            samples.push(value);
        }
    }

    let normalized = samples
        .into_iter()
        .map(|value| match settings.normalize_mode {
            NormalizeMode::Local => {
                if max > min {
                    ((value - min) / (max - min)) as f32
                } else {
                    0.0
                }
            },
            NormalizeMode::Global => ((value / max_possible + 1.0) * 0.5).clamp(0.0, 1.0) as f32,
        })
        .collect::<Vec<f32>>();

    HeightField {
        width: resolution,
        height: resolution,
        samples: normalized.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_deterministic() {
        let settings = NoiseSettings::default();
        let a = generate_height_field(33, &settings, Vec2::ZERO);
        let b = generate_height_field(33, &settings, Vec2::ZERO);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_different_terrain() {
        let a = generate_height_field(33, &NoiseSettings::default(), Vec2::ZERO);
        let b = generate_height_field(
            33,
            &NoiseSettings {
                seed: 999,
                ..NoiseSettings::default()
            },
            Vec2::ZERO,
        );
        assert_ne!(a.samples(), b.samples());
    }

    #[test]
    fn test_samples_normalized() {
        for mode in [NormalizeMode::Local, NormalizeMode::Global] {
            let settings = NoiseSettings {
                normalize_mode: mode,
                ..NoiseSettings::default()
            };
            let field = generate_height_field(41, &settings, Vec2::new(500.0, -250.0));
            assert_eq!(field.samples().len(), 41 * 41);
            assert!(field.samples().iter().all(|h| (0.0..=1.0).contains(h)));
        }
    }

    #[test]
    fn test_global_mode_edges_match_between_neighbors() {
        let settings = NoiseSettings::default();
        let left = generate_height_field(33, &settings, Vec2::new(0.0, 0.0));
        let right = generate_height_field(33, &settings, Vec2::new(32.0, 0.0));
        for y in 0..33 {
            let a = left.get(32, y).expect("in range");
            let b = right.get(0, y).expect("in range");
            assert!((a - b).abs() < 1e-5, "row {y}: {a} vs {b}");
        }
    }

    #[test]
    fn test_sanitize_clamps() {
        let mut settings = NoiseSettings {
            scale: 0.0,
            lacunarity: 0.5,
            octaves: 0,
            persistence: 3.0,
            ..NoiseSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings.scale, MIN_NOISE_SCALE);
        assert_eq!(settings.lacunarity, 1.0);
        assert_eq!(settings.octaves, 1);
        assert_eq!(settings.persistence, 1.0);
    }

    #[test]
    fn test_new_rejects_wrong_sample_count() {
        assert!(HeightField::new(2, 2, vec![0.0; 3]).is_err());
        let field = HeightField::new(2, 2, vec![0.0, 0.1, 0.2, 0.3]).expect("valid");
        assert_eq!(field.get(1, 1), Some(0.3));
        assert_eq!(field.get(2, 0), None);
    }
}
