//! Height-threshold color classification.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::height_field::HeightField;

/// Linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Color {
    /// Fully transparent black, used for unclassified samples.
    pub const CLEAR: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    /// Creates a color from components.
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }
}

/// A named height band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Display name
    pub name: String,
    /// Inclusive upper height bound
    pub height: f32,
    /// Color for samples in this band
    pub color: Color,
}

impl Region {
    /// Creates a region.
    #[must_use]
    pub fn new(name: impl Into<String>, height: f32, color: Color) -> Self {
        Self {
            name: name.into(),
            height,
            color,
        }
    }
}

/// Default bands, ascending by height.
#[must_use]
pub fn default_regions() -> Vec<Region> {
    vec![
        Region::new("deep water", 0.3, Color::rgb(0.20, 0.39, 0.76)),
        Region::new("shallow water", 0.4, Color::rgb(0.21, 0.40, 0.78)),
        Region::new("sand", 0.45, Color::rgb(0.82, 0.82, 0.49)),
        Region::new("grass", 0.55, Color::rgb(0.34, 0.60, 0.10)),
        Region::new("grass 2", 0.6, Color::rgb(0.24, 0.42, 0.07)),
        Region::new("rock", 0.7, Color::rgb(0.37, 0.27, 0.24)),
        Region::new("rock 2", 0.9, Color::rgb(0.29, 0.23, 0.22)),
        Region::new("snow", 1.0, Color::rgb(1.0, 1.0, 1.0)),
    ]
}

/// Color of the first region whose upper bound is at or above `height`.
///
/// The scan is a linear first match, so `regions` must be ascending by
/// height; an unsorted list is not rejected and classifies accordingly.
#[must_use]
pub fn classify_height(height: f32, regions: &[Region]) -> Option<Color> {
    regions
        .iter()
        .find(|region| height <= region.height)
        .map(|region| region.color)
}

/// Per-sample colors for one height field.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorField {
    width: usize,
    height: usize,
    colors: Arc<[Color]>,
}

impl ColorField {
    /// Classifies every sample of `field`.
    #[must_use]
    pub fn classify(field: &HeightField, regions: &[Region]) -> Self {
        let colors = field
            .samples()
            .iter()
            .map(|&h| classify_height(h, regions).unwrap_or(Color::CLEAR))
            .collect::<Vec<_>>();
        Self {
            width: field.width(),
            height: field.height(),
            colors: colors.into(),
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

    /// Color at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.colors.get(y * self.width + x).copied()
    }

    /// All colors, row-major.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Raw RGBA32F bytes for texture upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Color = Color::rgb(1.0, 0.0, 0.0);
    const B: Color = Color::rgb(0.0, 0.0, 1.0);

    #[test]
    fn test_single_region_matches_every_height() {
        let regions = vec![Region::new("x", 1.0, A)];
        for h in [0.0, 0.25, 0.5, 0.999, 1.0] {
            assert_eq!(classify_height(h, &regions), Some(A));
        }
    }

    #[test]
    fn test_unsorted_regions_first_match_wins() {
        let regions = vec![Region::new("a", 0.8, A), Region::new("b", 0.3, B)];
        assert_eq!(classify_height(0.5, &regions), Some(A));
        // Even a height below B's bound hits A first.
        assert_eq!(classify_height(0.1, &regions), Some(A));
    }

    #[test]
    fn test_sorted_regions() {
        let regions = vec![Region::new("b", 0.3, B), Region::new("a", 0.8, A)];
        assert_eq!(classify_height(0.3, &regions), Some(B));
        assert_eq!(classify_height(0.5, &regions), Some(A));
        assert_eq!(classify_height(0.9, &regions), None);
    }

    #[test]
    fn test_color_field_fills_unmatched_with_clear() {
        let field = HeightField::new(2, 1, vec![0.2, 0.95]).expect("valid");
        let colors = ColorField::classify(&field, &[Region::new("b", 0.3, B)]);
        assert_eq!(colors.get(0, 0), Some(B));
        assert_eq!(colors.get(1, 0), Some(Color::CLEAR));
        assert_eq!(colors.as_bytes().len(), 2 * 16);
    }

    #[test]
    fn test_default_regions_sorted() {
        let regions = default_regions();
        assert!(regions.windows(2).all(|w| w[0].height <= w[1].height));
    }
}
