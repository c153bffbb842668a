//! Normalized boxes and frame sizes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::keypoint::{clamp_unit, Keypoint};

/// Minimum side length for a box to count as a detected subject.
const MIN_SUBJECT_SIDE: f64 = 0.01;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height, `None` for a zero-sized frame.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Bounding box in normalized frame coordinates.
///
/// Always lies inside the unit square. A degenerate (near-zero) box is the
/// sentinel for "no subject detected".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge (0.0-1.0)
    pub x: f64,
    /// Top edge (0.0-1.0)
    pub y: f64,
    /// Box width (0.0-1.0)
    pub width: f64,
    /// Box height (0.0-1.0)
    pub height: f64,
}

impl BoundingBox {
    /// Create a box, clamped so that it stays inside the frame.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let x = clamp_unit(x);
        let y = clamp_unit(y);
        Self {
            x,
            y,
            width: clamp_unit(width).min(1.0 - x),
            height: clamp_unit(height).min(1.0 - y),
        }
    }

    /// The "no subject" sentinel.
    pub fn empty() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    /// Convert a pixel-space box into normalized coordinates.
    pub fn from_pixels(x: f64, y: f64, width: f64, height: f64, size: ImageSize) -> Self {
        if size.is_empty() {
            return Self::empty();
        }
        let w = size.width as f64;
        let h = size.height as f64;
        Self::new(x / w, y / h, width / w, height / h)
    }

    /// Smallest box enclosing every keypoint at or above `min_confidence`.
    pub fn enclosing(keypoints: &[Keypoint], min_confidence: f64) -> Option<Self> {
        let visible: Vec<&Keypoint> = keypoints
            .iter()
            .filter(|k| k.is_visible(min_confidence))
            .collect();

        if visible.len() < 2 {
            return None;
        }

        let min_x = visible.iter().map(|k| k.x).fold(f64::INFINITY, f64::min);
        let min_y = visible.iter().map(|k| k.y).fold(f64::INFINITY, f64::min);
        let max_x = visible.iter().map(|k| k.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = visible.iter().map(|k| k.y).fold(f64::NEG_INFINITY, f64::max);

        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Whether this box is the "no subject" sentinel.
    pub fn is_degenerate(&self) -> bool {
        self.width < MIN_SUBJECT_SIDE || self.height < MIN_SUBJECT_SIDE
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// Fraction of the frame covered by the box.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_clamped_into_frame() {
        let b = BoundingBox::new(0.8, -0.1, 0.5, 0.4);
        assert!((b.x - 0.8).abs() < 1e-9);
        assert_eq!(b.y, 0.0);
        assert!((b.x2() - 1.0).abs() < 1e-9);
        assert!((b.height - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_sentinel() {
        assert!(BoundingBox::empty().is_degenerate());
        assert!(BoundingBox::new(0.5, 0.5, 0.005, 0.2).is_degenerate());
        assert!(!BoundingBox::new(0.3, 0.2, 0.4, 0.6).is_degenerate());
    }

    #[test]
    fn test_from_pixels() {
        let b = BoundingBox::from_pixels(480.0, 270.0, 960.0, 540.0, ImageSize::new(1920, 1080));
        assert!((b.x - 0.25).abs() < 1e-9);
        assert!((b.cy() - 0.5).abs() < 1e-9);
        let unsized_image = ImageSize::new(0, 10);
        assert!(BoundingBox::from_pixels(1.0, 1.0, 1.0, 1.0, unsized_image).is_degenerate());
    }

    #[test]
    fn test_enclosing_ignores_low_confidence() {
        let kps = vec![
            Keypoint::new(0.2, 0.1, 0.9),
            Keypoint::new(0.6, 0.8, 0.9),
            Keypoint::new(0.95, 0.95, 0.1),
        ];
        let b = BoundingBox::enclosing(&kps, 0.5).unwrap();
        assert!((b.x - 0.2).abs() < 1e-9);
        assert!((b.x2() - 0.6).abs() < 1e-9);
        assert!((b.y2() - 0.8).abs() < 1e-9);
        assert!(BoundingBox::enclosing(&kps[..1], 0.5).is_none());
    }

    #[test]
    fn test_image_aspect_ratio() {
        assert!((ImageSize::new(4000, 3000).aspect_ratio().unwrap() - 4.0 / 3.0).abs() < 1e-9);
        assert!(ImageSize::new(0, 3000).aspect_ratio().is_none());
    }
}
