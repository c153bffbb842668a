//! Frame aspect ratios.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Aspect ratio expressed as `width:height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio::new(1, 1);

    /// Standard landscape sensor (4:3)
    pub const LANDSCAPE_4_3: AspectRatio = AspectRatio::new(4, 3);

    /// Standard portrait sensor (3:4)
    pub const PORTRAIT_3_4: AspectRatio = AspectRatio::new(3, 4);

    /// DSLR landscape (3:2)
    pub const LANDSCAPE_3_2: AspectRatio = AspectRatio::new(3, 2);

    /// DSLR portrait (2:3)
    pub const PORTRAIT_2_3: AspectRatio = AspectRatio::new(2, 3);

    /// Widescreen landscape (16:9)
    pub const LANDSCAPE_16_9: AspectRatio = AspectRatio::new(16, 9);

    /// Widescreen portrait (9:16)
    pub const PORTRAIT_9_16: AspectRatio = AspectRatio::new(9, 16);

    /// Ratios a phone camera can switch between.
    pub const STANDARD: &'static [AspectRatio] = &[
        AspectRatio::SQUARE,
        AspectRatio::LANDSCAPE_4_3,
        AspectRatio::PORTRAIT_3_4,
        AspectRatio::LANDSCAPE_3_2,
        AspectRatio::PORTRAIT_2_3,
        AspectRatio::LANDSCAPE_16_9,
        AspectRatio::PORTRAIT_9_16,
    ];

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Closest standard ratio to a measured `width / height` value.
    pub fn closest(ratio: f64) -> AspectRatio {
        Self::STANDARD
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = (a.as_f64() - ratio).abs();
                let db = (b.as_f64() - ratio).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(AspectRatio::LANDSCAPE_4_3)
    }

    /// Whether the frame is taller than wide.
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT_3_4
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let ratio: AspectRatio = "16:9".parse().unwrap();
        assert_eq!(ratio, AspectRatio::LANDSCAPE_16_9);
        assert_eq!(ratio.to_string(), "16:9");
        assert!("16-9".parse::<AspectRatio>().is_err());
        assert!("0:9".parse::<AspectRatio>().is_err());
        assert!("a:9".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_closest_standard() {
        assert_eq!(AspectRatio::closest(1.34), AspectRatio::LANDSCAPE_4_3);
        assert_eq!(AspectRatio::closest(0.56), AspectRatio::PORTRAIT_9_16);
        assert_eq!(AspectRatio::closest(1.0), AspectRatio::SQUARE);
        assert!(AspectRatio::closest(0.74).is_portrait());
    }
}
