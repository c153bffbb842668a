//! Lens bands and focal-length estimates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lens band derived from the compression index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LensType {
    /// Compression index below 0.3.
    Wide,
    /// 0.3 to 0.5.
    Normal,
    /// 0.5 to 0.7.
    SemiTelephoto,
    /// 0.7 and above.
    Telephoto,
}

impl LensType {
    /// Bucket a compression index into its band.
    pub fn from_compression_index(index: f64) -> Self {
        if index < 0.3 {
            Self::Wide
        } else if index < 0.5 {
            Self::Normal
        } else if index < 0.7 {
            Self::SemiTelephoto
        } else {
            Self::Telephoto
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wide => "wide",
            Self::Normal => "normal",
            Self::SemiTelephoto => "semi_telephoto",
            Self::Telephoto => "telephoto",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Wide => "wide-angle",
            Self::Normal => "standard",
            Self::SemiTelephoto => "short telephoto",
            Self::Telephoto => "telephoto",
        }
    }
}

impl fmt::Display for LensType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a focal-length estimate came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FocalSource {
    Exif,
    Depth,
    Zoom,
    Default,
}

impl FocalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exif => "exif",
            Self::Depth => "depth",
            Self::Zoom => "zoom",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for FocalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved 35mm-equivalent focal length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FocalLengthInfo {
    /// Focal length in 35mm-equivalent millimetres
    pub focal_length_35mm: f64,
    /// Lens band
    pub lens_type: LensType,
    /// Estimator that produced the value
    pub source: FocalSource,
}
