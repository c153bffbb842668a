//! Focal-length and compression estimation.
//!
//! Resolves a 35mm-equivalent focal length through a fixed priority chain:
//! EXIF, then the depth collaborator, then the current zoom setting, then a
//! 50mm default. The chain never fails; each unusable source is skipped.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tryangle_models::{FocalLengthInfo, FocalSource, LensType};

use crate::exif::{self, ExifFocal};

/// Fallback when nothing else is known.
pub const DEFAULT_FOCAL_35MM: f64 = 50.0;

/// Focal lengths mapped onto the ends of the compression scale.
const WIDE_END_MM: f64 = 16.0;
const TELE_END_MM: f64 = 200.0;

/// Upper bound for a plausible EXIF value.
const MAX_EXIF_FOCAL_MM: f64 = 2000.0;

/// Depth collaborator output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthEstimate {
    /// Compression index measured from the depth map
    pub compression_index: f64,
    /// Focal length, when the depth model reports one
    #[serde(default)]
    pub focal_length: Option<FocalLengthInfo>,
}

/// Current camera zoom state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    /// Physical focal length of the active lens (mm)
    pub physical_focal_mm: f64,
    /// Sensor crop factor relative to full frame
    pub crop_factor: f64,
    /// Digital/optical zoom multiplier on top of the lens
    pub zoom_factor: f64,
}

impl ZoomState {
    pub fn equivalent_focal(&self) -> Option<f64> {
        let f = self.physical_focal_mm * self.crop_factor * self.zoom_factor;
        (f.is_finite() && f > 0.0).then_some(f)
    }
}

/// Resolved focal length plus the derived compression index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocalEstimate {
    pub info: FocalLengthInfo,
    pub compression_index: f64,
}

/// `ln(f/16) / ln(200/16)`, clamped into `[0, 1]`.
pub fn compression_index_from_focal(focal_35mm: f64) -> f64 {
    if !(focal_35mm.is_finite() && focal_35mm > 0.0) {
        return compression_index_from_focal(DEFAULT_FOCAL_35MM);
    }
    ((focal_35mm / WIDE_END_MM).ln() / (TELE_END_MM / WIDE_END_MM).ln()).clamp(0.0, 1.0)
}

/// Inverse of [`compression_index_from_focal`].
pub fn focal_from_compression_index(index: f64) -> f64 {
    let index = if index.is_finite() { index.clamp(0.0, 1.0) } else { 0.0 };
    WIDE_END_MM * (TELE_END_MM / WIDE_END_MM).powf(index)
}

/// Build a [`FocalLengthInfo`] for a known focal length.
pub fn focal_info(focal_35mm: f64, source: FocalSource) -> FocalLengthInfo {
    FocalLengthInfo {
        focal_length_35mm: focal_35mm,
        lens_type: LensType::from_compression_index(compression_index_from_focal(focal_35mm)),
        source,
    }
}

/// Inputs to the priority chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocalInputs<'a> {
    /// Raw metadata bytes (JPEG, APP1 or TIFF)
    pub exif_bytes: Option<&'a [u8]>,
    /// Crop factor used when only the physical `FocalLength` tag exists
    pub crop_factor: Option<f64>,
    pub depth: Option<&'a DepthEstimate>,
    pub zoom: Option<&'a ZoomState>,
}

/// Resolve the focal length. Never fails.
pub fn estimate(inputs: &FocalInputs<'_>) -> FocalEstimate {
    if let Some(bytes) = inputs.exif_bytes {
        match exif::read_focal(bytes) {
            Ok(tags) => {
                if let Some(f) = exif_equivalent(&tags, inputs.crop_factor) {
                    debug!(focal_35mm = f, "Focal length from EXIF");
                    return finish(focal_info(f, FocalSource::Exif));
                }
                debug!("EXIF present but without usable focal length");
            }
            Err(e) => warn!(error = %e, "Ignoring unreadable EXIF"),
        }
    }

    if let Some(depth) = inputs.depth {
        if let Some(info) = depth.focal_length.filter(|i| valid_focal(i.focal_length_35mm)) {
            return FocalEstimate {
                info: FocalLengthInfo {
                    source: FocalSource::Depth,
                    ..info
                },
                compression_index: depth.compression_index.clamp(0.0, 1.0),
            };
        }
        if depth.compression_index.is_finite() {
            let index = depth.compression_index.clamp(0.0, 1.0);
            let f = focal_from_compression_index(index);
            return FocalEstimate {
                info: FocalLengthInfo {
                    focal_length_35mm: f,
                    lens_type: LensType::from_compression_index(index),
                    source: FocalSource::Depth,
                },
                compression_index: index,
            };
        }
    }

    if let Some(f) = inputs.zoom.and_then(ZoomState::equivalent_focal) {
        return finish(focal_info(f, FocalSource::Zoom));
    }

    finish(focal_info(DEFAULT_FOCAL_35MM, FocalSource::Default))
}

fn finish(info: FocalLengthInfo) -> FocalEstimate {
    FocalEstimate {
        compression_index: compression_index_from_focal(info.focal_length_35mm),
        info,
    }
}

fn valid_focal(f: f64) -> bool {
    f.is_finite() && f > 0.0 && f <= MAX_EXIF_FOCAL_MM
}

fn exif_equivalent(tags: &ExifFocal, crop_factor: Option<f64>) -> Option<f64> {
    if let Some(f) = tags.focal_length_35mm.filter(|f| valid_focal(*f)) {
        return Some(f);
    }
    let physical = tags.focal_length_mm?;
    let crop = crop_factor.filter(|c| c.is_finite() && *c > 0.0)?;
    Some(physical * crop).filter(|f| valid_focal(*f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::tests::build_tiff;

    #[test]
    fn test_compression_curve() {
        assert_eq!(compression_index_from_focal(16.0), 0.0);
        assert_eq!(compression_index_from_focal(400.0), 1.0);
        assert_eq!(compression_index_from_focal(8.0), 0.0);
        let normal = compression_index_from_focal(50.0);
        assert!(normal > 0.3 && normal < 0.5);
        assert_eq!(
            LensType::from_compression_index(compression_index_from_focal(24.0)),
            LensType::Wide
        );
        assert_eq!(
            LensType::from_compression_index(compression_index_from_focal(135.0)),
            LensType::Telephoto
        );
    }

    #[test]
    fn test_inverse_curve() {
        for f in [20.0, 35.0, 50.0, 85.0, 150.0] {
            let back = focal_from_compression_index(compression_index_from_focal(f));
            assert!((back - f).abs() < 1e-6);
        }
    }

    #[test]
    fn test_exif_takes_priority() {
        let tiff = build_tiff(false, (425, 100), 26);
        let depth = DepthEstimate {
            compression_index: 0.9,
            focal_length: None,
        };
        let est = estimate(&FocalInputs {
            exif_bytes: Some(&tiff),
            depth: Some(&depth),
            ..Default::default()
        });
        assert_eq!(est.info.source, FocalSource::Exif);
        assert_eq!(est.info.focal_length_35mm, 26.0);
    }

    #[test]
    fn test_exif_physical_needs_crop_factor() {
        let tiff = build_tiff(false, (6, 1), 0);
        let without = estimate(&FocalInputs {
            exif_bytes: Some(&tiff),
            ..Default::default()
        });
        assert_eq!(without.info.source, FocalSource::Default);

        let with = estimate(&FocalInputs {
            exif_bytes: Some(&tiff),
            crop_factor: Some(4.5),
            ..Default::default()
        });
        assert_eq!(with.info.source, FocalSource::Exif);
        assert!((with.info.focal_length_35mm - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_broken_exif_falls_through_to_depth() {
        let depth = DepthEstimate {
            compression_index: 0.75,
            focal_length: None,
        };
        let est = estimate(&FocalInputs {
            exif_bytes: Some(b"garbage"),
            depth: Some(&depth),
            ..Default::default()
        });
        assert_eq!(est.info.source, FocalSource::Depth);
        assert_eq!(est.info.lens_type, LensType::Telephoto);
        assert!((est.compression_index - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_then_default() {
        let zoom = ZoomState {
            physical_focal_mm: 6.0,
            crop_factor: 4.3,
            zoom_factor: 2.0,
        };
        let est = estimate(&FocalInputs {
            zoom: Some(&zoom),
            ..Default::default()
        });
        assert_eq!(est.info.source, FocalSource::Zoom);
        assert!((est.info.focal_length_35mm - 51.6).abs() < 1e-9);

        let fallback = estimate(&FocalInputs::default());
        assert_eq!(fallback.info.source, FocalSource::Default);
        assert_eq!(fallback.info.focal_length_35mm, DEFAULT_FOCAL_35MM);
        assert_eq!(fallback.info.lens_type, LensType::Normal);
    }
}
