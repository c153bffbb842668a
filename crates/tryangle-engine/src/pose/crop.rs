//! Telling frame-edge cropping apart from occlusion.
//!
//! An occluded keypoint loses confidence anywhere in the frame. A cropped one
//! loses confidence right at an edge while the reference saw it clearly.

use tryangle_models::{Keypoint, ShotType};

use super::groups::BodyGroup;
use crate::config::PoseConfig;

/// Whether the live keypoint reads as cut off by the frame edge.
pub fn is_cropped(live: &Keypoint, reference: &Keypoint, config: &PoseConfig) -> bool {
    let in_band = live.confidence >= config.crop_confidence_min
        && live.confidence <= config.crop_confidence_max;
    let at_edge = live.edge_distance() <= config.crop_edge_margin;
    let was_seen = reference.confidence >= config.crop_reference_confidence;
    in_band && at_edge && was_seen
}

/// Cropped state of index `i`, false when either array lacks it.
pub fn is_index_cropped(
    reference: &[Keypoint],
    live: &[Keypoint],
    index: usize,
    config: &PoseConfig,
) -> bool {
    match (live.get(index), reference.get(index)) {
        (Some(l), Some(r)) => is_cropped(l, r, config),
        _ => false,
    }
}

/// Groups required by the reference's shot type that the live frame cuts off.
pub fn cropped_groups(
    reference: &[Keypoint],
    live: &[Keypoint],
    reference_shot: ShotType,
    config: &PoseConfig,
) -> Vec<BodyGroup> {
    BodyGroup::required_for(reference_shot)
        .iter()
        .copied()
        .filter(|group| {
            let total = group.indices().count();
            let cropped = group
                .indices()
                .filter(|&i| is_index_cropped(reference, live, i, config))
                .count();
            total > 0 && cropped as f64 / total as f64 >= config.crop_group_fraction
        })
        .collect()
}
