//! Structural difference detection.
//!
//! Two skeletons differ structurally when simple bone substitution would
//! distort the garment:
//!
//! 1. a load-bearing region ([`STRUCTURAL_REGIONS`]) exists on one side only;
//! 2. a mapped source bone with a mapped parent lands on a target bone whose
//!    parent is not that parent's target.

use std::collections::BTreeSet;

use crate::rig::bone::{BoneIndex, BoneRecord};
use crate::rig::mapping::MappingTable;
use crate::rig::region::Region;

/// Regions whose presence must agree between the two skeletons.
pub const STRUCTURAL_REGIONS: [Region; 15] = [
    Region::Head,
    Region::Neck,
    Region::Chest,
    Region::Spine,
    Region::Hips,
    Region::LeftShoulder,
    Region::RightShoulder,
    Region::LeftUpperArm,
    Region::RightUpperArm,
    Region::LeftLowerArm,
    Region::RightLowerArm,
    Region::LeftUpperLeg,
    Region::RightUpperLeg,
    Region::LeftLowerLeg,
    Region::RightLowerLeg,
];

/// Diagnostic result of the detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuralReport {
    /// Load-bearing regions present on the source only.
    pub missing_in_target: Vec<Region>,
    /// Load-bearing regions present on the target only.
    pub missing_in_source: Vec<Region>,
    /// Source bones whose mapped parent chain is not mirrored on the target.
    pub hierarchy_mismatches: Vec<String>,
}

impl StructuralReport {
    #[must_use]
    pub fn has_difference(&self) -> bool {
        !self.missing_in_target.is_empty()
            || !self.missing_in_source.is_empty()
            || !self.hierarchy_mismatches.is_empty()
    }
}

fn present_regions(bones: &[BoneRecord]) -> BTreeSet<Region> {
    bones
        .iter()
        .map(|b| b.region)
        .filter(|r| STRUCTURAL_REGIONS.contains(r))
        .collect()
}

/// Runs both checks and collects every finding.
#[must_use]
pub fn detect_structural_differences(
    source: &[BoneRecord],
    target: &[BoneRecord],
    table: &MappingTable,
) -> StructuralReport {
    let mut report = StructuralReport::default();

    // === Check 1: region presence ===
    let source_regions = present_regions(source);
    let target_regions = present_regions(target);
    report.missing_in_target = source_regions.difference(&target_regions).copied().collect();
    report.missing_in_source = target_regions.difference(&source_regions).copied().collect();

    // === Check 2: mapped parent chains ===
    let sources = BoneIndex::new(source);
    let targets = BoneIndex::new(target);

    for bone in source {
        let Some(mapped) = table.target_of(bone.id) else {
            continue;
        };

        let consistent = match sources.parent_of(bone) {
            // A source top bone must land on a target top bone.
            None => targets.get(mapped).is_some_and(|t| t.is_root),
            Some(parent) => match table.target_of(parent.id) {
                None => continue,
                Some(expected) => {
                    targets.contains(expected)
                        && targets
                            .get(mapped)
                            .and_then(|t| t.parent)
                            .is_some_and(|actual| actual == expected)
                }
            },
        };

        if !consistent {
            report.hierarchy_mismatches.push(bone.name.clone());
        }
    }

    if report.has_difference() {
        log::info!(
            "Structural difference: missing in target {:?}, missing in source {:?}, {} hierarchy mismatches",
            report.missing_in_target,
            report.missing_in_source,
            report.hierarchy_mismatches.len()
        );
    }
    report
}

/// Whether the two skeletons differ structurally under `table`.
#[must_use]
pub fn has_structural_difference(
    source: &[BoneRecord],
    target: &[BoneRecord],
    table: &MappingTable,
) -> bool {
    detect_structural_differences(source, target, table).has_difference()
}
