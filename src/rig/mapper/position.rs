use crate::rig::bone::BoneRecord;
use crate::rig::mapper::{MapperConfig, MappingStrategy};
use crate::rig::mapping::{BoneMapping, MappingMethod, MappingTable};

/// Nearest world-space target.
///
/// Same-region targets are preferred; without one, the globally nearest
/// open target is taken at a lower confidence. Confidence decays with
/// distance as `base / (1 + distance)`.
pub struct PositionStrategy {
    same_region_base: f32,
    cross_region_base: f32,
}

impl PositionStrategy {
    #[must_use]
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            same_region_base: config.position_same_region_base,
            cross_region_base: config.position_cross_region_base,
        }
    }
}

fn nearest<'t>(
    source: &BoneRecord,
    candidates: impl Iterator<Item = &'t BoneRecord>,
) -> Option<(&'t BoneRecord, f32)> {
    let mut best: Option<(&BoneRecord, f32)> = None;
    for target in candidates {
        let d = source.world_position.distance(target.world_position);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((target, d));
        }
    }
    best
}

impl MappingStrategy for PositionStrategy {
    fn method(&self) -> MappingMethod {
        MappingMethod::PositionBased
    }

    fn map(&self, table: &mut MappingTable, source: &[BoneRecord], target: &[BoneRecord]) -> usize {
        let mut written = 0;
        for bone in source {
            if !table.is_source_open(bone.id) {
                continue;
            }

            let same_region = bone.region.is_anatomical().then(|| {
                nearest(
                    bone,
                    target
                        .iter()
                        .filter(|t| t.region == bone.region && table.is_target_open(t.id)),
                )
            });
            let (found, base) = match same_region.flatten() {
                Some(found) => (found, self.same_region_base),
                None => {
                    let Some(found) =
                        nearest(bone, target.iter().filter(|t| table.is_target_open(t.id)))
                    else {
                        continue;
                    };
                    (found, self.cross_region_base)
                }
            };

            let (target_bone, distance) = found;
            let confidence = base / (1.0 + distance);
            if table.add_or_update(BoneMapping::automatic(
                bone,
                target_bone,
                confidence,
                MappingMethod::PositionBased,
            )) {
                written += 1;
            }
        }
        written
    }
}
