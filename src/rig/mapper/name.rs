use crate::rig::bone::BoneRecord;
use crate::rig::mapper::{MapperConfig, MappingStrategy};
use crate::rig::mapping::{BoneMapping, MappingMethod, MappingTable};
use crate::rig::naming::{detect_side, normalize_bone_name};
use crate::rig::region::Side;

/// Exact or substring match of compact bone names.
///
/// Exact matches score 1.0. Substring matches (either name containing the
/// other) score [`MapperConfig::substring_confidence`], require the shorter
/// name to be at least [`MapperConfig::min_substring_len`] long and must
/// agree on side: a sided source only matches a target of the same side or
/// an unsided one. Among substring matches the smallest length difference
/// wins, then target order.
pub struct NameStrategy {
    substring_confidence: f32,
    min_substring_len: usize,
}

impl NameStrategy {
    #[must_use]
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            substring_confidence: config.substring_confidence,
            min_substring_len: config.min_substring_len,
        }
    }

    fn exact_match<'t>(
        compact: &str,
        candidates: &[(&'t BoneRecord, String, Side)],
        table: &MappingTable,
    ) -> Option<&'t BoneRecord> {
        candidates
            .iter()
            .find(|(t, name, _)| name == compact && table.is_target_open(t.id))
            .map(|(t, _, _)| *t)
    }

    fn substring_match<'t>(
        &self,
        source: &BoneRecord,
        compact: &str,
        candidates: &[(&'t BoneRecord, String, Side)],
        table: &MappingTable,
    ) -> Option<&'t BoneRecord> {
        let side = detect_side(&source.name);
        candidates
            .iter()
            .filter(|(t, _, _)| table.is_target_open(t.id))
            .filter(|(_, name, target_side)| {
                let shorter = name.len().min(compact.len());
                shorter >= self.min_substring_len
                    && (name.contains(compact) || compact.contains(name.as_str()))
                    && sides_agree(side, *target_side)
            })
            .min_by_key(|(_, name, _)| name.len().abs_diff(compact.len()))
            .map(|(t, _, _)| *t)
    }
}

fn sides_agree(source: Side, target: Side) -> bool {
    source == target || source == Side::Center || target == Side::Center
}

impl MappingStrategy for NameStrategy {
    fn method(&self) -> MappingMethod {
        MappingMethod::NameBased
    }

    fn map(&self, table: &mut MappingTable, source: &[BoneRecord], target: &[BoneRecord]) -> usize {
        let candidates: Vec<(&BoneRecord, String, Side)> = target
            .iter()
            .map(|t| (t, normalize_bone_name(&t.name), detect_side(&t.name)))
            .collect();
        let names: Vec<String> = source.iter().map(|b| normalize_bone_name(&b.name)).collect();

        let mut written = 0;
        // Exact names claim their targets before any substring match runs.
        for (bone, compact) in source.iter().zip(&names) {
            if compact.is_empty() || !table.is_source_open(bone.id) {
                continue;
            }
            if let Some(target) = Self::exact_match(compact, &candidates, table)
                && table.add_or_update(BoneMapping::automatic(
                    bone,
                    target,
                    1.0,
                    MappingMethod::NameBased,
                ))
            {
                written += 1;
            }
        }

        for (bone, compact) in source.iter().zip(&names) {
            if compact.is_empty() || !table.is_source_open(bone.id) {
                continue;
            }
            if let Some(target) = self.substring_match(bone, compact, &candidates, table)
                && table.add_or_update(BoneMapping::automatic(
                    bone,
                    target,
                    self.substring_confidence,
                    MappingMethod::NameBased,
                ))
            {
                written += 1;
            }
        }
        written
    }
}
