//! Mapping Table
//!
//! The correspondence state between a source (garment) skeleton and a target
//! (avatar) skeleton: one [`BoneMapping`] per mapped source bone plus the
//! bones the user excluded on either side.
//!
//! # Write rules ([`MappingTable::add_or_update`])
//!
//! - An automatic mapping never overwrites a manual one.
//! - An automatic mapping only replaces an automatic one with strictly
//!   higher confidence.
//! - An automatic mapping never takes a target another source already holds.
//! - A manual mapping always wins and evicts any other mapping to the same
//!   target, keeping pins one-to-one.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::rig::bone::{BoneId, BoneIndex, BoneRecord};
use crate::rig::region::Region;

/// How a mapping was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingMethod {
    NotMapped,
    NameBased,
    HierarchyBased,
    PositionBased,
    Manual,
}

/// One source -> target correspondence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneMapping {
    pub source: BoneId,
    pub target: BoneId,
    /// Clamped to `[0, 1]`.
    pub confidence: f32,
    pub method: MappingMethod,
    pub manual: bool,
    /// Hierarchy paths at creation time; used to re-key stale ids.
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub target_path: String,
}

impl BoneMapping {
    /// Automatic mapping between two analyzed bones.
    #[must_use]
    pub fn automatic(
        source: &BoneRecord,
        target: &BoneRecord,
        confidence: f32,
        method: MappingMethod,
    ) -> Self {
        Self {
            source: source.id,
            target: target.id,
            confidence: clamp_confidence(confidence),
            method,
            manual: method == MappingMethod::Manual,
            source_path: source.path.clone(),
            target_path: target.path.clone(),
        }
    }

    /// User-pinned mapping. Always confidence 1.
    #[must_use]
    pub fn manual(source: &BoneRecord, target: &BoneRecord) -> Self {
        Self {
            manual: true,
            ..Self::automatic(source, target, 1.0, MappingMethod::Manual)
        }
    }

    /// Mapping from raw ids, without path information.
    #[must_use]
    pub fn from_ids(
        source: BoneId,
        target: BoneId,
        confidence: f32,
        method: MappingMethod,
        manual: bool,
    ) -> Self {
        Self {
            source,
            target,
            confidence: clamp_confidence(confidence),
            method,
            manual,
            source_path: String::new(),
            target_path: String::new(),
        }
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Mapping coverage of one source region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionCoverage {
    pub total: usize,
    pub mapped: usize,
    pub excluded: usize,
}

impl RegionCoverage {
    /// Mapped fraction of the non-excluded bones (1.0 when nothing to map).
    #[must_use]
    pub fn ratio(&self) -> f32 {
        let considered = self.total - self.excluded;
        if considered == 0 {
            1.0
        } else {
            self.mapped as f32 / considered as f32
        }
    }
}

/// Entry of the flat, name-keyed interchange list consumed by external
/// authoring tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterchangeMapping {
    pub costume_bone_id: String,
    pub avatar_bone_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingTable {
    mappings: Vec<BoneMapping>,
    excluded_sources: FxHashSet<BoneId>,
    excluded_targets: FxHashSet<BoneId>,
}

impl MappingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Writes a mapping under the table's write rules. Returns whether the
    /// table changed.
    pub fn add_or_update(&mut self, mapping: BoneMapping) -> bool {
        let existing = self.mappings.iter().position(|m| m.source == mapping.source);

        if mapping.manual {
            self.mappings
                .retain(|m| m.source == mapping.source || m.target != mapping.target);
            let existing = self.mappings.iter().position(|m| m.source == mapping.source);
            match existing {
                Some(i) => self.mappings[i] = mapping,
                None => self.mappings.push(mapping),
            }
            return true;
        }

        let target_taken = self
            .mappings
            .iter()
            .any(|m| m.target == mapping.target && m.source != mapping.source);
        if target_taken {
            return false;
        }

        match existing {
            Some(i) => {
                let current = &self.mappings[i];
                if current.manual || mapping.confidence <= current.confidence {
                    return false;
                }
                self.mappings[i] = mapping;
                true
            }
            None => {
                self.mappings.push(mapping);
                true
            }
        }
    }

    /// Pins `source -> target` manually.
    pub fn set_manual(&mut self, source: &BoneRecord, target: &BoneRecord) {
        self.add_or_update(BoneMapping::manual(source, target));
    }

    /// Removes the mapping of a source bone. Returns the removed mapping.
    pub fn remove_mapping(&mut self, source: BoneId) -> Option<BoneMapping> {
        let i = self.mappings.iter().position(|m| m.source == source)?;
        Some(self.mappings.remove(i))
    }

    /// Drops every automatic mapping, keeping manual pins and exclusions.
    pub fn clear_automatic(&mut self) {
        self.mappings.retain(|m| m.manual);
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
        self.excluded_sources.clear();
        self.excluded_targets.clear();
    }

    // ========================================================================
    // Exclusions
    // ========================================================================

    /// Excludes a source bone and drops its mapping.
    pub fn exclude_source(&mut self, id: BoneId) {
        self.excluded_sources.insert(id);
        self.remove_mapping(id);
    }

    /// Excludes a target bone and drops any mapping onto it.
    pub fn exclude_target(&mut self, id: BoneId) {
        self.excluded_targets.insert(id);
        self.mappings.retain(|m| m.target != id);
    }

    pub fn include_source(&mut self, id: BoneId) {
        self.excluded_sources.remove(&id);
    }

    pub fn include_target(&mut self, id: BoneId) {
        self.excluded_targets.remove(&id);
    }

    #[must_use]
    pub fn is_source_excluded(&self, id: BoneId) -> bool {
        self.excluded_sources.contains(&id)
    }

    #[must_use]
    pub fn is_target_excluded(&self, id: BoneId) -> bool {
        self.excluded_targets.contains(&id)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// source -> target
    #[must_use]
    pub fn mapping_for_source(&self, source: BoneId) -> Option<&BoneMapping> {
        self.mappings.iter().find(|m| m.source == source)
    }

    /// target -> source
    #[must_use]
    pub fn mapping_for_target(&self, target: BoneId) -> Option<&BoneMapping> {
        self.mappings.iter().find(|m| m.target == target)
    }

    #[must_use]
    pub fn target_of(&self, source: BoneId) -> Option<BoneId> {
        self.mapping_for_source(source).map(|m| m.target)
    }

    #[must_use]
    pub fn source_of(&self, target: BoneId) -> Option<BoneId> {
        self.mapping_for_target(target).map(|m| m.source)
    }

    #[must_use]
    pub fn is_source_mapped(&self, source: BoneId) -> bool {
        self.mapping_for_source(source).is_some()
    }

    #[must_use]
    pub fn is_target_mapped(&self, target: BoneId) -> bool {
        self.mapping_for_target(target).is_some()
    }

    /// Source bone still open for automatic mapping.
    #[must_use]
    pub fn is_source_open(&self, source: BoneId) -> bool {
        !self.is_source_mapped(source) && !self.is_source_excluded(source)
    }

    /// Target bone still open for automatic mapping.
    #[must_use]
    pub fn is_target_open(&self, target: BoneId) -> bool {
        !self.is_target_mapped(target) && !self.is_target_excluded(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoneMapping> {
        self.mappings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Per-region coverage of the source skeleton.
    #[must_use]
    pub fn region_coverage(&self, source_bones: &[BoneRecord]) -> BTreeMap<Region, RegionCoverage> {
        let mut coverage: BTreeMap<Region, RegionCoverage> = BTreeMap::new();
        for bone in source_bones {
            let entry = coverage.entry(bone.region).or_default();
            entry.total += 1;
            if self.is_source_excluded(bone.id) {
                entry.excluded += 1;
            } else if self.is_source_mapped(bone.id) {
                entry.mapped += 1;
            }
        }
        coverage
    }

    // ========================================================================
    // Re-keying
    // ========================================================================

    /// Re-keys the table against freshly analyzed skeletons.
    ///
    /// A mapping whose ids still exist is kept. A mapping with a stale id is
    /// re-keyed through its recorded path when a bone with that path exists,
    /// and dropped otherwise. Stale exclusions are dropped. Returns the
    /// number of mappings dropped.
    pub fn update_bone_references(
        &mut self,
        source_bones: &[BoneRecord],
        target_bones: &[BoneRecord],
    ) -> usize {
        let sources = BoneIndex::new(source_bones);
        let targets = BoneIndex::new(target_bones);
        let by_path = |bones: &[BoneRecord], path: &str| {
            (!path.is_empty())
                .then(|| bones.iter().find(|b| b.path == path))
                .flatten()
                .map(|b| b.id)
        };

        let before = self.mappings.len();
        let mut kept: Vec<BoneMapping> = Vec::with_capacity(before);
        for mut mapping in std::mem::take(&mut self.mappings) {
            if !sources.contains(mapping.source) {
                match by_path(source_bones, &mapping.source_path) {
                    Some(id) => mapping.source = id,
                    None => continue,
                }
            }
            if !targets.contains(mapping.target) {
                match by_path(target_bones, &mapping.target_path) {
                    Some(id) => mapping.target = id,
                    None => continue,
                }
            }
            if kept
                .iter()
                .any(|m| m.source == mapping.source || m.target == mapping.target)
            {
                continue;
            }
            kept.push(mapping);
        }
        self.mappings = kept;

        self.excluded_sources.retain(|id| sources.contains(*id));
        self.excluded_targets.retain(|id| targets.contains(*id));

        let dropped = before - self.mappings.len();
        if dropped > 0 {
            log::info!("Dropped {dropped} stale bone mappings");
        }
        dropped
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Name-keyed `costume bone -> avatar bone` list for external tools.
    /// Mappings whose bones are missing from either list are skipped.
    #[must_use]
    pub fn to_interchange(
        &self,
        source_bones: &[BoneRecord],
        target_bones: &[BoneRecord],
    ) -> Vec<InterchangeMapping> {
        let sources = BoneIndex::new(source_bones);
        let targets = BoneIndex::new(target_bones);
        self.mappings
            .iter()
            .filter_map(|m| {
                Some(InterchangeMapping {
                    costume_bone_id: sources.get(m.source)?.name.clone(),
                    avatar_bone_id: targets.get(m.target)?.name.clone(),
                })
            })
            .collect()
    }
}

/// Persistence collaborator for mapping tables (file store, project
/// database). Implemented by the host.
pub trait MappingStore {
    fn save(&mut self, table: &MappingTable) -> Result<()>;
    fn load(&mut self) -> Result<Option<MappingTable>>;
}
