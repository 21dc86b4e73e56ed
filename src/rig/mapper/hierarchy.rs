//! Hierarchy-based mapping.
//!
//! Scores (source, target) pairs by how well their surroundings line up:
//!
//! ```text
//! score = 0.3 * same_region
//!       + 0.4 * parent_similarity
//!       + 0.3 * children_similarity
//!       + 0.2 * sibling_similarity      clamped to [0, 1]
//! ```
//!
//! Only immediate relations are inspected (parent, direct children, direct
//! siblings). Pair selection is delegated to an [`Assignment`]; the default
//! [`GreedyAssignment`] is first-come, first-served in source order.

use crate::rig::bone::{BoneIndex, BoneRecord};
use crate::rig::mapper::{MapperConfig, MappingStrategy};
use crate::rig::mapping::{BoneMapping, MappingMethod, MappingTable};

const REGION_WEIGHT: f32 = 0.3;
const PARENT_WEIGHT: f32 = 0.4;
const CHILDREN_WEIGHT: f32 = 0.3;
const SIBLING_WEIGHT: f32 = 0.2;

/// Both skeletons indexed for scoring.
pub struct HierarchyContext<'a> {
    pub sources: BoneIndex<'a>,
    pub targets: BoneIndex<'a>,
}

impl<'a> HierarchyContext<'a> {
    #[must_use]
    pub fn new(source: &'a [BoneRecord], target: &'a [BoneRecord]) -> Self {
        Self {
            sources: BoneIndex::new(source),
            targets: BoneIndex::new(target),
        }
    }
}

/// Structural similarity of two bones in `[0, 1]`, given the mappings made
/// so far.
#[must_use]
pub fn hierarchy_similarity(
    source: &BoneRecord,
    target: &BoneRecord,
    ctx: &HierarchyContext<'_>,
    table: &MappingTable,
) -> f32 {
    let mut score = 0.0;
    if source.region == target.region && source.region.is_anatomical() {
        score += REGION_WEIGHT;
    }
    score += PARENT_WEIGHT * parent_similarity(source, target, ctx, table);
    score += CHILDREN_WEIGHT * children_similarity(source, target, ctx);
    score += SIBLING_WEIGHT * sibling_similarity(source, target, ctx, table);
    score.clamp(0.0, 1.0)
}

fn parent_similarity(
    source: &BoneRecord,
    target: &BoneRecord,
    ctx: &HierarchyContext<'_>,
    table: &MappingTable,
) -> f32 {
    match (source.is_root, target.is_root) {
        (true, true) => 0.8,
        (true, false) | (false, true) => 0.0,
        (false, false) => match (ctx.sources.parent_of(source), ctx.targets.parent_of(target)) {
            (Some(sp), Some(tp)) => {
                if table.target_of(sp.id) == Some(tp.id) {
                    0.9
                } else if sp.region == tp.region && sp.region.is_anatomical() {
                    0.6
                } else {
                    0.1
                }
            }
            _ => 0.0,
        },
    }
}

fn children_similarity(source: &BoneRecord, target: &BoneRecord, ctx: &HierarchyContext<'_>) -> f32 {
    let source_children: Vec<&BoneRecord> = ctx.sources.children_of(source).collect();
    let target_children: Vec<&BoneRecord> = ctx.targets.children_of(target).collect();

    match (source_children.is_empty(), target_children.is_empty()) {
        (true, true) => 0.8,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let matched = source_children
                .iter()
                .filter(|sc| target_children.iter().any(|tc| tc.region == sc.region))
                .count();
            matched as f32 / source_children.len() as f32
        }
    }
}

fn sibling_similarity(
    source: &BoneRecord,
    target: &BoneRecord,
    ctx: &HierarchyContext<'_>,
    table: &MappingTable,
) -> f32 {
    if source.is_root || target.is_root {
        return 0.0;
    }
    let source_siblings: Vec<&BoneRecord> = ctx.sources.siblings_of(source).collect();
    if source_siblings.is_empty() {
        return 0.0;
    }
    let target_siblings: Vec<&BoneRecord> = ctx.targets.siblings_of(target).collect();

    let matched = source_siblings
        .iter()
        .filter(|s| {
            table
                .target_of(s.id)
                .is_some_and(|t| target_siblings.iter().any(|ts| ts.id == t))
        })
        .count();
    matched as f32 / source_siblings.len() as f32
}

/// Chooses which (source, target) pairs the hierarchy pass writes.
pub trait Assignment: Send + Sync {
    /// Writes hierarchy mappings for open bones. Returns the number written.
    fn assign(&self, ctx: &HierarchyContext<'_>, table: &mut MappingTable, min_score: f32) -> usize;
}

/// Per source bone (in skeleton order), scan the open targets, keep the best
/// score and stop early on a score of at least `early_exit`. A written
/// target leaves the candidate pool, and each write is visible to the
/// scoring of later bones.
#[derive(Debug, Clone, Copy)]
pub struct GreedyAssignment {
    pub early_exit: f32,
}

impl Default for GreedyAssignment {
    fn default() -> Self {
        Self { early_exit: 0.9 }
    }
}

impl Assignment for GreedyAssignment {
    fn assign(&self, ctx: &HierarchyContext<'_>, table: &mut MappingTable, min_score: f32) -> usize {
        let mut written = 0;
        for source in ctx.sources.bones() {
            if !table.is_source_open(source.id) {
                continue;
            }

            let mut best: Option<(&BoneRecord, f32)> = None;
            for target in ctx.targets.bones() {
                if !table.is_target_open(target.id) {
                    continue;
                }
                let score = hierarchy_similarity(source, target, ctx, table);
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((target, score));
                }
                if score >= self.early_exit {
                    break;
                }
            }

            if let Some((target, score)) = best
                && score >= min_score
                && table.add_or_update(BoneMapping::automatic(
                    source,
                    target,
                    score,
                    MappingMethod::HierarchyBased,
                ))
            {
                written += 1;
            }
        }
        written
    }
}

pub struct HierarchyStrategy {
    assignment: Box<dyn Assignment>,
    min_score: f32,
}

impl HierarchyStrategy {
    #[must_use]
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            assignment: Box::new(GreedyAssignment {
                early_exit: config.hierarchy_early_exit,
            }),
            min_score: config.hierarchy_min_score,
        }
    }

    /// Replaces the pair-selection policy.
    #[must_use]
    pub fn with_assignment(mut self, assignment: Box<dyn Assignment>) -> Self {
        self.assignment = assignment;
        self
    }
}

impl MappingStrategy for HierarchyStrategy {
    fn method(&self) -> MappingMethod {
        MappingMethod::HierarchyBased
    }

    fn map(&self, table: &mut MappingTable, source: &[BoneRecord], target: &[BoneRecord]) -> usize {
        let ctx = HierarchyContext::new(source, target);
        self.assignment.assign(&ctx, table, self.min_score)
    }
}
