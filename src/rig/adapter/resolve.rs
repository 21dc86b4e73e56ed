//! Bone replacement resolvers.
//!
//! Each resolver answers one question: "which target bone should replace
//! this garment bone?". The adapter runs them in order and stops at the
//! first answer.

use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::rig::adapter::AdapterConfig;
use crate::rig::bone::{BoneIndex, BoneRecord};
use crate::rig::mapping::MappingTable;
use crate::rig::naming::normalize_bone_name;
use crate::rig::region::Region;
use crate::scene::{NodeHandle, Scene};

/// Which step of the chain produced a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionKind {
    /// The bone already belongs to the target skeleton.
    Identity,
    Table,
    Region,
    Name,
    Position,
    Ancestor,
    Hips,
    Root,
    /// Nothing resolved; the slot keeps its original bone.
    Unresolved,
}

impl ResolutionKind {
    /// Ancestor, hip, root and failed resolutions: the slot is not
    /// confidently resolved and its weights are redistributed.
    #[must_use]
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Ancestor | Self::Hips | Self::Root | Self::Unresolved)
    }

    /// Slots whose bind pose survives a partial recompute.
    #[must_use]
    pub fn keeps_bind_pose(self) -> bool {
        matches!(self, Self::Identity | Self::Table)
    }
}

/// Everything a resolver may consult.
pub struct ResolveContext<'a> {
    pub scene: &'a Scene,
    pub target_root: NodeHandle,
    pub sources: BoneIndex<'a>,
    pub targets: BoneIndex<'a>,
    pub table: &'a MappingTable,
    pub config: &'a AdapterConfig,
    /// Replacements found so far for this mesh, keyed by original bone.
    pub resolved: FxHashMap<NodeHandle, NodeHandle>,
}

impl ResolveContext<'_> {
    fn source_record(&self, bone: NodeHandle) -> Option<&BoneRecord> {
        self.sources.by_node(bone)
    }

    fn bone_name(&self, bone: NodeHandle) -> Option<&str> {
        self.source_record(bone)
            .map(|b| b.name.as_str())
            .or_else(|| self.scene.get_name(bone))
    }

    fn region_of(&self, bone: NodeHandle) -> Region {
        self.source_record(bone).map_or(Region::Unknown, |b| b.region)
    }

    /// Target bones not excluded by the user.
    fn candidates(&self) -> impl Iterator<Item = &BoneRecord> {
        self.targets
            .bones()
            .iter()
            .filter(|t| !self.table.is_target_excluded(t.id))
    }
}

/// One step of the replacement chain.
pub trait BoneResolver: Send + Sync {
    fn kind(&self) -> ResolutionKind;
    fn resolve(&self, bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle>;
}

/// A bone of the target skeleton replaces itself.
pub struct IdentityResolver;

impl BoneResolver for IdentityResolver {
    fn kind(&self) -> ResolutionKind {
        ResolutionKind::Identity
    }

    fn resolve(&self, bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle> {
        let in_target = ctx.targets.by_node(bone).is_some() && ctx.sources.by_node(bone).is_none();
        in_target.then_some(bone)
    }
}

/// Mapping table lookup.
pub struct TableResolver;

impl BoneResolver for TableResolver {
    fn kind(&self) -> ResolutionKind {
        ResolutionKind::Table
    }

    fn resolve(&self, bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle> {
        let source = ctx.source_record(bone)?;
        let target = ctx.table.target_of(source.id)?;
        ctx.targets.get(target).map(|t| t.node)
    }
}

/// First target bone of the same anatomical region.
pub struct RegionResolver;

impl BoneResolver for RegionResolver {
    fn kind(&self) -> ResolutionKind {
        ResolutionKind::Region
    }

    fn resolve(&self, bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle> {
        let region = ctx.region_of(bone);
        if !region.is_anatomical() {
            return None;
        }
        ctx.candidates().find(|t| t.region == region).map(|t| t.node)
    }
}

/// Exact, then compact, name match under the target root.
pub struct NameResolver;

impl BoneResolver for NameResolver {
    fn kind(&self) -> ResolutionKind {
        ResolutionKind::Name
    }

    fn resolve(&self, bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle> {
        let name = ctx.bone_name(bone)?;
        if let Some(t) = ctx.candidates().find(|t| t.name == name) {
            return Some(t.node);
        }
        // Non-bone helpers under the target root still count for exact names.
        if let Some(node) = ctx.scene.find_node_by_name(ctx.target_root, name)
            && node != bone
            && node != ctx.target_root
            && ctx.sources.by_node(node).is_none()
        {
            return Some(node);
        }
        let compact = normalize_bone_name(name);
        if compact.is_empty() {
            return None;
        }
        ctx.candidates()
            .find(|t| normalize_bone_name(&t.name) == compact)
            .map(|t| t.node)
    }
}

/// Nearest target bone in world space.
///
/// With [`AdapterConfig::region_gated_position`], a bone of an anatomical
/// region only considers targets of that region.
pub struct PositionResolver;

impl BoneResolver for PositionResolver {
    fn kind(&self) -> ResolutionKind {
        ResolutionKind::Position
    }

    fn resolve(&self, bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle> {
        let position: Vec3 = ctx
            .source_record(bone)
            .map_or_else(|| ctx.scene.world_position(bone), |b| b.world_position);
        let region = ctx.region_of(bone);
        let gated = ctx.config.region_gated_position && region.is_anatomical();

        let mut best: Option<(NodeHandle, f32)> = None;
        for target in ctx.candidates() {
            if gated && target.region != region {
                continue;
            }
            let d = position.distance(target.world_position);
            if ctx.config.max_position_distance.is_some_and(|max| d > max) {
                continue;
            }
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((target.node, d));
            }
        }
        best.map(|(node, _)| node)
    }
}

/// Replacement of the nearest ancestor that already has one.
pub struct AncestorResolver;

impl BoneResolver for AncestorResolver {
    fn kind(&self) -> ResolutionKind {
        ResolutionKind::Ancestor
    }

    fn resolve(&self, bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle> {
        let mut cursor = ctx.scene.get_node(bone).and_then(|n| n.parent());
        while let Some(ancestor) = cursor {
            if let Some(&replacement) = ctx.resolved.get(&ancestor) {
                return Some(replacement);
            }
            if let Some(replacement) = TableResolver.resolve(ancestor, ctx) {
                return Some(replacement);
            }
            cursor = ctx.scene.get_node(ancestor).and_then(|n| n.parent());
        }
        None
    }
}

/// The target skeleton's hip bone.
pub struct HipsResolver;

impl BoneResolver for HipsResolver {
    fn kind(&self) -> ResolutionKind {
        ResolutionKind::Hips
    }

    fn resolve(&self, _bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle> {
        ctx.targets
            .bones()
            .iter()
            .find(|t| t.region == Region::Hips)
            .map(|t| t.node)
    }
}

/// The target skeleton's top bone: the first root that is neither an
/// armature container nor mesh payload, else the first parentless bone.
pub struct RootResolver;

impl BoneResolver for RootResolver {
    fn kind(&self) -> ResolutionKind {
        ResolutionKind::Root
    }

    fn resolve(&self, _bone: NodeHandle, ctx: &ResolveContext<'_>) -> Option<NodeHandle> {
        let bones = ctx.targets.bones();
        bones
            .iter()
            .find(|t| {
                t.is_root
                    && ctx
                        .scene
                        .get_node(t.node)
                        .is_some_and(|n| !n.armature && !n.renderable)
            })
            .or_else(|| bones.iter().find(|t| t.parent.is_none()))
            .or_else(|| bones.first())
            .map(|t| t.node)
    }
}

/// Resolvers that count as confident answers, in chain order.
#[must_use]
pub fn primary_chain() -> Vec<Box<dyn BoneResolver>> {
    vec![
        Box::new(IdentityResolver),
        Box::new(TableResolver),
        Box::new(RegionResolver),
        Box::new(NameResolver),
        Box::new(PositionResolver),
    ]
}

/// Last-resort resolvers, in chain order.
#[must_use]
pub fn fallback_chain() -> Vec<Box<dyn BoneResolver>> {
    vec![
        Box::new(AncestorResolver),
        Box::new(HipsResolver),
        Box::new(RootResolver),
    ]
}
