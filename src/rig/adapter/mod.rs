//! Skeleton Adapter
//!
//! Re-binds a garment's skinned mesh onto the avatar skeleton. Works on a
//! copy; the mesh stored in the scene is never modified here.
//!
//! # Steps
//!
//! 1. **Resolve.** Each bone slot (and the root bone) is passed through the
//!    primary resolver chain (identity, table, region, name, position) and,
//!    failing that, the fallback chain (ancestor, hips, root).
//! 2. **Bind poses.** A partial recompute refreshes only slots that were not
//!    resolved through the table or identity. A full recompute refreshes
//!    every replaced slot; it runs when any slot lands on a bone whose depth
//!    differs by more than [`AdapterConfig::depth_difference_threshold`], or
//!    when the skeletons differ structurally.
//! 3. **Weights.** Influences on fallback slots are dropped and the rest
//!    renormalized. Needs readable weight data; skipped with a warning
//!    otherwise.
//!
//! Every problem along the way degrades the result and is recorded in the
//! [`AdaptationReport`]; nothing here returns an error.

pub mod bind_pose;
pub mod resolve;
pub mod weights;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::rig::bone::{BoneIndex, BoneRecord};
use crate::rig::mapping::MappingTable;
use crate::rig::structure::has_structural_difference;
use crate::scene::{NodeHandle, Scene, SkinnedMesh, SkinnedMeshKey};

pub use bind_pose::{BindPoseUpdate, recompute_bind_poses};
pub use resolve::{BoneResolver, ResolutionKind, ResolveContext};
pub use weights::redistribute_weights;

/// Tunables of the resolver chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdapterConfig {
    /// Depth difference above which a replacement forces a full recompute.
    pub depth_difference_threshold: usize,
    /// Position resolution only considers same-region targets for bones of
    /// an anatomical region.
    pub region_gated_position: bool,
    /// Position resolution ignores targets farther than this.
    pub max_position_distance: Option<f32>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            depth_difference_threshold: 1,
            region_gated_position: true,
            max_position_distance: None,
        }
    }
}

/// Per-call switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptOptions {
    pub detect_structural_differences: bool,
    pub adjust_bind_poses: bool,
    pub redistribute_weights: bool,
}

impl Default for AdaptOptions {
    fn default() -> Self {
        Self {
            detect_structural_differences: true,
            adjust_bind_poses: true,
            redistribute_weights: true,
        }
    }
}

/// How one bone slot was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotResolution {
    pub slot: usize,
    pub original: String,
    pub replacement: Option<String>,
    pub kind: ResolutionKind,
}

/// Diagnostics of one mesh adaptation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdaptationReport {
    pub mesh_name: String,
    pub slots: Vec<SlotResolution>,
    pub root_bone: Option<ResolutionKind>,
    /// Names of bones that were not confidently resolved.
    pub unresolved_bones: Vec<String>,
    pub warnings: Vec<String>,
    pub structural_difference: bool,
    pub full_recompute: bool,
    pub recomputed_bind_poses: usize,
    pub redistributed_vertices: usize,
}

impl AdaptationReport {
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.kind.is_fallback()).count()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unresolved_bones.is_empty() && self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.warnings.push(message);
    }
}

/// A re-bound copy of a mesh.
#[derive(Debug, Clone)]
pub struct AdaptedMesh {
    pub mesh: SkinnedMesh,
    pub report: AdaptationReport,
}

pub struct SkeletonAdapter {
    config: AdapterConfig,
    primary: Vec<Box<dyn BoneResolver>>,
    fallback: Vec<Box<dyn BoneResolver>>,
}

impl Default for SkeletonAdapter {
    fn default() -> Self {
        Self::new(AdapterConfig::default())
    }
}

impl SkeletonAdapter {
    #[must_use]
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            primary: resolve::primary_chain(),
            fallback: resolve::fallback_chain(),
        }
    }

    /// Replaces the resolver chains. Resolutions from `fallback` are
    /// treated as not confidently resolved.
    #[must_use]
    pub fn with_chains(
        mut self,
        primary: Vec<Box<dyn BoneResolver>>,
        fallback: Vec<Box<dyn BoneResolver>>,
    ) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn run_chain(
        chain: &[Box<dyn BoneResolver>],
        bone: NodeHandle,
        ctx: &ResolveContext<'_>,
    ) -> Option<(NodeHandle, ResolutionKind)> {
        chain
            .iter()
            .find_map(|r| r.resolve(bone, ctx).map(|target| (target, r.kind())))
    }

    /// Adapts the mesh stored under `mesh_key` to the target skeleton.
    ///
    /// Returns `None` (with a log line) for a stale mesh key, a stale target
    /// root or an empty target skeleton.
    pub fn adapt(
        &self,
        scene: &Scene,
        mesh_key: SkinnedMeshKey,
        target_root: NodeHandle,
        source_bones: &[BoneRecord],
        target_bones: &[BoneRecord],
        table: &MappingTable,
        options: AdaptOptions,
    ) -> Option<AdaptedMesh> {
        let Some(original) = scene.skinned_mesh(mesh_key) else {
            log::warn!("Adaptation skipped: skinned mesh not found");
            return None;
        };
        if !scene.contains(target_root) || target_bones.is_empty() {
            log::warn!("Adaptation of '{}' skipped: empty target skeleton", original.name);
            return None;
        }

        let mut mesh = original.clone();
        let mut report = AdaptationReport {
            mesh_name: mesh.name.clone(),
            ..Default::default()
        };

        let mut ctx = ResolveContext {
            scene,
            target_root,
            sources: BoneIndex::new(source_bones),
            targets: BoneIndex::new(target_bones),
            table,
            config: &self.config,
            resolved: FxHashMap::default(),
        };

        // === Step 1: resolve ===
        // Primary pass over every slot first, so ancestor fallbacks can see
        // replacements of slots listed later.
        let bones = mesh.skin.bones.clone();
        let mut resolutions: Vec<Option<(NodeHandle, ResolutionKind)>> = Vec::with_capacity(bones.len());
        for &bone in &bones {
            let found = Self::run_chain(&self.primary, bone, &ctx);
            if let Some((target, _)) = found {
                ctx.resolved.insert(bone, target);
            }
            resolutions.push(found);
        }

        let mut depth_mismatch = false;
        for (slot, &bone) in bones.iter().enumerate() {
            let (replacement, kind) = match resolutions[slot] {
                Some(found) => found,
                None => Self::run_chain(&self.fallback, bone, &ctx)
                    .unwrap_or((bone, ResolutionKind::Unresolved)),
            };

            let original_name = scene.get_name(bone).unwrap_or("<missing>").to_string();
            if kind.is_fallback() {
                report.warn(format!(
                    "Bone '{original_name}' of '{}' not confidently resolved ({kind:?})",
                    mesh.name
                ));
                report.unresolved_bones.push(original_name.clone());
            }

            if kind != ResolutionKind::Identity
                && let (Some(s), Some(t)) = (ctx.sources.by_node(bone), ctx.targets.by_node(replacement))
                && s.depth().abs_diff(t.depth()) > self.config.depth_difference_threshold
            {
                depth_mismatch = true;
            }

            report.slots.push(SlotResolution {
                slot,
                original: original_name,
                replacement: scene.get_name(replacement).map(str::to_string),
                kind,
            });
            mesh.skin.bones[slot] = replacement;
        }

        if let Some(root_bone) = mesh.skin.root_bone {
            let (replacement, kind) = Self::run_chain(&self.primary, root_bone, &ctx)
                .or_else(|| Self::run_chain(&self.fallback, root_bone, &ctx))
                .unwrap_or((root_bone, ResolutionKind::Unresolved));
            mesh.skin.root_bone = Some(replacement);
            report.root_bone = Some(kind);
        }

        // === Step 2: bind poses ===
        report.structural_difference = depth_mismatch
            || (options.detect_structural_differences
                && has_structural_difference(source_bones, target_bones, table));
        report.full_recompute = report.structural_difference;

        if options.adjust_bind_poses {
            let full = report.full_recompute;
            let kinds: Vec<ResolutionKind> = report.slots.iter().map(|s| s.kind).collect();
            let update = recompute_bind_poses(
                scene,
                mesh.node,
                &mesh.skin.bones,
                &mesh.skin.inverse_bind_matrices,
                |slot| match kinds[slot] {
                    // Unchanged bones keep the pose they were bound with.
                    ResolutionKind::Identity | ResolutionKind::Unresolved => false,
                    kind => full || !kind.keeps_bind_pose(),
                },
            );
            for slot in &update.failed {
                report.warn(format!(
                    "Bind pose of slot {slot} of '{}' is degenerate, keeping the original",
                    mesh.name
                ));
            }
            report.recomputed_bind_poses = update.recomputed;
            mesh.skin.inverse_bind_matrices = update.matrices;
        }

        // === Step 3: weights ===
        let unresolved: FxHashSet<u32> = report
            .slots
            .iter()
            .filter(|s| s.kind.is_fallback())
            .map(|s| s.slot as u32)
            .collect();

        if options.redistribute_weights && !unresolved.is_empty() {
            if mesh.skin.readable_weights().is_some()
                && let Some(weights) = mesh.skin.weights.as_mut()
            {
                report.redistributed_vertices = redistribute_weights(weights, &unresolved);
            } else {
                report.warn(format!(
                    "Weights of '{}' are not readable; skipping redistribution. Enable read access on the mesh",
                    mesh.name
                ));
            }
        }

        log::info!(
            "Adapted '{}': {}/{} slots resolved, {} bind poses recomputed{}",
            mesh.name,
            report.resolved_count(),
            report.slots.len(),
            report.recomputed_bind_poses,
            if report.full_recompute { " (full)" } else { "" }
        );

        Some(AdaptedMesh { mesh, report })
    }
}
