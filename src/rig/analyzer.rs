//! Skeleton Analyzer
//!
//! Flattens a scene subtree into [`BoneRecord`]s:
//!
//! 1. Every bone referenced by a skin binding under the root (root bone and
//!    bone array) is a skeleton member, wherever it sits.
//! 2. The rest of the hierarchy is walked. On the garment side, nodes
//!    carrying renderable geometry are mesh payload, not bones, but their
//!    children are walked. On the avatar side every node is recorded.
//! 3. Parent/child links are established between recorded bones, skipping
//!    over non-recorded intermediate nodes.
//! 4. Every record is classified, preferring the humanoid slot when the root
//!    exposes a humanoid binding.
//!
//! The analyzed root itself is the owning object, not a bone. Analysis never
//! mutates the scene.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::rig::bone::{BoneId, BoneRecord};
use crate::rig::classifier::RegionClassifier;
use crate::rig::region::Region;
use crate::scene::{NodeHandle, Scene};

pub struct SkeletonAnalyzer {
    classifier: Arc<RegionClassifier>,
}

impl SkeletonAnalyzer {
    #[must_use]
    pub fn new(classifier: Arc<RegionClassifier>) -> Self {
        Self { classifier }
    }

    #[must_use]
    pub fn classifier(&self) -> &RegionClassifier {
        &self.classifier
    }

    /// Analyzes the skeleton owned by `root`.
    ///
    /// `is_source` marks the garment side, where renderable nodes that no
    /// skin binding references are skipped. A stale or childless root yields
    /// an empty list.
    #[must_use]
    pub fn analyze(&self, scene: &Scene, root: NodeHandle, is_source: bool) -> Vec<BoneRecord> {
        let label = if is_source { "source" } else { "target" };
        let Some(root_node) = scene.get_node(root) else {
            log::warn!("Skeleton analysis skipped: {label} root is not in the scene");
            return Vec::new();
        };
        if root_node.children().is_empty() {
            log::debug!("Skeleton analysis of '{}' ({label}): no children", root_node.name);
            return Vec::new();
        }

        // === Step 1: skin-bound bones ===
        let mut members: FxHashSet<NodeHandle> = FxHashSet::default();
        for key in scene.skinned_meshes_under(root) {
            let Some(mesh) = scene.skinned_mesh(key) else {
                continue;
            };
            for &bone in mesh.skin.root_bone.iter().chain(mesh.skin.bones.iter()) {
                if bone != root && scene.is_descendant_of(bone, root) {
                    members.insert(bone);
                }
            }
        }

        // === Step 2: hierarchy walk (pre-order keeps parents first) ===
        let order: Vec<NodeHandle> = scene
            .subtree(root)
            .into_iter()
            .skip(1)
            .filter(|&h| {
                !is_source
                    || members.contains(&h)
                    || scene.get_node(h).is_some_and(|n| !n.renderable)
            })
            .collect();
        let recorded: FxHashSet<NodeHandle> = order.iter().copied().collect();

        // === Step 3: links ===
        let humanoid = scene.humanoid_binding(root);
        let mut bones: Vec<BoneRecord> = Vec::with_capacity(order.len());
        let mut index_of: FxHashMap<NodeHandle, usize> = FxHashMap::default();

        for &handle in &order {
            let node = &scene.nodes[handle];

            // Nearest recorded ancestor below the analyzed root.
            let mut parent = None;
            let mut parent_is_armature = false;
            let mut cursor = node.parent();
            while let Some(p) = cursor {
                if p == root {
                    break;
                }
                if recorded.contains(&p) {
                    parent = Some(p);
                    parent_is_armature = scene.nodes[p].armature;
                    break;
                }
                cursor = scene.nodes.get(p).and_then(|n| n.parent());
            }

            let path = match parent.and_then(|p| index_of.get(&p)) {
                Some(&pi) => format!("{}/{}", bones[pi].path, node.name),
                None => node.name.clone(),
            };

            let id = BoneId::from(handle);
            if let Some(&pi) = parent.and_then(|p| index_of.get(&p)) {
                bones[pi].children.push(id);
            }

            index_of.insert(handle, bones.len());
            bones.push(BoneRecord {
                id,
                name: node.name.clone(),
                path,
                region: Region::Unknown,
                local: node.transform,
                world_position: scene.world_position(handle),
                parent: parent.map(BoneId::from),
                children: SmallVec::new(),
                is_root: parent.is_none() || parent_is_armature,
                humanoid_slot: humanoid.and_then(|h| h.slot_of(handle)).map(str::to_string),
                node: handle,
            });
        }

        // === Step 4: classification ===
        for bone in &mut bones {
            bone.region = self
                .classifier
                .classify(&bone.name, bone.humanoid_slot.as_deref());
        }

        log::debug!(
            "Analyzed {label} skeleton '{}': {} bones ({} skin-bound)",
            root_node.name,
            bones.len(),
            members.len()
        );
        bones
    }
}
