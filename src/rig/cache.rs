//! Skeleton analysis cache.
//!
//! Re-walking a large avatar hierarchy on every mapping or adaptation call
//! is wasteful, so analyzed skeletons are cached per owning object. The
//! cache is an explicit object owned by a session, and the staleness check
//! is an injected [`InvalidationPolicy`].
//!
//! Population is check-then-fill: two callers missing at the same time both
//! analyze, and the last write wins. Entries are immutable `Arc` slices, so
//! a reader never observes a half-written skeleton.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::rig::analyzer::SkeletonAnalyzer;
use crate::rig::bone::BoneRecord;
use crate::scene::{NodeHandle, Scene};

/// Identity of an analyzed skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkeletonKey {
    pub scene: u32,
    pub root: NodeHandle,
    pub is_source: bool,
}

/// Cheap fingerprint of a skeleton's owning subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonFingerprint {
    pub node_count: usize,
    pub root_bone_name: Option<String>,
}

impl SkeletonFingerprint {
    /// Fingerprint of the live scene.
    #[must_use]
    pub fn of_scene(scene: &Scene, root: NodeHandle) -> Self {
        let root_bone_name = scene
            .get_node(root)
            .and_then(|n| n.children().first().copied())
            .and_then(|first| scene.get_name(first))
            .map(str::to_string);
        Self {
            node_count: scene.subtree_node_count(root),
            root_bone_name,
        }
    }
}

/// Decides whether a cached skeleton still describes the scene.
pub trait InvalidationPolicy: Send + Sync {
    fn is_valid(&self, cached: &SkeletonFingerprint, current: &SkeletonFingerprint) -> bool;
}

/// Default heuristic: same node count and same root bone name.
/// Not a full diff; renames deeper in the tree go unnoticed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCountAndRootName;

impl InvalidationPolicy for NodeCountAndRootName {
    fn is_valid(&self, cached: &SkeletonFingerprint, current: &SkeletonFingerprint) -> bool {
        cached == current
    }
}

struct CachedSkeleton {
    fingerprint: SkeletonFingerprint,
    bones: Arc<[BoneRecord]>,
}

pub struct SkeletonCache {
    entries: RwLock<FxHashMap<SkeletonKey, CachedSkeleton>>,
    policy: Box<dyn InvalidationPolicy>,
}

impl Default for SkeletonCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SkeletonCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(Box::new(NodeCountAndRootName))
    }

    #[must_use]
    pub fn with_policy(policy: Box<dyn InvalidationPolicy>) -> Self {
        Self {
            entries: RwLock::default(),
            policy,
        }
    }

    /// Cached skeleton for `root`, analyzing on a miss or stale entry.
    pub fn get_or_analyze(
        &self,
        analyzer: &SkeletonAnalyzer,
        scene: &Scene,
        root: NodeHandle,
        is_source: bool,
    ) -> Arc<[BoneRecord]> {
        let key = SkeletonKey {
            scene: scene.id,
            root,
            is_source,
        };
        let current = SkeletonFingerprint::of_scene(scene, root);

        {
            let guard = self.entries.read();
            if let Some(entry) = guard.get(&key)
                && self.policy.is_valid(&entry.fingerprint, &current)
            {
                log::debug!("Skeleton cache hit ({} bones)", entry.bones.len());
                return Arc::clone(&entry.bones);
            }
        }

        log::debug!("Skeleton cache miss, analyzing");
        let bones: Arc<[BoneRecord]> = analyzer.analyze(scene, root, is_source).into();
        self.entries.write().insert(
            key,
            CachedSkeleton {
                fingerprint: current,
                bones: Arc::clone(&bones),
            },
        );
        bones
    }

    /// Drops the entries for `root` (both sides).
    pub fn invalidate(&self, scene: &Scene, root: NodeHandle) {
        self.entries
            .write()
            .retain(|key, _| !(key.scene == scene.id && key.root == root));
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
