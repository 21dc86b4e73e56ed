use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::{Key, KeyData};
use smallvec::SmallVec;

use crate::rig::region::Region;
use crate::scene::{NodeHandle, Transform};

/// Identifier of a bone record.
///
/// Derived from the scene node key, so it stays stable for as long as the
/// node lives. Records from different scenes may collide; ids are only
/// meaningful together with the skeleton they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneId(pub u64);

impl From<NodeHandle> for BoneId {
    fn from(handle: NodeHandle) -> Self {
        Self(handle.data().as_ffi())
    }
}

impl BoneId {
    /// The node handle this id was derived from.
    #[must_use]
    pub fn node_handle(self) -> NodeHandle {
        NodeHandle::from(KeyData::from_ffi(self.0))
    }
}

/// One bone of an analyzed skeleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneRecord {
    pub id: BoneId,
    pub name: String,
    /// Slash-joined names from the skeleton's top down to this bone.
    pub path: String,
    pub region: Region,
    /// Local transform at analysis time.
    pub local: Transform,
    /// World-space position at analysis time.
    pub world_position: Vec3,
    pub parent: Option<BoneId>,
    pub children: SmallVec<[BoneId; 4]>,
    /// No parent inside the skeleton, or parent is the rig's armature object.
    pub is_root: bool,
    /// Standard humanoid slot this bone fills, if the rig exposes one.
    pub humanoid_slot: Option<String>,

    /// Live scene handle. Not persisted.
    #[serde(skip)]
    pub node: NodeHandle,
}

impl BoneRecord {
    /// Hierarchy depth: number of segments in the path (a skeleton root
    /// directly under the analyzed object has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|s| !s.is_empty()).count()
    }

    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_humanoid(&self) -> bool {
        self.humanoid_slot.is_some()
    }
}

/// Id and node lookups over a bone list.
#[derive(Debug)]
pub struct BoneIndex<'a> {
    bones: &'a [BoneRecord],
    by_id: FxHashMap<BoneId, usize>,
    by_node: FxHashMap<NodeHandle, usize>,
}

impl<'a> BoneIndex<'a> {
    #[must_use]
    pub fn new(bones: &'a [BoneRecord]) -> Self {
        let mut by_id = FxHashMap::default();
        let mut by_node = FxHashMap::default();
        for (i, bone) in bones.iter().enumerate() {
            by_id.insert(bone.id, i);
            by_node.insert(bone.node, i);
        }
        Self {
            bones,
            by_id,
            by_node,
        }
    }

    #[must_use]
    pub fn get(&self, id: BoneId) -> Option<&'a BoneRecord> {
        self.by_id.get(&id).map(|&i| &self.bones[i])
    }

    #[must_use]
    pub fn by_node(&self, node: NodeHandle) -> Option<&'a BoneRecord> {
        self.by_node.get(&node).map(|&i| &self.bones[i])
    }

    #[must_use]
    pub fn contains(&self, id: BoneId) -> bool {
        self.by_id.contains_key(&id)
    }

    #[must_use]
    pub fn parent_of(&self, bone: &BoneRecord) -> Option<&'a BoneRecord> {
        bone.parent.and_then(|p| self.get(p))
    }

    /// Other children of the bone's parent. Roots have no siblings.
    pub fn siblings_of<'s>(&'s self, bone: &'s BoneRecord) -> impl Iterator<Item = &'a BoneRecord> + 's {
        let own = bone.id;
        self.parent_of(bone)
            .into_iter()
            .flat_map(|p| p.children.iter())
            .filter(move |&&c| c != own)
            .filter_map(move |&c| self.get(c))
    }

    pub fn children_of<'s>(&'s self, bone: &'s BoneRecord) -> impl Iterator<Item = &'a BoneRecord> + 's {
        bone.children.iter().filter_map(move |&c| self.get(c))
    }

    #[must_use]
    pub fn bones(&self) -> &'a [BoneRecord] {
        self.bones
    }
}
