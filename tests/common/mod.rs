//! Shared rig builders for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use glam::Vec3;
use myth_retarget::rig::{BoneRecord, RegionClassifier, SkeletonAnalyzer};
use myth_retarget::scene::skin::inverse_bind_matrix;
use myth_retarget::scene::{
    NodeHandle, Scene, SkinBinding, SkinnedMesh, SkinnedMeshKey, VertexWeights,
};
use rustc_hash::FxHashMap;

pub const EPSILON: f32 = 1e-5;

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A rig root plus its bones by name.
pub struct Rig {
    pub root: NodeHandle,
    pub bones: FxHashMap<String, NodeHandle>,
}

impl Rig {
    pub fn bone(&self, name: &str) -> NodeHandle {
        self.bones[name]
    }
}

/// Builds `root_name` with bones given as `(name, parent, local position)`.
/// A `None` parent places the bone directly under the root.
pub fn build_rig(
    scene: &mut Scene,
    root_name: &str,
    bones: &[(&str, Option<&str>, [f32; 3])],
) -> Rig {
    let root = scene.create_node(root_name);
    let mut map: FxHashMap<String, NodeHandle> = FxHashMap::default();
    for &(name, parent, [x, y, z]) in bones {
        let parent = parent.map_or(root, |p| map[p]);
        let handle = scene
            .build_node(name)
            .with_position(x, y, z)
            .with_parent(parent)
            .build();
        map.insert(name.to_string(), handle);
    }
    Rig { root, bones: map }
}

/// Adds a renderable mesh node under the rig root, skinned to `bone_names`
/// in their current pose. The first listed bone is the root bone.
pub fn bind_mesh(
    scene: &mut Scene,
    rig: &Rig,
    mesh_name: &str,
    bone_names: &[&str],
    weights: Vec<VertexWeights>,
) -> SkinnedMeshKey {
    let node = scene
        .build_node(mesh_name)
        .renderable()
        .with_parent(rig.root)
        .build();
    let mesh_world = scene.world_matrix(node);
    let bones: Vec<NodeHandle> = bone_names.iter().map(|n| rig.bone(n)).collect();
    let ibms = bones
        .iter()
        .map(|&b| inverse_bind_matrix(mesh_world, scene.world_matrix(b)).unwrap())
        .collect();
    let skin = SkinBinding::new(bones.first().copied(), bones, ibms).with_weights(weights);
    scene.add_skinned_mesh(SkinnedMesh::new(mesh_name, node, skin))
}

pub fn analyzer() -> SkeletonAnalyzer {
    SkeletonAnalyzer::new(Arc::new(RegionClassifier::default()))
}

pub fn find<'a>(bones: &'a [BoneRecord], name: &str) -> &'a BoneRecord {
    bones
        .iter()
        .find(|b| b.name == name)
        .unwrap_or_else(|| panic!("bone '{name}' not analyzed"))
}

/// `Hips -> Spine -> Chest -> Head`
pub const SHORT_SPINE: &[(&str, Option<&str>, [f32; 3])] = &[
    ("Hips", None, [0.0, 1.0, 0.0]),
    ("Spine", Some("Hips"), [0.0, 0.1, 0.0]),
    ("Chest", Some("Spine"), [0.0, 0.2, 0.0]),
    ("Head", Some("Chest"), [0.0, 0.3, 0.0]),
];

/// `Hips -> Spine1 -> Spine2 -> Chest -> Neck -> Head`
pub const LONG_SPINE: &[(&str, Option<&str>, [f32; 3])] = &[
    ("Hips", None, [0.0, 1.0, 0.0]),
    ("Spine1", Some("Hips"), [0.0, 0.1, 0.0]),
    ("Spine2", Some("Spine1"), [0.0, 0.1, 0.0]),
    ("Chest", Some("Spine2"), [0.0, 0.1, 0.0]),
    ("Neck", Some("Chest"), [0.0, 0.15, 0.0]),
    ("Head", Some("Neck"), [0.0, 0.1, 0.0]),
];

/// Torso plus a left arm down to the hand.
pub const LEFT_ARM: &[(&str, Option<&str>, [f32; 3])] = &[
    ("Hips", None, [0.0, 1.0, 0.0]),
    ("Spine", Some("Hips"), [0.0, 0.1, 0.0]),
    ("Chest", Some("Spine"), [0.0, 0.2, 0.0]),
    ("LeftUpperArm", Some("Chest"), [0.2, 0.1, 0.0]),
    ("LeftLowerArm", Some("LeftUpperArm"), [0.25, 0.0, 0.0]),
    ("LeftHand", Some("LeftLowerArm"), [0.25, 0.0, 0.0]),
];
