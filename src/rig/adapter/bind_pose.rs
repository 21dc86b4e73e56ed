use glam::Affine3A;

use crate::scene::skin::inverse_bind_matrix;
use crate::scene::{NodeHandle, Scene};

/// Result of a bind-pose recompute over one mesh.
#[derive(Debug, Clone)]
pub struct BindPoseUpdate {
    pub matrices: Vec<Affine3A>,
    pub recomputed: usize,
    /// Slots whose matrix could not be inverted and kept the original.
    pub failed: Vec<usize>,
}

/// Recomputes inverse bind matrices for the slots selected by `recompute`.
///
/// New matrix: `invert(mesh_world_to_local * bone_local_to_world)`, taken
/// from the current scene pose. A degenerate slot keeps its original matrix
/// (identity when the mesh had none for that slot).
pub fn recompute_bind_poses(
    scene: &Scene,
    mesh_node: NodeHandle,
    bones: &[NodeHandle],
    original: &[Affine3A],
    recompute: impl Fn(usize) -> bool,
) -> BindPoseUpdate {
    let mesh_world = scene.world_matrix(mesh_node);
    let mut update = BindPoseUpdate {
        matrices: Vec::with_capacity(bones.len()),
        recomputed: 0,
        failed: Vec::new(),
    };

    for (slot, &bone) in bones.iter().enumerate() {
        let previous = original.get(slot).copied().unwrap_or(Affine3A::IDENTITY);
        if !recompute(slot) {
            update.matrices.push(previous);
            continue;
        }
        match inverse_bind_matrix(mesh_world, scene.world_matrix(bone)) {
            Some(ibm) => {
                update.matrices.push(ibm);
                update.recomputed += 1;
            }
            None => {
                update.matrices.push(previous);
                update.failed.push(slot);
            }
        }
    }
    update
}
