use rustc_hash::FxHashSet;

use crate::scene::VertexWeights;

/// Drops influences on `unresolved` bone slots and renormalizes the rest.
///
/// A dropped influence becomes `(0, 0.0)`. When every influence of a vertex
/// is dropped, the vertex is bound fully to its first slot's original bone.
/// Vertices without a dropped influence are left untouched. Returns the
/// number of vertices changed.
pub fn redistribute_weights(weights: &mut [VertexWeights], unresolved: &FxHashSet<u32>) -> usize {
    if unresolved.is_empty() {
        return 0;
    }

    let mut changed = 0;
    for vertex in weights.iter_mut() {
        let original = *vertex;
        let mut dropped = false;
        for influence in &mut vertex.influences {
            if influence.weight != 0.0 && unresolved.contains(&influence.index) {
                influence.index = 0;
                influence.weight = 0.0;
                dropped = true;
            }
        }
        if !dropped {
            continue;
        }
        changed += 1;

        let sum = vertex.sum();
        if sum > 0.0 {
            for influence in &mut vertex.influences {
                influence.weight /= sum;
            }
        } else {
            *vertex = VertexWeights::single(original.influences[0].index);
        }
    }
    changed
}
