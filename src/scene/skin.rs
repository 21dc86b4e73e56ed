use glam::Affine3A;

use crate::scene::NodeHandle;

/// Determinant magnitude below which a bind transform is treated as degenerate.
pub const DEGENERATE_DETERMINANT: f32 = 1e-8;

/// A single (bone slot, weight) influence on a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoneWeight {
    /// Index into the owning [`SkinBinding::bones`] array.
    pub index: u32,
    pub weight: f32,
}

/// Up to four bone influences on one vertex. Weights sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexWeights {
    pub influences: [BoneWeight; 4],
}

impl VertexWeights {
    #[must_use]
    pub fn new(pairs: [(u32, f32); 4]) -> Self {
        Self {
            influences: pairs.map(|(index, weight)| BoneWeight { index, weight }),
        }
    }

    /// Single full-weight influence on `index`.
    #[must_use]
    pub fn single(index: u32) -> Self {
        Self::new([(index, 1.0), (0, 0.0), (0, 0.0), (0, 0.0)])
    }

    #[must_use]
    pub fn sum(&self) -> f32 {
        self.influences.iter().map(|i| i.weight).sum()
    }

    #[must_use]
    pub fn pairs(&self) -> [(u32, f32); 4] {
        self.influences.map(|i| (i.index, i.weight))
    }
}

/// Skin binding of a mesh: bone references parallel to inverse bind matrices,
/// plus optional per-vertex weights.
///
/// `bones[i]` corresponds to `inverse_bind_matrices[i]` and to influence
/// index `i` in the vertex weights.
#[derive(Debug, Clone)]
pub struct SkinBinding {
    pub root_bone: Option<NodeHandle>,
    pub bones: Vec<NodeHandle>,
    pub inverse_bind_matrices: Vec<Affine3A>,

    /// CPU-side weights. `None` when the asset was loaded without them.
    pub weights: Option<Vec<VertexWeights>>,
    /// Whether the CPU-side weights may be read back (import setting of the
    /// host asset pipeline). Unreadable weights are never touched.
    pub weights_readable: bool,
}

impl SkinBinding {
    #[must_use]
    pub fn new(
        root_bone: Option<NodeHandle>,
        bones: Vec<NodeHandle>,
        inverse_bind_matrices: Vec<Affine3A>,
    ) -> Self {
        Self {
            root_bone,
            bones,
            inverse_bind_matrices,
            weights: None,
            weights_readable: true,
        }
    }

    #[must_use]
    pub fn with_weights(mut self, weights: Vec<VertexWeights>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Readable weight data, if present and accessible.
    #[must_use]
    pub fn readable_weights(&self) -> Option<&[VertexWeights]> {
        if self.weights_readable {
            self.weights.as_deref()
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }
}

/// A skinned mesh instance attached to a scene node.
#[derive(Debug, Clone)]
pub struct SkinnedMesh {
    pub name: String,
    /// Node the mesh renderer lives on; its world matrix defines mesh space.
    pub node: NodeHandle,
    pub skin: SkinBinding,
}

impl SkinnedMesh {
    #[must_use]
    pub fn new(name: &str, node: NodeHandle, skin: SkinBinding) -> Self {
        Self {
            name: name.to_string(),
            node,
            skin,
        }
    }
}

/// Inverse bind matrix of a bone for a mesh:
/// `invert(mesh_world_to_local * bone_local_to_world)`.
///
/// Returns `None` when the combined transform is degenerate or non-finite.
#[must_use]
pub fn inverse_bind_matrix(mesh_world: Affine3A, bone_world: Affine3A) -> Option<Affine3A> {
    let mesh_inv = invert_affine(mesh_world)?;
    invert_affine(mesh_inv * bone_world)
}

fn invert_affine(m: Affine3A) -> Option<Affine3A> {
    let det = m.matrix3.determinant();
    if !det.is_finite() || det.abs() < DEGENERATE_DETERMINANT || !m.is_finite() {
        return None;
    }
    let inv = m.inverse();
    inv.is_finite().then_some(inv)
}
