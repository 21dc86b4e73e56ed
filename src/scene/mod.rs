//! Scene graph module
//!
//! The in-memory scene the retargeting pipeline reads from:
//! - [`Node`]: named hierarchy node with a local TRS [`Transform`]
//! - [`Scene`]: node arena plus skinned meshes and humanoid bindings
//! - [`SkinnedMesh`] / [`SkinBinding`]: bone array, bind poses and weights
//! - [`HumanoidBinding`]: standard humanoid `slot -> node` lookup

pub mod humanoid;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod skin;
pub mod transform;

pub use humanoid::HumanoidBinding;
pub use node::Node;
pub use scene::{NodeBuilder, Scene};
pub use skin::{BoneWeight, SkinBinding, SkinnedMesh, VertexWeights};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct SkinnedMeshKey;
}
