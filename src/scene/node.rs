use crate::scene::NodeHandle;
use crate::scene::transform::Transform;

/// A scene node as seen by the retargeting pipeline.
///
/// # Hierarchy
///
/// Nodes form a tree structure through parent-child relationships:
/// - `parent`: Optional handle to parent node (None for root nodes)
/// - `children`: List of child node handles, in authoring order
///
/// # Flags
///
/// - `renderable`: the node carries mesh/geometry payload. Garment skeleton
///   analysis treats such nodes as payload rather than bones.
/// - `armature`: the node is the top-level marker of a rig (an armature
///   object). Its direct children are skeleton roots.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,

    // === Core Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    // === Core Spatial Data ===
    pub transform: Transform,

    // === Flags ===
    pub renderable: bool,
    pub armature: bool,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            renderable: false,
            armature: false,
        }
    }

    /// Returns the parent node handle, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Returns a read-only slice of child node handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("Node")
    }
}
