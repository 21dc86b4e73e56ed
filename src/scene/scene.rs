use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Affine3A, Vec3};
use slotmap::{SlotMap, SparseSecondaryMap};

use crate::scene::humanoid::HumanoidBinding;
use crate::scene::node::Node;
use crate::scene::skin::SkinnedMesh;
use crate::scene::{NodeHandle, SkinnedMeshKey};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// In-memory scene graph.
///
/// Holds the node hierarchy, the skinned meshes attached to nodes and the
/// humanoid bindings exposed by avatar roots. This is the scene-graph
/// accessor the analyzer and adapter read from; only the host mutates it.
#[derive(Debug)]
pub struct Scene {
    pub id: u32,

    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    // ==== Components ====
    pub skinned_meshes: SlotMap<SkinnedMeshKey, SkinnedMesh>,
    pub humanoid_bindings: SparseSecondaryMap<NodeHandle, HumanoidBinding>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            skinned_meshes: SlotMap::with_key(),
            humanoid_bindings: SparseSecondaryMap::new(),
        }
    }

    /// Starts building a node.
    pub fn build_node(&'_ mut self, name: &str) -> NodeBuilder<'_> {
        NodeBuilder::new(self, name)
    }

    /// Adds a node at the top level.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Creates an empty named node at the top level.
    pub fn create_node(&mut self, name: &str) -> NodeHandle {
        self.add_node(Node::new(name))
    }

    pub fn add_to_parent(&mut self, child: Node, parent: NodeHandle) -> NodeHandle {
        let handle = self.nodes.insert(child);
        if self.nodes.contains_key(parent) {
            self.nodes[parent].children.push(handle);
            self.nodes[handle].parent = Some(parent);
        } else {
            log::error!("Parent node not found while adding '{}'", self.nodes[handle].name);
            self.root_nodes.push(handle);
        }
        handle
    }

    /// Removes a node and its whole subtree, including skinned meshes and
    /// humanoid bindings attached to removed nodes.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let children = node.children.clone();
        let parent = node.parent;

        for child in children {
            self.remove_node(child);
        }

        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent)
                && let Some(pos) = p.children.iter().position(|&x| x == handle)
            {
                p.children.remove(pos);
            }
        } else if let Some(pos) = self.root_nodes.iter().position(|&x| x == handle) {
            self.root_nodes.remove(pos);
        }

        self.skinned_meshes.retain(|_, mesh| mesh.node != handle);
        self.humanoid_bindings.remove(handle);
        self.nodes.remove(handle);
    }

    /// Re-parents `child` under `parent`.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(child) {
            return;
        }
        if !self.nodes.contains_key(parent) {
            log::error!("Parent node not found during attach!");
            return;
        }
        if self.is_descendant_of(parent, child) {
            log::warn!("Cannot attach a node beneath its own descendant");
            return;
        }

        // 1. Detach from old
        if let Some(old) = self.nodes[child].parent {
            if let Some(n) = self.nodes.get_mut(old)
                && let Some(i) = n.children.iter().position(|&x| x == child)
            {
                n.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == child) {
            self.root_nodes.remove(i);
        }

        // 2. Attach to new
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn get_name(&self, handle: NodeHandle) -> Option<&str> {
        self.nodes.get(handle).map(|n| n.name.as_str())
    }

    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    // ========================================================================
    // Hierarchy queries
    // ========================================================================

    /// True if `node` is a strict descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, node: NodeHandle, ancestor: NodeHandle) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(|n| n.parent);
        }
        false
    }

    /// `root` followed by every descendant, depth-first pre-order.
    #[must_use]
    pub fn subtree(&self, root: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            out.push(handle);
            if let Some(node) = self.nodes.get(handle) {
                // Reverse push keeps authoring order on pop.
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Number of nodes in the subtree rooted at `root`, including `root`.
    #[must_use]
    pub fn subtree_node_count(&self, root: NodeHandle) -> usize {
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            if let Some(node) = self.nodes.get(handle) {
                count += 1;
                stack.extend_from_slice(&node.children);
            }
        }
        count
    }

    /// Depth-first search for a node named exactly `name` under `root`
    /// (inclusive).
    #[must_use]
    pub fn find_node_by_name(&self, root: NodeHandle, name: &str) -> Option<NodeHandle> {
        self.subtree(root)
            .into_iter()
            .find(|&h| self.nodes.get(h).is_some_and(|n| n.name == name))
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// World matrix of a node, derived from the local TRS chain.
    ///
    /// Stale handles yield identity.
    #[must_use]
    pub fn world_matrix(&self, handle: NodeHandle) -> Affine3A {
        let mut world = Affine3A::IDENTITY;
        let mut current = Some(handle);
        while let Some(h) = current {
            let Some(node) = self.nodes.get(h) else {
                break;
            };
            world = node.transform.local_matrix() * world;
            current = node.parent;
        }
        world
    }

    #[must_use]
    pub fn world_position(&self, handle: NodeHandle) -> Vec3 {
        self.world_matrix(handle).translation.into()
    }

    // ========================================================================
    // Components
    // ========================================================================

    pub fn add_skinned_mesh(&mut self, mesh: SkinnedMesh) -> SkinnedMeshKey {
        self.skinned_meshes.insert(mesh)
    }

    #[must_use]
    pub fn skinned_mesh(&self, key: SkinnedMeshKey) -> Option<&SkinnedMesh> {
        self.skinned_meshes.get(key)
    }

    /// Replaces the mesh stored under `key`. Returns false for stale keys.
    pub fn replace_skinned_mesh(&mut self, key: SkinnedMeshKey, mesh: SkinnedMesh) -> bool {
        match self.skinned_meshes.get_mut(key) {
            Some(slot) => {
                *slot = mesh;
                true
            }
            None => false,
        }
    }

    /// Skinned meshes whose node is `root` or lies beneath it.
    #[must_use]
    pub fn skinned_meshes_under(&self, root: NodeHandle) -> Vec<SkinnedMeshKey> {
        self.skinned_meshes
            .iter()
            .filter(|(_, mesh)| mesh.node == root || self.is_descendant_of(mesh.node, root))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn set_humanoid_binding(&mut self, root: NodeHandle, binding: HumanoidBinding) {
        if self.nodes.contains_key(root) {
            self.humanoid_bindings.insert(root, binding);
        }
    }

    #[must_use]
    pub fn humanoid_binding(&self, root: NodeHandle) -> Option<&HumanoidBinding> {
        self.humanoid_bindings.get(root)
    }
}

/// Chained node construction.
pub struct NodeBuilder<'a> {
    scene: &'a mut Scene,
    node: Node,
    parent: Option<NodeHandle>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(scene: &'a mut Scene, name: &str) -> Self {
        Self {
            scene,
            node: Node::new(name),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.node.transform.position = Vec3::new(x, y, z);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, s: f32) -> Self {
        self.node.transform.scale = Vec3::splat(s);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Marks the node as carrying renderable geometry.
    #[must_use]
    pub fn renderable(mut self) -> Self {
        self.node.renderable = true;
        self
    }

    /// Marks the node as a rig's top-level armature object.
    #[must_use]
    pub fn armature(mut self) -> Self {
        self.node.armature = true;
        self
    }

    pub fn build(self) -> NodeHandle {
        match self.parent {
            Some(parent) => self.scene.add_to_parent(self.node, parent),
            None => self.scene.add_node(self.node),
        }
    }
}
