use rustc_hash::FxHashMap;

use crate::scene::NodeHandle;

/// Standard humanoid rig binding exposed by an avatar root.
///
/// Maps standard slot names (`Hips`, `LeftUpperArm`, `RightIndexProximal`, ...)
/// to the nodes that fill them. Slot names are stored as given; lookups by
/// node are linear, which is fine for the ~55 slots a humanoid rig defines.
#[derive(Debug, Clone, Default)]
pub struct HumanoidBinding {
    slots: FxHashMap<String, NodeHandle>,
}

impl HumanoidBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `node` to `slot`, replacing any previous occupant.
    pub fn insert(&mut self, slot: &str, node: NodeHandle) {
        self.slots.insert(slot.to_string(), node);
    }

    /// Builder-style variant of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, slot: &str, node: NodeHandle) -> Self {
        self.insert(slot, node);
        self
    }

    /// `slotName -> node` lookup.
    #[must_use]
    pub fn node(&self, slot: &str) -> Option<NodeHandle> {
        self.slots.get(slot).copied()
    }

    /// Reverse lookup: the slot a node fills, if any.
    #[must_use]
    pub fn slot_of(&self, node: NodeHandle) -> Option<&str> {
        self.slots
            .iter()
            .find(|(_, handle)| **handle == node)
            .map(|(slot, _)| slot.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
