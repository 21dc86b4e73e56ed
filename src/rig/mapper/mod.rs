//! Bone Mapper
//!
//! Builds a [`MappingTable`] between a source and a target skeleton by
//! running a list of [`MappingStrategy`] passes in priority order. Each pass
//! only sees bones that are still unmapped and not excluded after the
//! previous passes, and writes through [`MappingTable::add_or_update`], so
//! manual pins and already-claimed targets are never disturbed.
//!
//! Default order: [`NameStrategy`] -> [`HierarchyStrategy`] ->
//! [`PositionStrategy`].

pub mod hierarchy;
pub mod name;
pub mod position;

use serde::{Deserialize, Serialize};

use crate::rig::bone::BoneRecord;
use crate::rig::mapping::{MappingMethod, MappingTable};

pub use hierarchy::{Assignment, GreedyAssignment, HierarchyStrategy, hierarchy_similarity};
pub use name::NameStrategy;
pub use position::PositionStrategy;

/// One automatic mapping pass.
pub trait MappingStrategy: Send + Sync {
    /// The method recorded on mappings this strategy writes.
    fn method(&self) -> MappingMethod;

    /// Maps open source bones onto open target bones. Returns the number of
    /// mappings written.
    fn map(&self, table: &mut MappingTable, source: &[BoneRecord], target: &[BoneRecord]) -> usize;
}

/// Tunables of the automatic strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapperConfig {
    /// Confidence of a substring (non-exact) name match.
    pub substring_confidence: f32,
    /// Shortest compact name allowed to take part in a substring match.
    pub min_substring_len: usize,
    /// Hierarchy candidates scoring below this are not written.
    pub hierarchy_min_score: f32,
    /// Greedy hierarchy scan stops at the first candidate scoring this high.
    pub hierarchy_early_exit: f32,
    /// Position confidence numerator for same-region candidates.
    pub position_same_region_base: f32,
    /// Position confidence numerator for cross-region candidates.
    pub position_cross_region_base: f32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            substring_confidence: 0.7,
            min_substring_len: 3,
            hierarchy_min_score: 0.5,
            hierarchy_early_exit: 0.9,
            position_same_region_base: 0.6,
            position_cross_region_base: 0.3,
        }
    }
}

/// Strategy coordinator.
pub struct BoneMapper {
    strategies: Vec<Box<dyn MappingStrategy>>,
}

impl Default for BoneMapper {
    fn default() -> Self {
        Self::new(&MapperConfig::default())
    }
}

impl BoneMapper {
    /// Mapper with the default strategy order.
    #[must_use]
    pub fn new(config: &MapperConfig) -> Self {
        Self::with_strategies(vec![
            Box::new(NameStrategy::new(config)),
            Box::new(HierarchyStrategy::new(config)),
            Box::new(PositionStrategy::new(config)),
        ])
    }

    /// Mapper running exactly the given strategies, in order.
    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn MappingStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> impl Iterator<Item = &dyn MappingStrategy> {
        self.strategies.iter().map(AsRef::as_ref)
    }

    /// Runs every strategy. Returns the number of new mappings.
    pub fn map(&self, table: &mut MappingTable, source: &[BoneRecord], target: &[BoneRecord]) -> usize {
        self.run(table, source, target, |_| true)
    }

    /// Runs only the strategies whose method is listed, keeping the
    /// coordinator's priority order.
    pub fn map_with(
        &self,
        methods: &[MappingMethod],
        table: &mut MappingTable,
        source: &[BoneRecord],
        target: &[BoneRecord],
    ) -> usize {
        self.run(table, source, target, |s| methods.contains(&s.method()))
    }

    fn run(
        &self,
        table: &mut MappingTable,
        source: &[BoneRecord],
        target: &[BoneRecord],
        enabled: impl Fn(&dyn MappingStrategy) -> bool,
    ) -> usize {
        if source.is_empty() || target.is_empty() {
            log::debug!("Bone mapping skipped: empty skeleton");
            return 0;
        }

        let mut total = 0;
        for strategy in self.strategies() {
            if !enabled(strategy) {
                continue;
            }
            let written = strategy.map(table, source, target);
            log::debug!("{:?} pass mapped {written} bones", strategy.method());
            total += written;
        }

        let open = source.iter().filter(|b| table.is_source_open(b.id)).count();
        log::info!(
            "Bone mapping: {total} new mappings, {} total, {open} source bones unmapped",
            table.len()
        );
        total
    }
}
