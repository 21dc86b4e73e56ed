//! Retargeting settings.
//!
//! Loaded from JSON with camelCase keys; every field is optional and falls
//! back to its default:
//!
//! ```json
//! {
//!   "detectStructuralDifferences": true,
//!   "adjustBindPoses": true,
//!   "redistributeWeights": true,
//!   "useExternalTool": false,
//!   "methods": ["NameBased", "HierarchyBased", "PositionBased"],
//!   "mapper": { "substringConfidence": 0.7 },
//!   "adapter": { "regionGatedPosition": true }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::rig::adapter::{AdaptOptions, AdapterConfig};
use crate::rig::mapper::MapperConfig;
use crate::rig::mapping::MappingMethod;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetargetSettings {
    pub detect_structural_differences: bool,
    pub adjust_bind_poses: bool,
    pub redistribute_weights: bool,
    /// Try the installed external retargeter before the in-process adapter.
    pub use_external_tool: bool,
    /// Automatic mapping passes to run, in any order; they always execute
    /// in the mapper's priority order.
    pub methods: Vec<MappingMethod>,
    pub mapper: MapperConfig,
    pub adapter: AdapterConfig,
}

impl Default for RetargetSettings {
    fn default() -> Self {
        Self {
            detect_structural_differences: true,
            adjust_bind_poses: true,
            redistribute_weights: true,
            use_external_tool: false,
            methods: vec![
                MappingMethod::NameBased,
                MappingMethod::HierarchyBased,
                MappingMethod::PositionBased,
            ],
            mapper: MapperConfig::default(),
            adapter: AdapterConfig::default(),
        }
    }
}

impl RetargetSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn adapt_options(&self) -> AdaptOptions {
        AdaptOptions {
            detect_structural_differences: self.detect_structural_differences,
            adjust_bind_poses: self.adjust_bind_poses,
            redistribute_weights: self.redistribute_weights,
        }
    }
}
