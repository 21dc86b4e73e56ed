//! # Myth Retarget
//!
//! Fits skinned garments onto humanoid avatars: classifies the bones of
//! both skeletons, maps garment bones onto avatar bones and re-binds the
//! garment's skinned meshes (bone references, bind poses, skin weights) to
//! the avatar skeleton.
//!
//! ## Pipeline
//!
//! 1. [`SkeletonAnalyzer`](rig::SkeletonAnalyzer) flattens both skeletons
//!    into [`BoneRecord`](rig::BoneRecord)s, cached per session.
//! 2. [`BoneMapper`](rig::BoneMapper) fills a [`MappingTable`](rig::MappingTable)
//!    (name, hierarchy, position passes; manual pins always win).
//! 3. [`SkeletonAdapter`](rig::SkeletonAdapter) produces re-bound mesh copies.
//!
//! [`RetargetSession`] wires the three together.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod rig;
pub mod scene;
pub mod session;
pub mod settings;

pub use errors::{Result, RetargetError};
pub use rig::{
    AdaptationReport, AdaptedMesh, BoneId, BoneMapper, BoneMapping, BoneRecord, MappingMethod,
    MappingTable, Region, RegionClassifier, SkeletonAdapter, SkeletonAnalyzer, SkeletonCache,
};
pub use scene::{Node, NodeHandle, Scene, SkinnedMesh, SkinnedMeshKey};
pub use session::{ExternalRetargeter, GarmentAdaptation, RetargetSession};
pub use settings::RetargetSettings;
