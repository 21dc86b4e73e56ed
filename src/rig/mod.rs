//! Rig module
//!
//! Skeleton understanding and re-binding:
//! - [`region`] / [`naming`] / [`classifier`]: anatomical classification of bones
//! - [`analyzer`] / [`cache`]: flattening scene subtrees into [`BoneRecord`]s
//! - [`mapping`] / [`mapper`]: source -> target bone correspondences
//! - [`structure`]: structural difference detection
//! - [`adapter`]: re-binding skinned meshes onto the target skeleton

pub mod adapter;
pub mod analyzer;
pub mod bone;
pub mod cache;
pub mod classifier;
pub mod mapper;
pub mod mapping;
pub mod naming;
pub mod region;
pub mod structure;

pub use adapter::{
    AdaptOptions, AdaptationReport, AdaptedMesh, AdapterConfig, BoneResolver, ResolutionKind,
    SkeletonAdapter, SlotResolution,
};
pub use analyzer::SkeletonAnalyzer;
pub use bone::{BoneId, BoneIndex, BoneRecord};
pub use cache::{InvalidationPolicy, NodeCountAndRootName, SkeletonCache, SkeletonFingerprint};
pub use classifier::{RegionClassifier, RegionPatternTable, RegionRule};
pub use mapper::{BoneMapper, MapperConfig, MappingStrategy};
pub use mapping::{BoneMapping, InterchangeMapping, MappingMethod, MappingStore, MappingTable, RegionCoverage};
pub use region::{BodyPart, Region, Side};
pub use structure::{StructuralReport, detect_structural_differences, has_structural_difference};
