//! Retargeting session.
//!
//! [`RetargetSession`] is the context object a host creates per editing
//! session. It owns the classifier, the skeleton cache, the mapper, the
//! adapter and the settings, so several independent sessions (and tests)
//! never share state.
//!
//! # Example
//!
//! ```rust,ignore
//! let session = RetargetSession::new(RetargetSettings::default());
//! let mut table = MappingTable::new();
//! session.map_skeletons(&scene, garment_root, avatar_root, &mut table);
//! let cancel = AtomicBool::new(false);
//! let adapted = session.adapt_garment(&mut scene, garment_root, avatar_root, &table, &cancel);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use crate::errors::Result;
use crate::rig::adapter::{AdaptationReport, AdaptedMesh, SkeletonAdapter};
use crate::rig::analyzer::SkeletonAnalyzer;
use crate::rig::bone::BoneRecord;
use crate::rig::cache::{InvalidationPolicy, SkeletonCache};
use crate::rig::classifier::RegionClassifier;
use crate::rig::mapper::BoneMapper;
use crate::rig::mapping::MappingTable;
use crate::rig::structure::{StructuralReport, detect_structural_differences};
use crate::scene::{NodeHandle, Scene, SkinnedMeshKey};
use crate::settings::RetargetSettings;

/// Alternate whole-mesh retargeting path, typically an external authoring
/// tool driven as a subprocess through an interchange file.
///
/// Implementations report failures with the scene and external-tool
/// variants of [`RetargetError`](crate::errors::RetargetError). Any error
/// returned here is logged and the in-process adapter runs instead.
pub trait ExternalRetargeter: Send + Sync {
    fn retarget(
        &self,
        scene: &Scene,
        mesh: SkinnedMeshKey,
        target_root: NodeHandle,
        source_bones: &[BoneRecord],
        target_bones: &[BoneRecord],
        table: &MappingTable,
    ) -> Result<AdaptedMesh>;
}

pub struct RetargetSession {
    id: Uuid,
    settings: RetargetSettings,
    analyzer: SkeletonAnalyzer,
    cache: SkeletonCache,
    mapper: BoneMapper,
    adapter: SkeletonAdapter,
    external: Option<Box<dyn ExternalRetargeter>>,
}

impl Default for RetargetSession {
    fn default() -> Self {
        Self::new(RetargetSettings::default())
    }
}

impl RetargetSession {
    /// Session with the built-in region pattern table.
    #[must_use]
    pub fn new(settings: RetargetSettings) -> Self {
        Self::with_classifier(settings, Arc::new(RegionClassifier::default()))
    }

    #[must_use]
    pub fn with_classifier(settings: RetargetSettings, classifier: Arc<RegionClassifier>) -> Self {
        Self {
            id: Uuid::new_v4(),
            analyzer: SkeletonAnalyzer::new(classifier),
            cache: SkeletonCache::new(),
            mapper: BoneMapper::new(&settings.mapper),
            adapter: SkeletonAdapter::new(settings.adapter.clone()),
            external: None,
            settings,
        }
    }

    #[must_use]
    pub fn with_cache_policy(mut self, policy: Box<dyn InvalidationPolicy>) -> Self {
        self.cache = SkeletonCache::with_policy(policy);
        self
    }

    #[must_use]
    pub fn with_external(mut self, external: Box<dyn ExternalRetargeter>) -> Self {
        self.external = Some(external);
        self
    }

    #[must_use]
    pub fn with_mapper(mut self, mapper: BoneMapper) -> Self {
        self.mapper = mapper;
        self
    }

    #[must_use]
    pub fn with_adapter(mut self, adapter: SkeletonAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn settings(&self) -> &RetargetSettings {
        &self.settings
    }

    #[must_use]
    pub fn cache(&self) -> &SkeletonCache {
        &self.cache
    }

    #[must_use]
    pub fn classifier(&self) -> &RegionClassifier {
        self.analyzer.classifier()
    }

    // ========================================================================
    // Analysis & mapping
    // ========================================================================

    /// Cached analysis of the skeleton owned by `root`.
    pub fn analyze(&self, scene: &Scene, root: NodeHandle, is_source: bool) -> Arc<[BoneRecord]> {
        self.cache.get_or_analyze(&self.analyzer, scene, root, is_source)
    }

    /// Runs the configured mapping passes. Returns the number of new
    /// mappings.
    pub fn map(&self, table: &mut MappingTable, source: &[BoneRecord], target: &[BoneRecord]) -> usize {
        self.mapper.map_with(&self.settings.methods, table, source, target)
    }

    /// Analyzes both skeletons, re-keys the table against them and maps.
    pub fn map_skeletons(
        &self,
        scene: &Scene,
        source_root: NodeHandle,
        target_root: NodeHandle,
        table: &mut MappingTable,
    ) -> usize {
        let source = self.analyze(scene, source_root, true);
        let target = self.analyze(scene, target_root, false);
        table.update_bone_references(&source, &target);
        self.map(table, &source, &target)
    }

    #[must_use]
    pub fn structural_report(
        &self,
        source: &[BoneRecord],
        target: &[BoneRecord],
        table: &MappingTable,
    ) -> StructuralReport {
        detect_structural_differences(source, target, table)
    }

    #[must_use]
    pub fn has_structural_difference(
        &self,
        source: &[BoneRecord],
        target: &[BoneRecord],
        table: &MappingTable,
    ) -> bool {
        self.structural_report(source, target, table).has_difference()
    }

    // ========================================================================
    // Adaptation
    // ========================================================================

    /// Adapts one mesh. The external path runs first when enabled and
    /// installed; its failure falls back to the in-process adapter.
    pub fn adapt_mesh(
        &self,
        scene: &Scene,
        mesh: SkinnedMeshKey,
        target_root: NodeHandle,
        source_bones: &[BoneRecord],
        target_bones: &[BoneRecord],
        table: &MappingTable,
    ) -> Option<AdaptedMesh> {
        if self.settings.use_external_tool
            && let Some(external) = &self.external
        {
            match external.retarget(scene, mesh, target_root, source_bones, target_bones, table) {
                Ok(adapted) => return Some(adapted),
                Err(e) => log::warn!("External retargeting failed, using in-process adapter: {e}"),
            }
        }

        self.adapter.adapt(
            scene,
            mesh,
            target_root,
            source_bones,
            target_bones,
            table,
            self.settings.adapt_options(),
        )
    }

    /// Adapts several meshes. `cancel` is checked between meshes only; a
    /// mesh that has started is always finished.
    pub fn adapt_meshes(
        &self,
        scene: &Scene,
        meshes: &[SkinnedMeshKey],
        target_root: NodeHandle,
        source_bones: &[BoneRecord],
        target_bones: &[BoneRecord],
        table: &MappingTable,
        cancel: &AtomicBool,
    ) -> Vec<(SkinnedMeshKey, AdaptedMesh)> {
        let mut adapted = Vec::with_capacity(meshes.len());
        for (i, &key) in meshes.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Adaptation cancelled after {i} of {} meshes", meshes.len());
                break;
            }
            if let Some(result) =
                self.adapt_mesh(scene, key, target_root, source_bones, target_bones, table)
            {
                adapted.push((key, result));
            }
        }
        adapted
    }

    /// Adapts every skinned mesh under `source_root` that is still bound to
    /// the garment skeleton. Each result is added to the scene as a new
    /// skinned mesh; the original keeps its bones and bind poses, so a later
    /// run with a corrected table starts from the same asset.
    pub fn adapt_garment(
        &self,
        scene: &mut Scene,
        source_root: NodeHandle,
        target_root: NodeHandle,
        table: &MappingTable,
        cancel: &AtomicBool,
    ) -> Vec<GarmentAdaptation> {
        let source = self.analyze(scene, source_root, true);
        let target = self.analyze(scene, target_root, false);
        let meshes: Vec<SkinnedMeshKey> = scene
            .skinned_meshes_under(source_root)
            .into_iter()
            .filter(|&key| {
                scene.skinned_mesh(key).is_some_and(|mesh| {
                    mesh.skin.bones.iter().any(|&b| scene.is_descendant_of(b, source_root))
                })
            })
            .collect();

        let adapted = self.adapt_meshes(scene, &meshes, target_root, &source, &target, table, cancel);

        let results: Vec<GarmentAdaptation> = adapted
            .into_iter()
            .map(|(source_mesh, AdaptedMesh { mesh, report })| GarmentAdaptation {
                source_mesh,
                adapted_mesh: scene.add_skinned_mesh(mesh),
                report,
            })
            .collect();
        // New skinned meshes now sit under the garment root.
        self.cache.invalidate(scene, source_root);
        results
    }
}

/// One mesh adapted by [`RetargetSession::adapt_garment`].
#[derive(Debug, Clone)]
pub struct GarmentAdaptation {
    /// The untouched garment mesh.
    pub source_mesh: SkinnedMeshKey,
    /// The re-bound copy added to the scene.
    pub adapted_mesh: SkinnedMeshKey,
    pub report: AdaptationReport,
}
