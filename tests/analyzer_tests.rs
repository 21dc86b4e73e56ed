//! Skeleton Analyzer & Skeleton Cache tests
//!
//! Tests for:
//! - Bone collection: skin-bound members, renderable payload, armature roots
//! - Parent/child linking across non-bone nodes, paths and depth
//! - Humanoid binding slots
//! - Empty and stale roots
//! - Cache hits, invalidation policy, isolation, concurrent population

mod common;

use std::sync::Arc;

use common::{LEFT_ARM, SHORT_SPINE, analyzer, bind_mesh, build_rig, find, init_logger, vec3_approx};
use glam::{Affine3A, Vec3};
use myth_retarget::rig::{
    BoneIndex, InvalidationPolicy, Region, SkeletonCache, SkeletonFingerprint,
};
use myth_retarget::scene::{HumanoidBinding, Scene, SkinBinding, SkinnedMesh, VertexWeights};

// ============================================================================
// Bone Collection
// ============================================================================

#[test]
fn analyze_collects_hierarchy_without_root() {
    init_logger();
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);

    let bones = analyzer().analyze(&scene, rig.root, false);

    assert_eq!(bones.len(), 4);
    assert!(bones.iter().all(|b| b.name != "Avatar"));
    assert_eq!(find(&bones, "Hips").region, Region::Hips);
    assert_eq!(find(&bones, "Head").region, Region::Head);
}

#[test]
fn analyze_links_parents_and_paths() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let bones = analyzer().analyze(&scene, rig.root, false);
    let index = BoneIndex::new(&bones);

    let hips = find(&bones, "Hips");
    let chest = find(&bones, "Chest");
    assert!(hips.is_root);
    assert!(hips.parent.is_none());
    assert_eq!(index.parent_of(chest).unwrap().name, "Spine");
    assert_eq!(chest.path, "Hips/Spine/Chest");
    assert_eq!(chest.depth(), 3);
    assert_eq!(hips.children.len(), 1);
    assert!(find(&bones, "Head").is_leaf());
}

#[test]
fn analyze_records_world_positions() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let bones = analyzer().analyze(&scene, rig.root, false);

    assert!(vec3_approx(find(&bones, "Hips").world_position, Vec3::new(0.0, 1.0, 0.0)));
    assert!(vec3_approx(find(&bones, "Head").world_position, Vec3::new(0.0, 1.6, 0.0)));
}

#[test]
fn analyze_skips_renderable_payload_but_walks_children() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Garment", SHORT_SPINE);
    let body = scene
        .build_node("Body")
        .renderable()
        .with_parent(rig.bone("Chest"))
        .build();
    scene.build_node("Bow").with_parent(body).build();

    let bones = analyzer().analyze(&scene, rig.root, true);
    let index = BoneIndex::new(&bones);

    assert!(bones.iter().all(|b| b.name != "Body"));
    let bow = find(&bones, "Bow");
    // Linked past the payload node to the nearest recorded ancestor.
    assert_eq!(index.parent_of(bow).unwrap().name, "Chest");
    assert_eq!(bow.path, "Hips/Spine/Chest/Bow");
}

#[test]
fn analyze_records_renderables_on_avatar_side_only() {
    let mut scene = Scene::new();
    let root = scene.create_node("Avatar");
    scene.build_node("Hips").with_parent(root).build();
    scene.build_node("Body").renderable().with_parent(root).build();

    let analyzer = analyzer();
    let as_source = analyzer.analyze(&scene, root, true);
    let as_target = analyzer.analyze(&scene, root, false);

    assert_eq!(as_source.len(), 1);
    assert_eq!(as_target.len(), 2);
    assert!(find(&as_target, "Body").is_root);
}

#[test]
fn analyze_keeps_skin_bound_renderable_bones() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Garment", SHORT_SPINE);
    let odd = scene
        .build_node("Tassel")
        .renderable()
        .with_parent(rig.bone("Hips"))
        .build();
    let mut bones = vec![rig.bone("Hips")];
    bones.push(odd);
    let skin = SkinBinding::new(
        Some(rig.bone("Hips")),
        bones,
        vec![Affine3A::IDENTITY; 2],
    );
    let mesh_node = scene.build_node("Mesh").renderable().with_parent(rig.root).build();
    scene.add_skinned_mesh(SkinnedMesh::new("Mesh", mesh_node, skin));

    let bones = analyzer().analyze(&scene, rig.root, true);
    assert!(bones.iter().any(|b| b.name == "Tassel"));
    assert!(bones.iter().all(|b| b.name != "Mesh"));
}

#[test]
fn analyze_marks_armature_children_as_roots() {
    let mut scene = Scene::new();
    let root = scene.create_node("Garment");
    let armature = scene.build_node("Armature").armature().with_parent(root).build();
    let hips = scene.build_node("Hips").with_parent(armature).build();
    scene.build_node("Spine").with_parent(hips).build();

    let bones = analyzer().analyze(&scene, root, true);

    assert_eq!(bones.len(), 3);
    assert!(find(&bones, "Armature").is_root);
    assert!(find(&bones, "Hips").is_root);
    assert!(!find(&bones, "Spine").is_root);
    assert_eq!(find(&bones, "Spine").path, "Armature/Hips/Spine");
}

#[test]
fn analyze_uses_humanoid_binding() {
    let mut scene = Scene::new();
    let rig = build_rig(
        &mut scene,
        "Avatar",
        &[
            ("J_Bip_C_Hips", None, [0.0, 1.0, 0.0]),
            ("Bone_012", Some("J_Bip_C_Hips"), [0.2, 0.4, 0.0]),
        ],
    );
    let binding = HumanoidBinding::new()
        .with("Hips", rig.bone("J_Bip_C_Hips"))
        .with("LeftUpperArm", rig.bone("Bone_012"));
    scene.set_humanoid_binding(rig.root, binding);

    let bones = analyzer().analyze(&scene, rig.root, false);
    let arm = find(&bones, "Bone_012");
    assert_eq!(arm.region, Region::LeftUpperArm);
    assert_eq!(arm.humanoid_slot.as_deref(), Some("LeftUpperArm"));
    assert!(arm.is_humanoid());
}

#[test]
fn analyze_empty_and_stale_roots() {
    let mut scene = Scene::new();
    let lonely = scene.create_node("Empty");
    assert!(analyzer().analyze(&scene, lonely, true).is_empty());

    let rig = build_rig(&mut scene, "Gone", SHORT_SPINE);
    scene.remove_node(rig.root);
    assert!(analyzer().analyze(&scene, rig.root, true).is_empty());
}

#[test]
fn analyze_does_not_mutate_scene() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Garment", LEFT_ARM);
    bind_mesh(&mut scene, &rig, "Sleeve", &["LeftUpperArm"], vec![VertexWeights::single(0)]);
    let before = scene.subtree(rig.root);

    let _ = analyzer().analyze(&scene, rig.root, true);

    assert_eq!(scene.subtree(rig.root), before);
}

#[test]
fn bone_ids_follow_scene_nodes() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let bones = analyzer().analyze(&scene, rig.root, false);
    let spine = find(&bones, "Spine");
    assert_eq!(spine.id.node_handle(), rig.bone("Spine"));
    assert_eq!(spine.node, rig.bone("Spine"));
}

// ============================================================================
// Skeleton Cache
// ============================================================================

#[test]
fn cache_hit_returns_same_analysis() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let analyzer = analyzer();
    let cache = SkeletonCache::new();

    let first = cache.get_or_analyze(&analyzer, &scene, rig.root, false);
    let second = cache.get_or_analyze(&analyzer, &scene, rig.root, false);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn cache_keys_by_side() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let analyzer = analyzer();
    let cache = SkeletonCache::new();

    let source = cache.get_or_analyze(&analyzer, &scene, rig.root, true);
    let target = cache.get_or_analyze(&analyzer, &scene, rig.root, false);
    assert!(!Arc::ptr_eq(&source, &target));
    assert_eq!(cache.len(), 2);
}

#[test]
fn cache_invalidates_on_node_count_change() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let analyzer = analyzer();
    let cache = SkeletonCache::new();

    let first = cache.get_or_analyze(&analyzer, &scene, rig.root, false);
    scene.build_node("Neck").with_parent(rig.bone("Chest")).build();
    let second = cache.get_or_analyze(&analyzer, &scene, rig.root, false);

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.len(), first.len() + 1);
}

#[test]
fn cache_invalidates_on_root_bone_rename() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let analyzer = analyzer();
    let cache = SkeletonCache::new();

    let first = cache.get_or_analyze(&analyzer, &scene, rig.root, false);
    scene.get_node_mut(rig.bone("Hips")).unwrap().name = "Pelvis".to_string();
    let second = cache.get_or_analyze(&analyzer, &scene, rig.root, false);

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.iter().any(|b| b.name == "Pelvis"));
}

#[test]
fn cache_misses_deep_renames_by_default() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let analyzer = analyzer();
    let cache = SkeletonCache::new();

    let first = cache.get_or_analyze(&analyzer, &scene, rig.root, false);
    scene.get_node_mut(rig.bone("Head")).unwrap().name = "Skull".to_string();
    let second = cache.get_or_analyze(&analyzer, &scene, rig.root, false);

    assert!(Arc::ptr_eq(&first, &second));
}

struct NeverValid;

impl InvalidationPolicy for NeverValid {
    fn is_valid(&self, _: &SkeletonFingerprint, _: &SkeletonFingerprint) -> bool {
        false
    }
}

#[test]
fn cache_uses_injected_policy() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let analyzer = analyzer();
    let cache = SkeletonCache::with_policy(Box::new(NeverValid));

    let first = cache.get_or_analyze(&analyzer, &scene, rig.root, false);
    let second = cache.get_or_analyze(&analyzer, &scene, rig.root, false);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn cache_invalidate_and_clear() {
    let mut scene = Scene::new();
    let a = build_rig(&mut scene, "A", SHORT_SPINE);
    let b = build_rig(&mut scene, "B", SHORT_SPINE);
    let analyzer = analyzer();
    let cache = SkeletonCache::new();

    cache.get_or_analyze(&analyzer, &scene, a.root, true);
    cache.get_or_analyze(&analyzer, &scene, a.root, false);
    cache.get_or_analyze(&analyzer, &scene, b.root, false);
    assert_eq!(cache.len(), 3);

    cache.invalidate(&scene, a.root);
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn cache_instances_are_isolated() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", SHORT_SPINE);
    let analyzer = analyzer();
    let one = SkeletonCache::new();
    let two = SkeletonCache::new();

    one.get_or_analyze(&analyzer, &scene, rig.root, false);
    assert_eq!(one.len(), 1);
    assert!(two.is_empty());
}

#[test]
fn cache_concurrent_population_is_consistent() {
    let mut scene = Scene::new();
    let rig = build_rig(&mut scene, "Avatar", LEFT_ARM);
    let analyzer = analyzer();
    let cache = SkeletonCache::new();

    let lengths: Vec<usize> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| cache.get_or_analyze(&analyzer, &scene, rig.root, false).len()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(lengths.iter().all(|&n| n == LEFT_ARM.len()));
    assert_eq!(cache.len(), 1);
}
