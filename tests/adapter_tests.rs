//! Skeleton Adapter tests
//!
//! Tests for:
//! - Resolver chain: table, fallback to ancestor, identity on re-adaptation
//! - Bind-pose recompute: partial vs. full, degenerate matrices
//! - Weight redistribution: renormalization, unreadable weights
//! - Idempotence and non-mutation of the stored mesh

mod common;

use common::{
    LEFT_ARM, LONG_SPINE, Rig, SHORT_SPINE, approx_eq, bind_mesh, build_rig, find, init_logger,
    vec3_approx,
};
use glam::Vec3;
use myth_retarget::rig::adapter::redistribute_weights;
use myth_retarget::rig::adapter::resolve::{RootResolver, primary_chain};
use myth_retarget::rig::{
    AdaptOptions, AdaptedMesh, BoneMapper, BoneRecord, MappingTable, ResolutionKind,
    SkeletonAdapter,
};
use myth_retarget::scene::{Scene, SkinnedMeshKey, VertexWeights};
use rustc_hash::FxHashSet;

struct Fixture {
    scene: Scene,
    avatar: Rig,
    mesh: SkinnedMeshKey,
    source: Vec<BoneRecord>,
    target: Vec<BoneRecord>,
    table: MappingTable,
}

impl Fixture {
    fn try_adapt(&self, options: AdaptOptions) -> Option<AdaptedMesh> {
        SkeletonAdapter::default().adapt(
            &self.scene,
            self.mesh,
            self.avatar.root,
            &self.source,
            &self.target,
            &self.table,
            options,
        )
    }

    fn adapt(&self, options: AdaptOptions) -> AdaptedMesh {
        self.try_adapt(options).unwrap()
    }
}

fn fixture(
    garment_bones: &[(&str, Option<&str>, [f32; 3])],
    avatar_bones: &[(&str, Option<&str>, [f32; 3])],
    mesh_bones: &[&str],
    weights: Vec<VertexWeights>,
) -> Fixture {
    init_logger();
    let mut scene = Scene::new();
    let garment = build_rig(&mut scene, "Garment", garment_bones);
    let avatar = build_rig(&mut scene, "Avatar", avatar_bones);
    let mesh = bind_mesh(&mut scene, &garment, "Dress", mesh_bones, weights);

    let analyzer = common::analyzer();
    let source = analyzer.analyze(&scene, garment.root, true);
    let target = analyzer.analyze(&scene, avatar.root, false);
    let mut table = MappingTable::new();
    BoneMapper::default().map(&mut table, &source, &target);

    Fixture {
        scene,
        avatar,
        mesh,
        source,
        target,
        table,
    }
}

fn arm_without_hand() -> Vec<(&'static str, Option<&'static str>, [f32; 3])> {
    LEFT_ARM
        .iter()
        .copied()
        .filter(|(name, _, _)| *name != "LeftHand")
        .collect()
}

/// Garment arm bound to `[Hips, Chest, LeftLowerArm, LeftHand]`; the avatar
/// has no hand.
fn missing_hand() -> Fixture {
    fixture(
        LEFT_ARM,
        &arm_without_hand(),
        &["Hips", "Chest", "LeftLowerArm", "LeftHand"],
        vec![
            VertexWeights::new([(2, 0.5), (3, 0.5), (0, 0.0), (0, 0.0)]),
            VertexWeights::single(0),
            VertexWeights::new([(3, 1.0), (0, 0.0), (0, 0.0), (0, 0.0)]),
            VertexWeights::new([(1, 0.25), (2, 0.25), (3, 0.5), (0, 0.0)]),
        ],
    )
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn mapped_bones_resolve_through_table() {
    let f = missing_hand();
    let adapted = f.adapt(AdaptOptions::default());
    let report = &adapted.report;

    assert_eq!(report.slots[0].kind, ResolutionKind::Table);
    assert_eq!(report.slots[1].kind, ResolutionKind::Table);
    assert_eq!(report.slots[2].kind, ResolutionKind::Table);
    assert_eq!(adapted.mesh.skin.bones[0], f.avatar.bone("Hips"));
    assert_eq!(adapted.mesh.skin.bones[2], f.avatar.bone("LeftLowerArm"));
    assert_eq!(adapted.mesh.skin.root_bone, Some(f.avatar.bone("Hips")));
    assert_eq!(report.root_bone, Some(ResolutionKind::Table));
}

#[test]
fn missing_bone_falls_back_to_ancestor() {
    let f = missing_hand();
    assert!(f.table.mapping_for_source(find(&f.source, "LeftHand").id).is_none());

    let adapted = f.adapt(AdaptOptions::default());
    let slot = &adapted.report.slots[3];

    assert_eq!(slot.kind, ResolutionKind::Ancestor);
    assert!(slot.kind.is_fallback());
    assert_eq!(adapted.mesh.skin.bones[3], f.avatar.bone("LeftLowerArm"));
    assert_eq!(adapted.report.unresolved_bones, vec!["LeftHand".to_string()]);
    assert_eq!(adapted.report.resolved_count(), 3);
    assert!(!adapted.report.is_clean());
}

#[test]
fn unmapped_bones_use_region_then_name() {
    let f = fixture(
        &[
            ("Hips", None, [0.0, 1.0, 0.0]),
            ("Waist", Some("Hips"), [0.0, 0.1, 0.0]),
            ("Ribbon", Some("Waist"), [0.0, 0.1, 0.1]),
        ],
        &[
            ("Hips", None, [0.0, 1.0, 0.0]),
            ("Spine", Some("Hips"), [0.0, 0.1, 0.0]),
            ("Ribbon", Some("Spine"), [0.0, 0.1, 0.1]),
        ],
        &["Waist", "Ribbon"],
        vec![VertexWeights::single(0)],
    );
    let mut table = MappingTable::new();
    table.set_manual(find(&f.source, "Hips"), find(&f.target, "Hips"));

    let adapted = SkeletonAdapter::default()
        .adapt(
            &f.scene,
            f.mesh,
            f.avatar.root,
            &f.source,
            &f.target,
            &table,
            AdaptOptions::default(),
        )
        .unwrap();

    assert_eq!(adapted.report.slots[0].kind, ResolutionKind::Region);
    assert_eq!(adapted.mesh.skin.bones[0], f.avatar.bone("Spine"));
    assert_eq!(adapted.report.slots[1].kind, ResolutionKind::Name);
    assert_eq!(adapted.mesh.skin.bones[1], f.avatar.bone("Ribbon"));
}

#[test]
fn stale_inputs_yield_none() {
    let mut f = missing_hand();
    let adapter = SkeletonAdapter::default();

    let none = adapter.adapt(
        &f.scene,
        f.mesh,
        f.avatar.root,
        &f.source,
        &[],
        &f.table,
        AdaptOptions::default(),
    );
    assert!(none.is_none());

    let mesh_node = f.scene.skinned_mesh(f.mesh).unwrap().node;
    f.scene.remove_node(mesh_node);
    assert!(f.try_adapt(AdaptOptions::default()).is_none());
}

// ============================================================================
// Bind Poses
// ============================================================================

#[test]
fn partial_recompute_only_touches_fallback_slots() {
    let f = missing_hand();
    let original = f.scene.skinned_mesh(f.mesh).unwrap().skin.inverse_bind_matrices.clone();

    let adapted = f.adapt(AdaptOptions::default());
    let ibms = &adapted.mesh.skin.inverse_bind_matrices;

    assert!(!adapted.report.full_recompute);
    assert_eq!(adapted.report.recomputed_bind_poses, 1);
    assert_eq!(ibms[0], original[0]);
    assert_eq!(ibms[2], original[2]);
    // Slot 3 now binds to the avatar's lower arm.
    let lower_arm = f.scene.world_position(f.avatar.bone("LeftLowerArm"));
    assert!(vec3_approx(ibms[3].transform_point3(lower_arm), Vec3::ZERO));
}

#[test]
fn structural_difference_forces_full_recompute() {
    let f = fixture(
        SHORT_SPINE,
        LONG_SPINE,
        &["Hips", "Spine", "Chest", "Head"],
        vec![VertexWeights::single(3)],
    );
    let adapted = f.adapt(AdaptOptions::default());

    assert!(adapted.report.structural_difference);
    assert!(adapted.report.full_recompute);
    assert_eq!(adapted.report.recomputed_bind_poses, 4);
    for (slot, &bone) in adapted.mesh.skin.bones.iter().enumerate() {
        let p = f.scene.world_position(bone);
        let local = adapted.mesh.skin.inverse_bind_matrices[slot].transform_point3(p);
        assert!(vec3_approx(local, Vec3::ZERO), "slot {slot}");
    }
}

#[test]
fn depth_jump_forces_full_recompute_without_detector() {
    let f = fixture(
        SHORT_SPINE,
        LONG_SPINE,
        &["Hips", "Head"],
        vec![VertexWeights::single(1)],
    );
    let adapted = f.adapt(AdaptOptions {
        detect_structural_differences: false,
        ..AdaptOptions::default()
    });

    // Head sits at depth 4 on the garment and depth 6 on the avatar.
    assert!(adapted.report.full_recompute);
    assert_eq!(adapted.report.recomputed_bind_poses, 2);
}

#[test]
fn degenerate_bone_keeps_original_bind_pose() {
    let mut f = missing_hand();
    let lower_arm = f.avatar.bone("LeftLowerArm");
    f.scene.get_node_mut(lower_arm).unwrap().transform.scale = Vec3::ZERO;
    let original = f.scene.skinned_mesh(f.mesh).unwrap().skin.inverse_bind_matrices.clone();

    let adapted = f.adapt(AdaptOptions::default());

    assert_eq!(adapted.mesh.skin.inverse_bind_matrices[3], original[3]);
    assert_eq!(adapted.report.recomputed_bind_poses, 0);
    assert!(adapted.report.warnings.iter().any(|w| w.contains("degenerate")));
    // The rest of the adaptation still happened.
    assert_eq!(adapted.mesh.skin.bones[3], lower_arm);
}

#[test]
fn bind_pose_adjustment_can_be_disabled() {
    let f = missing_hand();
    let original = f.scene.skinned_mesh(f.mesh).unwrap().skin.inverse_bind_matrices.clone();

    let adapted = f.adapt(AdaptOptions {
        adjust_bind_poses: false,
        ..AdaptOptions::default()
    });

    assert_eq!(adapted.mesh.skin.inverse_bind_matrices, original);
    assert_eq!(adapted.report.recomputed_bind_poses, 0);
}

// ============================================================================
// Weights
// ============================================================================

#[test]
fn weights_of_fallback_slots_are_redistributed() {
    let f = missing_hand();
    let adapted = f.adapt(AdaptOptions::default());
    let weights = adapted.mesh.skin.weights.as_ref().unwrap();

    assert_eq!(weights[0].pairs(), [(2, 1.0), (0, 0.0), (0, 0.0), (0, 0.0)]);
    assert_eq!(weights[1], VertexWeights::single(0));
    assert_eq!(weights[2].pairs(), [(3, 1.0), (0, 0.0), (0, 0.0), (0, 0.0)]);
    assert_eq!(weights[3].pairs(), [(1, 0.5), (2, 0.5), (0, 0.0), (0, 0.0)]);
    for vertex in weights {
        assert!(approx_eq(vertex.sum(), 1.0));
    }
    assert_eq!(adapted.report.redistributed_vertices, 3);
}

#[test]
fn dropped_influence_is_renormalized() {
    let mut weights = vec![VertexWeights::new([(5, 0.6), (7, 0.4), (0, 0.0), (0, 0.0)])];
    let unresolved: FxHashSet<u32> = [7].into_iter().collect();

    assert_eq!(redistribute_weights(&mut weights, &unresolved), 1);
    assert_eq!(weights[0].pairs(), [(5, 1.0), (0, 0.0), (0, 0.0), (0, 0.0)]);
}

#[test]
fn unreadable_weights_are_left_alone() {
    let mut f = missing_hand();
    f.scene.skinned_meshes[f.mesh].skin.weights_readable = false;
    let original = f.scene.skinned_mesh(f.mesh).unwrap().skin.weights.clone();

    let adapted = f.adapt(AdaptOptions::default());

    assert_eq!(adapted.mesh.skin.weights, original);
    assert_eq!(adapted.report.redistributed_vertices, 0);
    assert!(adapted.report.warnings.iter().any(|w| w.contains("not readable")));
    // Bones and bind poses were still adapted.
    assert_eq!(adapted.mesh.skin.bones[3], f.avatar.bone("LeftLowerArm"));
    assert_eq!(adapted.report.recomputed_bind_poses, 1);
}

#[test]
fn weight_redistribution_can_be_disabled() {
    let f = missing_hand();
    let original = f.scene.skinned_mesh(f.mesh).unwrap().skin.weights.clone();

    let adapted = f.adapt(AdaptOptions {
        redistribute_weights: false,
        ..AdaptOptions::default()
    });
    assert_eq!(adapted.mesh.skin.weights, original);
}

// ============================================================================
// Idempotence & Ownership
// ============================================================================

#[test]
fn stored_mesh_is_not_mutated() {
    let f = missing_hand();
    let before = f.scene.skinned_mesh(f.mesh).unwrap().clone();

    let _ = f.adapt(AdaptOptions::default());

    let after = f.scene.skinned_mesh(f.mesh).unwrap();
    assert_eq!(after.skin.bones, before.skin.bones);
    assert_eq!(after.skin.inverse_bind_matrices, before.skin.inverse_bind_matrices);
    assert_eq!(after.skin.weights, before.skin.weights);
}

#[test]
fn readapting_is_bit_identical() {
    let mut f = missing_hand();
    let first = f.adapt(AdaptOptions::default());
    f.scene.replace_skinned_mesh(f.mesh, first.mesh.clone());

    let second = f.adapt(AdaptOptions::default());

    assert!(second.report.slots.iter().all(|s| s.kind == ResolutionKind::Identity));
    assert_eq!(second.mesh.skin.bones, first.mesh.skin.bones);
    assert_eq!(
        second.mesh.skin.inverse_bind_matrices,
        first.mesh.skin.inverse_bind_matrices
    );
    assert_eq!(second.mesh.skin.weights, first.mesh.skin.weights);
    assert!(second.report.unresolved_bones.is_empty());
}

#[test]
fn readapting_after_full_recompute_is_bit_identical() {
    let mut f = fixture(
        SHORT_SPINE,
        LONG_SPINE,
        &["Hips", "Spine", "Chest", "Head"],
        vec![VertexWeights::new([(1, 0.5), (2, 0.5), (0, 0.0), (0, 0.0)])],
    );
    let first = f.adapt(AdaptOptions::default());
    f.scene.replace_skinned_mesh(f.mesh, first.mesh.clone());

    let second = f.adapt(AdaptOptions::default());

    assert_eq!(
        second.mesh.skin.inverse_bind_matrices,
        first.mesh.skin.inverse_bind_matrices
    );
    assert_eq!(second.mesh.skin.weights, first.mesh.skin.weights);
}

#[test]
fn custom_chain_without_fallbacks_reports_unresolved() {
    let f = missing_hand();
    let adapter = SkeletonAdapter::default().with_chains(primary_chain(), Vec::new());
    let adapted = adapter
        .adapt(
            &f.scene,
            f.mesh,
            f.avatar.root,
            &f.source,
            &f.target,
            &f.table,
            AdaptOptions::default(),
        )
        .unwrap();

    let slot = &adapted.report.slots[3];
    assert_eq!(slot.kind, ResolutionKind::Unresolved);
    // The slot keeps its original bone.
    assert_eq!(
        adapted.mesh.skin.bones[3],
        f.scene.skinned_mesh(f.mesh).unwrap().skin.bones[3]
    );
}

#[test]
fn root_fallback_skips_armature_and_mesh_nodes() {
    init_logger();
    let mut scene = Scene::new();
    let garment = build_rig(&mut scene, "Garment", SHORT_SPINE);
    let mesh = bind_mesh(&mut scene, &garment, "Dress", &["Chest"], vec![VertexWeights::single(0)]);

    let avatar = scene.create_node("Avatar");
    let armature = scene.build_node("Armature").armature().with_parent(avatar).build();
    let hips = scene.build_node("Hips").with_position(0.0, 1.0, 0.0).with_parent(armature).build();
    scene.build_node("Spine").with_parent(hips).build();
    scene.build_node("Body").renderable().with_parent(avatar).build();

    let analyzer = common::analyzer();
    let source = analyzer.analyze(&scene, garment.root, true);
    let target = analyzer.analyze(&scene, avatar, false);
    assert_eq!(target.first().map(|b| b.name.as_str()), Some("Armature"));
    assert!(target.iter().any(|b| b.name == "Body"));

    let adapter = SkeletonAdapter::default().with_chains(Vec::new(), vec![Box::new(RootResolver)]);
    let adapted = adapter
        .adapt(
            &scene,
            mesh,
            avatar,
            &source,
            &target,
            &MappingTable::new(),
            AdaptOptions::default(),
        )
        .unwrap();

    assert_eq!(adapted.report.slots[0].kind, ResolutionKind::Root);
    assert_eq!(adapted.mesh.skin.bones[0], hips);
}
