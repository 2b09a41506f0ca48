//! Feature composition tests
//!
//! Tests for:
//! - Deterministic assembly
//! - Fog blend placement in both calculation modes
//! - Hardware skinning fallback, hardware bone limit and dual quaternion accumulation
//! - Skinned tangent frame, antipodality correction and scale/shear
//! - Vertex/fragment varying linkage
//! - Factory registry lifecycle

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use mosaic::core::{Capabilities, ShaderError, TargetLanguage};
use mosaic::features::{
    ColourConfig, ColourFeature, DefaultFactory, FactoryRegistry, FogCalcMode, FogConfig, FogFeature, FogMode,
    HardwareSkinning, LightingFeature, RenderState, SkinningConfig, SkinningTechnique, TextureBlend, TextureUnit,
    TexturingConfig, TexturingFeature, TransformFeature,
};
use mosaic::generator::{Fingerprint, ProgramAssembler, ProgramCache};
use mosaic::program::library;
use mosaic::program::{AutoConstant, Content, Evaluator, ParameterKind, Program, Semantic, Value};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn vec4_approx(a: Vec4, b: Vec4) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn textured_state(units: &[(u8, TextureBlend)]) -> RenderState {
    let mut rs = RenderState::new();
    rs.add(Box::new(TransformFeature::default())).unwrap();
    rs.add(Box::new(ColourFeature::new(ColourConfig { vertex_colour: true })))
        .unwrap();
    let units = units
        .iter()
        .map(|&(texcoord_index, blend)| TextureUnit { texcoord_index, blend })
        .collect();
    rs.add(Box::new(TexturingFeature::new(TexturingConfig { units })))
        .unwrap();
    rs
}

fn fogged_state(calc_mode: FogCalcMode) -> RenderState {
    let mut rs = textured_state(&[(0, TextureBlend::Modulate)]);
    rs.add(Box::new(FogFeature::new(FogConfig {
        mode: FogMode::Exp,
        density: 0.02,
        calc_mode,
        ..Default::default()
    })))
    .unwrap();
    rs
}

fn skinned_state(config: SkinningConfig) -> RenderState {
    let mut rs = RenderState::new();
    rs.add(Box::new(HardwareSkinning::new(config))).unwrap();
    rs.add(Box::new(ColourFeature::default())).unwrap();
    rs
}

/// Rigid transform with rotation `angle` about Z and translation `t`, as a
/// `[real, dual]` pair with the scalar part in `x`.
fn rigid_dq(angle: f32, t: [f32; 3]) -> [Vec4; 2] {
    let (s, c) = (angle * 0.5).sin_cos();
    let real = Vec4::new(c, 0.0, 0.0, s);
    // dual = 0.5 * (0, t) * real
    let dual = 0.5
        * Vec4::new(
            -t[2] * s,
            t[0] * c + t[1] * s,
            t[1] * c - t[0] * s,
            t[2] * c,
        );
    [real, dual]
}

const IDENTITY_DQ: [Vec4; 2] = [Vec4::X, Vec4::ZERO];

/// Value of the local holding `content` after evaluation.
fn local_value(eval: &Evaluator<'_>, vs: &Program, content: Content) -> Vec4 {
    let id = vs.locals().find(|l| l.content() == content).unwrap().id();
    eval.get(id).and_then(Value::as_vector).unwrap()
}

/// Binds the per-vertex inputs every skinned program reads.
fn bind_skinned_vertex(eval: &mut Evaluator<'_>, vs: &Program, indices: Vec4, weights: Vec4) {
    eval.set(vs.find_input(Semantic::Position, 0).unwrap(), Value::Vector(Vec4::new(1.0, 2.0, 3.0, 1.0)))
        .set(vs.find_input(Semantic::BlendIndices, 0).unwrap(), Value::Vector(indices))
        .set(vs.find_input(Semantic::BlendWeights, 0).unwrap(), Value::Vector(weights))
        .set(
            vs.find_auto_constant(AutoConstant::ViewProjMatrix).unwrap(),
            Value::Matrix(Mat4::IDENTITY),
        );
    for (semantic, value) in [
        (Semantic::Normal, Vec4::Z),
        (Semantic::Tangent, Vec4::X),
        (Semantic::Binormal, Vec4::Y),
    ] {
        if let Some(id) = vs.find_input(semantic, 0) {
            eval.set(id, Value::Vector(value));
        }
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn same_composition_produces_identical_output() {
    let caps = Capabilities::default();
    let a = fogged_state(FogCalcMode::PerPixel);
    let b = fogged_state(FogCalcMode::PerPixel);

    assert_eq!(
        Fingerprint::compute(&a, TargetLanguage::Glsl, &caps),
        Fingerprint::compute(&b, TargetLanguage::Glsl, &caps)
    );

    let pa = ProgramAssembler::assemble(&a, TargetLanguage::Glsl, &caps).unwrap();
    let pb = ProgramAssembler::assemble(&b, TargetLanguage::Glsl, &caps).unwrap();
    assert_eq!(pa.vertex_source, pb.vertex_source);
    assert_eq!(pa.fragment_source, pb.fragment_source);
}

#[test]
fn configuration_changes_the_fingerprint() {
    let caps = Capabilities::default();
    let vertex = fogged_state(FogCalcMode::PerVertex);
    let pixel = fogged_state(FogCalcMode::PerPixel);
    assert_ne!(
        Fingerprint::compute(&vertex, TargetLanguage::Glsl, &caps),
        Fingerprint::compute(&pixel, TargetLanguage::Glsl, &caps)
    );
}

// ============================================================================
// Fog
// ============================================================================

#[test]
fn fog_blend_is_the_last_fragment_invocation() {
    let caps = Capabilities::default();
    for (mode, expected) in [
        (FogCalcMode::PerVertex, library::FFP_LERP),
        (FogCalcMode::PerPixel, library::FFP_PIXEL_FOG_EXP),
    ] {
        let assembled = ProgramAssembler::assemble(&fogged_state(mode), TargetLanguage::Glsl, &caps).unwrap();
        let fs = assembled.program_set.fragment();
        let last = fs.entry_point().sorted_invocations().last().map(|inv| inv.function_name());
        assert_eq!(last, Some(expected), "{mode:?}");
        assert!(fs.find_uniform("gFogColor").is_some());
    }
}

#[test]
fn fog_with_inverted_range_is_rejected() {
    let mut rs = textured_state(&[(0, TextureBlend::Modulate)]);
    rs.add(Box::new(FogFeature::new(FogConfig {
        mode: FogMode::Linear,
        start: 50.0,
        end: 10.0,
        ..Default::default()
    })))
    .unwrap();
    let err = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap_err();
    assert!(matches!(err, ShaderError::Configuration { .. }));
}

// ============================================================================
// Hardware Skinning
// ============================================================================

#[test]
fn skinning_without_bones_or_weights_falls_back_to_rigid_transform() {
    let caps = Capabilities::default();
    for (bones, weights) in [(0, 2), (30, 0)] {
        let rs = skinned_state(SkinningConfig::new(SkinningTechnique::DualQuaternion, bones, weights));
        let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &caps).unwrap();
        let vs = assembled.program_set.vertex();

        assert!(vs.find_input(Semantic::BlendIndices, 0).is_none());
        assert!(vs.find_input(Semantic::BlendWeights, 0).is_none());
        assert!(vs.find_auto_constant(AutoConstant::WorldDualQuaternionArray2x4).is_none());
        assert!(vs.find_auto_constant(AutoConstant::WorldMatrix).is_some());
        assert!(!vs.has_skeletal_animation());
    }
}

#[test]
fn skinning_replaces_the_transform_feature() {
    let mut rs = skinned_state(SkinningConfig::new(SkinningTechnique::Linear, 20, 2));
    rs.add(Box::new(TransformFeature::default())).unwrap();
    let err = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap_err();
    assert!(matches!(err, ShaderError::Configuration { .. }));
}

#[test]
fn dual_quaternion_weights_accumulate_additively() {
    let rs = skinned_state(SkinningConfig::new(SkinningTechnique::DualQuaternion, 2, 2));
    let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap();
    let vs = assembled.program_set.vertex();

    let t0 = rigid_dq(0.3, [1.0, 0.0, 0.0]);
    let t1 = rigid_dq(-0.5, [0.0, 2.0, 1.0]);

    let mut eval = Evaluator::new(vs);
    eval.set(
        vs.find_input(Semantic::BlendIndices, 0).unwrap(),
        Value::Vector(Vec4::new(0.0, 1.0, 0.0, 0.0)),
    )
    .set(
        vs.find_input(Semantic::BlendWeights, 0).unwrap(),
        Value::Vector(Vec4::new(0.7, 0.3, 0.0, 0.0)),
    )
    .set_array(
        vs.find_auto_constant(AutoConstant::WorldDualQuaternionArray2x4).unwrap(),
        vec![Value::DualQuaternion(t0), Value::DualQuaternion(t1)],
    );
    eval.run_until(|inv| inv.function_name() == library::FFP_ADD).unwrap();

    let blended = eval
        .get(vs.find_local_named("lBlendDQ").unwrap())
        .and_then(Value::as_dual_quaternion)
        .unwrap();
    assert!(vec4_approx(blended[0], t0[0] * 0.7 + t1[0] * 0.3));
    assert!(vec4_approx(blended[1], t0[1] * 0.7 + t1[1] * 0.3));
}

#[test]
fn linear_skinning_of_a_single_identity_bone_keeps_the_position() {
    let rs = skinned_state(SkinningConfig::new(SkinningTechnique::Linear, 1, 1));
    let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap();
    let vs = assembled.program_set.vertex();

    let position = Vec4::new(1.0, 2.0, 3.0, 1.0);
    let mut eval = Evaluator::new(vs);
    eval.set(vs.find_input(Semantic::Position, 0).unwrap(), Value::Vector(position))
        .set(vs.find_input(Semantic::Normal, 0).unwrap(), Value::Vector(Vec4::Z))
        .set(vs.find_input(Semantic::BlendIndices, 0).unwrap(), Value::Vector(Vec4::ZERO))
        .set(vs.find_input(Semantic::BlendWeights, 0).unwrap(), Value::Vector(Vec4::X))
        .set(
            vs.find_auto_constant(AutoConstant::ViewProjMatrix).unwrap(),
            Value::Matrix(glam::Mat4::IDENTITY),
        )
        .set_array(
            vs.find_auto_constant(AutoConstant::WorldMatrixArray3x4).unwrap(),
            vec![Value::Matrix(glam::Mat4::IDENTITY)],
        );
    eval.run().unwrap();

    let out = eval
        .get(vs.find_local_named("lPositionWorld").unwrap())
        .and_then(Value::as_vector)
        .unwrap();
    assert!(vec4_approx(out, position));
}

#[test]
fn bone_palette_never_exceeds_the_hardware_limit() {
    let rs = skinned_state(SkinningConfig::new(SkinningTechnique::DualQuaternion, 200, 2));

    // default capabilities address 70 bones
    let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap();
    let vs = assembled.program_set.vertex();
    assert!(vs.find_auto_constant(AutoConstant::WorldDualQuaternionArray2x4).is_none());
    assert!(vs.find_input(Semantic::BlendIndices, 0).is_none());
    assert!(vs.find_auto_constant(AutoConstant::WorldMatrix).is_some());

    let cache = ProgramCache::new();
    let entry = cache
        .get_or_create(&rs, TargetLanguage::Glsl, &Capabilities::default())
        .unwrap();
    assert!(entry.vertex.uniforms.iter().all(|u| u.array_size.is_none()));
    // the cached composition is the request, not the downgraded working copy
    assert_eq!(entry.composition, rs);

    let wide = Capabilities {
        max_bone_count: 256,
        ..Capabilities::default()
    };
    let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &wide).unwrap();
    let vs = assembled.program_set.vertex();
    let palette = vs.find_auto_constant(AutoConstant::WorldDualQuaternionArray2x4).unwrap();
    assert_eq!(vs.parameter(palette).unwrap().array_size(), Some(200));
}

#[test]
fn tangent_frame_follows_the_bone_rotation() {
    let quarter_turn = Mat4::from_rotation_z(FRAC_PI_2);
    for technique in [SkinningTechnique::DualQuaternion, SkinningTechnique::Linear] {
        let rs = skinned_state(SkinningConfig {
            blend_tangents: true,
            ..SkinningConfig::new(technique, 1, 1)
        });
        let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap();
        let vs = assembled.program_set.vertex();

        let mut eval = Evaluator::new(vs);
        bind_skinned_vertex(&mut eval, vs, Vec4::ZERO, Vec4::X);
        match technique {
            SkinningTechnique::DualQuaternion => eval.set_array(
                vs.find_auto_constant(AutoConstant::WorldDualQuaternionArray2x4).unwrap(),
                vec![Value::DualQuaternion(rigid_dq(FRAC_PI_2, [0.0, 0.0, 0.0]))],
            ),
            SkinningTechnique::Linear => eval.set_array(
                vs.find_auto_constant(AutoConstant::WorldMatrixArray3x4).unwrap(),
                vec![Value::Matrix(quarter_turn)],
            ),
        };
        eval.run().unwrap();

        assert!(vec4_approx(local_value(&eval, vs, Content::NormalWorldSpace), Vec4::Z), "{technique:?}");
        assert!(vec4_approx(local_value(&eval, vs, Content::TangentWorldSpace), Vec4::Y), "{technique:?}");
        assert!(vec4_approx(local_value(&eval, vs, Content::BinormalWorldSpace), -Vec4::X), "{technique:?}");
    }
}

#[test]
fn rigid_fallback_moves_the_tangent_frame_to_world_space() {
    let rs = skinned_state(SkinningConfig {
        blend_tangents: true,
        ..SkinningConfig::new(SkinningTechnique::DualQuaternion, 0, 2)
    });
    let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap();
    let vs = assembled.program_set.vertex();
    assert!(vs.find_input(Semantic::Tangent, 0).is_some());
    assert!(vs.find_input(Semantic::Binormal, 0).is_some());

    let mut eval = Evaluator::new(vs);
    eval.set(
        vs.find_input(Semantic::Position, 0).unwrap(),
        Value::Vector(Vec4::new(1.0, 0.0, 0.0, 1.0)),
    )
    .set(vs.find_input(Semantic::Normal, 0).unwrap(), Value::Vector(Vec4::Z))
    .set(vs.find_input(Semantic::Tangent, 0).unwrap(), Value::Vector(Vec4::X))
    .set(vs.find_input(Semantic::Binormal, 0).unwrap(), Value::Vector(Vec4::Y))
    .set(
        vs.find_auto_constant(AutoConstant::WorldMatrix).unwrap(),
        Value::Matrix(Mat4::from_rotation_z(FRAC_PI_2)),
    )
    .set(
        vs.find_auto_constant(AutoConstant::WorldViewProjMatrix).unwrap(),
        Value::Matrix(Mat4::IDENTITY),
    );
    eval.run().unwrap();

    assert!(vec4_approx(local_value(&eval, vs, Content::TangentWorldSpace), Vec4::Y));
    assert!(vec4_approx(local_value(&eval, vs, Content::BinormalWorldSpace), -Vec4::X));
    assert!(vec4_approx(local_value(&eval, vs, Content::NormalWorldSpace), Vec4::Z));
}

#[test]
fn antipodal_bones_are_blended_in_one_hemisphere() {
    let rs = skinned_state(SkinningConfig {
        correct_antipodality: true,
        ..SkinningConfig::new(SkinningTechnique::DualQuaternion, 2, 2)
    });
    let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap();
    let vs = assembled.program_set.vertex();

    let t0 = rigid_dq(0.3, [1.0, 0.0, 0.0]);
    let t1 = rigid_dq(-0.5, [0.0, 2.0, 1.0]);
    // same rotation as t1, stored in the opposite hemisphere
    let flipped = [-t1[0], -t1[1]];
    let palette = vs.find_auto_constant(AutoConstant::WorldDualQuaternionArray2x4).unwrap();

    let mut eval = Evaluator::new(vs);
    bind_skinned_vertex(&mut eval, vs, Vec4::new(0.0, 1.0, 0.0, 0.0), Vec4::new(0.7, 0.3, 0.0, 0.0));
    eval.set_array(palette, vec![Value::DualQuaternion(t0), Value::DualQuaternion(flipped)]);
    eval.run_until(|inv| inv.function_name() == library::FFP_ADD).unwrap();

    let blended = eval
        .get(vs.find_local_named("lBlendDQ").unwrap())
        .and_then(Value::as_dual_quaternion)
        .unwrap();
    assert!(vec4_approx(blended[0], t0[0] * 0.7 + t1[0] * 0.3));
    assert!(vec4_approx(blended[1], t0[1] * 0.7 + t1[1] * 0.3));

    // the palette itself is left as supplied
    assert_eq!(
        eval.get(palette),
        Some(&Value::Array(vec![Value::DualQuaternion(t0), Value::DualQuaternion(flipped)]))
    );
}

#[test]
fn scale_shear_is_blended_and_applied_before_the_rigid_part() {
    let rs = skinned_state(SkinningConfig {
        scale_shear: true,
        ..SkinningConfig::new(SkinningTechnique::DualQuaternion, 2, 2)
    });
    let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap();
    let vs = assembled.program_set.vertex();

    let mut eval = Evaluator::new(vs);
    bind_skinned_vertex(&mut eval, vs, Vec4::new(0.0, 1.0, 0.0, 0.0), Vec4::new(0.5, 0.5, 0.0, 0.0));
    eval.set_array(
        vs.find_auto_constant(AutoConstant::WorldScaleShearMatrixArray3x4).unwrap(),
        vec![
            Value::Matrix(Mat4::from_scale(Vec3::splat(2.0))),
            Value::Matrix(Mat4::from_scale(Vec3::splat(4.0))),
        ],
    )
    .set_array(
        vs.find_auto_constant(AutoConstant::WorldDualQuaternionArray2x4).unwrap(),
        vec![
            Value::DualQuaternion(IDENTITY_DQ),
            Value::DualQuaternion(rigid_dq(0.0, [0.0, 0.0, 5.0])),
        ],
    );
    eval.run().unwrap();

    assert_eq!(
        eval.get(vs.find_local_named("lBlendS").unwrap()),
        Some(&Value::Matrix(Mat4::from_scale(Vec3::splat(3.0))))
    );
    // scaled (3, 6, 9), then half of the second bone's translation
    let world = eval
        .get(vs.find_local_named("lPositionWorld").unwrap())
        .and_then(Value::as_vector)
        .unwrap();
    assert!(vec4_approx(world, Vec4::new(3.0, 6.0, 11.5, 1.0)), "{world}");
}

// ============================================================================
// Stage Interface
// ============================================================================

#[test]
fn varyings_link_vertex_outputs_to_fragment_inputs() {
    let mut rs = textured_state(&[(0, TextureBlend::Modulate), (1, TextureBlend::Add), (0, TextureBlend::Replace)]);
    rs.add(Box::new(LightingFeature::default())).unwrap();
    let assembled = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap();
    let set = &assembled.program_set;

    // diffuse colour + two distinct coordinate sets
    assert_eq!(set.varyings().len(), 3);
    for v in set.varyings() {
        let out = set.vertex().parameter(v.vertex_output).unwrap();
        let inp = set.fragment().parameter(v.fragment_input).unwrap();
        assert_eq!(out.kind(), ParameterKind::Output);
        assert_eq!(inp.kind(), ParameterKind::Input);
        assert_eq!(out.data_type(), inp.data_type());
        assert_eq!(out.index(), inp.index());
    }
    assert_eq!(set.fragment().inputs().count(), set.varyings().len());
}

#[test]
fn exhausted_texture_units_fail_the_whole_assembly() {
    let units = vec![(0, TextureBlend::Modulate); 9];
    let rs = textured_state(&units);
    let err = ProgramAssembler::assemble(&rs, TargetLanguage::Glsl, &Capabilities::default()).unwrap_err();
    assert!(err.is_resolution_failure());
}

// ============================================================================
// Factory Registry
// ============================================================================

#[test]
fn registry_rejects_registration_after_freeze() {
    let registry = FactoryRegistry::with_builtins();
    assert!(registry.contains(FogFeature::TYPE_NAME));
    assert!(matches!(
        registry.register_factory(Arc::new(DefaultFactory::<FogFeature>::new())),
        Err(ShaderError::DuplicateFactory(_))
    ));

    registry.freeze();
    assert!(registry.is_frozen());
    let fresh = FactoryRegistry::new();
    fresh.freeze();
    assert!(matches!(
        fresh.register_factory(Arc::new(DefaultFactory::<FogFeature>::new())),
        Err(ShaderError::RegistryFrozen(_))
    ));

    let created = registry.create_instance(HardwareSkinning::TYPE_NAME).unwrap();
    assert_eq!(created.type_name(), HardwareSkinning::TYPE_NAME);
    assert_eq!(registry.type_names().len(), 6);
}

#[test]
fn render_state_from_type_names_is_ordered() {
    let registry = FactoryRegistry::with_builtins();
    let rs = RenderState::from_types(
        &registry,
        &[TexturingFeature::TYPE_NAME, ColourFeature::TYPE_NAME, TransformFeature::TYPE_NAME],
    )
    .unwrap();
    let names: Vec<_> = rs.iter().map(|s| s.type_name()).collect();
    assert_eq!(
        names,
        [TransformFeature::TYPE_NAME, ColourFeature::TYPE_NAME, TexturingFeature::TYPE_NAME]
    );
}
