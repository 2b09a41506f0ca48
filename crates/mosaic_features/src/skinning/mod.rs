//! Hardware skinning.
//!
//! Fills the transform role for skinned meshes: blends the bone palette by the
//! per-vertex weights, moves position to world space (plus, when enabled, the
//! normal and the tangent frame), then applies the view-projection matrix. Two techniques share the same
//! configuration:
//!
//! - [`SkinningTechnique::Linear`]: weighted sum of bone-transformed
//!   positions/normals (3x4 matrix palette).
//! - [`SkinningTechnique::DualQuaternion`]: weighted sum of bone dual
//!   quaternions, normalized once, then applied (2x4 palette).
//!
//! Whether the bone path runs is decided per pass in
//! [`pre_add_to_render_state`](SubRenderState::pre_add_to_render_state) and
//! checked again against the capabilities the program is assembled for. When
//! it does not run, the feature falls back to plain world /
//! world-view-projection transforms and resolves no bone parameter at all.
//!
//! Not implemented (kept as extension points): the HLSL-specific world matrix
//! layout and scale/shear-aware normal recalculation.

mod dual_quaternion;
mod linear;

use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use mosaic_core::{Capabilities, Result};
use mosaic_program::library;
use mosaic_program::{
    AutoConstant, Content, DataType, FunctionInvocation, OperandMask, OrderCounter, ParameterId, Program, ProgramSet,
    Semantic,
};
use serde::{Deserialize, Serialize};

use crate::sub_render_state::{PassContext, SubRenderState, order, resolved};

/// Largest bone palette the bone path accepts.
pub const MAX_BONES: u16 = 256;
/// Largest number of weights per vertex.
pub const MAX_WEIGHTS: u8 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkinningTechnique {
    Linear,
    #[default]
    DualQuaternion,
}

/// Equality and hashing ignore the bone layout when the bone path is off, so
/// every rigid fallback of one technique is the same configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SkinningConfig {
    pub technique: SkinningTechnique,
    pub bone_count: u16,
    pub weight_count: u8,
    /// Flip bone dual quaternions into the hemisphere of the first one before
    /// blending. Dual quaternion only.
    pub correct_antipodality: bool,
    /// Blend and apply a per-bone scale/shear matrix first. Dual quaternion only.
    pub scale_shear: bool,
    /// Also produce the world-space normal.
    pub blend_normals: bool,
    /// Also produce the world-space tangent and binormal.
    pub blend_tangents: bool,
    /// Derived: the bone path is usable for the current pass.
    pub do_bone_calculations: bool,
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            technique: SkinningTechnique::DualQuaternion,
            bone_count: 0,
            weight_count: 0,
            correct_antipodality: false,
            scale_shear: false,
            blend_normals: true,
            blend_tangents: false,
            do_bone_calculations: false,
        }
    }
}

impl SkinningConfig {
    #[must_use]
    pub fn new(technique: SkinningTechnique, bone_count: u16, weight_count: u8) -> Self {
        Self {
            technique,
            bone_count,
            weight_count,
            do_bone_calculations: bone_path_supported(bone_count, weight_count, MAX_BONES),
            ..Self::default()
        }
    }
}

impl Hash for SkinningConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.technique.hash(state);
        self.do_bone_calculations.hash(state);
        self.blend_normals.hash(state);
        self.blend_tangents.hash(state);
        if self.do_bone_calculations {
            self.bone_count.hash(state);
            self.weight_count.hash(state);
            self.correct_antipodality.hash(state);
            self.scale_shear.hash(state);
        }
    }
}

impl PartialEq for SkinningConfig {
    fn eq(&self, other: &Self) -> bool {
        let same_layout = !self.do_bone_calculations
            || (self.bone_count == other.bone_count
                && self.weight_count == other.weight_count
                && self.correct_antipodality == other.correct_antipodality
                && self.scale_shear == other.scale_shear);
        self.technique == other.technique
            && self.do_bone_calculations == other.do_bone_calculations
            && self.blend_normals == other.blend_normals
            && self.blend_tangents == other.blend_tangents
            && same_layout
    }
}

impl Eq for SkinningConfig {}

/// `1..=256` bones, `1..=4` weights, and no more bones than the hardware allows.
#[must_use]
pub fn bone_path_supported(bone_count: u16, weight_count: u8, max_bones: u16) -> bool {
    (1..=MAX_BONES).contains(&bone_count) && (1..=MAX_WEIGHTS).contains(&weight_count) && bone_count <= max_bones
}

/// An object-space direction and its world-space counterpart.
#[derive(Debug, Clone, Copy)]
struct DirectionPair {
    input: ParameterId,
    world: ParameterId,
}

#[derive(Debug, Default, Clone)]
struct SkinningParameters {
    position_in: Option<ParameterId>,
    position_world: Option<ParameterId>,
    position_out: Option<ParameterId>,
    /// Normal, then tangent and binormal, as enabled.
    directions: SmallVec<[DirectionPair; 3]>,

    // Fallback path
    world: Option<ParameterId>,
    world_view_proj: Option<ParameterId>,

    // Bone path
    indices: Option<ParameterId>,
    weights: Option<ParameterId>,
    view_proj: Option<ParameterId>,
    bones: Option<ParameterId>,
    one: Option<ParameterId>,
    temp4: Option<ParameterId>,
    temp3: Option<ParameterId>,
    blend_dq: Option<ParameterId>,
    temp_dq: Option<ParameterId>,
    adjusted_dq: Option<ParameterId>,
    scale_shear: Option<ParameterId>,
    blend_s: Option<ParameterId>,
    temp_s: Option<ParameterId>,
}

#[derive(Debug, Default, Clone)]
pub struct HardwareSkinning {
    config: SkinningConfig,
    params: SkinningParameters,
}

impl HardwareSkinning {
    pub const TYPE_NAME: &'static str = "SGX_HardwareSkinning";

    #[must_use]
    pub fn new(config: SkinningConfig) -> Self {
        Self {
            config,
            params: SkinningParameters::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SkinningConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SkinningConfig {
        &mut self.config
    }

    fn resolve_common(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let p = &mut self.params;
        let vs = programs.vertex_mut();
        p.position_in = Some(vs.resolve_input(Semantic::Position, 0, Content::PositionObjectSpace, DataType::Float4)?);
        p.position_world = Some(vs.resolve_local(Semantic::Position, 0, Content::PositionWorldSpace, DataType::Float4)?);

        let (normals, tangents) = (self.config.blend_normals, self.config.blend_tangents);
        let wanted = [
            (normals, Semantic::Normal, Content::NormalObjectSpace, Content::NormalWorldSpace),
            (tangents, Semantic::Tangent, Content::TangentObjectSpace, Content::TangentWorldSpace),
            (tangents, Semantic::Binormal, Content::BinormalObjectSpace, Content::BinormalWorldSpace),
        ];
        p.directions.clear();
        for (_, semantic, object, world) in wanted.into_iter().filter(|w| w.0) {
            p.directions.push(DirectionPair {
                input: vs.resolve_input(semantic, 0, object, DataType::Float3)?,
                world: vs.resolve_local(semantic, 0, world, DataType::Float3)?,
            });
        }

        p.position_out = Some(programs.resolve_clip_position()?);
        Ok(())
    }

    fn resolve_fallback(&mut self, vs: &mut Program) -> Result<()> {
        self.params.world = Some(vs.resolve_auto_constant(AutoConstant::WorldMatrix, None)?);
        self.params.world_view_proj = Some(vs.resolve_auto_constant(AutoConstant::WorldViewProjMatrix, None)?);
        Ok(())
    }

    fn resolve_bone_inputs(&mut self, vs: &mut Program) -> Result<()> {
        let p = &mut self.params;
        p.indices = Some(vs.resolve_input(Semantic::BlendIndices, 0, Content::BlendIndices, DataType::Float4)?);
        p.weights = Some(vs.resolve_input(Semantic::BlendWeights, 0, Content::BlendWeights, DataType::Float4)?);
        p.view_proj = Some(vs.resolve_auto_constant(AutoConstant::ViewProjMatrix, None)?);
        vs.set_skeletal_animation(true);
        Ok(())
    }

    fn add_fallback_invocations(&self, vs: &mut Program, counter: &mut OrderCounter) -> Result<()> {
        let name = Self::TYPE_NAME;
        let p = &self.params;
        let position = resolved(p.position_in, name, "position_in")?;
        vs.add_invocation(
            FunctionInvocation::new(library::FFP_TRANSFORM, order::TRANSFORM, counter.next())
                .input(resolved(p.world, name, "world")?)
                .input(position)
                .output(resolved(p.position_world, name, "position_world")?),
        )?;
        vs.add_invocation(
            FunctionInvocation::new(library::FFP_TRANSFORM, order::TRANSFORM, counter.next())
                .input(resolved(p.world_view_proj, name, "world_view_proj")?)
                .input(position)
                .output(resolved(p.position_out, name, "position_out")?),
        )?;
        let world = resolved(p.world, name, "world")?;
        for dir in &p.directions {
            vs.add_invocation(
                FunctionInvocation::new(library::FFP_TRANSFORM, order::TRANSFORM, counter.next())
                    .input(world)
                    .input(dir.input)
                    .output(dir.world),
            )?;
        }
        Ok(())
    }
}

/// Emits `Assign(temp, acc)` for the first weight and `Add(temp, acc, acc)`
/// for the others.
fn accumulate(
    vs: &mut Program,
    counter: &mut OrderCounter,
    index: u8,
    temp: ParameterId,
    acc: ParameterId,
) -> Result<()> {
    let inv = if index == 0 {
        FunctionInvocation::new(library::FFP_ASSIGN, order::TRANSFORM, counter.next())
            .input(temp)
            .output(acc)
    } else {
        FunctionInvocation::new(library::FFP_ADD, order::TRANSFORM, counter.next())
            .input(temp)
            .input(acc)
            .output(acc)
    };
    vs.add_invocation(inv)
}

fn weight_mask(index: u8) -> OperandMask {
    OperandMask::component(usize::from(index))
}

impl SubRenderState for HardwareSkinning {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        order::TRANSFORM
    }

    fn pre_add_to_render_state(&mut self, pass: &PassContext, caps: &Capabilities) -> bool {
        let (bones, weights, valid) = match pass.skinning {
            Some(data) => (data.bone_count, data.weight_count, data.is_valid),
            None => (self.config.bone_count, self.config.weight_count, true),
        };
        self.config.bone_count = bones;
        self.config.weight_count = weights;
        self.config.do_bone_calculations = valid && bone_path_supported(bones, weights, caps.max_bone_count);

        if !self.config.do_bone_calculations && (bones > 0 || weights > 0) {
            log::warn!(
                "Hardware skinning falls back to rigid transform (bones {bones}, weights {weights}, valid {valid}, \
                 hardware limit {})",
                caps.max_bone_count
            );
        }
        true
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        self.params = SkinningParameters::default();
        let max_bones = programs.vertex().capabilities().max_bone_count;
        let (bones, weights) = (self.config.bone_count, self.config.weight_count);
        if self.config.do_bone_calculations && !bone_path_supported(bones, weights, max_bones) {
            log::warn!(
                "Hardware skinning falls back to rigid transform (bones {bones}, weights {weights}, hardware limit \
                 {max_bones})"
            );
            self.config.do_bone_calculations = false;
        }
        self.resolve_common(programs)?;
        let vs = programs.vertex_mut();
        if !self.config.do_bone_calculations {
            return self.resolve_fallback(vs);
        }
        self.resolve_bone_inputs(vs)?;
        match self.config.technique {
            SkinningTechnique::Linear => linear::resolve_parameters(&self.config, &mut self.params, vs),
            SkinningTechnique::DualQuaternion => {
                dual_quaternion::resolve_parameters(&self.config, &mut self.params, vs)
            }
        }
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        vs.add_dependency(library::LIB_COMMON);
        vs.add_dependency(library::LIB_TRANSFORM);
        if self.config.do_bone_calculations && self.config.technique == SkinningTechnique::DualQuaternion {
            vs.add_dependency(library::LIB_DUAL_QUATERNION);
        }
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        let mut counter = OrderCounter::new();
        if !self.config.do_bone_calculations {
            return self.add_fallback_invocations(vs, &mut counter);
        }
        match self.config.technique {
            SkinningTechnique::Linear => linear::add_function_invocations(&self.config, &self.params, vs, &mut counter),
            SkinningTechnique::DualQuaternion => {
                dual_quaternion::add_function_invocations(&self.config, &self.params, vs, &mut counter)
            }
        }
    }

    impl_feature_config!();
}
