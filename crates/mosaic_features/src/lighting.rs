//! Per-vertex directional lighting (Lambert diffuse plus ambient).

use mosaic_core::{Capabilities, Result, ShaderError};
use mosaic_program::library;
use mosaic_program::{
    AutoConstant, Content, DataType, FunctionInvocation, OperandMask, OrderCounter, ParameterId, ProgramSet,
    Semantic,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::sub_render_state::{PassContext, SubRenderState, order, resolved};

/// Upper bound on directional lights per pass.
pub const MAX_DIRECTIONAL_LIGHTS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightingConfig {
    pub directional_lights: u8,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self { directional_lights: 1 }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct LightParameters {
    direction: Option<ParameterId>,
    diffuse: Option<ParameterId>,
}

#[derive(Debug, Default, Clone)]
struct LightingParameters {
    world: Option<ParameterId>,
    normal_in: Option<ParameterId>,
    normal_world: Option<ParameterId>,
    /// Set when an earlier transform-role feature already produces the world normal.
    normal_provided: bool,
    ambient: Option<ParameterId>,
    lit: Option<ParameterId>,
    diffuse_out: Option<ParameterId>,
    lights: SmallVec<[LightParameters; 4]>,
}

/// Modulates the vertex diffuse colour by `ambient + Σ max(N·L, 0) · diffuse`.
///
/// Expects the diffuse colour to be seeded by [`ColourFeature`](crate::ColourFeature).
#[derive(Debug, Default, Clone)]
pub struct LightingFeature {
    config: LightingConfig,
    params: LightingParameters,
}

impl LightingFeature {
    pub const TYPE_NAME: &'static str = "FFP_Lighting";

    #[must_use]
    pub fn new(config: LightingConfig) -> Self {
        Self {
            config,
            params: LightingParameters::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LightingConfig {
        &self.config
    }
}

impl SubRenderState for LightingFeature {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        order::LIGHTING
    }

    fn pre_add_to_render_state(&mut self, _pass: &PassContext, _caps: &Capabilities) -> bool {
        self.config.directional_lights > 0
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let count = self.config.directional_lights;
        if count > MAX_DIRECTIONAL_LIGHTS {
            return Err(ShaderError::configuration(
                Self::TYPE_NAME,
                format!("{count} directional lights requested, at most {MAX_DIRECTIONAL_LIGHTS} supported"),
            ));
        }

        let vs = programs.vertex_mut();
        let p = &mut self.params;
        p.normal_provided = vs.locals().any(|l| l.content() == Content::NormalWorldSpace);
        if !p.normal_provided {
            p.world = Some(vs.resolve_auto_constant(AutoConstant::WorldMatrix, None)?);
            p.normal_in = Some(vs.resolve_input(Semantic::Normal, 0, Content::NormalObjectSpace, DataType::Float3)?);
        }
        p.normal_world = Some(vs.resolve_local(Semantic::Normal, 0, Content::NormalWorldSpace, DataType::Float3)?);
        p.ambient = Some(vs.resolve_auto_constant(AutoConstant::AmbientLightColour, None)?);
        p.lit = Some(vs.resolve_local_named("lLitColour", DataType::Float4)?);

        p.lights.clear();
        for i in 0..count {
            p.lights.push(LightParameters {
                direction: Some(vs.resolve_auto_constant(AutoConstant::LightDirectionWorld(i), None)?),
                diffuse: Some(vs.resolve_auto_constant(AutoConstant::LightDiffuseColour(i), None)?),
            });
        }

        p.diffuse_out = Some(
            programs
                .resolve_varying(Content::ColorDiffuse, DataType::Float4)?
                .vertex_output,
        );
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        vs.add_dependency(library::LIB_COMMON);
        vs.add_dependency(library::LIB_TRANSFORM);
        vs.add_dependency(library::LIB_LIGHTING);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let name = Self::TYPE_NAME;
        let p = &self.params;
        let vs = programs.vertex_mut();
        let mut counter = OrderCounter::new();
        let group = order::LIGHTING;

        let normal_world = resolved(p.normal_world, name, "normal_world")?;
        let lit = resolved(p.lit, name, "lit")?;
        let xyz = OperandMask::X | OperandMask::Y | OperandMask::Z;

        if !p.normal_provided {
            vs.add_invocation(
                FunctionInvocation::new(library::FFP_TRANSFORM, group, counter.next())
                    .input(resolved(p.world, name, "world")?)
                    .input(resolved(p.normal_in, name, "normal_in")?)
                    .output(normal_world),
            )?;
        }

        vs.add_invocation(
            FunctionInvocation::new(library::FFP_ASSIGN, group, counter.next())
                .input(resolved(p.ambient, name, "ambient")?)
                .output(lit),
        )?;

        for light in &p.lights {
            vs.add_invocation(
                FunctionInvocation::new(library::FFP_LIGHT_DIRECTIONAL_DIFFUSE, group, counter.next())
                    .input(normal_world)
                    .input_masked(resolved(light.direction, name, "light_direction")?, xyz)
                    .input_masked(resolved(light.diffuse, name, "light_diffuse")?, xyz)
                    .inout_masked(lit, xyz),
            )?;
        }

        let diffuse = resolved(p.diffuse_out, name, "diffuse_out")?;
        vs.add_invocation(
            FunctionInvocation::new(library::FFP_MODULATE, group, counter.next())
                .input(lit)
                .input(diffuse)
                .output(diffuse),
        )
    }

    impl_feature_config!();
}
