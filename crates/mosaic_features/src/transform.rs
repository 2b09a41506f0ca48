//! Object → projective space position transform.

use mosaic_core::Result;
use mosaic_program::library;
use mosaic_program::{AutoConstant, Content, DataType, FunctionInvocation, OrderCounter, ParameterId, ProgramSet, Semantic};
use serde::{Deserialize, Serialize};

use crate::sub_render_state::{SubRenderState, order, resolved};

/// The transform feature has nothing to configure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformConfig;

#[derive(Debug, Default, Clone, Copy)]
struct TransformParameters {
    world_view_proj: Option<ParameterId>,
    position_in: Option<ParameterId>,
    position_out: Option<ParameterId>,
}

/// Writes `worldviewproj * position` to the clip-space output.
///
/// Do not combine with [`HardwareSkinning`](crate::HardwareSkinning), which
/// fills the same role.
#[derive(Debug, Default, Clone)]
pub struct TransformFeature {
    config: TransformConfig,
    params: TransformParameters,
}

impl TransformFeature {
    pub const TYPE_NAME: &'static str = "FFP_Transform";

    #[must_use]
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            params: TransformParameters::default(),
        }
    }
}

impl SubRenderState for TransformFeature {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        order::TRANSFORM
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        self.params.world_view_proj = Some(vs.resolve_auto_constant(AutoConstant::WorldViewProjMatrix, None)?);
        self.params.position_in =
            Some(vs.resolve_input(Semantic::Position, 0, Content::PositionObjectSpace, DataType::Float4)?);
        self.params.position_out = Some(programs.resolve_clip_position()?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        vs.add_dependency(library::LIB_COMMON);
        vs.add_dependency(library::LIB_TRANSFORM);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let name = Self::TYPE_NAME;
        let mut counter = OrderCounter::new();
        programs.vertex_mut().add_invocation(
            FunctionInvocation::new(library::FFP_TRANSFORM, order::TRANSFORM, counter.next())
                .input(resolved(self.params.world_view_proj, name, "world_view_proj")?)
                .input(resolved(self.params.position_in, name, "position_in")?)
                .output(resolved(self.params.position_out, name, "position_out")?),
        )
    }

    impl_feature_config!();
}
