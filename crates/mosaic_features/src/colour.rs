//! Base diffuse colour.

use mosaic_core::Result;
use mosaic_program::library;
use mosaic_program::{Content, DataType, FunctionInvocation, OrderCounter, ParameterId, ProgramSet, Semantic};
use serde::{Deserialize, Serialize};

use crate::sub_render_state::{SubRenderState, order, resolved};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColourConfig {
    /// Take the diffuse colour from the vertex colour attribute instead of
    /// opaque white.
    pub vertex_colour: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct ColourParameters {
    source: Option<ParameterId>,
    diffuse_out: Option<ParameterId>,
    diffuse_in: Option<ParameterId>,
    colour_out: Option<ParameterId>,
}

/// Carries the diffuse colour through the vertex stage and seeds the
/// fragment colour output with it. Lighting, texturing and fog modify the
/// value this feature produces.
#[derive(Debug, Default, Clone)]
pub struct ColourFeature {
    config: ColourConfig,
    params: ColourParameters,
}

impl ColourFeature {
    pub const TYPE_NAME: &'static str = "FFP_Colour";

    #[must_use]
    pub fn new(config: ColourConfig) -> Self {
        Self {
            config,
            params: ColourParameters::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ColourConfig {
        &self.config
    }
}

impl SubRenderState for ColourFeature {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        order::COLOUR
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        self.params.source = Some(if self.config.vertex_colour {
            vs.resolve_input(Semantic::Color, 0, Content::ColorDiffuse, DataType::Float4)?
        } else {
            vs.resolve_constant(DataType::Float4, [1.0; 4])?
        });

        let diffuse = programs.resolve_varying(Content::ColorDiffuse, DataType::Float4)?;
        self.params.diffuse_out = Some(diffuse.vertex_output);
        self.params.diffuse_in = Some(diffuse.fragment_input);
        self.params.colour_out = Some(programs.resolve_fragment_colour()?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        programs.vertex_mut().add_dependency(library::LIB_COMMON);
        programs.fragment_mut().add_dependency(library::LIB_COMMON);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let name = Self::TYPE_NAME;
        let mut vs_counter = OrderCounter::new();
        programs.vertex_mut().add_invocation(
            FunctionInvocation::new(library::FFP_ASSIGN, order::COLOUR, vs_counter.next())
                .input(resolved(self.params.source, name, "source")?)
                .output(resolved(self.params.diffuse_out, name, "diffuse_out")?),
        )?;

        let mut fs_counter = OrderCounter::new();
        programs.fragment_mut().add_invocation(
            FunctionInvocation::new(library::FFP_ASSIGN, order::COLOUR, fs_counter.next())
                .input(resolved(self.params.diffuse_in, name, "diffuse_in")?)
                .output(resolved(self.params.colour_out, name, "colour_out")?),
        )
    }

    impl_feature_config!();
}
