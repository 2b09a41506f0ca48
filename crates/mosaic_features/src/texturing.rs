//! Fixed-function texturing: N sampled units blended into the fragment colour.

use mosaic_core::{Capabilities, Result};
use mosaic_program::library;
use mosaic_program::{Content, DataType, FunctionInvocation, OrderCounter, ParameterId, ProgramSet, Semantic};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::sub_render_state::{PassContext, SubRenderState, order, resolved};

/// How a unit's texel combines with the colour so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureBlend {
    #[default]
    Modulate,
    Add,
    Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureUnit {
    /// Vertex texture coordinate set the unit samples with.
    pub texcoord_index: u8,
    pub blend: TextureBlend,
}

/// One entry per texture unit; unit `i` samples from sampler slot `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TexturingConfig {
    pub units: Vec<TextureUnit>,
}

impl Default for TexturingConfig {
    fn default() -> Self {
        Self {
            units: vec![TextureUnit::default()],
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct UnitParameters {
    sampler: Option<ParameterId>,
    texcoord_in: Option<ParameterId>,
    texcoord_out: Option<ParameterId>,
    texcoord_ps: Option<ParameterId>,
    texel: Option<ParameterId>,
    /// Another unit already forwards the same coordinate set.
    shared_texcoord: bool,
}

#[derive(Debug, Default, Clone)]
struct TexturingParameters {
    colour_out: Option<ParameterId>,
    units: SmallVec<[UnitParameters; 4]>,
}

#[derive(Debug, Default, Clone)]
pub struct TexturingFeature {
    config: TexturingConfig,
    params: TexturingParameters,
}

impl TexturingFeature {
    pub const TYPE_NAME: &'static str = "FFP_Texturing";

    #[must_use]
    pub fn new(config: TexturingConfig) -> Self {
        Self {
            config,
            params: TexturingParameters::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TexturingConfig {
        &self.config
    }
}

impl SubRenderState for TexturingFeature {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        order::TEXTURING
    }

    fn pre_add_to_render_state(&mut self, _pass: &PassContext, _caps: &Capabilities) -> bool {
        !self.config.units.is_empty()
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        self.params.units.clear();
        for (i, unit) in self.config.units.iter().enumerate() {
            let t = unit.texcoord_index;
            let shared_texcoord = self.config.units[..i].iter().any(|u| u.texcoord_index == t);

            let sampler = programs.fragment_mut().resolve_sampler(u8::try_from(i).unwrap_or(u8::MAX))?;
            let texcoord_in = programs.vertex_mut().resolve_input(
                Semantic::TextureCoordinates,
                t,
                Content::TextureCoordinate(t),
                DataType::Float2,
            )?;
            let varying = programs.resolve_varying(Content::TextureCoordinate(t), DataType::Float2)?;
            let texel = programs
                .fragment_mut()
                .resolve_local_named(&format!("lTexel{i}"), DataType::Float4)?;

            self.params.units.push(UnitParameters {
                sampler: Some(sampler),
                texcoord_in: Some(texcoord_in),
                texcoord_out: Some(varying.vertex_output),
                texcoord_ps: Some(varying.fragment_input),
                texel: Some(texel),
                shared_texcoord,
            });
        }
        self.params.colour_out = Some(programs.resolve_fragment_colour()?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        programs.vertex_mut().add_dependency(library::LIB_COMMON);
        let fs = programs.fragment_mut();
        fs.add_dependency(library::LIB_COMMON);
        fs.add_dependency(library::LIB_TEXTURING);
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let name = Self::TYPE_NAME;
        let group = order::TEXTURING;
        let colour = resolved(self.params.colour_out, name, "colour_out")?;
        let mut vs_counter = OrderCounter::new();
        let mut fs_counter = OrderCounter::new();

        for (unit, p) in self.config.units.iter().zip(&self.params.units) {
            if !p.shared_texcoord {
                programs.vertex_mut().add_invocation(
                    FunctionInvocation::new(library::FFP_ASSIGN, group, vs_counter.next())
                        .input(resolved(p.texcoord_in, name, "texcoord_in")?)
                        .output(resolved(p.texcoord_out, name, "texcoord_out")?),
                )?;
            }

            let texel = resolved(p.texel, name, "texel")?;
            let fs = programs.fragment_mut();
            fs.add_invocation(
                FunctionInvocation::new(library::FFP_SAMPLE_TEXTURE, group, fs_counter.next())
                    .input(resolved(p.sampler, name, "sampler")?)
                    .input(resolved(p.texcoord_ps, name, "texcoord_ps")?)
                    .output(texel),
            )?;

            let blend = match unit.blend {
                TextureBlend::Modulate => FunctionInvocation::new(library::FFP_MODULATE, group, fs_counter.next())
                    .input(texel)
                    .input(colour)
                    .output(colour),
                TextureBlend::Add => FunctionInvocation::new(library::FFP_ADD, group, fs_counter.next())
                    .input(texel)
                    .input(colour)
                    .output(colour),
                TextureBlend::Replace => FunctionInvocation::new(library::FFP_ASSIGN, group, fs_counter.next())
                    .input(texel)
                    .output(colour),
            };
            fs.add_invocation(blend)?;
        }
        Ok(())
    }

    impl_feature_config!();
}
