//! Fixed-function fog.
//!
//! Per-vertex mode computes the fog factor in the vertex stage and lerps in
//! the fragment stage; per-pixel mode forwards the clip-space depth and does
//! the whole computation per fragment. Either way the fragment blend runs in
//! the [`order::FOG`] group, after every lighting and texturing statement.

use std::hash::{Hash, Hasher};

use mosaic_core::hash::{eq_f32_slice, hash_f32, hash_f32_slice};
use mosaic_core::{Capabilities, Result, ShaderError, ShaderStage};
use mosaic_program::library;
use mosaic_program::{AutoConstant, Content, DataType, FunctionInvocation, OrderCounter, ParameterId, ProgramSet, Semantic};
use serde::{Deserialize, Serialize};

use crate::sub_render_state::{PassContext, SubRenderState, order, resolved};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FogMode {
    #[default]
    None,
    Exp,
    Exp2,
    Linear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FogCalcMode {
    #[default]
    PerVertex,
    PerPixel,
}

/// Fog parameters as a scene or pass carries them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogSettings {
    pub mode: FogMode,
    pub colour: [f32; 4],
    pub start: f32,
    pub end: f32,
    pub density: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            mode: FogMode::None,
            colour: [1.0, 1.0, 1.0, 1.0],
            start: 0.0,
            end: 1.0,
            density: 0.001,
        }
    }
}

/// Equality and hashing both look at float bit patterns, so a configuration
/// always equals itself (NaN included).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FogConfig {
    pub mode: FogMode,
    pub colour: [f32; 4],
    pub start: f32,
    pub end: f32,
    pub density: f32,
    pub calc_mode: FogCalcMode,
}

impl Default for FogConfig {
    fn default() -> Self {
        let mut config = Self {
            mode: FogMode::None,
            colour: [0.0; 4],
            start: 0.0,
            end: 0.0,
            density: 0.0,
            calc_mode: FogCalcMode::PerVertex,
        };
        config.apply_settings(&FogSettings::default());
        config
    }
}

impl FogConfig {
    #[must_use]
    pub fn settings(&self) -> FogSettings {
        FogSettings {
            mode: self.mode,
            colour: self.colour,
            start: self.start,
            end: self.end,
            density: self.density,
        }
    }

    pub fn apply_settings(&mut self, settings: &FogSettings) {
        self.mode = settings.mode;
        self.colour = settings.colour;
        self.start = settings.start;
        self.end = settings.end;
        self.density = settings.density;
    }

    /// `(density, start, end, 1 / (end - start))`. The last component is 0
    /// when the range is empty.
    #[must_use]
    pub fn packed_params(&self) -> [f32; 4] {
        let range = self.end - self.start;
        let inv_range = if range > 0.0 { 1.0 / range } else { 0.0 };
        [self.density, self.start, self.end, inv_range]
    }
}

impl Hash for FogConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mode.hash(state);
        self.calc_mode.hash(state);
        hash_f32_slice(&self.colour, state);
        hash_f32(self.start, state);
        hash_f32(self.end, state);
        hash_f32(self.density, state);
    }
}

impl PartialEq for FogConfig {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode
            && self.calc_mode == other.calc_mode
            && eq_f32_slice(&self.colour, &other.colour)
            && eq_f32_slice(
                &[self.start, self.end, self.density],
                &[other.start, other.end, other.density],
            )
    }
}

impl Eq for FogConfig {}

#[derive(Debug, Default, Clone, Copy)]
struct FogParameters {
    world_view_proj: Option<ParameterId>,
    fog_colour: Option<ParameterId>,
    fog_params: Option<ParameterId>,
    position_in: Option<ParameterId>,
    /// Fog factor (per-vertex) or depth (per-pixel) interpolant.
    vs_out: Option<ParameterId>,
    ps_in: Option<ParameterId>,
    colour_out: Option<ParameterId>,
}

#[derive(Debug, Default, Clone)]
pub struct FogFeature {
    config: FogConfig,
    params: FogParameters,
}

impl FogFeature {
    pub const TYPE_NAME: &'static str = "FFP_Fog";

    #[must_use]
    pub fn new(config: FogConfig) -> Self {
        Self {
            config,
            params: FogParameters::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &FogConfig {
        &self.config
    }

    pub fn set_fog_properties(&mut self, settings: &FogSettings) {
        self.config.apply_settings(settings);
    }

    pub fn set_calc_mode(&mut self, calc_mode: FogCalcMode) {
        self.config.calc_mode = calc_mode;
    }

    fn vertex_function(&self) -> &'static str {
        match (self.config.calc_mode, self.config.mode) {
            (FogCalcMode::PerPixel, _) => library::FFP_PIXEL_FOG_DEPTH,
            (FogCalcMode::PerVertex, FogMode::Exp) => library::FFP_VERTEX_FOG_EXP,
            (FogCalcMode::PerVertex, FogMode::Exp2) => library::FFP_VERTEX_FOG_EXP2,
            (FogCalcMode::PerVertex, _) => library::FFP_VERTEX_FOG_LINEAR,
        }
    }

    fn pixel_function(&self) -> &'static str {
        match (self.config.calc_mode, self.config.mode) {
            (FogCalcMode::PerVertex, _) => library::FFP_LERP,
            (FogCalcMode::PerPixel, FogMode::Exp) => library::FFP_PIXEL_FOG_EXP,
            (FogCalcMode::PerPixel, FogMode::Exp2) => library::FFP_PIXEL_FOG_EXP2,
            (FogCalcMode::PerPixel, _) => library::FFP_PIXEL_FOG_LINEAR,
        }
    }
}

impl SubRenderState for FogFeature {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        order::FOG
    }

    fn pre_add_to_render_state(&mut self, pass: &PassContext, _caps: &Capabilities) -> bool {
        if let Some(scene_fog) = &pass.fog {
            self.config.apply_settings(scene_fog);
        }
        self.config.mode != FogMode::None
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let c = &self.config;
        if c.mode == FogMode::None {
            return Err(ShaderError::configuration(Self::TYPE_NAME, "fog mode is None"));
        }
        if c.mode == FogMode::Linear && c.end <= c.start {
            return Err(ShaderError::configuration(
                Self::TYPE_NAME,
                format!("linear fog needs end > start (start {}, end {})", c.start, c.end),
            ));
        }

        let per_vertex = c.calc_mode == FogCalcMode::PerVertex;
        let packed = c.packed_params();
        let colour = c.colour;
        let p = &mut self.params;

        let vs = programs.vertex_mut();
        p.world_view_proj = Some(vs.resolve_auto_constant(AutoConstant::WorldViewProjMatrix, None)?);
        p.position_in = Some(vs.resolve_input(Semantic::Position, 0, Content::PositionObjectSpace, DataType::Float4)?);

        let params_program = if per_vertex { programs.vertex_mut() } else { programs.fragment_mut() };
        p.fog_params = Some(params_program.resolve_uniform("gFogParams", DataType::Float4, Some(packed))?);
        p.fog_colour = Some(programs.fragment_mut().resolve_uniform("gFogColor", DataType::Float4, Some(colour))?);

        let content = if per_vertex { Content::FogFactor } else { Content::DepthViewSpace };
        let varying = programs.resolve_varying(content, DataType::Float)?;
        p.vs_out = Some(varying.vertex_output);
        p.ps_in = Some(varying.fragment_input);
        p.colour_out = Some(programs.resolve_fragment_colour()?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let program = programs.program_mut(stage);
            program.add_dependency(library::LIB_COMMON);
            program.add_dependency(library::LIB_FOG);
        }
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let name = Self::TYPE_NAME;
        let p = self.params;
        let group = order::FOG;
        let wvp = resolved(p.world_view_proj, name, "world_view_proj")?;
        let position = resolved(p.position_in, name, "position_in")?;
        let fog_params = resolved(p.fog_params, name, "fog_params")?;
        let fog_colour = resolved(p.fog_colour, name, "fog_colour")?;
        let vs_out = resolved(p.vs_out, name, "vs_out")?;
        let ps_in = resolved(p.ps_in, name, "ps_in")?;
        let colour = resolved(p.colour_out, name, "colour_out")?;

        let mut vs_counter = OrderCounter::new();
        let mut fs_counter = OrderCounter::new();

        match self.config.calc_mode {
            FogCalcMode::PerVertex => {
                programs.vertex_mut().add_invocation(
                    FunctionInvocation::new(self.vertex_function(), group, vs_counter.next())
                        .input(wvp)
                        .input(position)
                        .input(fog_params)
                        .output(vs_out),
                )?;
                programs.fragment_mut().add_invocation(
                    FunctionInvocation::new(self.pixel_function(), group, fs_counter.next())
                        .input(fog_colour)
                        .input(colour)
                        .input(ps_in)
                        .output(colour),
                )
            }
            FogCalcMode::PerPixel => {
                programs.vertex_mut().add_invocation(
                    FunctionInvocation::new(self.vertex_function(), group, vs_counter.next())
                        .input(wvp)
                        .input(position)
                        .output(vs_out),
                )?;
                programs.fragment_mut().add_invocation(
                    FunctionInvocation::new(self.pixel_function(), group, fs_counter.next())
                        .input(ps_in)
                        .input(fog_params)
                        .input(fog_colour)
                        .input(colour)
                        .output(colour),
                )
            }
        }
    }

    impl_feature_config!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_params() {
        let config = FogConfig {
            mode: FogMode::Linear,
            start: 10.0,
            end: 20.0,
            density: 0.5,
            ..FogConfig::default()
        };
        assert_eq!(config.packed_params(), [0.5, 10.0, 20.0, 0.1]);
    }

    #[test]
    fn test_scene_fog_overrides_config() {
        let mut fog = FogFeature::default();
        let pass = PassContext {
            fog: Some(FogSettings {
                mode: FogMode::Exp2,
                density: 0.02,
                ..FogSettings::default()
            }),
            ..PassContext::default()
        };
        assert!(fog.pre_add_to_render_state(&pass, &Capabilities::default()));
        assert_eq!(fog.config().mode, FogMode::Exp2);
        assert_eq!(fog.config().density, 0.02);
    }

    #[test]
    fn test_hash_tracks_configuration() {
        let a = FogFeature::new(FogConfig {
            mode: FogMode::Linear,
            end: 100.0,
            ..FogConfig::default()
        });
        let mut b = a.clone();
        assert_eq!(a.hash_code(), b.hash_code());
        b.set_calc_mode(FogCalcMode::PerPixel);
        assert_ne!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn test_linear_fog_with_empty_range_is_rejected() {
        let mut fog = FogFeature::new(FogConfig {
            mode: FogMode::Linear,
            start: 50.0,
            end: 50.0,
            ..FogConfig::default()
        });
        let mut set = ProgramSet::new(mosaic_core::TargetLanguage::Glsl, Capabilities::default());
        assert!(matches!(
            fog.resolve_parameters(&mut set),
            Err(ShaderError::Configuration { .. })
        ));
    }

    #[test]
    fn test_nan_config_equals_itself() {
        let a = FogFeature::new(FogConfig {
            mode: FogMode::Exp,
            density: f32::NAN,
            ..FogConfig::default()
        });
        let b = a.clone();
        assert!(a.config_eq(&b));
        assert_eq!(a.hash_code(), b.hash_code());

        let mut c = a.clone();
        c.set_fog_properties(&FogSettings {
            mode: FogMode::Exp,
            density: 0.5,
            ..FogSettings::default()
        });
        assert!(!a.config_eq(&c));
    }
}
