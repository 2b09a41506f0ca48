//! Mosaic Render Features
//!
//! Sub-render-states are independently configurable shading behaviours
//! (transform, colour, lighting, texturing, fog, hardware skinning). Each one
//! contributes parameters, library includes and function invocations to the
//! vertex/fragment [`ProgramSet`](mosaic_program::ProgramSet) being built.
//!
//! New features plug in through [`SubRenderStateFactory`] and the process-wide
//! [`FactoryRegistry`]; a [`RenderState`] is the ordered composition the
//! program cache keys on.

#[macro_use]
mod macros;

pub mod colour;
pub mod factory;
pub mod fog;
pub mod lighting;
pub mod render_state;
pub mod skinning;
pub mod sub_render_state;
pub mod texturing;
pub mod transform;

pub use colour::{ColourConfig, ColourFeature};
pub use factory::{DefaultFactory, FactoryRegistry, SubRenderStateFactory, global_registry, register_builtin_factories};
pub use fog::{FogCalcMode, FogConfig, FogFeature, FogMode, FogSettings};
pub use lighting::{LightingConfig, LightingFeature};
pub use render_state::RenderState;
pub use skinning::{HardwareSkinning, SkinningConfig, SkinningTechnique};
pub use sub_render_state::{PassContext, SkinningData, SubRenderState, order};
pub use texturing::{TextureBlend, TextureUnit, TexturingConfig, TexturingFeature};
pub use transform::{TransformConfig, TransformFeature};
