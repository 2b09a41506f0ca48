#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Mosaic: a runtime shader composer.
//!
//! Vertex/fragment programs are assembled from a [`RenderState`] of
//! independently configured features and emitted as GLSL, GLSL ES or HLSL
//! source. A fingerprint-keyed cache shares programs between passes, and
//! [`StateCacheManager`] filters redundant graphics-state calls.
//!
//! ```rust,ignore
//! use mosaic::{GeneratorSettings, PassContext, ShaderGenerator};
//!
//! let generator = ShaderGenerator::new(GeneratorSettings::default());
//! let rs = generator.render_state_for_pass(&["FFP_Transform", "FFP_Colour"], &PassContext::default())?;
//! let programs = generator.generate(&rs)?;
//! println!("{}", programs.vertex.source);
//! ```

pub use mosaic_core as core;
pub use mosaic_features as features;
pub use mosaic_generator as generator;
pub use mosaic_program as program;
pub use mosaic_state_cache as state_cache;

pub use mosaic_core::{Capabilities, CapabilityFlags, Result, ShaderError, ShaderStage, TargetLanguage};
pub use mosaic_features::{FactoryRegistry, PassContext, RenderState, SubRenderState, global_registry};
pub use mosaic_generator::{CachedProgramSet, Fingerprint, GeneratorSettings, ProgramCache, ShaderGenerator};
pub use mosaic_state_cache::{Device, StateCacheManager};
