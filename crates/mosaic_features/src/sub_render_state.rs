//! The sub-render-state abstraction.

use std::any::Any;
use std::fmt;

use mosaic_core::{Capabilities, Result, ShaderError};
use mosaic_program::{ParameterId, ProgramSet};

use crate::fog::FogSettings;

/// Execution orders of the built-in features.
///
/// The order doubles as the invocation group, so it decides where a
/// feature's statements land inside each stage.
pub mod order {
    pub const TRANSFORM: i32 = 100;
    pub const COLOUR: i32 = 200;
    pub const LIGHTING: i32 = 300;
    pub const TEXTURING: i32 = 400;
    pub const FOG: i32 = 500;
}

/// Skeletal metadata of the mesh a pass renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkinningData {
    pub bone_count: u16,
    pub weight_count: u8,
    /// `false` when the mesh has no usable skeleton binding.
    pub is_valid: bool,
}

/// Upstream information available when a feature is added for a pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassContext {
    pub skinning: Option<SkinningData>,
    /// Scene fog, overriding a fog feature's own settings.
    pub fog: Option<FogSettings>,
}

/// One independently configurable shading behaviour.
///
/// A feature goes through three phases per assembly, each run for every
/// feature of the render state before the next phase starts:
///
/// 1. [`resolve_parameters`](Self::resolve_parameters): obtain the inputs,
///    outputs, locals and uniforms it needs.
/// 2. [`resolve_dependencies`](Self::resolve_dependencies): request library
///    includes.
/// 3. [`add_function_invocations`](Self::add_function_invocations): emit
///    calls tagged with [`execution_order`](Self::execution_order) as group.
///
/// Resolved ids are stored on the instance, which is why assembly always
/// works on a clone of the composition.
pub trait SubRenderState: Any + Send + Sync + fmt::Debug {
    fn type_name(&self) -> &'static str;

    fn execution_order(&self) -> i32;

    /// Stable hash of the configuration. Equal configurations hash equally
    /// across runs.
    fn hash_code(&self) -> u64;

    /// Decides whether the feature takes part in a pass and lets it pick up
    /// pass metadata. Returning `false` leaves it out of the render state.
    fn pre_add_to_render_state(&mut self, _pass: &PassContext, _caps: &Capabilities) -> bool {
        true
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()>;

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()>;

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()>;

    /// Copies configuration (never resolved parameters) from an instance of
    /// the same type.
    fn copy_from(&mut self, other: &dyn SubRenderState);

    /// Configuration equality. Different concrete types are never equal.
    fn config_eq(&self, other: &dyn SubRenderState) -> bool;

    /// Clones the configuration into a fresh, unresolved instance.
    fn clone_box(&self) -> Box<dyn SubRenderState>;

    fn as_any(&self) -> &dyn Any;

    fn allows_multiple(&self) -> bool {
        false
    }
}

/// Fetches an id stored by `resolve_parameters`.
pub(crate) fn resolved(id: Option<ParameterId>, feature: &str, what: &str) -> Result<ParameterId> {
    id.ok_or_else(|| {
        ShaderError::configuration(feature, format!("'{what}' used before resolve_parameters"))
    })
}
