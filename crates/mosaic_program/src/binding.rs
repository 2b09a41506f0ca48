//! Uniform binding metadata for the parameter-update collaborator.

use crate::parameter::{AutoConstant, DataType};

/// Where the value of a uniform comes from each draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformSource {
    /// Supplied by the engine (matrices, bone palettes, lights).
    Auto(AutoConstant),
    /// Feature-owned value, uploaded once with `initial`.
    Custom { initial: Option<[f32; 4]> },
    /// Texture sampler bound to a unit.
    Sampler { unit: u8 },
}

/// One uniform of an emitted program.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub data_type: DataType,
    pub array_size: Option<u16>,
    pub source: UniformSource,
}
