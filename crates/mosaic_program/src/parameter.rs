//! Shader parameters.
//!
//! A [`Parameter`] is identified by `(semantic, index, content, data type)`
//! and lives in the arena of the [`Program`](crate::Program) that resolved it.
//! Everything else (operands, varyings, features) refers to it through a
//! [`ParameterId`], which also records the owning stage so a fragment
//! invocation can never silently bind a vertex parameter.

use mosaic_core::ShaderStage;

/// Binding semantic of a parameter (vertex attribute / interpolant role).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Unknown,
    Position,
    BlendWeights,
    BlendIndices,
    Normal,
    Color,
    TextureCoordinates,
    Binormal,
    Tangent,
}

impl Semantic {
    /// Short name used when generating parameter names (`iPos_0`, `oTexcoord_2`).
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Unknown => "Param",
            Self::Position => "Pos",
            Self::BlendWeights => "BlendWeights",
            Self::BlendIndices => "BlendIndices",
            Self::Normal => "Normal",
            Self::Color => "Color",
            Self::TextureCoordinates => "Texcoord",
            Self::Binormal => "BiNormal",
            Self::Tangent => "Tangent",
        }
    }
}

/// What a parameter's value means, independent of how it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Content {
    Unknown,
    PositionObjectSpace,
    PositionWorldSpace,
    PositionProjectiveSpace,
    NormalObjectSpace,
    NormalWorldSpace,
    TangentObjectSpace,
    TangentWorldSpace,
    BinormalObjectSpace,
    BinormalWorldSpace,
    ColorDiffuse,
    ColorSpecular,
    DepthViewSpace,
    FogFactor,
    BlendIndices,
    BlendWeights,
    TextureCoordinate(u8),
}

impl Content {
    /// Name of a local holding this content (`lPositionWorld`, `lTexcoord1`).
    #[must_use]
    pub fn local_name(self) -> String {
        match self {
            Self::Unknown => "lLocalParam".to_owned(),
            Self::PositionObjectSpace => "lPositionObject".to_owned(),
            Self::PositionWorldSpace => "lPositionWorld".to_owned(),
            Self::PositionProjectiveSpace => "lPositionProj".to_owned(),
            Self::NormalObjectSpace => "lNormalObject".to_owned(),
            Self::NormalWorldSpace => "lNormalWorld".to_owned(),
            Self::TangentObjectSpace => "lTangentObject".to_owned(),
            Self::TangentWorldSpace => "lTangentWorld".to_owned(),
            Self::BinormalObjectSpace => "lBinormalObject".to_owned(),
            Self::BinormalWorldSpace => "lBinormalWorld".to_owned(),
            Self::ColorDiffuse => "lColorDiffuse".to_owned(),
            Self::ColorSpecular => "lColorSpecular".to_owned(),
            Self::DepthViewSpace => "lDepth".to_owned(),
            Self::FogFactor => "lFogFactor".to_owned(),
            Self::BlendIndices => "lBlendIndices".to_owned(),
            Self::BlendWeights => "lBlendWeights".to_owned(),
            Self::TextureCoordinate(i) => format!("lTexcoord{i}"),
        }
    }
}

/// Data type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float,
    Float2,
    Float3,
    Float4,
    /// Two rows of four: one dual quaternion.
    Mat2x4,
    Mat3x3,
    /// Three rows of four: an affine transform.
    Mat3x4,
    Mat4x4,
    Sampler2D,
}

impl DataType {
    /// Number of scalar components (0 for samplers).
    #[must_use]
    pub fn component_count(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
            Self::Mat2x4 => 8,
            Self::Mat3x3 => 9,
            Self::Mat3x4 => 12,
            Self::Mat4x4 => 16,
            Self::Sampler2D => 0,
        }
    }

    #[must_use]
    pub fn is_matrix(self) -> bool {
        matches!(self, Self::Mat2x4 | Self::Mat3x3 | Self::Mat3x4 | Self::Mat4x4)
    }

    /// Types that need [`CapabilityFlags::NON_SQUARE_MATRICES`](mosaic_core::CapabilityFlags::NON_SQUARE_MATRICES).
    #[must_use]
    pub fn is_non_square(self) -> bool {
        matches!(self, Self::Mat2x4 | Self::Mat3x4)
    }
}

/// Values the external parameter-update collaborator supplies every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoConstant {
    WorldMatrix,
    InverseWorldMatrix,
    ViewProjMatrix,
    WorldViewProjMatrix,
    /// Bone palette as affine 3x4 matrices.
    WorldMatrixArray3x4,
    /// Bone palette as dual quaternions.
    WorldDualQuaternionArray2x4,
    /// Per-bone scale/shear part for dual quaternion skinning.
    WorldScaleShearMatrixArray3x4,
    AmbientLightColour,
    LightDirectionWorld(u8),
    LightDiffuseColour(u8),
}

impl AutoConstant {
    /// Uniform name used in emitted source.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::WorldMatrix => "world_matrix".to_owned(),
            Self::InverseWorldMatrix => "inverse_world_matrix".to_owned(),
            Self::ViewProjMatrix => "viewproj_matrix".to_owned(),
            Self::WorldViewProjMatrix => "worldviewproj_matrix".to_owned(),
            Self::WorldMatrixArray3x4 => "world_matrix_array_3x4".to_owned(),
            Self::WorldDualQuaternionArray2x4 => "world_dualquaternion_array_2x4".to_owned(),
            Self::WorldScaleShearMatrixArray3x4 => "world_scale_shear_matrix_array_3x4".to_owned(),
            Self::AmbientLightColour => "ambient_light_colour".to_owned(),
            Self::LightDirectionWorld(i) => format!("light_direction_world_{i}"),
            Self::LightDiffuseColour(i) => format!("light_diffuse_colour_{i}"),
        }
    }

    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Self::WorldMatrix
            | Self::InverseWorldMatrix
            | Self::ViewProjMatrix
            | Self::WorldViewProjMatrix => DataType::Mat4x4,
            Self::WorldMatrixArray3x4 | Self::WorldScaleShearMatrixArray3x4 => DataType::Mat3x4,
            Self::WorldDualQuaternionArray2x4 => DataType::Mat2x4,
            Self::AmbientLightColour | Self::LightDirectionWorld(_) | Self::LightDiffuseColour(_) => {
                DataType::Float4
            }
        }
    }

    /// Bone palettes are arrays; everything else is a single value.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Self::WorldMatrixArray3x4
                | Self::WorldDualQuaternionArray2x4
                | Self::WorldScaleShearMatrixArray3x4
        )
    }
}

/// How a parameter is bound in the emitted program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    Input,
    Output,
    Local,
    /// Feature-owned uniform (fog colour, sampler, ...).
    Uniform,
    AutoConstant(AutoConstant),
    /// Literal emitted inline.
    Constant,
}

impl ParameterKind {
    /// Uniforms, auto-constants and literals cannot be written by invocations.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Uniform | Self::AutoConstant(_) | Self::Constant)
    }

    #[must_use]
    pub fn is_uniform(self) -> bool {
        matches!(self, Self::Uniform | Self::AutoConstant(_))
    }
}

/// Stable handle of a parameter inside its program's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId {
    stage: ShaderStage,
    index: u32,
}

impl ParameterId {
    pub(crate) fn new(stage: ShaderStage, index: u32) -> Self {
        Self { stage, index }
    }

    #[inline]
    #[must_use]
    pub fn stage(self) -> ShaderStage {
        self.stage
    }

    /// Raw index into the program's parameter arena.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u32 {
        self.index
    }
}

/// A resolved parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub(crate) id: ParameterId,
    pub(crate) name: String,
    pub(crate) semantic: Semantic,
    pub(crate) index: u8,
    pub(crate) content: Content,
    pub(crate) data_type: DataType,
    pub(crate) kind: ParameterKind,
    pub(crate) array_size: Option<u16>,
    pub(crate) value: Option<[f32; 4]>,
}

impl Parameter {
    #[inline]
    #[must_use]
    pub fn id(&self) -> ParameterId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn semantic(&self) -> Semantic {
        self.semantic
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> u8 {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> Content {
        self.content
    }

    #[inline]
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn array_size(&self) -> Option<u16> {
        self.array_size
    }

    /// Literal value of a constant, or the initial value of a feature uniform.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<[f32; 4]> {
        self.value
    }
}
