//! The vertex/fragment pair built for one render state.

use mosaic_core::{Capabilities, Result, ShaderError, ShaderStage, TargetLanguage};

use crate::parameter::{Content, DataType, ParameterId, Semantic};
use crate::program::Program;

/// A vertex output wired to the matching fragment input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Varying {
    pub content: Content,
    pub data_type: DataType,
    /// Interpolant slot (`TEXCOORD<slot>`).
    pub slot: u8,
    pub vertex_output: ParameterId,
    pub fragment_input: ParameterId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSet {
    language: TargetLanguage,
    capabilities: Capabilities,
    vertex: Program,
    fragment: Program,
    varyings: Vec<Varying>,
}

impl ProgramSet {
    #[must_use]
    pub fn new(language: TargetLanguage, capabilities: Capabilities) -> Self {
        Self {
            language,
            capabilities,
            vertex: Program::new(ShaderStage::Vertex, capabilities),
            fragment: Program::new(ShaderStage::Fragment, capabilities),
            varyings: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn language(&self) -> TargetLanguage {
        self.language
    }

    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[inline]
    #[must_use]
    pub fn vertex(&self) -> &Program {
        &self.vertex
    }

    #[inline]
    pub fn vertex_mut(&mut self) -> &mut Program {
        &mut self.vertex
    }

    #[inline]
    #[must_use]
    pub fn fragment(&self) -> &Program {
        &self.fragment
    }

    #[inline]
    pub fn fragment_mut(&mut self) -> &mut Program {
        &mut self.fragment
    }

    #[must_use]
    pub fn program(&self, stage: ShaderStage) -> &Program {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    pub fn program_mut(&mut self, stage: ShaderStage) -> &mut Program {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }

    #[inline]
    #[must_use]
    pub fn varyings(&self) -> &[Varying] {
        &self.varyings
    }

    /// Returns the interpolant carrying `content`, allocating the next free
    /// slot on first use.
    pub fn resolve_varying(&mut self, content: Content, data_type: DataType) -> Result<Varying> {
        if let Some(existing) = self.varyings.iter().find(|v| v.content == content) {
            if existing.data_type != data_type {
                return Err(ShaderError::resolution(
                    ShaderStage::Vertex,
                    format!(
                        "varying {content:?} already declared as {:?}, requested {data_type:?}",
                        existing.data_type
                    ),
                ));
            }
            return Ok(*existing);
        }

        let max = self.capabilities.max_interpolants;
        let slot = self.varyings.len();
        if slot >= usize::from(max) {
            return Err(ShaderError::resolution(
                ShaderStage::Vertex,
                format!("no free interpolant for {content:?}: all {max} slots in use"),
            ));
        }
        let slot = slot as u8;

        let vertex_output = self
            .vertex
            .resolve_output(Semantic::TextureCoordinates, slot, content, data_type)?;
        let fragment_input = self
            .fragment
            .resolve_input(Semantic::TextureCoordinates, slot, content, data_type)?;

        let varying = Varying {
            content,
            data_type,
            slot,
            vertex_output,
            fragment_input,
        };
        self.varyings.push(varying);
        Ok(varying)
    }

    /// Clip-space position output of the vertex program.
    pub fn resolve_clip_position(&mut self) -> Result<ParameterId> {
        self.vertex.resolve_output(
            Semantic::Position,
            0,
            Content::PositionProjectiveSpace,
            DataType::Float4,
        )
    }

    /// Primary colour output of the fragment program.
    pub fn resolve_fragment_colour(&mut self) -> Result<ParameterId> {
        self.fragment
            .resolve_output(Semantic::Color, 0, Content::ColorDiffuse, DataType::Float4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varyings_share_slot_per_content() {
        let mut set = ProgramSet::new(TargetLanguage::Glsl, Capabilities::default());
        let a = set.resolve_varying(Content::FogFactor, DataType::Float).unwrap();
        let b = set.resolve_varying(Content::TextureCoordinate(0), DataType::Float2).unwrap();
        let again = set.resolve_varying(Content::FogFactor, DataType::Float).unwrap();
        assert_eq!(a, again);
        assert_eq!((a.slot, b.slot), (0, 1));
        assert_eq!(set.vertex().outputs().count(), 2);
        assert_eq!(set.fragment().inputs().count(), 2);
    }

    #[test]
    fn test_interpolants_run_out() {
        let caps = Capabilities {
            max_interpolants: 1,
            ..Capabilities::default()
        };
        let mut set = ProgramSet::new(TargetLanguage::Glsl, caps);
        set.resolve_varying(Content::FogFactor, DataType::Float).unwrap();
        let err = set
            .resolve_varying(Content::ColorDiffuse, DataType::Float4)
            .unwrap_err();
        assert!(err.is_resolution_failure());
    }
}
