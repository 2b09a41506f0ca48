//! Program assembly.

use mosaic_core::{Capabilities, Result, ShaderError, ShaderStage, TargetLanguage};
use mosaic_features::{HardwareSkinning, RenderState, TransformFeature};
use mosaic_program::{Content, ProgramSet, ProgramWriter, Semantic};

/// A freshly assembled program pair and its emitted source.
#[derive(Debug, Clone)]
pub struct AssembledProgram {
    pub program_set: ProgramSet,
    pub vertex_source: String,
    pub fragment_source: String,
}

/// Builds programs from render states.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgramAssembler;

impl ProgramAssembler {
    /// Runs every feature's three phases (each phase across all features, in
    /// render state order), validates the stage interface and writes source.
    ///
    /// Works on a clone of `render_state`; the caller's instance never sees
    /// resolved parameters. The first failing feature aborts the whole
    /// assembly.
    pub fn assemble(
        render_state: &RenderState,
        language: TargetLanguage,
        capabilities: &Capabilities,
    ) -> Result<AssembledProgram> {
        check_composition(render_state)?;

        let mut working = render_state.clone();
        let mut programs = ProgramSet::new(language, *capabilities);

        for state in working.iter_mut() {
            state.resolve_parameters(&mut programs)?;
        }
        for state in working.iter_mut() {
            state.resolve_dependencies(&mut programs)?;
        }
        for state in working.iter_mut() {
            state.add_function_invocations(&mut programs)?;
        }

        validate_interface(&programs)?;

        let writer = ProgramWriter::new(language);
        let vertex_source = writer.write(programs.vertex())?;
        let fragment_source = writer.write(programs.fragment())?;

        log::debug!(
            "Assembled {} program pair from [{}]: {} + {} invocations",
            language,
            working.iter().map(|s| s.type_name()).collect::<Vec<_>>().join(", "),
            programs.vertex().entry_point().len(),
            programs.fragment().entry_point().len(),
        );

        Ok(AssembledProgram {
            program_set: programs,
            vertex_source,
            fragment_source,
        })
    }
}

fn check_composition(render_state: &RenderState) -> Result<()> {
    if render_state.is_empty() {
        return Err(ShaderError::configuration("render_state", "no sub-render-states"));
    }
    if render_state.contains(TransformFeature::TYPE_NAME) && render_state.contains(HardwareSkinning::TYPE_NAME) {
        return Err(ShaderError::configuration(
            "render_state",
            format!(
                "'{}' and '{}' both write the clip-space position",
                TransformFeature::TYPE_NAME,
                HardwareSkinning::TYPE_NAME
            ),
        ));
    }
    Ok(())
}

fn validate_interface(programs: &ProgramSet) -> Result<()> {
    let vs = programs.vertex();
    let fs = programs.fragment();

    if vs.find_output_by_content(Content::PositionProjectiveSpace).is_none() {
        return Err(ShaderError::resolution(
            ShaderStage::Vertex,
            "no feature writes the clip-space position",
        ));
    }
    if fs.find_output(Semantic::Color, 0).is_none() {
        return Err(ShaderError::resolution(
            ShaderStage::Fragment,
            "no feature writes the fragment colour",
        ));
    }
    for input in fs.inputs() {
        if !programs.varyings().iter().any(|v| v.fragment_input == input.id()) {
            return Err(ShaderError::resolution(
                ShaderStage::Fragment,
                format!("input '{}' has no matching vertex output", input.name()),
            ));
        }
    }
    Ok(())
}
