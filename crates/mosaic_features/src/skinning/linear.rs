//! Linear blend skinning over a 3x4 matrix palette.

use mosaic_core::Result;
use mosaic_program::library;
use mosaic_program::{AutoConstant, DataType, FunctionInvocation, OperandMask, OrderCounter, Program};

use super::{HardwareSkinning, SkinningConfig, SkinningParameters, accumulate, weight_mask};
use crate::sub_render_state::{order, resolved};

pub(super) fn resolve_parameters(config: &SkinningConfig, p: &mut SkinningParameters, vs: &mut Program) -> Result<()> {
    p.bones = Some(vs.resolve_auto_constant(AutoConstant::WorldMatrixArray3x4, Some(config.bone_count))?);
    p.temp4 = Some(vs.resolve_local_named("lBlendTemp4", DataType::Float4)?);
    p.one = Some(vs.resolve_constant(DataType::Float, [1.0, 0.0, 0.0, 0.0])?);
    if !p.directions.is_empty() {
        p.temp3 = Some(vs.resolve_local_named("lBlendTemp3", DataType::Float3)?);
    }
    Ok(())
}

pub(super) fn add_function_invocations(
    config: &SkinningConfig,
    p: &SkinningParameters,
    vs: &mut Program,
    counter: &mut OrderCounter,
) -> Result<()> {
    let name = HardwareSkinning::TYPE_NAME;
    let group = order::TRANSFORM;
    let bones = resolved(p.bones, name, "bones")?;
    let indices = resolved(p.indices, name, "indices")?;
    let weights = resolved(p.weights, name, "weights")?;
    let position_world = resolved(p.position_world, name, "position_world")?;

    // position_world = Σ w_i * (bones[idx_i] * position)
    let position = resolved(p.position_in, name, "position_in")?;
    let temp4 = resolved(p.temp4, name, "temp4")?;
    for i in 0..config.weight_count {
        vs.add_invocation(
            FunctionInvocation::new(library::FFP_TRANSFORM, group, counter.next())
                .input(bones)
                .index(indices, weight_mask(i))
                .input(position)
                .output(temp4),
        )?;
        vs.add_invocation(
            FunctionInvocation::new(library::FFP_MODULATE, group, counter.next())
                .input_masked(weights, weight_mask(i))
                .input(temp4)
                .output(temp4),
        )?;
        accumulate(vs, counter, i, temp4, position_world)?;
    }
    vs.add_invocation(
        FunctionInvocation::new(library::FFP_ASSIGN, group, counter.next())
            .input(resolved(p.one, name, "one")?)
            .output_masked(position_world, OperandMask::W),
    )?;
    vs.add_invocation(
        FunctionInvocation::new(library::FFP_TRANSFORM, group, counter.next())
            .input(resolved(p.view_proj, name, "view_proj")?)
            .input(position_world)
            .output(resolved(p.position_out, name, "position_out")?),
    )?;

    // Normal, tangent and binormal blend the same way, without translation.
    if p.directions.is_empty() {
        return Ok(());
    }
    let temp3 = resolved(p.temp3, name, "temp3")?;
    for dir in &p.directions {
        for i in 0..config.weight_count {
            vs.add_invocation(
                FunctionInvocation::new(library::FFP_TRANSFORM, group, counter.next())
                    .input(bones)
                    .index(indices, weight_mask(i))
                    .input(dir.input)
                    .output(temp3),
            )?;
            vs.add_invocation(
                FunctionInvocation::new(library::FFP_MODULATE, group, counter.next())
                    .input_masked(weights, weight_mask(i))
                    .input(temp3)
                    .output(temp3),
            )?;
            accumulate(vs, counter, i, temp3, dir.world)?;
        }
    }
    Ok(())
}
