//! Dual quaternion skinning over a 2x4 palette.
//!
//! The blended dual quaternion is the plain weighted sum `Σ w_i · DQ_i`; it is
//! normalized once after accumulation, never per step. Antipodality
//! correction writes the flipped bone into a local and leaves the palette
//! uniform untouched.

use mosaic_core::Result;
use mosaic_program::library;
use mosaic_program::{AutoConstant, DataType, FunctionInvocation, OperandMask, OrderCounter, Program};

use super::{HardwareSkinning, SkinningConfig, SkinningParameters, accumulate, weight_mask};
use crate::sub_render_state::{order, resolved};

pub(super) fn resolve_parameters(config: &SkinningConfig, p: &mut SkinningParameters, vs: &mut Program) -> Result<()> {
    p.bones = Some(vs.resolve_auto_constant(AutoConstant::WorldDualQuaternionArray2x4, Some(config.bone_count))?);
    p.blend_dq = Some(vs.resolve_local_named("lBlendDQ", DataType::Mat2x4)?);
    p.temp_dq = Some(vs.resolve_local_named("lTempDQ", DataType::Mat2x4)?);
    if config.correct_antipodality {
        p.adjusted_dq = Some(vs.resolve_local_named("lAdjustedDQ", DataType::Mat2x4)?);
    }
    if config.scale_shear {
        p.scale_shear = Some(vs.resolve_auto_constant(
            AutoConstant::WorldScaleShearMatrixArray3x4,
            Some(config.bone_count),
        )?);
        p.blend_s = Some(vs.resolve_local_named("lBlendS", DataType::Mat3x4)?);
        p.temp_s = Some(vs.resolve_local_named("lTempS", DataType::Mat3x4)?);
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
    let indices = resolved(p.indices, name, "indices")?;
    let weights = resolved(p.weights, name, "weights")?;
    let position = resolved(p.position_in, name, "position_in")?;

    if config.scale_shear {
        let palette = resolved(p.scale_shear, name, "scale_shear")?;
        let temp_s = resolved(p.temp_s, name, "temp_s")?;
        let blend_s = resolved(p.blend_s, name, "blend_s")?;
        for i in 0..config.weight_count {
            vs.add_invocation(
                FunctionInvocation::new(library::SGX_BLEND_WEIGHT, group, counter.next())
                    .input_masked(weights, weight_mask(i))
                    .input(palette)
                    .index(indices, weight_mask(i))
                    .output(temp_s),
            )?;
            accumulate(vs, counter, i, temp_s, blend_s)?;
        }
        vs.add_invocation(
            FunctionInvocation::new(library::FFP_TRANSFORM, group, counter.next())
                .input(blend_s)
                .input(position)
                .output_masked(position, OperandMask::X | OperandMask::Y | OperandMask::Z),
        )?;
    }

    let bones = resolved(p.bones, name, "bones")?;
    let temp_dq = resolved(p.temp_dq, name, "temp_dq")?;
    let blend_dq = resolved(p.blend_dq, name, "blend_dq")?;
    for i in 0..config.weight_count {
        let source = if config.correct_antipodality {
            let adjusted = resolved(p.adjusted_dq, name, "adjusted_dq")?;
            vs.add_invocation(
                FunctionInvocation::new(library::SGX_ANTIPODALITY_ADJUSTMENT, group, counter.next())
                    .input(bones)
                    .index(indices, weight_mask(0))
                    .input(bones)
                    .index(indices, weight_mask(i))
                    .output(adjusted),
            )?;
            FunctionInvocation::new(library::SGX_BLEND_WEIGHT, group, counter.next())
                .input_masked(weights, weight_mask(i))
                .input(adjusted)
        } else {
            FunctionInvocation::new(library::SGX_BLEND_WEIGHT, group, counter.next())
                .input_masked(weights, weight_mask(i))
                .input(bones)
                .index(indices, weight_mask(i))
        };
        vs.add_invocation(source.output(temp_dq))?;
        accumulate(vs, counter, i, temp_dq, blend_dq)?;
    }

    vs.add_invocation(
        FunctionInvocation::new(library::SGX_NORMALIZE_DUAL_QUATERNION, group, counter.next()).inout(blend_dq),
    )?;

    let position_world = resolved(p.position_world, name, "position_world")?;
    vs.add_invocation(
        FunctionInvocation::new(library::SGX_CALCULATE_BLEND_POSITION, group, counter.next())
            .input(position)
            .input(blend_dq)
            .output(position_world),
    )?;
    vs.add_invocation(
        FunctionInvocation::new(library::FFP_TRANSFORM, group, counter.next())
            .input(resolved(p.view_proj, name, "view_proj")?)
            .input(position_world)
            .output(resolved(p.position_out, name, "position_out")?),
    )?;

    for dir in &p.directions {
        vs.add_invocation(
            FunctionInvocation::new(library::SGX_CALCULATE_BLEND_NORMAL, group, counter.next())
                .input(dir.input)
                .input(blend_dq)
                .output(dir.world),
        )?;
    }
    Ok(())
}
