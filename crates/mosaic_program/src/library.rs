//! Names of the built-in shader library functions and include files.
//!
//! The library sources themselves ship with the renderer; the composer only
//! emits `#include` directives and calls by name.

use mosaic_core::interner;

// Common
pub const FFP_ASSIGN: &str = "FFP_Assign";
pub const FFP_ADD: &str = "FFP_Add";
pub const FFP_MODULATE: &str = "FFP_Modulate";
pub const FFP_LERP: &str = "FFP_Lerp";

// Transform
pub const FFP_TRANSFORM: &str = "FFP_Transform";

// Lighting
pub const FFP_LIGHT_DIRECTIONAL_DIFFUSE: &str = "FFP_Light_Directional_Diffuse";

// Texturing
pub const FFP_SAMPLE_TEXTURE: &str = "FFP_SampleTexture";

// Fog
pub const FFP_VERTEX_FOG_LINEAR: &str = "FFP_VertexFog_Linear";
pub const FFP_VERTEX_FOG_EXP: &str = "FFP_VertexFog_Exp";
pub const FFP_VERTEX_FOG_EXP2: &str = "FFP_VertexFog_Exp2";
pub const FFP_PIXEL_FOG_DEPTH: &str = "FFP_PixelFog_Depth";
pub const FFP_PIXEL_FOG_LINEAR: &str = "FFP_PixelFog_Linear";
pub const FFP_PIXEL_FOG_EXP: &str = "FFP_PixelFog_Exp";
pub const FFP_PIXEL_FOG_EXP2: &str = "FFP_PixelFog_Exp2";

// Dual quaternion skinning
pub const SGX_BLEND_WEIGHT: &str = "SGX_BlendWeight";
pub const SGX_ANTIPODALITY_ADJUSTMENT: &str = "SGX_AntipodalityAdjustment";
pub const SGX_NORMALIZE_DUAL_QUATERNION: &str = "SGX_NormalizeDualQuaternion";
pub const SGX_CALCULATE_BLEND_POSITION: &str = "SGX_CalculateBlendPosition";
pub const SGX_CALCULATE_BLEND_NORMAL: &str = "SGX_CalculateBlendNormal";

// Include files
pub const LIB_COMMON: &str = "FFPLib_Common";
pub const LIB_TRANSFORM: &str = "FFPLib_Transform";
pub const LIB_LIGHTING: &str = "FFPLib_Lighting";
pub const LIB_TEXTURING: &str = "FFPLib_Texturing";
pub const LIB_FOG: &str = "FFPLib_Fog";
pub const LIB_DUAL_QUATERNION: &str = "SGXLib_DualQuaternion";

const ALL_NAMES: &[&str] = &[
    FFP_ASSIGN,
    FFP_ADD,
    FFP_MODULATE,
    FFP_LERP,
    FFP_TRANSFORM,
    FFP_LIGHT_DIRECTIONAL_DIFFUSE,
    FFP_SAMPLE_TEXTURE,
    FFP_VERTEX_FOG_LINEAR,
    FFP_VERTEX_FOG_EXP,
    FFP_VERTEX_FOG_EXP2,
    FFP_PIXEL_FOG_DEPTH,
    FFP_PIXEL_FOG_LINEAR,
    FFP_PIXEL_FOG_EXP,
    FFP_PIXEL_FOG_EXP2,
    SGX_BLEND_WEIGHT,
    SGX_ANTIPODALITY_ADJUSTMENT,
    SGX_NORMALIZE_DUAL_QUATERNION,
    SGX_CALCULATE_BLEND_POSITION,
    SGX_CALCULATE_BLEND_NORMAL,
    LIB_COMMON,
    LIB_TRANSFORM,
    LIB_LIGHTING,
    LIB_TEXTURING,
    LIB_FOG,
    LIB_DUAL_QUATERNION,
];

/// Interns every built-in name up front.
pub fn preload() {
    interner::preload_library_names(ALL_NAMES);
}
