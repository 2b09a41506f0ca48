//! State Cache Manager
//!
//! Keeps a mirror of the context state and filters out redundant calls.
//!
//! | Area           | Keyed by                    | Untracked value means            |
//! |----------------|-----------------------------|----------------------------------|
//! | Buffers        | target                      | next bind always reaches device  |
//! | Textures       | (unit, target)              | next bind always reaches device  |
//! | Tex parameters | texture name, then `pname`  | next set always reaches device   |
//! | Everything else| single mirror value         | n/a, reset to GL defaults        |
//!
//! Destroying a buffer or texture must go through
//! [`delete_buffer`](StateCacheManager::delete_buffer) or
//! [`invalidate_state_for_texture`](StateCacheManager::invalidate_state_for_texture),
//! otherwise a recycled object name would be reported as already bound.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::device::Device;
use crate::gl::{
    GL_BACK, GL_FILL, GL_FRONT_AND_BACK, GL_FUNC_ADD, GL_LESS, GL_ONE, GL_ZERO, GLclampf, GLenum, GLfloat,
    GLint, GLuint, texture_unit,
};

/// Source and destination factors for colour and alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendFuncState {
    pub source: GLenum,
    pub dest: GLenum,
    pub source_alpha: GLenum,
    pub dest_alpha: GLenum,
}

impl Default for BlendFuncState {
    fn default() -> Self {
        Self {
            source: GL_ONE,
            dest: GL_ZERO,
            source_alpha: GL_ONE,
            dest_alpha: GL_ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendEquationState {
    pub rgb: GLenum,
    pub alpha: GLenum,
}

impl Default for BlendEquationState {
    fn default() -> Self {
        Self {
            rgb: GL_FUNC_ADD,
            alpha: GL_FUNC_ADD,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct TexParams {
    ints: FxHashMap<GLenum, GLint>,
    floats: FxHashMap<GLenum, GLfloat>,
}

/// Mirror of the context state. `Default` is a fresh GL context.
#[derive(Debug, Clone)]
struct Mirror {
    buffers: FxHashMap<GLenum, GLuint>,
    textures: FxHashMap<(u8, GLenum), GLuint>,
    tex_params: FxHashMap<GLuint, TexParams>,
    active_unit: u8,
    blend_func: BlendFuncState,
    blend_equation: BlendEquationState,
    depth_mask: bool,
    depth_func: GLenum,
    clear_depth: GLclampf,
    clear_colour: [GLclampf; 4],
    colour_mask: [bool; 4],
    stencil_mask: GLuint,
    enabled: SmallVec<[GLenum; 8]>,
    vertex_attribs: SmallVec<[GLuint; 16]>,
    cull_face: GLenum,
    polygon_mode: GLenum,
    discard_buffers: u32,
}

impl Default for Mirror {
    fn default() -> Self {
        Self {
            buffers: FxHashMap::default(),
            textures: FxHashMap::default(),
            tex_params: FxHashMap::default(),
            active_unit: 0,
            blend_func: BlendFuncState::default(),
            blend_equation: BlendEquationState::default(),
            depth_mask: true,
            depth_func: GL_LESS,
            clear_depth: 1.0,
            clear_colour: [0.0; 4],
            colour_mask: [true; 4],
            stencil_mask: 0xFFFF_FFFF,
            enabled: SmallVec::new(),
            vertex_attribs: SmallVec::new(),
            cull_face: GL_BACK,
            polygon_mode: GL_FILL,
            discard_buffers: 0,
        }
    }
}

/// Redundant-call filter in front of a [`Device`].
///
/// Each setter takes the device call's arguments plus `force`; a forced call
/// always reaches the device and refreshes the mirror.
pub struct StateCacheManager<D: Device> {
    device: D,
    mirror: Mirror,
    max_texture_units: u8,
}

impl<D: Device> StateCacheManager<D> {
    /// Wraps `device`, assuming it is in its default state.
    #[must_use]
    pub fn new(device: D, max_texture_units: u8) -> Self {
        Self {
            device,
            mirror: Mirror::default(),
            max_texture_units,
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Direct device access. Calls made through it bypass the mirror.
    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[must_use]
    pub fn into_inner(self) -> D {
        self.device
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Resets the mirror to GL defaults without touching the device.
    pub fn clear_cache(&mut self) {
        self.mirror = Mirror::default();
    }

    /// Resets the mirror and pushes the defaults to the device, for a freshly
    /// created or recovered context.
    pub fn initialize_cache(&mut self) {
        self.clear_cache();
        let m = &self.mirror;

        self.device.blend_equation(m.blend_equation.rgb);
        self.device.blend_func(m.blend_func.source, m.blend_func.dest);
        self.device.cull_face(m.cull_face);
        self.device.depth_func(m.depth_func);
        self.device.depth_mask(m.depth_mask);
        self.device.stencil_mask(m.stencil_mask);
        self.device.clear_depth(m.clear_depth);
        let [r, g, b, a] = m.clear_colour;
        self.device.clear_color(r, g, b, a);
        let [r, g, b, a] = m.colour_mask;
        self.device.color_mask(r, g, b, a);
        self.device.polygon_mode(GL_FRONT_AND_BACK, m.polygon_mode);
        self.device.active_texture(texture_unit(0));

        log::debug!("State cache initialized");
    }

    // ─── Buffers ─────────────────────────────────────────────────────────────

    pub fn bind_buffer(&mut self, target: GLenum, buffer: GLuint, force: bool) {
        if force || self.mirror.buffers.get(&target) != Some(&buffer) {
            self.mirror.buffers.insert(target, buffer);
            self.device.bind_buffer(target, buffer);
        }
    }

    /// Deletes `buffer` and drops every binding that referenced it.
    ///
    /// With `force`, the binding of `target` is dropped whatever it held.
    /// Name 0 is reserved and ignored.
    pub fn delete_buffer(&mut self, target: GLenum, buffer: GLuint, force: bool) {
        if buffer == 0 {
            return;
        }
        self.mirror.buffers.retain(|t, b| *b != buffer && !(force && *t == target));
        self.device.delete_buffer(buffer);
    }

    #[must_use]
    pub fn bound_buffer(&self, target: GLenum) -> Option<GLuint> {
        self.mirror.buffers.get(&target).copied()
    }

    // ─── Textures ────────────────────────────────────────────────────────────

    /// Binds `texture` to `target` on the active unit.
    pub fn bind_texture(&mut self, target: GLenum, texture: GLuint, force: bool) {
        let key = (self.mirror.active_unit, target);
        if force || self.mirror.textures.get(&key) != Some(&texture) {
            self.mirror.textures.insert(key, texture);
            self.device.bind_texture(target, texture);
        }
    }

    /// Returns `false` and issues nothing when `unit` exceeds the device's
    /// texture units.
    pub fn activate_texture_unit(&mut self, unit: u8, force: bool) -> bool {
        if unit >= self.max_texture_units {
            log::warn!(
                "Texture unit {unit} out of range (device has {})",
                self.max_texture_units
            );
            return false;
        }
        if force || self.mirror.active_unit != unit {
            self.mirror.active_unit = unit;
            self.device.active_texture(texture_unit(unit));
        }
        true
    }

    /// Drops every binding and cached parameter of a destroyed texture.
    pub fn invalidate_state_for_texture(&mut self, texture: GLuint) {
        self.mirror.tex_params.remove(&texture);
        self.mirror.textures.retain(|_, t| *t != texture);
    }

    /// Sets an integer parameter of the texture bound to `target` on the
    /// active unit. Without a tracked binding the call is always issued.
    pub fn set_tex_parameter_i(&mut self, target: GLenum, pname: GLenum, param: GLint, force: bool) {
        if let Some(texture) = self.current_texture(target) {
            let params = self.mirror.tex_params.entry(texture).or_default();
            if !force && params.ints.get(&pname) == Some(&param) {
                return;
            }
            params.ints.insert(pname, param);
        }
        self.device.tex_parameter_i(target, pname, param);
    }

    #[allow(clippy::float_cmp)]
    pub fn set_tex_parameter_f(&mut self, target: GLenum, pname: GLenum, param: GLfloat, force: bool) {
        if let Some(texture) = self.current_texture(target) {
            let params = self.mirror.tex_params.entry(texture).or_default();
            if !force && params.floats.get(&pname) == Some(&param) {
                return;
            }
            params.floats.insert(pname, param);
        }
        self.device.tex_parameter_f(target, pname, param);
    }

    #[must_use]
    pub fn tex_parameter_i(&self, target: GLenum, pname: GLenum) -> Option<GLint> {
        let texture = self.current_texture(target)?;
        self.mirror.tex_params.get(&texture)?.ints.get(&pname).copied()
    }

    #[must_use]
    pub fn tex_parameter_f(&self, target: GLenum, pname: GLenum) -> Option<GLfloat> {
        let texture = self.current_texture(target)?;
        self.mirror.tex_params.get(&texture)?.floats.get(&pname).copied()
    }

    #[must_use]
    pub fn bound_texture(&self, unit: u8, target: GLenum) -> Option<GLuint> {
        self.mirror.textures.get(&(unit, target)).copied()
    }

    #[inline]
    #[must_use]
    pub fn active_texture_unit(&self) -> u8 {
        self.mirror.active_unit
    }

    fn current_texture(&self, target: GLenum) -> Option<GLuint> {
        self.bound_texture(self.mirror.active_unit, target)
            .filter(|t| *t != 0)
    }

    // ─── Blending ────────────────────────────────────────────────────────────

    pub fn set_blend_func(&mut self, source: GLenum, dest: GLenum, force: bool) {
        let requested = BlendFuncState {
            source,
            dest,
            source_alpha: source,
            dest_alpha: dest,
        };
        if force || self.mirror.blend_func != requested {
            self.mirror.blend_func = requested;
            self.device.blend_func(source, dest);
        }
    }

    pub fn set_blend_func_separate(
        &mut self,
        source: GLenum,
        dest: GLenum,
        source_alpha: GLenum,
        dest_alpha: GLenum,
        force: bool,
    ) {
        let requested = BlendFuncState {
            source,
            dest,
            source_alpha,
            dest_alpha,
        };
        if force || self.mirror.blend_func != requested {
            self.mirror.blend_func = requested;
            self.device.blend_func_separate(source, dest, source_alpha, dest_alpha);
        }
    }

    pub fn set_blend_equation(&mut self, equation: GLenum, force: bool) {
        let requested = BlendEquationState {
            rgb: equation,
            alpha: equation,
        };
        if force || self.mirror.blend_equation != requested {
            self.mirror.blend_equation = requested;
            self.device.blend_equation(equation);
        }
    }

    pub fn set_blend_equation_separate(&mut self, equation: GLenum, equation_alpha: GLenum, force: bool) {
        let requested = BlendEquationState {
            rgb: equation,
            alpha: equation_alpha,
        };
        if force || self.mirror.blend_equation != requested {
            self.mirror.blend_equation = requested;
            self.device.blend_equation_separate(equation, equation_alpha);
        }
    }

    #[inline]
    #[must_use]
    pub fn blend_func(&self) -> BlendFuncState {
        self.mirror.blend_func
    }

    #[inline]
    #[must_use]
    pub fn blend_equation(&self) -> BlendEquationState {
        self.mirror.blend_equation
    }

    // ─── Depth / Stencil / Clear ─────────────────────────────────────────────

    pub fn set_depth_mask(&mut self, enabled: bool, force: bool) {
        if force || self.mirror.depth_mask != enabled {
            self.mirror.depth_mask = enabled;
            self.device.depth_mask(enabled);
        }
    }

    pub fn set_depth_func(&mut self, func: GLenum, force: bool) {
        if force || self.mirror.depth_func != func {
            self.mirror.depth_func = func;
            self.device.depth_func(func);
        }
    }

    #[allow(clippy::float_cmp)]
    pub fn set_clear_depth(&mut self, depth: GLclampf, force: bool) {
        if force || self.mirror.clear_depth != depth {
            self.mirror.clear_depth = depth;
            self.device.clear_depth(depth);
        }
    }

    #[allow(clippy::float_cmp)]
    pub fn set_clear_colour(&mut self, colour: [GLclampf; 4], force: bool) {
        if force || self.mirror.clear_colour != colour {
            self.mirror.clear_colour = colour;
            let [r, g, b, a] = colour;
            self.device.clear_color(r, g, b, a);
        }
    }

    pub fn set_colour_mask(&mut self, mask: [bool; 4], force: bool) {
        if force || self.mirror.colour_mask != mask {
            self.mirror.colour_mask = mask;
            let [r, g, b, a] = mask;
            self.device.color_mask(r, g, b, a);
        }
    }

    pub fn set_stencil_mask(&mut self, mask: GLuint, force: bool) {
        if force || self.mirror.stencil_mask != mask {
            self.mirror.stencil_mask = mask;
            self.device.stencil_mask(mask);
        }
    }

    #[inline]
    #[must_use]
    pub fn depth_mask(&self) -> bool {
        self.mirror.depth_mask
    }

    #[inline]
    #[must_use]
    pub fn depth_func(&self) -> GLenum {
        self.mirror.depth_func
    }

    #[inline]
    #[must_use]
    pub fn clear_depth(&self) -> GLclampf {
        self.mirror.clear_depth
    }

    #[inline]
    #[must_use]
    pub fn clear_colour(&self) -> [GLclampf; 4] {
        self.mirror.clear_colour
    }

    #[inline]
    #[must_use]
    pub fn colour_mask(&self) -> [bool; 4] {
        self.mirror.colour_mask
    }

    #[inline]
    #[must_use]
    pub fn stencil_mask(&self) -> GLuint {
        self.mirror.stencil_mask
    }

    // ─── Capabilities / Vertex attributes ────────────────────────────────────

    pub fn set_enabled(&mut self, capability: GLenum, force: bool) {
        let tracked = self.mirror.enabled.contains(&capability);
        if !tracked {
            self.mirror.enabled.push(capability);
        }
        if force || !tracked {
            self.device.enable(capability);
        }
    }

    pub fn set_disabled(&mut self, capability: GLenum, force: bool) {
        let position = self.mirror.enabled.iter().position(|c| *c == capability);
        if let Some(i) = position {
            self.mirror.enabled.swap_remove(i);
        }
        if force || position.is_some() {
            self.device.disable(capability);
        }
    }

    #[must_use]
    pub fn is_enabled(&self, capability: GLenum) -> bool {
        self.mirror.enabled.contains(&capability)
    }

    pub fn set_vertex_attrib_enabled(&mut self, index: GLuint, force: bool) {
        let tracked = self.mirror.vertex_attribs.contains(&index);
        if !tracked {
            self.mirror.vertex_attribs.push(index);
        }
        if force || !tracked {
            self.device.enable_vertex_attrib_array(index);
        }
    }

    pub fn set_vertex_attrib_disabled(&mut self, index: GLuint, force: bool) {
        let position = self.mirror.vertex_attribs.iter().position(|a| *a == index);
        if let Some(i) = position {
            self.mirror.vertex_attribs.swap_remove(i);
        }
        if force || position.is_some() {
            self.device.disable_vertex_attrib_array(index);
        }
    }

    #[must_use]
    pub fn is_vertex_attrib_enabled(&self, index: GLuint) -> bool {
        self.mirror.vertex_attribs.contains(&index)
    }

    // ─── Rasterization ───────────────────────────────────────────────────────

    pub fn set_cull_face(&mut self, face: GLenum, force: bool) {
        if force || self.mirror.cull_face != face {
            self.mirror.cull_face = face;
            self.device.cull_face(face);
        }
    }

    pub fn set_polygon_mode(&mut self, mode: GLenum, force: bool) {
        if force || self.mirror.polygon_mode != mode {
            self.mirror.polygon_mode = mode;
            self.device.polygon_mode(GL_FRONT_AND_BACK, mode);
        }
    }

    /// Records which buffers the next frame may discard. Mirror only; the
    /// device reads it when the frame ends.
    pub fn set_discard_buffers(&mut self, flags: u32) {
        self.mirror.discard_buffers = flags;
    }

    #[inline]
    #[must_use]
    pub fn cull_face(&self) -> GLenum {
        self.mirror.cull_face
    }

    #[inline]
    #[must_use]
    pub fn polygon_mode(&self) -> GLenum {
        self.mirror.polygon_mode
    }

    #[inline]
    #[must_use]
    pub fn discard_buffers(&self) -> u32 {
        self.mirror.discard_buffers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::*;
    use crate::recording::{DeviceCall, RecordingDevice};

    fn manager() -> StateCacheManager<RecordingDevice> {
        StateCacheManager::new(RecordingDevice::new(), 8)
    }

    #[test]
    fn test_redundant_bind_is_filtered() {
        let mut cache = manager();
        cache.bind_texture(GL_TEXTURE_2D, 7, false);
        cache.bind_texture(GL_TEXTURE_2D, 7, false);
        assert_eq!(cache.device().len(), 1);

        cache.bind_texture(GL_TEXTURE_2D, 7, true);
        assert_eq!(cache.device().len(), 2);
    }

    #[test]
    fn test_texture_bindings_are_per_unit() {
        let mut cache = manager();
        cache.bind_texture(GL_TEXTURE_2D, 3, false);
        assert!(cache.activate_texture_unit(1, false));
        cache.bind_texture(GL_TEXTURE_2D, 3, false);

        assert_eq!(cache.bound_texture(0, GL_TEXTURE_2D), Some(3));
        assert_eq!(cache.bound_texture(1, GL_TEXTURE_2D), Some(3));
        assert_eq!(cache.device().count(&DeviceCall::BindTexture { target: GL_TEXTURE_2D, texture: 3 }), 2);
    }

    #[test]
    fn test_out_of_range_unit_is_rejected() {
        let mut cache = manager();
        assert!(!cache.activate_texture_unit(8, false));
        assert!(cache.device().is_empty());
        assert_eq!(cache.active_texture_unit(), 0);
    }

    #[test]
    fn test_tex_parameters_follow_the_bound_texture() {
        let mut cache = manager();
        cache.bind_texture(GL_TEXTURE_2D, 5, false);
        cache.set_tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_LINEAR, false);
        cache.set_tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_LINEAR, false);
        assert_eq!(cache.device().len(), 2);
        assert_eq!(cache.tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER), Some(GL_LINEAR));

        cache.bind_texture(GL_TEXTURE_2D, 6, false);
        cache.set_tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_LINEAR, false);
        assert_eq!(cache.device().len(), 4);
    }

    #[test]
    fn test_enable_disable_round() {
        let mut cache = manager();
        cache.set_enabled(GL_BLEND, false);
        cache.set_enabled(GL_BLEND, false);
        assert!(cache.is_enabled(GL_BLEND));
        cache.set_disabled(GL_BLEND, false);
        cache.set_disabled(GL_BLEND, false);
        assert!(!cache.is_enabled(GL_BLEND));
        assert_eq!(
            cache.device().calls(),
            &[DeviceCall::Enable(GL_BLEND), DeviceCall::Disable(GL_BLEND)]
        );
    }

    #[test]
    fn test_blend_func_and_separate_share_state() {
        let mut cache = manager();
        cache.set_blend_func(GL_ONE, GL_ZERO, false);
        assert!(cache.device().is_empty());

        cache.set_blend_func_separate(GL_SRC_ALPHA, GL_ONE_MINUS_SRC_ALPHA, GL_ONE, GL_ZERO, false);
        cache.set_blend_func(GL_SRC_ALPHA, GL_ONE_MINUS_SRC_ALPHA, false);
        assert_eq!(cache.device().len(), 2);
        assert_eq!(cache.blend_func().source_alpha, GL_SRC_ALPHA);
    }

    #[test]
    fn test_clear_cache_issues_nothing() {
        let mut cache = manager();
        cache.set_depth_func(GL_LEQUAL, false);
        cache.device_mut().take();

        cache.clear_cache();
        assert!(cache.device().is_empty());
        assert_eq!(cache.depth_func(), GL_LESS);
        assert_eq!(cache.stencil_mask(), 0xFFFF_FFFF);
    }
}
