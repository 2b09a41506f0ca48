//! A [`Device`] that records calls instead of issuing them.

use crate::device::Device;
use crate::gl::{GLclampf, GLenum, GLfloat, GLint, GLuint};

/// One recorded device call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCall {
    BindBuffer { target: GLenum, buffer: GLuint },
    DeleteBuffer { buffer: GLuint },
    BindTexture { target: GLenum, texture: GLuint },
    ActiveTexture { unit: GLenum },
    TexParameterI { target: GLenum, pname: GLenum, param: GLint },
    TexParameterF { target: GLenum, pname: GLenum, param: GLfloat },
    BlendFunc { source: GLenum, dest: GLenum },
    BlendFuncSeparate { source: GLenum, dest: GLenum, source_alpha: GLenum, dest_alpha: GLenum },
    BlendEquation { equation: GLenum },
    BlendEquationSeparate { equation: GLenum, equation_alpha: GLenum },
    DepthMask(bool),
    DepthFunc(GLenum),
    ClearDepth(GLclampf),
    ClearColor([GLclampf; 4]),
    ColorMask([bool; 4]),
    StencilMask(GLuint),
    Enable(GLenum),
    Disable(GLenum),
    EnableVertexAttribArray(GLuint),
    DisableVertexAttribArray(GLuint),
    CullFace(GLenum),
    PolygonMode { face: GLenum, mode: GLenum },
}

/// Headless device for tests and tooling.
#[derive(Debug, Default, Clone)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
}

impl RecordingDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Returns the recorded calls and starts a fresh log.
    pub fn take(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    #[must_use]
    pub fn count(&self, call: &DeviceCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Device for RecordingDevice {
    fn bind_buffer(&mut self, target: GLenum, buffer: GLuint) {
        self.calls.push(DeviceCall::BindBuffer { target, buffer });
    }

    fn delete_buffer(&mut self, buffer: GLuint) {
        self.calls.push(DeviceCall::DeleteBuffer { buffer });
    }

    fn bind_texture(&mut self, target: GLenum, texture: GLuint) {
        self.calls.push(DeviceCall::BindTexture { target, texture });
    }

    fn active_texture(&mut self, unit: GLenum) {
        self.calls.push(DeviceCall::ActiveTexture { unit });
    }

    fn tex_parameter_i(&mut self, target: GLenum, pname: GLenum, param: GLint) {
        self.calls.push(DeviceCall::TexParameterI { target, pname, param });
    }

    fn tex_parameter_f(&mut self, target: GLenum, pname: GLenum, param: GLfloat) {
        self.calls.push(DeviceCall::TexParameterF { target, pname, param });
    }

    fn blend_func(&mut self, source: GLenum, dest: GLenum) {
        self.calls.push(DeviceCall::BlendFunc { source, dest });
    }

    fn blend_func_separate(&mut self, source: GLenum, dest: GLenum, source_alpha: GLenum, dest_alpha: GLenum) {
        self.calls.push(DeviceCall::BlendFuncSeparate {
            source,
            dest,
            source_alpha,
            dest_alpha,
        });
    }

    fn blend_equation(&mut self, equation: GLenum) {
        self.calls.push(DeviceCall::BlendEquation { equation });
    }

    fn blend_equation_separate(&mut self, equation: GLenum, equation_alpha: GLenum) {
        self.calls.push(DeviceCall::BlendEquationSeparate {
            equation,
            equation_alpha,
        });
    }

    fn depth_mask(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::DepthMask(enabled));
    }

    fn depth_func(&mut self, func: GLenum) {
        self.calls.push(DeviceCall::DepthFunc(func));
    }

    fn clear_depth(&mut self, depth: GLclampf) {
        self.calls.push(DeviceCall::ClearDepth(depth));
    }

    fn clear_color(&mut self, red: GLclampf, green: GLclampf, blue: GLclampf, alpha: GLclampf) {
        self.calls.push(DeviceCall::ClearColor([red, green, blue, alpha]));
    }

    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        self.calls.push(DeviceCall::ColorMask([red, green, blue, alpha]));
    }

    fn stencil_mask(&mut self, mask: GLuint) {
        self.calls.push(DeviceCall::StencilMask(mask));
    }

    fn enable(&mut self, capability: GLenum) {
        self.calls.push(DeviceCall::Enable(capability));
    }

    fn disable(&mut self, capability: GLenum) {
        self.calls.push(DeviceCall::Disable(capability));
    }

    fn enable_vertex_attrib_array(&mut self, index: GLuint) {
        self.calls.push(DeviceCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&mut self, index: GLuint) {
        self.calls.push(DeviceCall::DisableVertexAttribArray(index));
    }

    fn cull_face(&mut self, face: GLenum) {
        self.calls.push(DeviceCall::CullFace(face));
    }

    fn polygon_mode(&mut self, face: GLenum, mode: GLenum) {
        self.calls.push(DeviceCall::PolygonMode { face, mode });
    }
}
