//! The graphics device the state cache sits in front of.

use crate::gl::{GLclampf, GLenum, GLfloat, GLint, GLuint};

/// Raw state-setting entry points of a graphics context.
///
/// Implementations forward straight to the API. Every method corresponds to
/// one device call; the [`StateCacheManager`](crate::StateCacheManager)
/// decides whether it is issued at all.
pub trait Device {
    fn bind_buffer(&mut self, target: GLenum, buffer: GLuint);
    fn delete_buffer(&mut self, buffer: GLuint);
    fn bind_texture(&mut self, target: GLenum, texture: GLuint);
    /// `unit` is the `GL_TEXTURE0 + n` enumerant.
    fn active_texture(&mut self, unit: GLenum);
    fn tex_parameter_i(&mut self, target: GLenum, pname: GLenum, param: GLint);
    fn tex_parameter_f(&mut self, target: GLenum, pname: GLenum, param: GLfloat);
    fn blend_func(&mut self, source: GLenum, dest: GLenum);
    fn blend_func_separate(&mut self, source: GLenum, dest: GLenum, source_alpha: GLenum, dest_alpha: GLenum);
    fn blend_equation(&mut self, equation: GLenum);
    fn blend_equation_separate(&mut self, equation: GLenum, equation_alpha: GLenum);
    fn depth_mask(&mut self, enabled: bool);
    fn depth_func(&mut self, func: GLenum);
    fn clear_depth(&mut self, depth: GLclampf);
    fn clear_color(&mut self, red: GLclampf, green: GLclampf, blue: GLclampf, alpha: GLclampf);
    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool);
    fn stencil_mask(&mut self, mask: GLuint);
    fn enable(&mut self, capability: GLenum);
    fn disable(&mut self, capability: GLenum);
    fn enable_vertex_attrib_array(&mut self, index: GLuint);
    fn disable_vertex_attrib_array(&mut self, index: GLuint);
    fn cull_face(&mut self, face: GLenum);
    fn polygon_mode(&mut self, face: GLenum, mode: GLenum);
}
