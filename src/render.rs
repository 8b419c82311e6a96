//! Render engine.
//!
//! This module implements the WebGL2 side of the shader viewer: context
//! acquisition, compilation and linking of shader programs, the full-screen
//! quad geometry, and uniform handling. The compile pipeline is built around
//! [`RenderContext::make_program`], which either returns a fully linked
//! [`CompiledProgram`] or a diagnostic, leaving all other GL state untouched
//! so that a failed reload never disturbs the program currently on screen.

pub use context::{CompiledProgram, RenderContext};
pub use uniform::{UniformCache, UniformType};
pub(crate) use uniform::validate_component_count;

mod context;
mod uniform;

/// Shader program source.
///
/// This contains the fragment shader source and an optional vertex shader
/// override for a program that is to be compiled. When `vertex_shader` is
/// `None`, [`DEFAULT_VERTEX_SHADER`] is used.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramSource<'a> {
    /// Source for the fragment shader.
    pub fragment_shader: &'a str,
    /// Optional source for the vertex shader.
    pub vertex_shader: Option<&'a str>,
}

/// Built-in vertex shader.
///
/// Passes through the full-screen quad vertices unchanged, so the fragment
/// shader runs once per output pixel.
pub const DEFAULT_VERTEX_SHADER: &str = "\
attribute vec2 a_position;
void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Name of the attribute carrying the quad vertex positions.
pub const POSITION_ATTRIBUTE: &str = "a_position";

/// Six vertices covering the clip-space square as two triangles.
pub(crate) const QUAD_VERTICES: [f32; 12] = [
    -1.0, -1.0, //
    1.0, -1.0, //
    -1.0, 1.0, //
    -1.0, 1.0, //
    1.0, -1.0, //
    1.0, 1.0, //
];
