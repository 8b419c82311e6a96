use super::{DEFAULT_VERTEX_SHADER, POSITION_ATTRIBUTE, ProgramSource, QUAD_VERTICES};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlVertexArrayObject,
};

/// WebGL2 render context for one canvas.
///
/// Owns the `WebGl2RenderingContext` and implements program compilation and
/// the per-frame draw primitives. Construction fails if the browser cannot
/// provide a WebGL2 context; there is no fallback.
pub struct RenderContext {
    canvas: Rc<HtmlCanvasElement>,
    gl: WebGl2RenderingContext,
}

/// A compiled and linked shader program with its quad geometry.
///
/// Each program carries a monotonically increasing generation number, used to
/// invalidate cached uniform locations when the active program changes. The
/// GL objects are released explicitly with [`CompiledProgram::delete`]; the
/// render loop does so only after a replacement program has been installed.
pub struct CompiledProgram {
    program: WebGlProgram,
    vao: WebGlVertexArrayObject,
    vertex_buffer: WebGlBuffer,
    generation: u64,
}

impl CompiledProgram {
    /// Returns the WebGL2 program handle.
    pub fn program(&self) -> &WebGlProgram {
        &self.program
    }

    /// Returns the generation number of this program.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Releases the GL objects owned by this program.
    pub fn delete(self, gl: &WebGl2RenderingContext) {
        gl.delete_vertex_array(Some(&self.vao));
        gl.delete_buffer(Some(&self.vertex_buffer));
        gl.delete_program(Some(&self.program));
    }
}

impl RenderContext {
    /// Creates a render context on the given canvas.
    ///
    /// Obtains the `webgl2` context and applies the context attributes. An
    /// unavailable context is a construction failure and no viewer is built
    /// on top of it.
    pub fn new(canvas: Rc<HtmlCanvasElement>) -> Result<RenderContext, JsValue> {
        let gl = canvas
            .get_context("webgl2")?
            .ok_or("unable to get webgl2 context")?
            .dyn_into::<WebGl2RenderingContext>()?;
        let gl_attrs = gl
            .get_context_attributes()
            .ok_or("unable to get webgl2 context attributes")?;
        gl_attrs.set_alpha(false);
        gl_attrs.set_antialias(true);
        gl_attrs.set_power_preference(web_sys::WebGlPowerPreference::LowPower);
        Ok(RenderContext { canvas, gl })
    }

    /// Returns the underlying WebGL2 context.
    pub fn gl(&self) -> &WebGl2RenderingContext {
        &self.gl
    }

    /// Returns the canvas this context renders to.
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Compiles and links a shader program.
    ///
    /// Both stages are compiled independently; a failure in either stage, in
    /// linking, or in allocating the quad geometry returns the diagnostic as
    /// the error value and releases everything created for this attempt. On
    /// success the returned program owns a six-vertex clip-space quad bound
    /// to the `a_position` attribute.
    pub fn make_program(
        &self,
        source: ProgramSource<'_>,
        generation: u64,
    ) -> Result<CompiledProgram, JsValue> {
        let vertex_source = source.vertex_shader.unwrap_or(DEFAULT_VERTEX_SHADER);
        let vertex_shader =
            self.compile_shader(WebGl2RenderingContext::VERTEX_SHADER, vertex_source)?;
        let fragment_shader = match self.compile_shader(
            WebGl2RenderingContext::FRAGMENT_SHADER,
            source.fragment_shader,
        ) {
            Ok(shader) => shader,
            Err(e) => {
                self.gl.delete_shader(Some(&vertex_shader));
                return Err(e);
            }
        };
        let program = self.link_program(&vertex_shader, &fragment_shader);
        // The shaders are owned by the program after linking and can be
        // flagged for deletion regardless of the outcome.
        self.gl.delete_shader(Some(&vertex_shader));
        self.gl.delete_shader(Some(&fragment_shader));
        let program = program?;
        let (vao, vertex_buffer) = match self.make_quad(&program) {
            Ok(x) => x,
            Err(e) => {
                self.gl.delete_program(Some(&program));
                return Err(e);
            }
        };
        Ok(CompiledProgram {
            program,
            vao,
            vertex_buffer,
            generation,
        })
    }

    fn compile_shader(&self, shader_type: u32, source: &str) -> Result<WebGlShader, JsValue> {
        let shader = self
            .gl
            .create_shader(shader_type)
            .ok_or("failed to create shader")?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);
        if self
            .gl
            .get_shader_parameter(&shader, WebGl2RenderingContext::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(shader)
        } else {
            let log = self
                .gl
                .get_shader_info_log(&shader)
                .map(|x| JsValue::from(&x))
                .unwrap_or_else(|| "unknown error creating shader".into());
            self.gl.delete_shader(Some(&shader));
            Err(log)
        }
    }

    fn link_program(
        &self,
        vertex_shader: &WebGlShader,
        fragment_shader: &WebGlShader,
    ) -> Result<WebGlProgram, JsValue> {
        let program = self.gl.create_program().ok_or("unable to create program")?;
        self.gl.attach_shader(&program, vertex_shader);
        self.gl.attach_shader(&program, fragment_shader);
        self.gl.link_program(&program);
        if self
            .gl
            .get_program_parameter(&program, WebGl2RenderingContext::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(program)
        } else {
            let log = self
                .gl
                .get_program_info_log(&program)
                .map(|x| JsValue::from(&x))
                .unwrap_or_else(|| "unknown error linking program".into());
            self.gl.delete_program(Some(&program));
            Err(log)
        }
    }

    fn make_quad(
        &self,
        program: &WebGlProgram,
    ) -> Result<(WebGlVertexArrayObject, WebGlBuffer), JsValue> {
        let attribute_location = match self.gl.get_attrib_location(program, POSITION_ATTRIBUTE) {
            x if x >= 0 => x as u32,
            _ => return Err(format!("vertex shader does not use {POSITION_ATTRIBUTE}").into()),
        };
        let vao = self
            .gl
            .create_vertex_array()
            .ok_or("failed to create VAO")?;
        self.gl.bind_vertex_array(Some(&vao));
        let buffer = match self.gl.create_buffer() {
            Some(buffer) => buffer,
            None => {
                self.gl.delete_vertex_array(Some(&vao));
                return Err("failed to create buffer".into());
            }
        };
        self.gl
            .bind_buffer(WebGl2RenderingContext::ARRAY_BUFFER, Some(&buffer));
        // Safety: the view into QUAD_VERTICES is dropped before any
        // allocation can move the backing memory.
        unsafe {
            let view = js_sys::Float32Array::view(&QUAD_VERTICES);
            self.gl.buffer_data_with_array_buffer_view(
                WebGl2RenderingContext::ARRAY_BUFFER,
                &view,
                WebGl2RenderingContext::STATIC_DRAW,
            );
        }
        self.gl.enable_vertex_attrib_array(attribute_location);
        self.gl.vertex_attrib_pointer_with_i32(
            attribute_location,
            2,
            WebGl2RenderingContext::FLOAT,
            false,
            0,
            0,
        );
        self.gl.bind_vertex_array(None);
        Ok((vao, buffer))
    }

    /// Applies a new backing-store size to the canvas and the GL viewport.
    ///
    /// The canvas CSS size is set to the displayed size so that the backing
    /// store and the layout stay consistent.
    pub fn apply_size(&self, backing: (u32, u32), css: (f64, f64)) -> Result<(), JsValue> {
        let (w, h) = backing;
        self.canvas.set_width(w);
        self.canvas.set_height(h);
        let style = self.canvas.style();
        style.set_property("width", &format!("{}px", css.0))?;
        style.set_property("height", &format!("{}px", css.1))?;
        self.gl.viewport(0, 0, w as i32, h as i32);
        Ok(())
    }

    /// Clears the frame to opaque black.
    pub fn clear_black(&self) {
        self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
        self.gl.clear(WebGl2RenderingContext::COLOR_BUFFER_BIT);
    }

    /// Binds the program for drawing and uniform updates.
    pub fn use_program(&self, program: &CompiledProgram) {
        self.gl.use_program(Some(&program.program));
    }

    /// Draws the full-screen quad with the given program.
    pub fn draw_quad(&self, program: &CompiledProgram) {
        self.gl.bind_vertex_array(Some(&program.vao));
        self.gl
            .draw_arrays(WebGl2RenderingContext::TRIANGLES, 0, 6);
    }
}
