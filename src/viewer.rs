//! Shader viewer.
//!
//! This module contains the [`ShaderViewer`], the owner object exported to
//! JavaScript. It drives the per-frame render loop, owns the active program,
//! and exposes the `load`/`setMouse`/`setUniform`/`notifyResize` interface
//! that the surrounding application calls as the user edits shader source.
//!
//! The viewer is an owned instance with an explicit [`ShaderViewer::destroy`]
//! lifecycle; several independent viewers can coexist on one page. All state
//! lives in a single [`Rc<RefCell<Engine>>`] shared between the exported
//! object, the animation frame callback and the pointer event handlers, so
//! everything runs on the one browser scheduling context and no locking is
//! needed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, Performance, Window};

use crate::interaction::Interaction;
use crate::pointer::{PointerInput, PointerMap, PointerPhase, PointerTracker, PointerUpdate};
use crate::render::{CompiledProgram, ProgramSource, RenderContext, UniformCache};
use crate::viewport::{AspectMode, ResizeController};

/// Name of the elapsed time uniform (float seconds).
pub const TIME_UNIFORM: &str = "u_time";
/// Name of the resolution uniform (backing-store pixels).
pub const RESOLUTION_UNIFORM: &str = "u_resolution";
/// Name of the pointer position uniform (backing-store pixels, bottom-left
/// origin).
pub const MOUSE_UNIFORM: &str = "u_mouse";

/// Live-reloading shader viewer bound to one canvas.
///
/// Construct it with a canvas element, call [`start`](ShaderViewer::start),
/// and feed it shader source with [`load`](ShaderViewer::load) as the user
/// edits. A failed reload keeps the previous program on screen; the render
/// loop never stops because of a compile error.
#[wasm_bindgen]
pub struct ShaderViewer {
    engine: Rc<RefCell<Engine>>,
    render_loop: RenderLoop,
    interaction: RefCell<Option<Interaction>>,
}

/// Result of a [`ShaderViewer::load`] call.
#[wasm_bindgen]
pub struct LoadResult {
    success: bool,
    error: Option<String>,
}

#[wasm_bindgen]
impl LoadResult {
    /// Whether the program compiled, linked and became active.
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Native compiler/linker log text on failure.
    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

#[wasm_bindgen]
impl ShaderViewer {
    /// Creates a viewer on the given canvas.
    ///
    /// Fails if a WebGL2 context cannot be obtained. The viewer is created
    /// stopped; call [`start`](ShaderViewer::start) to begin rendering.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement) -> Result<ShaderViewer, JsValue> {
        let canvas = Rc::new(canvas);
        let window = Rc::new(web_sys::window().ok_or("unable to get window")?);
        let performance = window.performance().ok_or("unable to get performance")?;
        let engine = Rc::new(RefCell::new(Engine::new(
            RenderContext::new(Rc::clone(&canvas))?,
            Rc::clone(&window),
            performance,
        )));
        let render_loop = RenderLoop::new(window, Rc::clone(&engine));
        let interaction = Interaction::attach(canvas, Rc::clone(&engine))?;
        Ok(ShaderViewer {
            engine,
            render_loop,
            interaction: RefCell::new(Some(interaction)),
        })
    }

    /// Loads a new fragment program, optionally with a vertex override.
    ///
    /// Runs to completion synchronously. On success the next frame renders
    /// the new program and the previous one is released. On failure the
    /// diagnostic is returned in the result and nothing else changes: the
    /// display keeps showing the output of the last valid program.
    pub fn load(&self, fragment_source: &str, vertex_source: Option<String>) -> LoadResult {
        let source = ProgramSource {
            fragment_shader: fragment_source,
            vertex_shader: vertex_source.as_deref(),
        };
        match self.engine.borrow_mut().load(source) {
            Ok(()) => LoadResult {
                success: true,
                error: None,
            },
            Err(e) => LoadResult {
                success: false,
                error: Some(js_error_text(&e)),
            },
        }
    }

    /// Sets the pointer position uniform directly.
    ///
    /// Coordinates are backing-store pixels with a top-left origin; the y
    /// axis is flipped when stored, matching the convention used for pointer
    /// events.
    #[wasm_bindgen(js_name = setMouse)]
    pub fn set_mouse(&self, x: f64, y: f64) {
        self.engine.borrow_mut().set_mouse(x, y);
    }

    /// Sets a custom float uniform with 1 to 4 components.
    ///
    /// A uniform the shader does not declare is a silent no-op; a component
    /// count outside 1..=4 is an error. Without an active program this does
    /// nothing.
    #[wasm_bindgen(js_name = setUniform)]
    pub fn set_uniform(&self, name: &str, values: Vec<f32>) -> Result<(), JsValue> {
        self.engine.borrow_mut().set_uniform(name, &values)
    }

    /// Notifies the viewer of a new container size.
    ///
    /// The size is given in CSS pixels; `aspect` is `"free"` or `"square"`.
    /// The backing store is resized on the next frame. A zero dimension is
    /// not an error; it defers the resize until a nonzero size is reported.
    #[wasm_bindgen(js_name = notifyResize)]
    pub fn notify_resize(&self, width: f64, height: f64, aspect: &str) -> Result<(), JsValue> {
        let aspect: AspectMode = aspect.parse().map_err(|e: String| JsValue::from(&e))?;
        self.engine.borrow_mut().notify_resize(width, height, aspect);
        Ok(())
    }

    /// Starts the render loop.
    ///
    /// Idempotent: calling while already running schedules nothing further.
    pub fn start(&self) {
        self.render_loop.start();
    }

    /// Stops the render loop, cancelling the pending frame.
    pub fn stop(&self) {
        self.render_loop.stop();
    }

    /// Tears the viewer down.
    ///
    /// Stops the render loop first, so no frame can execute against a freed
    /// program, then releases the GPU resources and unhooks the pointer
    /// event listeners. The viewer must not be used afterwards.
    pub fn destroy(&self) {
        self.render_loop.stop();
        self.engine.borrow_mut().destroy();
        if let Some(mut interaction) = self.interaction.borrow_mut().take() {
            interaction.detach();
        }
    }
}

fn js_error_text(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

/// Engine state shared between the viewer, the frame callback and the
/// pointer handlers.
pub(crate) struct Engine {
    context: RenderContext,
    window: Rc<Window>,
    performance: Performance,
    start_time: f64,
    last_time: f32,
    active: Option<CompiledProgram>,
    next_generation: u64,
    uniforms: UniformCache,
    pointer: PointerTracker,
    viewport: ResizeController,
    mouse: (f32, f32),
}

impl Engine {
    fn new(context: RenderContext, window: Rc<Window>, performance: Performance) -> Engine {
        let viewport = ResizeController::new(window.device_pixel_ratio(), AspectMode::default());
        let start_time = performance.now();
        Engine {
            context,
            window,
            performance,
            start_time,
            last_time: 0.0,
            active: None,
            next_generation: 0,
            uniforms: UniformCache::new(),
            pointer: PointerTracker::new(),
            viewport,
            mouse: (0.0, 0.0),
        }
    }

    /// Renders one frame.
    ///
    /// Applies a pending backing-store resize, then draws the active program
    /// with the standard uniforms, or clears to black if no program has ever
    /// compiled successfully.
    pub(crate) fn frame(&mut self) -> Result<(), JsValue> {
        if let Some(backing) = self.viewport.take_pending() {
            // css_size is always Some when a backing size was computed.
            if let Some(css) = self.viewport.spec().css_size() {
                self.context.apply_size(backing, css)?;
            }
        }
        let time = self.elapsed_seconds();
        let Some(program) = &self.active else {
            self.context.clear_black();
            return Ok(());
        };
        self.context.use_program(program);
        let gl = self.context.gl();
        let canvas = self.context.canvas();
        let resolution = (canvas.width() as f32, canvas.height() as f32);
        let handle = program.program();
        self.uniforms.set(gl, handle, TIME_UNIFORM, time);
        self.uniforms.set(gl, handle, RESOLUTION_UNIFORM, resolution);
        self.uniforms.set(gl, handle, MOUSE_UNIFORM, self.mouse);
        self.context.draw_quad(program);
        Ok(())
    }

    fn elapsed_seconds(&mut self) -> f32 {
        let now = ((self.performance.now() - self.start_time) * 1e-3) as f32;
        self.last_time = monotonic(self.last_time, now);
        self.last_time
    }

    pub(crate) fn load(&mut self, source: ProgramSource<'_>) -> Result<(), JsValue> {
        let generation = self.next_generation;
        let new = self.context.make_program(source, generation)?;
        self.next_generation += 1;
        // The old program stays alive until the new one is installed, then it
        // is released and the uniform cache is rebound to the new generation.
        if let Some(old) = self.active.replace(new) {
            old.delete(self.context.gl());
        }
        self.uniforms.invalidate(generation);
        Ok(())
    }

    pub(crate) fn set_mouse(&mut self, x: f64, y: f64) {
        let height = f64::from(self.context.canvas().height());
        self.mouse = (x as f32, (height - y) as f32);
    }

    pub(crate) fn set_uniform(&mut self, name: &str, values: &[f32]) -> Result<(), JsValue> {
        crate::render::validate_component_count(values.len()).map_err(JsValue::from)?;
        let Some(program) = &self.active else {
            return Ok(());
        };
        self.context.use_program(program);
        self.uniforms
            .set_floats(self.context.gl(), program.program(), name, values)
    }

    pub(crate) fn notify_resize(&mut self, width: f64, height: f64, aspect: AspectMode) {
        self.viewport
            .set_device_pixel_ratio(self.window.device_pixel_ratio());
        self.viewport.set_aspect(aspect);
        self.viewport.set_container_size(width, height);
    }

    /// Feeds one pointer event to the tracker.
    ///
    /// A forwarded position updates the pointer uniform immediately; the
    /// capture request, if any, is returned to the platform layer.
    pub(crate) fn on_pointer(
        &mut self,
        phase: PointerPhase,
        input: &PointerInput,
        map: &PointerMap,
    ) -> Option<PointerUpdate> {
        let update = self.pointer.on_event(phase, input, map)?;
        self.mouse = update.position;
        Some(update)
    }

    pub(crate) fn has_active_pointer(&self) -> bool {
        self.pointer.has_active_pointer()
    }

    fn destroy(&mut self) {
        if let Some(program) = self.active.take() {
            program.delete(self.context.gl());
        }
    }
}

/// Clock values pushed to the time uniform are strictly non-decreasing.
fn monotonic(last: f32, now: f32) -> f32 {
    if now > last { now } else { last }
}

/// Self-rescheduling `requestAnimationFrame` loop.
///
/// At most one frame callback is pending at any time, so repeated `start()`
/// calls cannot create concurrent schedules.
struct RenderLoop {
    window: Rc<Window>,
    state: Rc<LoopState>,
}

struct LoopState {
    // The frame callback. Self-referential through the Rc, so it lives in a
    // RefCell<Option<..>> and is created once, after LoopState exists.
    callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    pending: Cell<Option<i32>>,
}

impl RenderLoop {
    fn new(window: Rc<Window>, engine: Rc<RefCell<Engine>>) -> RenderLoop {
        let state = Rc::new(LoopState {
            callback: RefCell::new(None),
            pending: Cell::new(None),
        });
        let closure = Closure::new({
            let window = Rc::clone(&window);
            let state = Rc::clone(&state);
            move |_dt: f64| {
                state.pending.set(None);
                if let Err(e) = engine.borrow_mut().frame() {
                    web_sys::console::error_1(&e);
                }
                // Schedule ourselves for another requestAnimationFrame
                // callback. Errors in a frame do not stop the loop; only
                // stop() does.
                Self::schedule(&window, &state);
            }
        });
        *state.callback.borrow_mut() = Some(closure);
        RenderLoop { window, state }
    }

    fn schedule(window: &Window, state: &LoopState) {
        let callback = state.callback.borrow();
        if let Some(callback) = callback.as_ref() {
            match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                Ok(id) => state.pending.set(Some(id)),
                Err(e) => web_sys::console::error_1(&e),
            }
        }
    }

    fn start(&self) {
        if self.state.pending.get().is_some() {
            return;
        }
        Self::schedule(&self.window, &self.state);
    }

    fn stop(&self) {
        if let Some(id) = self.state.pending.take() {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                web_sys::console::error_1(&e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn time_never_decreases() {
        let mut t = 0.0;
        for (now, expected) in [(0.5, 0.5), (1.25, 1.25), (1.0, 1.25), (2.0, 2.0)] {
            t = monotonic(t, now);
            assert_eq!(t, expected);
        }
    }
}
