//! shaderview is a live-reloading WebGL2 fragment shader viewer. It renders a
//! user-editable fragment program over a full-screen quad and keeps the last
//! valid frame on screen when an edit temporarily fails to compile, so a
//! surrounding editor can push source on every change without ever blanking
//! the display.
//!
//! The crate exposes a [`ShaderViewer`] object to JavaScript. The embedding
//! application owns the shader catalog, the text editor, debouncing and error
//! presentation; this crate only renders and reports diagnostics from
//! [`ShaderViewer::load`].

#![warn(missing_docs)]

use std::rc::Rc;
use wasm_bindgen::{JsCast, prelude::*};
use web_sys::{Document, Window};

pub use crate::viewer::ShaderViewer;

mod interaction;
pub mod pointer;
pub mod render;
pub mod version;
pub mod viewer;
pub mod viewport;

/// Initialize the wasm module.
///
/// This function is set to run as soon as the wasm module is instantiated. It
/// sets a panic hook using the [`console_error_panic_hook`] crate, so that
/// panics are reported on the browser console.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    Ok(())
}

/// Creates a viewer on a canvas element and starts its render loop.
///
/// Convenience entry point for JavaScript: looks up the canvas by element id,
/// constructs a [`ShaderViewer`] on it and starts rendering (blank black
/// until the first successful [`ShaderViewer::load`]).
#[wasm_bindgen]
pub fn shaderview_attach(canvas_id: &str) -> Result<ShaderViewer, JsValue> {
    let (_, document) = get_window_and_document()?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or(&format!("unable to get {canvas_id} canvas element"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;
    let viewer = ShaderViewer::new(canvas)?;
    viewer.start();
    Ok(viewer)
}

/// Returns the [`Window`] and [`Document`] objects.
///
/// These are returned inside an [`Rc`] so that their ownership can be shared.
pub fn get_window_and_document() -> Result<(Rc<Window>, Rc<Document>), JsValue> {
    let window = Rc::new(web_sys::window().ok_or("unable to get window")?);
    let document = Rc::new(window.document().ok_or("unable to get document")?);
    Ok((window, document))
}
