//! Canvas pointer event wiring.
//!
//! This module connects DOM pointer events on the canvas to the engine's
//! [`PointerTracker`](crate::pointer::PointerTracker). Each event is reduced
//! to plain [`PointerInput`] data using the canvas bounding rect, and the
//! capture requests returned by the tracker are applied through the browser
//! pointer capture API. This is the only place where pointer handling
//! touches the DOM.

use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, PointerEvent};

use crate::pointer::{CaptureRequest, PointerInput, PointerKind, PointerMap, PointerPhase};
use crate::viewer::Engine;

const EVENTS: [(&str, PointerPhase); 5] = [
    ("pointerdown", PointerPhase::Down),
    ("pointermove", PointerPhase::Move),
    ("pointerup", PointerPhase::Up),
    ("pointerleave", PointerPhase::Up),
    ("pointercancel", PointerPhase::Up),
];

/// Pointer event listeners registered on one canvas.
///
/// The closures stay alive as long as this object; [`Interaction::detach`]
/// removes the listeners again on viewer teardown.
pub(crate) struct Interaction {
    canvas: Rc<HtmlCanvasElement>,
    handlers: Vec<(&'static str, Closure<dyn FnMut(PointerEvent)>)>,
}

impl Interaction {
    /// Registers the pointer event handlers on the canvas.
    pub(crate) fn attach(
        canvas: Rc<HtmlCanvasElement>,
        engine: Rc<RefCell<Engine>>,
    ) -> Result<Interaction, JsValue> {
        let mut handlers = Vec::with_capacity(EVENTS.len());
        for (name, phase) in EVENTS {
            let closure = Closure::<dyn FnMut(PointerEvent)>::new({
                let canvas = Rc::clone(&canvas);
                let engine = Rc::clone(&engine);
                move |event: PointerEvent| {
                    if let Err(e) = handle_event(&canvas, &engine, phase, &event) {
                        web_sys::console::error_1(&e);
                    }
                }
            });
            canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
            handlers.push((name, closure));
        }
        Ok(Interaction { canvas, handlers })
    }

    /// Removes the registered event handlers.
    pub(crate) fn detach(&mut self) {
        for (name, closure) in self.handlers.drain(..) {
            if let Err(e) = self
                .canvas
                .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            {
                web_sys::console::error_1(&e);
            }
        }
    }
}

fn handle_event(
    canvas: &HtmlCanvasElement,
    engine: &Rc<RefCell<Engine>>,
    phase: PointerPhase,
    event: &PointerEvent,
) -> Result<(), JsValue> {
    let Ok(kind) = event.pointer_type().parse::<PointerKind>() else {
        return Ok(());
    };
    let rect = canvas.get_bounding_client_rect();
    let input = PointerInput {
        id: event.pointer_id(),
        kind,
        x: f64::from(event.client_x()) - rect.left(),
        y: f64::from(event.client_y()) - rect.top(),
    };
    let map = PointerMap {
        css_size: (rect.width(), rect.height()),
        backing_size: (canvas.width(), canvas.height()),
    };
    let mut engine = engine.borrow_mut();
    let Some(update) = engine.on_pointer(phase, &input, &map) else {
        return Ok(());
    };
    // Forwarded down and drag events must not scroll or zoom the page.
    if matches!(phase, PointerPhase::Down)
        || (matches!(phase, PointerPhase::Move) && engine.has_active_pointer())
    {
        event.prevent_default();
    }
    match update.capture {
        Some(CaptureRequest::Acquire(id)) => canvas.set_pointer_capture(id)?,
        Some(CaptureRequest::Release(id)) => {
            if canvas.has_pointer_capture(id) {
                canvas.release_pointer_capture(id)?;
            }
        }
        None => (),
    }
    Ok(())
}
