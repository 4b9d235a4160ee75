//! The event loop and native event translation.
//!
//! One native event is handled per turn:
//!
//! 1. `next_event` blocks on the backend
//! 2. the [`Translator`] routes it to the owning window's operations
//! 3. `AppContext::after_event` validates layouts and requests repaints
//!
//! The loop ends when the quit sequence finishes or the display goes away.

use tracing::{debug, error, trace, warn};

use super::backend::{state, ClientData, NativeEvent, NativeEventKind, NativeHandle};
use crate::context::AppContext;
use crate::error::Result;
use crate::event::{KeyInfo, Modifiers};
use crate::primitives::Point;
use crate::window::WindowId;

/// Logical button for a native one: 0 primary, 1 secondary, 2 middle.
pub fn map_button(native: u32) -> u8 {
    match native {
        2 => 2,
        3 => 1,
        _ => 0,
    }
}

/// Native buttons 4 through 7 are wheel clicks.
pub fn is_wheel_button(native: u32) -> bool {
    (4..=7).contains(&native)
}

/// One wheel click as a scroll delta.
pub fn wheel_delta(native: u32) -> Point {
    match native {
        4 => Point::new(0.0, -1.0),
        5 => Point::new(0.0, 1.0),
        6 => Point::new(-1.0, 0.0),
        7 => Point::new(1.0, 0.0),
        _ => Point::ORIGIN,
    }
}

/// Modifier set of a native state mask.
pub fn convert_modifiers(mask: u32) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    if mask & state::LOCK != 0 {
        modifiers |= Modifiers::CAPS_LOCK;
    }
    if mask & state::SHIFT != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if mask & state::CONTROL != 0 {
        modifiers |= Modifiers::CONTROL;
    }
    if mask & state::MOD1 != 0 {
        modifiers |= Modifiers::OPTION;
    }
    if mask & state::MOD4 != 0 {
        modifiers |= Modifiers::COMMAND;
    }
    modifiers
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    window: WindowId,
    button: u8,
}

/// Routes native events to window, block, and application operations.
///
/// Tracks the window where a button went down so that motion and release
/// reach it even when the display reports them against another window.
#[derive(Debug, Default)]
pub struct Translator {
    drag: Option<Drag>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn translate(&mut self, cx: &mut AppContext, event: NativeEvent) {
        match event {
            NativeEvent::Configure { window, frame } => {
                let Some(id) = cx.windows().by_handle(window) else {
                    trace!(?window, "configure for unknown window");
                    return;
                };
                let coalesced = cx
                    .backend_mut()
                    .take_pending(window, NativeEventKind::Configure);
                if !coalesced.is_empty() {
                    trace!(window = %id, count = coalesced.len(), "configure events coalesced");
                }
                let latest = coalesced
                    .into_iter()
                    .filter_map(|event| match event {
                        NativeEvent::Configure { frame, .. } => Some(frame),
                        _ => None,
                    })
                    .last()
                    .unwrap_or(frame);
                cx.window_configured(id, latest);
            }
            NativeEvent::Destroy { window } => cx.window_destroyed(window),
            NativeEvent::ClientMessage { window, data } => self.client_message(cx, window, data),
            other => {
                let Some(id) = cx.windows().by_handle(other.window()) else {
                    debug!(window = ?other.window(), kind = ?other.kind(), "event for unknown window dropped");
                    return;
                };
                self.window_event(cx, id, other);
            }
        }
    }

    fn client_message(&mut self, cx: &mut AppContext, window: NativeHandle, data: ClientData) {
        match data {
            ClientData::Task(task) => cx.run_task(task),
            ClientData::Atom(atom) if atom == cx.close_atom() => {
                if let Some(id) = cx.windows().by_handle(window) {
                    cx.perform_close(id);
                }
            }
            ClientData::Atom(atom) => trace!(?atom, "unhandled client message"),
        }
    }

    fn window_event(&mut self, cx: &mut AppContext, id: WindowId, event: NativeEvent) {
        match event {
            NativeEvent::KeyPress {
                code,
                ch,
                state,
                repeat,
                ..
            } => cx.key_down(id, KeyInfo::new(code, ch, convert_modifiers(state), repeat)),
            NativeEvent::KeyRelease { code, ch, state, .. } => {
                cx.key_up(id, KeyInfo::new(code, ch, convert_modifiers(state), false))
            }
            NativeEvent::ButtonPress {
                button,
                state,
                position,
                ..
            } => {
                let modifiers = convert_modifiers(state);
                if is_wheel_button(button) {
                    cx.mouse_wheel(id, position, wheel_delta(button), modifiers);
                } else {
                    let button = map_button(button);
                    self.drag = Some(Drag { window: id, button });
                    cx.mouse_down(id, position, button, modifiers);
                }
            }
            NativeEvent::ButtonRelease {
                button,
                state,
                position,
                ..
            } => {
                if is_wheel_button(button) {
                    return;
                }
                let modifiers = convert_modifiers(state);
                let (window, position, button) = match self.take_drag(cx) {
                    Some(drag) => (drag.window, translate_point(cx, id, drag.window, position), drag.button),
                    None => (id, position, map_button(button)),
                };
                cx.mouse_up(window, position, button, modifiers);
            }
            NativeEvent::Motion {
                state: mask,
                position,
                ..
            } => {
                let modifiers = convert_modifiers(mask);
                if mask & state::BUTTONS == 0
                    && let Some(drag) = self.drag.take()
                {
                    debug!(window = %drag.window, "motion without buttons ends drag");
                }
                match self.current_drag(cx) {
                    Some(drag) => {
                        let position = translate_point(cx, id, drag.window, position);
                        cx.mouse_dragged(drag.window, position, drag.button, modifiers);
                    }
                    None => cx.mouse_moved(id, position, modifiers),
                }
            }
            NativeEvent::Enter {
                state, position, ..
            } => cx.mouse_entered(id, position, convert_modifiers(state)),
            NativeEvent::Leave {
                state, position, ..
            } => cx.mouse_exited(id, position, convert_modifiers(state)),
            NativeEvent::FocusIn { .. } => cx.app_became_active(),
            NativeEvent::FocusOut { .. } => cx.app_resigned_active(),
            NativeEvent::Expose { window, rect } => {
                let clip = cx
                    .backend_mut()
                    .take_pending(window, NativeEventKind::Expose)
                    .into_iter()
                    .fold(rect, |clip, event| match event {
                        NativeEvent::Expose { rect, .. } => clip.union(&rect),
                        _ => clip,
                    });
                cx.paint_window(id, clip);
            }
            NativeEvent::Configure { .. }
            | NativeEvent::Destroy { .. }
            | NativeEvent::ClientMessage { .. } => {}
        }
    }

    /// The drag in progress, forgotten if its window has closed.
    fn current_drag(&mut self, cx: &AppContext) -> Option<Drag> {
        if let Some(drag) = self.drag
            && !cx.windows().contains(drag.window)
        {
            debug!(window = %drag.window, "drag window closed");
            self.drag = None;
        }
        self.drag
    }

    fn take_drag(&mut self, cx: &AppContext) -> Option<Drag> {
        let drag = self.current_drag(cx);
        self.drag = None;
        drag
    }
}

/// Move a point from one window's coordinates to another's using the cached frames.
fn translate_point(cx: &AppContext, from: WindowId, to: WindowId, point: Point) -> Point {
    if from == to {
        return point;
    }
    match (cx.frame(from), cx.frame(to)) {
        (Some(source), Some(dest)) => point + source.origin() - dest.origin(),
        _ => point,
    }
}

/// Pumps backend events into an [`AppContext`].
#[derive(Debug, Default)]
pub struct EventLoop {
    translator: Translator,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the display and run the startup notifications.
    pub fn start(&mut self, cx: &mut AppContext) -> Result<()> {
        if let Err(e) = cx.open_display() {
            error!(error = %e, "display unavailable");
            return Err(e);
        }
        cx.startup();
        cx.after_event();
        Ok(())
    }

    /// Handle one native event. Returns false once the loop should stop.
    pub fn turn(&mut self, cx: &mut AppContext) -> bool {
        if !cx.is_running() {
            return false;
        }
        let Some(event) = cx.backend_mut().next_event() else {
            warn!("display connection lost");
            cx.connection_lost();
            return false;
        };
        trace!(?event, "native event");
        self.translator.translate(cx, event);
        cx.after_event();
        cx.is_running()
    }

    /// Run until the application quits.
    pub fn run(mut self, cx: &mut AppContext) -> Result<()> {
        self.start(cx)?;
        while self.turn(cx) {}
        debug!("event loop stopped");
        Ok(())
    }
}

/// Run the event loop on the current thread until the application quits.
pub fn run(cx: &mut AppContext) -> Result<()> {
    EventLoop::new().run(cx)
}
