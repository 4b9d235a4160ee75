//! Event Model
//!
//! Every event carries:
//! - The originating `Target`
//! - A `cascade` property: whether an unfinished event walks up the target's
//!   parent chain after the target's own handlers ran
//! - A mutable `finished` status; `finish()` is the only way to stop an
//!   otherwise-cascading event early
//! - For key events only, a `discarded` status: discarding implies finishing,
//!   and additionally tells upstream consumers to roll back speculative effects
//!
//! Painting is not an event. It flows through the `Paintable` capability of a
//! block, see `block::Paintable`.

mod dispatch;
mod input;

pub use dispatch::{dispatch, Cascade, Handler, Handlers, Target};
pub use input::{keys, KeyInfo, Modifiers, MouseInfo};

use std::fmt;

use crate::app::QuitResponse;
use crate::primitives::Point;

/// Discriminant used to register and look up handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyDown,
    KeyUp,
    MouseDown,
    MouseDragged,
    MouseUp,
    MouseEntered,
    MouseMoved,
    MouseExited,
    MouseWheel,
    FocusGained,
    FocusLost,
    Selection,
    Validate,
    Closing,
    WindowResized,
    WindowClosed,
    AppWillFinishStartup,
    AppDidFinishStartup,
    AppWillBecomeActive,
    AppDidBecomeActive,
    AppWillResignActive,
    AppDidResignActive,
    AppWillQuit,
    QuitRequested,
    LastWindowClosed,
}

impl EventKind {
    /// Whether events of this kind walk the parent chain when unfinished.
    pub fn cascades(self) -> bool {
        matches!(
            self,
            EventKind::KeyDown
                | EventKind::KeyUp
                | EventKind::MouseDown
                | EventKind::MouseDragged
                | EventKind::MouseUp
                | EventKind::MouseWheel
                | EventKind::Selection
                | EventKind::Validate
        )
    }

    /// True for key down/up.
    pub fn is_key(self) -> bool {
        matches!(self, EventKind::KeyDown | EventKind::KeyUp)
    }

    /// True for all pointer events, including the wheel.
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            EventKind::MouseDown
                | EventKind::MouseDragged
                | EventKind::MouseUp
                | EventKind::MouseEntered
                | EventKind::MouseMoved
                | EventKind::MouseExited
                | EventKind::MouseWheel
        )
    }
}

/// Kind-specific data carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    KeyDown(KeyInfo),
    KeyUp(KeyInfo),
    MouseDown(MouseInfo),
    MouseDragged(MouseInfo),
    MouseUp(MouseInfo),
    MouseEntered(MouseInfo),
    MouseMoved(MouseInfo),
    MouseExited(MouseInfo),
    MouseWheel { info: MouseInfo, delta: Point },
    FocusGained,
    FocusLost,
    Selection,
    /// `invalid` is set by consumers that cannot satisfy a precondition.
    Validate { invalid: bool },
    /// `aborted` is set by handlers that veto the close.
    Closing { aborted: bool },
    WindowResized,
    WindowClosed,
    AppWillFinishStartup,
    AppDidFinishStartup,
    AppWillBecomeActive,
    AppDidBecomeActive,
    AppWillResignActive,
    AppDidResignActive,
    AppWillQuit,
    QuitRequested { response: QuitResponse },
    /// `quit` starts from the configured policy; handlers may override it.
    LastWindowClosed { quit: bool },
}

impl Payload {
    pub fn kind(&self) -> EventKind {
        match self {
            Payload::KeyDown(_) => EventKind::KeyDown,
            Payload::KeyUp(_) => EventKind::KeyUp,
            Payload::MouseDown(_) => EventKind::MouseDown,
            Payload::MouseDragged(_) => EventKind::MouseDragged,
            Payload::MouseUp(_) => EventKind::MouseUp,
            Payload::MouseEntered(_) => EventKind::MouseEntered,
            Payload::MouseMoved(_) => EventKind::MouseMoved,
            Payload::MouseExited(_) => EventKind::MouseExited,
            Payload::MouseWheel { .. } => EventKind::MouseWheel,
            Payload::FocusGained => EventKind::FocusGained,
            Payload::FocusLost => EventKind::FocusLost,
            Payload::Selection => EventKind::Selection,
            Payload::Validate { .. } => EventKind::Validate,
            Payload::Closing { .. } => EventKind::Closing,
            Payload::WindowResized => EventKind::WindowResized,
            Payload::WindowClosed => EventKind::WindowClosed,
            Payload::AppWillFinishStartup => EventKind::AppWillFinishStartup,
            Payload::AppDidFinishStartup => EventKind::AppDidFinishStartup,
            Payload::AppWillBecomeActive => EventKind::AppWillBecomeActive,
            Payload::AppDidBecomeActive => EventKind::AppDidBecomeActive,
            Payload::AppWillResignActive => EventKind::AppWillResignActive,
            Payload::AppDidResignActive => EventKind::AppDidResignActive,
            Payload::AppWillQuit => EventKind::AppWillQuit,
            Payload::QuitRequested { .. } => EventKind::QuitRequested,
            Payload::LastWindowClosed { .. } => EventKind::LastWindowClosed,
        }
    }
}

/// An event routed through the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    target: Target,
    payload: Payload,
    finished: bool,
    discarded: bool,
}

impl Event {
    pub fn new(target: Target, payload: Payload) -> Self {
        Self {
            target,
            payload,
            finished: false,
            discarded: false,
        }
    }

    pub fn key_down(target: Target, key: KeyInfo) -> Self {
        Self::new(target, Payload::KeyDown(key))
    }

    pub fn key_up(target: Target, key: KeyInfo) -> Self {
        Self::new(target, Payload::KeyUp(key))
    }

    pub fn validate(target: Target) -> Self {
        Self::new(target, Payload::Validate { invalid: false })
    }

    pub fn closing(target: Target) -> Self {
        Self::new(target, Payload::Closing { aborted: false })
    }

    /// The original target of the event.
    pub fn target(&self) -> Target {
        self.target
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// True if this event should be passed to its target's parent when not finished.
    pub fn cascade(&self) -> bool {
        self.kind().cascades()
    }

    /// True if this event has been handled and should no longer be processed.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Mark this event as handled. Idempotent.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// True if this key event should be treated as if it never happened.
    pub fn discarded(&self) -> bool {
        self.discarded
    }

    /// Throw this event away. Implies `finish()`.
    ///
    /// Only key events record the discard; for every other kind this is `finish()`.
    pub fn discard(&mut self) {
        if self.kind().is_key() {
            self.discarded = true;
        }
        self.finished = true;
    }

    /// Key data for key events.
    pub fn key(&self) -> Option<&KeyInfo> {
        match &self.payload {
            Payload::KeyDown(key) | Payload::KeyUp(key) => Some(key),
            _ => None,
        }
    }

    /// Pointer data for mouse and wheel events.
    pub fn mouse(&self) -> Option<&MouseInfo> {
        match &self.payload {
            Payload::MouseDown(info)
            | Payload::MouseDragged(info)
            | Payload::MouseUp(info)
            | Payload::MouseEntered(info)
            | Payload::MouseMoved(info)
            | Payload::MouseExited(info)
            | Payload::MouseWheel { info, .. } => Some(info),
            _ => None,
        }
    }

    /// Scroll delta for wheel events.
    pub fn wheel_delta(&self) -> Option<Point> {
        match &self.payload {
            Payload::MouseWheel { delta, .. } => Some(*delta),
            _ => None,
        }
    }

    /// Mark a validate event as failing its precondition.
    ///
    /// Does not finish the event: every interested ancestor still sees it.
    pub fn mark_invalid(&mut self) {
        if let Payload::Validate { invalid } = &mut self.payload {
            *invalid = true;
        }
    }

    /// For validate events, true unless some consumer marked it invalid.
    pub fn is_valid(&self) -> bool {
        !matches!(self.payload, Payload::Validate { invalid: true })
    }

    /// Veto a window close.
    pub fn abort_close(&mut self) {
        if let Payload::Closing { aborted } = &mut self.payload {
            *aborted = true;
        }
    }

    /// True if a closing event was vetoed.
    pub fn close_aborted(&self) -> bool {
        matches!(self.payload, Payload::Closing { aborted: true })
    }

    /// Answer a quit request.
    pub fn set_quit_response(&mut self, value: QuitResponse) {
        if let Payload::QuitRequested { response } = &mut self.payload {
            *response = value;
        }
    }

    /// The current answer of a quit request, `None` for other kinds.
    pub fn quit_response(&self) -> Option<QuitResponse> {
        match self.payload {
            Payload::QuitRequested { response } => Some(response),
            _ => None,
        }
    }

    /// Decide whether closing the last window quits the application.
    pub fn set_quit_after_last_window(&mut self, value: bool) {
        if let Payload::LastWindowClosed { quit } = &mut self.payload {
            *quit = value;
        }
    }

    /// The current last-window decision, `None` for other kinds.
    pub fn quit_after_last_window(&self) -> Option<bool> {
        match self.payload {
            Payload::LastWindowClosed { quit } => Some(quit),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[", self.kind())?;
        if self.discarded {
            f.write_str("Discarded, ")?;
        }
        match &self.payload {
            Payload::KeyDown(key) | Payload::KeyUp(key) => {
                write!(f, "Code: {}", key.code)?;
                if let Some(ch) = key.ch {
                    write!(f, ", Rune: {} ({ch:?})", ch as u32)?;
                }
                if !key.modifiers.is_empty() {
                    write!(f, ", {}", key.modifiers)?;
                }
                if key.repeat {
                    f.write_str(", Auto-Repeat")?;
                }
                f.write_str(", ")?;
            }
            Payload::MouseWheel { info, delta } => {
                write!(
                    f,
                    "Where: ({}, {}), Delta: ({}, {}), ",
                    info.position.x, info.position.y, delta.x, delta.y
                )?;
            }
            Payload::MouseDown(info)
            | Payload::MouseDragged(info)
            | Payload::MouseUp(info)
            | Payload::MouseEntered(info)
            | Payload::MouseMoved(info)
            | Payload::MouseExited(info) => {
                write!(f, "Where: ({}, {}), ", info.position.x, info.position.y)?;
                if info.click_count > 0 {
                    write!(f, "Button: {}, Clicks: {}, ", info.button, info.click_count)?;
                }
            }
            Payload::Validate { invalid: true } => f.write_str("Invalid, ")?,
            Payload::Closing { aborted: true } => f.write_str("Aborted, ")?,
            Payload::QuitRequested { response } => write!(f, "Response: {response:?}, ")?,
            Payload::LastWindowClosed { quit } => write!(f, "Quit: {quit}, ")?,
            _ => {}
        }
        write!(f, "Target: {}", self.target)?;
        if self.finished {
            f.write_str(", Finished")?;
        }
        f.write_str("]")
    }
}
