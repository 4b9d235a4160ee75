//! The contract a native windowing backend implements.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::Result;
use crate::graphics::Graphics;
use crate::primitives::{Point, Rect, Size};
use crate::window::{CursorIcon, WindowStyle};

/// Opaque native window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    /// Handle used for messages not aimed at any window.
    pub const NONE: Self = Self(0);
}

/// Opaque native drawing surface handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

/// A registered client-message token, compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom(pub u64);

static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies a deferred callback while its message is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn next() -> Self {
        Self(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// Payload of a client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientData {
    /// A protocol token, such as the window manager's close request.
    Atom(Atom),
    /// A deferred callback to run on the loop thread.
    Task(TaskId),
}

/// Modifier bits of a native state mask.
pub mod state {
    pub const SHIFT: u32 = 1 << 0;
    pub const LOCK: u32 = 1 << 1;
    pub const CONTROL: u32 = 1 << 2;
    pub const MOD1: u32 = 1 << 3;
    pub const MOD2: u32 = 1 << 4;
    pub const MOD3: u32 = 1 << 5;
    pub const MOD4: u32 = 1 << 6;
    pub const MOD5: u32 = 1 << 7;
    pub const BUTTON1: u32 = 1 << 8;
    pub const BUTTON2: u32 = 1 << 9;
    pub const BUTTON3: u32 = 1 << 10;
    pub const BUTTON4: u32 = 1 << 11;
    pub const BUTTON5: u32 = 1 << 12;
    /// Any pointer button held.
    pub const BUTTONS: u32 = BUTTON1 | BUTTON2 | BUTTON3 | BUTTON4 | BUTTON5;
}

/// Native events, as delivered by the display connection.
///
/// Positions are in the coordinates of the event's window. Buttons use native
/// numbering (1 primary, 2 middle, 3 secondary, 4..=7 wheel).
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    KeyPress {
        window: NativeHandle,
        code: u32,
        ch: Option<char>,
        state: u32,
        repeat: bool,
    },
    KeyRelease {
        window: NativeHandle,
        code: u32,
        ch: Option<char>,
        state: u32,
    },
    ButtonPress {
        window: NativeHandle,
        button: u32,
        state: u32,
        position: Point,
    },
    ButtonRelease {
        window: NativeHandle,
        button: u32,
        state: u32,
        position: Point,
    },
    Motion {
        window: NativeHandle,
        state: u32,
        position: Point,
    },
    Enter {
        window: NativeHandle,
        state: u32,
        position: Point,
    },
    Leave {
        window: NativeHandle,
        state: u32,
        position: Point,
    },
    FocusIn {
        window: NativeHandle,
    },
    FocusOut {
        window: NativeHandle,
    },
    Expose {
        window: NativeHandle,
        rect: Rect,
    },
    Configure {
        window: NativeHandle,
        frame: Rect,
    },
    Destroy {
        window: NativeHandle,
    },
    ClientMessage {
        window: NativeHandle,
        data: ClientData,
    },
}

/// Discriminant of a [`NativeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeEventKind {
    KeyPress,
    KeyRelease,
    ButtonPress,
    ButtonRelease,
    Motion,
    Enter,
    Leave,
    FocusIn,
    FocusOut,
    Expose,
    Configure,
    Destroy,
    ClientMessage,
}

impl NativeEvent {
    pub fn window(&self) -> NativeHandle {
        match self {
            NativeEvent::KeyPress { window, .. }
            | NativeEvent::KeyRelease { window, .. }
            | NativeEvent::ButtonPress { window, .. }
            | NativeEvent::ButtonRelease { window, .. }
            | NativeEvent::Motion { window, .. }
            | NativeEvent::Enter { window, .. }
            | NativeEvent::Leave { window, .. }
            | NativeEvent::FocusIn { window }
            | NativeEvent::FocusOut { window }
            | NativeEvent::Expose { window, .. }
            | NativeEvent::Configure { window, .. }
            | NativeEvent::Destroy { window }
            | NativeEvent::ClientMessage { window, .. } => *window,
        }
    }

    pub fn kind(&self) -> NativeEventKind {
        match self {
            NativeEvent::KeyPress { .. } => NativeEventKind::KeyPress,
            NativeEvent::KeyRelease { .. } => NativeEventKind::KeyRelease,
            NativeEvent::ButtonPress { .. } => NativeEventKind::ButtonPress,
            NativeEvent::ButtonRelease { .. } => NativeEventKind::ButtonRelease,
            NativeEvent::Motion { .. } => NativeEventKind::Motion,
            NativeEvent::Enter { .. } => NativeEventKind::Enter,
            NativeEvent::Leave { .. } => NativeEventKind::Leave,
            NativeEvent::FocusIn { .. } => NativeEventKind::FocusIn,
            NativeEvent::FocusOut { .. } => NativeEventKind::FocusOut,
            NativeEvent::Expose { .. } => NativeEventKind::Expose,
            NativeEvent::Configure { .. } => NativeEventKind::Configure,
            NativeEvent::Destroy { .. } => NativeEventKind::Destroy,
            NativeEvent::ClientMessage { .. } => NativeEventKind::ClientMessage,
        }
    }
}

/// A native windowing backend.
///
/// Every method is called from the loop thread. Features a platform lacks
/// degrade to no-ops; the provided defaults are those no-ops.
pub trait Backend {
    /// Open the display connection. Failure is fatal to the application.
    fn open(&mut self) -> Result<()>;

    /// Release the display connection.
    fn close(&mut self);

    /// Token carried by the window manager's close request.
    fn close_atom(&self) -> Atom;

    /// Block until the next native event. `None` means the connection is gone.
    fn next_event(&mut self) -> Option<NativeEvent>;

    /// Remove and return already-queued events of `kind` for `window`.
    fn take_pending(&mut self, window: NativeHandle, kind: NativeEventKind) -> Vec<NativeEvent>;

    fn create_window(
        &mut self,
        frame: Rect,
        style: WindowStyle,
    ) -> Result<(NativeHandle, SurfaceHandle)>;

    /// Release a window and its surface. The display later reports `Destroy`.
    fn destroy_window(&mut self, window: NativeHandle, surface: SurfaceHandle);

    fn title(&self, window: NativeHandle) -> String;

    fn set_title(&mut self, window: NativeHandle, title: &str);

    /// Live frame query. Callers prefer their cached frame.
    fn frame(&self, window: NativeHandle) -> Option<Rect>;

    fn set_frame(&mut self, window: NativeHandle, frame: Rect);

    /// Map the window on first use, raise it afterwards.
    fn to_front(&mut self, window: NativeHandle);

    fn minimize(&mut self, window: NativeHandle);

    /// Post a damage event for `rect` back through the event queue.
    fn request_repaint(&mut self, window: NativeHandle, rect: Rect);

    /// Graphics for one paint pass over `clip`.
    fn begin_paint(
        &mut self,
        window: NativeHandle,
        surface: SurfaceHandle,
        clip: Rect,
    ) -> &mut dyn Graphics;

    /// Push pending drawing to the screen.
    fn flush(&mut self, window: NativeHandle);

    fn resize_surface(&mut self, surface: SurfaceHandle, size: Size);

    /// Post `ClientData::Task(task)` back to the loop, after `delay` if given.
    fn invoke_after(&mut self, window: Option<NativeHandle>, task: TaskId, delay: Option<Duration>);

    fn set_cursor(&mut self, _window: NativeHandle, _cursor: CursorIcon) {}

    /// Native tooltip text. Most backends have none.
    fn set_tooltip(&mut self, _window: NativeHandle, _text: Option<&str>) {}

    fn scaling_factor(&self, _window: NativeHandle) -> f32 {
        1.0
    }

    /// The window holding keyboard input, if known.
    fn key_window(&self) -> Option<NativeHandle> {
        None
    }

    fn app_name(&self) -> Option<String> {
        None
    }
}
