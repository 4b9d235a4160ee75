//! Windows
//!
//! A window owns one root block (with a content block inside it), a native
//! handle and drawing surface, and the per-window interaction state: focus,
//! hover, the sticky mouse-down target, click counting, and tooltips.
//!
//! Windows live in the [`WindowRegistry`], the single source of truth for
//! native handle to window lookup. Entries are removed exactly once, when the
//! window is closed.

mod click;
mod root;
mod tooltip;

pub use click::ClickTracker;
pub use root::RootLayout;
pub use tooltip::place_tooltip;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use bitflags::bitflags;

use crate::block::BlockId;
use crate::context::AppContext;
use crate::event::Handlers;
use crate::primitives::{Color, Rect};
use crate::shell::{NativeHandle, SurfaceHandle};

static WINDOW_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    pub fn next() -> Self {
        Self(WINDOW_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Decorations and behaviors requested at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowStyle: u8 {
        const TITLED = 1 << 0;
        const CLOSABLE = 1 << 1;
        const MINIMIZABLE = 1 << 2;
        const RESIZABLE = 1 << 3;
    }
}

impl WindowStyle {
    /// A regular document window.
    pub fn standard() -> Self {
        WindowStyle::all()
    }
}

impl Default for WindowStyle {
    fn default() -> Self {
        Self::standard()
    }
}

/// Mouse cursor shapes the backend is asked to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorIcon {
    #[default]
    Arrow,
    Text,
    Pointer,
    Crosshair,
    HorizontalResize,
    VerticalResize,
    NotAllowed,
}

/// Parameters for `AppContext::new_window`.
#[derive(Debug, Clone)]
pub struct WindowOptions {
    /// Frame in screen coordinates.
    pub frame: Rect,
    pub style: WindowStyle,
    pub title: String,
    pub background: Color,
}

/// A top-level window.
pub struct Window {
    pub(crate) id: WindowId,
    pub(crate) handle: NativeHandle,
    pub(crate) surface: SurfaceHandle,
    pub(crate) style: WindowStyle,
    pub(crate) root: BlockId,
    pub(crate) content: BlockId,
    /// Last frame we set or were told about; native queries lag behind.
    pub(crate) frame: Rect,
    pub(crate) focus: Option<BlockId>,
    pub(crate) hover: Option<BlockId>,
    pub(crate) mouse_down: Option<BlockId>,
    pub(crate) clicks: ClickTracker,
    pub(crate) tooltip: Option<BlockId>,
    pub(crate) tooltip_sequence: u64,
    pub(crate) last_tooltip_shown_at: Option<Instant>,
    pub(crate) ignore_repaint: bool,
    pub(crate) in_live_resize: bool,
    pub(crate) dirty: Option<Rect>,
    pub(crate) cursor: CursorIcon,
    pub(crate) handlers: Handlers<AppContext>,
}

impl Window {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: WindowId,
        handle: NativeHandle,
        surface: SurfaceHandle,
        style: WindowStyle,
        root: BlockId,
        content: BlockId,
        frame: Rect,
        clicks: ClickTracker,
    ) -> Self {
        Self {
            id,
            handle,
            surface,
            style,
            root,
            content,
            frame,
            focus: None,
            hover: None,
            mouse_down: None,
            clicks,
            tooltip: None,
            tooltip_sequence: 0,
            last_tooltip_shown_at: None,
            ignore_repaint: false,
            in_live_resize: false,
            dirty: None,
            cursor: CursorIcon::Arrow,
            handlers: Handlers::new(),
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn surface(&self) -> SurfaceHandle {
        self.surface
    }

    pub fn style(&self) -> WindowStyle {
        self.style
    }

    /// The root block. Holds the content block and, while shown, the tooltip.
    pub fn root(&self) -> BlockId {
        self.root
    }

    /// The block client code fills.
    pub fn content(&self) -> BlockId {
        self.content
    }

    /// Last known frame, in screen coordinates.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn focus(&self) -> Option<BlockId> {
        self.focus
    }

    pub fn hover(&self) -> Option<BlockId> {
        self.hover
    }

    pub fn tooltip(&self) -> Option<BlockId> {
        self.tooltip
    }

    pub fn tooltip_sequence(&self) -> u64 {
        self.tooltip_sequence
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    /// True while the user is interactively resizing the window.
    pub fn in_live_resize(&self) -> bool {
        self.in_live_resize
    }

    pub fn ignore_repaint(&self) -> bool {
        self.ignore_repaint
    }

    pub fn handlers(&self) -> &Handlers<AppContext> {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers<AppContext> {
        &mut self.handlers
    }

    /// Accumulate a dirty region. Dropped while repainting is suspended.
    pub(crate) fn repaint_bounds(&mut self, rect: Rect) {
        if self.ignore_repaint || rect.is_empty() {
            return;
        }
        self.dirty = Some(match self.dirty {
            Some(dirty) => dirty.union(&rect),
            None => rect,
        });
    }

    pub(crate) fn take_dirty(&mut self) -> Option<Rect> {
        self.dirty.take()
    }

    /// Invalidate every pending tooltip callback and return the new sequence.
    pub(crate) fn bump_tooltip_sequence(&mut self) -> u64 {
        self.tooltip_sequence += 1;
        self.tooltip_sequence
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("root", &self.root)
            .field("frame", &self.frame)
            .field("focus", &self.focus)
            .field("tooltip_sequence", &self.tooltip_sequence)
            .finish_non_exhaustive()
    }
}

/// Open windows, keyed by id and by native handle.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    by_id: HashMap<WindowId, Window>,
    by_handle: HashMap<NativeHandle, WindowId>,
    order: Vec<WindowId>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, window: Window) {
        self.by_handle.insert(window.handle, window.id);
        self.order.push(window.id);
        self.by_id.insert(window.id, window);
    }

    /// Remove a window. Returns `None` if it was already gone.
    pub(crate) fn remove(&mut self, id: WindowId) -> Option<Window> {
        let window = self.by_id.remove(&id)?;
        self.by_handle.remove(&window.handle);
        self.order.retain(|w| *w != id);
        Some(window)
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.by_id.get_mut(&id)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Resolve a native handle. `None` for foreign or already-closed windows.
    pub fn by_handle(&self, handle: NativeHandle) -> Option<WindowId> {
        self.by_handle.get(&handle).copied()
    }

    /// Open windows in creation order.
    pub fn ids(&self) -> Vec<WindowId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
