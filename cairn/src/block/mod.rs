//! Block Tree
//!
//! A block is a rectangular node in the retained UI tree: the unit of layout,
//! painting, and hit-testing.
//!
//! # Ownership
//!
//! All blocks live in a [`BlockTree`] arena keyed by [`BlockId`]. A parent
//! owns the ordered list of its children's ids; the `parent` and `window`
//! links are plain ids used for upward propagation and lookup, never for
//! lifetime. Children are back-to-front in paint order: the last child is
//! painted last and is hit first.
//!
//! # Coordinates
//!
//! `bounds` is always relative to the immediate parent. Local coordinates put
//! the block's own top-left corner at the origin.
//!
//! # Capabilities
//!
//! Behavior that widgets override is attached as optional capability objects
//! ([`Paintable`], [`Sizer`], [`Border`], [`TooltipSource`], [`PointerTarget`]).
//! The tree invokes a capability when present and falls back to defaults otherwise.

mod capability;
mod tree;

pub use capability::{Border, LineBorder, Paintable, PointerTarget, Sizer, TooltipSource};
pub use tree::{BlockTree, Damage};

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::AppContext;
use crate::event::Handlers;
use crate::layout::Layout;
use crate::primitives::{Color, Insets, Point, Rect, Size};
use crate::window::WindowId;

static BLOCK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a block, assigned monotonically at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
    /// Allocate the next id.
    pub fn next() -> Self {
        Self(BLOCK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create an id from an existing value.
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// A node in the block tree.
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) bounds: Rect,
    pub(crate) background: Color,
    pub(crate) border: Option<Rc<dyn Border>>,
    pub(crate) layout: Option<Rc<dyn Layout>>,
    pub(crate) sizer: Option<Rc<dyn Sizer>>,
    pub(crate) painter: Option<Rc<dyn Paintable>>,
    pub(crate) tooltip: Option<Rc<dyn TooltipSource>>,
    pub(crate) pointer: Option<Rc<dyn PointerTarget>>,
    pub(crate) children: Vec<BlockId>,
    pub(crate) parent: Option<BlockId>,
    pub(crate) window: Option<WindowId>,
    pub(crate) layout_data: Option<Box<dyn Any>>,
    pub(crate) handlers: Handlers<AppContext>,
    pub(crate) need_layout: bool,
    pub(crate) focused: bool,
    pub(crate) focusable: bool,
    pub(crate) disabled: bool,
}

impl Block {
    /// Create a new, empty, detached block.
    pub fn new() -> Self {
        Self {
            id: BlockId::next(),
            bounds: Rect::ZERO,
            background: Color::TRANSPARENT,
            border: None,
            layout: None,
            sizer: None,
            painter: None,
            tooltip: None,
            pointer: None,
            children: Vec::new(),
            parent: None,
            window: None,
            layout_data: None,
            handlers: Handlers::new(),
            need_layout: false,
            focused: false,
            focusable: false,
            disabled: false,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self.need_layout = true;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_border(mut self, border: impl Border + 'static) -> Self {
        self.border = Some(Rc::new(border));
        self
    }

    pub fn with_layout(mut self, layout: impl Layout + 'static) -> Self {
        self.layout = Some(Rc::new(layout));
        self.need_layout = true;
        self
    }

    pub fn with_sizer(mut self, sizer: impl Sizer + 'static) -> Self {
        self.sizer = Some(Rc::new(sizer));
        self
    }

    pub fn with_painter(mut self, painter: impl Paintable + 'static) -> Self {
        self.painter = Some(Rc::new(painter));
        self
    }

    pub fn with_tooltip(mut self, source: impl TooltipSource + 'static) -> Self {
        self.tooltip = Some(Rc::new(source));
        self
    }

    pub fn with_pointer(mut self, target: impl PointerTarget + 'static) -> Self {
        self.pointer = Some(Rc::new(target));
        self
    }

    pub fn with_layout_data<T: Any>(mut self, data: T) -> Self {
        self.layout_data = Some(Box::new(data));
        self
    }

    pub fn focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Location and size in the parent's coordinate system.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Location in the parent's coordinate system.
    pub fn location(&self) -> Point {
        self.bounds.origin()
    }

    pub fn size(&self) -> Size {
        self.bounds.size()
    }

    /// Location and size in local coordinates.
    pub fn local_bounds(&self) -> Rect {
        self.bounds.local()
    }

    /// Margins determined by the border, if any.
    pub fn insets(&self) -> Insets {
        self.border.as_ref().map(|b| b.insets()).unwrap_or_default()
    }

    /// Local bounds after applying the insets.
    pub fn local_inset_bounds(&self) -> Rect {
        self.local_bounds().inset(self.insets())
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// True if this block's background is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.background.is_opaque()
    }

    /// Children, back to front.
    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    /// The window this block is the root of, if any. See `BlockTree::window_of`
    /// for the window containing an arbitrary block.
    pub fn root_of_window(&self) -> Option<WindowId> {
        self.window
    }

    /// Layout data attached by the parent's layout strategy.
    pub fn layout_data<T: Any>(&self) -> Option<&T> {
        self.layout_data.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn has_layout(&self) -> bool {
        self.layout.is_some()
    }

    pub fn needs_layout(&self) -> bool {
        self.need_layout
    }

    /// True if this block has the keyboard focus. Disabled blocks never do.
    pub fn focused(&self) -> bool {
        self.focused && !self.disabled
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    pub fn enabled(&self) -> bool {
        !self.disabled
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn has_tooltip(&self) -> bool {
        self.tooltip.is_some()
    }

    pub fn handlers(&self) -> &Handlers<AppContext> {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers<AppContext> {
        &mut self.handlers
    }

    /// Replace the tooltip source. Takes effect on the next hover.
    pub fn set_tooltip(&mut self, source: Option<Rc<dyn TooltipSource>>) {
        self.tooltip = source;
    }

    /// Replace the pointer capability.
    pub fn set_pointer(&mut self, target: Option<Rc<dyn PointerTarget>>) {
        self.pointer = target;
    }

    pub fn set_focusable(&mut self, focusable: bool) {
        self.focusable = focusable;
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("bounds", &self.bounds)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("window", &self.window)
            .field("need_layout", &self.need_layout)
            .field("focused", &self.focused)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}
