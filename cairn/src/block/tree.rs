//! Arena that owns every block and implements the tree operations.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::{Block, BlockId, Border, Paintable, Sizer};
use crate::graphics::Graphics;
use crate::layout::Layout;
use crate::primitives::{Color, Point, Rect, Size, SizeHint, Sizes};
use crate::window::WindowId;

/// A region of a window that must be redrawn, in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Damage {
    pub window: WindowId,
    pub rect: Rect,
}

/// Owner of all blocks.
///
/// Mutations that affect what is on screen record [`Damage`] for the owning
/// window; the event loop drains it after each native event.
#[derive(Debug, Default)]
pub struct BlockTree {
    blocks: HashMap<BlockId, Block>,
    damage: Vec<Damage>,
}

impl BlockTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a detached block.
    pub fn insert(&mut self, mut block: Block) -> BlockId {
        let id = block.id;
        block.parent = None;
        block.children.clear();
        self.blocks.insert(id, block);
        id
    }

    /// Insert a new default block.
    pub fn create(&mut self) -> BlockId {
        self.insert(Block::new())
    }

    /// Detach a block and drop it with its whole subtree. Unknown ids are a no-op.
    pub fn destroy(&mut self, id: BlockId) -> bool {
        if !self.blocks.contains_key(&id) {
            return false;
        }
        self.remove_from_parent(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(block) = self.blocks.remove(&next) {
                stack.extend(block.children);
            }
        }
        true
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// Mutable access for state that has no repaint or layout side effects,
    /// such as handlers. Use the tree setters for everything else.
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.get(id).and_then(|b| b.parent)
    }

    /// Children of a block, back to front. Empty for unknown ids.
    pub fn children(&self, id: BlockId) -> &[BlockId] {
        self.get(id).map(|b| b.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_of_child(&self, parent: BlockId, child: BlockId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// True if `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: BlockId, id: BlockId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Topmost ancestor of a block (the block itself when detached).
    pub fn root_of(&self, id: BlockId) -> BlockId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Append `child` as the frontmost child of `parent`.
    pub fn add_child(&mut self, parent: BlockId, child: BlockId) -> bool {
        let index = self.children(parent).len();
        self.add_child_at(parent, child, index)
    }

    /// Insert `child` at `index` (clamped) in `parent`'s children.
    ///
    /// The child is detached from its previous parent first. Adding a block to
    /// itself or to one of its descendants, or adding a window root, is refused.
    pub fn add_child_at(&mut self, parent: BlockId, child: BlockId, index: usize) -> bool {
        if parent == child
            || !self.contains(parent)
            || self.get(child).is_none_or(|c| c.window.is_some())
            || self.is_ancestor(child, parent)
        {
            debug!(?parent, ?child, "refusing to add child");
            return false;
        }
        self.remove_from_parent(child);
        let Some(p) = self.blocks.get_mut(&parent) else {
            return false;
        };
        let index = index.min(p.children.len());
        p.children.insert(index, child);
        p.need_layout = true;
        if let Some(c) = self.blocks.get_mut(&child) {
            c.parent = Some(parent);
        }
        self.repaint(child);
        true
    }

    /// Detach a block from its parent. No-op for blocks without a parent.
    pub fn remove_from_parent(&mut self, child: BlockId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        self.repaint(child);
        if let Some(p) = self.blocks.get_mut(&parent) {
            p.children.retain(|c| *c != child);
            p.need_layout = true;
        }
        if let Some(c) = self.blocks.get_mut(&child) {
            c.parent = None;
        }
    }

    /// Detach `child` if it belongs to `parent`.
    pub fn remove_child(&mut self, parent: BlockId, child: BlockId) {
        if self.parent(child) == Some(parent) {
            self.remove_from_parent(child);
        }
    }

    pub fn remove_all_children(&mut self, parent: BlockId) {
        for child in self.children(parent).to_vec() {
            self.remove_from_parent(child);
        }
    }

    /// The block and all of its descendants, in pre-order.
    pub fn descendants(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(block) = self.get(next) else {
                continue;
            };
            out.push(next);
            stack.extend(block.children.iter().rev());
        }
        out
    }

    /// Focusable, enabled blocks under `root`, in tree order.
    pub fn focus_candidates(&self, root: BlockId) -> Vec<BlockId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|b| b.focusable && !b.disabled))
            .collect()
    }

    // =========================================================================
    // Window link
    // =========================================================================

    pub(crate) fn attach_window(&mut self, root: BlockId, window: WindowId) {
        if let Some(block) = self.blocks.get_mut(&root) {
            block.window = Some(window);
        }
    }

    /// The window containing a block: its own link, else its parent's, recursively.
    pub fn window_of(&self, id: BlockId) -> Option<WindowId> {
        let mut current = Some(id);
        while let Some(next) = current {
            let block = self.get(next)?;
            if block.window.is_some() {
                return block.window;
            }
            current = block.parent;
        }
        None
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Move and resize a block.
    ///
    /// Repaints the old and the new footprint when anything changed. A size
    /// change also marks the block as needing layout.
    pub fn set_bounds(&mut self, id: BlockId, bounds: Rect) {
        let Some(block) = self.get(id) else {
            return;
        };
        let old = block.bounds;
        if old == bounds {
            return;
        }
        self.repaint(id);
        if let Some(block) = self.blocks.get_mut(&id) {
            block.bounds = bounds;
            if old.size() != bounds.size() {
                block.need_layout = true;
            }
        }
        self.repaint(id);
    }

    pub fn set_location(&mut self, id: BlockId, location: Point) {
        if let Some(block) = self.get(id) {
            let bounds = Rect::from_origin_size(location, block.size());
            self.set_bounds(id, bounds);
        }
    }

    pub fn set_size(&mut self, id: BlockId, size: Size) {
        if let Some(block) = self.get(id) {
            let bounds = Rect::from_origin_size(block.location(), size);
            self.set_bounds(id, bounds);
        }
    }

    /// Convert a point in the block's local coordinates to window coordinates.
    pub fn to_window(&self, id: BlockId, point: Point) -> Point {
        let mut point = point;
        let mut current = Some(id);
        while let Some(block) = current.and_then(|c| self.get(c)) {
            point += block.location();
            current = block.parent;
        }
        point
    }

    /// Convert a point in window coordinates to the block's local coordinates.
    pub fn from_window(&self, id: BlockId, point: Point) -> Point {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(block) = current.and_then(|c| self.get(c)) {
            chain.push(block.location());
            current = block.parent;
        }
        chain.into_iter().rev().fold(point, |p, origin| p - origin)
    }

    /// The deepest descendant containing `point` (in `id`'s local
    /// coordinates), or `id` itself. Later children are on top.
    pub fn block_at(&self, id: BlockId, point: Point) -> BlockId {
        let mut current = id;
        let mut point = point;
        'descend: while let Some(block) = self.get(current) {
            for child in block.children.iter().rev() {
                if let Some(c) = self.get(*child)
                    && c.bounds.contains(point)
                {
                    point -= c.location();
                    current = *child;
                    continue 'descend;
                }
            }
            break;
        }
        current
    }

    // =========================================================================
    // Appearance and state
    // =========================================================================

    pub fn set_background(&mut self, id: BlockId, color: Color) {
        if let Some(block) = self.blocks.get_mut(&id)
            && block.background != color
        {
            block.background = color;
            self.repaint(id);
        }
    }

    /// Replace the border. Insets may change, so the block needs layout.
    pub fn set_border(&mut self, id: BlockId, border: Option<Rc<dyn Border>>) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.border = border;
            block.need_layout = true;
            self.repaint(id);
        }
    }

    pub fn set_layout(&mut self, id: BlockId, layout: Option<Rc<dyn Layout>>) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.layout = layout;
            block.need_layout = true;
        }
    }

    pub fn set_sizer(&mut self, id: BlockId, sizer: Option<Rc<dyn Sizer>>) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.sizer = sizer;
        }
        if let Some(parent) = self.parent(id) {
            self.mark_need_layout(parent);
        }
    }

    pub fn set_painter(&mut self, id: BlockId, painter: Option<Rc<dyn Paintable>>) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.painter = painter;
            self.repaint(id);
        }
    }

    /// Attach layout data for the parent's layout strategy.
    ///
    /// Opaque data cannot be compared, so this always invalidates layout of
    /// the block and of its parent.
    pub fn set_layout_data<T: Any>(&mut self, id: BlockId, data: Option<T>) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.layout_data = data.map(|d| Box::new(d) as Box<dyn Any>);
            block.need_layout = true;
        }
        if let Some(parent) = self.parent(id) {
            self.mark_need_layout(parent);
        }
    }

    pub fn set_disabled(&mut self, id: BlockId, disabled: bool) {
        if let Some(block) = self.blocks.get_mut(&id)
            && block.disabled != disabled
        {
            block.disabled = disabled;
            self.repaint(id);
        }
    }

    /// Set the raw focus flag. Window focus management goes through
    /// `AppContext::set_focus`, which also dispatches focus events.
    pub fn set_focused(&mut self, id: BlockId, focused: bool) {
        if let Some(block) = self.blocks.get_mut(&id)
            && block.focused != focused
        {
            block.focused = focused;
            self.repaint(id);
        }
    }

    pub fn mark_need_layout(&mut self, id: BlockId) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.need_layout = true;
        }
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Sizes from the layout strategy, else the sizer, else the default.
    pub fn compute_sizes(&self, id: BlockId, hint: SizeHint) -> Sizes {
        let Some(block) = self.get(id) else {
            return Sizes::DEFAULT;
        };
        if let Some(layout) = &block.layout {
            layout.compute_sizes(self, id, hint)
        } else if let Some(sizer) = &block.sizer {
            sizer.sizes(block, hint)
        } else {
            Sizes::DEFAULT
        }
    }

    /// Run pending layouts top-down.
    ///
    /// A block that needs layout and has a strategy is laid out and
    /// repainted. Children are always visited, since a clean parent may still
    /// have dirty children.
    pub fn validate_layout(&mut self, id: BlockId) {
        let Some(block) = self.get(id) else {
            return;
        };
        if block.need_layout {
            if let Some(layout) = block.layout.clone() {
                layout.layout(self, id);
                self.repaint(id);
            }
            if let Some(block) = self.blocks.get_mut(&id) {
                block.need_layout = false;
            }
        }
        for child in self.children(id).to_vec() {
            self.validate_layout(child);
        }
    }

    // =========================================================================
    // Repaint
    // =========================================================================

    /// Request a redraw of the block's whole local bounds.
    pub fn repaint(&mut self, id: BlockId) {
        if let Some(block) = self.get(id) {
            let bounds = block.local_bounds();
            self.repaint_bounds(id, bounds);
        }
    }

    /// Request a redraw of `rect`, in the block's local coordinates.
    ///
    /// The request is clipped to each block on the way up. An empty clip drops
    /// it. Detached trees never produce damage.
    pub fn repaint_bounds(&mut self, id: BlockId, rect: Rect) {
        let mut current = id;
        let mut rect = rect;
        loop {
            let Some(block) = self.get(current) else {
                return;
            };
            let Some(clipped) = rect.intersection(&block.local_bounds()) else {
                return;
            };
            rect = clipped.translate(block.location());
            if let Some(parent) = block.parent {
                current = parent;
            } else {
                if let Some(window) = block.window {
                    self.damage.push(Damage { window, rect });
                }
                return;
            }
        }
    }

    /// Drain the recorded damage.
    pub fn take_damage(&mut self) -> Vec<Damage> {
        std::mem::take(&mut self.damage)
    }

    pub fn has_damage(&self) -> bool {
        !self.damage.is_empty()
    }

    // =========================================================================
    // Painting
    // =========================================================================

    /// Paint a block and its children.
    ///
    /// `dirty` is in the block's local coordinates and `g` must already be
    /// translated into that space. Children untouched by the dirty region are
    /// skipped.
    pub fn paint(&self, id: BlockId, g: &mut dyn Graphics, dirty: Rect) {
        let Some(block) = self.get(id) else {
            return;
        };
        let Some(clip) = dirty.intersection(&block.local_bounds()) else {
            return;
        };

        g.save();
        g.clip_rect(clip);
        if block.background.is_visible() {
            g.fill_rect(clip, block.background);
        }
        if let Some(border) = &block.border {
            border.paint(g, block.local_bounds());
        }
        if let Some(painter) = &block.painter {
            painter.paint(block, g, clip);
        }
        g.restore();

        for child in &block.children {
            let Some(c) = self.get(*child) else {
                continue;
            };
            if let Some(area) = clip.intersection(&c.bounds) {
                let origin = c.location();
                g.save();
                g.translate(origin);
                self.paint(*child, g, area.translate(-origin));
                g.restore();
            }
        }
    }
}
