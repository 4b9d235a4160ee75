//! Optional per-block capabilities.
//!
//! Each trait covers one overridable concern. A block carries at most one
//! object per capability; when absent, the tree falls back to its default.

use super::{Block, BlockId, BlockTree};
use crate::context::AppContext;
use crate::event::Event;
use crate::graphics::Graphics;
use crate::primitives::{Color, Insets, Point, Rect, SizeHint, Sizes};

/// Custom drawing, invoked after the background and border are painted.
///
/// `dirty` is in the block's local coordinates and already clipped to its
/// local bounds.
pub trait Paintable {
    fn paint(&self, block: &Block, g: &mut dyn Graphics, dirty: Rect);
}

/// Sizing for blocks that have no layout strategy.
pub trait Sizer {
    fn sizes(&self, block: &Block, hint: SizeHint) -> Sizes;
}

/// A border owns the block's insets and paints inside them.
pub trait Border {
    fn insets(&self) -> Insets;

    /// Paint the border. `bounds` is the block's local bounds.
    fn paint(&self, g: &mut dyn Graphics, bounds: Rect);
}

/// Produces a tooltip block for a point within a block.
pub trait TooltipSource {
    /// Build the tooltip in `tree` and return its id. `at` is in the block's
    /// local coordinates. Returning `None` shows nothing.
    fn tooltip(&self, tree: &mut BlockTree, block: BlockId, at: Point) -> Option<BlockId>;
}

/// First look at pointer events aimed at a block, before its handlers.
///
/// Finishing the event stops handler dispatch and cascading.
pub trait PointerTarget {
    fn pointer_event(&self, cx: &mut AppContext, block: BlockId, event: &mut Event);
}

impl<F> Paintable for F
where
    F: Fn(&Block, &mut dyn Graphics, Rect),
{
    fn paint(&self, block: &Block, g: &mut dyn Graphics, dirty: Rect) {
        self(block, g, dirty)
    }
}

impl<F> Sizer for F
where
    F: Fn(&Block, SizeHint) -> Sizes,
{
    fn sizes(&self, block: &Block, hint: SizeHint) -> Sizes {
        self(block, hint)
    }
}

/// A solid border of uniform color filling the inset area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineBorder {
    pub color: Color,
    pub insets: Insets,
}

impl LineBorder {
    pub fn new(color: Color, insets: Insets) -> Self {
        Self { color, insets }
    }
}

impl Border for LineBorder {
    fn insets(&self) -> Insets {
        self.insets
    }

    fn paint(&self, g: &mut dyn Graphics, bounds: Rect) {
        let i = self.insets;
        let inner_height = (bounds.height - (i.top + i.bottom)).max(0.0);
        let strips = [
            Rect::new(bounds.x, bounds.y, bounds.width, i.top),
            Rect::new(bounds.x, bounds.bottom() - i.bottom, bounds.width, i.bottom),
            Rect::new(bounds.x, bounds.y + i.top, i.left, inner_height),
            Rect::new(bounds.right() - i.right, bounds.y + i.top, i.right, inner_height),
        ];
        for strip in strips {
            if !strip.is_empty() {
                g.fill_rect(strip, self.color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{DrawOp, RecordingGraphics};

    #[test]
    fn line_border_fills_only_nonempty_strips() {
        let border = LineBorder::new(Color::BLACK, Insets::new(1.0, 0.0, 1.0, 0.0));
        let mut g = RecordingGraphics::new();
        border.paint(&mut g, Rect::new(0.0, 0.0, 10.0, 10.0));

        let fills: Vec<Rect> = g
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(
            fills,
            vec![Rect::new(0.0, 0.0, 10.0, 1.0), Rect::new(0.0, 9.0, 10.0, 1.0)]
        );
    }
}
