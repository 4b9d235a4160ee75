//! Tooltip placement.

use crate::primitives::{Rect, Size};

/// Where to put a tooltip of preferred size `pref` inside a root of size
/// `view`, avoiding `avoid` (the hovered block, in root coordinates).
///
/// The tooltip goes one pixel below `avoid`, left-aligned with it. When it is
/// wider than the view, `measure` is asked for sizes at the view's width. It
/// is then pulled back inside the right edge, and flipped above `avoid` when
/// there is no room below.
pub fn place_tooltip(
    avoid: Rect,
    pref: Size,
    view: Size,
    measure: impl FnOnce(f32) -> Size,
) -> Rect {
    let mut bounds = Rect::new(
        avoid.x.max(0.0),
        (avoid.bottom() + 1.0).max(0.0),
        pref.width,
        pref.height,
    );

    if view.width < bounds.width {
        let narrow = measure(view.width);
        if view.width < narrow.width {
            bounds.x = 0.0;
            bounds.width = view.width;
        } else {
            bounds.width = narrow.width;
        }
        bounds.height = narrow.height;
    }

    if view.width < bounds.right() {
        bounds.x = view.width - bounds.width;
    }

    if view.height < bounds.bottom() {
        bounds.y = (avoid.y - (bounds.height + 1.0)).max(0.0);
    }

    bounds
}
