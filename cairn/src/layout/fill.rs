use super::Layout;
use crate::block::{BlockId, BlockTree};
use crate::primitives::{Size, SizeHint, Sizes};

/// Every child covers the parent's inset bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillLayout;

impl Layout for FillLayout {
    fn compute_sizes(&self, tree: &BlockTree, block: BlockId, hint: SizeHint) -> Sizes {
        let Some(parent) = tree.get(block) else {
            return Sizes::DEFAULT;
        };
        let insets = parent.insets();
        let inner_hint = SizeHint {
            width: hint.width.map(|w| (w - insets.left - insets.right).max(0.0)),
            height: hint.height.map(|h| (h - insets.top - insets.bottom).max(0.0)),
        };

        let mut sizes = Sizes::new(Size::ZERO, Size::ZERO, Size::UNBOUNDED);
        let mut any = false;
        for child in tree.children(block) {
            let child_sizes = tree.compute_sizes(*child, inner_hint);
            sizes.min = sizes.min.max(child_sizes.min);
            sizes.pref = sizes.pref.max(child_sizes.pref);
            if any {
                sizes.max = sizes.max.max(child_sizes.max);
            } else {
                sizes.max = child_sizes.max;
                any = true;
            }
        }
        sizes.max = sizes.max.max(sizes.pref);
        sizes.grow(insets)
    }

    fn layout(&self, tree: &mut BlockTree, block: BlockId) {
        let Some(parent) = tree.get(block) else {
            return;
        };
        let area = parent.local_inset_bounds();
        for child in tree.children(block).to_vec() {
            tree.set_bounds(child, area);
        }
    }
}
