use crate::block::{BlockId, BlockTree};
use crate::layout::Layout;
use crate::primitives::{SizeHint, Sizes};

/// Layout of a window's root block.
///
/// The content block fills the root. Any other child (the tooltip) keeps the
/// bounds it was placed at.
#[derive(Debug, Clone, Copy)]
pub struct RootLayout {
    content: BlockId,
}

impl RootLayout {
    pub fn new(content: BlockId) -> Self {
        Self { content }
    }
}

impl Layout for RootLayout {
    fn compute_sizes(&self, tree: &BlockTree, _block: BlockId, hint: SizeHint) -> Sizes {
        tree.compute_sizes(self.content, hint)
    }

    fn layout(&self, tree: &mut BlockTree, block: BlockId) {
        if let Some(root) = tree.get(block) {
            let bounds = root.local_bounds();
            tree.set_bounds(self.content, bounds);
        }
    }
}
