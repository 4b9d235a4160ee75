//! Layout
//!
//! A layout strategy is attached to a block and does two things for it:
//! report the block's min/pref/max sizes, and place the block's children.
//!
//! The tree drives it: `BlockTree::compute_sizes` asks the strategy first,
//! and `BlockTree::validate_layout` calls `layout` top-down for every block
//! flagged as needing layout. Strategies read per-child parameters from the
//! child's layout data (for example [`StackData`]).

mod fill;
mod stack;

pub use fill::FillLayout;
pub use stack::{distribute, Axis, StackData, StackLayout};

use crate::block::{BlockId, BlockTree};
use crate::primitives::{SizeHint, Sizes};

/// Pluggable sizing and placement strategy.
pub trait Layout {
    /// Sizes of `block` when laid out by this strategy, insets included.
    fn compute_sizes(&self, tree: &BlockTree, block: BlockId, hint: SizeHint) -> Sizes;

    /// Set the bounds of `block`'s children to fit its current size.
    fn layout(&self, tree: &mut BlockTree, block: BlockId);
}
