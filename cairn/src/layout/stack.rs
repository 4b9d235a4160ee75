use super::Layout;
use crate::block::{BlockId, BlockTree};
use crate::primitives::{Point, Rect, Size, SizeHint, Sizes};

/// Main axis of a [`StackLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}

impl Axis {
    fn main(self, size: Size) -> f32 {
        match self {
            Axis::Vertical => size.height,
            Axis::Horizontal => size.width,
        }
    }

    fn cross(self, size: Size) -> f32 {
        match self {
            Axis::Vertical => size.width,
            Axis::Horizontal => size.height,
        }
    }

    fn size(self, main: f32, cross: f32) -> Size {
        match self {
            Axis::Vertical => Size::new(cross, main),
            Axis::Horizontal => Size::new(main, cross),
        }
    }
}

/// Per-child layout data for a [`StackLayout`] parent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StackData {
    /// Share of the leftover main-axis space. Zero keeps the preferred size.
    pub grow: f32,
}

impl StackData {
    pub fn grow(grow: f32) -> Self {
        Self { grow }
    }
}

/// Split `available` main-axis space between children.
///
/// Each input is `(preferred, grow)`. Every child gets its preferred size;
/// what is left after spacing is shared by growing children in proportion to
/// their grow factor. When nothing grows, the leftover stays unused.
pub fn distribute(inputs: &[(f32, f32)], available: f32, spacing: f32) -> Vec<f32> {
    let mut total_fixed: f32 = inputs.iter().map(|(pref, _)| pref).sum();
    let total_grow: f32 = inputs.iter().map(|(_, grow)| grow.max(0.0)).sum();

    if inputs.len() > 1 {
        total_fixed += spacing * (inputs.len() - 1) as f32;
    }

    let leftover = (available - total_fixed).max(0.0);

    inputs
        .iter()
        .map(|(pref, grow)| {
            if total_grow > 0.0 {
                pref + (grow.max(0.0) / total_grow) * leftover
            } else {
                *pref
            }
        })
        .collect()
}

/// Children placed one after another along an axis.
///
/// Children stretch across the cross axis, up to their maximum size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StackLayout {
    pub axis: Axis,
    pub spacing: f32,
}

impl StackLayout {
    pub fn vertical(spacing: f32) -> Self {
        Self {
            axis: Axis::Vertical,
            spacing,
        }
    }

    pub fn horizontal(spacing: f32) -> Self {
        Self {
            axis: Axis::Horizontal,
            spacing,
        }
    }

    fn grow_of(tree: &BlockTree, child: BlockId) -> f32 {
        tree.get(child)
            .and_then(|c| c.layout_data::<StackData>())
            .map(|d| d.grow)
            .unwrap_or(0.0)
    }
}

impl Layout for StackLayout {
    fn compute_sizes(&self, tree: &BlockTree, block: BlockId, _hint: SizeHint) -> Sizes {
        let Some(parent) = tree.get(block) else {
            return Sizes::DEFAULT;
        };
        let children = tree.children(block);
        let gaps = self.spacing * children.len().saturating_sub(1) as f32;

        let (mut min_main, mut pref_main, mut max_main) = (gaps, gaps, gaps);
        let (mut min_cross, mut pref_cross) = (0.0f32, 0.0f32);
        for child in children {
            let sizes = tree.compute_sizes(*child, SizeHint::NONE);
            min_main += self.axis.main(sizes.min);
            pref_main += self.axis.main(sizes.pref);
            max_main += if Self::grow_of(tree, *child) > 0.0 {
                f32::INFINITY
            } else {
                self.axis.main(sizes.pref)
            };
            min_cross = min_cross.max(self.axis.cross(sizes.min));
            pref_cross = pref_cross.max(self.axis.cross(sizes.pref));
        }

        Sizes::new(
            self.axis.size(min_main, min_cross),
            self.axis.size(pref_main, pref_cross),
            self.axis.size(max_main, f32::INFINITY),
        )
        .grow(parent.insets())
    }

    fn layout(&self, tree: &mut BlockTree, block: BlockId) {
        let Some(parent) = tree.get(block) else {
            return;
        };
        let area = parent.local_inset_bounds();
        let children = tree.children(block).to_vec();

        let measured: Vec<Sizes> = children
            .iter()
            .map(|child| tree.compute_sizes(*child, SizeHint::NONE))
            .collect();
        let inputs: Vec<(f32, f32)> = children
            .iter()
            .zip(&measured)
            .map(|(child, sizes)| (self.axis.main(sizes.pref), Self::grow_of(tree, *child)))
            .collect();
        let mains = distribute(&inputs, self.axis.main(area.size()), self.spacing);

        let available_cross = self.axis.cross(area.size());
        let mut offset = 0.0;
        for ((child, sizes), main) in children.iter().zip(&measured).zip(mains) {
            let cross = available_cross.min(self.axis.cross(sizes.max));
            let origin = match self.axis {
                Axis::Vertical => Point::new(area.x, area.y + offset),
                Axis::Horizontal => Point::new(area.x + offset, area.y),
            };
            tree.set_bounds(
                *child,
                Rect::from_origin_size(origin, self.axis.size(main, cross)),
            );
            offset += main + self.spacing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn fixed(tree: &mut BlockTree, size: Size) -> BlockId {
        tree.insert(Block::new().with_sizer(move |_: &Block, _: SizeHint| Sizes {
            min: size,
            pref: size,
            max: Size::UNBOUNDED,
        }))
    }

    #[test]
    fn distribute_shares_leftover_by_grow() {
        let out = distribute(&[(10.0, 0.0), (10.0, 1.0), (10.0, 3.0)], 110.0, 0.0);
        assert_eq!(out, vec![10.0, 30.0, 70.0]);
    }

    #[test]
    fn distribute_accounts_for_spacing() {
        let out = distribute(&[(10.0, 1.0), (10.0, 1.0)], 50.0, 10.0);
        assert_eq!(out, vec![20.0, 20.0]);
    }

    #[test]
    fn distribute_without_grow_keeps_preferred() {
        let out = distribute(&[(10.0, 0.0), (20.0, 0.0)], 100.0, 5.0);
        assert_eq!(out, vec![10.0, 20.0]);
    }

    #[test]
    fn vertical_stack_places_children() {
        let mut tree = BlockTree::new();
        let parent = tree.insert(
            Block::new()
                .with_bounds(Rect::new(0.0, 0.0, 100.0, 100.0))
                .with_layout(StackLayout::vertical(5.0)),
        );
        let header = fixed(&mut tree, Size::new(20.0, 20.0));
        let body = fixed(&mut tree, Size::new(20.0, 10.0));
        tree.add_child(parent, header);
        tree.add_child(parent, body);
        tree.set_layout_data(body, Some(StackData::grow(1.0)));

        tree.validate_layout(parent);

        assert_eq!(
            tree.get(header).map(|b| b.bounds()),
            Some(Rect::new(0.0, 0.0, 100.0, 20.0))
        );
        assert_eq!(
            tree.get(body).map(|b| b.bounds()),
            Some(Rect::new(0.0, 25.0, 100.0, 75.0))
        );
    }

    #[test]
    fn horizontal_sizes_sum_along_main_axis() {
        let mut tree = BlockTree::new();
        let parent = tree.insert(Block::new().with_layout(StackLayout::horizontal(2.0)));
        let a = fixed(&mut tree, Size::new(10.0, 4.0));
        let b = fixed(&mut tree, Size::new(6.0, 8.0));
        tree.add_child(parent, a);
        tree.add_child(parent, b);

        let sizes = tree.compute_sizes(parent, SizeHint::NONE);
        assert_eq!(sizes.pref, Size::new(18.0, 8.0));
        assert_eq!(sizes.max.width, 18.0);

        tree.set_layout_data(b, Some(StackData::grow(1.0)));
        assert!(tree.compute_sizes(parent, SizeHint::NONE).max.width.is_infinite());
    }
}
