use berth_core::{NodeConstraints, Rect, Size, SplitDirection};

use crate::node::{NodeId, NodeKind};
use crate::tree::LayoutTree;

// ──────────────────────────────────────────────
// Geometry pass
// ──────────────────────────────────────────────

impl LayoutTree {
    /// Distribute `rect` top-down over the whole tree and cache every node's rect.
    /// `min_panel` is the smallest extent a splitter tries to leave each side.
    pub fn calculate_layout(&mut self, rect: Rect, min_panel: Size) {
        let mut stack = vec![(self.root(), rect)];
        while let Some((id, rect)) = stack.pop() {
            let Some(node) = self.get_mut(id) else {
                continue;
            };
            node.rect = rect;
            let kind = node.kind.clone();
            let children = node.children.clone();
            let ratio = node.ratio;

            match kind {
                NodeKind::Panel(_) => {}
                NodeKind::Splitter(direction) => match children.as_slice() {
                    [first, second] => {
                        let min_first = self.min_extent(*first, direction, min_panel);
                        let min_second = self.min_extent(*second, direction, min_panel);
                        let total = rect.size().along(direction);
                        let position = split_position(total, ratio, min_first, min_second);
                        let (a, b) = split_rect_at(rect, direction, position);
                        stack.push((*second, b));
                        stack.push((*first, a));
                    }
                    [only] => stack.push((*only, rect)),
                    _ => {}
                },
                NodeKind::TabGroup => {
                    for child in children.iter().rev() {
                        stack.push((*child, rect));
                    }
                }
                NodeKind::Container => {
                    for (child, child_rect) in children.iter().zip(distribute(rect, children.len())).rev() {
                        stack.push((*child, child_rect));
                    }
                }
            }
        }
    }

    /// Cached rects of every panel, in tree order.
    pub fn panel_rects(&self) -> Vec<(berth_core::PanelId, Rect)> {
        let mut out = Vec::new();
        self.traverse_panels(|id, panel| {
            if let Some(node) = self.get(id) {
                out.push((panel.id, node.rect()));
            }
        });
        out
    }

    fn min_extent(&self, id: NodeId, direction: SplitDirection, min_panel: Size) -> f32 {
        let own = self
            .get(id)
            .map(|n| n.constraints().min_along(direction))
            .unwrap_or(0.0);
        own.max(min_panel.along(direction))
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// Offset of the split along an axis of length `total`.
///
/// The ratio position is clamped to `[min_first, total - min_second]`. When
/// both minimums do not fit, they shrink proportionally and the split lands
/// where that shrink puts it.
pub(crate) fn split_position(total: f32, ratio: f32, min_first: f32, min_second: f32) -> f32 {
    if total <= 0.0 {
        return 0.0;
    }
    let wanted = total * ratio;
    let combined = min_first + min_second;
    if combined <= total {
        return wanted.clamp(min_first, total - min_second);
    }
    if combined <= 0.0 {
        return wanted;
    }
    total * (min_first / combined)
}

/// Split a rect at `position` pixels along the axis of `direction`.
pub(crate) fn split_rect_at(rect: Rect, direction: SplitDirection, position: f32) -> (Rect, Rect) {
    match direction {
        SplitDirection::Horizontal => {
            let left_width = position;
            let right_width = rect.width - left_width;
            (
                Rect::new(rect.x, rect.y, left_width, rect.height),
                Rect::new(rect.x + left_width, rect.y, right_width, rect.height),
            )
        }
        SplitDirection::Vertical => {
            let top_height = position;
            let bottom_height = rect.height - top_height;
            (
                Rect::new(rect.x, rect.y, rect.width, top_height),
                Rect::new(rect.x, rect.y + top_height, rect.width, bottom_height),
            )
        }
    }
}

/// Equal-width columns; the last one absorbs rounding.
pub(crate) fn distribute(rect: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![rect];
    }
    let width = (rect.width / count as f32).floor();
    let mut out = Vec::with_capacity(count);
    let mut x = rect.x;
    for i in 0..count {
        let w = if i + 1 == count {
            rect.x + rect.width - x
        } else {
            width
        };
        out.push(Rect::new(x, rect.y, w, rect.height));
        x += w;
    }
    out
}

/// True when `rect` satisfies the node's size bounds.
pub fn validate_constraints(constraints: &NodeConstraints, rect: Rect) -> bool {
    rect.width >= constraints.min_width
        && rect.height >= constraints.min_height
        && constraints.max_width.map_or(true, |max| rect.width <= max)
        && constraints.max_height.map_or(true, |max| rect.height <= max)
}

/// Grow or shrink `rect` into the node's size bounds, keeping its origin.
pub fn enforce_constraints(constraints: &NodeConstraints, rect: Rect) -> Rect {
    let mut width = rect.width.max(constraints.min_width);
    let mut height = rect.height.max(constraints.min_height);
    if let Some(max) = constraints.max_width {
        width = width.min(max);
    }
    if let Some(max) = constraints.max_height {
        height = height.min(max);
    }
    Rect::new(rect.x, rect.y, width, height)
}
