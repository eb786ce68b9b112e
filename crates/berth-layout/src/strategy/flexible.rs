use berth_core::{DockArea, PanelHandle, PanelId, RatioBounds, Size, SplitDirection};

use crate::node::{NodeId, NodeRole};
use crate::ops;
use crate::tree::LayoutTree;

use super::{LayoutStrategy, StrategyKind, StrategyState};

/// Ratios `optimize_layout` snaps splitters onto, in order of preference.
const SNAP_RATIOS: [f32; 5] = [0.5, 0.33, 0.67, 0.25, 0.75];

/// Largest combined panel count two layouts may have to be merged.
const MERGE_LIMIT: usize = 10;

// ──────────────────────────────────────────────
// FlexibleLayoutStrategy
// ──────────────────────────────────────────────

/// Skeleton-free placement. Each dock area gets one tab group ("bucket")
/// that is split off the current content the first time the area is used.
#[derive(Debug, Clone)]
pub struct FlexibleLayoutStrategy {
    state: StrategyState,
}

impl Default for FlexibleLayoutStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl FlexibleLayoutStrategy {
    pub fn new() -> Self {
        Self {
            state: StrategyState::with_defaults(&[
                ("auto_organize", "true"),
                ("balance_structure", "true"),
                ("max_panels_per_area", "5"),
                ("min_splitter_ratio", "0.1"),
                ("max_splitter_ratio", "0.9"),
                ("splitter_ratio_tolerance", "0.1"),
                ("enable_animations", "true"),
                ("animation_duration", "300"),
            ]),
        }
    }

    fn max_panels_per_area(&self) -> usize {
        self.state.usize("max_panels_per_area").unwrap_or(5)
    }

    fn snap_bounds(&self) -> RatioBounds {
        RatioBounds::new(
            self.state.f32("min_splitter_ratio").unwrap_or(0.1),
            self.state.f32("max_splitter_ratio").unwrap_or(0.9),
        )
    }

    /// Panels currently tagged with `area`.
    pub fn area_usage(tree: &LayoutTree, area: DockArea) -> usize {
        let mut count = 0;
        tree.traverse_nodes(|_, node| {
            if node.is_panel() && node.dock_area() == Some(area) {
                count += 1;
            }
        });
        count
    }

    pub fn is_area_available(&self, tree: &LayoutTree, area: DockArea) -> bool {
        Self::area_usage(tree, area) < self.max_panels_per_area()
    }

    /// The bucket for `area`, creating and splitting it in if needed.
    pub fn find_or_create_insertion_point(&self, tree: &mut LayoutTree, area: DockArea) -> NodeId {
        match find_bucket(tree, area) {
            Some(bucket) => bucket,
            None => create_optimal_splitter(tree, area),
        }
    }

    /// Put `panel` into its area bucket without the follow-up optimize.
    pub fn place_panel(&mut self, tree: &mut LayoutTree, panel: PanelHandle, area: DockArea) -> Option<NodeId> {
        if tree.find_panel(panel.id).is_some() {
            self.state.fail(format!("panel {panel} is already docked"));
            return None;
        }
        if !self.is_area_available(tree, area) {
            self.state.fail(format!(
                "the {} area already holds {} panels",
                area.name(),
                self.max_panels_per_area()
            ));
            return None;
        }
        let bucket = self.find_or_create_insertion_point(tree, area);
        let node = ops::add_panel_child(tree, bucket, panel, Some(area))?;
        let last = tree.children(bucket).len().saturating_sub(1);
        tree.set_active_tab(bucket, last);
        Some(node)
    }

    /// Snap ratios, fold duplicate buckets and drop redundant splitters
    /// under `start`. Skeleton splitters are left alone.
    pub fn optimize_subtree(&mut self, tree: &mut LayoutTree, start: NodeId) {
        let tolerance = self.state.f32("splitter_ratio_tolerance").unwrap_or(0.1);
        let bounds = self.snap_bounds();

        let mut snaps = Vec::new();
        tree.traverse_splitters(|id, node| {
            if node.is_protected() || !tree.is_ancestor(start, id) {
                return;
            }
            if let Some(snapped) = snap_ratio(node.ratio(), tolerance) {
                snaps.push((id, bounds.clamp(snapped)));
            }
        });
        for (id, ratio) in snaps {
            tree.adjust_ratio(id, ratio);
        }

        merge_sibling_buckets(tree, start);
        let bottom_up: Vec<NodeId> = tree.preorder_from(start).into_iter().rev().collect();
        tree.cleanup_candidates(&bottom_up);
        if self.state.bool("balance_structure") {
            tree.compact_subtree(start);
        }
    }
}

impl LayoutStrategy for FlexibleLayoutStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Flexible
    }

    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StrategyState {
        &mut self.state
    }

    fn create_layout(&mut self, _tree: &mut LayoutTree) {}

    fn add_panel(&mut self, tree: &mut LayoutTree, panel: PanelHandle, area: DockArea) -> bool {
        if self.place_panel(tree, panel, area).is_none() {
            return false;
        }
        if self.state.bool("auto_organize") {
            self.optimize_layout(tree);
        }
        true
    }

    fn find_best_insertion_point(&mut self, tree: &mut LayoutTree, area: DockArea) -> Option<NodeId> {
        Some(self.find_or_create_insertion_point(tree, area))
    }

    fn can_add_panel(&self, tree: &LayoutTree, panel: &PanelHandle, area: DockArea) -> bool {
        tree.find_panel(panel.id).is_none() && self.is_area_available(tree, area)
    }

    fn can_move_panel(&self, tree: &LayoutTree, panel: PanelId, area: DockArea) -> bool {
        tree.find_panel(panel).is_some() && self.is_area_available(tree, area)
    }

    fn optimize_layout(&mut self, tree: &mut LayoutTree) {
        let root = tree.root();
        self.optimize_subtree(tree, root);
    }

    fn minimize_empty_space(&mut self, tree: &mut LayoutTree) {
        tree.cleanup_empty_nodes();
        self.optimize_layout(tree);
    }

    fn minimum_size(&self, tree: &LayoutTree) -> Size {
        content_sized(tree.panel_count(), Size::new(200.0, 150.0), Size::new(150.0, 100.0))
    }

    fn best_size(&self, tree: &LayoutTree) -> Size {
        content_sized(tree.panel_count(), Size::new(1200.0, 800.0), Size::new(200.0, 150.0))
    }

    fn can_merge_layouts(&self, target: &LayoutTree, source: &LayoutTree) -> bool {
        target.panel_count() + source.panel_count() <= MERGE_LIMIT
            && source.panel_ids().iter().all(|id| target.find_panel(*id).is_none())
    }

    /// Merged panels all land in the center bucket.
    fn merge_layouts(&mut self, target: &mut LayoutTree, source: &LayoutTree) -> bool {
        if !self.can_merge_layouts(target, source) {
            self.state.fail("layouts cannot be merged");
            return false;
        }
        let mut merged = true;
        for panel in source.panels() {
            merged &= self.add_panel(target, panel, DockArea::Center);
        }
        merged
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

pub(crate) fn find_bucket(tree: &LayoutTree, area: DockArea) -> Option<NodeId> {
    tree.preorder().into_iter().find(|id| {
        tree.get(*id)
            .is_some_and(|n| n.role() == NodeRole::AreaBucket && n.dock_area() == Some(area))
    })
}

/// Split a new bucket for `area` off whatever the root currently holds.
///
/// Left/Right split side by side, Top/Bottom stack, Center splits side by
/// side with the bucket second. The bucket goes first for Left and Top.
pub fn create_optimal_splitter(tree: &mut LayoutTree, area: DockArea) -> NodeId {
    let root = tree.root();
    let bucket = tree.create_tab_group(NodeRole::AreaBucket, Some(area));
    let children = tree.children(root).to_vec();
    let content = match children.as_slice() {
        [] => {
            tree.add_child(root, bucket);
            return bucket;
        }
        [only] => *only,
        _ => ops::wrap_children(tree, root),
    };

    let splitter = tree.create_splitter_node(orientation_for(area), NodeRole::Content);
    tree.replace(content, splitter);
    if matches!(area, DockArea::Left | DockArea::Top) {
        tree.add_child(splitter, bucket);
        tree.add_child(splitter, content);
    } else {
        tree.add_child(splitter, content);
        tree.add_child(splitter, bucket);
    }
    tree.adjust_ratio(splitter, ratio_for(area));
    log::debug!("split a {} bucket off the root content", area.name());
    bucket
}

pub fn orientation_for(area: DockArea) -> SplitDirection {
    match area {
        DockArea::Top | DockArea::Bottom => SplitDirection::Vertical,
        DockArea::Left | DockArea::Right | DockArea::Center => SplitDirection::Horizontal,
    }
}

/// Share of the first child for a splitter created for `area`.
pub fn ratio_for(area: DockArea) -> f32 {
    match area {
        DockArea::Left => 0.25,
        DockArea::Right => 0.75,
        DockArea::Top => 0.3,
        DockArea::Bottom => 0.7,
        DockArea::Center => 0.5,
    }
}

/// Nearest snap target within `tolerance`; earlier targets win ties.
pub(crate) fn snap_ratio(ratio: f32, tolerance: f32) -> Option<f32> {
    let mut best: Option<(f32, f32)> = None;
    for target in SNAP_RATIOS {
        let distance = (ratio - target).abs();
        if distance > tolerance {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((target, distance));
        }
    }
    best.map(|(target, _)| target)
}

/// Move the panels of later sibling buckets into the first bucket with the
/// same area. Emptied buckets are left for cleanup.
fn merge_sibling_buckets(tree: &mut LayoutTree, start: NodeId) {
    for parent in tree.preorder_from(start) {
        let mut seen: Vec<(DockArea, NodeId)> = Vec::new();
        for child in tree.children(parent).to_vec() {
            let Some(area) = tree
                .get(child)
                .filter(|n| n.role() == NodeRole::AreaBucket)
                .and_then(|n| n.dock_area())
            else {
                continue;
            };
            match seen.iter().find(|(a, _)| *a == area) {
                Some(&(_, keep)) => {
                    for tab in tree.children(child).to_vec() {
                        tree.add_child(keep, tab);
                    }
                }
                None => seen.push((area, child)),
            }
        }
    }
}

fn content_sized(panels: usize, empty: Size, per_panel: Size) -> Size {
    let n = panels as f32;
    Size::new(
        empty.width.max(n * per_panel.width),
        empty.height.max(n * per_panel.height),
    )
}
