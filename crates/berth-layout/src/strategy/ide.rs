use berth_core::{DockArea, DockPosition, PanelHandle, PanelId, Size};

use crate::node::NodeId;
use crate::ops::{self, MainStructure};
use crate::tree::LayoutTree;

use super::{LayoutStrategy, StrategyKind, StrategyState};

/// Smallest extent of a skeleton region that holds panels.
const REGION_MIN: Size = Size::new(150.0, 100.0);

const EMPTY_MIN: Size = Size::new(300.0, 200.0);
const BEST: Size = Size::new(1200.0, 800.0);

// ──────────────────────────────────────────────
// IdeLayoutStrategy
// ──────────────────────────────────────────────

/// Fixed VS-style regions: a left sidebar and a center canvas over a
/// bottom status bar. Panels are routed into the region for their area.
#[derive(Debug, Clone)]
pub struct IdeLayoutStrategy {
    state: StrategyState,
}

impl Default for IdeLayoutStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl IdeLayoutStrategy {
    pub fn new() -> Self {
        Self {
            state: StrategyState::with_defaults(&[
                ("compact_on_remove", "false"),
                ("restore_default_ratios", "true"),
            ]),
        }
    }

    /// Tidy the subtree under `start`: promote redundant content groups and,
    /// unless disabled, put untouched splitters back on their role default.
    pub fn optimize_subtree(&mut self, tree: &mut LayoutTree, start: NodeId) {
        tree.compact_subtree(start);
        if !self.state.bool("restore_default_ratios") {
            return;
        }
        let mut untouched = Vec::new();
        tree.traverse_splitters(|id, node| {
            if !node.ratio_customized() && tree.is_ancestor(start, id) {
                untouched.push(id);
            }
        });
        for id in untouched {
            tree.reset_ratio(id);
        }
    }

    fn region_min(tree: &LayoutTree, holder: NodeId) -> Size {
        if tree.subtree_panel_count(holder) == 0 {
            return Size::default();
        }
        let mut min = REGION_MIN;
        for id in tree.preorder_from(holder) {
            if let Some(node) = tree.get(id) {
                min.width = min.width.max(node.constraints().min_width);
                min.height = min.height.max(node.constraints().min_height);
            }
        }
        min
    }
}

impl LayoutStrategy for IdeLayoutStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ide
    }

    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StrategyState {
        &mut self.state
    }

    fn create_layout(&mut self, tree: &mut LayoutTree) {
        ops::ensure_main_structure(tree);
    }

    fn add_panel(&mut self, tree: &mut LayoutTree, panel: PanelHandle, area: DockArea) -> bool {
        if !self.can_add_panel(tree, &panel, area) {
            self.state.fail(format!("panel {panel} is already docked"));
            return false;
        }
        let Some(point) = self.find_best_insertion_point(tree, area) else {
            self.state.fail(format!("no insertion point for the {} area", area.name()));
            return false;
        };

        let split = match DockPosition::from(area) {
            DockPosition::Center => None,
            position => ops::insert_panel_with_splitter(tree, point, panel.clone(), position),
        };
        let placed = split.or_else(|| {
            log::debug!("organizing {panel} into the {} region", area.name());
            ops::organize_by_dock_areas(tree, panel, area)
        });
        placed.is_some()
    }

    fn remove_panel(&mut self, tree: &mut LayoutTree, panel: PanelId) -> bool {
        if tree.detach_panel(panel).is_none() {
            return false;
        }
        if self.state.bool("compact_on_remove") {
            tree.compact();
        } else {
            tree.cleanup_empty_nodes();
        }
        true
    }

    fn find_best_insertion_point(&mut self, tree: &mut LayoutTree, area: DockArea) -> Option<NodeId> {
        Some(ops::ensure_main_structure(tree).holder_for(area))
    }

    fn validate_layout(&self, tree: &LayoutTree) -> bool {
        tree.check_invariants().is_ok() && ops::main_structure(tree).is_some()
    }

    fn optimize_layout(&mut self, tree: &mut LayoutTree) {
        let root = tree.root();
        self.optimize_subtree(tree, root);
    }

    fn minimum_size(&self, tree: &LayoutTree) -> Size {
        let Some(MainStructure {
            left_sidebar,
            center_canvas,
            bottom_status_bar,
            ..
        }) = ops::main_structure(tree)
        else {
            return EMPTY_MIN;
        };
        if tree.panel_count() == 0 {
            return EMPTY_MIN;
        }
        let left = Self::region_min(tree, left_sidebar);
        let center = Self::region_min(tree, center_canvas);
        let bottom = Self::region_min(tree, bottom_status_bar);
        Size::new(
            (left.width + center.width).max(bottom.width),
            left.height.max(center.height) + bottom.height,
        )
    }

    fn best_size(&self, _tree: &LayoutTree) -> Size {
        BEST
    }
}

