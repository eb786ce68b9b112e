use berth_core::{DockArea, PanelHandle, PanelId, Size};

use crate::node::{NodeId, NodeRole, SkeletonSlot};
use crate::ops;
use crate::tree::LayoutTree;

use super::flexible::FlexibleLayoutStrategy;
use super::ide::IdeLayoutStrategy;
use super::{LayoutStrategy, StrategyKind, StrategyState};

// ──────────────────────────────────────────────
// HybridLayoutStrategy
// ──────────────────────────────────────────────

/// IDE regions for the stable areas, flexible buckets around them for the
/// dynamic ones.
///
/// | area | delegate |
/// |---|---|
/// | Left, Center, Bottom | [`IdeLayoutStrategy`] |
/// | Right, Top | [`FlexibleLayoutStrategy`] |
///
/// The IDE area is the subtree under the `MainSplit` skeleton node; every
/// `AreaBucket` is a flexible area.
#[derive(Debug, Clone)]
pub struct HybridLayoutStrategy {
    state: StrategyState,
    ide: IdeLayoutStrategy,
    flexible: FlexibleLayoutStrategy,
}

impl Default for HybridLayoutStrategy {
    fn default() -> Self {
        Self::new()
    }
}

/// Which delegate owns an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delegate {
    Ide,
    Flexible,
}

impl HybridLayoutStrategy {
    pub fn new() -> Self {
        Self {
            state: StrategyState::with_defaults(&[
                ("auto_balance", "true"),
                ("adaptive_strategy", "true"),
                ("ide_area_ratio", "0.7"),
                ("flexible_area_ratio", "0.3"),
                ("strategy_threshold", "5"),
                ("enable_animations", "true"),
                ("animation_duration", "300"),
            ]),
            ide: IdeLayoutStrategy::new(),
            flexible: FlexibleLayoutStrategy::new(),
        }
    }

    /// Static routing table.
    pub fn delegate_for(area: DockArea) -> Delegate {
        match area {
            DockArea::Left | DockArea::Center | DockArea::Bottom => Delegate::Ide,
            DockArea::Right | DockArea::Top => Delegate::Flexible,
        }
    }

    /// Routing for the current tree. With `adaptive_strategy` set, a
    /// flexible area that reached `strategy_threshold` panels overflows into
    /// the IDE canvas.
    pub fn route(&self, tree: &LayoutTree, area: DockArea) -> Delegate {
        match Self::delegate_for(area) {
            Delegate::Ide => Delegate::Ide,
            Delegate::Flexible => {
                let threshold = self.state.usize("strategy_threshold").unwrap_or(5);
                let crowded = FlexibleLayoutStrategy::area_usage(tree, area) >= threshold;
                if self.state.bool("adaptive_strategy") && crowded {
                    log::debug!("{} area is crowded, routing to the IDE canvas", area.name());
                    Delegate::Ide
                } else {
                    Delegate::Flexible
                }
            }
        }
    }

    pub fn ide_area(tree: &LayoutTree) -> Option<NodeId> {
        ops::find_skeleton(tree, SkeletonSlot::MainSplit)
    }

    pub fn flexible_areas(tree: &LayoutTree) -> Vec<NodeId> {
        let mut out = Vec::new();
        tree.traverse_nodes(|id, node| {
            if node.role() == NodeRole::AreaBucket {
                out.push(id);
            }
        });
        out
    }

    /// Give the IDE side of every splitter that separates it from a
    /// flexible area its configured share. Customized splitters are kept.
    pub fn balance_areas(&mut self, tree: &mut LayoutTree) {
        if !self.state.bool("auto_balance") {
            return;
        }
        let Some(ide) = Self::ide_area(tree) else {
            return;
        };
        let ide_ratio = self.state.f32("ide_area_ratio").unwrap_or(0.7);
        let flexible_ratio = self.state.f32("flexible_area_ratio").unwrap_or(0.3);

        let mut updates = Vec::new();
        tree.traverse_splitters(|id, node| {
            if node.ratio_customized() || node.is_protected() {
                return;
            }
            let [first, second] = node.children() else {
                return;
            };
            if tree.is_ancestor(*first, ide) {
                updates.push((id, ide_ratio));
            } else if tree.is_ancestor(*second, ide) {
                updates.push((id, flexible_ratio));
            }
        });
        for (id, ratio) in updates {
            tree.adjust_ratio(id, ratio);
        }
    }

    fn adopt_error(&mut self, delegate: Delegate) {
        let message = match delegate {
            Delegate::Ide => self.ide.last_error(),
            Delegate::Flexible => self.flexible.last_error(),
        }
        .map(str::to_string);
        if let Some(message) = message {
            self.state.fail(message);
        }
    }

    fn each_area(&mut self, tree: &mut LayoutTree, compact_only: bool) {
        if let Some(ide) = Self::ide_area(tree) {
            if compact_only {
                tree.compact_subtree(ide);
            } else {
                self.ide.optimize_subtree(tree, ide);
            }
        }
        let mut parents: Vec<NodeId> = Self::flexible_areas(tree)
            .into_iter()
            .filter_map(|bucket| tree.parent(bucket))
            .collect();
        parents.dedup();
        for parent in parents {
            if !tree.contains(parent) {
                continue;
            }
            if compact_only {
                tree.compact_subtree(parent);
            } else {
                self.flexible.optimize_subtree(tree, parent);
            }
        }
    }
}

impl LayoutStrategy for HybridLayoutStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hybrid
    }

    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StrategyState {
        &mut self.state
    }

    fn create_layout(&mut self, tree: &mut LayoutTree) {
        self.ide.create_layout(tree);
    }

    fn add_panel(&mut self, tree: &mut LayoutTree, panel: PanelHandle, area: DockArea) -> bool {
        if tree.find_panel(panel.id).is_some() {
            self.state.fail(format!("panel {panel} is already docked"));
            return false;
        }
        self.ide.create_layout(tree);
        let delegate = self.route(tree, area);
        let placed = match delegate {
            Delegate::Ide => self.ide.add_panel(tree, panel, area),
            Delegate::Flexible => self.flexible.place_panel(tree, panel, area).is_some(),
        };
        if !placed {
            self.adopt_error(delegate);
            return false;
        }
        self.balance_areas(tree);
        true
    }

    fn remove_panel(&mut self, tree: &mut LayoutTree, panel: PanelId) -> bool {
        if tree.detach_panel(panel).is_none() {
            return false;
        }
        tree.cleanup_empty_nodes();
        self.balance_areas(tree);
        true
    }

    fn find_best_insertion_point(&mut self, tree: &mut LayoutTree, area: DockArea) -> Option<NodeId> {
        self.ide.create_layout(tree);
        match self.route(tree, area) {
            Delegate::Ide => self.ide.find_best_insertion_point(tree, area),
            Delegate::Flexible => self.flexible.find_best_insertion_point(tree, area),
        }
    }

    fn validate_layout(&self, tree: &LayoutTree) -> bool {
        self.ide.validate_layout(tree)
    }

    fn can_add_panel(&self, tree: &LayoutTree, panel: &PanelHandle, area: DockArea) -> bool {
        match self.route(tree, area) {
            Delegate::Ide => self.ide.can_add_panel(tree, panel, area),
            Delegate::Flexible => self.flexible.can_add_panel(tree, panel, area),
        }
    }

    fn can_move_panel(&self, tree: &LayoutTree, panel: PanelId, area: DockArea) -> bool {
        match self.route(tree, area) {
            Delegate::Ide => self.ide.can_move_panel(tree, panel, area),
            Delegate::Flexible => self.flexible.can_move_panel(tree, panel, area),
        }
    }

    fn optimize_layout(&mut self, tree: &mut LayoutTree) {
        self.each_area(tree, false);
        self.balance_areas(tree);
    }

    fn compact_layout(&mut self, tree: &mut LayoutTree) {
        self.each_area(tree, true);
        tree.cleanup_empty_nodes();
    }

    fn balance_splitters(&mut self, tree: &mut LayoutTree) {
        let mut splitters = Vec::new();
        tree.traverse_splitters(|id, _| splitters.push(id));
        for id in splitters {
            tree.reset_ratio(id);
        }
        self.balance_areas(tree);
    }

    fn minimum_size(&self, tree: &LayoutTree) -> Size {
        self.flexible.minimum_size(tree)
    }

    fn best_size(&self, tree: &LayoutTree) -> Size {
        self.flexible.best_size(tree)
    }

    fn reset_parameters(&mut self) {
        self.state.reset();
        self.ide.reset_parameters();
        self.flexible.reset_parameters();
    }
}
