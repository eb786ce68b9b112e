use std::collections::HashMap;
use std::time::{Duration, Instant};

use berth_core::{
    ClientArea, Clock, DockArea, DockPosition, DragSession, PanelHandle, PanelId, Rect,
    SplitDirection, SystemClock, Vec2,
};

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::geometry;
use crate::node::{LayoutNode, NodeId};
use crate::ops;
use crate::optimizer::LayoutOptimizer;
use crate::strategy::{LayoutStrategy, StrategyKind};
use crate::transition::{LayoutTransition, TransitionKind};
use crate::tree::LayoutTree;

/// Sash hit-test threshold in pixels.
const SASH_HIT_THRESHOLD: f32 = 8.0;

/// Outcome of a docking call.
#[derive(Debug, Clone, PartialEq)]
pub struct DockReport {
    /// The Panel node now showing the docked panel.
    pub node: NodeId,
    /// Nodes the call may have left empty or with a single child. They are
    /// queued on the engine and collapsed by the next [`LayoutEngine::settle`].
    pub cleanup_candidates: Vec<NodeId>,
    /// The requested placement was not possible and the panel was organized
    /// into its dock area instead.
    pub used_fallback: bool,
}

// ──────────────────────────────────────────────
// LayoutEngine
// ──────────────────────────────────────────────

/// Owns the layout tree and the active strategy, and turns structural
/// changes into debounced geometry passes.
pub struct LayoutEngine {
    pub(crate) tree: LayoutTree,
    strategy: Box<dyn LayoutStrategy>,
    config: LayoutConfig,
    clock: Box<dyn Clock>,
    client_rect: Rect,
    pub(crate) layout_dirty: bool,
    pub(crate) update_deadline: Option<Instant>,
    pub(crate) is_updating_layout: bool,
    pending_cleanup: Vec<NodeId>,
    floating: Vec<PanelHandle>,
    transitions: Vec<LayoutTransition>,
    /// Splitter whose sash is being dragged.
    active_sash: Option<NodeId>,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: LayoutConfig, clock: Box<dyn Clock>) -> Self {
        if let Err(e) = config.validate() {
            log::warn!("layout config: {e}");
        }
        Self {
            tree: LayoutTree::with_bounds(config.ratio_bounds),
            strategy: config.strategy.create(),
            config,
            clock,
            client_rect: Rect::EMPTY,
            layout_dirty: false,
            update_deadline: None,
            is_updating_layout: false,
            pending_cleanup: Vec::new(),
            floating: Vec::new(),
            transitions: Vec::new(),
            active_sash: None,
        }
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    /// Direct tree access. Callers that change the structure should follow
    /// up with [`request_layout_update`](Self::request_layout_update).
    pub fn tree_mut(&mut self) -> &mut LayoutTree {
        &mut self.tree
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn client_rect(&self) -> Rect {
        self.client_rect
    }

    pub fn is_layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    pub fn has_pending_cleanup(&self) -> bool {
        !self.pending_cleanup.is_empty()
    }

    // ──────────────────────────────────────────
    // Strategy
    // ──────────────────────────────────────────

    pub fn strategy(&self) -> &dyn LayoutStrategy {
        self.strategy.as_ref()
    }

    pub fn strategy_mut(&mut self) -> &mut dyn LayoutStrategy {
        self.strategy.as_mut()
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Swap the placement policy. The tree is kept and handed to the new
    /// strategy's `initialize_layout`.
    pub fn set_strategy(&mut self, kind: StrategyKind) {
        self.settle();
        log::debug!("switching layout strategy {} -> {kind}", self.strategy.kind());
        self.strategy = kind.create();
        self.strategy.initialize_layout(&mut self.tree);
        self.mark_dirty();
    }

    // ──────────────────────────────────────────
    // Panels
    // ──────────────────────────────────────────

    /// Add a panel to `area`, or next to `relative_to` when that panel is
    /// docked. Panels already in the layout are rejected.
    pub fn add_panel(&mut self, panel: PanelHandle, area: DockArea, relative_to: Option<PanelId>) -> bool {
        self.settle();
        if self.tree.find_panel(panel.id).is_some() {
            log::warn!("{}", LayoutError::DuplicatePanel(panel.id));
            return false;
        }
        if let Some(target) = relative_to.filter(|t| self.tree.find_panel(*t).is_some()) {
            return self.dock_panel(&panel, target, area.into()).is_ok();
        }
        if !self.strategy.add_panel(&mut self.tree, panel, area) {
            return false;
        }
        self.mark_dirty();
        true
    }

    pub fn remove_panel(&mut self, panel: PanelId) -> bool {
        self.settle();
        if let Some(index) = self.floating.iter().position(|p| p.id == panel) {
            self.floating.remove(index);
            return true;
        }
        if !self.strategy.remove_panel(&mut self.tree, panel) {
            return false;
        }
        self.mark_dirty();
        true
    }

    /// Remove, then add again. Moves the strategy refuses leave the tree
    /// alone, and a panel whose new placement fails goes back to the area
    /// it came from.
    pub fn move_panel(&mut self, panel: PanelId, area: DockArea, relative_to: Option<PanelId>) -> bool {
        let Some(handle) = self.panel_handle(panel) else {
            return false;
        };
        if relative_to == Some(panel) {
            return false;
        }
        let docks_relative = relative_to.is_some_and(|t| self.tree.find_panel(t).is_some());
        if !docks_relative && !self.strategy.can_move_panel(&self.tree, panel, area) {
            log::debug!("panel #{panel} cannot move to {}", area.name());
            return false;
        }

        let former = self
            .strategy
            .panel_area(&self.tree, panel)
            .unwrap_or(DockArea::Center);
        if !self.remove_panel(panel) {
            return false;
        }
        if self.add_panel(handle.clone(), area, relative_to) {
            return true;
        }
        log::warn!("moving panel #{panel} failed, restoring it to {}", former.name());
        if !self.strategy.add_panel(&mut self.tree, handle, former) {
            log::error!("panel #{panel} could not be restored to {}", former.name());
        }
        self.mark_dirty();
        false
    }

    pub fn swap_panels(&mut self, a: PanelId, b: PanelId) -> bool {
        if !self.strategy.swap_panels(&mut self.tree, a, b) {
            return false;
        }
        self.mark_dirty();
        true
    }

    /// Dock `panel` against the panel `target`. The panel is detached first
    /// if it is already part of the layout.
    ///
    /// Edge positions split the target, or its whole tab group when the
    /// target is a tab. Skeleton nodes are never split; those requests are
    /// organized into the dock area for `position` instead. `Center` tabs
    /// the panel with the target.
    ///
    /// Nothing is cleaned up here: the report lists the nodes that may have
    /// emptied and they are queued for [`settle`](Self::settle).
    pub fn dock_panel(&mut self, panel: &PanelHandle, target: PanelId, position: DockPosition) -> Result<DockReport> {
        self.settle();
        if panel.id == target {
            return Err(LayoutError::DockOntoSelf(panel.id));
        }
        let target_node = self
            .tree
            .find_panel(target)
            .ok_or(LayoutError::PanelNotFound(target))?;
        let fallback_parent = self.tree.parent(target_node).unwrap_or(self.tree.root());

        let mut candidates = Vec::new();
        if let Some(former) = self.tree.detach_panel(panel.id) {
            candidates.push(former);
        }
        self.floating.retain(|p| p.id != panel.id);

        let placed = match self.tree.find_panel(target) {
            Some(current) => self.place_against(current, panel, position),
            None if self.tree.contains(fallback_parent) => {
                log::debug!("dock target #{target} vanished, using its former parent");
                self.place_in_parent(fallback_parent, panel, position)
            }
            None => None,
        };
        let (node, used_fallback) = match placed {
            Some(placed) => placed,
            None => {
                self.pending_cleanup.extend(candidates.iter().copied());
                self.mark_dirty();
                return Err(LayoutError::PanelNotFound(target));
            }
        };

        self.pending_cleanup.extend(candidates.iter().copied());
        self.mark_dirty();
        Ok(DockReport {
            node,
            cleanup_candidates: candidates,
            used_fallback,
        })
    }

    fn place_against(&mut self, target: NodeId, panel: &PanelHandle, position: DockPosition) -> Option<(NodeId, bool)> {
        if position == DockPosition::Center {
            if let Some(node) = ops::tabify_into(&mut self.tree, target, panel.clone()) {
                return Some((node, false));
            }
            return self.organize(panel, position);
        }
        let anchor = ops::split_anchor(&self.tree, target);
        if self.tree.is_protected(anchor) {
            log::debug!("{}: anchor is part of the main structure", LayoutError::ProtectedNode);
            return self.organize(panel, position);
        }
        match ops::insert_panel_with_splitter(&mut self.tree, anchor, panel.clone(), position) {
            Some(node) => Some((node, false)),
            None => self.organize(panel, position),
        }
    }

    fn place_in_parent(&mut self, parent: NodeId, panel: &PanelHandle, position: DockPosition) -> Option<(NodeId, bool)> {
        let node = match position {
            DockPosition::Center => ops::tabify_into(&mut self.tree, parent, panel.clone()),
            _ => ops::first_panel_in(&self.tree, parent).and_then(|anchor| {
                let anchor = ops::split_anchor(&self.tree, anchor);
                if self.tree.is_protected(anchor) {
                    return None;
                }
                ops::insert_panel_with_splitter(&mut self.tree, anchor, panel.clone(), position)
            }),
        };
        match node {
            Some(node) => Some((node, true)),
            None => self.organize(panel, position),
        }
    }

    fn organize(&mut self, panel: &PanelHandle, position: DockPosition) -> Option<(NodeId, bool)> {
        ops::organize_by_dock_areas(&mut self.tree, panel.clone(), position.area()).map(|node| (node, true))
    }

    /// Show `panel` as a tab next to the panel `target`.
    pub fn tabify_panel(&mut self, panel: &PanelHandle, target: PanelId) -> bool {
        self.settle();
        if panel.id == target || self.tree.find_panel(target).is_none() {
            return false;
        }
        let mut candidates = Vec::new();
        if let Some(former) = self.tree.detach_panel(panel.id) {
            candidates.push(former);
        }
        self.floating.retain(|p| p.id != panel.id);

        let placed = self
            .tree
            .find_panel(target)
            .and_then(|node| ops::tabify_into(&mut self.tree, node, panel.clone()));
        self.pending_cleanup.extend(candidates);
        self.mark_dirty();
        placed.is_some()
    }

    /// Take a panel out of the tree and remember it as floating.
    pub fn float_panel(&mut self, panel: PanelId) -> bool {
        let Some(handle) = self.panel_handle(panel) else {
            return false;
        };
        if !self.strategy.remove_panel(&mut self.tree, panel) {
            return false;
        }
        self.floating.push(handle);
        self.mark_dirty();
        true
    }

    /// Dock a floating panel back into `area`.
    pub fn restore_panel(&mut self, panel: PanelId, area: DockArea) -> bool {
        let Some(index) = self.floating.iter().position(|p| p.id == panel) else {
            return false;
        };
        let handle = self.floating[index].clone();
        if !self.strategy.add_panel(&mut self.tree, handle, area) {
            return false;
        }
        self.floating.remove(index);
        self.mark_dirty();
        true
    }

    pub fn floating_panels(&self) -> &[PanelHandle] {
        &self.floating
    }

    /// Apply a finished drag. Sessions without a valid target are ignored.
    pub fn complete_drag(&mut self, session: &DragSession) -> Result<Option<DockReport>> {
        let (Some(target), Some(position)) = (session.target, session.position) else {
            return Ok(None);
        };
        if !session.valid {
            return Ok(None);
        }
        self.dock_panel(&session.source, target, position).map(Some)
    }

    // ──────────────────────────────────────────
    // Cleanup and scheduling
    // ──────────────────────────────────────────

    /// Collapse the nodes queued by earlier docking calls. Handles that no
    /// longer resolve are skipped. Returns how many nodes were removed.
    pub fn settle(&mut self) -> usize {
        if self.pending_cleanup.is_empty() {
            return 0;
        }
        let candidates = std::mem::take(&mut self.pending_cleanup);
        let removed = self.tree.cleanup_candidates(&candidates);
        if removed > 0 {
            log::debug!("settled {removed} nodes");
            self.mark_dirty();
        }
        removed
    }

    fn mark_dirty(&mut self) {
        self.layout_dirty = true;
        self.request_layout_update();
    }

    /// (Re)arm the debounce deadline.
    pub fn request_layout_update(&mut self) {
        self.update_deadline = Some(self.clock.now() + self.config.debounce());
    }

    /// Timer callback. Runs the pending cleanup and the geometry pass once
    /// the debounce deadline has passed. Returns whether a pass ran.
    pub fn process_timers(&mut self) -> bool {
        let Some(deadline) = self.update_deadline else {
            return false;
        };
        if self.clock.now() < deadline {
            return false;
        }
        self.settle();
        self.update_deadline = None;
        self.update_layout(self.client_rect)
    }

    /// Cleanup plus an immediate geometry pass.
    pub fn flush_layout(&mut self) -> bool {
        self.settle();
        self.update_deadline = None;
        self.update_layout(self.client_rect)
    }

    /// Lay the tree out into `rect`. A call made while a pass is running is
    /// dropped and returns `false`.
    pub fn update_layout(&mut self, rect: Rect) -> bool {
        if self.is_updating_layout {
            log::trace!("dropping re-entrant layout update");
            return false;
        }
        self.is_updating_layout = true;
        self.client_rect = rect;

        let before: HashMap<NodeId, Rect> = if self.config.enable_animations {
            self.panel_node_rects().into_iter().collect()
        } else {
            HashMap::new()
        };

        let start = Instant::now();
        self.tree.calculate_layout(rect, self.config.min_panel_size);
        log::trace!(
            "layout pass over {} nodes took {:?}",
            self.tree.node_count(),
            start.elapsed()
        );

        if self.config.enable_animations {
            self.start_resize_transitions(&before);
        }
        self.layout_dirty = false;
        self.is_updating_layout = false;
        true
    }

    pub fn on_window_resized(&mut self, window: &dyn ClientArea) {
        self.client_rect = window.client_rect();
        self.mark_dirty();
    }

    // ──────────────────────────────────────────
    // Transitions
    // ──────────────────────────────────────────

    fn panel_node_rects(&self) -> Vec<(NodeId, Rect)> {
        let mut out = Vec::new();
        self.tree.traverse_nodes(|id, node| {
            if node.is_panel() {
                out.push((id, node.rect()));
            }
        });
        out
    }

    fn start_resize_transitions(&mut self, before: &HashMap<NodeId, Rect>) {
        let duration = self.config.animation_duration();
        for (id, target) in self.panel_node_rects() {
            let Some(&start) = before.get(&id) else {
                continue;
            };
            if start == target || start.is_empty() {
                continue;
            }
            self.transitions.retain(|t| t.node != id);
            self.transitions.push(LayoutTransition::new(
                TransitionKind::Resize,
                id,
                start,
                target,
                duration,
            ));
        }
    }

    pub fn transitions(&self) -> &[LayoutTransition] {
        &self.transitions
    }

    /// Advance every transition by `dt` and return the interpolated rects.
    /// Finished transitions report their target once and are dropped.
    pub fn tick_transitions(&mut self, dt: Duration) -> Vec<(NodeId, Rect)> {
        let mut frames = Vec::with_capacity(self.transitions.len());
        for transition in &mut self.transitions {
            transition.advance(dt);
            frames.push((transition.node, transition.current_rect()));
        }
        self.transitions.retain(|t| t.active && self.tree.contains(t.node));
        frames
    }

    // ──────────────────────────────────────────
    // Splitters
    // ──────────────────────────────────────────

    pub fn set_splitter_ratio(&mut self, node: NodeId, ratio: f32) -> bool {
        if !self.strategy.set_splitter_ratio(&mut self.tree, node, ratio) {
            return false;
        }
        self.mark_dirty();
        true
    }

    pub fn set_sash_position(&mut self, node: NodeId, pixels: f32) -> bool {
        if !self.strategy.set_sash_position(&mut self.tree, node, pixels) {
            return false;
        }
        self.mark_dirty();
        true
    }

    /// Start dragging the nearest sash within the hit threshold of `point`.
    pub fn begin_sash_drag(&mut self, point: Vec2) -> bool {
        let mut best: Option<(f32, NodeId)> = None;
        self.tree.traverse_splitters(|id, node| {
            let Some(distance) = sash_distance(&self.tree, node, point) else {
                return;
            };
            if distance <= SASH_HIT_THRESHOLD && best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, id));
            }
        });
        self.active_sash = best.map(|(_, id)| id);
        self.active_sash.is_some()
    }

    /// Move the dragged sash to `point`. The ratio is clamped and marked
    /// customized.
    pub fn drag_sash(&mut self, point: Vec2) -> bool {
        let Some(id) = self.active_sash else {
            return false;
        };
        let Some(node) = self.tree.get(id) else {
            self.active_sash = None;
            return false;
        };
        let (Some(direction), rect) = (node.direction(), node.rect()) else {
            return false;
        };
        let ratio = match direction {
            SplitDirection::Horizontal if rect.width > 0.0 => (point.x - rect.x) / rect.width,
            SplitDirection::Vertical if rect.height > 0.0 => (point.y - rect.y) / rect.height,
            _ => return false,
        };
        if !self.tree.set_ratio(id, ratio) {
            return false;
        }
        self.mark_dirty();
        true
    }

    pub fn end_sash_drag(&mut self) {
        self.active_sash = None;
    }

    pub fn active_sash(&self) -> Option<NodeId> {
        self.active_sash
    }

    // ──────────────────────────────────────────
    // Constraints
    // ──────────────────────────────────────────

    /// Whether the node's current rect satisfies its size bounds.
    pub fn validate_constraints(&self, node: NodeId) -> bool {
        self.tree
            .get(node)
            .is_some_and(|n| geometry::validate_constraints(n.constraints(), n.rect()))
    }

    /// The node's current rect pushed into its size bounds.
    pub fn enforce_constraints(&self, node: NodeId) -> Option<Rect> {
        self.tree
            .get(node)
            .map(|n| geometry::enforce_constraints(n.constraints(), n.rect()))
    }

    // ──────────────────────────────────────────
    // Maintenance
    // ──────────────────────────────────────────

    pub fn optimize_layout(&mut self) {
        self.settle();
        self.strategy.optimize_layout(&mut self.tree);
        self.mark_dirty();
    }

    pub fn compact_layout(&mut self) {
        self.settle();
        self.strategy.compact_layout(&mut self.tree);
        self.mark_dirty();
    }

    pub fn balance_splitters(&mut self) {
        self.strategy.balance_splitters(&mut self.tree);
        self.mark_dirty();
    }

    /// Run `optimizer` over the tree with the active strategy.
    pub fn run_optimizer(&mut self, optimizer: &mut LayoutOptimizer) -> bool {
        self.settle();
        let changed = optimizer.optimize_layout(&mut self.tree, self.strategy.as_mut());
        if changed {
            self.mark_dirty();
        }
        changed
    }

    // ──────────────────────────────────────────
    // Queries
    // ──────────────────────────────────────────

    /// Rect of a docked panel from the last geometry pass, or an empty rect.
    pub fn panel_rect(&self, panel: PanelId) -> Rect {
        self.strategy.panel_bounds(&self.tree, panel)
    }

    pub fn all_panels(&self) -> Vec<PanelHandle> {
        self.tree.panels()
    }

    pub fn find_panel_node(&self, panel: PanelId) -> Option<NodeId> {
        self.tree.find_panel(panel)
    }

    fn panel_handle(&self, panel: PanelId) -> Option<PanelHandle> {
        self.tree
            .find_panel(panel)
            .and_then(|id| self.tree.get(id))
            .and_then(|n| n.panel().cloned())
    }

    pub fn find_best_insertion_point(&mut self, area: DockArea) -> Option<NodeId> {
        self.strategy.find_best_insertion_point(&mut self.tree, area)
    }

    /// Whether `target` accepts docks at `position`. Edge docks also need
    /// the tab group around the target, if any, to be dockable.
    pub fn can_dock_at(&self, target: PanelId, position: DockPosition) -> bool {
        let Some(node) = self.tree.find_panel(target) else {
            return false;
        };
        let dockable = |id: NodeId| self.tree.get(id).is_some_and(|n| n.constraints().dockable);
        match position {
            DockPosition::Center => dockable(node),
            _ => dockable(node) && dockable(ops::split_anchor(&self.tree, node)),
        }
    }

    pub fn traverse_panels(&self, visit: impl FnMut(NodeId, &PanelHandle)) {
        self.tree.traverse_panels(visit);
    }

    pub fn traverse_splitters(&self, visit: impl FnMut(NodeId, &LayoutNode)) {
        self.tree.traverse_splitters(visit);
    }

    pub fn traverse_containers(&self, visit: impl FnMut(NodeId, &LayoutNode)) {
        self.tree.traverse_containers(visit);
    }

    pub fn traverse_nodes(&self, visit: impl FnMut(NodeId, &LayoutNode)) {
        self.tree.traverse_nodes(visit);
    }

    // ──────────────────────────────────────────
    // Persistence
    // ──────────────────────────────────────────

    pub fn save_layout(&self) -> String {
        self.strategy.serialize_layout(&self.tree)
    }

    /// Replace the tree with a saved layout. On failure the tree is kept and
    /// the reason is available from [`last_error`](Self::last_error).
    pub fn load_layout(&mut self, data: &str) -> bool {
        self.settle();
        if !self.strategy.deserialize_layout(&mut self.tree, data) {
            return false;
        }
        self.pending_cleanup.clear();
        self.transitions.clear();
        self.active_sash = None;
        self.mark_dirty();
        true
    }

    pub fn last_error(&self) -> Option<&str> {
        self.strategy.last_error()
    }
}

/// Distance from `point` to the sash of a laid-out two-child splitter.
fn sash_distance(tree: &LayoutTree, node: &LayoutNode, point: Vec2) -> Option<f32> {
    let direction = node.direction()?;
    let [first, _] = node.children() else {
        return None;
    };
    let rect = node.rect();
    if rect.is_empty() || !node.constraints().resizable {
        return None;
    }
    let first = tree.get(*first)?.rect();
    match direction {
        SplitDirection::Horizontal => {
            if point.y < rect.y || point.y > rect.y + rect.height {
                return None;
            }
            Some((point.x - (first.x + first.width)).abs())
        }
        SplitDirection::Vertical => {
            if point.x < rect.x || point.x > rect.x + rect.width {
                return None;
            }
            Some((point.y - (first.y + first.height)).abs())
        }
    }
}
