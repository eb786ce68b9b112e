//! Pluggable placement policies sharing one [`LayoutTree`].

pub mod flexible;
pub mod hybrid;
pub mod ide;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use berth_core::{DockArea, PanelHandle, PanelId, Rect, Size};
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::node::{LayoutNode, NodeId, TabBarPosition};
use crate::serialize;
use crate::tree::LayoutTree;

pub use flexible::FlexibleLayoutStrategy;
pub use hybrid::HybridLayoutStrategy;
pub use ide::IdeLayoutStrategy;

// ──────────────────────────────────────────────
// StrategyKind: factory
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Ide,
    Flexible,
    Hybrid,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [StrategyKind::Ide, StrategyKind::Flexible, StrategyKind::Hybrid];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Ide => "IDE",
            StrategyKind::Flexible => "Flexible",
            StrategyKind::Hybrid => "Hybrid",
        }
    }

    /// Header tag of layouts this strategy writes.
    pub fn format_tag(self) -> String {
        format!("{}Layout", self.name())
    }

    pub fn create(self) -> Box<dyn LayoutStrategy> {
        match self {
            StrategyKind::Ide => Box::new(IdeLayoutStrategy::new()),
            StrategyKind::Flexible => Box::new(FlexibleLayoutStrategy::new()),
            StrategyKind::Hybrid => Box::new(HybridLayoutStrategy::new()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LayoutError::Config(format!("unknown layout strategy '{s}'")))
    }
}

// ──────────────────────────────────────────────
// StrategyState: error slot and parameter bag
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct StrategyState {
    last_error: Option<String>,
    params: BTreeMap<String, String>,
    defaults: BTreeMap<String, String>,
}

impl StrategyState {
    pub fn with_defaults(defaults: &[(&str, &str)]) -> Self {
        let defaults: BTreeMap<String, String> = defaults
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            last_error: None,
            params: defaults.clone(),
            defaults,
        }
    }

    /// Record a failure for `last_error`.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.last_error = Some(message);
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Unknown keys are rejected.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match self.params.get_mut(key) {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }

    pub fn reset(&mut self) {
        self.params = self.defaults.clone();
    }

    pub fn bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v == "true" || v == "1")
    }

    pub fn f32(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

// ──────────────────────────────────────────────
// Trait: LayoutStrategy
// ──────────────────────────────────────────────

/// A placement policy. Every strategy works on a caller-owned [`LayoutTree`]
/// through the shared primitives in [`ops`](crate::ops), so a dock manager
/// can swap strategies without changing call sites.
pub trait LayoutStrategy {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn state(&self) -> &StrategyState;
    fn state_mut(&mut self) -> &mut StrategyState;

    // ── Lifecycle ──

    /// Build whatever fixed structure the strategy needs on `tree`.
    fn create_layout(&mut self, tree: &mut LayoutTree);

    fn initialize_layout(&mut self, tree: &mut LayoutTree) {
        self.create_layout(tree);
    }

    fn destroy_layout(&mut self, tree: &mut LayoutTree) {
        tree.clear();
    }

    // ── Panels ──

    fn add_panel(&mut self, tree: &mut LayoutTree, panel: PanelHandle, area: DockArea) -> bool;

    /// Detach the panel and run conservative cleanup.
    fn remove_panel(&mut self, tree: &mut LayoutTree, panel: PanelId) -> bool {
        if tree.detach_panel(panel).is_none() {
            return false;
        }
        tree.cleanup_empty_nodes();
        true
    }

    fn move_panel(&mut self, tree: &mut LayoutTree, panel: PanelId, area: DockArea) -> bool {
        if !self.can_move_panel(tree, panel, area) {
            return false;
        }
        let Some(handle) = tree
            .find_panel(panel)
            .and_then(|id| tree.get(id))
            .and_then(|n| n.panel().cloned())
        else {
            return false;
        };
        self.remove_panel(tree, panel) && self.add_panel(tree, handle, area)
    }

    fn swap_panels(&mut self, tree: &mut LayoutTree, a: PanelId, b: PanelId) -> bool {
        tree.swap_panels(a, b)
    }

    /// Node a new panel for `area` would be placed under.
    fn find_best_insertion_point(&mut self, tree: &mut LayoutTree, area: DockArea) -> Option<NodeId>;

    // ── Validation ──

    fn validate_layout(&self, tree: &LayoutTree) -> bool {
        tree.check_invariants().is_ok()
    }

    fn can_add_panel(&self, tree: &LayoutTree, panel: &PanelHandle, _area: DockArea) -> bool {
        tree.find_panel(panel.id).is_none()
    }

    fn can_remove_panel(&self, tree: &LayoutTree, panel: PanelId) -> bool {
        tree.find_panel(panel).is_some()
    }

    fn can_move_panel(&self, tree: &LayoutTree, panel: PanelId, _area: DockArea) -> bool {
        tree.find_panel(panel).is_some()
    }

    // ── Maintenance ──

    fn optimize_layout(&mut self, tree: &mut LayoutTree);

    fn compact_layout(&mut self, tree: &mut LayoutTree) {
        tree.compact();
    }

    /// Return every splitter to the default ratio for its role.
    fn balance_splitters(&mut self, tree: &mut LayoutTree) {
        let mut splitters = Vec::new();
        tree.traverse_splitters(|id, _| splitters.push(id));
        for id in splitters {
            tree.reset_ratio(id);
        }
    }

    fn minimize_empty_space(&mut self, tree: &mut LayoutTree) {
        tree.cleanup_empty_nodes();
    }

    // ── Splitter and container properties ──

    fn splitter_ratio(&self, tree: &LayoutTree, node: NodeId) -> Option<f32> {
        tree.ratio(node)
    }

    fn set_splitter_ratio(&mut self, tree: &mut LayoutTree, node: NodeId, ratio: f32) -> bool {
        tree.set_ratio(node, ratio)
    }

    fn sash_position(&self, tree: &LayoutTree, node: NodeId) -> Option<f32> {
        tree.sash_position(node)
    }

    fn set_sash_position(&mut self, tree: &mut LayoutTree, node: NodeId, pixels: f32) -> bool {
        tree.set_sash_position(node, pixels)
    }

    fn tab_bar_position(&self, tree: &LayoutTree, node: NodeId) -> Option<TabBarPosition> {
        tree.get(node).filter(|n| n.is_tab_group()).map(|n| n.tab_bar())
    }

    fn set_tab_bar_position(&mut self, tree: &mut LayoutTree, node: NodeId, position: TabBarPosition) -> bool {
        tree.set_tab_bar(node, position)
    }

    fn active_tab(&self, tree: &LayoutTree, node: NodeId) -> Option<usize> {
        tree.get(node).filter(|n| n.is_tab_group()).map(|n| n.active_tab())
    }

    fn set_active_tab(&mut self, tree: &mut LayoutTree, node: NodeId, index: usize) -> bool {
        tree.set_active_tab(node, index)
    }

    // ── Sizes and panel queries ──

    fn minimum_size(&self, tree: &LayoutTree) -> Size;

    fn best_size(&self, tree: &LayoutTree) -> Size;

    fn panel_bounds(&self, tree: &LayoutTree, panel: PanelId) -> Rect {
        tree.find_panel(panel)
            .and_then(|id| tree.get(id))
            .map(|n| n.rect())
            .unwrap_or(Rect::EMPTY)
    }

    fn panel_area(&self, tree: &LayoutTree, panel: PanelId) -> Option<DockArea> {
        tree.find_panel(panel).and_then(|id| tree.get(id)).and_then(|n| n.dock_area())
    }

    fn panel_depth(&self, tree: &LayoutTree, panel: PanelId) -> Option<usize> {
        tree.find_panel(panel).map(|id| tree.depth(id))
    }

    // ── Traversal ──

    fn traverse_panels(&self, tree: &LayoutTree, visit: &mut dyn FnMut(NodeId, &PanelHandle)) {
        tree.traverse_panels(visit);
    }

    fn traverse_splitters(&self, tree: &LayoutTree, visit: &mut dyn FnMut(NodeId, &LayoutNode)) {
        tree.traverse_splitters(visit);
    }

    fn traverse_containers(&self, tree: &LayoutTree, visit: &mut dyn FnMut(NodeId, &LayoutNode)) {
        tree.traverse_containers(visit);
    }

    fn traverse_nodes(&self, tree: &LayoutTree, visit: &mut dyn FnMut(NodeId, &LayoutNode)) {
        tree.traverse_nodes(visit);
    }

    // ── Persistence ──

    fn serialize_layout(&self, tree: &LayoutTree) -> String {
        serialize::encode(tree, &self.kind().format_tag())
    }

    /// Replace `tree` with the decoded layout. On failure `tree` is left
    /// untouched and the reason is kept in `last_error`.
    fn deserialize_layout(&mut self, tree: &mut LayoutTree, data: &str) -> bool {
        let decoded = match serialize::decode(data, &self.kind().format_tag(), tree.bounds()) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.state_mut().fail(e.to_string());
                return false;
            }
        };
        if !self.validate_layout(&decoded) {
            let message = format!("decoded layout is not a valid {} layout", self.name());
            self.state_mut().fail(message);
            return false;
        }
        *tree = decoded;
        self.state_mut().clear_error();
        true
    }

    // ── Comparison and merging ──

    fn is_layout_equal(&self, a: &LayoutTree, b: &LayoutTree) -> bool {
        shape_signature(a) == shape_signature(b)
    }

    fn can_merge_layouts(&self, target: &LayoutTree, source: &LayoutTree) -> bool {
        source
            .panel_ids()
            .iter()
            .all(|id| target.find_panel(*id).is_none())
    }

    /// Add every panel of `source` to `target`, keeping each panel's area.
    fn merge_layouts(&mut self, target: &mut LayoutTree, source: &LayoutTree) -> bool {
        if !self.can_merge_layouts(target, source) {
            self.state_mut().fail("layouts cannot be merged");
            return false;
        }
        let mut merged = true;
        for id in source.panel_ids() {
            let Some(node) = source.find_panel(id).and_then(|n| source.get(n)) else {
                continue;
            };
            let Some(panel) = node.panel().cloned() else {
                continue;
            };
            let area = node.dock_area().unwrap_or(DockArea::Center);
            merged &= self.add_panel(target, panel, area);
        }
        merged
    }

    // ── Errors ──

    fn last_error(&self) -> Option<&str> {
        self.state().last_error()
    }

    fn has_errors(&self) -> bool {
        self.state().last_error().is_some()
    }

    fn clear_last_error(&mut self) {
        self.state_mut().clear_error();
    }

    fn dump_debug_info(&self, tree: &LayoutTree) -> String {
        let dump = debug_dump(tree, self.name());
        log::debug!("{dump}");
        dump
    }

    // ── Parameters ──

    fn set_parameter(&mut self, key: &str, value: &str) -> bool {
        self.state_mut().set(key, value)
    }

    fn parameter(&self, key: &str) -> Option<String> {
        self.state().get(key).map(str::to_string)
    }

    fn available_parameters(&self) -> Vec<String> {
        self.state().keys()
    }

    fn reset_parameters(&mut self) {
        self.state_mut().reset();
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// Kinds and panel ids in tree order; ratios and rects are ignored.
pub(crate) fn shape_signature(tree: &LayoutTree) -> Vec<(String, usize)> {
    let mut out = Vec::new();
    tree.traverse_nodes(|id, node| {
        let label = match node.panel() {
            Some(panel) => format!("Panel#{}", panel.id),
            None => format!("{}:{:?}", node.kind().token(), node.direction()),
        };
        out.push((label, tree.depth(id)));
    });
    out
}

pub(crate) fn debug_dump(tree: &LayoutTree, name: &str) -> String {
    let mut out = format!("{name} layout, {} nodes\n", tree.node_count());
    tree.traverse_nodes(|id, node| {
        let indent = "  ".repeat(tree.depth(id));
        let r = node.rect();
        let detail = match (node.panel(), node.direction()) {
            (Some(panel), _) => format!(" {panel}"),
            (None, Some(direction)) => format!(" {direction:?} ratio={:.3}", node.ratio()),
            _ => String::new(),
        };
        out.push_str(&format!(
            "{indent}{}{detail} [{:?}] ({:.0},{:.0} {:.0}x{:.0})\n",
            node.kind().token(),
            node.role(),
            r.x,
            r.y,
            r.width,
            r.height
        ));
    });
    out
}
