use berth_core::{RatioBounds, Size, SplitDirection};

use crate::geometry;
use crate::node::NodeId;
use crate::tree::LayoutTree;

use super::SmartConstraints;

/// Ratios closer than this to the optimum are left alone.
const RATIO_SLACK: f32 = 0.1;

type CustomRule = Box<dyn Fn(&LayoutTree, NodeId) -> bool>;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    pub node: NodeId,
    pub rule: String,
}

// ──────────────────────────────────────────────
// ConstraintLayoutSolver
// ──────────────────────────────────────────────

/// Keeps splitter ratios inside the smart bounds and cached rects inside
/// each node's size bounds. Named rules added with
/// [`add_constraint`](Self::add_constraint) return whether a node passes.
pub struct ConstraintLayoutSolver {
    constraints: SmartConstraints,
    custom: Vec<(String, CustomRule)>,
}

impl ConstraintLayoutSolver {
    pub fn new(constraints: SmartConstraints) -> Self {
        Self {
            constraints,
            custom: Vec::new(),
        }
    }

    pub fn set_constraints(&mut self, constraints: SmartConstraints) {
        self.constraints = constraints;
    }

    /// Register a rule; a rule with the same name is replaced.
    pub fn add_constraint(&mut self, name: &str, rule: impl Fn(&LayoutTree, NodeId) -> bool + 'static) {
        self.remove_constraint(name);
        self.custom.push((name.to_string(), Box::new(rule)));
    }

    pub fn remove_constraint(&mut self, name: &str) -> bool {
        let before = self.custom.len();
        self.custom.retain(|(n, _)| n != name);
        self.custom.len() != before
    }

    pub fn constraint_names(&self) -> Vec<&str> {
        self.custom.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Clamp ratios and rects. Returns how many nodes changed.
    pub fn solve(&self, tree: &mut LayoutTree) -> usize {
        let bounds = self.constraints.ratio_bounds;
        let mut ratios = Vec::new();
        let mut rects = Vec::new();
        tree.traverse_nodes(|id, node| {
            if node.is_splitter() && !node.is_protected() && !bounds.contains(node.ratio()) {
                ratios.push((id, bounds.clamp(node.ratio())));
            }
            let rect = node.rect();
            if !rect.is_empty() && !geometry::validate_constraints(node.constraints(), rect) {
                rects.push((id, geometry::enforce_constraints(node.constraints(), rect)));
            }
        });

        let changed = ratios.len() + rects.len();
        for (id, ratio) in ratios {
            tree.adjust_ratio(id, ratio);
        }
        for (id, rect) in rects {
            if let Some(node) = tree.get_mut(id) {
                node.rect = rect;
            }
        }
        changed
    }

    pub fn violations(&self, tree: &LayoutTree) -> Vec<ConstraintViolation> {
        let bounds = self.constraints.ratio_bounds;
        let min = self.constraints.min_panel_size;
        let mut out = Vec::new();
        tree.traverse_nodes(|id, node| {
            if node.is_splitter() && !node.is_protected() && !bounds.contains(node.ratio()) {
                out.push(ConstraintViolation {
                    node: id,
                    rule: format!("ratio {:.2} outside [{}, {}]", node.ratio(), bounds.min, bounds.max),
                });
            }
            let rect = node.rect();
            if node.is_panel() && !rect.is_empty() && (rect.width < min.width || rect.height < min.height) {
                out.push(ConstraintViolation {
                    node: id,
                    rule: format!("panel {}x{} below minimum {}x{}", rect.width, rect.height, min.width, min.height),
                });
            }
            if !rect.is_empty() && !geometry::validate_constraints(node.constraints(), rect) {
                out.push(ConstraintViolation {
                    node: id,
                    rule: "rect outside node size bounds".to_string(),
                });
            }
            for (name, rule) in &self.custom {
                if !rule(tree, id) {
                    out.push(ConstraintViolation {
                        node: id,
                        rule: name.clone(),
                    });
                }
            }
        });
        out
    }

    pub fn validate(&self, tree: &LayoutTree) -> bool {
        self.violations(tree).is_empty()
    }
}

// ──────────────────────────────────────────────
// SplitterOptimizer
// ──────────────────────────────────────────────

/// Panel-count driven splitter ratios and window-size presets.
#[derive(Debug, Clone, Copy)]
pub struct SplitterOptimizer {
    bounds: RatioBounds,
}

impl SplitterOptimizer {
    pub fn new(bounds: RatioBounds) -> Self {
        Self { bounds }
    }

    /// Share of panels on the first side, clamped to the bounds.
    pub fn optimal_ratio(&self, tree: &LayoutTree, splitter: NodeId) -> Option<f32> {
        let node = tree.get(splitter).filter(|n| n.is_splitter())?;
        let [first, second] = node.children() else {
            return None;
        };
        let left = tree.subtree_panel_count(*first);
        let total = left + tree.subtree_panel_count(*second);
        if total == 0 {
            return Some(self.bounds.clamp(0.5));
        }
        Some(self.bounds.clamp(left as f32 / total as f32))
    }

    /// Move unprotected, uncustomized splitters to their optimal ratio when
    /// it is more than a tenth away. Returns how many moved.
    pub fn optimize_all(&self, tree: &mut LayoutTree) -> usize {
        let mut updates = Vec::new();
        tree.traverse_splitters(|id, node| {
            if node.is_protected() || node.ratio_customized() {
                return;
            }
            if let Some(optimal) = self.optimal_ratio(tree, id) {
                if (optimal - node.ratio()).abs() > RATIO_SLACK {
                    updates.push((id, optimal));
                }
            }
        });
        for (id, ratio) in &updates {
            tree.adjust_ratio(*id, *ratio);
        }
        updates.len()
    }

    /// Narrow windows favor the primary content.
    pub fn auto_adjust_for_window(&self, tree: &mut LayoutTree, window: Size) -> usize {
        let mut updates = Vec::new();
        tree.traverse_splitters(|id, node| {
            if node.is_protected() {
                return;
            }
            let ratio = match node.direction() {
                Some(SplitDirection::Horizontal) if window.width < 800.0 => Some(0.3),
                Some(SplitDirection::Horizontal) if window.width > 1600.0 => Some(0.4),
                Some(SplitDirection::Vertical) if window.height < 600.0 => Some(0.7),
                _ => None,
            };
            if let Some(ratio) = ratio {
                updates.push((id, ratio));
            }
        });
        for (id, ratio) in &updates {
            tree.adjust_ratio(*id, *ratio);
        }
        updates.len()
    }

    /// A splitter with fewer than two children, or only empty ones.
    pub fn should_merge(&self, tree: &LayoutTree, splitter: NodeId) -> bool {
        let Some(node) = tree.get(splitter).filter(|n| n.is_splitter()) else {
            return false;
        };
        node.children().len() < 2
            || node
                .children()
                .iter()
                .all(|c| tree.get(*c).is_some_and(|n| n.is_empty()))
    }
}
