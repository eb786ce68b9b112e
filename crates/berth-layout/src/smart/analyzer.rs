use crate::node::{NodeId, NodeKind};
use crate::tree::LayoutTree;

use super::SmartConstraints;

/// Splitters outside this band count as unbalanced.
const BALANCED_BAND: (f32, f32) = (0.2, 0.8);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnalyzerMetrics {
    pub space_utilization: f32,
    pub balance_score: f32,
    pub accessibility_score: f32,
    pub complexity_score: f32,
    pub splitter_count: usize,
    pub empty_area_count: usize,
    pub deep_nesting_count: usize,
    /// Mean depth of panel nodes.
    pub average_depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    UnbalancedSplitter,
    RedundantSplitter,
    EmptyArea,
    DeepNesting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutProblem {
    pub kind: ProblemKind,
    pub node: NodeId,
    pub description: String,
    /// In `[0, 1]`; fixes run highest first.
    pub severity: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptimizationResult {
    pub success: bool,
    pub problems_fixed: usize,
    pub splitters_merged: usize,
    pub empty_areas_removed: usize,
    /// Quality after the fixes minus quality before.
    pub improvement_score: f32,
    pub summary: String,
}

#[derive(Debug, Default)]
struct Walk {
    splitters: usize,
    balance_sum: f32,
    empty: usize,
    deep: usize,
    panel_area: f32,
    panels: usize,
    depth_sum: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutAnalyzer {
    constraints: SmartConstraints,
}

impl LayoutAnalyzer {
    pub fn new(constraints: SmartConstraints) -> Self {
        Self { constraints }
    }

    pub fn analyze(&self, tree: &LayoutTree) -> AnalyzerMetrics {
        let mut walk = Walk::default();
        self.visit(tree, tree.root(), 0, &mut walk);

        let root_area = tree.get(tree.root()).map(|n| n.rect().area()).unwrap_or(0.0);
        let space_utilization = if root_area > 0.0 {
            (walk.panel_area / root_area).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let balance_score = if walk.splitters > 0 {
            walk.balance_sum / walk.splitters as f32
        } else {
            1.0
        };
        let complexity_score = walk.splitters as f32 / (walk.splitters + walk.empty + 1) as f32;
        let average_depth = if walk.panels > 0 {
            walk.depth_sum as f32 / walk.panels as f32
        } else {
            0.0
        };

        AnalyzerMetrics {
            space_utilization,
            balance_score,
            accessibility_score: (1.0 - 0.1 * walk.deep as f32).clamp(0.0, 1.0),
            complexity_score,
            splitter_count: walk.splitters,
            empty_area_count: walk.empty,
            deep_nesting_count: walk.deep,
            average_depth,
        }
    }

    fn visit(&self, tree: &LayoutTree, id: NodeId, depth: usize, walk: &mut Walk) {
        let Some(node) = tree.get(id) else {
            return;
        };
        if depth > self.constraints.max_nesting_depth {
            walk.deep += 1;
        }
        match node.kind() {
            NodeKind::Panel(_) => {
                walk.panels += 1;
                walk.depth_sum += depth;
                walk.panel_area += node.rect().area();
            }
            // Skeleton nodes keep their role ratios and may sit empty.
            NodeKind::Splitter(_) if node.is_protected() => {}
            NodeKind::Splitter(_) => {
                walk.splitters += 1;
                walk.balance_sum += 1.0 - (node.ratio() - 0.5).abs() * 2.0;
            }
            NodeKind::Container | NodeKind::TabGroup => {
                if node.children().is_empty() && !node.is_protected() && id != tree.root() {
                    walk.empty += 1;
                }
            }
        }
        for &child in node.children() {
            self.visit(tree, child, depth + 1, walk);
        }
    }

    pub fn quality_score(&self, metrics: &AnalyzerMetrics) -> f32 {
        let score = 0.30 * metrics.space_utilization
            + 0.25 * metrics.balance_score
            + 0.20 * metrics.accessibility_score
            + 0.25 * (1.0 - metrics.complexity_score)
            - 0.05 * metrics.empty_area_count as f32
            - 0.03 * metrics.deep_nesting_count as f32;
        score.clamp(0.0, 1.0)
    }

    /// One problem per offending node, in tree order.
    pub fn detect_problems(&self, tree: &LayoutTree) -> Vec<LayoutProblem> {
        let limit = self.constraints.max_nesting_depth;
        let mut problems = Vec::new();
        tree.traverse_nodes(|id, node| {
            let depth = tree.depth(id);
            if node.is_splitter() {
                let ratio = node.ratio();
                if node.children().len() < 2 {
                    problems.push(LayoutProblem {
                        kind: ProblemKind::RedundantSplitter,
                        node: id,
                        description: format!("splitter has {} children", node.children().len()),
                        severity: 0.7,
                    });
                } else if !node.is_protected() && !(BALANCED_BAND.0..=BALANCED_BAND.1).contains(&ratio) {
                    problems.push(LayoutProblem {
                        kind: ProblemKind::UnbalancedSplitter,
                        node: id,
                        description: format!("splitter ratio {ratio:.2} is lopsided"),
                        severity: ((ratio - 0.5).abs() * 2.0).min(1.0),
                    });
                }
            } else if node.is_container() && node.children().is_empty() && !node.is_protected() && id != tree.root() {
                problems.push(LayoutProblem {
                    kind: ProblemKind::EmptyArea,
                    node: id,
                    description: "container holds nothing".to_string(),
                    severity: 0.5,
                });
            }
            if depth > limit {
                problems.push(LayoutProblem {
                    kind: ProblemKind::DeepNesting,
                    node: id,
                    description: format!("nested {depth} levels deep"),
                    severity: (0.3 + 0.1 * (depth - limit) as f32).min(1.0),
                });
            }
        });
        problems
    }

    /// Fix detected problems, most severe first.
    pub fn auto_fix_problems(&self, tree: &mut LayoutTree) -> OptimizationResult {
        let before = self.quality_score(&self.analyze(tree));
        let mut problems = self.detect_problems(tree);
        problems.sort_by(|a, b| b.severity.total_cmp(&a.severity));

        let mut result = OptimizationResult::default();
        let mut compacted = false;
        for problem in &problems {
            if !tree.contains(problem.node) {
                continue;
            }
            let fixed = match problem.kind {
                ProblemKind::UnbalancedSplitter => tree.adjust_ratio(problem.node, self.constraints.ideal_ratio),
                ProblemKind::RedundantSplitter => {
                    let removed = tree.cleanup_candidates(&[problem.node]);
                    result.splitters_merged += removed;
                    removed > 0
                }
                ProblemKind::EmptyArea => {
                    let removed = tree.cleanup_candidates(&[problem.node]);
                    result.empty_areas_removed += removed;
                    removed > 0
                }
                ProblemKind::DeepNesting if !compacted => {
                    compacted = true;
                    tree.compact() > 0
                }
                ProblemKind::DeepNesting => false,
            };
            if fixed {
                result.problems_fixed += 1;
            }
        }

        let after = self.quality_score(&self.analyze(tree));
        result.improvement_score = after - before;
        result.success = tree.check_invariants().is_ok();
        result.summary = format!(
            "fixed {} of {} problems, quality {before:.2} -> {after:.2}",
            result.problems_fixed,
            problems.len()
        );
        log::debug!("{}", result.summary);
        result
    }
}
