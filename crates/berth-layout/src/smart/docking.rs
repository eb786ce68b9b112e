use std::collections::{HashMap, VecDeque};

use berth_core::{DockPosition, PanelHandle};

use crate::node::NodeId;
use crate::tree::LayoutTree;

/// Placements remembered per title.
pub const HISTORY_LIMIT: usize = 10;

const BASE_SCORE: f32 = 0.5;
const SIMILAR_TITLE_BONUS: f32 = 0.2;
const DEPTH_PENALTY: f32 = 0.05;
const HISTORY_BONUS: f32 = 0.15;
/// Options scoring above this are listed as alternatives.
const ALTERNATIVE_THRESHOLD: f32 = 0.6;

/// Title keywords and the bonus each dock position earns for them.
const KEYWORD_BONUSES: &[(&[&str], &[(DockPosition, f32)])] = &[
    (&["tree", "explorer"], &[(DockPosition::Left, 0.3), (DockPosition::Right, 0.1)]),
    (&["output", "console"], &[(DockPosition::Bottom, 0.3)]),
    (&["properties", "inspector"], &[(DockPosition::Right, 0.2), (DockPosition::Left, 0.1)]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct SmartDockingDecision {
    pub target: NodeId,
    pub position: DockPosition,
    pub confidence: f32,
    pub reasoning: String,
    /// Other options above the alternative threshold, best first.
    pub alternatives: Vec<(NodeId, DockPosition, f32)>,
}

/// Scores candidate dock positions for a panel from its title, the target's
/// title and depth, and where panels with the same title went before.
#[derive(Debug, Clone, Default)]
pub struct AutoDockOptimizer {
    history: HashMap<String, VecDeque<DockPosition>>,
}

impl AutoDockOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_placement(&mut self, title: &str, position: DockPosition) {
        let entries = self.history.entry(title.to_lowercase()).or_default();
        entries.push_back(position);
        while entries.len() > HISTORY_LIMIT {
            entries.pop_front();
        }
    }

    pub fn history(&self, title: &str) -> Vec<DockPosition> {
        self.history
            .get(&title.to_lowercase())
            .map(|entries| entries.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Score in `[0, 1]` for docking `panel` at `position` against `target`.
    pub fn score_docking_option(
        &self,
        tree: &LayoutTree,
        panel: &PanelHandle,
        target: NodeId,
        position: DockPosition,
    ) -> f32 {
        self.score_parts(tree, panel, target, position).0
    }

    fn score_parts(
        &self,
        tree: &LayoutTree,
        panel: &PanelHandle,
        target: NodeId,
        position: DockPosition,
    ) -> (f32, Vec<String>) {
        let title = panel.title.to_lowercase();
        let mut score = BASE_SCORE;
        let mut reasons = Vec::new();

        for (keywords, bonuses) in KEYWORD_BONUSES {
            let Some(keyword) = keywords.iter().find(|k| title.contains(*k)) else {
                continue;
            };
            if let Some((_, bonus)) = bonuses.iter().find(|(p, _)| *p == position) {
                score += bonus;
                reasons.push(format!("\"{keyword}\" panels suit {position:?}"));
            }
        }

        let target_title = tree
            .get(target)
            .and_then(|n| n.panel())
            .map(|p| p.title.to_lowercase());
        if let Some(other) = target_title.filter(|t| !t.is_empty() && !title.is_empty()) {
            if other.contains(&title) || title.contains(&other) {
                score += SIMILAR_TITLE_BONUS;
                reasons.push("groups with a similar panel".to_string());
            }
        }

        let depth = tree.depth(target);
        score -= DEPTH_PENALTY * depth as f32;

        if self
            .history
            .get(&title)
            .is_some_and(|entries| entries.contains(&position))
        {
            score += HISTORY_BONUS;
            reasons.push("used before for this panel".to_string());
        }

        (score.clamp(0.0, 1.0), reasons)
    }

    /// Every panel node and empty container below the root, in tree order.
    /// The panel being docked is skipped.
    fn candidates(tree: &LayoutTree, panel: &PanelHandle) -> Vec<NodeId> {
        let mut out = Vec::new();
        tree.traverse_nodes(|id, node| {
            let is_self = node.panel().is_some_and(|p| p.id == panel.id);
            let open_container = id != tree.root() && node.is_container() && node.children().is_empty();
            if (node.is_panel() && !is_self) || open_container {
                out.push(id);
            }
        });
        out
    }

    /// Highest scoring target and position. Ties keep the first option seen.
    pub fn find_best_docking_position(&self, tree: &LayoutTree, panel: &PanelHandle) -> Option<SmartDockingDecision> {
        let mut scored = Vec::new();
        for target in Self::candidates(tree, panel) {
            for position in DockPosition::ALL {
                let (score, reasons) = self.score_parts(tree, panel, target, position);
                scored.push((target, position, score, reasons));
            }
        }

        let mut best: Option<usize> = None;
        for (index, option) in scored.iter().enumerate() {
            if best.map_or(true, |b| option.2 > scored[b].2) {
                best = Some(index);
            }
        }
        let best = best?;
        let (target, position, confidence, reasons) = scored[best].clone();

        let mut alternatives: Vec<(NodeId, DockPosition, f32)> = scored
            .iter()
            .enumerate()
            .filter(|(index, option)| *index != best && option.2 > ALTERNATIVE_THRESHOLD)
            .map(|(_, (t, p, s, _))| (*t, *p, *s))
            .collect();
        alternatives.sort_by(|a, b| b.2.total_cmp(&a.2));

        let reasoning = if reasons.is_empty() {
            format!("{position:?} scored {confidence:.2}")
        } else {
            format!("{position:?} scored {confidence:.2}: {}", reasons.join(", "))
        };
        Some(SmartDockingDecision {
            target,
            position,
            confidence,
            reasoning,
            alternatives,
        })
    }
}
