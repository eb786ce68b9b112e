//! Heuristic decision layer over [`LayoutEngine`]: title-driven placement,
//! dock scoring, quality analysis and automatic fixes.

mod analyzer;
mod docking;
mod solver;

use std::collections::HashMap;

use berth_core::{ClientArea, DockArea, DockPosition, PanelHandle, PanelId, RatioBounds, Size};
use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::engine::LayoutEngine;
use crate::error::{LayoutError, Result};

pub use analyzer::{AnalyzerMetrics, LayoutAnalyzer, LayoutProblem, OptimizationResult, ProblemKind};
pub use docking::{AutoDockOptimizer, SmartDockingDecision, HISTORY_LIMIT};
pub use solver::{ConstraintLayoutSolver, ConstraintViolation, SplitterOptimizer};

/// Quality below which a layout change triggers an automatic optimize.
const REOPTIMIZE_BELOW: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartConstraints {
    pub min_panel_size: Size,
    pub preferred_panel_size: Size,
    pub ideal_ratio: f32,
    pub ratio_bounds: RatioBounds,
    pub max_nesting_depth: usize,
    pub min_space_utilization: f32,
    pub target_balance: f32,
    pub auto_optimize: bool,
    pub auto_balance: bool,
    pub auto_cleanup: bool,
    pub smart_docking: bool,
    pub adaptive_layout: bool,
}

impl Default for SmartConstraints {
    fn default() -> Self {
        Self {
            min_panel_size: Size::new(150.0, 100.0),
            preferred_panel_size: Size::new(300.0, 200.0),
            ideal_ratio: 0.5,
            ratio_bounds: RatioBounds::new(0.15, 0.85),
            max_nesting_depth: 5,
            min_space_utilization: 0.7,
            target_balance: 0.8,
            auto_optimize: true,
            auto_balance: true,
            auto_cleanup: true,
            smart_docking: true,
            adaptive_layout: true,
        }
    }
}

impl SmartConstraints {
    pub fn validate(&self) -> Result<()> {
        let bounds = self.ratio_bounds;
        if !(0.0..=1.0).contains(&bounds.min) || !(0.0..=1.0).contains(&bounds.max) || bounds.min > bounds.max {
            return Err(LayoutError::Config(format!(
                "smart ratio bounds [{}, {}] must be ordered and within [0, 1]",
                bounds.min, bounds.max
            )));
        }
        if !bounds.contains(self.ideal_ratio) {
            return Err(LayoutError::Config(format!(
                "ideal ratio {} lies outside the smart ratio bounds",
                self.ideal_ratio
            )));
        }
        if self.min_panel_size.width < 0.0 || self.min_panel_size.height < 0.0 {
            return Err(LayoutError::Config("smart minimum panel size cannot be negative".into()));
        }
        if self.preferred_panel_size.width < self.min_panel_size.width
            || self.preferred_panel_size.height < self.min_panel_size.height
        {
            return Err(LayoutError::Config("preferred panel size is below the minimum".into()));
        }
        Ok(())
    }
}

/// Dock area suggested by a panel's title. "toolbar" is checked before
/// "tool".
pub fn area_for_title(title: &str) -> DockArea {
    let title = title.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| title.contains(w));
    if has(&["tree", "explorer", "properties", "inspector"]) {
        DockArea::Left
    } else if has(&["output", "console", "message", "log"]) {
        DockArea::Bottom
    } else if has(&["toolbar", "menu"]) {
        DockArea::Top
    } else if has(&["tool", "palette"]) {
        DockArea::Right
    } else {
        DockArea::Center
    }
}

// ──────────────────────────────────────────────
// SmartLayoutEngine
// ──────────────────────────────────────────────

pub struct SmartLayoutEngine {
    engine: LayoutEngine,
    constraints: SmartConstraints,
    docking: AutoDockOptimizer,
    analyzer: LayoutAnalyzer,
    solver: ConstraintLayoutSolver,
    splitters: SplitterOptimizer,
    usage: HashMap<String, usize>,
}

impl SmartLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self::with_engine(LayoutEngine::new(config))
    }

    pub fn with_engine(engine: LayoutEngine) -> Self {
        let constraints = engine.config().smart.clone();
        Self {
            analyzer: LayoutAnalyzer::new(constraints.clone()),
            solver: ConstraintLayoutSolver::new(constraints.clone()),
            splitters: SplitterOptimizer::new(constraints.ratio_bounds),
            docking: AutoDockOptimizer::new(),
            engine,
            constraints,
            usage: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LayoutEngine {
        &mut self.engine
    }

    pub fn constraints(&self) -> &SmartConstraints {
        &self.constraints
    }

    pub fn set_constraints(&mut self, constraints: SmartConstraints) {
        self.analyzer = LayoutAnalyzer::new(constraints.clone());
        self.solver.set_constraints(constraints.clone());
        self.splitters = SplitterOptimizer::new(constraints.ratio_bounds);
        self.constraints = constraints;
    }

    pub fn docking(&self) -> &AutoDockOptimizer {
        &self.docking
    }

    pub fn solver_mut(&mut self) -> &mut ConstraintLayoutSolver {
        &mut self.solver
    }

    // ──────────────────────────────────────────
    // Placement
    // ──────────────────────────────────────────

    /// Add `panel` to `area`, or to the area its title suggests.
    pub fn smart_add_panel(&mut self, panel: PanelHandle, area: Option<DockArea>) -> bool {
        let area = area.unwrap_or_else(|| area_for_title(&panel.title));
        let title = panel.title.clone();
        if !self.engine.add_panel(panel, area, None) {
            return false;
        }
        self.learn_from_user_action(&title, area.into());
        self.on_layout_changed();
        true
    }

    /// Dock `panel` at the best scoring position. An empty layout, or one
    /// with smart docking off, falls back to [`smart_add_panel`](Self::smart_add_panel).
    pub fn smart_dock_panel(&mut self, panel: PanelHandle) -> Option<SmartDockingDecision> {
        if !self.constraints.smart_docking {
            self.smart_add_panel(panel, None);
            return None;
        }
        let Some(decision) = self.docking.find_best_docking_position(self.engine.tree(), &panel) else {
            self.smart_add_panel(panel, None);
            return None;
        };
        log::debug!("smart docking {panel}: {}", decision.reasoning);

        let target_panel = self
            .engine
            .tree()
            .get(decision.target)
            .and_then(|n| n.panel())
            .map(|p| p.id);
        let docked = match target_panel {
            Some(target) => self.engine.dock_panel(&panel, target, decision.position).is_ok(),
            None => self.engine.add_panel(panel.clone(), decision.position.area(), None),
        };
        if !docked {
            log::warn!("smart docking of {panel} failed");
            return None;
        }
        self.on_panel_docked(&panel, decision.position);
        Some(decision)
    }

    pub fn remove_panel(&mut self, panel: PanelId) -> bool {
        if !self.engine.remove_panel(panel) {
            return false;
        }
        self.on_panel_undocked(panel);
        true
    }

    // ──────────────────────────────────────────
    // Hooks
    // ──────────────────────────────────────────

    pub fn on_layout_changed(&mut self) {
        if !self.constraints.auto_optimize {
            return;
        }
        let quality = self.quality_score();
        if quality < REOPTIMIZE_BELOW {
            log::debug!("layout quality {quality:.2} is low, optimizing");
            self.engine.optimize_layout();
        }
    }

    pub fn on_panel_docked(&mut self, panel: &PanelHandle, position: DockPosition) {
        self.learn_from_user_action(&panel.title, position);
        self.on_layout_changed();
    }

    pub fn on_panel_undocked(&mut self, _panel: PanelId) {
        if self.constraints.auto_cleanup {
            self.engine.settle();
            self.engine.tree_mut().cleanup_empty_nodes();
            self.engine.request_layout_update();
        }
        self.on_layout_changed();
    }

    pub fn on_window_resized(&mut self, window: &dyn ClientArea) {
        if self.constraints.adaptive_layout {
            let size = window.client_rect().size();
            let adjusted = self.splitters.auto_adjust_for_window(self.engine.tree_mut(), size);
            log::trace!("adapted {adjusted} splitters to {}x{}", size.width, size.height);
        }
        self.engine.on_window_resized(window);
    }

    // ──────────────────────────────────────────
    // Learning
    // ──────────────────────────────────────────

    pub fn learn_from_user_action(&mut self, title: &str, position: DockPosition) {
        self.docking.record_placement(title, position);
        *self.usage.entry(title.to_string()).or_default() += 1;
    }

    pub fn usage_count(&self, title: &str) -> usize {
        self.usage.get(title).copied().unwrap_or(0)
    }

    // ──────────────────────────────────────────
    // Analysis
    // ──────────────────────────────────────────

    pub fn analyze(&self) -> AnalyzerMetrics {
        self.analyzer.analyze(self.engine.tree())
    }

    pub fn quality_score(&self) -> f32 {
        self.analyzer.quality_score(&self.analyze())
    }

    pub fn detect_problems(&self) -> Vec<LayoutProblem> {
        self.analyzer.detect_problems(self.engine.tree())
    }

    pub fn auto_fix_problems(&mut self) -> OptimizationResult {
        self.engine.settle();
        let result = self.analyzer.auto_fix_problems(self.engine.tree_mut());
        self.engine.request_layout_update();
        result
    }

    /// Clamp ratios and sizes to the smart constraints.
    pub fn solve_constraints(&mut self) -> usize {
        let changed = self.solver.solve(self.engine.tree_mut());
        if changed > 0 {
            self.engine.request_layout_update();
        }
        changed
    }

    /// Move splitters toward their panel-count ratio.
    pub fn optimize_splitters(&mut self) -> usize {
        let changed = self.splitters.optimize_all(self.engine.tree_mut());
        if changed > 0 {
            self.engine.request_layout_update();
        }
        changed
    }
}
