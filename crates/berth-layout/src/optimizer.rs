//! Whole-tree maintenance passes with metrics, a snapshot cache and
//! batched edits.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use berth_core::{Clock, SystemClock};

use crate::node::{NodeId, NodeKind, NodeRole};
use crate::strategy::flexible::snap_ratio;
use crate::strategy::LayoutStrategy;
use crate::tree::LayoutTree;

/// Rough per-node footprint used for the memory estimate.
const BYTES_PER_NODE: f64 = 96.0;

const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const CACHE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationStrategy {
    None,
    #[default]
    Basic,
    Aggressive,
    Adaptive,
    /// Flags and parameters as set by the caller.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerParams {
    /// A container with more than this many panel children gets them tabbed.
    pub consolidation_threshold: usize,
    pub ratio_tolerance: f32,
    /// Node count above which memory cleanup also compacts.
    pub cleanup_threshold: usize,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            consolidation_threshold: 5,
            ratio_tolerance: 0.1,
            cleanup_threshold: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutMetrics {
    /// Time spent walking the tree for this report.
    pub creation_time: Duration,
    /// Duration of the last optimization run.
    pub calculation_time: Duration,
    pub node_count: usize,
    pub panel_count: usize,
    pub splitter_count: usize,
    pub container_count: usize,
    pub memory_kb: f64,
    pub is_optimized: bool,
}

struct CachedLayout {
    data: String,
    stored_at: Instant,
    metrics: LayoutMetrics,
}

type ProgressCallback = Box<dyn FnMut(u8, &str)>;
type BatchOp = Box<dyn FnOnce(&mut LayoutTree)>;

// ──────────────────────────────────────────────
// LayoutOptimizer
// ──────────────────────────────────────────────

pub struct LayoutOptimizer {
    strategy: OptimizationStrategy,
    node_consolidation: bool,
    splitter_optimization: bool,
    memory_optimization: bool,
    caching: bool,
    params: OptimizerParams,
    memory_limit_kb: f64,
    metrics: LayoutMetrics,
    cache: HashMap<String, CachedLayout>,
    cache_capacity: usize,
    clock: Box<dyn Clock>,
    batch: Option<Vec<BatchOp>>,
    progress: Option<ProgressCallback>,
}

impl Default for LayoutOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutOptimizer {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        let mut optimizer = Self {
            strategy: OptimizationStrategy::Basic,
            node_consolidation: true,
            splitter_optimization: true,
            memory_optimization: true,
            caching: false,
            params: OptimizerParams::default(),
            memory_limit_kb: 1024.0 * 1024.0,
            metrics: LayoutMetrics::default(),
            cache: HashMap::new(),
            cache_capacity: CACHE_CAPACITY,
            clock,
            batch: None,
            progress: None,
        };
        optimizer.set_strategy(OptimizationStrategy::Basic);
        optimizer
    }

    // ──────────────────────────────────────────
    // Settings
    // ──────────────────────────────────────────

    pub fn strategy(&self) -> OptimizationStrategy {
        self.strategy
    }

    /// Apply a preset. `Custom` keeps the current flags and parameters.
    pub fn set_strategy(&mut self, strategy: OptimizationStrategy) {
        self.strategy = strategy;
        let flags = match strategy {
            OptimizationStrategy::None => (false, false, false, false),
            OptimizationStrategy::Basic => (true, true, false, false),
            OptimizationStrategy::Aggressive | OptimizationStrategy::Adaptive => (true, true, true, true),
            OptimizationStrategy::Custom => return,
        };
        (
            self.node_consolidation,
            self.splitter_optimization,
            self.memory_optimization,
            self.caching,
        ) = flags;
        if strategy == OptimizationStrategy::Aggressive {
            self.params = OptimizerParams {
                consolidation_threshold: 3,
                ratio_tolerance: 0.05,
                cleanup_threshold: 50,
            };
        }
    }

    pub fn params(&self) -> OptimizerParams {
        self.params
    }

    pub fn set_params(&mut self, params: OptimizerParams) {
        self.strategy = OptimizationStrategy::Custom;
        self.params = params;
    }

    pub fn enable_node_consolidation(&mut self, enable: bool) {
        self.node_consolidation = enable;
    }

    pub fn enable_splitter_optimization(&mut self, enable: bool) {
        self.splitter_optimization = enable;
    }

    pub fn enable_memory_optimization(&mut self, enable: bool) {
        self.memory_optimization = enable;
    }

    pub fn enable_caching(&mut self, enable: bool) {
        self.caching = enable;
    }

    pub fn is_caching_enabled(&self) -> bool {
        self.caching
    }

    pub fn set_memory_limit(&mut self, limit_kb: usize) {
        self.memory_limit_kb = limit_kb as f64;
    }

    pub fn memory_limit(&self) -> usize {
        self.memory_limit_kb as usize
    }

    pub fn set_progress_callback(&mut self, callback: impl FnMut(u8, &str) + 'static) {
        self.progress = Some(Box::new(callback));
    }

    fn report(&mut self, percent: u8, message: &str) {
        if let Some(callback) = self.progress.as_mut() {
            callback(percent, message);
        }
    }

    // ──────────────────────────────────────────
    // Optimization
    // ──────────────────────────────────────────

    pub fn metrics(&self) -> LayoutMetrics {
        self.metrics
    }

    /// Count nodes by kind and estimate the footprint.
    pub fn analyze(&mut self, tree: &LayoutTree) -> LayoutMetrics {
        let start = Instant::now();
        let mut metrics = LayoutMetrics {
            calculation_time: self.metrics.calculation_time,
            ..LayoutMetrics::default()
        };
        tree.traverse_nodes(|_, node| {
            metrics.node_count += 1;
            match node.kind() {
                NodeKind::Panel(_) => metrics.panel_count += 1,
                NodeKind::Splitter(_) => metrics.splitter_count += 1,
                NodeKind::Container | NodeKind::TabGroup => metrics.container_count += 1,
            }
        });
        metrics.memory_kb = metrics.node_count as f64 * BYTES_PER_NODE / 1024.0;
        metrics.is_optimized = metrics.node_count < 100 && metrics.memory_kb < self.memory_limit_kb / 2.0;
        metrics.creation_time = start.elapsed();
        self.metrics = metrics;
        metrics
    }

    pub fn should_optimize(&self) -> bool {
        self.metrics.node_count > 50
            || self.metrics.memory_kb > self.memory_limit_kb / 4.0
            || self.metrics.splitter_count > 20
    }

    /// Run the enabled passes over `tree`. Returns whether any pass ran.
    pub fn optimize_layout(&mut self, tree: &mut LayoutTree, strategy: &mut dyn LayoutStrategy) -> bool {
        let start = Instant::now();
        self.report(0, "Starting layout optimization");
        self.analyze(tree);
        self.report(10, "Layout analysis complete");

        if !self.should_optimize() {
            self.report(100, "No optimization needed");
            return false;
        }

        strategy.optimize_layout(tree);
        self.report(30, "Strategy optimizations applied");

        if self.node_consolidation {
            let grouped = self.consolidate_panels(tree);
            let removed = tree.cleanup_empty_nodes();
            log::debug!("consolidated {grouped} containers, removed {removed} redundant nodes");
            self.report(50, "Node structure optimized");
        }
        if self.splitter_optimization {
            self.snap_splitter_ratios(tree);
            self.report(70, "Splitter ratios optimized");
        }
        if self.memory_optimization {
            self.cleanup_unused_nodes(tree);
            self.report(85, "Memory cleanup complete");
        }

        self.metrics.calculation_time = start.elapsed();
        self.analyze(tree);
        self.report(100, "Layout optimization complete");
        true
    }

    /// Tab the panel children of containers that hold more than the
    /// consolidation threshold of them. Returns how many containers changed.
    pub fn consolidate_panels(&mut self, tree: &mut LayoutTree) -> usize {
        let threshold = self.params.consolidation_threshold;
        let mut crowded = Vec::new();
        tree.traverse_nodes(|id, node| {
            if !matches!(node.kind(), NodeKind::Container) {
                return;
            }
            let panels: Vec<NodeId> = node
                .children()
                .iter()
                .copied()
                .filter(|c| tree.get(*c).is_some_and(|n| n.is_panel()))
                .collect();
            if panels.len() > threshold {
                crowded.push((id, panels));
            }
        });

        for (container, panels) in &crowded {
            let Some(index) = panels.first().and_then(|p| tree.index_in_parent(*p)) else {
                continue;
            };
            let area = panels
                .first()
                .and_then(|p| tree.get(*p))
                .and_then(|n| n.dock_area());
            let group = tree.create_tab_group(NodeRole::Content, area);
            tree.insert_child(*container, index, group);
            for panel in panels {
                tree.add_child(group, *panel);
            }
        }
        crowded.len()
    }

    /// Snap non-skeleton splitter ratios onto common fractions.
    pub fn snap_splitter_ratios(&mut self, tree: &mut LayoutTree) -> usize {
        let tolerance = self.params.ratio_tolerance;
        let mut snaps = Vec::new();
        tree.traverse_splitters(|id, node| {
            if node.is_protected() {
                return;
            }
            if let Some(snapped) = snap_ratio(node.ratio(), tolerance) {
                if snapped != node.ratio() {
                    snaps.push((id, snapped));
                }
            }
        });
        for (id, ratio) in &snaps {
            tree.adjust_ratio(*id, *ratio);
        }
        snaps.len()
    }

    /// Drop empty non-skeleton containers. Large trees are compacted as well.
    pub fn cleanup_unused_nodes(&mut self, tree: &mut LayoutTree) -> usize {
        let mut empty = Vec::new();
        tree.traverse_containers(|id, node| {
            if node.children().is_empty() && !node.is_protected() && id != tree.root() {
                empty.push(id);
            }
        });
        let mut removed = 0;
        for id in empty {
            if tree.remove_node(id) {
                removed += 1;
            }
        }
        if tree.node_count() > self.params.cleanup_threshold {
            removed += tree.compact();
        }
        removed
    }

    // ──────────────────────────────────────────
    // Cache
    // ──────────────────────────────────────────

    /// Store a snapshot of `tree` under `key`. The oldest entry is evicted
    /// when the cache is full. No-op while caching is disabled.
    pub fn cache_layout(&mut self, key: &str, tree: &LayoutTree, strategy: &dyn LayoutStrategy) {
        if !self.caching {
            return;
        }
        let metrics = self.analyze(tree);
        self.cache.insert(
            key.to_string(),
            CachedLayout {
                data: strategy.serialize_layout(tree),
                stored_at: self.clock.now(),
                metrics,
            },
        );
        if self.cache.len() > self.cache_capacity {
            let oldest = self
                .cache
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                self.cache.remove(&oldest);
            }
        }
    }

    pub fn is_cache_valid(&self, key: &str) -> bool {
        self.caching
            && self
                .cache
                .get(key)
                .is_some_and(|entry| self.clock.now().duration_since(entry.stored_at) <= CACHE_TTL)
    }

    /// Fresh snapshot for `key`. Stale entries are dropped.
    pub fn cached_layout(&mut self, key: &str) -> Option<&str> {
        if !self.is_cache_valid(key) {
            self.cache.remove(key);
            return None;
        }
        self.cache.get(key).map(|entry| entry.data.as_str())
    }

    /// Load the snapshot for `key` into `tree` through `strategy`.
    pub fn restore_cached_layout(&mut self, key: &str, tree: &mut LayoutTree, strategy: &mut dyn LayoutStrategy) -> bool {
        let Some(data) = self.cached_layout(key).map(str::to_string) else {
            return false;
        };
        if !strategy.deserialize_layout(tree, &data) {
            return false;
        }
        if let Some(entry) = self.cache.get(key) {
            self.metrics = entry.metrics;
        }
        true
    }

    pub fn set_cache_capacity(&mut self, capacity: usize) {
        self.cache_capacity = capacity.max(1);
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn invalidate(&mut self, key: &str) {
        self.cache.remove(key);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // ──────────────────────────────────────────
    // Batching
    // ──────────────────────────────────────────

    pub fn begin_batch(&mut self) {
        self.batch = Some(Vec::new());
    }

    pub fn is_batch_active(&self) -> bool {
        self.batch.is_some()
    }

    /// Defer `op` until [`end_batch`](Self::end_batch); outside a batch it
    /// runs right away.
    pub fn queue(&mut self, tree: &mut LayoutTree, op: impl FnOnce(&mut LayoutTree) + 'static) {
        match self.batch.as_mut() {
            Some(ops) => ops.push(Box::new(op)),
            None => op(tree),
        }
    }

    /// Run the queued operations in order. Returns how many ran.
    pub fn end_batch(&mut self, tree: &mut LayoutTree) -> usize {
        let Some(ops) = self.batch.take() else {
            return 0;
        };
        let count = ops.len();
        for op in ops {
            op(tree);
        }
        count
    }
}
