// Docking layout engine
// Arena-backed layout tree with IDE / flexible / hybrid placement strategies,
// a debounced geometry pass and heuristic smart docking on top.

pub mod config;
mod engine;
pub mod error;
mod geometry;
pub mod node;
pub mod ops;
pub mod optimizer;
pub mod serialize;
pub mod smart;
pub mod strategy;
mod transition;
mod tree;

pub use config::{load_config, load_config_from, save_config, save_config_to, LayoutConfig};
pub use engine::{DockReport, LayoutEngine};
pub use error::{LayoutError, Result};
pub use geometry::{enforce_constraints, validate_constraints};
pub use node::{default_ratio_for, LayoutNode, NodeId, NodeKind, NodeRole, SkeletonSlot, TabBarPosition};
pub use optimizer::{LayoutMetrics, LayoutOptimizer, OptimizationStrategy, OptimizerParams};
pub use smart::{SmartConstraints, SmartLayoutEngine};
pub use strategy::{
    FlexibleLayoutStrategy, HybridLayoutStrategy, IdeLayoutStrategy, LayoutStrategy, StrategyKind,
    StrategyState,
};
pub use transition::{LayoutTransition, TransitionKind, DEFAULT_TRANSITION};
pub use tree::LayoutTree;
