//! Random add / remove / dock / move streams against every strategy. After
//! each settled step the tree must pass its structural checks and lay out
//! inside the window.

use std::collections::HashSet;

use berth_core::{DockArea, DockPosition, PanelHandle, PanelId, Rect};
use berth_layout::{LayoutConfig, LayoutEngine, StrategyKind};
use proptest::prelude::*;

const WINDOW: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 1200.0,
    height: 800.0,
};

/// Pixel slack for float rounding at rect edges.
const EDGE_SLACK: f32 = 0.5;

#[derive(Debug, Clone)]
enum Op {
    Add(PanelId, DockArea),
    Remove(PanelId),
    Dock(PanelId, PanelId, DockPosition),
    Move(PanelId, DockArea),
    Ratio(usize, f32),
}

fn area() -> impl Strategy<Value = DockArea> {
    prop::sample::select(DockArea::ALL.to_vec())
}

fn position() -> impl Strategy<Value = DockPosition> {
    prop::sample::select(DockPosition::ALL.to_vec())
}

fn kind() -> impl Strategy<Value = StrategyKind> {
    prop::sample::select(StrategyKind::ALL.to_vec())
}

fn op() -> impl Strategy<Value = Op> {
    let id = 1u64..12;
    prop_oneof![
        3 => (id.clone(), area()).prop_map(|(id, area)| Op::Add(id, area)),
        1 => id.clone().prop_map(Op::Remove),
        2 => (id.clone(), id.clone(), position()).prop_map(|(p, t, pos)| Op::Dock(p, t, pos)),
        1 => (id, area()).prop_map(|(id, area)| Op::Move(id, area)),
        1 => (0usize..8, -0.5f32..1.5).prop_map(|(i, r)| Op::Ratio(i, r)),
    ]
}

fn handle(id: PanelId) -> PanelHandle {
    PanelHandle::new(id, format!("Panel {id}"))
}

fn engine_for(kind: StrategyKind) -> LayoutEngine {
    let mut engine = LayoutEngine::new(LayoutConfig {
        strategy: kind,
        ..LayoutConfig::default()
    });
    engine.set_strategy(kind);
    engine
}

fn apply(engine: &mut LayoutEngine, op: &Op, seen: &mut HashSet<PanelId>) {
    match *op {
        Op::Add(id, area) => {
            if engine.add_panel(handle(id), area, None) {
                seen.insert(id);
                assert!(engine.find_panel_node(id).is_some(), "added panel #{id} missing");
            }
        }
        Op::Remove(id) => {
            if engine.remove_panel(id) {
                assert!(engine.find_panel_node(id).is_none(), "removed panel #{id} still docked");
            }
        }
        Op::Dock(id, target, position) => {
            if let Ok(report) = engine.dock_panel(&handle(id), target, position) {
                seen.insert(id);
                assert!(engine.tree().contains(report.node));
            }
        }
        Op::Move(id, area) => {
            engine.move_panel(id, area, None);
        }
        Op::Ratio(index, ratio) => {
            let mut splitters = Vec::new();
            engine.traverse_splitters(|id, _| splitters.push(id));
            if let Some(&node) = splitters.get(index % splitters.len().max(1)) {
                engine.set_splitter_ratio(node, ratio);
            }
        }
    }
}

fn inside_window(rect: Rect) -> bool {
    rect.width >= 0.0
        && rect.height >= 0.0
        && rect.x >= WINDOW.x - EDGE_SLACK
        && rect.y >= WINDOW.y - EDGE_SLACK
        && rect.x + rect.width <= WINDOW.x + WINDOW.width + EDGE_SLACK
        && rect.y + rect.height <= WINDOW.y + WINDOW.height + EDGE_SLACK
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_settled_tree_stays_valid(kind in kind(), ops in prop::collection::vec(op(), 1..40)) {
        let mut engine = engine_for(kind);
        let mut seen = HashSet::new();

        for op in &ops {
            apply(&mut engine, op, &mut seen);
            engine.settle();

            let tree = engine.tree();
            if let Err(e) = tree.check_invariants() {
                return Err(TestCaseError::fail(format!("{kind:?} after {op:?}: {e}")));
            }
            let bounds = tree.bounds();
            tree.traverse_splitters(|_, node| {
                assert!(bounds.contains(node.ratio()), "ratio {} escaped its bounds", node.ratio());
            });
            for panel in engine.all_panels() {
                prop_assert!(seen.contains(&panel.id), "panel #{} appeared from nowhere", panel.id);
            }
        }
    }

    #[test]
    fn test_geometry_stays_inside_window(kind in kind(), ops in prop::collection::vec(op(), 1..30)) {
        let mut engine = engine_for(kind);
        let mut seen = HashSet::new();
        for op in &ops {
            apply(&mut engine, op, &mut seen);
        }
        engine.settle();
        prop_assert!(engine.update_layout(WINDOW));

        let tree = engine.tree();
        prop_assert_eq!(tree.get(tree.root()).map(|n| n.rect()), Some(WINDOW));
        for (id, rect) in tree.panel_rects() {
            prop_assert!(inside_window(rect), "panel #{} laid out at {:?}", id, rect);
        }
    }

    #[test]
    fn test_removing_everything_leaves_no_panels(kind in kind(), ops in prop::collection::vec(op(), 1..30)) {
        let mut engine = engine_for(kind);
        let mut seen = HashSet::new();
        for op in &ops {
            apply(&mut engine, op, &mut seen);
        }
        for panel in engine.all_panels() {
            prop_assert!(engine.remove_panel(panel.id));
        }
        engine.settle();

        prop_assert_eq!(engine.tree().panel_count(), 0);
        prop_assert!(engine.tree().check_invariants().is_ok());
    }
}
