//! Benchmarks: geometry pass and docking churn.
//!
//! Run with: cargo bench --package berth-layout

use berth_core::{DockArea, DockPosition, PanelHandle, Rect};
use berth_layout::{LayoutConfig, LayoutEngine, StrategyKind};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Fixtures ──

const WINDOW: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 1920.0,
    height: 1080.0,
};

fn engine(kind: StrategyKind) -> LayoutEngine {
    let mut engine = LayoutEngine::new(LayoutConfig {
        strategy: kind,
        ..LayoutConfig::default()
    });
    engine.set_strategy(kind);
    engine
}

/// `count` panels: the first goes to the center, the rest dock against the
/// previous one, cycling through the edge positions.
fn docked_engine(kind: StrategyKind, count: u64) -> LayoutEngine {
    let mut engine = engine(kind);
    engine.add_panel(PanelHandle::new(1, "Editor"), DockArea::Center, None);
    let edges = [DockPosition::Left, DockPosition::Bottom, DockPosition::Right, DockPosition::Top];
    for id in 2..=count {
        let panel = PanelHandle::new(id, format!("Panel {id}"));
        let _ = engine.dock_panel(&panel, id - 1, edges[(id as usize) % edges.len()]);
    }
    engine.settle();
    engine
}

// ── Geometry ──

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");

    for count in [8u64, 64, 256] {
        group.bench_with_input(BenchmarkId::new("calculate_layout", count), &count, |b, &count| {
            let mut engine = docked_engine(StrategyKind::Flexible, count);
            b.iter(|| {
                engine.update_layout(black_box(WINDOW));
            });
        });
    }

    group.bench_function("ide_skeleton/16", |b| {
        let mut engine = engine(StrategyKind::Ide);
        for id in 1..=16u64 {
            engine.add_panel(PanelHandle::new(id, format!("Tool {id}")), DockArea::ALL[(id % 5) as usize], None);
        }
        b.iter(|| {
            engine.update_layout(black_box(WINDOW));
        });
    });

    group.finish();
}

// ── Docking churn ──

fn bench_docking(c: &mut Criterion) {
    let mut group = c.benchmark_group("docking");

    for kind in StrategyKind::ALL {
        group.bench_function(BenchmarkId::new("dock_settle", kind), |b| {
            b.iter(|| {
                let engine = docked_engine(kind, black_box(32));
                black_box(engine.tree().node_count());
            });
        });
    }

    // Move one panel around a populated layout; each move leaves a splitter
    // behind for settle to collapse.
    group.bench_function("move_and_settle/64", |b| {
        let mut engine = docked_engine(StrategyKind::Flexible, 64);
        let panel = PanelHandle::new(32, "Panel 32");
        let mut target = 1u64;
        b.iter(|| {
            target = target % 63 + 1;
            if target == panel.id {
                target += 1;
            }
            let _ = engine.dock_panel(&panel, target, DockPosition::Right);
            black_box(engine.settle());
        });
    });

    group.bench_function("serialize/64", |b| {
        let engine = docked_engine(StrategyKind::Flexible, 64);
        b.iter(|| black_box(engine.save_layout()));
    });

    group.finish();
}

criterion_group!(benches, bench_geometry, bench_docking);
criterion_main!(benches);
