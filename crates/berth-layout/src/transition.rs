use std::time::Duration;

use berth_core::Rect;

use crate::node::NodeId;

pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionKind {
    #[default]
    None,
    SplitterMove,
    PanelInsert,
    PanelRemove,
    Resize,
}

/// Linear move of one node's rect from `start` to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTransition {
    pub kind: TransitionKind,
    pub node: NodeId,
    pub start: Rect,
    pub target: Rect,
    pub progress: f32,
    pub duration: Duration,
    pub active: bool,
}

impl LayoutTransition {
    pub fn new(kind: TransitionKind, node: NodeId, start: Rect, target: Rect, duration: Duration) -> Self {
        Self {
            kind,
            node,
            start,
            target,
            progress: 0.0,
            duration,
            active: true,
        }
    }

    /// Step forward by `dt`. Returns whether the transition is still running.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.active {
            return false;
        }
        let total = self.duration.as_secs_f32();
        self.progress = if total <= 0.0 {
            1.0
        } else {
            (self.progress + dt.as_secs_f32() / total).min(1.0)
        };
        if self.progress >= 1.0 {
            self.active = false;
        }
        self.active
    }

    pub fn current_rect(&self) -> Rect {
        self.start.lerp(self.target, self.progress)
    }
}
