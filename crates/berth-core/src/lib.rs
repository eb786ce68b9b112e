use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Geometry
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const EMPTY: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn area(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.width * self.height
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Linear interpolation towards `target`; `t` is clamped to [0, 1].
    pub fn lerp(&self, target: Rect, t: f32) -> Rect {
        let t = t.clamp(0.0, 1.0);
        Rect::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.width + (target.width - self.width) * t,
            self.height + (target.height - self.height) * t,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Extent along the axis a splitter with `direction` divides.
    pub fn along(&self, direction: SplitDirection) -> f32 {
        match direction {
            SplitDirection::Horizontal => self.width,
            SplitDirection::Vertical => self.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ──────────────────────────────────────────────
// Identity
// ──────────────────────────────────────────────

pub type PanelId = u64;

/// Non-owning reference to an externally owned panel.
///
/// The layout tree only compares panels by `id`; the title feeds docking
/// heuristics and serialized layouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PanelHandle {
    pub id: PanelId,
    pub title: String,
}

impl PanelHandle {
    pub fn new(id: PanelId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl fmt::Display for PanelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.title, self.id)
    }
}

// ──────────────────────────────────────────────
// Docking types
// ──────────────────────────────────────────────

/// Axis along which a splitter arranges its two children.
/// `Horizontal` places them side by side, `Vertical` stacks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

/// Logical region a panel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DockArea {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl DockArea {
    pub const ALL: [DockArea; 5] = [
        DockArea::Left,
        DockArea::Right,
        DockArea::Top,
        DockArea::Bottom,
        DockArea::Center,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DockArea::Left => "left",
            DockArea::Right => "right",
            DockArea::Top => "top",
            DockArea::Bottom => "bottom",
            DockArea::Center => "center",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        DockArea::ALL.into_iter().find(|area| area.name() == name)
    }
}

impl From<DockPosition> for DockArea {
    fn from(position: DockPosition) -> Self {
        match position {
            DockPosition::Left => DockArea::Left,
            DockPosition::Right => DockArea::Right,
            DockPosition::Top => DockArea::Top,
            DockPosition::Bottom => DockArea::Bottom,
            DockPosition::Center => DockArea::Center,
        }
    }
}

/// Edge or center chosen during an explicit docking gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DockPosition {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl DockPosition {
    pub const ALL: [DockPosition; 5] = [
        DockPosition::Left,
        DockPosition::Right,
        DockPosition::Top,
        DockPosition::Bottom,
        DockPosition::Center,
    ];

    /// Splitter axis and whether the incoming panel goes first.
    /// `None` for `Center`, which tabs instead of splitting.
    pub fn split(self) -> Option<(SplitDirection, bool)> {
        match self {
            DockPosition::Top => Some((SplitDirection::Vertical, true)),
            DockPosition::Bottom => Some((SplitDirection::Vertical, false)),
            DockPosition::Left => Some((SplitDirection::Horizontal, true)),
            DockPosition::Right => Some((SplitDirection::Horizontal, false)),
            DockPosition::Center => None,
        }
    }

    pub fn area(self) -> DockArea {
        DockArea::from(self)
    }
}

impl From<DockArea> for DockPosition {
    fn from(area: DockArea) -> Self {
        match area {
            DockArea::Left => DockPosition::Left,
            DockArea::Right => DockPosition::Right,
            DockArea::Top => DockPosition::Top,
            DockArea::Bottom => DockPosition::Bottom,
            DockArea::Center => DockPosition::Center,
        }
    }
}

// ──────────────────────────────────────────────
// Constraints
// ──────────────────────────────────────────────

/// Advisory per-node bounds used by the geometry pass and the constraint solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeConstraints {
    pub min_width: f32,
    pub min_height: f32,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
    pub resizable: bool,
    pub dockable: bool,
}

impl Default for NodeConstraints {
    fn default() -> Self {
        Self {
            min_width: 0.0,
            min_height: 0.0,
            max_width: None,
            max_height: None,
            resizable: true,
            dockable: true,
        }
    }
}

impl NodeConstraints {
    pub fn min_along(&self, direction: SplitDirection) -> f32 {
        match direction {
            SplitDirection::Horizontal => self.min_width,
            SplitDirection::Vertical => self.min_height,
        }
    }
}

/// Inclusive bounds every splitter ratio is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBounds {
    pub min: f32,
    pub max: f32,
}

impl RatioBounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// `(low, high)` with inverted bounds swapped. NaN bounds fall back to
    /// the defaults.
    pub fn ordered(&self) -> (f32, f32) {
        if self.min.is_nan() || self.max.is_nan() {
            let fallback = Self::default();
            return (fallback.min, fallback.max);
        }
        (self.min.min(self.max), self.min.max(self.max))
    }

    pub fn clamp(&self, ratio: f32) -> f32 {
        let (low, high) = self.ordered();
        if ratio.is_nan() {
            return 0.5_f32.clamp(low, high);
        }
        ratio.clamp(low, high)
    }

    pub fn contains(&self, ratio: f32) -> bool {
        let (low, high) = self.ordered();
        ratio >= low && ratio <= high
    }
}

impl Default for RatioBounds {
    fn default() -> Self {
        Self::new(0.1, 0.9)
    }
}

// ──────────────────────────────────────────────
// Drag session
// ──────────────────────────────────────────────

/// State handed over by the drag controller once a drag completes.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub source: PanelHandle,
    pub tab_index: Option<usize>,
    pub target: Option<PanelId>,
    pub position: Option<DockPosition>,
    pub valid: bool,
}

impl DragSession {
    pub fn new(source: PanelHandle) -> Self {
        Self {
            source,
            tab_index: None,
            target: None,
            position: None,
            valid: false,
        }
    }

    /// Record the hovered target; a session is valid once it has both
    /// a target and a position that is not the source itself.
    pub fn hover(&mut self, target: PanelId, position: DockPosition) {
        self.target = Some(target);
        self.position = Some(position);
        self.valid = target != self.source.id;
    }
}

// ──────────────────────────────────────────────
// Trait: ClientArea
// ──────────────────────────────────────────────

/// The window hosting the dock layout.
pub trait ClientArea {
    fn client_rect(&self) -> Rect;
    fn screen_to_client(&self, point: Vec2) -> Vec2;
}

// ──────────────────────────────────────────────
// Trait: Clock
// ──────────────────────────────────────────────

/// Time source for debounced layout passes.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
