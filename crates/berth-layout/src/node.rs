use berth_core::{DockArea, NodeConstraints, PanelHandle, Rect, SplitDirection};

slotmap::new_key_type! {
    /// Stable handle to a node in a [`LayoutTree`](crate::LayoutTree).
    /// Handles of removed nodes never resolve again.
    pub struct NodeId;
}

// ──────────────────────────────────────────────
// Roles
// ──────────────────────────────────────────────

/// Fixed regions of the IDE skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkeletonSlot {
    Root,
    /// Vertical split between the work area and the status bar.
    MainSplit,
    TopWorkArea,
    /// Horizontal split between the left sidebar and the center canvas.
    WorkSplit,
    LeftSidebar,
    CenterCanvas,
    BottomStatusBar,
}

/// Structural role, assigned when a node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Part of the protected main structure; never removed by cleanup.
    Skeleton(SkeletonSlot),
    /// Splitter stacking panels inside the left sidebar.
    SidebarStack,
    /// Per-area tab group created by the flexible strategy.
    AreaBucket,
    Content,
}

impl NodeRole {
    pub fn is_skeleton(self) -> bool {
        matches!(self, NodeRole::Skeleton(_))
    }

    pub(crate) fn token(self) -> &'static str {
        match self {
            NodeRole::Skeleton(SkeletonSlot::Root) => "root",
            NodeRole::Skeleton(SkeletonSlot::MainSplit) => "main-split",
            NodeRole::Skeleton(SkeletonSlot::TopWorkArea) => "top-work-area",
            NodeRole::Skeleton(SkeletonSlot::WorkSplit) => "work-split",
            NodeRole::Skeleton(SkeletonSlot::LeftSidebar) => "left-sidebar",
            NodeRole::Skeleton(SkeletonSlot::CenterCanvas) => "center-canvas",
            NodeRole::Skeleton(SkeletonSlot::BottomStatusBar) => "bottom-status-bar",
            NodeRole::SidebarStack => "sidebar-stack",
            NodeRole::AreaBucket => "bucket",
            NodeRole::Content => "content",
        }
    }

    pub(crate) fn from_token(token: &str) -> Option<Self> {
        let role = match token {
            "root" => NodeRole::Skeleton(SkeletonSlot::Root),
            "main-split" => NodeRole::Skeleton(SkeletonSlot::MainSplit),
            "top-work-area" => NodeRole::Skeleton(SkeletonSlot::TopWorkArea),
            "work-split" => NodeRole::Skeleton(SkeletonSlot::WorkSplit),
            "left-sidebar" => NodeRole::Skeleton(SkeletonSlot::LeftSidebar),
            "center-canvas" => NodeRole::Skeleton(SkeletonSlot::CenterCanvas),
            "bottom-status-bar" => NodeRole::Skeleton(SkeletonSlot::BottomStatusBar),
            "sidebar-stack" => NodeRole::SidebarStack,
            "bucket" => NodeRole::AreaBucket,
            "content" => NodeRole::Content,
            _ => return None,
        };
        Some(role)
    }
}

/// Ratio a splitter with `role` starts out with, if the role has an opinion.
///
/// The skeleton splits are what make the fixed IDE regions look like an IDE:
/// a narrow sidebar, a short status bar, and a sidebar stack that favors the
/// panel on top.
pub fn default_ratio_for(role: NodeRole) -> Option<f32> {
    match role {
        NodeRole::Skeleton(SkeletonSlot::MainSplit) => Some(0.85),
        NodeRole::Skeleton(SkeletonSlot::WorkSplit) => Some(0.15),
        NodeRole::SidebarStack => Some(0.6),
        _ => None,
    }
}

/// Ratio used when neither the role nor the caller supplies one.
pub const DEFAULT_RATIO: f32 = 0.5;

// ──────────────────────────────────────────────
// Node
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabBarPosition {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

impl TabBarPosition {
    pub(crate) fn token(self) -> &'static str {
        match self {
            TabBarPosition::Top => "top",
            TabBarPosition::Bottom => "bottom",
            TabBarPosition::Left => "left",
            TabBarPosition::Right => "right",
        }
    }

    pub(crate) fn from_token(token: &str) -> Option<Self> {
        match token {
            "top" => Some(TabBarPosition::Top),
            "bottom" => Some(TabBarPosition::Bottom),
            "left" => Some(TabBarPosition::Left),
            "right" => Some(TabBarPosition::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Panel(PanelHandle),
    Splitter(SplitDirection),
    /// Structural holder. Two or more children share the width equally.
    Container,
    /// Panels sharing one visual slot; every child gets the same rect.
    TabGroup,
}

impl NodeKind {
    pub(crate) fn token(&self) -> &'static str {
        match self {
            NodeKind::Panel(_) => "Panel",
            NodeKind::Splitter(_) => "Splitter",
            NodeKind::Container => "Container",
            NodeKind::TabGroup => "TabGroup",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub(crate) kind: NodeKind,
    pub(crate) role: NodeRole,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) rect: Rect,
    pub(crate) constraints: NodeConstraints,
    pub(crate) ratio: f32,
    pub(crate) ratio_customized: bool,
    pub(crate) dock_area: Option<DockArea>,
    pub(crate) active_tab: usize,
    pub(crate) tab_bar: TabBarPosition,
}

impl LayoutNode {
    pub(crate) fn new(kind: NodeKind, role: NodeRole) -> Self {
        Self {
            kind,
            role,
            parent: None,
            children: Vec::new(),
            rect: Rect::EMPTY,
            constraints: NodeConstraints::default(),
            ratio: default_ratio_for(role).unwrap_or(DEFAULT_RATIO),
            ratio_customized: false,
            dock_area: None,
            active_tab: 0,
            tab_bar: TabBarPosition::default(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Rect from the last geometry pass.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn constraints(&self) -> &NodeConstraints {
        &self.constraints
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn ratio_customized(&self) -> bool {
        self.ratio_customized
    }

    pub fn dock_area(&self) -> Option<DockArea> {
        self.dock_area
    }

    pub fn active_tab(&self) -> usize {
        self.active_tab
    }

    pub fn tab_bar(&self) -> TabBarPosition {
        self.tab_bar
    }

    pub fn panel(&self) -> Option<&PanelHandle> {
        match &self.kind {
            NodeKind::Panel(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn direction(&self) -> Option<SplitDirection> {
        match self.kind {
            NodeKind::Splitter(direction) => Some(direction),
            _ => None,
        }
    }

    pub fn is_panel(&self) -> bool {
        matches!(self.kind, NodeKind::Panel(_))
    }

    pub fn is_splitter(&self) -> bool {
        matches!(self.kind, NodeKind::Splitter(_))
    }

    /// Containers and tab groups.
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container | NodeKind::TabGroup)
    }

    pub fn is_tab_group(&self) -> bool {
        matches!(self.kind, NodeKind::TabGroup)
    }

    pub fn is_protected(&self) -> bool {
        self.role.is_skeleton()
    }

    /// A non-panel node with no children.
    pub fn is_empty(&self) -> bool {
        !self.is_panel() && self.children.is_empty()
    }
}
