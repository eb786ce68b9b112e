//! Structural primitives shared by the engine and every strategy.
//!
//! Each operation leaves the tree settled: splitters it creates end up with
//! two children, and nothing is deleted except what the operation replaces.

use berth_core::{DockArea, DockPosition, PanelHandle, SplitDirection};

use crate::node::{NodeId, NodeKind, NodeRole, SkeletonSlot};
use crate::tree::LayoutTree;

// ──────────────────────────────────────────────
// IDE skeleton
// ──────────────────────────────────────────────

/// Handles of the fixed IDE regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainStructure {
    pub main_split: NodeId,
    pub top_work_area: NodeId,
    pub work_split: NodeId,
    pub left_sidebar: NodeId,
    pub center_canvas: NodeId,
    pub bottom_status_bar: NodeId,
}

impl MainStructure {
    /// Skeleton holder panels for `area` are placed under.
    pub fn holder_for(&self, area: DockArea) -> NodeId {
        match area {
            DockArea::Left => self.left_sidebar,
            DockArea::Bottom => self.bottom_status_bar,
            DockArea::Center | DockArea::Right | DockArea::Top => self.center_canvas,
        }
    }
}

pub fn find_skeleton(tree: &LayoutTree, slot: SkeletonSlot) -> Option<NodeId> {
    if slot == SkeletonSlot::Root {
        return Some(tree.root());
    }
    tree.find_role(NodeRole::Skeleton(slot))
}

/// The skeleton, if every region of it is present.
pub fn main_structure(tree: &LayoutTree) -> Option<MainStructure> {
    Some(MainStructure {
        main_split: find_skeleton(tree, SkeletonSlot::MainSplit)?,
        top_work_area: find_skeleton(tree, SkeletonSlot::TopWorkArea)?,
        work_split: find_skeleton(tree, SkeletonSlot::WorkSplit)?,
        left_sidebar: find_skeleton(tree, SkeletonSlot::LeftSidebar)?,
        center_canvas: find_skeleton(tree, SkeletonSlot::CenterCanvas)?,
        bottom_status_bar: find_skeleton(tree, SkeletonSlot::BottomStatusBar)?,
    })
}

pub fn ensure_main_structure(tree: &mut LayoutTree) -> MainStructure {
    match main_structure(tree) {
        Some(structure) => structure,
        None => create_main_structure(tree),
    }
}

/// Build `Root → MainSplit(TopWorkArea → WorkSplit(LeftSidebar | CenterCanvas) | BottomStatusBar)`.
/// Whatever the root held before moves into the center canvas.
pub fn create_main_structure(tree: &mut LayoutTree) -> MainStructure {
    let root = tree.root();
    let existing = tree.children(root).to_vec();

    let main_split = tree.create_splitter_node(
        SplitDirection::Vertical,
        NodeRole::Skeleton(SkeletonSlot::MainSplit),
    );
    let top_work_area = tree.create_container_node(NodeRole::Skeleton(SkeletonSlot::TopWorkArea));
    let work_split = tree.create_splitter_node(
        SplitDirection::Horizontal,
        NodeRole::Skeleton(SkeletonSlot::WorkSplit),
    );
    let left_sidebar = tree.create_container_node(NodeRole::Skeleton(SkeletonSlot::LeftSidebar));
    let center_canvas = tree.create_container_node(NodeRole::Skeleton(SkeletonSlot::CenterCanvas));
    let bottom_status_bar = tree.create_tab_group(
        NodeRole::Skeleton(SkeletonSlot::BottomStatusBar),
        Some(DockArea::Bottom),
    );
    tree.set_dock_area(left_sidebar, Some(DockArea::Left));
    tree.set_dock_area(center_canvas, Some(DockArea::Center));

    tree.insert_child(root, 0, main_split);
    tree.add_child(main_split, top_work_area);
    tree.add_child(main_split, bottom_status_bar);
    tree.add_child(top_work_area, work_split);
    tree.add_child(work_split, left_sidebar);
    tree.add_child(work_split, center_canvas);
    for node in existing {
        tree.add_child(center_canvas, node);
    }

    log::debug!("created main layout structure");
    MainStructure {
        main_split,
        top_work_area,
        work_split,
        left_sidebar,
        center_canvas,
        bottom_status_bar,
    }
}

/// Place `panel` into the fixed region for `area`, creating the skeleton on
/// first use. Returns the new Panel node.
///
/// * Left: one panel fills the sidebar, a second one stacks below it, later
///   ones tab with the lower slot.
/// * Center: the first panel fills the canvas, later ones tab with it.
/// * Bottom: appended to the status bar tab group.
/// * Right/Top: the canvas content is split with the panel on that side.
pub fn organize_by_dock_areas(
    tree: &mut LayoutTree,
    panel: PanelHandle,
    area: DockArea,
) -> Option<NodeId> {
    let main = ensure_main_structure(tree);
    match area {
        DockArea::Left => {
            let sidebar = main.left_sidebar;
            let children = tree.children(sidebar).to_vec();
            match children.as_slice() {
                [] => add_panel_child(tree, sidebar, panel, Some(area)),
                [only] => {
                    let stacked = tree
                        .get(*only)
                        .is_some_and(|n| n.role() == NodeRole::SidebarStack && n.children().len() == 2);
                    if stacked {
                        let lower = tree.children(*only)[1];
                        return tabify_into(tree, lower, panel);
                    }
                    let stack = tree.create_splitter_node(SplitDirection::Vertical, NodeRole::SidebarStack);
                    tree.replace(*only, stack);
                    tree.add_child(stack, *only);
                    add_panel_child(tree, stack, panel, Some(area))
                }
                [.., last] => tabify_into(tree, *last, panel),
            }
        }
        DockArea::Bottom => {
            let node = add_panel_child(tree, main.bottom_status_bar, panel, Some(area))?;
            let index = tree.children(main.bottom_status_bar).len().saturating_sub(1);
            tree.set_active_tab(main.bottom_status_bar, index);
            Some(node)
        }
        DockArea::Center => {
            let canvas = main.center_canvas;
            match first_panel_in(tree, canvas) {
                Some(existing) => tabify_into(tree, existing, panel),
                None => add_panel_child(tree, canvas, panel, Some(area)),
            }
        }
        DockArea::Right | DockArea::Top => {
            let canvas = main.center_canvas;
            let children = tree.children(canvas).to_vec();
            let content = match children.as_slice() {
                [] => return add_panel_child(tree, canvas, panel, Some(area)),
                [only] => *only,
                _ => wrap_children(tree, canvas),
            };
            insert_panel_with_splitter(tree, content, panel, DockPosition::from(area))
        }
    }
}

// ──────────────────────────────────────────────
// Splitting and tabbing
// ──────────────────────────────────────────────

/// The node a split relative to `target` replaces: the target itself, or
/// its whole tab group when the target is one of several tabs.
pub fn split_anchor(tree: &LayoutTree, target: NodeId) -> NodeId {
    match tree.parent(target) {
        Some(parent) if tree.get(parent).is_some_and(|n| n.is_tab_group()) => parent,
        _ => target,
    }
}

/// Replace `anchor` with a new splitter holding `anchor` and a new Panel
/// node for `panel`. Left/Right split side by side, Top/Bottom stack; the
/// new panel goes first for Left and Top.
///
/// Returns `None` without touching the tree for `Center`, for the root, and
/// for skeleton nodes, which are never replaced.
pub fn insert_panel_with_splitter(
    tree: &mut LayoutTree,
    anchor: NodeId,
    panel: PanelHandle,
    position: DockPosition,
) -> Option<NodeId> {
    let (direction, insert_first) = position.split()?;
    if anchor == tree.root() || tree.is_protected(anchor) || tree.parent(anchor).is_none() {
        return None;
    }

    let splitter = tree.create_splitter_node(direction, NodeRole::Content);
    if !tree.replace(anchor, splitter) {
        tree.remove_node(splitter);
        return None;
    }
    let node = tree.create_panel_node(panel, Some(position.area()));
    if insert_first {
        tree.add_child(splitter, node);
        tree.add_child(splitter, anchor);
    } else {
        tree.add_child(splitter, anchor);
        tree.add_child(splitter, node);
    }
    Some(node)
}

/// Show `panel` as a tab next to `target`.
///
/// A Panel target inside a tab group gets a new sibling tab; a bare Panel is
/// wrapped in a new tab group first. Containers and splitters forward to
/// their first panel, or take the panel directly when they hold none.
pub fn tabify_into(tree: &mut LayoutTree, target: NodeId, panel: PanelHandle) -> Option<NodeId> {
    let node = tree.get(target)?;
    let kind = node.kind().clone();
    let is_container = node.is_container();
    let area = node.dock_area().or_else(|| {
        node.children()
            .first()
            .and_then(|c| tree.get(*c))
            .and_then(|c| c.dock_area())
    });

    match kind {
        NodeKind::Panel(_) => {
            let parent = tree.parent(target)?;
            let group = if tree.get(parent).is_some_and(|p| p.is_tab_group()) {
                parent
            } else {
                let group = tree.create_tab_group(NodeRole::Content, area);
                if !tree.replace(target, group) {
                    tree.remove_node(group);
                    return None;
                }
                tree.add_child(group, target);
                group
            };
            let new = add_panel_child(tree, group, panel, area)?;
            let index = tree.children(group).len().saturating_sub(1);
            tree.set_active_tab(group, index);
            Some(new)
        }
        NodeKind::TabGroup => {
            let new = add_panel_child(tree, target, panel, area)?;
            let index = tree.children(target).len().saturating_sub(1);
            tree.set_active_tab(target, index);
            Some(new)
        }
        NodeKind::Container | NodeKind::Splitter(_) => match first_panel_in(tree, target) {
            Some(existing) => tabify_into(tree, existing, panel),
            None if is_container => add_panel_child(tree, target, panel, area),
            None => None,
        },
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

pub fn add_panel_child(
    tree: &mut LayoutTree,
    parent: NodeId,
    panel: PanelHandle,
    area: Option<DockArea>,
) -> Option<NodeId> {
    let node = tree.create_panel_node(panel, area);
    if tree.add_child(parent, node) {
        Some(node)
    } else {
        tree.remove_node(node);
        None
    }
}

/// First Panel node in the subtree of `node`, in tree order.
pub fn first_panel_in(tree: &LayoutTree, node: NodeId) -> Option<NodeId> {
    tree.preorder_from(node)
        .into_iter()
        .find(|id| tree.get(*id).is_some_and(|n| n.is_panel()))
}

/// Move every child of `holder` into a new content container and return it.
pub fn wrap_children(tree: &mut LayoutTree, holder: NodeId) -> NodeId {
    let wrapper = tree.create_container_node(NodeRole::Content);
    let children = tree.children(holder).to_vec();
    for child in children {
        tree.add_child(wrapper, child);
    }
    tree.add_child(holder, wrapper);
    wrapper
}
