use std::collections::HashSet;

use berth_core::{DockArea, NodeConstraints, PanelHandle, PanelId, RatioBounds, SplitDirection, Vec2};
use slotmap::SlotMap;

use crate::error::{LayoutError, Result};
use crate::node::{
    default_ratio_for, LayoutNode, NodeId, NodeKind, NodeRole, SkeletonSlot, TabBarPosition,
    DEFAULT_RATIO,
};

// ──────────────────────────────────────────────
// LayoutTree: arena that owns every node
// ──────────────────────────────────────────────

/// The docking layout tree.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. The root is a
/// container created with the tree; it is never removed.
#[derive(Debug, Clone)]
pub struct LayoutTree {
    nodes: SlotMap<NodeId, LayoutNode>,
    root: NodeId,
    bounds: RatioBounds,
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::with_bounds(RatioBounds::default())
    }

    pub fn with_bounds(bounds: RatioBounds) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(LayoutNode::new(
            NodeKind::Container,
            NodeRole::Skeleton(SkeletonSlot::Root),
        ));
        Self { nodes, root, bounds }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn bounds(&self) -> RatioBounds {
        self.bounds
    }

    /// Replace the ratio bounds and re-clamp every splitter.
    pub fn set_bounds(&mut self, bounds: RatioBounds) {
        self.bounds = bounds;
        for node in self.nodes.values_mut() {
            if node.is_splitter() {
                node.ratio = bounds.clamp(node.ratio);
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&LayoutNode> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut LayoutNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// True when the root holds nothing.
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// Number of nodes reachable from the root, root included.
    pub fn node_count(&self) -> usize {
        self.preorder().len()
    }

    pub fn is_protected(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.is_protected())
    }

    // ──────────────────────────────────────────
    // Node creation
    // ──────────────────────────────────────────

    /// Create a detached Panel node.
    pub fn create_panel_node(&mut self, panel: PanelHandle, area: Option<DockArea>) -> NodeId {
        let mut node = LayoutNode::new(NodeKind::Panel(panel), NodeRole::Content);
        node.dock_area = area;
        self.nodes.insert(node)
    }

    /// Create a detached splitter; its ratio starts at the role default.
    pub fn create_splitter_node(&mut self, direction: SplitDirection, role: NodeRole) -> NodeId {
        let mut node = LayoutNode::new(NodeKind::Splitter(direction), role);
        node.ratio = self.bounds.clamp(node.ratio);
        self.nodes.insert(node)
    }

    pub fn create_container_node(&mut self, role: NodeRole) -> NodeId {
        self.nodes.insert(LayoutNode::new(NodeKind::Container, role))
    }

    pub fn create_tab_group(&mut self, role: NodeRole, area: Option<DockArea>) -> NodeId {
        let mut node = LayoutNode::new(NodeKind::TabGroup, role);
        node.dock_area = area;
        self.nodes.insert(node)
    }

    // ──────────────────────────────────────────
    // Linking
    // ──────────────────────────────────────────

    /// Append `child` to `parent`, detaching it from any previous parent.
    ///
    /// The splitter child count is not checked here; callers bring splitters
    /// back to two children before their operation returns.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Insert `child` at `index` (clamped to the child count).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        if parent == child || child == self.root {
            return false;
        }
        match self.nodes.get(parent) {
            Some(p) if !p.is_panel() => {}
            _ => return false,
        }
        if !self.nodes.contains_key(child) || self.is_ancestor(child, parent) {
            return false;
        }

        self.detach(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
        true
    }

    /// Remove `child` from `parent` and drop its subtree. No-op if `child`
    /// is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        self.destroy(child);
        true
    }

    /// Unlink `node` from its parent without dropping it. Returns the former parent.
    pub fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(node)?.parent.take()?;
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|c| *c != node);
        }
        Some(parent)
    }

    /// Put `new` into the child slot currently held by `old`. `old` is left
    /// detached; `new` may be a descendant of `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        if old == new || new == self.root || !self.nodes.contains_key(new) {
            return false;
        }
        let Some(parent) = self.parent(old) else {
            return false;
        };
        if self.is_ancestor(new, parent) {
            return false;
        }
        self.detach(new);
        let Some(index) = self.index_in_parent(old) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children[index] = new;
        }
        if let Some(o) = self.nodes.get_mut(old) {
            o.parent = None;
        }
        if let Some(n) = self.nodes.get_mut(new) {
            n.parent = Some(parent);
        }
        true
    }

    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|c| *c == node)
    }

    /// True if `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Detach and drop a node with its subtree. The root cannot be removed.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        if node == self.root || !self.nodes.contains_key(node) {
            return false;
        }
        self.detach(node);
        self.destroy(node);
        true
    }

    fn destroy(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.remove(id) {
                stack.extend(removed.children);
            }
        }
    }

    /// Drop every node and start over with an empty root.
    pub fn clear(&mut self) {
        let children = self.children(self.root).to_vec();
        for child in children {
            self.remove_node(child);
        }
        if let Some(root) = self.nodes.get_mut(self.root) {
            root.rect = berth_core::Rect::EMPTY;
        }
    }

    // ──────────────────────────────────────────
    // Queries
    // ──────────────────────────────────────────

    /// All reachable nodes in tree order.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root)
    }

    pub fn preorder_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(start) {
            return out;
        }
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// First Panel node (depth-first) showing `panel`.
    pub fn find_panel(&self, panel: PanelId) -> Option<NodeId> {
        self.preorder()
            .into_iter()
            .find(|id| self.nodes.get(*id).and_then(|n| n.panel()).is_some_and(|p| p.id == panel))
    }

    /// Deepest node whose cached rect contains `point`.
    ///
    /// Rects are only as fresh as the last geometry pass.
    pub fn find_node_at(&self, point: Vec2) -> Option<NodeId> {
        let root = self.nodes.get(self.root)?;
        if !root.rect.contains(point) {
            return None;
        }
        let mut current = self.root;
        loop {
            let node = self.nodes.get(current)?;
            let hits: Vec<NodeId> = node
                .children
                .iter()
                .copied()
                .filter(|c| self.nodes.get(*c).is_some_and(|n| n.rect.contains(point)))
                .collect();
            let next = if node.is_tab_group() {
                let active = node.children.get(node.active_tab).copied();
                active.filter(|a| hits.contains(a)).or(hits.first().copied())
            } else {
                hits.first().copied()
            };
            match next {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    /// Panels in tree order.
    pub fn panels(&self) -> Vec<PanelHandle> {
        let mut out = Vec::new();
        self.traverse_panels(|_, panel| out.push(panel.clone()));
        out
    }

    pub fn panel_ids(&self) -> Vec<PanelId> {
        self.subtree_panel_ids(self.root)
    }

    pub fn panel_count(&self) -> usize {
        self.subtree_panel_count(self.root)
    }

    pub fn subtree_panel_ids(&self, node: NodeId) -> Vec<PanelId> {
        self.preorder_from(node)
            .into_iter()
            .filter_map(|id| self.nodes.get(id).and_then(|n| n.panel()).map(|p| p.id))
            .collect()
    }

    pub fn subtree_panel_count(&self, node: NodeId) -> usize {
        self.preorder_from(node)
            .into_iter()
            .filter(|id| self.nodes.get(*id).is_some_and(|n| n.is_panel()))
            .count()
    }

    /// Distance from the root; the root is at depth 0.
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(node);
        while let Some(id) = current {
            depth += 1;
            current = self.parent(id);
        }
        depth
    }

    pub fn max_depth(&self) -> usize {
        self.preorder()
            .into_iter()
            .map(|id| self.depth(id))
            .max()
            .unwrap_or(0)
    }

    /// First node carrying `role`, in tree order.
    pub fn find_role(&self, role: NodeRole) -> Option<NodeId> {
        self.preorder()
            .into_iter()
            .find(|id| self.nodes.get(*id).is_some_and(|n| n.role == role))
    }

    // ──────────────────────────────────────────
    // Traversal
    // ──────────────────────────────────────────

    pub fn traverse_nodes(&self, mut visit: impl FnMut(NodeId, &LayoutNode)) {
        for id in self.preorder() {
            if let Some(node) = self.nodes.get(id) {
                visit(id, node);
            }
        }
    }

    pub fn traverse_panels(&self, mut visit: impl FnMut(NodeId, &PanelHandle)) {
        self.traverse_nodes(|id, node| {
            if let Some(panel) = node.panel() {
                visit(id, panel);
            }
        });
    }

    pub fn traverse_splitters(&self, mut visit: impl FnMut(NodeId, &LayoutNode)) {
        self.traverse_nodes(|id, node| {
            if node.is_splitter() {
                visit(id, node);
            }
        });
    }

    /// Containers and tab groups, root included.
    pub fn traverse_containers(&self, mut visit: impl FnMut(NodeId, &LayoutNode)) {
        self.traverse_nodes(|id, node| {
            if node.is_container() {
                visit(id, node);
            }
        });
    }

    // ──────────────────────────────────────────
    // Node properties
    // ──────────────────────────────────────────

    pub fn ratio(&self, node: NodeId) -> Option<f32> {
        self.nodes.get(node).filter(|n| n.is_splitter()).map(|n| n.ratio)
    }

    /// Set a splitter ratio (clamped to the bounds) and mark it customized.
    pub fn set_ratio(&mut self, node: NodeId, ratio: f32) -> bool {
        let bounds = self.bounds;
        match self.nodes.get_mut(node) {
            Some(n) if n.is_splitter() => {
                n.ratio = bounds.clamp(ratio);
                n.ratio_customized = true;
                true
            }
            _ => false,
        }
    }

    /// Set a ratio on behalf of an optimizer; the customized flag is kept.
    pub(crate) fn adjust_ratio(&mut self, node: NodeId, ratio: f32) -> bool {
        let bounds = self.bounds;
        match self.nodes.get_mut(node) {
            Some(n) if n.is_splitter() => {
                n.ratio = bounds.clamp(ratio);
                true
            }
            _ => false,
        }
    }

    /// Return a splitter to the default for its role.
    pub fn reset_ratio(&mut self, node: NodeId) -> bool {
        let bounds = self.bounds;
        match self.nodes.get_mut(node) {
            Some(n) if n.is_splitter() => {
                n.ratio = bounds.clamp(default_ratio_for(n.role).unwrap_or(DEFAULT_RATIO));
                n.ratio_customized = false;
                true
            }
            _ => false,
        }
    }

    fn settled_splitter(&self, node: NodeId) -> Option<(&LayoutNode, SplitDirection)> {
        let n = self.nodes.get(node)?;
        let direction = n.direction()?;
        (n.children.len() == 2).then_some((n, direction))
    }

    /// Sash offset in pixels from the splitter's origin along its axis.
    /// `None` unless `node` is a two-child splitter that has been laid out.
    pub fn sash_position(&self, node: NodeId) -> Option<f32> {
        let (n, direction) = self.settled_splitter(node)?;
        let total = n.rect.size().along(direction);
        if total <= 0.0 {
            return None;
        }
        let first = self.nodes.get(n.children[0])?;
        let extent = first.rect.size().along(direction);
        if extent > 0.0 {
            Some(extent)
        } else {
            Some(total * n.ratio)
        }
    }

    pub fn set_sash_position(&mut self, node: NodeId, pixels: f32) -> bool {
        let Some((n, direction)) = self.settled_splitter(node) else {
            return false;
        };
        let total = n.rect.size().along(direction);
        if total <= 0.0 {
            return false;
        }
        self.set_ratio(node, pixels / total)
    }

    pub fn set_constraints(&mut self, node: NodeId, constraints: NodeConstraints) -> bool {
        match self.nodes.get_mut(node) {
            Some(n) => {
                n.constraints = constraints;
                true
            }
            None => false,
        }
    }

    pub fn set_dock_area(&mut self, node: NodeId, area: Option<DockArea>) -> bool {
        match self.nodes.get_mut(node) {
            Some(n) => {
                n.dock_area = area;
                true
            }
            None => false,
        }
    }

    pub fn set_active_tab(&mut self, node: NodeId, index: usize) -> bool {
        match self.nodes.get_mut(node) {
            Some(n) if n.is_tab_group() && index < n.children.len() => {
                n.active_tab = index;
                true
            }
            _ => false,
        }
    }

    pub fn set_tab_bar(&mut self, node: NodeId, position: TabBarPosition) -> bool {
        match self.nodes.get_mut(node) {
            Some(n) if n.is_tab_group() => {
                n.tab_bar = position;
                true
            }
            _ => false,
        }
    }

    /// Exchange the panels shown by two Panel nodes, including their dock areas.
    pub fn swap_panels(&mut self, a: PanelId, b: PanelId) -> bool {
        if a == b {
            return false;
        }
        let (Some(node_a), Some(node_b)) = (self.find_panel(a), self.find_panel(b)) else {
            return false;
        };
        let Some([first, second]) = self.nodes.get_disjoint_mut([node_a, node_b]) else {
            return false;
        };
        std::mem::swap(&mut first.kind, &mut second.kind);
        std::mem::swap(&mut first.dock_area, &mut second.dock_area);
        true
    }

    // ──────────────────────────────────────────
    // Detach and cleanup
    // ──────────────────────────────────────────

    /// Remove exactly one Panel node and nothing else. Returns the former
    /// parent, which may now be empty or a single-child splitter.
    pub fn detach_panel(&mut self, panel: PanelId) -> Option<NodeId> {
        let node = self.find_panel(panel)?;
        let parent = self.detach(node);
        self.destroy(node);
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            if p.active_tab >= p.children.len() {
                p.active_tab = p.children.len().saturating_sub(1);
            }
        }
        parent
    }

    /// Remove empty non-skeleton nodes and promote the only child of
    /// non-skeleton splitters, bottom-up over the whole tree.
    /// Returns how many nodes were removed.
    pub fn cleanup_empty_nodes(&mut self) -> usize {
        let mut removed = 0;
        for id in self.preorder().into_iter().rev() {
            if self.collapse(id, false) {
                removed += 1;
            }
        }
        removed
    }

    /// Like [`cleanup_empty_nodes`](Self::cleanup_empty_nodes), restricted to
    /// `candidates` and their ancestors. Stale handles are skipped.
    pub fn cleanup_candidates(&mut self, candidates: &[NodeId]) -> usize {
        let mut removed = 0;
        for &candidate in candidates {
            let mut current = Some(candidate);
            while let Some(id) = current {
                if !self.nodes.contains_key(id) {
                    break;
                }
                let parent = self.parent(id);
                if !self.collapse(id, false) {
                    break;
                }
                removed += 1;
                current = parent;
            }
        }
        removed
    }

    /// Cleanup plus promotion of single-child content tab groups and containers.
    pub fn compact(&mut self) -> usize {
        self.compact_subtree(self.root)
    }

    /// [`compact`](Self::compact) limited to the subtree under `start`.
    pub fn compact_subtree(&mut self, start: NodeId) -> usize {
        let mut removed = 0;
        for id in self.preorder_from(start).into_iter().rev() {
            if self.collapse(id, true) {
                removed += 1;
            }
        }
        removed
    }

    /// Remove `id` if it is empty, or promote its only child. Panels, the
    /// root and skeleton nodes are never touched.
    fn collapse(&mut self, id: NodeId, compact_groups: bool) -> bool {
        if id == self.root {
            return false;
        }
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if node.is_panel() || node.is_protected() {
            return false;
        }
        if node.children.is_empty() {
            log::trace!("cleanup: dropping empty {:?}", node.kind);
            return self.remove_node(id);
        }
        let promotable = match node.kind {
            NodeKind::Splitter(_) => true,
            NodeKind::TabGroup | NodeKind::Container => {
                compact_groups && node.role == NodeRole::Content
            }
            NodeKind::Panel(_) => false,
        };
        if node.children.len() == 1 && promotable {
            let child = node.children[0];
            if self.replace(id, child) {
                self.destroy(id);
                return true;
            }
        }
        false
    }

    // ──────────────────────────────────────────
    // Invariants
    // ──────────────────────────────────────────

    /// Check the settled-tree invariants: consistent parent links, Panel
    /// nodes without children, splitters with zero or two children, ratios
    /// within bounds and no panel shown twice.
    pub fn check_invariants(&self) -> Result<()> {
        let root = self
            .nodes
            .get(self.root)
            .ok_or_else(|| LayoutError::Invariant("root node missing".into()))?;
        if root.parent.is_some() {
            return Err(LayoutError::Invariant("root has a parent".into()));
        }

        let mut panels = HashSet::new();
        let mut visited = HashSet::new();
        for id in self.preorder() {
            if !visited.insert(id) {
                return Err(LayoutError::Invariant("node reachable twice".into()));
            }
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| LayoutError::Invariant("dangling child handle".into()))?;
            for child in &node.children {
                if self.parent(*child) != Some(id) {
                    return Err(LayoutError::Invariant("child with inconsistent parent link".into()));
                }
            }
            match &node.kind {
                NodeKind::Panel(panel) => {
                    if !node.children.is_empty() {
                        return Err(LayoutError::Invariant(format!(
                            "panel {panel} has children"
                        )));
                    }
                    if !panels.insert(panel.id) {
                        return Err(LayoutError::Invariant(format!(
                            "panel {panel} appears more than once"
                        )));
                    }
                }
                NodeKind::Splitter(_) => {
                    let count = node.children.len();
                    if count != 0 && count != 2 {
                        return Err(LayoutError::Invariant(format!(
                            "splitter with {count} children"
                        )));
                    }
                    if !self.bounds.contains(node.ratio) {
                        return Err(LayoutError::Invariant(format!(
                            "splitter ratio {} outside [{}, {}]",
                            node.ratio, self.bounds.min, self.bounds.max
                        )));
                    }
                }
                NodeKind::Container | NodeKind::TabGroup => {}
            }
        }
        Ok(())
    }
}
