//! Strategy-tagged text encoding of a layout tree.
//!
//! ```text
//! IDELayout v1 {
//!   Container role=root
//!     Splitter role=main-split axis=vertical ratio=0.850000 custom=false
//!       ...
//!           Panel role=content area=left id=3 title="Object Tree"
//! }
//! ```
//!
//! One node per line, indented two spaces per depth below the header. The
//! header names the strategy that wrote the layout; decoding with another
//! tag fails.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use berth_core::{DockArea, PanelHandle, RatioBounds, SplitDirection};

use crate::error::{LayoutError, Result};
use crate::node::{LayoutNode, NodeId, NodeKind, NodeRole, SkeletonSlot, TabBarPosition};
use crate::tree::LayoutTree;

const VERSION: &str = "v1";

// ──────────────────────────────────────────────
// Encoding
// ──────────────────────────────────────────────

pub fn encode(tree: &LayoutTree, tag: &str) -> String {
    let mut out = format!("{tag} {VERSION} {{\n");
    tree.traverse_nodes(|id, node| {
        let indent = "  ".repeat(tree.depth(id) + 1);
        out.push_str(&indent);
        out.push_str(&encode_node(node));
        out.push('\n');
    });
    out.push_str("}\n");
    out
}

fn encode_node(node: &LayoutNode) -> String {
    let mut line = format!("{} role={}", node.kind().token(), node.role().token());
    match node.kind() {
        NodeKind::Splitter(direction) => {
            let axis = match direction {
                SplitDirection::Horizontal => "horizontal",
                SplitDirection::Vertical => "vertical",
            };
            let _ = write!(
                line,
                " axis={axis} ratio={:.6} custom={}",
                node.ratio(),
                node.ratio_customized()
            );
        }
        NodeKind::TabGroup => {
            let _ = write!(line, " active={} tabs={}", node.active_tab(), node.tab_bar().token());
        }
        NodeKind::Panel(_) | NodeKind::Container => {}
    }
    if let Some(area) = node.dock_area() {
        let _ = write!(line, " area={}", area.name());
    }
    let c = node.constraints();
    if c.min_width > 0.0 || c.min_height > 0.0 {
        let _ = write!(line, " min={},{}", c.min_width, c.min_height);
    }
    if let Some(panel) = node.panel() {
        let title = serde_json::to_string(&panel.title).unwrap_or_else(|_| "\"\"".to_string());
        let _ = write!(line, " id={} title={title}", panel.id);
    }
    line
}

// ──────────────────────────────────────────────
// Decoding
// ──────────────────────────────────────────────

/// Parse a layout written under `tag` into a fresh tree.
pub fn decode(data: &str, tag: &str, bounds: RatioBounds) -> Result<LayoutTree> {
    let mut lines = data
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty());

    let (header_line, header) = lines.next().ok_or_else(|| corrupt(1, "empty layout data"))?;
    let mut header_tokens = header.split_whitespace();
    let found = header_tokens.next().unwrap_or_default();
    if found != tag {
        return Err(LayoutError::ForeignFormat {
            expected: tag.to_string(),
            found: found.to_string(),
        });
    }
    if header_tokens.next() != Some(VERSION) || header_tokens.next() != Some("{") {
        return Err(corrupt(header_line, "unsupported layout header"));
    }

    let mut tree = LayoutTree::with_bounds(bounds);
    let mut path: Vec<NodeId> = Vec::new();
    let mut tab_groups: Vec<(NodeId, usize)> = Vec::new();
    let mut closed = false;
    let mut last_line = header_line;

    for (number, line) in lines.by_ref() {
        last_line = number;
        if line.trim() == "}" {
            closed = true;
            break;
        }
        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent < 2 || indent % 2 != 0 {
            return Err(corrupt(number, "bad indentation"));
        }
        let depth = indent / 2 - 1;
        let parsed = parse_node(line.trim(), number)?;

        if depth == 0 {
            if !path.is_empty() || parsed.role != NodeRole::Skeleton(SkeletonSlot::Root) {
                return Err(corrupt(number, "layout must start with a single root container"));
            }
            path.push(tree.root());
            continue;
        }
        if depth > path.len() {
            return Err(corrupt(number, "node is nested deeper than its parent"));
        }
        if parsed.role == NodeRole::Skeleton(SkeletonSlot::Root) {
            return Err(corrupt(number, "root role below the root"));
        }
        path.truncate(depth);
        let Some(&parent) = path.last() else {
            return Err(corrupt(number, "node without a parent"));
        };
        let id = parsed.build(&mut tree);
        if !tree.add_child(parent, id) {
            return Err(corrupt(number, "parent cannot hold children"));
        }
        if tree.get(id).is_some_and(|n| matches!(n.kind, NodeKind::TabGroup)) {
            tab_groups.push((id, number));
        }
        path.push(id);
    }

    if !closed {
        return Err(corrupt(last_line, "missing closing brace"));
    }
    if let Some((number, _)) = lines.next() {
        return Err(corrupt(number, "data after closing brace"));
    }
    if path.is_empty() {
        return Err(corrupt(last_line, "layout has no root"));
    }
    for (id, number) in tab_groups {
        let Some(node) = tree.get(id) else {
            continue;
        };
        if node.active_tab >= node.children.len().max(1) {
            return Err(corrupt(
                number,
                &format!("active tab {} of {} tabs", node.active_tab, node.children.len()),
            ));
        }
    }
    tree.check_invariants()
        .map_err(|e| corrupt(last_line, &e.to_string()))?;
    Ok(tree)
}

fn corrupt(line: usize, reason: &str) -> LayoutError {
    LayoutError::Corrupt {
        line,
        reason: reason.to_string(),
    }
}

struct ParsedNode {
    kind: NodeKind,
    role: NodeRole,
    ratio: Option<(f32, bool)>,
    tabs: Option<(usize, TabBarPosition)>,
    area: Option<DockArea>,
    min: Option<(f32, f32)>,
}

impl ParsedNode {
    fn build(self, tree: &mut LayoutTree) -> NodeId {
        let id = match &self.kind {
            NodeKind::Panel(panel) => tree.create_panel_node(panel.clone(), self.area),
            NodeKind::Splitter(direction) => tree.create_splitter_node(*direction, self.role),
            NodeKind::Container => tree.create_container_node(self.role),
            NodeKind::TabGroup => tree.create_tab_group(self.role, self.area),
        };
        let bounds = tree.bounds();
        if let Some(node) = tree.get_mut(id) {
            node.role = self.role;
            node.dock_area = self.area;
            if let Some((ratio, custom)) = self.ratio {
                node.ratio = bounds.clamp(ratio);
                node.ratio_customized = custom;
            }
            if let Some((active, bar)) = self.tabs {
                node.active_tab = active;
                node.tab_bar = bar;
            }
            if let Some((w, h)) = self.min {
                node.constraints.min_width = w;
                node.constraints.min_height = h;
            }
        }
        id
    }
}

fn parse_node(line: &str, number: usize) -> Result<ParsedNode> {
    let (head, title) = match line.split_once(" title=") {
        Some((head, raw)) => {
            let title: String = serde_json::from_str(raw)
                .map_err(|e| corrupt(number, &format!("bad title: {e}")))?;
            (head, Some(title))
        }
        None => (line, None),
    };

    let mut tokens = head.split_whitespace();
    let kind_token = tokens.next().ok_or_else(|| corrupt(number, "missing node kind"))?;
    let mut fields = BTreeMap::new();
    for token in tokens {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| corrupt(number, &format!("malformed field '{token}'")))?;
        fields.insert(key, value);
    }

    let role = fields
        .get("role")
        .and_then(|r| NodeRole::from_token(r))
        .ok_or_else(|| corrupt(number, "missing or unknown role"))?;
    let area = match fields.get("area") {
        Some(name) => Some(
            DockArea::from_name(name).ok_or_else(|| corrupt(number, &format!("unknown area '{name}'")))?,
        ),
        None => None,
    };
    let min = match fields.get("min") {
        Some(raw) => {
            let (w, h) = raw
                .split_once(',')
                .and_then(|(w, h)| Some((w.parse::<f32>().ok()?, h.parse::<f32>().ok()?)))
                .ok_or_else(|| corrupt(number, "bad minimum size"))?;
            Some((w, h))
        }
        None => None,
    };

    let mut parsed = ParsedNode {
        kind: NodeKind::Container,
        role,
        ratio: None,
        tabs: None,
        area,
        min,
    };

    match kind_token {
        "Container" => {}
        "TabGroup" => {
            parsed.kind = NodeKind::TabGroup;
            let active = match fields.get("active") {
                Some(raw) => raw.parse().map_err(|_| corrupt(number, "bad active tab"))?,
                None => 0,
            };
            let bar = match fields.get("tabs") {
                Some(raw) => TabBarPosition::from_token(raw)
                    .ok_or_else(|| corrupt(number, "bad tab bar position"))?,
                None => TabBarPosition::default(),
            };
            parsed.tabs = Some((active, bar));
        }
        "Splitter" => {
            let direction = match fields.get("axis") {
                Some(&"horizontal") => SplitDirection::Horizontal,
                Some(&"vertical") => SplitDirection::Vertical,
                _ => return Err(corrupt(number, "splitter without a valid axis")),
            };
            let ratio: f32 = fields
                .get("ratio")
                .and_then(|r| r.parse().ok())
                .filter(|r: &f32| r.is_finite() && (0.0..=1.0).contains(r))
                .ok_or_else(|| corrupt(number, "splitter without a valid ratio"))?;
            let custom = fields.get("custom").is_some_and(|c| *c == "true");
            parsed.kind = NodeKind::Splitter(direction);
            parsed.ratio = Some((ratio, custom));
        }
        "Panel" => {
            let id = fields
                .get("id")
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| corrupt(number, "panel without a valid id"))?;
            let title = title.ok_or_else(|| corrupt(number, "panel without a title"))?;
            parsed.kind = NodeKind::Panel(PanelHandle::new(id, title));
        }
        other => return Err(corrupt(number, &format!("unknown node kind '{other}'"))),
    }
    if !role_fits_kind(parsed.role, &parsed.kind) {
        return Err(corrupt(
            number,
            &format!("role '{}' cannot be a {kind_token}", parsed.role.token()),
        ));
    }
    Ok(parsed)
}

/// Skeleton, stack and bucket roles belong to one node kind each. Content
/// fits any kind.
fn role_fits_kind(role: NodeRole, kind: &NodeKind) -> bool {
    match role {
        NodeRole::Content => true,
        NodeRole::Skeleton(SkeletonSlot::MainSplit | SkeletonSlot::WorkSplit) | NodeRole::SidebarStack => {
            matches!(kind, NodeKind::Splitter(_))
        }
        NodeRole::Skeleton(SkeletonSlot::BottomStatusBar) | NodeRole::AreaBucket => {
            matches!(kind, NodeKind::TabGroup)
        }
        NodeRole::Skeleton(_) => matches!(kind, NodeKind::Container),
    }
}
