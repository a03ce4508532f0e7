//! Layout trees as dumped and loaded by herbstluftwm.
//!
//! A [`Tree`] is an arena of [`Node`]s stored in pre-order, with the root at
//! index 0.  Every node knows its [`Path`] (the sibling indices leading to it
//! from the root) and the tree keeps a `Path → NodeId` index, so two trees
//! parsed independently can be correlated by structural position without
//! any object identity carrying over.
//!
//! The textual grammar is handled by [`parse`](self::parse) and
//! [`render`](self::render).

pub mod parse;
pub mod render;

use std::collections::HashMap;
use std::fmt;

pub use parse::parse;
pub use render::{render, render_layout};

/// Two ratios closer than this are considered the same split.
pub const RATIO_TOLERANCE: f64 = 1e-3;

/// Ratio used when a layout atom does not carry one.
pub const DEFAULT_RATIO: f64 = 0.5;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Sibling indices from the root down to a node.
///
/// The root has the empty path.  Since trees are binary every element is
/// `0` or `1`, and the [`Display`](fmt::Display) form simply concatenates
/// them (`"01"`), which is what herbstluftwm's `index=` rule consequence
/// expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th child of `self`.
    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        Self(steps)
    }

    pub fn steps(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for Path {
    fn from(steps: Vec<usize>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Split direction of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The layout atom of a node, e.g. `horizontal:0.5:1`, `vertical:1` or
/// `max:0`.
///
/// Fields that were absent in the source text stay `None` so the node
/// renders back exactly as it was read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layout {
    Oriented {
        orientation: Orientation,
        ratio: Option<f64>,
        selection: Option<usize>,
    },
    /// `grid:<n>` marker; recorded, not interpreted.
    Grid(usize),
    /// `max:<n>` marker; recorded, not interpreted.
    Max(usize),
}

impl Layout {
    pub fn orientation(&self) -> Option<Orientation> {
        match self {
            Layout::Oriented { orientation, .. } => Some(*orientation),
            Layout::Grid(_) | Layout::Max(_) => None,
        }
    }

    /// Fraction of space given to the first child.  Defaults to 0.5.
    pub fn ratio(&self) -> f64 {
        match self {
            Layout::Oriented { ratio, .. } => ratio.unwrap_or(DEFAULT_RATIO),
            Layout::Grid(_) | Layout::Max(_) => DEFAULT_RATIO,
        }
    }

    /// Index of the focused child or window.  Defaults to 0.
    pub fn selection(&self) -> usize {
        match self {
            Layout::Oriented { selection, .. } => selection.unwrap_or(0),
            Layout::Grid(n) | Layout::Max(n) => *n,
        }
    }
}

/// Manager-assigned window handle, textual form `0x<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(String);

impl WindowId {
    /// Accepts `0x` followed by at least one hex digit.
    pub fn parse(token: &str) -> Option<Self> {
        let digits = token.strip_prefix("0x")?;
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(token.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbolic window reference, written `window:<name>`.  The name is looked
/// up in the configured window table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowSpec(String);

impl WindowSpec {
    pub const PREFIX: &'static str = "window:";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn parse(token: &str) -> Option<Self> {
        token
            .strip_prefix(Self::PREFIX)
            .filter(|name| !name.is_empty())
            .map(Self::new)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

/// Content of a clients leaf.  Realized ids and declared specs never mix.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Windows {
    #[default]
    Empty,
    Realized(Vec<WindowId>),
    Declared(Vec<WindowSpec>),
}

impl Windows {
    pub fn realized(&self) -> &[WindowId] {
        match self {
            Windows::Realized(ids) => ids,
            Windows::Empty | Windows::Declared(_) => &[],
        }
    }

    pub fn declared(&self) -> &[WindowSpec] {
        match self {
            Windows::Declared(specs) => specs,
            Windows::Empty | Windows::Realized(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Windows::Empty => true,
            Windows::Realized(ids) => ids.is_empty(),
            Windows::Declared(specs) => specs.is_empty(),
        }
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Binary partition of a frame.
    Split {
        layout: Option<Layout>,
        children: [NodeId; 2],
    },
    /// Leaf holding windows.
    Clients {
        layout: Option<Layout>,
        windows: Windows,
    },
    /// A tag this crate does not understand, kept verbatim so it survives a
    /// parse/render cycle.
    Opaque {
        tag: String,
        atoms: Vec<String>,
        children: Vec<NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    path: Path,
    kind: NodeKind,
}

impl Node {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn layout(&self) -> Option<&Layout> {
        match &self.kind {
            NodeKind::Split { layout, .. } | NodeKind::Clients { layout, .. } => layout.as_ref(),
            NodeKind::Opaque { .. } => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Split { children, .. } => children,
            NodeKind::Clients { .. } => &[],
            NodeKind::Opaque { children, .. } => children,
        }
    }

    pub fn windows(&self) -> Option<&Windows> {
        match &self.kind {
            NodeKind::Clients { windows, .. } => Some(windows),
            NodeKind::Split { .. } | NodeKind::Opaque { .. } => None,
        }
    }

    pub fn realized(&self) -> &[WindowId] {
        self.windows().map(Windows::realized).unwrap_or(&[])
    }

    pub fn declared(&self) -> &[WindowSpec] {
        self.windows().map(Windows::declared).unwrap_or(&[])
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }
}

/// Errors produced while building a tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// Malformed input text.
    #[error("parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// An atom that is not valid for the node it appears on.
    #[error("unknown attribute {token:?} at path {path:?}")]
    UnknownAttribute { token: String, path: String },

    /// A node ended up with a child count other than 0 or 2.
    #[error("binary tree violation at path {path:?}: {detail}")]
    BinaryTreeViolation { path: String, detail: String },

    /// A clients node holding both realized ids and declared specs.
    #[error("clients node at path {path:?} mixes window ids and specs ({token:?})")]
    MixedWindows { token: String, path: String },
}

/// A parsed layout tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    by_path: HashMap<Path, NodeId>,
}

impl Tree {
    /// Parse herbstluftwm dump text.  See [`parse`].
    pub fn parse(text: &str) -> Result<Self, TreeError> {
        parse::parse(text)
    }

    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Look a node up by structural position.
    pub fn get(&self, path: &Path) -> Option<&Node> {
        self.by_path.get(path).map(|id| self.node(*id))
    }

    /// All nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        self.node(id).children().iter().map(|c| self.node(*c))
    }

    /// Every realized window id, in pre-order.
    pub fn realized_windows(&self) -> Vec<&WindowId> {
        self.iter().flat_map(|n| n.realized()).collect()
    }

    /// Whether both trees have the same split structure: shape,
    /// orientations and ratios (within [`RATIO_TOLERANCE`]).  Leaf content
    /// is ignored.
    pub fn same_skeleton(&self, other: &Tree) -> bool {
        self.skeleton_eq(NodeId::ROOT, other, NodeId::ROOT)
    }

    fn skeleton_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        match (&self.node(a).kind, &other.node(b).kind) {
            (
                NodeKind::Split { layout: la, children: ca },
                NodeKind::Split { layout: lb, children: cb },
            ) => {
                let orient = |l: &Option<Layout>| l.as_ref().and_then(Layout::orientation);
                let ratio = |l: &Option<Layout>| l.as_ref().map_or(DEFAULT_RATIO, Layout::ratio);
                orient(la) == orient(lb)
                    && (ratio(la) - ratio(lb)).abs() <= RATIO_TOLERANCE
                    && self.skeleton_eq(ca[0], other, cb[0])
                    && self.skeleton_eq(ca[1], other, cb[1])
            }
            (NodeKind::Clients { .. }, NodeKind::Clients { .. }) => true,
            (
                NodeKind::Opaque { tag: ta, atoms: aa, children: ca },
                NodeKind::Opaque { tag: tb, atoms: ab, children: cb },
            ) => {
                ta == tb
                    && aa == ab
                    && ca.len() == cb.len()
                    && ca
                        .iter()
                        .zip(cb)
                        .all(|(x, y)| self.skeleton_eq(*x, other, *y))
            }
            _ => false,
        }
    }

    /// Reserve a slot for a node whose kind is filled in once its children
    /// are known.  Slots are handed out in pre-order.
    pub(crate) fn reserve(&mut self, path: Path) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_path.insert(path.clone(), id);
        self.nodes.push(Node {
            path,
            kind: NodeKind::Clients {
                layout: None,
                windows: Windows::Empty,
            },
        });
        id
    }

    pub(crate) fn fill(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.0].kind = kind;
    }

    pub(crate) fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            by_path: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_display_concatenates_indices() {
        assert_eq!(Path::root().to_string(), "");
        assert_eq!(Path::root().child(0).child(1).to_string(), "01");
        assert!(Path::root().is_root());
        assert_eq!(Path::from(vec![1, 1, 0]).depth(), 3);
    }

    #[test]
    fn window_id_requires_hex_digits() {
        assert!(WindowId::parse("0x1e00142").is_some());
        assert!(WindowId::parse("0xABCdef").is_some());
        assert!(WindowId::parse("0x").is_none());
        assert!(WindowId::parse("0xzz").is_none());
        assert!(WindowId::parse("1e00142").is_none());
    }

    #[test]
    fn window_spec_requires_name() {
        assert_eq!(WindowSpec::parse("window:AAA").unwrap().name(), "AAA");
        assert!(WindowSpec::parse("window:").is_none());
        assert!(WindowSpec::parse("windows:AAA").is_none());
        assert_eq!(WindowSpec::new("x").to_string(), "window:x");
    }

    #[test]
    fn layout_defaults() {
        let l = Layout::Oriented {
            orientation: Orientation::Vertical,
            ratio: None,
            selection: None,
        };
        assert_eq!(l.ratio(), 0.5);
        assert_eq!(l.selection(), 0);
        assert_eq!(Layout::Max(1).selection(), 1);
        assert_eq!(Layout::Grid(0).orientation(), None);
    }

    #[test]
    fn lookup_by_path() {
        let t = Tree::parse(
            "(split vertical:0.75:0 (split horizontal:0.5:0 (clients vertical:0 0x1) (clients vertical:0)) (clients max:0 0x2))",
        )
        .unwrap();
        assert_eq!(t.len(), 5);
        let n = t.get(&Path::from(vec![0, 0])).unwrap();
        assert_eq!(n.realized()[0].as_str(), "0x1");
        assert!(t.get(&Path::from(vec![1, 0])).is_none());
        let ids: Vec<&str> = t.realized_windows().iter().map(|w| w.as_str()).collect();
        assert_eq!(ids, vec!["0x1", "0x2"]);
    }

    #[test]
    fn iteration_is_pre_order() {
        let t = Tree::parse(
            "(split vertical:0.5:0 (split horizontal:0.5:0 (clients) (clients)) (clients))",
        )
        .unwrap();
        let paths: Vec<String> = t.iter().map(|n| n.path().to_string()).collect();
        assert_eq!(paths, vec!["", "0", "00", "01", "1"]);
    }

    #[test]
    fn skeleton_ignores_windows_and_clients_layout() {
        let a = Tree::parse("(split horizontal:0.5:0 (clients window:A) (clients window:B))").unwrap();
        let b = Tree::parse("(split horizontal:0.5:1 (clients max:0 0x1) (clients))").unwrap();
        assert!(a.same_skeleton(&b));
    }

    #[test]
    fn skeleton_detects_ratio_and_shape_changes() {
        let a = Tree::parse("(split horizontal:0.5:0 (clients) (clients))").unwrap();
        let ratio = Tree::parse("(split horizontal:0.6:0 (clients) (clients))").unwrap();
        let orient = Tree::parse("(split vertical:0.5:0 (clients) (clients))").unwrap();
        let leaf = Tree::parse("(clients vertical:0)").unwrap();
        let close = Tree::parse("(split horizontal:0.5004:0 (clients) (clients))").unwrap();
        assert!(!a.same_skeleton(&ratio));
        assert!(!a.same_skeleton(&orient));
        assert!(!a.same_skeleton(&leaf));
        assert!(a.same_skeleton(&close));
    }
}
