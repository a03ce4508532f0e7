//! Serialization of a [`Tree`] back into dump/load syntax.

use super::{Layout, NodeId, NodeKind, Orientation, Tree, Windows};
use std::fmt::Write;

/// Render `tree` in the same syntax [`parse`](super::parse) reads.
///
/// `parse(&render(&t))` reproduces `t`.  Ratios are printed with Rust's
/// shortest round-trip float formatting, so `0.50` comes back as `0.5`.
pub fn render(tree: &Tree) -> String {
    let mut out = String::new();
    write_node(tree, NodeId::ROOT, &mut out, Mode::Dump);
    out
}

/// Render `tree` as the argument of herbstluftwm's `load` command.
///
/// Declared `window:` specs are dropped since the manager does not know
/// them, split attributes are written out in full and leaves without a
/// layout get `vertical:0`.  Returns `None` when the root is a leaf with
/// nothing to load.
pub fn render_layout(tree: &Tree) -> Option<String> {
    if let NodeKind::Clients { layout: None, .. } = tree.root().kind() {
        return None;
    }
    let mut out = String::new();
    write_node(tree, NodeId::ROOT, &mut out, Mode::Load);
    Some(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Dump,
    Load,
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String, mode: Mode) {
    match tree.node(id).kind() {
        NodeKind::Split { layout, children } => {
            out.push_str("(split");
            match (mode, layout) {
                (Mode::Dump, Some(l)) => {
                    out.push(' ');
                    write_layout(l, out);
                }
                (Mode::Dump, None) => {}
                (Mode::Load, l) => {
                    let orientation = l
                        .as_ref()
                        .and_then(Layout::orientation)
                        .unwrap_or(Orientation::Vertical);
                    let ratio = l.as_ref().map_or(super::DEFAULT_RATIO, Layout::ratio);
                    let selection = l.as_ref().map_or(0, Layout::selection);
                    let _ = write!(out, " {}:{}:{}", orientation, ratio, selection);
                }
            }
            for child in children {
                out.push(' ');
                write_node(tree, *child, out, mode);
            }
            out.push(')');
        }
        NodeKind::Clients { layout, windows } => {
            out.push_str("(clients");
            match (mode, layout) {
                (_, Some(l)) => {
                    out.push(' ');
                    write_layout(l, out);
                }
                (Mode::Dump, None) => {}
                (Mode::Load, None) => out.push_str(" vertical:0"),
            }
            match windows {
                Windows::Empty => {}
                Windows::Realized(ids) => {
                    for w in ids {
                        let _ = write!(out, " {}", w);
                    }
                }
                Windows::Declared(specs) => {
                    if mode == Mode::Dump {
                        for s in specs {
                            let _ = write!(out, " {}", s);
                        }
                    }
                }
            }
            out.push(')');
        }
        NodeKind::Opaque { tag, atoms, children } => {
            out.push('(');
            out.push_str(tag);
            for a in atoms {
                out.push(' ');
                out.push_str(a);
            }
            for child in children {
                out.push(' ');
                write_node(tree, *child, out, mode);
            }
            out.push(')');
        }
    }
}

fn write_layout(layout: &Layout, out: &mut String) {
    match layout {
        Layout::Oriented {
            orientation,
            ratio,
            selection,
        } => {
            out.push_str(orientation.as_str());
            if let Some(r) = ratio {
                let _ = write!(out, ":{}", r);
            }
            if let Some(s) = selection {
                let _ = write!(out, ":{}", s);
            }
        }
        Layout::Grid(n) => {
            let _ = write!(out, "grid:{}", n);
        }
        Layout::Max(n) => {
            let _ = write!(out, "max:{}", n);
        }
    }
}
