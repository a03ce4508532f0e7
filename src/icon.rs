//! SVG icons sketching a layout's split structure.
//!
//! The icon is a framed square with one line per split: a horizontal split
//! divides left from right, so it draws a vertical line, and vice versa.
//! Leaves draw nothing.

use crate::tree::{NodeId, NodeKind, Orientation, Tree, DEFAULT_RATIO};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const DEFAULT_SIZE: u32 = 100;
pub const DEFAULT_STROKE: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// SVG document for `tree` at `width × height` pixels.
pub fn svg(tree: &Tree, width: u32, height: u32, stroke: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" version="1.1" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    let _ = writeln!(
        out,
        r#"<rect fill="white" stroke="black" stroke-width="{}px" width="{}" height="{}" x="0" y="0" />"#,
        stroke, width, height
    );
    let frame = Rect {
        x: 0.0,
        y: 0.0,
        w: f64::from(width),
        h: f64::from(height),
    };
    lines(tree, NodeId::ROOT, frame, stroke, &mut out);
    out.push_str("</svg>\n");
    out
}

fn lines(tree: &Tree, id: NodeId, r: Rect, stroke: f64, out: &mut String) {
    let NodeKind::Split { layout, children } = tree.node(id).kind() else {
        return;
    };
    let ratio = layout.as_ref().map_or(DEFAULT_RATIO, |l| l.ratio());
    let orientation = layout
        .as_ref()
        .and_then(|l| l.orientation())
        .unwrap_or(Orientation::Vertical);

    let (first, second) = match orientation {
        Orientation::Horizontal => {
            let lx = r.x + r.w * ratio;
            line(out, lx, r.y, lx, r.y + r.h, stroke);
            (
                Rect { w: r.w * ratio, ..r },
                Rect {
                    x: lx,
                    w: r.w * (1.0 - ratio),
                    ..r
                },
            )
        }
        Orientation::Vertical => {
            let ly = r.y + r.h * ratio;
            line(out, r.x, ly, r.x + r.w, ly, stroke);
            (
                Rect { h: r.h * ratio, ..r },
                Rect {
                    y: ly,
                    h: r.h * (1.0 - ratio),
                    ..r
                },
            )
        }
    };
    lines(tree, children[0], first, stroke, out);
    lines(tree, children[1], second, stroke, out);
}

fn line(out: &mut String, x1: f64, y1: f64, x2: f64, y2: f64, stroke: f64) {
    let _ = writeln!(
        out,
        r#"<line stroke="black" stroke-width="{}" x1="{}" y1="{}" x2="{}" y2="{}" />"#,
        stroke, x1, y1, x2, y2
    );
}

/// Write the icon for `tree` to `<dir>/<name>.svg` and return the path.
pub fn write_icon(dir: &Path, name: &str, tree: &Tree) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.svg", name));
    std::fs::write(&path, svg(tree, DEFAULT_SIZE, DEFAULT_SIZE, DEFAULT_STROKE))?;
    Ok(path)
}
