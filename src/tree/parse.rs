//! Parser for herbstluftwm's layout dump format.
//!
//! ```text
//! (split horizontal:0.5:0 (clients vertical:1 0x1e00142) (clients window:AAA))
//! ```
//!
//! The input is tokenized into parentheses and atoms, then read by a small
//! recursive-descent parser that writes nodes straight into the [`Tree`]
//! arena in pre-order.

use super::{Layout, NodeId, NodeKind, Orientation, Path, Tree, TreeError, WindowId, WindowSpec, Windows};

/// Deepest nesting accepted.  Real frame layouts stay in the single digits;
/// anything past this is rejected instead of exhausting the stack.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Atom(&'a str),
}

#[derive(Debug, Clone, Copy)]
struct Spanned<'a> {
    token: Token<'a>,
    position: usize,
}

fn tokenize(text: &str) -> Vec<Spanned<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        let delimiter = c == '(' || c == ')' || c.is_whitespace();
        if delimiter {
            if let Some(s) = start.take() {
                tokens.push(Spanned {
                    token: Token::Atom(&text[s..i]),
                    position: s,
                });
            }
            match c {
                '(' => tokens.push(Spanned { token: Token::Open, position: i }),
                ')' => tokens.push(Spanned { token: Token::Close, position: i }),
                _ => {}
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(Spanned {
            token: Token::Atom(&text[s..]),
            position: s,
        });
    }
    tokens
}

/// Tags this parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Split,
    Clients,
}

impl Tag {
    fn from_atom(atom: &str) -> Option<Self> {
        match atom {
            "split" => Some(Tag::Split),
            "clients" => Some(Tag::Clients),
            _ => None,
        }
    }
}

/// Parse dump text into a [`Tree`].
///
/// No partial tree is ever returned: the first problem aborts the parse.
pub fn parse(text: &str) -> Result<Tree, TreeError> {
    let tokens = tokenize(text);
    let first = tokens.first().ok_or_else(|| TreeError::Parse {
        position: 0,
        message: "empty input".into(),
    })?;
    if first.token != Token::Open {
        return Err(TreeError::Parse {
            position: first.position,
            message: "expected '('".into(),
        });
    }

    let mut parser = Parser {
        tokens,
        next: 0,
        end: text.len(),
        tree: Tree::empty(),
    };
    parser.node(Path::root())?;

    if let Some(extra) = parser.tokens.get(parser.next) {
        return Err(TreeError::Parse {
            position: extra.position,
            message: "unexpected input after the layout".into(),
        });
    }
    Ok(parser.tree)
}

struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    next: usize,
    end: usize,
    tree: Tree,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Spanned<'a>> {
        self.tokens.get(self.next).copied()
    }

    fn bump(&mut self) -> Option<Spanned<'a>> {
        let t = self.peek();
        if t.is_some() {
            self.next += 1;
        }
        t
    }

    fn unbalanced(&self) -> TreeError {
        TreeError::Parse {
            position: self.end,
            message: "unbalanced parentheses: missing ')'".into(),
        }
    }

    /// Parse one parenthesized expression whose `(` is the next token.
    fn node(&mut self, path: Path) -> Result<NodeId, TreeError> {
        match self.bump() {
            Some(Spanned {
                token: Token::Open,
                position,
            }) => {
                if path.depth() >= MAX_DEPTH {
                    return Err(TreeError::Parse {
                        position,
                        message: format!("layout nested deeper than {} levels", MAX_DEPTH),
                    });
                }
            }
            Some(t) => {
                return Err(TreeError::Parse {
                    position: t.position,
                    message: "expected '('".into(),
                })
            }
            None => return Err(self.unbalanced()),
        }

        let tag = match self.bump() {
            Some(Spanned { token: Token::Atom(a), .. }) => a,
            Some(t) => {
                return Err(TreeError::Parse {
                    position: t.position,
                    message: "expected a tag after '('".into(),
                })
            }
            None => return Err(self.unbalanced()),
        };

        let id = self.tree.reserve(path.clone());
        let known = Tag::from_atom(tag);
        let mut layout: Option<Layout> = None;
        let mut windows = Windows::Empty;
        let mut atoms: Vec<String> = Vec::new();
        let mut children: Vec<NodeId> = Vec::new();

        loop {
            let Some(t) = self.peek() else {
                return Err(self.unbalanced());
            };
            match t.token {
                Token::Close => {
                    self.next += 1;
                    break;
                }
                Token::Open => {
                    if known == Some(Tag::Clients) {
                        return Err(TreeError::BinaryTreeViolation {
                            path: path.to_string(),
                            detail: "clients node cannot have children".into(),
                        });
                    }
                    if children.len() == 2 {
                        return Err(TreeError::BinaryTreeViolation {
                            path: path.to_string(),
                            detail: "third child attached to a binary node".into(),
                        });
                    }
                    let child = self.node(path.child(children.len()))?;
                    children.push(child);
                }
                Token::Atom(atom) => {
                    self.next += 1;
                    match known {
                        Some(tag) => {
                            if let Some(l) = layout_atom(atom, t.position, tag, &path)? {
                                if layout.is_some() {
                                    return Err(TreeError::Parse {
                                        position: t.position,
                                        message: format!("second layout attribute {:?}", atom),
                                    });
                                }
                                layout = Some(l);
                            } else if tag == Tag::Clients {
                                window_atom(atom, &path, &mut windows)?;
                            } else {
                                return Err(unknown(atom, &path));
                            }
                        }
                        None => atoms.push(atom.to_string()),
                    }
                }
            }
        }

        let kind = match known {
            Some(Tag::Split) => {
                let [first, second] = <[NodeId; 2]>::try_from(children).map_err(|c| {
                    TreeError::BinaryTreeViolation {
                        path: path.to_string(),
                        detail: format!("split has {} children, expected 2", c.len()),
                    }
                })?;
                NodeKind::Split {
                    layout,
                    children: [first, second],
                }
            }
            Some(Tag::Clients) => NodeKind::Clients { layout, windows },
            None => {
                if children.len() == 1 {
                    return Err(TreeError::BinaryTreeViolation {
                        path: path.to_string(),
                        detail: format!("{} node has 1 child, expected 0 or 2", tag),
                    });
                }
                NodeKind::Opaque {
                    tag: tag.to_string(),
                    atoms,
                    children,
                }
            }
        };
        self.tree.fill(id, kind);
        Ok(id)
    }
}

fn unknown(atom: &str, path: &Path) -> TreeError {
    TreeError::UnknownAttribute {
        token: atom.to_string(),
        path: path.to_string(),
    }
}

/// Interpret `atom` as a layout attribute.  Returns `Ok(None)` when the atom
/// is not a layout attribute at all.
fn layout_atom(atom: &str, position: usize, tag: Tag, path: &Path) -> Result<Option<Layout>, TreeError> {
    let parts: Vec<&str> = atom.split(':').collect();
    let malformed = || TreeError::Parse {
        position,
        message: format!("malformed layout attribute {:?}", atom),
    };

    let orientation = match parts[0] {
        "horizontal" => Orientation::Horizontal,
        "vertical" => Orientation::Vertical,
        "grid" | "max" => {
            if tag == Tag::Split {
                return Err(unknown(atom, path));
            }
            if parts.len() != 2 {
                return Err(malformed());
            }
            let n = parse_selection(parts[1], position)?;
            return Ok(Some(if parts[0] == "grid" {
                Layout::Grid(n)
            } else {
                Layout::Max(n)
            }));
        }
        _ => return Ok(None),
    };

    let (ratio, selection) = match (tag, parts.len()) {
        (Tag::Split, 2) => (Some(parse_ratio(parts[1], position)?), None),
        (Tag::Clients, 2) => (None, Some(parse_selection(parts[1], position)?)),
        (_, 3) => (
            Some(parse_ratio(parts[1], position)?),
            Some(parse_selection(parts[2], position)?),
        ),
        _ => return Err(malformed()),
    };

    Ok(Some(Layout::Oriented {
        orientation,
        ratio,
        selection,
    }))
}

fn parse_ratio(text: &str, position: usize) -> Result<f64, TreeError> {
    let ratio: f64 = text.parse().map_err(|_| TreeError::Parse {
        position,
        message: format!("invalid ratio {:?}", text),
    })?;
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        return Err(TreeError::Parse {
            position,
            message: format!("ratio {} outside [0, 1]", text),
        });
    }
    Ok(ratio)
}

fn parse_selection(text: &str, position: usize) -> Result<usize, TreeError> {
    text.parse().map_err(|_| TreeError::Parse {
        position,
        message: format!("invalid selection {:?}", text),
    })
}

fn window_atom(atom: &str, path: &Path, windows: &mut Windows) -> Result<(), TreeError> {
    let mixed = || TreeError::MixedWindows {
        token: atom.to_string(),
        path: path.to_string(),
    };

    if let Some(id) = WindowId::parse(atom) {
        match windows {
            Windows::Empty => *windows = Windows::Realized(vec![id]),
            Windows::Realized(ids) => ids.push(id),
            Windows::Declared(_) => return Err(mixed()),
        }
        return Ok(());
    }
    if let Some(spec) = WindowSpec::parse(atom) {
        match windows {
            Windows::Empty => *windows = Windows::Declared(vec![spec]),
            Windows::Declared(specs) => specs.push(spec),
            Windows::Realized(_) => return Err(mixed()),
        }
        return Ok(());
    }
    Err(unknown(atom, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_leaf_with_selection_and_ids() {
        let t = parse("(clients vertical:1 0x1e00142 0x3200142)").unwrap();
        assert_eq!(t.len(), 1);
        let root = t.root();
        match root.kind() {
            NodeKind::Clients { layout, windows } => {
                let layout = layout.unwrap();
                assert_eq!(layout.orientation(), Some(Orientation::Vertical));
                assert_eq!(layout.selection(), 1);
                let ids: Vec<&str> = windows.realized().iter().map(|w| w.as_str()).collect();
                assert_eq!(ids, vec!["0x1e00142", "0x3200142"]);
            }
            other => panic!("expected clients, got {:?}", other),
        }
    }

    #[test]
    fn nested_dump() {
        let text = "(split vertical:0.75:0 (split horizontal:0.5:0 (clients vertical:1 0x1e00142 0x3200142) (clients vertical:1 0x1200003 0x1200024)) (clients vertical:1 0x1c0000e 0x300000e))";
        let t = parse(text).unwrap();
        assert_eq!(t.len(), 5);
        let layout = t.root().layout().unwrap();
        assert_eq!(layout.orientation(), Some(Orientation::Vertical));
        assert_eq!(layout.ratio(), 0.75);
        assert_eq!(t.realized_windows().len(), 6);
        for node in t.iter() {
            let n = node.children().len();
            assert!(n == 0 || n == 2);
        }
    }

    #[test]
    fn split_ratio_without_selection() {
        let t = parse("(split horizontal:0.3 (clients) (clients))").unwrap();
        let layout = t.root().layout().unwrap();
        assert_eq!(layout.ratio(), 0.3);
        assert_eq!(layout.selection(), 0);
    }

    #[test]
    fn grid_and_max_markers() {
        let t = parse("(split horizontal:0.44:1 (clients grid:0) (clients max:1))").unwrap();
        assert_eq!(t.node(t.root().children()[0]).layout(), Some(&Layout::Grid(0)));
        assert_eq!(t.node(t.root().children()[1]).layout(), Some(&Layout::Max(1)));
        let root = parse("(clients max:0)").unwrap();
        assert_eq!(root.root().layout(), Some(&Layout::Max(0)));
    }

    #[test]
    fn declared_windows() {
        let t = parse("(split horizontal:0.5:0 (clients window:AAA window:CCC) (clients window:BBB))").unwrap();
        let left = t.get(&Path::from(vec![0])).unwrap();
        let names: Vec<&str> = left.declared().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["AAA", "CCC"]);
    }

    #[test]
    fn empty_clients_and_whitespace() {
        let t = parse("  (split\n\thorizontal:0.5:0\n  (clients)\n  (clients) )\n").unwrap();
        assert!(t.get(&Path::from(vec![1])).unwrap().windows().unwrap().is_empty());
    }

    #[test]
    fn third_child_is_rejected() {
        let err = parse("(split horizontal:0.5:0 (clients) (clients) (clients))").unwrap_err();
        assert!(matches!(err, TreeError::BinaryTreeViolation { ref path, .. } if path.is_empty()));
    }

    #[test]
    fn single_child_split_is_rejected() {
        let err = parse("(split horizontal:0.5:0 (split vertical:0.5:0 (clients)) (clients))").unwrap_err();
        assert!(matches!(err, TreeError::BinaryTreeViolation { ref path, .. } if path == "0"));
    }

    #[test]
    fn single_child_unknown_tag_is_rejected() {
        let err = parse("(frame (clients))").unwrap_err();
        assert!(matches!(err, TreeError::BinaryTreeViolation { ref path, .. } if path.is_empty()));
        let err = parse("(split vertical:0.5:0 (clients) (frame x:1 (clients)))").unwrap_err();
        assert!(matches!(err, TreeError::BinaryTreeViolation { ref path, .. } if path == "1"));
        assert!(parse("(frame)").is_ok());
    }

    fn nested(depth: usize) -> String {
        let mut text = String::new();
        for _ in 0..depth {
            text.push_str("(split vertical:0.5:0 (clients) ");
        }
        text.push_str("(clients)");
        text.push_str(&")".repeat(depth));
        text
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let t = parse(&nested(MAX_DEPTH - 1)).unwrap();
        assert_eq!(t.len(), 2 * (MAX_DEPTH - 1) + 1);
    }

    #[test]
    fn excessive_nesting_is_an_error() {
        let text = nested(5000);
        let err = parse(&text).unwrap_err();
        // The first child of the deepest accepted split crosses the limit.
        let level = "(split vertical:0.5:0 (clients) ".len();
        let expected = level * (MAX_DEPTH - 1) + "(split vertical:0.5:0 ".len();
        assert_eq!(
            err,
            TreeError::Parse {
                position: expected,
                message: format!("layout nested deeper than {} levels", MAX_DEPTH),
            }
        );
    }

    #[test]
    fn clients_with_children_rejected() {
        let err = parse("(clients vertical:0 (clients))").unwrap_err();
        assert!(matches!(err, TreeError::BinaryTreeViolation { .. }));
    }

    #[test]
    fn unknown_attribute_names_token_and_path() {
        let err = parse("(split horizontal:0.5:0 (clients) (clients bogus))").unwrap_err();
        assert_eq!(
            err,
            TreeError::UnknownAttribute {
                token: "bogus".into(),
                path: "1".into(),
            }
        );
        let err = parse("(split max:0 (clients) (clients))").unwrap_err();
        assert!(matches!(err, TreeError::UnknownAttribute { .. }));
        let err = parse("(split horizontal:0.5:0 0x1 (clients) (clients))").unwrap_err();
        assert!(matches!(err, TreeError::UnknownAttribute { .. }));
    }

    #[test]
    fn mixed_windows_rejected() {
        let err = parse("(clients vertical:0 0x1 window:AAA)").unwrap_err();
        assert!(matches!(err, TreeError::MixedWindows { ref token, .. } if token == "window:AAA"));
    }

    #[test]
    fn malformed_inputs() {
        let cases = [
            ("", 0),
            ("   ", 0),
            ("clients", 0),
            ("()", 1),
            ("(clients", 8),
            ("(clients))", 9),
            ("(clients) (clients)", 10),
        ];
        for (text, position) in cases {
            match parse(text) {
                Err(TreeError::Parse { position: p, .. }) => assert_eq!(p, position, "{:?}", text),
                other => panic!("{:?}: expected parse error, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn bad_numbers() {
        for text in [
            "(split horizontal:1.5:0 (clients) (clients))",
            "(split horizontal:NaN:0 (clients) (clients))",
            "(split horizontal:x:0 (clients) (clients))",
            "(clients vertical:-1)",
            "(clients vertical)",
            "(clients vertical:0.5:0:1)",
            "(clients vertical:0 max:0)",
        ] {
            assert!(matches!(parse(text), Err(TreeError::Parse { .. })), "{}", text);
        }
    }

    #[test]
    fn unknown_tags_are_kept() {
        let t = parse("(frame future:1 (clients) (clients vertical:0))").unwrap();
        match t.root().kind() {
            NodeKind::Opaque { tag, atoms, children } => {
                assert_eq!(tag, "frame");
                assert_eq!(atoms, &vec!["future:1".to_string()]);
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected opaque node, got {:?}", other),
        }
    }
}
