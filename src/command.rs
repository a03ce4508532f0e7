//! herbstluftwm commands issued by herbie.
//!
//! [`Command`] is the vocabulary shared by the task runner and the control
//! client: every variant knows how to render itself as the argument vector
//! `herbstclient` expects.  [`Command::from_action`] turns reconciler output
//! into commands, and [`parse_tag_status`] reads the tag list back.

use crate::reconcile::{Action, PlaceWindow};
use crate::tree::WindowId;
use std::fmt;

/// One herbstluftwm command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `load <tag> <layout>`
    Load { tag: String, layout: String },
    /// `rule once <conditions> tag=<tag> index=<index> maxage=<secs>`
    Rule(PlaceWindow),
    /// `spawn <argv...>`
    Spawn(Vec<String>),
    /// `use <tag>`
    Use(String),
    /// `add <tag>`
    Add(String),
    /// `focus_monitor <n>`
    FocusMonitor(usize),
    /// `close <winid>`
    Close(WindowId),
    /// `merge_tag <tag> <target>`
    MergeTag { tag: String, target: String },
}

impl Command {
    /// Argument vector, without the `herbstclient` program name.
    pub fn args(&self) -> Vec<String> {
        match self {
            Command::Load { tag, layout } => vec!["load".into(), tag.clone(), layout.clone()],
            Command::Rule(p) => {
                let mut args = vec!["rule".to_string(), "once".to_string()];
                args.extend(p.matches.iter().map(|c| format!("{}={}", c.attribute, c.value)));
                args.push(format!("tag={}", p.tag));
                args.push(format!("index={}", p.path_index()));
                args.push(format!("maxage={}", p.maxage_secs()));
                args
            }
            Command::Spawn(argv) => {
                let mut args = vec!["spawn".to_string()];
                args.extend(argv.iter().cloned());
                args
            }
            Command::Use(tag) => vec!["use".into(), tag.clone()],
            Command::Add(tag) => vec!["add".into(), tag.clone()],
            Command::FocusMonitor(n) => vec!["focus_monitor".into(), n.to_string()],
            Command::Close(wid) => vec!["close".into(), wid.to_string()],
            Command::MergeTag { tag, target } => vec!["merge_tag".into(), tag.clone(), target.clone()],
        }
    }

    /// Commands realizing one reconciler action on `tag`.
    ///
    /// A placement becomes its rule followed by the spawn, so the rule is in
    /// place before the window can appear.
    pub fn from_action(action: &Action, tag: &str) -> Result<Vec<Command>, CommandError> {
        match action {
            Action::LoadLayout { sexp } => Ok(vec![Command::Load {
                tag: tag.to_string(),
                layout: sexp.clone(),
            }]),
            Action::PlaceWindow(p) => {
                let argv = split_command_line(&p.command)?;
                Ok(vec![Command::Rule(p.clone()), Command::Spawn(argv)])
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

/// One entry of `tag_status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub name: String,
    pub index: usize,
    /// Status flag character (`#` focused, `:` occupied, `.` empty, ...).
    pub status: char,
}

/// Parse `tag_status` output: tab-separated `<flag><name>` entries.
pub fn parse_tag_status(text: &str) -> Vec<TagInfo> {
    text.trim()
        .split('\t')
        .filter(|part| !part.is_empty())
        .enumerate()
        .filter_map(|(index, part)| {
            let mut chars = part.chars();
            let status = chars.next()?;
            Some(TagInfo {
                name: chars.as_str().to_string(),
                index,
                status,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,
    #[error("unterminated quote in command line {0:?}")]
    UnterminatedQuote(String),
}

/// Split a configured command line into arguments.
///
/// Whitespace separates arguments; single quotes group literally, double
/// quotes group with backslash escapes, and a backslash outside quotes
/// escapes the next character.  No other shell syntax is interpreted.
pub fn split_command_line(line: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_arg = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(CommandError::UnterminatedQuote(line.to_string())),
                    }
                }
            }
            '"' => {
                in_arg = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch) => current.push(ch),
                            None => return Err(CommandError::UnterminatedQuote(line.to_string())),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(CommandError::UnterminatedQuote(line.to_string())),
                    }
                }
            }
            '\\' => {
                in_arg = true;
                if let Some(ch) = chars.next() {
                    current.push(ch);
                }
            }
            c if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                in_arg = true;
                current.push(c);
            }
        }
    }
    if in_arg {
        args.push(current);
    }
    if args.is_empty() {
        return Err(CommandError::Empty);
    }
    Ok(args)
}
