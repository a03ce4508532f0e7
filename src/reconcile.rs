//! Reconciliation of a desired layout against the live one.
//!
//! A *desired* tree comes from a task definition and holds declared
//! `window:<name>` specs in its leaves.  The *actual* tree is what the
//! window manager currently dumps for the tag.  [`Reconciler::reconcile`]
//! compares the two by [`Path`] and produces the [`Action`]s needed to make
//! the actual layout match: one placement rule plus spawn for every declared
//! window whose slot is still empty.
//!
//! Reconciliation is idempotent: once the placements have been realized and
//! the actual tree refreshed, reconciling again yields no actions.

use crate::config::WindowTable;
use crate::tree::{render_layout, Path, Tree};
use log::debug;
use std::fmt;
use std::time::Duration;

/// Default validity window of a placement rule.
pub const DEFAULT_MAXAGE: Duration = Duration::from_secs(10);

/// One `attribute="value"` condition of a placement rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCondition {
    pub attribute: String,
    pub value: String,
}

impl fmt::Display for MatchCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.attribute, self.value)
    }
}

/// Route the next new window matching `matches` into the frame at `path` of
/// `tag`, then spawn `command` to create it.
///
/// The rule only applies to the first matching window created within
/// `maxage`; see [`rule`](crate::rule) for the consumption state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceWindow {
    /// Name of the window in the window table.
    pub name: String,
    pub matches: Vec<MatchCondition>,
    pub tag: String,
    pub path: Path,
    pub command: String,
    pub maxage: Duration,
}

impl PlaceWindow {
    /// Conditions formatted for herbstluftwm's rule matcher, e.g.
    /// `class="AppA" title="x"`.
    pub fn match_predicate(&self) -> String {
        self.matches
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Target frame as herbstluftwm's `index=` value.
    pub fn path_index(&self) -> String {
        self.path.to_string()
    }

    /// Validity in whole seconds for `maxage=`, rounded up so a rule never
    /// expires earlier than asked.
    pub fn maxage_secs(&self) -> u64 {
        self.maxage.as_secs() + u64::from(self.maxage.subsec_nanos() > 0)
    }
}

/// Something the command layer has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Load the desired split skeleton.  When present it is the only
    /// action: the caller loads it, refreshes the actual tree and reconciles
    /// again.
    LoadLayout { sexp: String },
    PlaceWindow(PlaceWindow),
}

/// A declared window that could not be turned into an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("no window named {name:?} is configured (wanted at path {path:?})")]
    WindowConfigLookup { name: String, path: String },
}

/// Outcome of one reconciliation.  Lookup errors do not stop the walk, so
/// `actions` can be non-empty alongside `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub actions: Vec<Action>,
    pub errors: Vec<ReconcileError>,
}

impl Reconciliation {
    /// True when nothing needs doing and nothing went wrong.
    pub fn is_settled(&self) -> bool {
        self.actions.is_empty() && self.errors.is_empty()
    }

    /// The layout to load first, if any.
    pub fn load(&self) -> Option<&str> {
        self.actions.iter().find_map(|a| match a {
            Action::LoadLayout { sexp } => Some(sexp.as_str()),
            Action::PlaceWindow(_) => None,
        })
    }

    pub fn placements(&self) -> impl Iterator<Item = &PlaceWindow> {
        self.actions.iter().filter_map(|a| match a {
            Action::PlaceWindow(p) => Some(p),
            Action::LoadLayout { .. } => None,
        })
    }
}

/// Diffs desired layouts against actual ones for a single tag.
pub struct Reconciler<'a> {
    windows: &'a WindowTable,
    tag: String,
    maxage: Duration,
}

impl<'a> Reconciler<'a> {
    pub fn new(windows: &'a WindowTable, tag: impl Into<String>) -> Self {
        Self {
            windows,
            tag: tag.into(),
            maxage: DEFAULT_MAXAGE,
        }
    }

    /// Validity window attached to every placement.
    pub fn maxage(mut self, maxage: Duration) -> Self {
        self.maxage = maxage;
        self
    }

    pub fn reconcile(&self, desired: &Tree, actual: &Tree) -> Reconciliation {
        let mut out = Reconciliation::default();

        if !desired.same_skeleton(actual) {
            if let Some(sexp) = render_layout(desired) {
                debug!("skeleton differs on tag {}, loading {}", self.tag, sexp);
                out.actions.push(Action::LoadLayout { sexp });
                return out;
            }
        }

        self.place_into(desired, actual, &mut out);
        out
    }

    /// Only the placement walk, without comparing skeletons.  Used when the
    /// manager has already been asked to load the layout and normalized it
    /// differently.
    pub fn place(&self, desired: &Tree, actual: &Tree) -> Reconciliation {
        let mut out = Reconciliation::default();
        self.place_into(desired, actual, &mut out);
        out
    }

    fn place_into(&self, desired: &Tree, actual: &Tree, out: &mut Reconciliation) {
        for node in desired.iter() {
            let specs = node.declared();
            if specs.is_empty() {
                continue;
            }
            let path = node.path();
            // A missing path just means the frame does not exist yet.
            let realized = actual.get(path).map_or(false, |n| !n.realized().is_empty());
            if realized {
                debug!("path {:?} already holds windows, skipping", path.to_string());
                continue;
            }

            for spec in specs {
                let Some(window) = self.windows.get(spec.name()) else {
                    out.errors.push(ReconcileError::WindowConfigLookup {
                        name: spec.name().to_string(),
                        path: path.to_string(),
                    });
                    continue;
                };
                out.actions.push(Action::PlaceWindow(PlaceWindow {
                    name: spec.name().to_string(),
                    matches: window
                        .matches
                        .iter()
                        .map(|(k, v)| MatchCondition {
                            attribute: k.clone(),
                            value: v.clone(),
                        })
                        .collect(),
                    tag: self.tag.clone(),
                    path: path.clone(),
                    command: window.command.clone(),
                    maxage: self.maxage,
                }));
            }
        }
    }
}
