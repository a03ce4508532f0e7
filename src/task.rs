//! Putting tasks on screen and clearing them away again.
//!
//! A *task* is a named layout from the configuration whose leaves declare
//! the windows they should hold.  [`TaskRunner::toscreen`] makes a tag look
//! like that layout, spawning only the windows that are still missing, so it
//! can be re-run safely.  [`TaskRunner::clear_tag`] is the inverse: close
//! everything on a tag and merge it away.

use crate::command::{Command, CommandError};
use crate::config::Config;
use crate::reconcile::{Action, PlaceWindow, ReconcileError, Reconciler, Reconciliation};
use crate::rule::RuleBook;
use crate::traits::WindowManager;
use crate::tree::{Tree, TreeError};
use log::{debug, info, warn};
use std::time::Instant;

/// Possible errors from the task runner.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The window manager returned an error.
    #[error("window manager error: {0}")]
    WindowManager(String),

    #[error("layout of task {task:?}: {source}")]
    TaskLayout {
        task: String,
        #[source]
        source: TreeError,
    },

    #[error("layout dumped for tag {tag:?}: {source}")]
    Dump {
        tag: String,
        #[source]
        source: TreeError,
    },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The configured command of a placed window could not be split.
    #[error("window {name:?}: {source}")]
    Placement {
        name: String,
        #[source]
        source: CommandError,
    },
}

/// What [`TaskRunner::toscreen`] did.
#[derive(Debug, Default)]
pub struct Outcome {
    /// The skeleton had to be loaded first.
    pub loaded: bool,
    pub placed: Vec<PlaceWindow>,
    /// Declared windows that could not be placed: missing from the window
    /// table, or with a command line that does not split.
    pub errors: Vec<TaskError>,
    /// Placement rules registered by this run.
    pub rules: RuleBook,
}

/// Runs tasks against a [`WindowManager`].
pub struct TaskRunner<W: WindowManager> {
    wm: W,
    config: Config,
}

impl<W: WindowManager> TaskRunner<W> {
    pub fn new(wm: W, config: Config) -> Self {
        Self { wm, config }
    }

    pub fn wm(&self) -> &W {
        &self.wm
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn wm_err(e: W::Error) -> TaskError {
        TaskError::WindowManager(e.to_string())
    }

    fn reconciler(&self, tag: &str) -> Reconciler<'_> {
        Reconciler::new(&self.config.windows, tag).maxage(self.config.rules.maxage())
    }

    fn desired(&self, task: &str, text: &str) -> Result<Tree, TaskError> {
        Tree::parse(text).map_err(|source| TaskError::TaskLayout {
            task: task.to_string(),
            source,
        })
    }

    /// Dump and parse the live layout of `tag`.
    pub fn actual(&self, tag: &str) -> Result<Tree, TaskError> {
        let text = self.wm.dump(tag).map_err(Self::wm_err)?;
        debug!("dump {}: {}", tag, text);
        Tree::parse(&text).map_err(|source| TaskError::Dump {
            tag: tag.to_string(),
            source,
        })
    }

    /// Add `tag` unless it already exists.
    pub fn ensure_tag(&self, tag: &str) -> Result<bool, TaskError> {
        let tags = self.wm.tags().map_err(Self::wm_err)?;
        if tags.iter().any(|t| t.name == tag) {
            return Ok(false);
        }
        info!("adding tag {}", tag);
        self.wm.call(&Command::Add(tag.to_string())).map_err(Self::wm_err)?;
        Ok(true)
    }

    /// Reconcile `task` against `tag` without changing anything.
    ///
    /// Returns `None` for unknown tasks.
    pub fn plan(&self, task: &str, tag: &str) -> Result<Option<Reconciliation>, TaskError> {
        let Some(text) = self.config.task(task) else {
            return Ok(None);
        };
        let desired = self.desired(task, text)?;
        let actual = self.actual(tag)?;
        Ok(Some(self.reconciler(tag).reconcile(&desired, &actual)))
    }

    /// Make `tag` (default: the task name) show `task`.
    ///
    /// Creates the tag if needed, loads the task's split skeleton if the tag
    /// has a different one, then registers a placement rule and spawns a
    /// command for every declared window whose frame is still empty.  An
    /// unknown task just switches to the tag.
    pub fn toscreen(&self, task: &str, tag: Option<&str>) -> Result<Outcome, TaskError> {
        let tag = tag.unwrap_or(task);
        self.ensure_tag(tag)?;

        let mut outcome = Outcome::default();
        let Some(text) = self.config.task(task) else {
            info!("no task {}, just switching to tag {}", task, tag);
            self.wm
                .chain(&[Command::Use(tag.to_string())])
                .map_err(Self::wm_err)?;
            return Ok(outcome);
        };

        let desired = self.desired(task, text)?;
        let reconciler = self.reconciler(tag);
        let mut plan = reconciler.reconcile(&desired, &self.actual(tag)?);

        if let Some(sexp) = plan.load() {
            info!("loading layout on {}: {}", tag, sexp);
            self.wm
                .call(&Command::Load {
                    tag: tag.to_string(),
                    layout: sexp.to_string(),
                })
                .map_err(Self::wm_err)?;
            outcome.loaded = true;

            let actual = self.actual(tag)?;
            plan = reconciler.reconcile(&desired, &actual);
            if plan.load().is_some() {
                warn!("layout on {} still differs after load, placing anyway", tag);
                plan = reconciler.place(&desired, &actual);
            }
        }

        outcome.errors.extend(plan.errors.iter().cloned().map(TaskError::from));

        let mut commands = Vec::new();
        for action in &plan.actions {
            let Action::PlaceWindow(p) = action else {
                continue;
            };
            match Command::from_action(action, tag) {
                Ok(cmds) => {
                    commands.extend(cmds);
                    outcome.placed.push(p.clone());
                }
                Err(source) => outcome.errors.push(TaskError::Placement {
                    name: p.name.clone(),
                    source,
                }),
            }
        }
        for e in &outcome.errors {
            warn!("{}", e);
        }
        commands.push(Command::FocusMonitor(0));
        commands.push(Command::Use(tag.to_string()));
        self.wm.chain(&commands).map_err(Self::wm_err)?;

        let now = Instant::now();
        for p in &outcome.placed {
            debug!("rule {} -> {}:{}", p.match_predicate(), p.tag, p.path_index());
            outcome.rules.register(p.clone(), now);
        }
        info!("task {} on {}: {} window(s) placed", task, tag, outcome.placed.len());
        Ok(outcome)
    }

    /// Close every window on `tag`, switch to `goto` (default: the first
    /// other tag) and merge `tag` into that other tag.
    ///
    /// When `tag` is the only tag the windows are still closed, but there is
    /// nothing to merge into, so the tag stays.  Returns how many windows
    /// were closed.
    pub fn clear_tag(&self, tag: &str, goto: Option<&str>) -> Result<usize, TaskError> {
        let tags = self.wm.tags().map_err(Self::wm_err)?;
        let merge_to = tags.iter().find(|t| t.name != tag).map(|t| t.name.clone());

        let have = self.actual(tag)?;
        let mut commands: Vec<Command> = have
            .realized_windows()
            .into_iter()
            .map(|w| Command::Close(w.clone()))
            .collect();
        let closed = commands.len();

        commands.push(Command::FocusMonitor(0));
        if let Some(target) = goto.or(merge_to.as_deref()) {
            commands.push(Command::Use(target.to_string()));
        }
        match merge_to {
            Some(target) => commands.push(Command::MergeTag {
                tag: tag.to_string(),
                target,
            }),
            None => warn!("{} is the only tag, not merging it away", tag),
        }
        self.wm.chain(&commands).map_err(Self::wm_err)?;
        info!("cleared tag {} ({} window(s) closed)", tag, closed);
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleState;
    use crate::traits::testing::MockWm;

    fn config() -> Config {
        serde_json::from_str(
            r#"{
                "windows": {
                    "AAA": { "command": "app --a", "match": { "class": "AppA" } },
                    "BBB": { "command": "app --b", "match": { "class": "AppB" } }
                },
                "tasks": {
                    "ab": "(split horizontal:0.5:0 (clients window:AAA) (clients window:BBB))",
                    "lost": "(split horizontal:0.5:0 (clients window:AAA) (clients window:ZZZ))"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn toscreen_loads_then_places() {
        let runner = TaskRunner::new(MockWm::with_tags(&["main"]), config());
        let outcome = runner.toscreen("ab", Some("dev")).unwrap();

        assert!(outcome.loaded);
        assert_eq!(outcome.placed.len(), 2);
        assert_eq!(outcome.rules.count(RuleState::Registered), 2);

        let wm = runner.wm();
        assert_eq!(
            *wm.calls.borrow(),
            vec![
                "add dev".to_string(),
                "load dev (split horizontal:0.5:0 (clients vertical:0) (clients vertical:0))".to_string(),
            ]
        );
        assert_eq!(
            wm.chains.borrow()[0],
            vec![
                "rule once class=AppA tag=dev index=0 maxage=10",
                "spawn app --a",
                "rule once class=AppB tag=dev index=1 maxage=10",
                "spawn app --b",
                "focus_monitor 0",
                "use dev",
            ]
        );
    }

    #[test]
    fn toscreen_is_idempotent() {
        let wm = MockWm::with_tags(&["ab"]);
        wm.set_layout("ab", "(split horizontal:0.5:0 (clients vertical:0 0x1) (clients vertical:0 0x2))");
        let runner = TaskRunner::new(wm, config());
        let outcome = runner.toscreen("ab", None).unwrap();

        assert!(!outcome.loaded);
        assert!(outcome.placed.is_empty());
        assert!(outcome.rules.is_empty());
        let wm = runner.wm();
        assert!(wm.calls.borrow().is_empty());
        assert_eq!(wm.chains.borrow()[0], vec!["focus_monitor 0", "use ab"]);
    }

    #[test]
    fn partially_realized_task_fills_the_gap() {
        let wm = MockWm::with_tags(&["ab"]);
        wm.set_layout("ab", "(split horizontal:0.5:0 (clients vertical:0 0x1) (clients vertical:0))");
        let runner = TaskRunner::new(wm, config());
        let outcome = runner.toscreen("ab", None).unwrap();
        assert_eq!(outcome.placed.len(), 1);
        assert_eq!(outcome.placed[0].name, "BBB");
    }

    #[test]
    fn unknown_task_just_switches() {
        let runner = TaskRunner::new(MockWm::with_tags(&["main"]), config());
        let outcome = runner.toscreen("scratch", None).unwrap();
        assert!(outcome.placed.is_empty());
        let wm = runner.wm();
        assert_eq!(*wm.calls.borrow(), vec!["add scratch".to_string()]);
        assert_eq!(wm.chains.borrow()[0], vec!["use scratch"]);
    }

    #[test]
    fn lookup_errors_do_not_block_other_windows() {
        let runner = TaskRunner::new(MockWm::with_tags(&["main"]), config());
        let outcome = runner.toscreen("lost", Some("main")).unwrap();
        assert_eq!(outcome.placed.len(), 1);
        assert!(matches!(
            &outcome.errors[..],
            [TaskError::Reconcile(ReconcileError::WindowConfigLookup { name, .. })] if name == "ZZZ"
        ));
    }

    #[test]
    fn plan_does_not_touch_the_wm() {
        let runner = TaskRunner::new(MockWm::with_tags(&["dev"]), config());
        let plan = runner.plan("ab", "dev").unwrap().unwrap();
        assert!(plan.load().is_some());
        assert!(runner.plan("nope", "dev").unwrap().is_none());
        assert!(runner.wm().calls.borrow().is_empty());
        assert!(runner.wm().chains.borrow().is_empty());
    }

    #[test]
    fn clear_tag_closes_and_merges() {
        let wm = MockWm::with_tags(&["main", "dev"]);
        wm.set_layout("dev", "(split vertical:0.5:0 (clients vertical:0 0x1 0x2) (clients max:0 0x3))");
        let runner = TaskRunner::new(wm, config());
        assert_eq!(runner.clear_tag("dev", None).unwrap(), 3);
        let wm = runner.wm();
        assert_eq!(
            wm.chains.borrow()[0],
            vec!["close 0x1", "close 0x2", "close 0x3", "focus_monitor 0", "use main", "merge_tag dev main"]
        );
        assert_eq!(wm.tags.borrow().len(), 1);
    }

    #[test]
    fn clear_only_tag_closes_without_merging() {
        let wm = MockWm::with_tags(&["dev"]);
        wm.set_layout("dev", "(clients vertical:0 0x1 0x2)");
        let runner = TaskRunner::new(wm, config());
        assert_eq!(runner.clear_tag("dev", None).unwrap(), 2);
        let wm = runner.wm();
        assert_eq!(wm.chains.borrow()[0], vec!["close 0x1", "close 0x2", "focus_monitor 0"]);
        assert_eq!(wm.tags.borrow().len(), 1);
    }

    #[test]
    fn unsplittable_command_does_not_block_other_windows() {
        let mut cfg = config();
        if let Some(bbb) = cfg.windows.get_mut("BBB") {
            bbb.command = "app 'oops".into();
        }
        let runner = TaskRunner::new(MockWm::with_tags(&["main"]), cfg);
        let outcome = runner.toscreen("ab", Some("dev")).unwrap();

        assert_eq!(outcome.placed.len(), 1);
        assert_eq!(outcome.placed[0].name, "AAA");
        assert_eq!(outcome.rules.count(RuleState::Registered), 1);
        assert!(matches!(
            &outcome.errors[..],
            [TaskError::Placement { name, source: CommandError::UnterminatedQuote(_) }] if name == "BBB"
        ));
        assert_eq!(
            runner.wm().chains.borrow()[0],
            vec![
                "rule once class=AppA tag=dev index=0 maxage=10",
                "spawn app --a",
                "focus_monitor 0",
                "use dev",
            ]
        );
    }

    #[test]
    fn broken_dump_is_reported() {
        let wm = MockWm::with_tags(&["dev"]);
        wm.set_layout("dev", "(split");
        let runner = TaskRunner::new(wm, config());
        assert!(matches!(runner.toscreen("ab", Some("dev")), Err(TaskError::Dump { .. })));
    }
}
