//! **herbie** — layouts and tasks for herbstluftwm.
//!
//! herbstluftwm describes the frame layout of a tag as a small
//! s-expression (`hc dump`).  herbie reads that format into a [`tree::Tree`],
//! writes it back, and reconciles a *desired* layout from a task definition
//! against the *actual* layout of a tag so that missing windows are spawned
//! into the right frames exactly once.
//!
//! # Architecture
//!
//! * [`tree`] — the layout tree model, parser and renderer.
//! * [`reconcile`] — diffing desired against actual layouts into actions.
//! * [`rule`] — lifecycle of the one-shot placement rules those actions
//!   register.
//! * [`command`] — herbstluftwm commands as argument vectors.
//! * [`traits::WindowManager`] — the seam to the window manager, with the
//!   `herbstclient` backend in [`herbstluft`].
//! * [`task`] — putting tasks on screen and clearing tags.
//! * [`store`] and [`icon`] — saved layouts and their icons.

pub mod command;
pub mod config;
pub mod herbstluft;
pub mod icon;
pub mod reconcile;
pub mod rule;
pub mod store;
pub mod task;
pub mod traits;
pub mod tree;
