//! herbstluftwm-specific implementations.
//!
//! This module provides the concrete backend for the
//! [`WindowManager`](crate::traits::WindowManager) trait, driving the
//! `herbstclient` control CLI.
//!
//! Nothing outside this module should spawn `herbstclient` directly.

pub mod client;
