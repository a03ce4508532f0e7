//! Tracking of one-shot placement rules.
//!
//! herbstluftwm's `rule once ... maxage=N` applies to the first new window
//! that matches, and only if that window appears within `N` seconds.  A
//! [`PendingRule`] mirrors that lifecycle:
//!
//! ```text
//! Registered ──(matching window, in time)──▶ Consumed
//!     │
//!     └──────────(maxage elapsed)──────────▶ Expired
//! ```
//!
//! Both end states are final.  The clock is always passed in, so the state
//! machine itself never sleeps or reads the time.

use crate::reconcile::PlaceWindow;
use crate::tree::WindowId;
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    Registered,
    Consumed,
    Expired,
}

/// A placement rule registered with the window manager.
#[derive(Debug, Clone)]
pub struct PendingRule {
    placement: PlaceWindow,
    registered_at: Instant,
    state: RuleState,
    consumed_by: Option<WindowId>,
}

impl PendingRule {
    pub fn new(placement: PlaceWindow, now: Instant) -> Self {
        Self {
            placement,
            registered_at: now,
            state: RuleState::Registered,
            consumed_by: None,
        }
    }

    pub fn placement(&self) -> &PlaceWindow {
        &self.placement
    }

    pub fn state(&self) -> RuleState {
        self.state
    }

    /// The window that consumed the rule.
    pub fn consumed_by(&self) -> Option<&WindowId> {
        self.consumed_by.as_ref()
    }

    /// Move to `Expired` if the validity window has passed.  Returns whether
    /// this call expired the rule.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.state == RuleState::Registered
            && now.saturating_duration_since(self.registered_at) > self.placement.maxage
        {
            self.state = RuleState::Expired;
            return true;
        }
        false
    }

    /// Whether a window with `attributes` satisfies every condition.
    pub fn matches(&self, attributes: &BTreeMap<String, String>) -> bool {
        self.placement
            .matches
            .iter()
            .all(|c| attributes.get(&c.attribute) == Some(&c.value))
    }

    /// Offer a newly created window.  Consumes the rule and returns `true`
    /// if it is still live and matches.
    pub fn offer(&mut self, window: &WindowId, attributes: &BTreeMap<String, String>, now: Instant) -> bool {
        self.tick(now);
        if self.state != RuleState::Registered || !self.matches(attributes) {
            return false;
        }
        self.state = RuleState::Consumed;
        self.consumed_by = Some(window.clone());
        true
    }
}

/// Rules in registration order.  A new window is bound by the first live
/// rule that matches it, the same tie-break the window manager applies.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: Vec<PendingRule>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, placement: PlaceWindow, now: Instant) {
        self.rules.push(PendingRule::new(placement, now));
    }

    /// Route a new window; returns the placement that claimed it.
    pub fn window_created(
        &mut self,
        window: &WindowId,
        attributes: &BTreeMap<String, String>,
        now: Instant,
    ) -> Option<&PlaceWindow> {
        let index = self
            .rules
            .iter_mut()
            .position(|r| r.offer(window, attributes, now))?;
        Some(self.rules[index].placement())
    }

    /// Expire stale rules; returns how many expired on this call.
    pub fn expire(&mut self, now: Instant) -> usize {
        self.rules.iter_mut().map(|r| r.tick(now)).filter(|expired| *expired).count()
    }

    pub fn rules(&self) -> &[PendingRule] {
        &self.rules
    }

    pub fn count(&self, state: RuleState) -> usize {
        self.rules.iter().filter(|r| r.state() == state).count()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
