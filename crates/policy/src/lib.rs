//! Policy decision engine for scored authentication attempts.
//!
//! Administrators maintain a set of named rules in a [`PolicyStore`]; each
//! evaluation reads one immutable snapshot, walks the enabled rules in
//! priority order, and returns the first match as a [`PolicyDecision`].
//! When nothing matches, a built-in fallback keyed off the risk level
//! decides, so an empty or misconfigured rule set still fails closed.

pub mod conditions;
pub mod engine;
pub mod store;
pub mod types;

pub use {
    conditions::Condition,
    engine::{PolicyDecision, decide, fallback_action},
    store::{PolicySnapshot, PolicyStore, default_policies},
    types::{DEFAULT_PRIORITY, Policy, PolicyAction},
};
