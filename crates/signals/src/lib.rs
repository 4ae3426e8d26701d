//! Signal collection: turns raw request data and subject history into the
//! immutable per-attempt [`RiskContext`].

pub mod collector;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod history;
pub mod history_memory;
pub mod history_sqlite;
pub mod intel;

pub use {
    collector::{AttemptSignals, SignalCollector},
    context::{LocationFix, ResolvedLocation, RiskContext},
    error::{Error, Result},
    history::{AttemptRecord, HistorySnapshot, SubjectHistory},
    history_memory::InMemoryHistory,
    history_sqlite::SqliteHistory,
    intel::{NetworkIntel, StaticNetworkIntel},
};
