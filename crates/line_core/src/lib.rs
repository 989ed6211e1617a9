//! `line_core` — production line zone state machine and time-attribution
//! engine.
//!
//! No IO, no network, no clocks. Wall-clock time enters through the
//! `Timestamp` arguments on every operation; persistence is behind the
//! `LineStore` trait.

pub mod attribution;
mod classify;
mod engine;
mod error;
mod handoff;
mod store;
mod types;

pub use attribution::{attribute, BlameCounts};
pub use classify::classify;
pub use engine::{Line, TickSummary};
pub use error::{HandoffError, StoreError};
pub use store::{LineStore, MemoryStore};
pub use types::*;

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(test)]
mod tests;
