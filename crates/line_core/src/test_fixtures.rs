//! Shared test fixtures for line_core tests.
//!
//! `line_with_zones(n)` builds a `Line` over a fresh `MemoryStore`, switched
//! off, all zones empty, clocks at `T0`. Tests drive time explicitly with
//! `at(minutes)`.

use crate::{Line, MemoryStore, Timestamp, Vin, Worker, WorkerId, ZoneId};
use std::sync::Arc;

/// Epoch for tests: an arbitrary fixed wall-clock origin.
pub const T0: Timestamp = Timestamp(1_700_000_000_000);

/// `T0` plus whole minutes.
pub fn at(minutes: i64) -> Timestamp {
    Timestamp(T0.0 + minutes * 60_000)
}

pub fn line_with_zones(zone_count: u32) -> (Line, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(zone_count, T0));
    (Line::new(store.clone()), store)
}

/// A line that is already switched on at `T0`.
pub fn running_line(zone_count: u32) -> Line {
    let (line, _) = line_with_zones(zone_count);
    line.toggle_system(true, None, T0).unwrap();
    line
}

pub fn vin(s: &str) -> Vin {
    Vin(s.to_string())
}

pub fn worker(id: &str) -> Worker {
    Worker {
        id: WorkerId(id.to_string()),
        display_name: format!("Worker {id}"),
        checked_in_at: T0,
    }
}

/// Start a car in a zone with boilerplate model/color.
pub fn start_car(line: &Line, zone: u32, v: &str, now: Timestamp) {
    line.start_work(
        ZoneId(zone),
        vin(v),
        "sedan".to_string(),
        "blue".to_string(),
        Some(worker("w1")),
        false,
        now,
    )
    .unwrap();
}
