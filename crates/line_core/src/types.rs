//! Type definitions for `line_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the line engine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(Vin);
string_id!(WorkerId);
string_id!(EventId);

/// Main-line zones are `1..=N`; `ZoneId(0)` is reserved for the maintenance
/// zone and never participates in the line ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ZoneId(pub u32);

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reserved id for the off-line maintenance zone.
pub const MAINTENANCE_ZONE: ZoneId = ZoneId(0);

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Unix milliseconds. The single timestamp type at the domain boundary;
/// collaborators convert their own clock representations before calling in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_unix_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Minutes from `earlier` to `self`, clamped to zero so clock skew can
    /// never decrement an accumulation bucket.
    pub fn minutes_since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0).max(0) as f64 / 60_000.0
    }
}

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

/// Derived operating state of a zone. Recomputed every tick from occupancy;
/// the persisted copy is a cache of the last classification, never truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneStatus {
    /// Actively processing a unit (or idle with upstream supply at hand).
    Work,
    /// Idle with nothing to pull from upstream.
    Starve,
    /// Finished unit stuck in the flying-car buffer.
    Block,
    /// Line globally frozen.
    Paused,
}

// ---------------------------------------------------------------------------
// Station state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub zone_id: ZoneId,
    /// Last committed classification. See `classify` for the derivation.
    pub status: ZoneStatus,
    pub current_car: Option<CurrentCar>,
    pub flying_car: Option<FlyingCar>,
    pub current_worker: Option<Worker>,
    pub time_accumulation: TimeAccumulation,
    pub caused_stop_time: CausedStopTime,
}

impl Station {
    /// An empty station with zeroed counters, as seeded at line creation.
    pub fn empty(zone_id: ZoneId, now: Timestamp) -> Self {
        Station {
            zone_id,
            status: ZoneStatus::Paused,
            current_car: None,
            flying_car: None,
            current_worker: None,
            time_accumulation: TimeAccumulation::zeroed(now),
            caused_stop_time: CausedStopTime::zeroed(now),
        }
    }

    /// True when `current_car` or `flying_car` holds `vin`.
    pub fn holds_vin(&self, vin: &Vin) -> bool {
        self.current_car.as_ref().is_some_and(|c| &c.vin == vin)
            || self.flying_car.as_ref().is_some_and(|c| &c.vin == vin)
    }
}

/// The unit of work physically present and being actively worked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCar {
    pub vin: Vin,
    pub model: String,
    pub color: String,
    pub entered_at: Timestamp,
    pub time_elapsed_minutes: f64,
}

/// A finished unit sitting in the single handoff buffer slot, waiting to be
/// pulled into the next station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlyingCar {
    pub vin: Vin,
    pub model: String,
    pub color: String,
    pub completed_at: Timestamp,
    pub flying_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub display_name: String,
    pub checked_in_at: Timestamp,
}

/// Running per-status totals. Buckets only increase; per tick the sum of
/// bucket deltas equals the elapsed minutes since `last_calculated_at` when
/// the system is on, and zero when it is off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeAccumulation {
    pub work_minutes: f64,
    pub starve_minutes: f64,
    pub block_minutes: f64,
    pub last_calculated_at: Timestamp,
}

impl TimeAccumulation {
    pub fn zeroed(now: Timestamp) -> Self {
        TimeAccumulation {
            work_minutes: 0.0,
            starve_minutes: 0.0,
            block_minutes: 0.0,
            last_calculated_at: now,
        }
    }
}

/// Blame ledger: minutes this station's condition forced some *other*
/// station to stop. `current_minutes` is the running streak since the last
/// completed cycle; `total_minutes` is lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausedStopTime {
    pub current_minutes: f64,
    pub total_minutes: f64,
    pub starve_blame_minutes: f64,
    pub block_blame_minutes: f64,
    pub last_reset_at: Timestamp,
}

impl CausedStopTime {
    pub fn zeroed(now: Timestamp) -> Self {
        CausedStopTime {
            current_minutes: 0.0,
            total_minutes: 0.0,
            starve_blame_minutes: 0.0,
            block_blame_minutes: 0.0,
            last_reset_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// System state
// ---------------------------------------------------------------------------

/// Global on/off switch and elapsed-time counters. Created once at line
/// initialization; mutated only by toggle and the statistics reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemState {
    pub is_on: bool,
    pub today_on_minutes: f64,
    pub today_off_minutes: f64,
    pub last_toggled_at: Timestamp,
    pub last_toggled_by: Option<WorkerId>,
}

impl SystemState {
    pub fn initial(now: Timestamp) -> Self {
        SystemState {
            is_on: false,
            today_on_minutes: 0.0,
            today_off_minutes: 0.0,
            last_toggled_at: now,
            last_toggled_by: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub at: Timestamp,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StatusChanged {
        zone_id: ZoneId,
        from: ZoneStatus,
        to: ZoneStatus,
    },
    WorkStarted {
        zone_id: ZoneId,
        vin: Vin,
        worker: Option<WorkerId>,
    },
    WorkCompleted {
        zone_id: ZoneId,
        vin: Vin,
    },
    /// A pull handoff cleared the upstream flying-car buffer.
    FlyingCarCleared {
        zone_id: ZoneId,
        vin: Vin,
    },
    /// The upstream flying car did not match the scanned VIN; the handoff
    /// proceeded with the caller's VIN and the stale record was left alone.
    FlyingVinMismatch {
        zone_id: ZoneId,
        recorded: Vin,
        scanned: Vin,
    },
    MovedToMaintenance {
        from_zone: ZoneId,
        vin: Vin,
    },
    SystemToggled {
        is_on: bool,
        actor: Option<WorkerId>,
    },
    ZonesReset,
    StatisticsReset,
}
