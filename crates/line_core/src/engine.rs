//! Line engine: tick accumulator and service operations.
//!
//! One `Line` owns a handle to the station store and orchestrates each
//! simulation step: read all stations, reclassify, attribute blame, commit
//! updated durations. Handoff operations live in `handoff.rs`.

use crate::attribution::{attribute, BlameCounts};
use crate::classify::classify;
use crate::{
    Event, EventEnvelope, EventId, LineStore, Station, StoreError, SystemState, Timestamp,
    WorkerId, ZoneId, ZoneStatus, MAINTENANCE_ZONE,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Result of one tick. Failures are per-zone and non-fatal; a failed zone's
/// `last_calculated_at` is left unadvanced so the next tick recovers the gap.
#[derive(Debug, Default)]
pub struct TickSummary {
    pub events: Vec<EventEnvelope>,
    pub failures: Vec<(ZoneId, StoreError)>,
}

pub struct Line {
    store: Arc<dyn LineStore>,
    next_event_id: AtomicU64,
}

impl Line {
    pub fn new(store: Arc<dyn LineStore>) -> Self {
        Line {
            store,
            next_event_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn store(&self) -> &dyn LineStore {
        self.store.as_ref()
    }

    pub(crate) fn emit(&self, at: Timestamp, event: Event) -> EventEnvelope {
        let n = self.next_event_id.fetch_add(1, Ordering::Relaxed);
        EventEnvelope {
            id: EventId(format!("evt_{n:06}")),
            at,
            event,
        }
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// All stations, main line ascending, maintenance zone last.
    pub fn list_stations(&self) -> Result<Vec<Station>, StoreError> {
        self.store.list_stations()
    }

    pub fn get_system_state(&self) -> Result<SystemState, StoreError> {
        self.store.get_system_state()
    }

    // -----------------------------------------------------------------------
    // Tick accumulator
    // -----------------------------------------------------------------------

    /// Advance the line by one step at wall-clock time `now`.
    ///
    /// Order of operations:
    /// 1. Snapshot the system switch and every station.
    /// 2. System off: advance every `last_calculated_at` without touching any
    ///    accumulation bucket, so a later resume credits no paused minutes.
    /// 3. Classify every station from the snapshot (previous tick's committed
    ///    occupancy — neighbor reads never observe this tick's own writes).
    /// 4. Attribute blame once over the freshly classified main line.
    /// 5. Commit each station independently: bucket delta (elapsed floored
    ///    at the last system toggle), car timers, blame minutes,
    ///    `last_calculated_at = now`.
    ///
    /// Calling twice with the same `now` is a no-op for every bucket: the
    /// second call sees `last_calculated_at == now`, elapsed = 0.
    pub fn tick(&self, now: Timestamp) -> Result<TickSummary, StoreError> {
        let system = self.store.get_system_state()?;
        let stations = self.store.list_stations()?;
        let mut summary = TickSummary::default();

        if !system.is_on {
            self.tick_frozen(now, &stations, &mut summary);
            return Ok(summary);
        }

        // Maintenance zone sits outside the line ordering; classify it with
        // no neighbors and exclude it from attribution.
        let line: Vec<&Station> = stations
            .iter()
            .filter(|s| s.zone_id != MAINTENANCE_ZONE)
            .collect();

        let mut new_statuses: Vec<(ZoneId, ZoneStatus)> = Vec::with_capacity(stations.len());
        for (idx, station) in line.iter().enumerate() {
            let previous = if idx == 0 { None } else { Some(line[idx - 1]) };
            new_statuses.push((station.zone_id, classify(station, previous, true)));
        }

        let blame = attribute(&new_statuses);

        for station in stations
            .iter()
            .filter(|s| s.zone_id == MAINTENANCE_ZONE)
        {
            new_statuses.push((station.zone_id, classify(station, None, true)));
        }

        // `new_statuses` was built in store order: main line first, then the
        // maintenance zone.
        for (station, &(_, new_status)) in stations.iter().zip(new_statuses.iter()) {
            let counts = blame.get(&station.zone_id).copied().unwrap_or_default();
            self.commit_station(
                now,
                station,
                new_status,
                counts,
                system.last_toggled_at,
                &mut summary,
            );
        }

        Ok(summary)
    }

    /// System off: the clock is frozen. Advance `last_calculated_at` on every
    /// station so the off interval is never credited as active minutes, and
    /// pin statuses to `Paused`.
    fn tick_frozen(&self, now: Timestamp, stations: &[Station], summary: &mut TickSummary) {
        for snapshot in stations {
            let result = self.store.update_station(snapshot.zone_id, &mut |station| {
                station.status = ZoneStatus::Paused;
                station.time_accumulation.last_calculated_at = now;
            });
            match result {
                Ok(()) => {
                    if snapshot.status != ZoneStatus::Paused {
                        summary.events.push(self.emit(
                            now,
                            Event::StatusChanged {
                                zone_id: snapshot.zone_id,
                                from: snapshot.status,
                                to: ZoneStatus::Paused,
                            },
                        ));
                    }
                }
                Err(err) => summary.failures.push((snapshot.zone_id, err)),
            }
        }
    }

    /// Commit one station's tick deltas. Elapsed time runs from the
    /// snapshot's `last_calculated_at`, floored at the most recent system
    /// toggle: a station whose clock predates the toggle spent that gap
    /// paused, and the gap must never land in an accumulation bucket even if
    /// no frozen tick ran while the system was off. A failed commit leaves
    /// `last_calculated_at` unadvanced.
    fn commit_station(
        &self,
        now: Timestamp,
        snapshot: &Station,
        new_status: ZoneStatus,
        counts: BlameCounts,
        toggled_at: Timestamp,
        summary: &mut TickSummary,
    ) {
        let since = snapshot.time_accumulation.last_calculated_at.max(toggled_at);
        let elapsed = now.minutes_since(since);
        let blame_minutes = f64::from(counts.total()) * elapsed;
        let starve_blame = f64::from(counts.starve_count) * elapsed;
        let block_blame = f64::from(counts.block_count) * elapsed;

        let result = self.store.update_station(snapshot.zone_id, &mut |station| {
            station.status = new_status;
            match new_status {
                ZoneStatus::Work => station.time_accumulation.work_minutes += elapsed,
                ZoneStatus::Starve => station.time_accumulation.starve_minutes += elapsed,
                ZoneStatus::Block => station.time_accumulation.block_minutes += elapsed,
                ZoneStatus::Paused => {}
            }
            if let Some(car) = station.current_car.as_mut() {
                car.time_elapsed_minutes += elapsed;
            }
            if let Some(car) = station.flying_car.as_mut() {
                car.flying_minutes += elapsed;
            }
            station.caused_stop_time.current_minutes += blame_minutes;
            station.caused_stop_time.total_minutes += blame_minutes;
            station.caused_stop_time.starve_blame_minutes += starve_blame;
            station.caused_stop_time.block_blame_minutes += block_blame;
            station.time_accumulation.last_calculated_at = now;
        });

        match result {
            Ok(()) => {
                if snapshot.status != new_status {
                    summary.events.push(self.emit(
                        now,
                        Event::StatusChanged {
                            zone_id: snapshot.zone_id,
                            from: snapshot.status,
                            to: new_status,
                        },
                    ));
                }
            }
            Err(err) => summary.failures.push((snapshot.zone_id, err)),
        }
    }

    // -----------------------------------------------------------------------
    // System toggle and resets
    // -----------------------------------------------------------------------

    /// Flip the global switch. The interval since the previous toggle is
    /// accumulated into the on/off bucket matching the prior state. Toggling
    /// to the current state is a no-op. No station record is written here;
    /// the tick floors every elapsed interval at `last_toggled_at`, so a
    /// resume needs no per-station clock resets.
    pub fn toggle_system(
        &self,
        on: bool,
        actor: Option<WorkerId>,
        now: Timestamp,
    ) -> Result<(SystemState, Vec<EventEnvelope>), StoreError> {
        let mut toggled = false;
        let state = self.store.update_system_state(&mut |system| {
            if system.is_on == on {
                return;
            }
            let elapsed = now.minutes_since(system.last_toggled_at);
            if system.is_on {
                system.today_on_minutes += elapsed;
            } else {
                system.today_off_minutes += elapsed;
            }
            system.is_on = on;
            system.last_toggled_at = now;
            system.last_toggled_by = actor.clone();
            toggled = true;
        })?;

        let mut events = Vec::new();
        if toggled {
            events.push(self.emit(now, Event::SystemToggled { is_on: on, actor }));
        }
        Ok((state, events))
    }

    /// Clear all occupancy, workers, and counters. The set of zone ids is
    /// preserved.
    pub fn reset_all_zones(&self, now: Timestamp) -> Result<Vec<EventEnvelope>, StoreError> {
        for station in self.store.list_stations()? {
            self.store.update_station(station.zone_id, &mut |s| {
                *s = Station::empty(s.zone_id, now);
            })?;
        }
        Ok(vec![self.emit(now, Event::ZonesReset)])
    }

    /// Zero accumulation and blame counters plus the system day counters,
    /// without disturbing current occupancy.
    pub fn reset_statistics(&self, now: Timestamp) -> Result<Vec<EventEnvelope>, StoreError> {
        for station in self.store.list_stations()? {
            self.store.update_station(station.zone_id, &mut |s| {
                s.time_accumulation = crate::TimeAccumulation::zeroed(now);
                s.caused_stop_time = crate::CausedStopTime::zeroed(now);
            })?;
        }
        self.store.update_system_state(&mut |system| {
            system.today_on_minutes = 0.0;
            system.today_off_minutes = 0.0;
            // Restart the toggle interval too, or the next toggle would
            // re-accumulate the span the reset just erased.
            system.last_toggled_at = now;
        })?;
        Ok(vec![self.emit(now, Event::StatisticsReset)])
    }
}
