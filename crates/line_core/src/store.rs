//! Station store abstraction.
//!
//! The store exclusively owns all `Station` records plus the single
//! `SystemState` record. The tick accumulator and the handoff protocol read
//! snapshots and write back through the update contract below; they hold no
//! copy across ticks. Each station record is an independently lockable unit.

use crate::{
    HandoffError, Station, StoreError, SystemState, Timestamp, ZoneId, MAINTENANCE_ZONE,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Persistence contract for line state. Last-write-wins per record; every
/// update is a whole-aggregate read-modify-write under the record's lock.
pub trait LineStore: Send + Sync {
    /// All stations, main line ascending by zone id, maintenance zone last.
    fn list_stations(&self) -> Result<Vec<Station>, StoreError>;

    fn get_station(&self, zone_id: ZoneId) -> Result<Station, StoreError>;

    /// Infallible mutation of a single station, committed atomically.
    /// Used by the tick accumulator, which pre-computes all deltas.
    fn update_station(
        &self,
        zone_id: ZoneId,
        apply: &mut dyn FnMut(&mut Station),
    ) -> Result<(), StoreError>;

    /// Validate-and-mutate a single station under its lock. The closure may
    /// reject the operation; nothing is committed in that case.
    fn with_station(
        &self,
        zone_id: ZoneId,
        apply: &mut dyn FnMut(&mut Station) -> Result<(), HandoffError>,
    ) -> Result<(), HandoffError>;

    /// Validate-and-mutate two stations under both locks. Locks are acquired
    /// in ascending zone-id order regardless of argument order, so concurrent
    /// pair updates cannot deadlock.
    fn with_station_pair(
        &self,
        a: ZoneId,
        b: ZoneId,
        apply: &mut dyn FnMut(&mut Station, &mut Station) -> Result<(), HandoffError>,
    ) -> Result<(), HandoffError>;

    fn get_system_state(&self) -> Result<SystemState, StoreError>;

    fn update_system_state(
        &self,
        apply: &mut dyn FnMut(&mut SystemState),
    ) -> Result<SystemState, StoreError>;
}

/// In-memory store: one mutex per station record, so handoff writes to zone K
/// and tick writes to zone K serialize while zones K and K+1 proceed
/// concurrently.
pub struct MemoryStore {
    zones: BTreeMap<ZoneId, Mutex<Station>>,
    system: Mutex<SystemState>,
}

impl MemoryStore {
    /// Seed zones `1..=zone_count` plus the maintenance zone, all empty.
    pub fn new(zone_count: u32, now: Timestamp) -> Self {
        let mut zones = BTreeMap::new();
        for n in 1..=zone_count {
            zones.insert(ZoneId(n), Mutex::new(Station::empty(ZoneId(n), now)));
        }
        zones.insert(
            MAINTENANCE_ZONE,
            Mutex::new(Station::empty(MAINTENANCE_ZONE, now)),
        );
        MemoryStore {
            zones,
            system: Mutex::new(SystemState::initial(now)),
        }
    }

    fn zone(&self, zone_id: ZoneId) -> Result<&Mutex<Station>, StoreError> {
        self.zones
            .get(&zone_id)
            .ok_or(StoreError::ZoneNotFound(zone_id))
    }
}

impl LineStore for MemoryStore {
    fn list_stations(&self) -> Result<Vec<Station>, StoreError> {
        // BTreeMap iterates ascending, which puts ZoneId(0) first; the
        // contract wants the maintenance zone last.
        let mut line: Vec<Station> = self
            .zones
            .iter()
            .filter(|(id, _)| **id != MAINTENANCE_ZONE)
            .map(|(_, station)| station.lock().clone())
            .collect();
        if let Some(maintenance) = self.zones.get(&MAINTENANCE_ZONE) {
            line.push(maintenance.lock().clone());
        }
        Ok(line)
    }

    fn get_station(&self, zone_id: ZoneId) -> Result<Station, StoreError> {
        Ok(self.zone(zone_id)?.lock().clone())
    }

    fn update_station(
        &self,
        zone_id: ZoneId,
        apply: &mut dyn FnMut(&mut Station),
    ) -> Result<(), StoreError> {
        let mut station = self.zone(zone_id)?.lock();
        apply(&mut station);
        Ok(())
    }

    fn with_station(
        &self,
        zone_id: ZoneId,
        apply: &mut dyn FnMut(&mut Station) -> Result<(), HandoffError>,
    ) -> Result<(), HandoffError> {
        let slot = self
            .zones
            .get(&zone_id)
            .ok_or(HandoffError::ZoneNotFound(zone_id))?;
        let mut station = slot.lock();
        apply(&mut station)
    }

    fn with_station_pair(
        &self,
        a: ZoneId,
        b: ZoneId,
        apply: &mut dyn FnMut(&mut Station, &mut Station) -> Result<(), HandoffError>,
    ) -> Result<(), HandoffError> {
        if a == b {
            return Err(StoreError::Persistence(
                "pair update requires two distinct zones".to_string(),
            )
            .into());
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let low_slot = self
            .zones
            .get(&low)
            .ok_or(HandoffError::ZoneNotFound(low))?;
        let high_slot = self
            .zones
            .get(&high)
            .ok_or(HandoffError::ZoneNotFound(high))?;

        // Fixed acquisition order: lower zone id first.
        let mut low_guard = low_slot.lock();
        let mut high_guard = high_slot.lock();
        if a < b {
            apply(&mut low_guard, &mut high_guard)
        } else {
            apply(&mut high_guard, &mut low_guard)
        }
    }

    fn get_system_state(&self) -> Result<SystemState, StoreError> {
        Ok(self.system.lock().clone())
    }

    fn update_system_state(
        &self,
        apply: &mut dyn FnMut(&mut SystemState),
    ) -> Result<SystemState, StoreError> {
        let mut system = self.system.lock();
        apply(&mut system);
        Ok(system.clone())
    }
}
