//! Handoff protocol: the synchronous operations that mutate station
//! occupancy outside the periodic tick.
//!
//! State machine per station: `EMPTY → OCCUPIED (start work) → FLYING
//! (complete work) → EMPTY` once the next station pulls the flying car in.
//! None of these recompute status or blame; that is deferred to the next
//! tick, keeping worker-facing writes fast.

use crate::{
    CurrentCar, Event, EventEnvelope, FlyingCar, HandoffError, Line, Timestamp, Vin, Worker,
    ZoneId, MAINTENANCE_ZONE,
};

/// Upstream neighbor on the main line. Zone 1 is supplied from outside the
/// line and the maintenance zone has no line links.
fn upstream_of(zone_id: ZoneId) -> Option<ZoneId> {
    if zone_id == MAINTENANCE_ZONE || zone_id.0 <= 1 {
        None
    } else {
        Some(ZoneId(zone_id.0 - 1))
    }
}

impl Line {
    /// Scan a VIN into a zone and begin work on it.
    ///
    /// Fails with `Occupied` if the zone already holds a current car. When
    /// `from_flying_car` is set, the upstream station's flying-car buffer is
    /// cleared in the same locked operation iff its VIN matches the scan; a
    /// mismatch is non-fatal — the handoff proceeds with the scanned VIN and
    /// the stale record is reported, not touched.
    #[allow(clippy::too_many_arguments)]
    pub fn start_work(
        &self,
        zone_id: ZoneId,
        vin: Vin,
        model: String,
        color: String,
        worker: Option<Worker>,
        from_flying_car: bool,
        now: Timestamp,
    ) -> Result<Vec<EventEnvelope>, HandoffError> {
        let mut events = Vec::new();

        let occupy = |station: &mut crate::Station| -> Result<(), HandoffError> {
            if let Some(occupant) = &station.current_car {
                return Err(HandoffError::Occupied {
                    zone_id,
                    occupant: occupant.vin.clone(),
                });
            }
            station.current_car = Some(CurrentCar {
                vin: vin.clone(),
                model: model.clone(),
                color: color.clone(),
                entered_at: now,
                time_elapsed_minutes: 0.0,
            });
            station.current_worker = worker.clone();
            Ok(())
        };

        match upstream_of(zone_id).filter(|_| from_flying_car) {
            Some(upstream_id) => {
                self.store().with_station_pair(
                    upstream_id,
                    zone_id,
                    &mut |upstream, target| {
                        occupy(target)?;
                        match &upstream.flying_car {
                            Some(flying) if flying.vin == vin => {
                                events.push(self.emit(
                                    now,
                                    Event::FlyingCarCleared {
                                        zone_id: upstream_id,
                                        vin: vin.clone(),
                                    },
                                ));
                                upstream.flying_car = None;
                            }
                            Some(flying) => {
                                // Worker scanned ahead of a stale record.
                                events.push(self.emit(
                                    now,
                                    Event::FlyingVinMismatch {
                                        zone_id: upstream_id,
                                        recorded: flying.vin.clone(),
                                        scanned: vin.clone(),
                                    },
                                ));
                            }
                            None => {}
                        }
                        Ok(())
                    },
                )?;
            }
            None => {
                self.store()
                    .with_station(zone_id, &mut |station| occupy(station))?;
            }
        }

        events.push(self.emit(
            now,
            Event::WorkStarted {
                zone_id,
                vin,
                worker: worker.map(|w| w.id),
            },
        ));
        Ok(events)
    }

    /// Finish the occupant of a zone and park it in the flying-car buffer.
    ///
    /// Clears the worker check-in and zeroes the station's *current* blame
    /// streak; a completed cycle absolves the station while the lifetime
    /// `total_minutes` is preserved.
    pub fn complete_work(
        &self,
        zone_id: ZoneId,
        vin: &Vin,
        now: Timestamp,
    ) -> Result<Vec<EventEnvelope>, HandoffError> {
        self.store().with_station(zone_id, &mut |station| {
            let Some(car) = station.current_car.take() else {
                return Err(HandoffError::NoCar { zone_id });
            };
            if &car.vin != vin {
                let held = car.vin.clone();
                station.current_car = Some(car);
                return Err(HandoffError::VinMismatch {
                    zone_id,
                    held,
                    scanned: vin.clone(),
                });
            }
            // The buffer holds one unit; a previous completion that was never
            // pulled forward must not be overwritten.
            if let Some(flying) = &station.flying_car {
                let occupant = flying.vin.clone();
                station.current_car = Some(car);
                return Err(HandoffError::Occupied {
                    zone_id,
                    occupant,
                });
            }
            station.flying_car = Some(FlyingCar {
                vin: car.vin,
                model: car.model,
                color: car.color,
                completed_at: now,
                flying_minutes: 0.0,
            });
            station.current_worker = None;
            station.caused_stop_time.current_minutes = 0.0;
            Ok(())
        })?;

        Ok(vec![self.emit(
            now,
            Event::WorkCompleted {
                zone_id,
                vin: vin.clone(),
            },
        )])
    }

    /// Pull a defective unit off the line into the maintenance zone.
    ///
    /// The VIN may sit in either slot of the source zone. The maintenance
    /// zone's capacity is validated before the source is touched, so a full
    /// maintenance bay leaves the line unchanged.
    pub fn move_to_maintenance(
        &self,
        from_zone: ZoneId,
        vin: &Vin,
        worker: Option<Worker>,
        now: Timestamp,
    ) -> Result<Vec<EventEnvelope>, HandoffError> {
        if from_zone == MAINTENANCE_ZONE {
            return Err(HandoffError::ZoneNotFound(from_zone));
        }

        self.store()
            .with_station_pair(from_zone, MAINTENANCE_ZONE, &mut |source, maintenance| {
                if let Some(occupant) = &maintenance.current_car {
                    return Err(HandoffError::Occupied {
                        zone_id: MAINTENANCE_ZONE,
                        occupant: occupant.vin.clone(),
                    });
                }

                let (model, color) =
                    if let Some(car) = source.current_car.take_if(|c| c.vin == *vin) {
                        source.current_worker = None;
                        (car.model, car.color)
                    } else if let Some(car) = source.flying_car.take_if(|c| c.vin == *vin) {
                        (car.model, car.color)
                    } else {
                        return Err(HandoffError::NoCar { zone_id: from_zone });
                    };

                maintenance.current_car = Some(CurrentCar {
                    vin: vin.clone(),
                    model,
                    color,
                    entered_at: now,
                    time_elapsed_minutes: 0.0,
                });
                maintenance.current_worker = worker.clone();
                Ok(())
            })?;

        Ok(vec![self.emit(
            now,
            Event::MovedToMaintenance {
                from_zone,
                vin: vin.clone(),
            },
        )])
    }
}
