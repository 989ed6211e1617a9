//! Zone classifier.
//!
//! Pure function from `(own occupancy, upstream occupancy, system on/off)` to
//! an operating status. Statuses are recomputed every tick and never trusted
//! from storage, so they can never drift from the occupancy that implies them.

use crate::{Station, ZoneStatus};

/// Classify one station.
///
/// `previous` is the immediate upstream neighbor on the main line; `None` for
/// the first zone (treated as always supplied from outside the line) and for
/// the maintenance zone (no line links).
///
/// Precedence:
/// 1. System off freezes every zone at `Paused` regardless of occupancy.
/// 2. A present `current_car` means the zone is actively processing: `Work`.
/// 3. A present `flying_car` means the buffer slot is occupied by a finished
///    unit nobody has pulled: `Block`. The last zone has no downstream to
///    pull it and stays `Block` until the unit is explicitly moved off-line.
/// 4. Empty zone: `Starve` only when upstream has nothing ready to pull;
///    with supply at hand (or external supply for the first zone) the zone is
///    counted as working.
pub fn classify(station: &Station, previous: Option<&Station>, system_on: bool) -> ZoneStatus {
    if !system_on {
        return ZoneStatus::Paused;
    }
    if station.current_car.is_some() {
        return ZoneStatus::Work;
    }
    if station.flying_car.is_some() {
        return ZoneStatus::Block;
    }
    match previous {
        Some(upstream) if upstream.flying_car.is_none() => ZoneStatus::Starve,
        _ => ZoneStatus::Work,
    }
}
