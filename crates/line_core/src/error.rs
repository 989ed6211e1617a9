use crate::{Vin, ZoneId};

/// Failure surfaced synchronously to a handoff caller. A worker's scan
/// visibly fails so they can retry with the correct VIN or zone.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("zone {zone_id} is already occupied by {occupant}")]
    Occupied { zone_id: ZoneId, occupant: Vin },

    #[error("zone {0} not found")]
    ZoneNotFound(ZoneId),

    #[error("no car in zone {zone_id} matching this operation")]
    NoCar { zone_id: ZoneId },

    #[error("vin mismatch at zone {zone_id}: station holds {held}, scanned {scanned}")]
    VinMismatch {
        zone_id: ZoneId,
        held: Vin,
        scanned: Vin,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure from the persistence collaborator. Transient; each operation is
/// scoped to a single station and independently retryable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("zone {0} not found in store")]
    ZoneNotFound(ZoneId),

    #[error("persistence failure: {0}")]
    Persistence(String),
}
