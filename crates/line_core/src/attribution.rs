//! Attribution engine.
//!
//! For every tick, decides which station is the root cause of every blocked
//! or starved station. Attribution looks one hop only: a `Block` is caused by
//! the immediate downstream neighbor failing to accept, a `Starve` by the
//! immediate upstream neighbor failing to supply. Cascading multi-hop
//! responsibility is deliberately not computed; one pass, O(N).

use crate::{ZoneId, ZoneStatus};
use std::collections::HashMap;

/// Per-tick blame counters for one station. The tick accumulator converts
/// these into minutes on the blamed station's cumulative ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlameCounts {
    /// Times this station failed to supply its downstream neighbor.
    pub starve_count: u32,
    /// Times this station failed to accept from its upstream neighbor.
    pub block_count: u32,
}

impl BlameCounts {
    pub fn total(self) -> u32 {
        self.starve_count + self.block_count
    }
}

/// Walk the ordered main line once and produce the blame distribution for
/// this tick. `line` must be the main-line stations in ascending zone order
/// with their freshly classified statuses; the maintenance zone is excluded.
///
/// A station can receive both starve-blame (from downstream) and block-blame
/// (from upstream) in the same tick; both are recorded independently.
pub fn attribute(line: &[(ZoneId, ZoneStatus)]) -> HashMap<ZoneId, BlameCounts> {
    let mut blame: HashMap<ZoneId, BlameCounts> = HashMap::new();

    for (idx, &(_, status)) in line.iter().enumerate() {
        match status {
            ZoneStatus::Block => {
                // Caused by the next station not pulling the flying car
                // forward. The last zone has no downstream; nobody to blame.
                if let Some(&(next_id, _)) = line.get(idx + 1) {
                    blame.entry(next_id).or_default().block_count += 1;
                }
            }
            ZoneStatus::Starve => {
                // Caused by the previous station not producing a flying car.
                // An upstream that is actively processing is not withholding
                // anything and carries no blame. The first zone never
                // classifies Starve, so idx > 0 here.
                if idx > 0 {
                    let (prev_id, prev_status) = line[idx - 1];
                    if prev_status != ZoneStatus::Work {
                        blame.entry(prev_id).or_default().starve_count += 1;
                    }
                }
            }
            ZoneStatus::Work | ZoneStatus::Paused => {}
        }
    }

    blame
}
