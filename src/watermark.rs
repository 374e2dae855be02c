use crate::models::OwnerId;
use std::collections::{HashMap, HashSet};

/// Timestamp boundaries below which transactions count as already
/// reported. Keyed per (owner, address) so that a second user watching an
/// address someone else already watches still receives that address's
/// transactions from their own start point onward.
///
/// Single-writer: only the poll loop reads and advances marks, once per
/// cycle after aggregation.
#[derive(Debug)]
pub struct WatermarkStore {
    /// Boundary applied to keys that have never advanced; set to engine
    /// start time so history is not replayed.
    start: u64,
    marks: HashMap<(OwnerId, String), u64>,
}

impl WatermarkStore {
    pub fn new(start: u64) -> Self {
        Self {
            start,
            marks: HashMap::new(),
        }
    }

    /// Current boundary for one watched address.
    pub fn read(&self, owner: OwnerId, address: &str) -> u64 {
        self.marks
            .get(&(owner, address.to_string()))
            .copied()
            .unwrap_or(self.start)
    }

    /// Advance the boundary; no-op when `candidate` is not strictly
    /// greater than the current value. Returns whether it moved.
    pub fn advance(&mut self, owner: OwnerId, address: &str, candidate: u64) -> bool {
        let current = self.read(owner, address);
        if candidate <= current {
            return false;
        }
        self.marks.insert((owner, address.to_string()), candidate);
        true
    }

    /// Drop marks for keys absent from the current watch lists, so marks
    /// for removed watches do not accumulate for the process lifetime. A
    /// watch added back later reads the start boundary again.
    pub fn retain_watched(&mut self, watched: &HashSet<(OwnerId, String)>) {
        self.marks.retain(|key, _| watched.contains(key));
    }
}
