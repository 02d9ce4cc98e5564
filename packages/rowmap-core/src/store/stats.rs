use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counts of store round trips by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub point_selects: u64,
    pub batch_selects: u64,
    pub scans: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

impl StoreStats {
    /// Total number of read round trips.
    pub fn selects(&self) -> u64 {
        self.point_selects + self.batch_selects + self.scans
    }

    /// Difference between this snapshot and an earlier one.
    pub fn since(&self, earlier: &StoreStats) -> StoreStats {
        StoreStats {
            point_selects: self.point_selects.saturating_sub(earlier.point_selects),
            batch_selects: self.batch_selects.saturating_sub(earlier.batch_selects),
            scans: self.scans.saturating_sub(earlier.scans),
            inserts: self.inserts.saturating_sub(earlier.inserts),
            updates: self.updates.saturating_sub(earlier.updates),
            deletes: self.deletes.saturating_sub(earlier.deletes),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    point_selects: AtomicU64,
    batch_selects: AtomicU64,
    scans: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum StatKind {
    PointSelect,
    BatchSelect,
    Scan,
    Insert,
    Update,
    Delete,
}

impl StatsCounters {
    pub(crate) fn record(&self, kind: StatKind) {
        let counter = match kind {
            StatKind::PointSelect => &self.point_selects,
            StatKind::BatchSelect => &self.batch_selects,
            StatKind::Scan => &self.scans,
            StatKind::Insert => &self.inserts,
            StatKind::Update => &self.updates,
            StatKind::Delete => &self.deletes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StoreStats {
        StoreStats {
            point_selects: self.point_selects.load(Ordering::Relaxed),
            batch_selects: self.batch_selects.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}
