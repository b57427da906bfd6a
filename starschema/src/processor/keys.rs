use common::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of surrogate keys. Keys are pairwise unique within one instance;
/// nothing is promised about density, order or stability across runs.
pub trait SurrogateKeys: Send + Sync {
    /// Allocates `rows` keys for rows of the given row-set partition.
    fn allocate(&self, partition: usize, rows: usize) -> Result<Vec<i64>>;
}

/// One shared atomic counter.
#[derive(Debug, Default)]
pub struct SequentialKeys {
    next: AtomicI64,
}

impl SequentialKeys {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SurrogateKeys for SequentialKeys {
    fn allocate(&self, _partition: usize, rows: usize) -> Result<Vec<i64>> {
        let start = self.next.fetch_add(rows as i64, Ordering::Relaxed);
        Ok((0..rows as i64).map(|offset| start + offset).collect())
    }
}

/// Partition index in the upper 31 bits, a partition-local counter in the
/// lower 33 bits. Keys are sparse and grouped by partition.
#[derive(Debug, Default)]
pub struct PartitionOffsetKeys {
    counters: DashMap<usize, i64>,
}

const OFFSET_BITS: u32 = 33;
const MAX_PARTITION: usize = (1 << 30) - 1;

impl PartitionOffsetKeys {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SurrogateKeys for PartitionOffsetKeys {
    fn allocate(&self, partition: usize, rows: usize) -> Result<Vec<i64>> {
        if partition > MAX_PARTITION {
            return Err(Error::InvalidInput(format!(
                "Partition index {} exceeds surrogate key range",
                partition
            )));
        }

        let mut counter = self.counters.entry(partition).or_insert(0);
        let start = *counter;
        let end = start + rows as i64;
        if end > 1 << OFFSET_BITS {
            return Err(Error::InvalidInput(format!(
                "Partition {} exhausted its surrogate key range",
                partition
            )));
        }
        *counter = end;

        let base = (partition as i64) << OFFSET_BITS;
        Ok((start..end).map(|offset| base | offset).collect())
    }
}
