//! Precomputed lookup tables of small multiples of `G`.
//!
//! Every entry packs a 40-bit fingerprint of a compressed point with the
//! 24-bit offset of that point inside its shard:
//!
//! ```text
//!   compressed point:  [ parity | x0 .. x23 | x24 .. x28 | x29 x30 x31 ]
//!   byte index:           0        1 .. 24    25 .. 29     30 31 32
//!   entry (big endian):              [ x24 .. x28 | offset (24 bits) ]
//! ```
//!
//! Bytes 25..33 of the compression are read as a big-endian `u64`, the low
//! three bytes are replaced by the offset. Sorting the entries makes every
//! fingerprint a contiguous run that binary search can find.

use byteorder::{BigEndian, ByteOrder};
use log::debug;
use parking_lot::Mutex;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    errors::{Error, Result},
    group::{
        batch_normalize, compress_affine, generator, value_point, AffinePoint, CompressedPoint,
        ProjectivePoint,
    },
    Balance,
};

use super::signal::StopSignal;

/// Largest supported shard, offsets must fit in 24 bits.
pub const MAX_TABLE_SIZE: usize = 1 << 24;

/// Points are normalized to affine coordinates in batches of this size.
pub const BATCH_SIZE: usize = 256;

/// Entries built between two cancellation checks.
pub const BUILD_CHECK_INTERVAL: usize = 8192;

const FINGERPRINT_WINDOW: core::ops::Range<usize> = 25..33;
const OFFSET_BITS: u32 = 24;
pub const OFFSET_MASK: u64 = (1 << OFFSET_BITS) - 1;
pub const FINGERPRINT_MASK: u64 = !OFFSET_MASK;

/// The 40-bit fingerprint of a compressed point, in the high bits of a `u64`.
pub fn fingerprint(compressed: &CompressedPoint) -> u64 {
    BigEndian::read_u64(&compressed[FINGERPRINT_WINDOW]) & FINGERPRINT_MASK
}

/// Packs a point fingerprint with its offset inside the shard.
pub fn table_entry(compressed: &CompressedPoint, offset: usize) -> u64 {
    debug_assert!(offset < MAX_TABLE_SIZE);
    fingerprint(compressed) | (offset as u64 & OFFSET_MASK)
}

#[inline]
pub fn entry_fingerprint(entry: u64) -> u64 {
    entry & FINGERPRINT_MASK
}

#[inline]
pub fn entry_offset(entry: u64) -> u64 {
    entry & OFFSET_MASK
}

/// Checks that `size` is a non-zero multiple of 256 no larger than 2^24.
pub fn validate_table_size(size: usize) -> Result<()> {
    if size == 0 || size % BATCH_SIZE != 0 || size > MAX_TABLE_SIZE {
        return Err(Error::InvalidTableSize { size });
    }
    Ok(())
}

/// One shard: sorted entries for the balances `[start, start + len)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreComputeTable(Vec<u64>);

impl PreComputeTable {
    pub(crate) fn from_entries(mut entries: Vec<u64>) -> Self {
        sort_entries(&mut entries);
        Self(entries)
    }

    pub fn entries(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Offsets of every entry whose fingerprint equals `fingerprint`.
    ///
    /// Entries sharing a fingerprint are adjacent, so this is a binary search
    /// followed by a short scan.
    pub fn candidates(&self, fingerprint: u64) -> impl Iterator<Item = u64> + '_ {
        let start = self
            .0
            .partition_point(|entry| entry_fingerprint(*entry) < fingerprint);
        self.0[start..]
            .iter()
            .take_while(move |entry| entry_fingerprint(**entry) == fingerprint)
            .map(|entry| entry_offset(*entry))
    }
}

/// A complete set of shards covering the balances `[0, span)`.
///
/// Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupTable {
    shards: Vec<PreComputeTable>,
}

impl LookupTable {
    pub(crate) fn from_shards(shards: Vec<PreComputeTable>) -> Self {
        Self { shards }
    }

    /// Builds a single shard table of `table_size` entries.
    pub fn build(
        table_size: usize,
        stop: &StopSignal,
        status: &(dyn Fn(&str) + Sync),
    ) -> Result<Self> {
        TableBuilder::new(1, table_size)?.build(stop, status)
    }

    pub fn shards(&self) -> &[PreComputeTable] {
        &self.shards
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The number of entries in one shard.
    pub fn table_size(&self) -> usize {
        self.shards.first().map_or(0, PreComputeTable::len)
    }

    /// The number of balances covered by all shards together.
    pub fn span(&self) -> Balance {
        self.shards.iter().map(|shard| shard.len() as Balance).sum()
    }
}

/// Builds `LookupTable`s.
///
/// Shard `i` holds the multiples `[i * table_size, (i + 1) * table_size)` of `G`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableBuilder {
    shard_count: usize,
    table_size: usize,
    check_interval: usize,
}

impl TableBuilder {
    pub fn new(shard_count: usize, table_size: usize) -> Result<Self> {
        validate_table_size(table_size)?;
        if shard_count == 0 {
            return Err(Error::InvalidShardCount { count: shard_count });
        }
        Ok(Self {
            shard_count,
            table_size,
            check_interval: BUILD_CHECK_INTERVAL,
        })
    }

    /// Sets how many entries are built between two cancellation checks.
    pub fn check_interval(mut self, interval: usize) -> Result<Self> {
        if interval == 0 || interval % BATCH_SIZE != 0 {
            return Err(Error::InvalidCheckInterval { interval });
        }
        self.check_interval = interval;
        Ok(self)
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Builds every shard.
    ///
    /// Returns `ConstructionAborted` as soon as `stop` fires; a partially
    /// built table is never returned.
    pub fn build(
        &self,
        stop: &StopSignal,
        status: &(dyn Fn(&str) + Sync),
    ) -> Result<LookupTable> {
        // Entries built by all shards so far, reported under the lock so the
        // percentages only ever grow.
        let progress = Mutex::new(0usize);
        #[cfg(feature = "rayon")]
        let shards = (0..self.shard_count)
            .into_par_iter()
            .map(|index| self.build_shard(index, &progress, stop, status))
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "rayon"))]
        let shards = (0..self.shard_count)
            .map(|index| self.build_shard(index, &progress, stop, status))
            .collect::<Result<Vec<_>>>()?;

        if stop.is_stopped() {
            return Err(Error::ConstructionAborted);
        }
        status("100.00%");
        Ok(LookupTable::from_shards(shards))
    }

    fn build_shard(
        &self,
        index: usize,
        progress: &Mutex<usize>,
        stop: &StopSignal,
        status: &(dyn Fn(&str) + Sync),
    ) -> Result<PreComputeTable> {
        let total = (self.shard_count * self.table_size) as f64;
        let start = index * self.table_size;
        let mut reported = 0;

        let mut acc = value_point(start as Balance);
        let mut batch = vec![ProjectivePoint::IDENTITY; BATCH_SIZE];
        let mut affine = vec![AffinePoint::IDENTITY; BATCH_SIZE];
        let mut entries = Vec::with_capacity(self.table_size);

        for offset in (0..self.table_size).step_by(BATCH_SIZE) {
            if offset % self.check_interval == 0 {
                if stop.is_stopped() {
                    debug!("Shard {index} aborted at offset {offset}");
                    return Err(Error::ConstructionAborted);
                }
                let mut built = progress.lock();
                *built += offset - reported;
                reported = offset;
                status(&format!("{:.2}%", *built as f64 * 100.0 / total));
            }

            for point in batch.iter_mut() {
                *point = acc;
                acc += generator();
            }
            batch_normalize(&batch, &mut affine);

            entries.extend(
                affine
                    .iter()
                    .enumerate()
                    .map(|(k, point)| table_entry(&compress_affine(point), offset + k)),
            );
        }

        if stop.is_stopped() {
            return Err(Error::ConstructionAborted);
        }
        Ok(PreComputeTable::from_entries(entries))
    }
}

fn sort_entries(entries: &mut [u64]) {
    #[cfg(feature = "rayon")]
    entries.par_sort_unstable();
    #[cfg(not(feature = "rayon"))]
    entries.sort_unstable();
}
