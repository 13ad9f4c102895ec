//! Baby-step giant-step search over a `LookupTable`.
//!
//! The table supplies the baby steps `[0, span)`. Each giant step subtracts
//! `span * G` from the cursor, so a balance `b` is found after `b / span`
//! giant steps. The loop has no upper bound of its own; it ends on a match,
//! on cancellation, or on the optional giant step cap.

use log::trace;

use crate::{
    errors::{Error, Result},
    group::{compress, value_point, ProjectivePoint},
    Balance,
};

use super::{
    signal::StopSignal,
    table::{fingerprint, LookupTable},
};

/// Giant steps between two cancellation checks.
pub const SEARCH_CHECK_INTERVAL: u64 = 2048;

/// Bounds applied to a single search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    /// Giant steps between cancellation checks and progress reports.
    pub check_interval: u64,
    /// Stop with `SearchExhausted` after this many giant steps.
    pub max_giant_steps: Option<u64>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            check_interval: SEARCH_CHECK_INTERVAL,
            max_giant_steps: None,
        }
    }
}

/// A recovered balance and the number of giant steps it took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    pub balance: Balance,
    pub giant_steps: u64,
}

impl LookupTable {
    /// Finds `balance` such that `balance * G == target`.
    pub fn lookup(
        &self,
        target: &ProjectivePoint,
        stop: &StopSignal,
        status: &dyn Fn(&str),
    ) -> Result<Balance> {
        self.search(target, &SearchLimits::default(), stop, status)
            .map(|outcome| outcome.balance)
    }

    /// Like `lookup`, also reporting how many giant steps were taken.
    ///
    /// `status` receives the balance base reached so far at every checkpoint.
    pub fn search(
        &self,
        target: &ProjectivePoint,
        limits: &SearchLimits,
        stop: &StopSignal,
        status: &dyn Fn(&str),
    ) -> Result<SearchOutcome> {
        let check_interval = limits.check_interval.max(1);
        let step = -value_point(self.span());

        let mut cursor = *target;
        let mut base: Balance = 0;
        let mut giant_steps: u64 = 0;

        loop {
            if giant_steps % check_interval == 0 {
                if stop.is_stopped() {
                    return Err(Error::SearchSuspended { attempted: base });
                }
                trace!("Balance search at {base} after {giant_steps} giant steps");
                status(&base.to_string());
            }

            if giant_steps != 0 {
                cursor += step;
            }

            let wanted = fingerprint(&compress(&cursor));
            for shard in self.shards() {
                // Fingerprints collide with probability ~2^-40, the full
                // point comparison against `target` settles each candidate.
                let found = shard
                    .candidates(wanted)
                    .filter_map(|offset| base.checked_add(offset))
                    .find(|candidate| value_point(*candidate) == *target);
                if let Some(balance) = found {
                    return Ok(SearchOutcome {
                        balance,
                        giant_steps,
                    });
                }
                base = base
                    .checked_add(shard.len() as Balance)
                    .ok_or(Error::SearchExhausted { giant_steps })?;
            }

            if limits
                .max_giant_steps
                .map_or(false, |max| giant_steps >= max)
            {
                return Err(Error::SearchExhausted { giant_steps });
            }
            giant_steps += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decryptor::table::{table_entry, PreComputeTable, TableBuilder};
    use std::cell::RefCell;

    fn small_table(size: usize) -> LookupTable {
        LookupTable::build(size, &StopSignal::new(), &|_: &str| {}).unwrap()
    }

    fn quiet(_: &str) {}

    #[test]
    fn finds_baby_steps() {
        let table = small_table(512);
        for balance in [0u64, 1, 2, 255, 256, 511] {
            let outcome = table
                .search(
                    &value_point(balance),
                    &SearchLimits::default(),
                    &StopSignal::new(),
                    &quiet,
                )
                .unwrap();
            assert_eq!(
                outcome,
                SearchOutcome {
                    balance,
                    giant_steps: 0
                }
            );
        }
    }

    #[test]
    fn counts_giant_steps() {
        let table = small_table(256);
        let balance = 256 * 3 + 42;
        let outcome = table
            .search(
                &value_point(balance),
                &SearchLimits::default(),
                &StopSignal::new(),
                &quiet,
            )
            .unwrap();
        assert_eq!(outcome.balance, balance);
        assert_eq!(outcome.giant_steps, 3);

        assert_eq!(
            table.lookup(&value_point(123_456), &StopSignal::new(), &quiet),
            Ok(123_456)
        );
    }

    #[test]
    fn multi_shard_search() {
        let table = TableBuilder::new(4, 256)
            .unwrap()
            .build(&StopSignal::new(), &|_: &str| {})
            .unwrap();
        for balance in [0u64, 300, 700, 1023, 1024, 5_000, 77_777] {
            let outcome = table
                .search(
                    &value_point(balance),
                    &SearchLimits::default(),
                    &StopSignal::new(),
                    &quiet,
                )
                .unwrap();
            assert_eq!(outcome.balance, balance);
            assert_eq!(outcome.giant_steps, balance / 1024);
        }
    }

    #[test]
    fn fingerprint_collision_is_skipped() {
        let target = value_point(10);
        let fp = table_entry(&compress(&target), 0);
        // A bogus entry sorted before the real one shares its fingerprint.
        let entries = (0..256usize)
            .map(|offset| table_entry(&compress(&value_point(offset as Balance)), offset))
            .chain(core::iter::once(fp | 3))
            .collect();
        let table = LookupTable::from_shards(vec![PreComputeTable::from_entries(entries)]);
        assert_eq!(table.shards()[0].candidates(fp).collect::<Vec<_>>(), vec![3, 10]);

        assert_eq!(table.lookup(&target, &StopSignal::new(), &quiet), Ok(10));
    }

    #[test]
    fn stopped_search_is_suspended() {
        let table = small_table(256);
        let stop = StopSignal::new();
        stop.stop();
        assert_eq!(
            table.lookup(&value_point(10), &stop, &quiet),
            Err(Error::SearchSuspended { attempted: 0 })
        );
    }

    #[test]
    fn progress_and_cancellation_at_checkpoints() {
        let table = small_table(256);
        let stop = StopSignal::new();
        let reports = RefCell::new(Vec::new());
        let status = |msg: &str| {
            let mut reports = reports.borrow_mut();
            reports.push(msg.to_string());
            if reports.len() == 3 {
                stop.stop();
            }
        };
        let limits = SearchLimits {
            check_interval: 4,
            max_giant_steps: None,
        };
        let result = table.search(&value_point(Balance::MAX - 1), &limits, &stop, &status);
        assert_eq!(result, Err(Error::SearchSuspended { attempted: 3072 }));
        assert_eq!(reports.into_inner(), vec!["0", "1024", "2048"]);
    }

    #[test]
    fn giant_step_cap() {
        let table = small_table(256);
        let limits = SearchLimits {
            check_interval: SEARCH_CHECK_INTERVAL,
            max_giant_steps: Some(2),
        };
        let found = table
            .search(&value_point(600), &limits, &StopSignal::new(), &quiet)
            .unwrap();
        assert_eq!(found.giant_steps, 2);
        assert_eq!(
            table.search(&value_point(800), &limits, &StopSignal::new(), &quiet),
            Err(Error::SearchExhausted { giant_steps: 2 })
        );
    }
}
