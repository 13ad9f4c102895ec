//! Balance decryption backed by a shared, lazily built lookup table.
//!
//! A `BalanceDecryptor` publishes its table through an atomically swapped
//! snapshot, a `Generation`. Generations are never modified after they are
//! published except for their one-shot readiness latch and invalidation
//! flag. Growing the table or recovering from an aborted build installs a
//! new generation and invalidates the previous one; the caller that wins the
//! swap is the one that starts the builder thread.
//!
//! ```text
//!   Empty --decrypt/set size--> Building --built--> Ready
//!                                  |  ^                |
//!        aborted, failed or larger |  | larger size    |
//!                  size requested  v  |                |
//!                               Invalidated <----------+
//! ```

use arc_swap::ArcSwap;
use log::{debug, info, warn};

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

use crate::{
    elgamal::{CipherText, ElgamalSecretKey},
    errors::{Error, Result},
    group::ProjectivePoint,
    Balance,
};

pub mod config;
pub mod search;
pub mod signal;
pub mod table;

pub use config::DecryptorConfig;
pub use search::{SearchLimits, SearchOutcome};
pub use signal::{silent, StatusCallback, StopSignal};
pub use table::{LookupTable, PreComputeTable, TableBuilder};

use signal::Readiness;
use table::validate_table_size;

/// One published state of the decryptor.
struct Generation {
    /// Entries per shard, zero before any table was requested.
    table_size: usize,
    ready: Readiness<Arc<LookupTable>>,
    /// Fires when the generation is superseded, stops its builder.
    abort: StopSignal,
    invalidated: AtomicBool,
}

impl Generation {
    fn empty() -> Self {
        Self::building(0)
    }

    fn building(table_size: usize) -> Self {
        Self {
            table_size,
            ready: Readiness::new(),
            abort: StopSignal::new(),
            invalidated: AtomicBool::new(false),
        }
    }

    fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::Acquire)
    }

    /// Whether waiting on this generation yields a table of at least `size`
    /// entries. `None` accepts any size.
    fn serves(&self, size: Option<usize>) -> bool {
        self.table_size != 0
            && !self.is_invalidated()
            && size.map_or(true, |size| self.table_size >= size)
    }

    /// Marks the generation unusable, stops its builder and releases waiters.
    ///
    /// Returns `false` if it was already invalidated.
    fn invalidate(&self, reason: Error) -> bool {
        if self.invalidated.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.abort.stop();
        self.ready.resolve(Err(reason));
        true
    }

    fn wait(&self, stop: &StopSignal, poll: std::time::Duration) -> Result<Arc<LookupTable>> {
        let table = self.ready.wait(stop, poll)?;
        // A superseded table is not handed out, even if it finished building.
        if self.is_invalidated() {
            return Err(Error::ConstructionAborted);
        }
        Ok(table)
    }
}

/// Held by the builder thread. If the thread unwinds before the generation
/// is resolved, the generation is invalidated so that waiters are released.
struct BuildGuard(Arc<Generation>);

impl Drop for BuildGuard {
    fn drop(&mut self) {
        if self.0.ready.peek().is_none() && self.0.invalidate(Error::BuilderFailed) {
            warn!(
                "Balance lookup table builder for {} entries stopped unexpectedly",
                self.0.table_size
            );
        }
    }
}

/// Recovers balances from cipher texts.
///
/// Cheap to share between threads: wrap it in an `Arc` and hand it to every
/// component that needs to decrypt balances.
pub struct BalanceDecryptor {
    config: DecryptorConfig,
    state: ArcSwap<Generation>,
}

impl Default for BalanceDecryptor {
    fn default() -> Self {
        Self::with_valid_config(DecryptorConfig::default())
    }
}

impl BalanceDecryptor {
    pub fn new(config: DecryptorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: DecryptorConfig) -> Self {
        Self {
            config,
            state: ArcSwap::from_pointee(Generation::empty()),
        }
    }

    pub fn config(&self) -> &DecryptorConfig {
        &self.config
    }

    /// Size of the published table, zero while there is none.
    ///
    /// Does not block; a table that is still being built is reported.
    pub fn table_size(&self) -> usize {
        let generation = self.state.load();
        if generation.is_invalidated() {
            return 0;
        }
        generation.table_size
    }

    /// The published table if it is ready.
    pub fn current_table(&self) -> Option<Arc<LookupTable>> {
        let generation = self.state.load();
        if generation.is_invalidated() {
            return None;
        }
        generation.ready.peek().and_then(Result::ok)
    }

    /// Checks a guessed balance without touching the lookup table.
    pub fn try_decrypt_balance(
        &self,
        cipher_text: &CipherText,
        secret_key: &ElgamalSecretKey,
        candidate: Balance,
    ) -> bool {
        cipher_text.try_match(secret_key, candidate)
    }

    /// Decrypts a balance.
    ///
    /// `previous` is tried first; the lookup table is only consulted, and
    /// built if needed, when the balance has changed.
    pub fn decrypt_balance(
        &self,
        cipher_text: &CipherText,
        secret_key: &ElgamalSecretKey,
        previous: Balance,
        stop: &StopSignal,
        status: &StatusCallback,
    ) -> Result<Balance> {
        if self.try_decrypt_balance(cipher_text, secret_key, previous) {
            debug!("Balance unchanged since last decryption");
            return Ok(previous);
        }
        let target = secret_key.balance_point(cipher_text);
        self.decrypt_point(&target, stop, status)
    }

    /// Finds `balance` such that `balance * G == target`.
    pub fn decrypt_point(
        &self,
        target: &ProjectivePoint,
        stop: &StopSignal,
        status: &StatusCallback,
    ) -> Result<Balance> {
        let table = self.acquire_table(None, stop, status)?;
        table
            .search(target, &self.config.search_limits(), stop, &**status)
            .map(|outcome| outcome.balance)
    }

    /// Makes sure a table of at least `table_size` entries per shard is
    /// published and returns it.
    ///
    /// A smaller request is served by the current table. A larger one
    /// discards it and builds a new table from scratch.
    pub fn set_table_size(
        &self,
        table_size: usize,
        stop: &StopSignal,
        status: &StatusCallback,
    ) -> Result<Arc<LookupTable>> {
        validate_table_size(table_size)?;
        self.acquire_table(Some(table_size), stop, status)
    }

    fn acquire_table(
        &self,
        size: Option<usize>,
        stop: &StopSignal,
        status: &StatusCallback,
    ) -> Result<Arc<LookupTable>> {
        loop {
            let current = self.state.load_full();
            let generation = if current.serves(size) {
                current
            } else {
                let table_size = size.unwrap_or(self.config.default_table_size);
                match self.start_generation(&current, table_size, stop, status) {
                    Some(generation) => generation,
                    // Another caller installed a generation first.
                    None => continue,
                }
            };

            match generation.wait(stop, self.config.poll_interval) {
                // Superseded or aborted by someone else: retry on the new state.
                Err(Error::ConstructionAborted) if !stop.is_stopped() => {
                    debug!(
                        "Lookup table of {} entries was dropped, retrying",
                        generation.table_size
                    );
                    continue;
                }
                result => return result,
            }
        }
    }

    /// Installs a new generation in place of `current`.
    ///
    /// Returns `None` when the snapshot changed in the meantime.
    fn start_generation(
        &self,
        current: &Arc<Generation>,
        table_size: usize,
        stop: &StopSignal,
        status: &StatusCallback,
    ) -> Option<Arc<Generation>> {
        let next = Arc::new(Generation::building(table_size));
        let previous = self.state.compare_and_swap(current, Arc::clone(&next));
        if !Arc::ptr_eq(&*previous, current) {
            return None;
        }

        if current.table_size != 0 && current.invalidate(Error::ConstructionAborted) {
            debug!(
                "Lookup table of {} entries superseded by {} entries",
                current.table_size, table_size
            );
        }
        self.spawn_builder(&next, stop, status);
        Some(next)
    }

    fn spawn_builder(&self, generation: &Arc<Generation>, stop: &StopSignal, status: &StatusCallback) {
        let builder = TableBuilder::new(self.config.shard_count, generation.table_size)
            .and_then(|builder| builder.check_interval(self.config.build_check_interval));
        let builder = match builder {
            Ok(builder) => builder,
            Err(err) => {
                generation.invalidate(err);
                return;
            }
        };

        info!(
            "Building balance lookup table: {} shard(s) of {} entries",
            builder.shard_count(),
            builder.table_size()
        );

        // The build stops when the generation is superseded or when the
        // caller that requested it gives up.
        let build_stop = generation.abort.linked(stop);
        let status = Arc::clone(status);
        let task = Arc::clone(generation);
        let spawned = thread::Builder::new()
            .name("balance-table-builder".into())
            .spawn(move || {
                let _guard = BuildGuard(Arc::clone(&task));
                let started = Instant::now();
                match builder.build(&build_stop, &*status) {
                    Ok(table) => {
                        if task.ready.resolve(Ok(Arc::new(table))) {
                            info!(
                                "Balance lookup table of {} entries ready in {:?}",
                                task.table_size,
                                started.elapsed()
                            );
                        }
                    }
                    Err(err) => {
                        warn!(
                            "Balance lookup table of {} entries not built: {err}",
                            task.table_size
                        );
                        task.invalidate(err);
                    }
                }
            });

        if let Err(err) = spawned {
            warn!("Unable to spawn the balance lookup table builder: {err}");
            generation.invalidate(Error::BuilderSpawnError);
        }
    }
}
