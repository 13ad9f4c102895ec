use thiserror::Error;

use crate::Balance;

/// Confidential balance error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The lookup table size is zero, not a multiple of 256 or above 2^24.
    #[error("Invalid lookup table size {size}: must be a non-zero multiple of 256, at most 2^24")]
    InvalidTableSize { size: usize },

    /// A lookup table needs at least one shard.
    #[error("Invalid lookup table shard count {count}")]
    InvalidShardCount { count: usize },

    /// Invalid checkpoint interval for the table builder.
    #[error("Invalid build check interval {interval}: must be a non-zero multiple of 256")]
    InvalidCheckInterval { interval: usize },

    /// A serialized cipher text must be exactly two compressed points.
    #[error("Invalid cipher text length {length}, expected 66 bytes")]
    InvalidCipherTextLength { length: usize },

    /// The bytes do not encode a point on the curve.
    #[error("The bytes do not encode a valid curve point")]
    InvalidPoint,

    /// The bytes do not encode a scalar below the group order.
    #[error("The bytes do not encode a valid secret key")]
    InvalidSecretKey,

    /// Encrypted value does not match the claimed value.
    #[error("Encrypted value does not match the claimed value")]
    CipherTextDecryptionError,

    /// Error while converting to or from the binary format.
    #[error("Error during the serialization to byte array.")]
    SerializationError,

    /// The lookup table construction was cancelled or superseded.
    #[error("Lookup table construction was stopped")]
    ConstructionAborted,

    /// The balance search was cancelled before the balance was found.
    #[error("Scanning suspended after trying balances up to {attempted}")]
    SearchSuspended { attempted: Balance },

    /// The balance search hit the configured giant step limit.
    #[error("Balance not found after {giant_steps} giant steps")]
    SearchExhausted { giant_steps: u64 },

    /// The background table builder could not be started.
    #[error("Unable to start the lookup table builder")]
    BuilderSpawnError,

    /// The table builder stopped without publishing a table or an error.
    #[error("The lookup table builder stopped unexpectedly")]
    BuilderFailed,
}

impl From<codec::Error> for Error {
    fn from(_: codec::Error) -> Self {
        Error::SerializationError
    }
}

impl Error {
    /// `true` for errors caused by a cancellation rather than a failure.
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            Error::ConstructionAborted | Error::SearchSuspended { .. }
        )
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
