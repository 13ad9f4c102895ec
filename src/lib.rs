//! confidential_balances implements additively homomorphic Elgamal
//! encryption of account balances over secp256k1, and the lookup table
//! machinery needed to decrypt them again.
//!
//! Recovering a balance from `balance * G` is a discrete logarithm. The
//! [`BalanceDecryptor`] answers it with a baby-step giant-step search over
//! a sorted table of point fingerprints that is built once, in the
//! background, and shared by every caller.

use zeroize::{Zeroize, ZeroizeOnDrop};

use codec::{Decode, Encode};

pub use k256::Scalar;

#[macro_use]
pub(crate) mod macros;

pub mod errors;

pub mod codec_wrapper;
pub mod decryptor;
pub mod elgamal;
pub mod group;
pub mod testing;

pub use decryptor::{BalanceDecryptor, DecryptorConfig, StatusCallback, StopSignal};
pub use elgamal::{
    CipherText, CompressedCipherText, CompressedElgamalPublicKey, ElgamalPublicKey,
    ElgamalSecretKey,
};
pub use errors::{Error, Result};

/// The balance value to keep confidential.
///
/// Balances are encrypted in the exponent, so decryption is a search over
/// the balance space. With the default table a balance below 2^23 is found
/// with a single lookup, and every further 2^23 costs one giant step.
pub type Balance = u64;

// -------------------------------------------------------------------------------------
// -                                 New Type Def                                      -
// -------------------------------------------------------------------------------------

/// Holds ElGamal encryption keys.
#[derive(Clone, Encode, Decode, Debug)]
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ElgamalKeys {
    #[zeroize(skip)]
    pub public: ElgamalPublicKey,
    pub secret: ElgamalSecretKey,
}

/// New type for Elgamal ciphertext of account amounts/balances.
pub type EncryptedAmount = CipherText;
