//! The `elgamal` module implements additively homomorphic
//! Elgamal encryption of balances over secp256k1.
//! Ciphertexts can be added, subtracted, scaled and shifted by a
//! public amount without knowing the secret key.

use crate::{
    codec_wrapper::{WrappedPoint, WrappedScalar},
    decryptor::{BalanceDecryptor, StatusCallback, StopSignal},
    errors::{Error, Result},
    group::{
        compress, decompress, generator, identity, random_scalar, scalar_from_bytes,
        scalar_to_bytes, value_point, ProjectivePoint, Scalar, POINT_SIZE, SCALAR_SIZE,
    },
    Balance,
};

use core::iter::Sum;
use core::ops::{AddAssign, Deref, Neg, SubAssign};
use rand_core::{CryptoRng, RngCore};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use codec::{Decode, Encode, Error as CodecError, Input, MaxEncodedLen};
use scale_info::{build::Fields, Path, Type, TypeInfo};

/// A serialized cipher text size.
pub const CIPHER_TEXT_SIZE: usize = POINT_SIZE * 2;

/// Encryption secret: the balance and the random blinding factor.
#[derive(Clone, PartialEq, Zeroize, ZeroizeOnDrop, Debug)]
pub struct CommitmentWitness {
    value: Balance,

    /// A random blinding factor.
    blinding: Scalar,
}

impl CommitmentWitness {
    pub fn new(value: Balance, blinding: Scalar) -> Self {
        CommitmentWitness { value, blinding }
    }

    pub fn blinding(&self) -> Scalar {
        self.blinding
    }

    pub fn value(&self) -> Balance {
        self.value
    }
}

/// Elgamal key pair:
/// secret_key := scalar
/// public_key := secret_key * G
///
/// Encryption:
/// plaintext := (balance, r)
/// cipher_text := (Left, Right)
/// Left := balance * G + r * public_key
/// Right := r * G
///
/// Decryption:
/// Given (secret_key, Left, Right) find balance such that:
/// balance * G = Left - secret_key * Right
///
/// A side may be missing: a cipher text holding only `Right` is an
/// increment that can be folded into a stored balance, and `Plus` on
/// such a value yields a `Left`-only one. Both sides absent is the
/// unset cipher text.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct CipherText {
    left: Option<WrappedPoint>,
    right: Option<WrappedPoint>,
}

impl CipherText {
    /// Wraps two already computed points.
    pub fn new(left: ProjectivePoint, right: ProjectivePoint) -> Self {
        Self {
            left: Some(left.into()),
            right: Some(right.into()),
        }
    }

    /// A cipher text that only carries the randomness side.
    pub fn increment(right: ProjectivePoint) -> Self {
        Self {
            left: None,
            right: Some(right.into()),
        }
    }

    /// Create a `CipherText` when the `value` isn't secret (asset minting).
    pub fn value(value: Balance) -> Self {
        Self::new(value_point(value), identity())
    }

    /// Create a `CipherText` with zero value and blinding factors.
    ///
    /// Useful for account initialization and as the base of a sum.
    pub fn zero() -> Self {
        Self::new(identity(), identity())
    }

    pub fn left(&self) -> Option<ProjectivePoint> {
        self.left.map(Into::into)
    }

    pub fn right(&self) -> Option<ProjectivePoint> {
        self.right.map(Into::into)
    }

    /// Both sides are present.
    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// Neither side is present.
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// `true` when both sides are the identity: a zero balance with zero randomness.
    pub fn is_zero(&self) -> bool {
        match (self.left, self.right) {
            (Some(left), Some(right)) => *left == identity() && *right == identity(),
            _ => false,
        }
    }

    /// Shifts the encrypted balance by a public amount.
    ///
    /// Only `Left` moves, so no fresh randomness is needed.
    ///
    /// # Panics
    /// If the cipher text has no `Left` side.
    pub fn plus(&self, value: Balance) -> Self {
        let left = self.left.expect("Plus needs the left side of the cipher text");
        Self {
            left: Some((*left + value_point(value)).into()),
            right: self.right,
        }
    }

    /// Checks whether this cipher text encrypts `candidate` under `secret_key`.
    ///
    /// # Panics
    /// If the cipher text is incomplete.
    pub fn try_match(&self, secret_key: &ElgamalSecretKey, candidate: Balance) -> bool {
        secret_key.balance_point(self) == value_point(candidate)
    }

    /// # Panics
    /// If the cipher text is incomplete.
    pub fn compress(&self) -> CompressedCipherText {
        match (self.left, self.right) {
            (Some(left), Some(right)) => CompressedCipherText::from_points(&left, &right),
            _ => panic!("Cannot serialize an incomplete cipher text"),
        }
    }

    /// Left and right compressed points, 66 bytes in total.
    ///
    /// # Panics
    /// If the cipher text is incomplete.
    pub fn to_bytes(&self) -> [u8; CIPHER_TEXT_SIZE] {
        self.compress().to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        CompressedCipherText::from_slice(bytes)?.decompress()
    }
}

// ------------------------------------------------------------------------
// Arithmetic operations on the ciphertext.
// ------------------------------------------------------------------------

fn combine(
    lhs: Option<WrappedPoint>,
    rhs: Option<WrappedPoint>,
    op: impl Fn(ProjectivePoint, ProjectivePoint) -> ProjectivePoint,
) -> Option<WrappedPoint> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => Some(op(*lhs, *rhs).into()),
        // A missing side on the right operand contributes nothing.
        (Some(lhs), None) => Some(lhs),
        (None, _) => None,
    }
}

/// Componentwise addition. Sides missing on `self` stay missing.
impl<'a, 'b> core::ops::Add<&'b CipherText> for &'a CipherText {
    type Output = CipherText;

    fn add(self, other: &'b CipherText) -> CipherText {
        CipherText {
            left: combine(self.left, other.left, |a, b| a + b),
            right: combine(self.right, other.right, |a, b| a + b),
        }
    }
}
define_add_variants!(LHS = CipherText, RHS = CipherText, Output = CipherText);

impl<'b> AddAssign<&'b CipherText> for CipherText {
    fn add_assign(&mut self, rhs: &CipherText) {
        *self = (self as &CipherText) + rhs;
    }
}
define_add_assign_variants!(LHS = CipherText, RHS = CipherText);

impl<'a, 'b> core::ops::Sub<&'b CipherText> for &'a CipherText {
    type Output = CipherText;

    fn sub(self, other: &'b CipherText) -> CipherText {
        CipherText {
            left: combine(self.left, other.left, |a, b| a - b),
            right: combine(self.right, other.right, |a, b| a - b),
        }
    }
}
define_sub_variants!(LHS = CipherText, RHS = CipherText, Output = CipherText);

impl<'b> SubAssign<&'b CipherText> for CipherText {
    fn sub_assign(&mut self, rhs: &CipherText) {
        *self = (self as &CipherText) - rhs;
    }
}
define_sub_assign_variants!(LHS = CipherText, RHS = CipherText);

impl<'a, 'b> core::ops::Mul<&'b Scalar> for &'a CipherText {
    type Output = CipherText;

    fn mul(self, scalar: &'b Scalar) -> CipherText {
        CipherText {
            left: self.left.map(|left| (*left * scalar).into()),
            right: self.right.map(|right| (*right * scalar).into()),
        }
    }
}
define_mul_variants!(LHS = CipherText, RHS = Scalar, Output = CipherText);

impl Neg for &CipherText {
    type Output = CipherText;

    fn neg(self) -> CipherText {
        CipherText {
            left: self.left.map(|left| (-*left).into()),
            right: self.right.map(|right| (-*right).into()),
        }
    }
}

impl Neg for CipherText {
    type Output = CipherText;

    fn neg(self) -> CipherText {
        -&self
    }
}

impl Sum for CipherText {
    fn sum<I: Iterator<Item = CipherText>>(iter: I) -> Self {
        iter.fold(CipherText::zero(), |acc, cipher| acc + cipher)
    }
}

impl<'a> Sum<&'a CipherText> for CipherText {
    fn sum<I: Iterator<Item = &'a CipherText>>(iter: I) -> Self {
        iter.fold(CipherText::zero(), |acc, cipher| acc + cipher)
    }
}

/// Compressed `CipherText`: `Left` followed by `Right`.
#[derive(Copy, Clone, Encode, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompressedCipherText(
    #[cfg_attr(feature = "serde", serde(with = "cipher_text_bytes"))] [u8; CIPHER_TEXT_SIZE],
);

impl TypeInfo for CompressedCipherText {
    type Identity = Self;
    fn type_info() -> Type {
        Type::builder()
            .path(Path::new("CompressedCipherText", module_path!()))
            .composite(
                Fields::unnamed()
                    .field(|f| f.ty::<[u8; CIPHER_TEXT_SIZE]>().type_name("[u8; 66]")),
            )
    }
}

impl MaxEncodedLen for CompressedCipherText {
    fn max_encoded_len() -> usize {
        CIPHER_TEXT_SIZE
    }
}

impl Decode for CompressedCipherText {
    /// Decodes and validates both compressed points.
    fn decode<I: Input>(input: &mut I) -> Result<Self, CodecError> {
        let (left, right) = <(WrappedPoint, WrappedPoint)>::decode(input)?;
        Ok(Self::from_points(&left, &right))
    }
}

impl From<CipherText> for CompressedCipherText {
    fn from(other: CipherText) -> Self {
        other.compress()
    }
}

impl CompressedCipherText {
    pub fn from_points(left: &ProjectivePoint, right: &ProjectivePoint) -> Self {
        let mut bytes = [0u8; CIPHER_TEXT_SIZE];
        bytes[..POINT_SIZE].copy_from_slice(&compress(left));
        bytes[POINT_SIZE..].copy_from_slice(&compress(right));
        CompressedCipherText(bytes)
    }

    /// Only checks the length; use `decompress` to validate the points.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; CIPHER_TEXT_SIZE] =
            bytes
                .try_into()
                .map_err(|_| Error::InvalidCipherTextLength {
                    length: bytes.len(),
                })?;
        Ok(Self(bytes))
    }

    pub fn to_bytes(&self) -> [u8; CIPHER_TEXT_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; CIPHER_TEXT_SIZE] {
        &self.0
    }

    pub fn decompress(&self) -> Result<CipherText> {
        let left = decompress(&self.0[..POINT_SIZE])?;
        let right = decompress(&self.0[POINT_SIZE..])?;
        Ok(CipherText::new(left, right))
    }
}

#[cfg(feature = "serde")]
mod cipher_text_bytes {
    use super::CIPHER_TEXT_SIZE;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &[u8; CIPHER_TEXT_SIZE],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; CIPHER_TEXT_SIZE], D::Error> {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| D::Error::invalid_length(bytes.len(), &"66 bytes"))
    }
}

// ------------------------------------------------------------------------
// Elgamal Encryption.
// ------------------------------------------------------------------------

/// An Elgamal Secret Key is a random scalar.
#[derive(Clone, Encode, Decode, Zeroize, ZeroizeOnDrop, Debug)]
pub struct ElgamalSecretKey {
    pub secret: WrappedScalar,
}

impl Deref for ElgamalSecretKey {
    type Target = Scalar;
    fn deref(&self) -> &Self::Target {
        &self.secret
    }
}

impl ElgamalSecretKey {
    pub fn new(secret: Scalar) -> Self {
        ElgamalSecretKey {
            secret: secret.into(),
        }
    }

    /// Generates a new random secret key.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::new(random_scalar(rng))
    }

    /// Reads a 32-byte big-endian secret key.
    pub fn from_bytes(bytes: &[u8; SCALAR_SIZE]) -> Result<Self> {
        scalar_from_bytes(bytes).map(Self::new)
    }

    pub fn to_bytes(&self) -> [u8; SCALAR_SIZE] {
        scalar_to_bytes(&self.secret)
    }

    pub fn secret(&self) -> Scalar {
        *self.secret
    }

    pub fn get_public_key(&self) -> ElgamalPublicKey {
        ElgamalPublicKey {
            pub_key: (generator() * self.secret()).into(),
        }
    }

    /// Returns `Left - secret_key * Right`, which equals `balance * G`.
    ///
    /// # Panics
    /// If the cipher text is incomplete.
    pub fn balance_point(&self, cipher_text: &CipherText) -> ProjectivePoint {
        match (cipher_text.left, cipher_text.right) {
            (Some(left), Some(right)) => *left - *right * self.secret(),
            _ => panic!("Cannot decrypt an incomplete cipher text"),
        }
    }

    /// Verifies that a cipher text encrypts the given `value`.
    /// This follows the same logic as decrypt(), except that the `value`
    /// is provided and we don't need to search for it.
    pub fn verify(&self, cipher_text: &CipherText, value: Balance) -> Result<()> {
        if cipher_text.try_match(self, value) {
            return Ok(());
        }

        Err(Error::CipherTextDecryptionError)
    }

    /// Decrypt a cipher text that is known to encrypt a Balance.
    ///
    /// `hint` is the last balance seen for this cipher text, it is checked
    /// first and the lookup table is only used if it doesn't match.
    pub fn decrypt(
        &self,
        decryptor: &BalanceDecryptor,
        cipher_text: &CipherText,
        hint: Balance,
        stop: &StopSignal,
        status: &StatusCallback,
    ) -> Result<Balance> {
        decryptor.decrypt_balance(cipher_text, self, hint, stop, status)
    }
}

/// Compressed ElgamalPublicKey.
#[derive(Copy, Clone, Encode, MaxEncodedLen, TypeInfo, PartialEq, Eq, Debug)]
pub struct CompressedElgamalPublicKey([u8; POINT_SIZE]);

impl CompressedElgamalPublicKey {
    pub fn from_public_key(key: &ElgamalPublicKey) -> Self {
        Self(compress(&key.pub_key))
    }

    pub fn into_public_key(&self) -> Result<ElgamalPublicKey> {
        decompress(&self.0).map(|pub_key| ElgamalPublicKey {
            pub_key: pub_key.into(),
        })
    }

    pub fn as_bytes(&self) -> &[u8; POINT_SIZE] {
        &self.0
    }
}

impl Decode for CompressedElgamalPublicKey {
    /// Decodes a `CompressedElgamalPublicKey`, rejecting invalid points.
    fn decode<I: Input>(input: &mut I) -> Result<Self, CodecError> {
        let key = WrappedPoint::decode(input)?;
        Ok(Self(compress(&key)))
    }
}

impl From<&ElgamalPublicKey> for CompressedElgamalPublicKey {
    fn from(other: &ElgamalPublicKey) -> Self {
        Self::from_public_key(other)
    }
}

impl From<ElgamalPublicKey> for CompressedElgamalPublicKey {
    fn from(other: ElgamalPublicKey) -> Self {
        Self::from_public_key(&other)
    }
}

/// The Elgamal Public Key is the secret key multiplied by the generator (G).
#[derive(Copy, Clone, Encode, Decode, Default, PartialEq, Eq, Debug)]
pub struct ElgamalPublicKey {
    pub pub_key: WrappedPoint,
}

impl ElgamalPublicKey {
    fn encrypt_helper(&self, value: Balance, blinding: &Scalar) -> CipherText {
        let left = value_point(value) + *self.pub_key * blinding;
        let right = generator() * blinding;
        CipherText::new(left, right)
    }

    pub fn encrypt(&self, witness: &CommitmentWitness) -> CipherText {
        self.encrypt_helper(witness.value, &witness.blinding)
    }

    /// Encrypts `value` with a caller supplied blinding factor.
    pub fn encrypt_with_blinding(&self, value: Balance, blinding: &Scalar) -> CipherText {
        self.encrypt_helper(value, blinding)
    }

    /// Generates a blinding factor, and encrypts the value.
    pub fn encrypt_value<R: RngCore + CryptoRng>(
        &self,
        value: Balance,
        rng: &mut R,
    ) -> (CommitmentWitness, CipherText) {
        let blinding = random_scalar(rng);
        let cipher = self.encrypt_helper(value, &blinding);
        (CommitmentWitness { value, blinding }, cipher)
    }
}

// ------------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------------
