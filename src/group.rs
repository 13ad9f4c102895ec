//! Group arithmetic over secp256k1.
//!
//! Points travel as 33-byte SEC1 compressed encodings. The group identity has
//! no SEC1 compressed form, so it is written as 33 zero bytes, following the
//! fixed-width `GroupEncoding` convention.

use k256::elliptic_curve::{
    group::{Curve, Group, GroupEncoding},
    PrimeField,
};
use rand_core::{CryptoRng, RngCore};

pub use k256::{AffinePoint, NonZeroScalar, ProjectivePoint, Scalar};

use crate::{
    errors::{Error, Result},
    Balance,
};

/// A serialized compressed point size.
pub const POINT_SIZE: usize = 33;

/// A serialized Scalar size.
pub const SCALAR_SIZE: usize = 32;

/// A compressed point: one parity byte followed by the big-endian x coordinate.
pub type CompressedPoint = [u8; POINT_SIZE];

/// The base point `G` that balances are encoded against.
#[inline]
pub fn generator() -> ProjectivePoint {
    ProjectivePoint::GENERATOR
}

#[inline]
pub fn identity() -> ProjectivePoint {
    ProjectivePoint::IDENTITY
}

/// Returns `value * G`.
#[inline]
pub fn value_point(value: Balance) -> ProjectivePoint {
    ProjectivePoint::GENERATOR * Scalar::from(value)
}

pub fn compress(point: &ProjectivePoint) -> CompressedPoint {
    compress_affine(&point.to_affine())
}

pub fn compress_affine(point: &AffinePoint) -> CompressedPoint {
    let repr = point.to_bytes();
    let mut bytes = [0u8; POINT_SIZE];
    bytes.copy_from_slice(&repr);
    bytes
}

/// Decodes a compressed point, rejecting anything that is not on the curve.
///
/// Only the `0x02`/`0x03` tags and the all-zero identity are accepted; other
/// 33-byte SEC1 forms such as compact points (`0x05`) are not.
pub fn decompress(bytes: &[u8]) -> Result<ProjectivePoint> {
    if bytes.len() != POINT_SIZE {
        return Err(Error::InvalidPoint);
    }
    match bytes[0] {
        0x02 | 0x03 => (),
        0x00 if bytes.iter().all(|b| *b == 0) => return Ok(identity()),
        _ => return Err(Error::InvalidPoint),
    }
    let mut repr = k256::CompressedPoint::default();
    repr.copy_from_slice(bytes);
    Option::<AffinePoint>::from(AffinePoint::from_bytes(&repr))
        .map(ProjectivePoint::from)
        .ok_or(Error::InvalidPoint)
}

/// Converts a batch of points to affine coordinates with a single inversion.
///
/// The identity has no inverse of its `z` coordinate, so identities are
/// written out directly and only the remaining points share the inversion.
///
/// # Panics
/// If `points` and `out` differ in length.
pub fn batch_normalize(points: &[ProjectivePoint], out: &mut [AffinePoint]) {
    assert_eq!(points.len(), out.len(), "batch length mismatch");
    let is_identity = |point: &ProjectivePoint| bool::from(point.is_identity());
    if !points.iter().any(is_identity) {
        <ProjectivePoint as Curve>::batch_normalize(points, out);
        return;
    }

    let finite: Vec<ProjectivePoint> = points
        .iter()
        .copied()
        .filter(|point| !is_identity(point))
        .collect();
    let mut normalized = vec![AffinePoint::IDENTITY; finite.len()];
    if !finite.is_empty() {
        <ProjectivePoint as Curve>::batch_normalize(&finite, &mut normalized);
    }

    let mut normalized = normalized.into_iter();
    for (point, slot) in points.iter().zip(out.iter_mut()) {
        *slot = if is_identity(point) {
            AffinePoint::IDENTITY
        } else {
            normalized.next().unwrap_or(AffinePoint::IDENTITY)
        };
    }
}

/// A uniformly random non-zero scalar.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    *NonZeroScalar::random(rng)
}

/// Reads a big-endian scalar, rejecting values at or above the group order.
pub fn scalar_from_bytes(bytes: &[u8; SCALAR_SIZE]) -> Result<Scalar> {
    Option::from(Scalar::from_repr((*bytes).into())).ok_or(Error::InvalidSecretKey)
}

pub fn scalar_to_bytes(scalar: &Scalar) -> [u8; SCALAR_SIZE] {
    let mut bytes = [0u8; SCALAR_SIZE];
    bytes.copy_from_slice(&scalar.to_bytes());
    bytes
}
