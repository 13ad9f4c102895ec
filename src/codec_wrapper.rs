use codec::{Decode, Encode, Error as CodecError, Input, MaxEncodedLen, Output};
use zeroize::Zeroize;

use core::ops::{Deref, DerefMut};

use crate::group::{
    compress, decompress, scalar_from_bytes, scalar_to_bytes, ProjectivePoint, Scalar, POINT_SIZE,
    SCALAR_SIZE,
};

/// Wrapper for `ProjectivePoint` to implement SCALE encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrappedPoint(ProjectivePoint);

impl Default for WrappedPoint {
    fn default() -> Self {
        Self(ProjectivePoint::IDENTITY)
    }
}

impl Encode for WrappedPoint {
    #[inline]
    fn size_hint(&self) -> usize {
        POINT_SIZE
    }

    /// Encodes itself as a compressed point.
    fn encode_to<W: Output + ?Sized>(&self, dest: &mut W) {
        compress(&self.0).encode_to(dest);
    }
}

impl Decode for WrappedPoint {
    /// Decodes a point from its compressed form.
    fn decode<I: Input>(input: &mut I) -> Result<Self, CodecError> {
        let bytes = <[u8; POINT_SIZE]>::decode(input)?;
        let inner =
            decompress(&bytes).map_err(|_| CodecError::from("Invalid compressed point."))?;
        Ok(Self(inner))
    }
}

impl MaxEncodedLen for WrappedPoint {
    fn max_encoded_len() -> usize {
        POINT_SIZE
    }
}

impl From<WrappedPoint> for ProjectivePoint {
    fn from(data: WrappedPoint) -> Self {
        data.0
    }
}

impl Deref for WrappedPoint {
    type Target = ProjectivePoint;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for WrappedPoint {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<ProjectivePoint> for WrappedPoint {
    fn from(data: ProjectivePoint) -> Self {
        Self(data)
    }
}

/// Wrapper for `Scalar` to implement SCALE encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroize)]
pub struct WrappedScalar(Scalar);

impl Encode for WrappedScalar {
    #[inline]
    fn size_hint(&self) -> usize {
        SCALAR_SIZE
    }

    /// Encodes itself as 32 big-endian bytes.
    fn encode_to<W: Output + ?Sized>(&self, dest: &mut W) {
        scalar_to_bytes(&self.0).encode_to(dest);
    }
}

impl Decode for WrappedScalar {
    /// Decodes a `Scalar` from 32 big-endian bytes.
    fn decode<I: Input>(input: &mut I) -> Result<Self, CodecError> {
        let bytes = <[u8; SCALAR_SIZE]>::decode(input)?;
        let inner = scalar_from_bytes(&bytes).map_err(|_| CodecError::from("Invalid scalar."))?;
        Ok(Self(inner))
    }
}

impl From<WrappedScalar> for Scalar {
    fn from(data: WrappedScalar) -> Self {
        data.0
    }
}

impl Deref for WrappedScalar {
    type Target = Scalar;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Scalar> for WrappedScalar {
    fn from(data: Scalar) -> Self {
        Self(data)
    }
}

#[cfg(test)]
mod tests {
    extern crate wasm_bindgen_test;
    use super::*;
    use crate::group::{random_scalar, value_point};
    use rand::{rngs::StdRng, SeedableRng};
    use wasm_bindgen_test::*;

    #[test]
    #[wasm_bindgen_test]
    fn point_codec() {
        let point: WrappedPoint = value_point(256).into();
        let encoded = point.encode();
        assert_eq!(
            hex::encode(&encoded),
            "038282263212c609d9ea2a6e3e172de238d8c39cabd5ac1ca10646e23fd5f51508"
        );
        assert_eq!(WrappedPoint::decode(&mut encoded.as_slice()).unwrap(), point);

        let mut bad = encoded.clone();
        bad[0] = 0x07;
        assert!(WrappedPoint::decode(&mut bad.as_slice()).is_err());
        assert!(WrappedPoint::decode(&mut &encoded[..20]).is_err());
    }

    #[test]
    #[wasm_bindgen_test]
    fn scalar_codec() {
        let mut rng = StdRng::from_seed([7u8; 32]);
        let scalar: WrappedScalar = random_scalar(&mut rng).into();
        let encoded = scalar.encode();
        assert_eq!(encoded.len(), SCALAR_SIZE);
        assert_eq!(WrappedScalar::decode(&mut encoded.as_slice()).unwrap(), scalar);

        assert!(WrappedScalar::decode(&mut [0xffu8; SCALAR_SIZE].as_slice()).is_err());
    }
}
