// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The secp256k1 adapter and shared modular arithmetic helpers.

use crate::errors::{Error, Result};
use crate::parameters::{COORDINATE_BYTES, CRYPTOGRAPHIC_RETRY_MAX};
use generic_array::GenericArray;
use k256::elliptic_curve::group::ff::PrimeField;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::{bigint::Encoding, Curve};
use k256::{AffinePoint, EncodedPoint, Secp256k1};
use libpaillier::unknown_order::BigNumber;
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wrapper around [`k256::ProjectivePoint`] carrying this crate's
/// serialization and scalar-conversion conventions.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct CurvePoint(pub(crate) k256::ProjectivePoint);

impl CurvePoint {
    /// The base point G.
    pub(crate) const GENERATOR: Self = CurvePoint(k256::ProjectivePoint::GENERATOR);
    /// The identity point, used to initialize point aggregation.
    pub const IDENTITY: Self = CurvePoint(k256::ProjectivePoint::IDENTITY);

    /// Whether this is the point at infinity.
    pub fn is_identity(&self) -> bool {
        self.0 == k256::ProjectivePoint::IDENTITY
    }

    /// Multiply the point by a scalar given as a non-negative big integer.
    pub(crate) fn multiply_by_scalar(&self, scalar: &BigNumber) -> Result<Self> {
        Ok(Self(self.0 * bn_to_scalar(scalar)?))
    }

    /// The affine coordinates as fixed-width big-endian bytes.
    ///
    /// The identity point encodes as all-zero coordinates, matching the wire
    /// convention for zero-hole VSS commitments.
    pub fn to_affine_bytes(&self) -> ([u8; COORDINATE_BYTES], [u8; COORDINATE_BYTES]) {
        if self.is_identity() {
            return ([0u8; COORDINATE_BYTES], [0u8; COORDINATE_BYTES]);
        }
        let encoded = self.0.to_affine().to_encoded_point(false);
        let mut x = [0u8; COORDINATE_BYTES];
        let mut y = [0u8; COORDINATE_BYTES];
        // Unwrap is safe: a non-identity point always has both coordinates.
        x.copy_from_slice(encoded.x().unwrap());
        y.copy_from_slice(encoded.y().unwrap());
        (x, y)
    }

    /// Decode a point from fixed-width affine coordinates.
    pub fn from_affine_bytes(x: &[u8; COORDINATE_BYTES], y: &[u8; COORDINATE_BYTES]) -> Result<Self> {
        if x.iter().all(|b| *b == 0) && y.iter().all(|b| *b == 0) {
            return Ok(Self::IDENTITY);
        }
        let encoded = EncodedPoint::from_affine_coordinates(
            GenericArray::from_slice(x),
            GenericArray::from_slice(y),
            false,
        );
        let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
        affine
            .map(|p| Self(p.into()))
            .ok_or(Error::InternalInvariantFailed)
    }

    /// The SEC1 compressed encoding (33 bytes).
    pub(crate) fn to_compressed_bytes(&self) -> Vec<u8> {
        self.0
            .to_affine()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    /// Decode a point from its SEC1 compressed encoding.
    pub(crate) fn from_compressed_bytes(bytes: &[u8]) -> Result<Self> {
        let encoded =
            EncodedPoint::from_bytes(bytes).map_err(|_| Error::InternalInvariantFailed)?;
        let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
        affine
            .map(|p| Self(p.into()))
            .ok_or(Error::InternalInvariantFailed)
    }

    /// The affine x-coordinate reduced modulo the group order, i.e. the `r`
    /// of an ECDSA signature whose nonce point is `self`.
    pub(crate) fn x_mod_order(&self) -> BigNumber {
        let (x, _) = self.to_affine_bytes();
        BigNumber::from_slice(x) % k256_order()
    }
}

impl From<k256::ProjectivePoint> for CurvePoint {
    fn from(p: k256::ProjectivePoint) -> Self {
        Self(p)
    }
}

impl std::ops::Add for CurvePoint {
    type Output = CurvePoint;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Serialize for CurvePoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let afp = AffinePoint::from(self.0);
        afp.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CurvePoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let p = AffinePoint::deserialize(deserializer)?;
        Ok(Self(p.into()))
    }
}

/// The order q of the secp256k1 group.
pub(crate) fn k256_order() -> BigNumber {
    let order_bytes: [u8; 32] = Secp256k1::ORDER.to_be_bytes();
    BigNumber::from_slice(order_bytes)
}

/// Convert a big number to a curve scalar, reducing modulo q and handling
/// negative inputs.
pub(crate) fn bn_to_scalar(x: &BigNumber) -> Result<k256::Scalar> {
    let order = k256_order();

    let x_modded = x % &order;
    let bytes = x_modded.to_bytes();

    let mut slice = vec![0u8; 32 - bytes.len()];
    slice.extend_from_slice(&bytes);
    let mut ret: k256::Scalar = Option::from(k256::Scalar::from_repr(
        GenericArray::clone_from_slice(&slice),
    ))
    .ok_or(Error::InternalInvariantFailed)?;

    // Make sure to negate the scalar if the original input was negative
    if x < &BigNumber::zero() {
        ret = ret.negate();
    }

    Ok(ret)
}

/// Sample a number uniformly at random from the range [0, n).
pub(crate) fn random_positive_bn<R: RngCore + CryptoRng>(rng: &mut R, n: &BigNumber) -> BigNumber {
    BigNumber::from_rng(n, rng)
}

/// Sample a nonzero number uniformly at random from the range [1, n).
pub(crate) fn random_nonzero_bn<R: RngCore + CryptoRng>(
    rng: &mut R,
    n: &BigNumber,
) -> Result<BigNumber> {
    std::iter::repeat_with(|| BigNumber::from_rng(n, rng))
        .take(CRYPTOGRAPHIC_RETRY_MAX)
        .find(|result| result != &BigNumber::zero())
        .ok_or(Error::InternalInvariantFailed)
}

/// Generate a random `BigNumber` that is in the multiplicative group of
/// integers modulo `n`.
///
/// Note: `n` is typically the product of two primes. If the drawn element is
/// not coprime with `n` and is not `0 mod n`, then the caller has accidentally
/// stumbled upon the factorization of `n`! The chance of this happening is
/// basically 0 and we drop the element anyway.
pub(crate) fn random_bn_in_z_star<R: RngCore + CryptoRng>(
    rng: &mut R,
    n: &BigNumber,
) -> Result<BigNumber> {
    std::iter::repeat_with(|| BigNumber::from_rng(n, rng))
        .take(CRYPTOGRAPHIC_RETRY_MAX)
        .find(|result| result != &BigNumber::zero() && result.gcd(n) == BigNumber::one())
        .ok_or(Error::InternalInvariantFailed)
}

/// Derive a deterministic pseudorandom value in `[0, n)` from the
/// [`Transcript`].
///
/// To avoid sample bias the value is re-drawn until it lands below `n`;
/// both prover and verifier run the same loop and converge on the same
/// challenge.
pub(crate) fn positive_bn_random_from_transcript(
    transcript: &mut Transcript,
    n: &BigNumber,
) -> BigNumber {
    let len = n.to_bytes().len();
    let mut t = vec![0u8; len];
    loop {
        transcript.challenge_bytes(b"sampling randomness", t.as_mut_slice());
        let b = BigNumber::from_slice(t.as_slice());
        if &b < n {
            return b;
        }
    }
}

/// The Lagrange coefficient of evaluation point `target` at x = 0 over the
/// distinct evaluation points `indices`:
/// `lambda_target = prod_{k != target} x_k / (x_k - x_target) mod q`.
///
/// Used by signing (to weight key shares), by refresh (to check that the
/// refreshed share points still aggregate to the public key), and by
/// resharing (to reconstruct the secret at the new committee's indices).
pub(crate) fn lagrange_at_zero(indices: &[usize], target: usize) -> Result<BigNumber> {
    if !indices.contains(&target) {
        return Err(Error::InvalidParameters(format!(
            "evaluation point {target} is not part of the interpolation set"
        )));
    }
    let order = k256_order();
    let target_bn = BigNumber::from(target as u64);

    let mut numerator = BigNumber::one();
    let mut denominator = BigNumber::one();
    for &k in indices {
        if k == target {
            continue;
        }
        let k_bn = BigNumber::from(k as u64);
        numerator = numerator.modmul(&k_bn, &order);
        denominator = denominator.modmul(&k_bn.modsub(&target_bn, &order), &order);
    }

    let inverse = denominator
        .invert(&order)
        .ok_or(Error::InternalInvariantFailed)?;
    Ok(numerator.modmul(&inverse, &order))
}

/// The standard ECDSA verification equation, computed over the crate's own
/// curve adapter: accept iff the x-coordinate of `(m/s)G + (r/s)X` reduces to
/// `r` mod q.
pub(crate) fn ecdsa_verify_prehash(
    public_key: &CurvePoint,
    m: &BigNumber,
    r: &BigNumber,
    s: &BigNumber,
) -> Result<()> {
    let order = k256_order();
    let zero = BigNumber::zero();
    if r <= &zero || r >= &order || s <= &zero || s >= &order {
        return Err(Error::SignatureVerifyFailed);
    }
    let s_inv = s.invert(&order).ok_or(Error::SignatureVerifyFailed)?;
    let u1 = m.modmul(&s_inv, &order);
    let u2 = r.modmul(&s_inv, &order);
    let candidate =
        CurvePoint::GENERATOR.multiply_by_scalar(&u1)? + public_key.multiply_by_scalar(&u2)?;
    if candidate.is_identity() || candidate.x_mod_order() != *r {
        return Err(Error::SignatureVerifyFailed);
    }
    Ok(())
}

////////////////////////////
// Test Utility Functions //
////////////////////////////
#[cfg(test)]
use rand::{
    rngs::{OsRng, StdRng},
    Rng, SeedableRng,
};

/// Returns an rng to be used for testing. This will print the rng seed
/// to stderr so that if a test fails, the failing seed can be recovered
/// and used for debugging.
#[cfg(test)]
pub(crate) fn get_test_rng() -> StdRng {
    let mut seeder = OsRng;
    let seed = seeder.gen();
    eprintln!("seed: {seed:?}");
    StdRng::from_seed(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_bytes_round_trip() {
        let mut rng = get_test_rng();
        let order = k256_order();
        let x = random_positive_bn(&mut rng, &order);
        let point = CurvePoint::GENERATOR.multiply_by_scalar(&x).unwrap();
        let (px, py) = point.to_affine_bytes();
        assert_eq!(CurvePoint::from_affine_bytes(&px, &py).unwrap(), point);

        let (zx, zy) = CurvePoint::IDENTITY.to_affine_bytes();
        assert!(CurvePoint::from_affine_bytes(&zx, &zy)
            .unwrap()
            .is_identity());
    }

    #[test]
    fn compressed_bytes_round_trip() {
        let mut rng = get_test_rng();
        let order = k256_order();
        let x = random_positive_bn(&mut rng, &order);
        let point = CurvePoint::GENERATOR.multiply_by_scalar(&x).unwrap();
        let bytes = point.to_compressed_bytes();
        assert_eq!(bytes.len(), 33);
        assert_eq!(CurvePoint::from_compressed_bytes(&bytes).unwrap(), point);
    }

    #[test]
    fn bn_to_scalar_negates_negative_input() {
        let neg1 = BigNumber::zero() - BigNumber::one();
        let scalar = bn_to_scalar(&neg1).unwrap();
        assert_eq!(k256::Scalar::ZERO, scalar + k256::Scalar::ONE);
    }

    #[test]
    fn lagrange_reconstructs_constant_term() {
        // f(x) = 7 + 3x: f(1) = 10, f(2) = 13, f(3) = 16.
        let order = k256_order();
        let shares = [(1usize, 10u64), (2, 13), (3, 16)];
        for subset in [[1usize, 2], [1, 3], [2, 3]] {
            let mut secret = BigNumber::zero();
            for (index, value) in shares.iter().filter(|(i, _)| subset.contains(i)) {
                let lambda = lagrange_at_zero(&subset, *index).unwrap();
                secret = secret.modadd(&lambda.modmul(&BigNumber::from(*value), &order), &order);
            }
            assert_eq!(secret, BigNumber::from(7u64));
        }
    }

    #[test]
    fn lagrange_rejects_foreign_target() {
        assert!(lagrange_at_zero(&[1, 2, 3], 4).is_err());
    }
}
