// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The committed round-one payload of keygen (shared by refresh) and its
//! fixed-width wire codec.
//!
//! Layout: the Paillier modulus N as 256 big-endian bytes (zero-padded on the
//! left), followed by the Feldman VSS points in coefficient order, each point
//! as 32 x-bytes then 32 y-bytes. Byte-exactness matters: the round-one hash
//! commitment is computed over exactly these bytes.

use crate::commitment::CommitmentSalt;
use crate::errors::{Error, Result};
use crate::paillier::EncryptionKey;
use crate::parameters::{
    COMMITMENT_BYTES, COORDINATE_BYTES, PAILLIER_MODULUS_FIELD_BYTES,
};
use crate::utils::CurvePoint;
use libpaillier::unknown_order::BigNumber;

/// The data committed to in round one: the sender's Paillier modulus and its
/// Feldman VSS commitment.
#[derive(Debug, Clone)]
pub(crate) struct CommitData {
    pub(crate) paillier_n: BigNumber,
    pub(crate) vss_commitments: Vec<CurvePoint>,
}

impl CommitData {
    /// Serialize with the fixed-width layout.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(
            PAILLIER_MODULUS_FIELD_BYTES + self.vss_commitments.len() * 2 * COORDINATE_BYTES,
        );
        bytes.extend_from_slice(&encode_modulus(&self.paillier_n)?);
        for point in &self.vss_commitments {
            let (x, y) = point.to_affine_bytes();
            bytes.extend_from_slice(&x);
            bytes.extend_from_slice(&y);
        }
        Ok(bytes)
    }

    /// Parse the fixed-width layout; the VSS section must hold exactly
    /// `threshold + 1` points.
    pub(crate) fn from_bytes(bytes: &[u8], threshold: usize) -> Result<Self> {
        let expected =
            PAILLIER_MODULUS_FIELD_BYTES + (threshold + 1) * 2 * COORDINATE_BYTES;
        if bytes.len() != expected {
            return Err(Error::Serialization);
        }
        let paillier_n = BigNumber::from_slice(&bytes[..PAILLIER_MODULUS_FIELD_BYTES]);
        if paillier_n == BigNumber::zero() {
            return Err(Error::Serialization);
        }
        let vss_commitments = decode_points(&bytes[PAILLIER_MODULUS_FIELD_BYTES..])?;
        Ok(Self {
            paillier_n,
            vss_commitments,
        })
    }

    /// The peer's Paillier public key carried by this payload.
    pub(crate) fn encryption_key(&self) -> EncryptionKey {
        EncryptionKey::from_modulus(self.paillier_n.clone())
    }
}

/// A round-two opening: the 32-byte salt followed by the committed data.
pub(crate) fn decommit_payload(salt: &CommitmentSalt, data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(COMMITMENT_BYTES + data.len());
    payload.extend_from_slice(salt.as_bytes());
    payload.extend_from_slice(data);
    payload
}

/// Split a round-two opening into salt and committed data.
pub(crate) fn split_decommit_payload(payload: &[u8]) -> Result<(CommitmentSalt, &[u8])> {
    if payload.len() < COMMITMENT_BYTES {
        return Err(Error::Serialization);
    }
    let salt = CommitmentSalt::from_bytes(&payload[..COMMITMENT_BYTES])?;
    Ok((salt, &payload[COMMITMENT_BYTES..]))
}

/// Encode a Paillier modulus into its zero-padded 256-byte field.
pub(crate) fn encode_modulus(n: &BigNumber) -> Result<[u8; PAILLIER_MODULUS_FIELD_BYTES]> {
    let raw = n.to_bytes();
    if raw.len() > PAILLIER_MODULUS_FIELD_BYTES {
        return Err(Error::Serialization);
    }
    let mut field = [0u8; PAILLIER_MODULUS_FIELD_BYTES];
    field[PAILLIER_MODULUS_FIELD_BYTES - raw.len()..].copy_from_slice(&raw);
    Ok(field)
}

/// Decode a run of fixed-width (x, y) points.
pub(crate) fn decode_points(bytes: &[u8]) -> Result<Vec<CurvePoint>> {
    if bytes.len() % (2 * COORDINATE_BYTES) != 0 {
        return Err(Error::Serialization);
    }
    bytes
        .chunks_exact(2 * COORDINATE_BYTES)
        .map(|chunk| {
            let x: [u8; COORDINATE_BYTES] =
                chunk[..COORDINATE_BYTES].try_into().expect("chunk size");
            let y: [u8; COORDINATE_BYTES] =
                chunk[COORDINATE_BYTES..].try_into().expect("chunk size");
            CurvePoint::from_affine_bytes(&x, &y).map_err(|_| Error::Serialization)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::Polynomial;
    use crate::utils::get_test_rng;

    #[test]
    fn fixed_width_round_trip() {
        let mut rng = get_test_rng();
        let threshold = 2;
        let poly = Polynomial::new(&mut rng, threshold, None);
        let data = CommitData {
            paillier_n: BigNumber::from(7u64) << 2040,
            vss_commitments: poly.feldman_commitments().unwrap(),
        };
        let bytes = data.to_bytes().unwrap();
        assert_eq!(bytes.len(), 256 + (threshold + 1) * 64);

        let parsed = CommitData::from_bytes(&bytes, threshold).unwrap();
        assert_eq!(parsed.paillier_n, data.paillier_n);
        assert_eq!(parsed.vss_commitments, data.vss_commitments);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut rng = get_test_rng();
        let poly = Polynomial::new(&mut rng, 1, None);
        let data = CommitData {
            paillier_n: BigNumber::from(3u64) << 2040,
            vss_commitments: poly.feldman_commitments().unwrap(),
        };
        let bytes = data.to_bytes().unwrap();
        assert!(CommitData::from_bytes(&bytes[..bytes.len() - 1], 1).is_err());
        assert!(CommitData::from_bytes(&bytes, 2).is_err());
    }

    #[test]
    fn decommit_payload_round_trip() {
        let mut rng = get_test_rng();
        let (_, salt) = crate::commitment::commit(&mut rng, b"data");
        let payload = decommit_payload(&salt, b"data");
        let (parsed_salt, parsed_data) = split_decommit_payload(&payload).unwrap();
        assert_eq!(parsed_salt, salt);
        assert_eq!(parsed_data, b"data");
    }
}
