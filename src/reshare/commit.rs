// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The committed round-one payload of resharing.
//!
//! The layout extends the keygen commitment format with the old committee's
//! public key, and its sections are role-dependent: members of the new
//! committee contribute a Paillier modulus (256 bytes); members of the old
//! committee contribute the old public key (64 bytes) followed by the
//! `t' + 1` VSS points of their resharing polynomial. A party in both
//! committees contributes all three sections. Roles are public, so receivers
//! always know which sections to expect from a given sender.

use crate::errors::{Error, Result};
use crate::keygen::commit::{decode_points, encode_modulus};
use crate::paillier::EncryptionKey;
use crate::parameters::{COORDINATE_BYTES, PAILLIER_MODULUS_FIELD_BYTES};
use crate::utils::CurvePoint;
use libpaillier::unknown_order::BigNumber;

/// The data a resharing party commits to in round one.
#[derive(Debug, Clone)]
pub(crate) struct ReshareCommitData {
    /// Fresh Paillier modulus; present for new-committee members.
    pub(crate) paillier_n: Option<BigNumber>,
    /// The old committee's joint public key; present for old-committee
    /// members.
    pub(crate) x_public: Option<CurvePoint>,
    /// VSS points of the degree-t' resharing polynomial; present for
    /// old-committee members.
    pub(crate) vss_commitments: Option<Vec<CurvePoint>>,
}

impl ReshareCommitData {
    /// Serialize with the fixed-width layout.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        if let Some(n) = &self.paillier_n {
            bytes.extend_from_slice(&encode_modulus(n)?);
        }
        if let (Some(x_public), Some(vss_commitments)) =
            (&self.x_public, &self.vss_commitments)
        {
            let (x, y) = x_public.to_affine_bytes();
            bytes.extend_from_slice(&x);
            bytes.extend_from_slice(&y);
            for point in vss_commitments {
                let (x, y) = point.to_affine_bytes();
                bytes.extend_from_slice(&x);
                bytes.extend_from_slice(&y);
            }
        }
        Ok(bytes)
    }

    /// Parse the layout for a sender with the given roles.
    pub(crate) fn from_bytes(
        bytes: &[u8],
        sender_is_new: bool,
        sender_is_old: bool,
        new_threshold: usize,
    ) -> Result<Self> {
        let modulus_len = if sender_is_new {
            PAILLIER_MODULUS_FIELD_BYTES
        } else {
            0
        };
        let vss_len = if sender_is_old {
            (1 + new_threshold + 1) * 2 * COORDINATE_BYTES
        } else {
            0
        };
        if bytes.len() != modulus_len + vss_len {
            return Err(Error::Serialization);
        }

        let paillier_n = if sender_is_new {
            let n = BigNumber::from_slice(&bytes[..modulus_len]);
            if n == BigNumber::zero() {
                return Err(Error::Serialization);
            }
            Some(n)
        } else {
            None
        };

        let (x_public, vss_commitments) = if sender_is_old {
            let mut points = decode_points(&bytes[modulus_len..])?;
            let x_public = points.remove(0);
            if x_public.is_identity() {
                return Err(Error::Serialization);
            }
            (Some(x_public), Some(points))
        } else {
            (None, None)
        };

        Ok(Self {
            paillier_n,
            x_public,
            vss_commitments,
        })
    }

    /// The sender's Paillier public key, for new-committee senders.
    pub(crate) fn encryption_key(&self) -> Option<EncryptionKey> {
        self.paillier_n
            .as_ref()
            .map(|n| EncryptionKey::from_modulus(n.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::Polynomial;
    use crate::utils::{get_test_rng, k256_order, random_positive_bn};
    use rand::{CryptoRng, RngCore};

    fn sample_point<R: RngCore + CryptoRng>(rng: &mut R) -> CurvePoint {
        let x = random_positive_bn(rng, &k256_order());
        CurvePoint::GENERATOR.multiply_by_scalar(&x).unwrap()
    }

    #[test]
    fn both_roles_round_trip() {
        let mut rng = get_test_rng();
        let poly = Polynomial::new(&mut rng, 1, None);
        let data = ReshareCommitData {
            paillier_n: Some(BigNumber::from(11u64) << 2040),
            x_public: Some(sample_point(&mut rng)),
            vss_commitments: Some(poly.feldman_commitments().unwrap()),
        };
        let bytes = data.to_bytes().unwrap();
        let parsed = ReshareCommitData::from_bytes(&bytes, true, true, 1).unwrap();
        assert_eq!(parsed.paillier_n, data.paillier_n);
        assert_eq!(parsed.x_public, data.x_public);
        assert_eq!(parsed.vss_commitments, data.vss_commitments);
    }

    #[test]
    fn new_only_round_trip() {
        let data = ReshareCommitData {
            paillier_n: Some(BigNumber::from(13u64) << 2040),
            x_public: None,
            vss_commitments: None,
        };
        let bytes = data.to_bytes().unwrap();
        assert_eq!(bytes.len(), 256);
        let parsed = ReshareCommitData::from_bytes(&bytes, true, false, 3).unwrap();
        assert_eq!(parsed.paillier_n, data.paillier_n);
        assert!(parsed.x_public.is_none());
    }

    #[test]
    fn old_only_round_trip() {
        let mut rng = get_test_rng();
        let poly = Polynomial::new(&mut rng, 2, None);
        let data = ReshareCommitData {
            paillier_n: None,
            x_public: Some(sample_point(&mut rng)),
            vss_commitments: Some(poly.feldman_commitments().unwrap()),
        };
        let bytes = data.to_bytes().unwrap();
        let parsed = ReshareCommitData::from_bytes(&bytes, false, true, 2).unwrap();
        assert!(parsed.paillier_n.is_none());
        assert_eq!(parsed.x_public, data.x_public);
        assert_eq!(parsed.vss_commitments, data.vss_commitments);
    }

    #[test]
    fn role_mismatch_is_rejected() {
        let data = ReshareCommitData {
            paillier_n: Some(BigNumber::from(17u64) << 2040),
            x_public: None,
            vss_commitments: None,
        };
        let bytes = data.to_bytes().unwrap();
        assert!(ReshareCommitData::from_bytes(&bytes, true, true, 1).is_err());
        assert!(ReshareCommitData::from_bytes(&bytes, false, false, 1).is_err());
    }
}
