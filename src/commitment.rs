// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! SHA-256 hash commitments with a 32-byte salt.
//!
//! `C = SHA256(salt || data)`; the decommitment is the salt itself. The
//! commitment is broadcast in round one of keygen, refresh, and reshare, and
//! the opening (salt followed by the committed data) in round two.

use crate::errors::{Error, Result};
use crate::parameters::COMMITMENT_BYTES;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A hash commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Commitment([u8; COMMITMENT_BYTES]);

impl Commitment {
    /// The wire encoding: the raw 32 hash bytes.
    pub(crate) fn as_bytes(&self) -> &[u8; COMMITMENT_BYTES] {
        &self.0
    }

    /// Parse a commitment from its 32-byte wire encoding.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; COMMITMENT_BYTES] =
            bytes.try_into().map_err(|_| Error::Serialization)?;
        Ok(Self(bytes))
    }
}

/// The salt that opens a commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CommitmentSalt([u8; COMMITMENT_BYTES]);

impl CommitmentSalt {
    pub(crate) fn as_bytes(&self) -> &[u8; COMMITMENT_BYTES] {
        &self.0
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; COMMITMENT_BYTES] =
            bytes.try_into().map_err(|_| Error::Serialization)?;
        Ok(Self(bytes))
    }
}

/// Commit to `data` under a fresh random salt.
pub(crate) fn commit<R: RngCore + CryptoRng>(
    rng: &mut R,
    data: &[u8],
) -> (Commitment, CommitmentSalt) {
    let mut salt = [0u8; COMMITMENT_BYTES];
    rng.fill_bytes(&mut salt);
    (hash(&salt, data), CommitmentSalt(salt))
}

/// Check that `(salt, data)` opens `commitment`.
pub(crate) fn verify(commitment: &Commitment, salt: &CommitmentSalt, data: &[u8]) -> bool {
    hash(&salt.0, data) == *commitment
}

fn hash(salt: &[u8; COMMITMENT_BYTES], data: &[u8]) -> Commitment {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(data);
    Commitment(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::get_test_rng;

    #[test]
    fn commitment_opens_with_its_salt() {
        let mut rng = get_test_rng();
        let (commitment, salt) = commit(&mut rng, b"some committed data");
        assert!(verify(&commitment, &salt, b"some committed data"));
    }

    #[test]
    fn tampered_data_is_rejected() {
        let mut rng = get_test_rng();
        let (commitment, salt) = commit(&mut rng, b"some committed data");
        assert!(!verify(&commitment, &salt, b"some committed dat4"));
    }

    #[test]
    fn wrong_salt_is_rejected() {
        let mut rng = get_test_rng();
        let (commitment, _) = commit(&mut rng, b"some committed data");
        let (_, other_salt) = commit(&mut rng, b"some committed data");
        assert!(!verify(&commitment, &other_salt, b"some committed data"));
    }

    #[test]
    fn wire_round_trip() {
        let mut rng = get_test_rng();
        let (commitment, salt) = commit(&mut rng, b"bytes");
        assert_eq!(
            Commitment::from_bytes(commitment.as_bytes()).unwrap(),
            commitment
        );
        assert_eq!(CommitmentSalt::from_bytes(salt.as_bytes()).unwrap(), salt);
        assert!(Commitment::from_bytes(&[0u8; 31]).is_err());
    }
}
