// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Threshold signing.
//!
//! Signing runs over the parties named in the session parameters, all of
//! which must participate; when the key's threshold allows it, callers may
//! pass a reduced party list of at least `t + 1` members of the key's
//! committee. Each party's share is reweighted by its Lagrange coefficient at
//! zero so the reduced set still reconstructs the joint secret.
//!
//! Five rounds: nonce commitment, pairwise multiplicative-to-additive
//! conversion under Paillier, delta reconstruction, partial signatures, and
//! aggregation with a final ECDSA verification of the result.
//!
//! The first three rounds do not depend on the message, so they can be run
//! ahead of time: [`PresignParticipant`] stops after deriving the nonce point
//! and stores a [`PreSignature`]; [`OnlineSignParticipant`] later turns a
//! presignature and a digest into a signature in a single broadcast round.

mod participant;
mod presign;
mod record;
pub(crate) mod rounds;

use crate::errors::{Error, Result};
use crate::utils::bn_to_scalar;
use libpaillier::unknown_order::BigNumber;
use serde::{Deserialize, Serialize};

pub use participant::{SignInput, SignParticipant};
pub use presign::{
    OnlineSignInput, OnlineSignParticipant, PresignInput, PresignParticipant,
};
pub use record::PreSignature;

/// An ECDSA signature produced by a signing session.
///
/// `r` and `s` are kept exactly as the protocol produced them, with
/// `s` anywhere in [1, q); use [`to_ecdsa`](Self::to_ecdsa) for a low-S
/// normalized signature that strict verifiers accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    r: BigNumber,
    s: BigNumber,
    recovery_id: Option<u8>,
}

impl Signature {
    pub(crate) fn new(r: BigNumber, s: BigNumber, recovery_id: Option<u8>) -> Self {
        Self { r, s, recovery_id }
    }

    /// The r scalar as fixed-width big-endian bytes.
    pub fn r_bytes(&self) -> [u8; 32] {
        fixed_bytes(&self.r)
    }

    /// The s scalar as fixed-width big-endian bytes.
    pub fn s_bytes(&self) -> [u8; 32] {
        fixed_bytes(&self.s)
    }

    /// The recovery id, when one was derived: bit 0 is the parity of the
    /// nonce point's y-coordinate, bit 1 marks an x-coordinate at or above
    /// the group order.
    pub fn recovery_id(&self) -> Option<u8> {
        self.recovery_id
    }

    /// Convert to a [`k256::ecdsa::Signature`], normalizing s to its low
    /// form.
    pub fn to_ecdsa(&self) -> Result<k256::ecdsa::Signature> {
        let r = bn_to_scalar(&self.r)?;
        let s = bn_to_scalar(&self.s)?;
        let signature = k256::ecdsa::Signature::from_scalars(r.to_bytes(), s.to_bytes())
            .map_err(|_| Error::SignatureVerifyFailed)?;
        Ok(signature.normalize_s().unwrap_or(signature))
    }
}

fn fixed_bytes(value: &BigNumber) -> [u8; 32] {
    let raw = value.to_bytes();
    let mut bytes = [0u8; 32];
    bytes[32 - raw.len()..].copy_from_slice(&raw);
    bytes
}
