// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The key material a party persists between sessions.

use crate::errors::{Error, Result};
use crate::paillier::{DecryptionKey, EncryptionKey};
use crate::protocol::PartyId;
use crate::utils::CurvePoint;
use libpaillier::unknown_order::BigNumber;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A party's share of a jointly generated ECDSA key, produced by key
/// generation and replaced wholesale by refresh or reshare.
///
/// The secret share and the Paillier decryption key require secure
/// persistent storage; everything else is public. The committee list is
/// recorded so that later signing sessions (possibly over a subset of
/// parties) interpolate at the evaluation points the shares were dealt at.
#[derive(Clone, Serialize, Deserialize)]
pub struct LocalKeyData {
    /// This party's 1-based index in the committee, its polynomial
    /// evaluation point.
    pub(crate) share_id: usize,
    /// The ordered party list of the session that produced this key.
    pub(crate) committee: Vec<PartyId>,
    /// The secret share x_i.
    pub(crate) x_i: BigNumber,
    /// The public share point X_i = x_i * G.
    pub(crate) big_x_i: CurvePoint,
    /// The joint public key X = x * G.
    pub(crate) public_key: CurvePoint,
    /// This party's Paillier key pair.
    pub(crate) paillier_sk: DecryptionKey,
    /// The Paillier public keys of the other committee members.
    pub(crate) peer_paillier_pks: BTreeMap<PartyId, EncryptionKey>,
}

impl Debug for LocalKeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyData")
            .field("share_id", &self.share_id)
            .field("committee", &self.committee)
            .field("x_i", &"[redacted]")
            .field("big_x_i", &self.big_x_i)
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl LocalKeyData {
    /// This party's 1-based share index.
    pub fn share_id(&self) -> usize {
        self.share_id
    }

    /// The committee this key was generated for, in evaluation-point order.
    pub fn committee(&self) -> &[PartyId] {
        &self.committee
    }

    /// This party's public share point.
    pub fn public_share(&self) -> &CurvePoint {
        &self.big_x_i
    }

    /// The joint public key.
    pub fn public_key(&self) -> &CurvePoint {
        &self.public_key
    }

    /// The joint public key as an ECDSA verification key.
    pub fn verifying_key(&self) -> Result<k256::ecdsa::VerifyingKey> {
        k256::ecdsa::VerifyingKey::from_encoded_point(
            &self.public_key.0.to_affine().into(),
        )
        .map_err(|_| Error::InternalInvariantFailed)
    }

    /// The bit length of this party's Paillier modulus.
    pub fn paillier_modulus_bits(&self) -> usize {
        self.paillier_sk.encryption_key().bit_length()
    }

    /// The evaluation point of `party` in this key's committee, if it is a
    /// member.
    pub(crate) fn evaluation_point(&self, party: &PartyId) -> Option<usize> {
        self.committee.iter().position(|p| p == party).map(|i| i + 1)
    }

    /// The Paillier public key of `party`.
    pub(crate) fn peer_paillier_pk(&self, party: &PartyId) -> Result<&EncryptionKey> {
        self.peer_paillier_pks
            .get(party)
            .ok_or_else(|| Error::MissingPeerData(party.clone()))
    }
}
