// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The wire message abstraction passed between participants.
//!
//! Internally messages are routed by a small enum per protocol; on the wire
//! each type maps to a stable string tag (see [`MessageType::as_str`]) that
//! also keys duplicate detection.

use crate::protocol::PartyId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message types of the key generation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeygenMessageType {
    /// Round-one hash commitment to Paillier modulus and VSS points.
    R1Commit,
    /// Round-two opening of the round-one commitment.
    R2Decommit,
    /// Round-two point-to-point VSS share.
    R2Share,
    /// Round-three public share point and Schnorr proof.
    R3Proof,
}

/// Message types of the signing protocol (shared by presign and online).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignMessageType {
    /// Round-one encrypted nonce and Gamma commitment broadcast.
    R1NonceCommit,
    /// Round-two point-to-point MtA ciphertext pair.
    R2Mta,
    /// Round-three delta share broadcast.
    R3Delta,
    /// Round-four partial signature broadcast.
    R4PartialSig,
}

/// Message types of the key refresh protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RefreshMessageType {
    /// Round-one hash commitment.
    R1Commit,
    /// Round-two opening of the round-one commitment.
    R2Decommit,
    /// Round-two point-to-point zero-hole VSS share.
    R2Share,
    /// Round-three refreshed share point and Schnorr proof.
    R3Proof,
}

/// Message types of the key resharing protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReshareMessageType {
    /// Round-one hash commitment.
    R1Commit,
    /// Round-two opening of the round-one commitment.
    R2Decommit,
    /// Round-two point-to-point share from an old-committee member.
    R2Share,
    /// Round-three new share point and Schnorr proof.
    R3Proof,
}

/// The type of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// A key generation message.
    Keygen(KeygenMessageType),
    /// A signing message.
    Sign(SignMessageType),
    /// A key refresh message.
    Refresh(RefreshMessageType),
    /// A key resharing message.
    Reshare(ReshareMessageType),
}

impl MessageType {
    /// The stable wire tag for this message type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Keygen(KeygenMessageType::R1Commit) => "KeyGenRound1",
            MessageType::Keygen(KeygenMessageType::R2Decommit) => "KeyGenRound2_Decommit",
            MessageType::Keygen(KeygenMessageType::R2Share) => "KeyGenRound2_Share",
            MessageType::Keygen(KeygenMessageType::R3Proof) => "KeyGenRound3_Proof",
            MessageType::Sign(SignMessageType::R1NonceCommit) => "SignRound1",
            MessageType::Sign(SignMessageType::R2Mta) => "SignRound2_MtA",
            MessageType::Sign(SignMessageType::R3Delta) => "SignRound3_Delta",
            MessageType::Sign(SignMessageType::R4PartialSig) => "SignRound4_Si",
            MessageType::Refresh(RefreshMessageType::R1Commit) => "RefreshRound1",
            MessageType::Refresh(RefreshMessageType::R2Decommit) => "RefreshRound2_Decommit",
            MessageType::Refresh(RefreshMessageType::R2Share) => "RefreshRound2_Share",
            MessageType::Refresh(RefreshMessageType::R3Proof) => "RefreshRound3",
            MessageType::Reshare(ReshareMessageType::R1Commit) => "ReshareRound1",
            MessageType::Reshare(ReshareMessageType::R2Decommit) => "ReshareRound2_Decommit",
            MessageType::Reshare(ReshareMessageType::R2Share) => "ReshareRound2_Share",
            MessageType::Reshare(ReshareMessageType::R3Proof) => "ReshareRound3",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A protocol message exchanged between participants.
///
/// An empty recipient list marks a broadcast. The payload is opaque to the
/// transport; its encoding is fixed per message type (see the protocol
/// modules).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    message_type: MessageType,
    from: PartyId,
    to: Vec<PartyId>,
    is_broadcast: bool,
    round: u32,
    payload: Vec<u8>,
}

impl Message {
    /// Create a message. An empty `to` list means broadcast.
    pub fn new(
        message_type: MessageType,
        from: PartyId,
        to: Vec<PartyId>,
        round: u32,
        payload: Vec<u8>,
    ) -> Self {
        let is_broadcast = to.is_empty();
        Self {
            message_type,
            from,
            to,
            is_broadcast,
            round,
            payload,
        }
    }

    pub(crate) fn broadcast(
        message_type: MessageType,
        from: &PartyId,
        round: u32,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(message_type, from.clone(), vec![], round, payload)
    }

    pub(crate) fn p2p(
        message_type: MessageType,
        from: &PartyId,
        to: &PartyId,
        round: u32,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(message_type, from.clone(), vec![to.clone()], round, payload)
    }

    /// The type of this message.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The sender.
    pub fn from(&self) -> &PartyId {
        &self.from
    }

    /// The intended recipients; empty for a broadcast.
    pub fn to(&self) -> &[PartyId] {
        &self.to
    }

    /// Whether this message is intended for all parties.
    pub fn is_broadcast(&self) -> bool {
        self.is_broadcast
    }

    /// The protocol round this message belongs to.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The serialized message data.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} (round {}, {} bytes)",
            self.message_type,
            self.from,
            self.round,
            self.payload.len()
        )
    }
}
