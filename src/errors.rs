// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Error types produced during protocol execution.
//!
//! Errors fall into two classes. Unblamed errors indicate caller misuse or a
//! local failure (bad parameters, out-of-order delivery, a message fed twice).
//! Blamed errors implement identifiable abort: a peer's payload failed a
//! cryptographic check, and the error names that peer so the caller can
//! exclude it and retry the session.

use crate::messages::MessageType;
use crate::paillier::PaillierError;
use crate::protocol::PartyId;
use core::fmt;
use thiserror::Error;

/// The default Result type used in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A misbehaving party together with the check its payload failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blame {
    /// The party whose payload failed verification.
    pub party: PartyId,
    /// Which check failed.
    pub reason: String,
}

impl Blame {
    pub(crate) fn new(party: &PartyId, reason: &str) -> Self {
        Self {
            party: party.clone(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Blame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blame party {}: {}", self.party, self.reason)
    }
}

/// Every error surfaced by a protocol participant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The caller supplied an invalid session configuration or input.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    /// A message for a future round arrived while an earlier round is still
    /// incomplete. The engine does not buffer across rounds; the transport
    /// layer must deliver rounds in order.
    #[error("received message for round {received}, expected {current}")]
    OutOfOrderRound {
        /// The round the participant is currently collecting.
        current: u32,
        /// The round number carried by the rejected message.
        received: u32,
    },
    /// A second message with the same type arrived from the same sender
    /// within one round.
    #[error("duplicate message type {message_type} from party {party}")]
    DuplicateMessage {
        /// The repeating sender.
        party: PartyId,
        /// The repeated message type.
        message_type: MessageType,
    },
    /// A message arrived from a party that is not a member of this session.
    #[error("party {0} is not a member of this session")]
    NotInCommittee(PartyId),
    /// Required data for a peer (e.g. its Paillier public key) was never
    /// supplied.
    #[error("missing data for peer {0}")]
    MissingPeerData(PartyId),
    /// A decommitment did not match the hash commitment from round one.
    #[error("{0}")]
    CommitmentMismatch(Blame),
    /// A Feldman VSS share did not match the sender's polynomial commitment.
    #[error("{0}")]
    VssShareInvalid(Blame),
    /// A Schnorr proof of knowledge failed to verify.
    #[error("{0}")]
    SchnorrInvalid(Blame),
    /// A peer's Paillier ciphertext could not be decrypted.
    #[error("{0}")]
    PaillierDecryptError(Blame),
    /// A peer's payload could not be decoded at all.
    #[error("{0}")]
    MalformedPayload(Blame),
    /// The aggregated public key no longer matches the key the session was
    /// supposed to preserve.
    #[error("public key drift detected")]
    PublicKeyDrift {
        /// The party whose contribution broke the aggregate, when one can be
        /// identified.
        blame: Option<Blame>,
    },
    /// The sum of the delta shares was zero; the caller must restart signing
    /// with fresh randomness.
    #[error("delta is not invertible, restart signing")]
    NonInvertibleDelta,
    /// The x-coordinate of the nonce point reduced to zero; the caller must
    /// restart signing with fresh randomness.
    #[error("calculated r is zero, restart signing")]
    RZero,
    /// The aggregated signature failed ECDSA verification.
    #[error("signature verification failed")]
    SignatureVerifyFailed,
    /// `update` was called on a participant that already finished or aborted.
    #[error("protocol already finished")]
    ProtocolDone,
    /// An error raised by the Paillier subsystem.
    #[error("paillier: {0}")]
    Paillier(#[from] PaillierError),
    /// A payload could not be serialized or deserialized.
    #[error("serialization error")]
    Serialization,
    /// A code assumption checked at runtime failed to hold.
    #[error("internal invariant failed")]
    InternalInvariantFailed,
}

impl Error {
    /// The party responsible for this failure, when the protocol can name one.
    pub fn blame(&self) -> Option<&Blame> {
        match self {
            Error::CommitmentMismatch(blame)
            | Error::VssShareInvalid(blame)
            | Error::SchnorrInvalid(blame)
            | Error::PaillierDecryptError(blame)
            | Error::MalformedPayload(blame) => Some(blame),
            Error::PublicKeyDrift { blame } => blame.as_ref(),
            _ => None,
        }
    }
}

macro_rules! serialize {
    ($x:expr) => {{
        bincode::serialize($x).or(Err($crate::errors::Error::Serialization))
    }};
}

macro_rules! deserialize {
    ($x:expr) => {{
        bincode::deserialize($x).or(Err($crate::errors::Error::Serialization))
    }};
}
