// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Session configuration and the contract every protocol implements.

use crate::errors::{Error, Result};
use crate::messages::Message;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An opaque, comparable identifier for a protocol participant.
///
/// Equality is string equality. A party's position in the session's agreed
/// party list (not anything intrinsic to the id) defines the 1-based index
/// used as its polynomial evaluation point.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(String);

impl PartyId {
    /// Create a party identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartyId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PartyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The elliptic curve a session runs over.
///
/// Only secp256k1 is supported by this engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Curve {
    /// The Bitcoin/Ethereum curve.
    #[default]
    Secp256k1,
}

/// Configuration for one protocol session.
///
/// The party list must be identical (same members, same order) across all
/// participants of the session and must not change for its duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    party_id: PartyId,
    parties: Vec<PartyId>,
    threshold: usize,
    curve: Curve,
    session_id: Vec<u8>,
}

impl Parameters {
    /// Create a validated session configuration.
    ///
    /// `threshold` is `t`: polynomials have degree `t` and `t + 1` parties
    /// suffice to sign. It must satisfy `1 <= t <= n - 1`.
    ///
    /// The local party does not have to appear in `parties`; resharing
    /// sessions include members of the outgoing committee that are not in the
    /// incoming one. Protocols that do require membership check it at
    /// construction.
    pub fn new(
        party_id: PartyId,
        parties: Vec<PartyId>,
        threshold: usize,
        session_id: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let session_id = session_id.into();
        if parties.is_empty() {
            return Err(Error::InvalidParameters("empty party list".into()));
        }
        let distinct: BTreeSet<_> = parties.iter().collect();
        if distinct.len() != parties.len() {
            return Err(Error::InvalidParameters(
                "party list contains duplicate ids".into(),
            ));
        }
        if threshold == 0 || threshold >= parties.len() {
            return Err(Error::InvalidParameters(format!(
                "threshold {} out of range for {} parties",
                threshold,
                parties.len()
            )));
        }
        if session_id.is_empty() {
            return Err(Error::InvalidParameters("empty session id".into()));
        }
        Ok(Self {
            party_id,
            parties,
            threshold,
            curve: Curve::Secp256k1,
            session_id,
        })
    }

    /// The local party's identifier.
    pub fn party_id(&self) -> &PartyId {
        &self.party_id
    }

    /// The ordered list of session participants.
    pub fn parties(&self) -> &[PartyId] {
        &self.parties
    }

    /// The threshold `t`.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// The curve this session runs over.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The unique session identifier, bound into Fiat-Shamir challenges.
    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    /// The 1-based index of `party` in the session party list.
    pub(crate) fn index_of(&self, party: &PartyId) -> Option<usize> {
        self.parties.iter().position(|p| p == party).map(|i| i + 1)
    }

    /// Whether the local party is a member of the session party list.
    pub(crate) fn is_member(&self) -> bool {
        self.parties.contains(&self.party_id)
    }

    /// All parties in the session other than the local one.
    pub(crate) fn other_parties(&self) -> impl Iterator<Item = &PartyId> {
        self.parties.iter().filter(move |p| **p != self.party_id)
    }

    /// Fail unless the local party is in the party list.
    pub(crate) fn require_membership(&self) -> Result<()> {
        if self.is_member() {
            Ok(())
        } else {
            Err(Error::InvalidParameters(format!(
                "party {} is not in the session party list",
                self.party_id
            )))
        }
    }
}

/// Execution status of a protocol participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The participant is collecting messages for `round`.
    InProgress {
        /// The round currently being collected.
        round: u32,
    },
    /// The protocol terminated successfully; the result is available.
    Finished,
    /// A fatal error stopped the protocol; no result will be produced.
    Aborted,
}

/// A message-driven, round-based protocol state machine.
///
/// Construction performs the round-one computation eagerly and returns the
/// first outbound messages alongside the instance. The caller then feeds every
/// inbound message through [`update`](Self::update), disseminating whatever
/// messages come back, until [`status`](Self::status) reports
/// [`Status::Finished`] and [`result`](Self::result) yields the output.
///
/// Instances are purely computational: no I/O, no timers, no threads. A single
/// instance must not be used from multiple threads concurrently.
pub trait ProtocolParticipant: Sized {
    /// Protocol-specific input consumed at construction.
    type Input;
    /// The value produced on successful termination.
    type Output;

    /// Create a participant and produce its round-one messages.
    fn new<R: RngCore + CryptoRng>(
        params: Parameters,
        input: Self::Input,
        rng: &mut R,
    ) -> Result<(Self, Vec<Message>)>;

    /// Apply one inbound message, returning any newly produced outbound
    /// messages.
    ///
    /// Messages for past rounds and the participant's own looped-back
    /// messages are silently ignored. Messages for future rounds, duplicates,
    /// and messages from non-members are errors that leave the state
    /// unchanged. Failed cryptographic verification aborts the protocol,
    /// naming the offending party where possible.
    fn update<R: RngCore + CryptoRng>(
        &mut self,
        message: &Message,
        rng: &mut R,
    ) -> Result<Vec<Message>>;

    /// The protocol output, if the participant has finished.
    fn result(&self) -> Option<&Self::Output>;

    /// The participant's execution status.
    fn status(&self) -> Status;

    /// A human-readable description of the current state, for diagnostics.
    fn details(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> Vec<PartyId> {
        ids.iter().map(|id| PartyId::from(*id)).collect()
    }

    #[test]
    fn accepts_a_valid_configuration() {
        let params =
            Parameters::new(PartyId::from("2"), ids(&["1", "2", "3"]), 1, b"session").unwrap();
        assert_eq!(params.index_of(&PartyId::from("1")), Some(1));
        assert_eq!(params.index_of(&PartyId::from("3")), Some(3));
        assert_eq!(params.index_of(&PartyId::from("9")), None);
        assert_eq!(params.other_parties().count(), 2);
        assert_eq!(params.curve(), Curve::Secp256k1);
    }

    #[test]
    fn rejects_duplicate_parties() {
        let result = Parameters::new(PartyId::from("1"), ids(&["1", "2", "2"]), 1, b"session");
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        for threshold in [0usize, 3, 4] {
            let result = Parameters::new(
                PartyId::from("1"),
                ids(&["1", "2", "3"]),
                threshold,
                b"session",
            );
            assert!(matches!(result, Err(Error::InvalidParameters(_))));
        }
    }

    #[test]
    fn rejects_an_empty_session_id() {
        let result = Parameters::new(PartyId::from("1"), ids(&["1", "2", "3"]), 1, vec![]);
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn membership_is_not_required_by_construction() {
        let params =
            Parameters::new(PartyId::from("9"), ids(&["1", "2", "3"]), 1, b"session").unwrap();
        assert!(!params.is_member());
        assert!(params.require_membership().is_err());
    }
}
