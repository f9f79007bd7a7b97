// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Round gating shared by every protocol.
//!
//! A [`RoundInbox`] buffers inbound messages for the round currently being
//! collected, enforcing per-sender/per-type uniqueness and the round's
//! expected-multiplicity contract. Messages for past rounds are dropped as
//! replay-tolerant idempotence; messages for future rounds are rejected.

use crate::errors::{Error, Result};
use crate::messages::{Message, MessageType};
use crate::protocol::PartyId;
use std::collections::{BTreeMap, BTreeSet};

/// What `accept` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    /// The message was buffered for the current round.
    Buffered,
    /// The message was silently dropped (own echo or stale round).
    Ignored,
}

/// The messages each sender is expected to deliver in one round.
pub(crate) type RoundContract = BTreeMap<PartyId, BTreeSet<MessageType>>;

/// Build a contract in which every listed sender owes the same message types.
pub(crate) fn uniform_contract<'a>(
    senders: impl IntoIterator<Item = &'a PartyId>,
    types: &[MessageType],
) -> RoundContract {
    senders
        .into_iter()
        .map(|sender| (sender.clone(), types.iter().copied().collect()))
        .collect()
}

/// Per-round message buffer with gating rules.
#[derive(Debug)]
pub(crate) struct RoundInbox {
    self_id: PartyId,
    members: BTreeSet<PartyId>,
    round: u32,
    expected: RoundContract,
    received: BTreeMap<PartyId, Vec<Message>>,
}

impl RoundInbox {
    /// Create an inbox for a session whose members are `members`.
    pub(crate) fn new(self_id: PartyId, members: impl IntoIterator<Item = PartyId>) -> Self {
        Self {
            self_id,
            members: members.into_iter().collect(),
            round: 0,
            expected: RoundContract::new(),
            received: BTreeMap::new(),
        }
    }

    /// Begin collecting `round`, expecting the given multiset of messages.
    ///
    /// Any leftover buffered messages are discarded; each round starts from an
    /// empty buffer.
    pub(crate) fn await_round(&mut self, round: u32, expected: RoundContract) {
        self.round = round;
        self.expected = expected;
        self.received.clear();
    }

    /// The round currently being collected.
    pub(crate) fn round(&self) -> u32 {
        self.round
    }

    /// Apply the gating rules to one inbound message.
    pub(crate) fn accept(&mut self, message: &Message) -> Result<Gate> {
        if *message.from() == self.self_id {
            return Ok(Gate::Ignored);
        }
        if !self.members.contains(message.from()) {
            return Err(Error::NotInCommittee(message.from().clone()));
        }
        if message.round() < self.round {
            return Ok(Gate::Ignored);
        }
        if message.round() > self.round {
            return Err(Error::OutOfOrderRound {
                current: self.round,
                received: message.round(),
            });
        }
        let queue = self.received.entry(message.from().clone()).or_default();
        if queue
            .iter()
            .any(|m| m.message_type() == message.message_type())
        {
            return Err(Error::DuplicateMessage {
                party: message.from().clone(),
                message_type: message.message_type(),
            });
        }
        queue.push(message.clone());
        Ok(Gate::Buffered)
    }

    /// Whether every expected message of the current round has arrived.
    pub(crate) fn is_complete(&self) -> bool {
        self.expected.iter().all(|(sender, types)| {
            let Some(queue) = self.received.get(sender) else {
                return types.is_empty();
            };
            types
                .iter()
                .all(|t| queue.iter().any(|m| m.message_type() == *t))
        })
    }

    /// Drain the buffer at the round boundary.
    pub(crate) fn take_received(&mut self) -> BTreeMap<PartyId, Vec<Message>> {
        std::mem::take(&mut self.received)
    }
}

/// Find the unique buffered message of a given type from `sender`.
pub(crate) fn message_of_type<'a>(
    received: &'a BTreeMap<PartyId, Vec<Message>>,
    sender: &PartyId,
    message_type: MessageType,
) -> Result<&'a Message> {
    received
        .get(sender)
        .and_then(|queue| queue.iter().find(|m| m.message_type() == message_type))
        .ok_or_else(|| Error::MissingPeerData(sender.clone()))
}
