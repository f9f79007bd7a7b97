// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The key refresh state machine.

use crate::commitment::{self, Commitment, CommitmentSalt};
use crate::engine::{message_of_type, uniform_contract, Gate, RoundInbox};
use crate::errors::{Blame, Error, Result};
use crate::keygen::commit::{decommit_payload, split_decommit_payload, CommitData};
use crate::keygen::{LocalKeyData, ProofPayload};
use crate::messages::{Message, MessageType, RefreshMessageType};
use crate::paillier::DecryptionKey;
use crate::polynomial::{verify_share, Polynomial};
use crate::protocol::{Parameters, PartyId, ProtocolParticipant, Status};
use crate::utils::{k256_order, lagrange_at_zero, CurvePoint};
use crate::zkp::schnorr::SchnorrProof;
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};
use zeroize::ZeroizeOnDrop;

#[derive(Debug)]
struct RoundOneContext {
    paillier_sk: DecryptionKey,
    polynomial: Polynomial,
    vss_commitments: Vec<CurvePoint>,
    commit_data: Vec<u8>,
    salt: CommitmentSalt,
}

#[derive(Debug)]
struct RoundTwoContext {
    inner: RoundOneContext,
    peer_commitments: BTreeMap<PartyId, Commitment>,
}

#[derive(Debug, ZeroizeOnDrop)]
struct RoundThreeContext {
    #[zeroize(skip)]
    paillier_sk: DecryptionKey,
    x_i_new: BigNumber,
    #[zeroize(skip)]
    big_x_i_new: CurvePoint,
    #[zeroize(skip)]
    peer_paillier_pks: BTreeMap<PartyId, crate::paillier::EncryptionKey>,
}

#[derive(Debug)]
enum State {
    RoundOne(RoundOneContext),
    RoundTwo(RoundTwoContext),
    RoundThree(RoundThreeContext),
    Finished(LocalKeyData),
    Aborted,
}

/// A [`ProtocolParticipant`] that refreshes every share of an existing key.
///
/// # Protocol input
/// The [`LocalKeyData`] to refresh. The session party list must equal the
/// key's committee.
///
/// # Protocol output
/// A new [`LocalKeyData`] with a fresh secret share and fresh Paillier keys,
/// preserving the joint public key exactly.
#[derive(Debug)]
pub struct RefreshParticipant {
    params: Parameters,
    old_key_data: LocalKeyData,
    inbox: RoundInbox,
    state: State,
}

impl ProtocolParticipant for RefreshParticipant {
    type Input = LocalKeyData;
    type Output = LocalKeyData;

    fn new<R: RngCore + CryptoRng>(
        params: Parameters,
        input: Self::Input,
        rng: &mut R,
    ) -> Result<(Self, Vec<Message>)> {
        params.require_membership()?;
        if params.parties() != input.committee() {
            return Err(Error::InvalidParameters(
                "refresh party list must match the key's committee".into(),
            ));
        }

        let mut inbox = RoundInbox::new(
            params.party_id().clone(),
            params.parties().iter().cloned(),
        );
        let (context, messages) = round_one(&params, rng)?;
        inbox.await_round(
            1,
            uniform_contract(
                params.other_parties(),
                &[MessageType::Refresh(RefreshMessageType::R1Commit)],
            ),
        );

        Ok((
            Self {
                params,
                old_key_data: input,
                inbox,
                state: State::RoundOne(context),
            },
            messages,
        ))
    }

    fn update<R: RngCore + CryptoRng>(
        &mut self,
        message: &Message,
        rng: &mut R,
    ) -> Result<Vec<Message>> {
        if matches!(self.state, State::Finished(_) | State::Aborted) {
            return Err(Error::ProtocolDone);
        }
        if matches!(self.inbox.accept(message)?, Gate::Ignored) {
            return Ok(vec![]);
        }
        if !self.inbox.is_complete() {
            return Ok(vec![]);
        }

        let received = self.inbox.take_received();
        match std::mem::replace(&mut self.state, State::Aborted) {
            State::RoundOne(context) => {
                let (context, messages) = self.round_two(context, received)?;
                self.state = State::RoundTwo(context);
                Ok(messages)
            }
            State::RoundTwo(context) => {
                let (context, messages) = self.round_three(context, received, rng)?;
                self.state = State::RoundThree(context);
                Ok(messages)
            }
            State::RoundThree(context) => {
                let key_data = self.round_four(context, received)?;
                self.state = State::Finished(key_data);
                Ok(vec![])
            }
            State::Finished(_) | State::Aborted => Err(Error::ProtocolDone),
        }
    }

    fn result(&self) -> Option<&Self::Output> {
        match &self.state {
            State::Finished(key_data) => Some(key_data),
            _ => None,
        }
    }

    fn status(&self) -> Status {
        match &self.state {
            State::Finished(_) => Status::Finished,
            State::Aborted => Status::Aborted,
            _ => Status::InProgress {
                round: self.inbox.round(),
            },
        }
    }

    fn details(&self) -> String {
        match &self.state {
            State::Finished(_) => "Refresh Finished".to_string(),
            State::Aborted => "Refresh Aborted".to_string(),
            _ => format!("Refresh Round {}", self.inbox.round()),
        }
    }
}

/// Sample a fresh Paillier key pair and a zero-hole polynomial, and
/// broadcast a commitment to (Paillier N, VSS points).
#[instrument(skip_all)]
fn round_one<R: RngCore + CryptoRng>(
    params: &Parameters,
    rng: &mut R,
) -> Result<(RoundOneContext, Vec<Message>)> {
    info!("Generating refresh round one messages.");

    let paillier_sk = DecryptionKey::generate_default(rng)?;
    let polynomial = Polynomial::new(rng, params.threshold(), Some(&BigNumber::zero()));
    let vss_commitments = polynomial.feldman_commitments()?;

    let commit_data = CommitData {
        paillier_n: paillier_sk.encryption_key().modulus().clone(),
        vss_commitments: vss_commitments.clone(),
    }
    .to_bytes()?;
    let (commitment, salt) = commitment::commit(rng, &commit_data);

    let message = Message::broadcast(
        MessageType::Refresh(RefreshMessageType::R1Commit),
        params.party_id(),
        1,
        commitment.as_bytes().to_vec(),
    );

    Ok((
        RoundOneContext {
            paillier_sk,
            polynomial,
            vss_commitments,
            commit_data,
            salt,
        },
        vec![message],
    ))
}

impl RefreshParticipant {
    /// Record peer commitments, open our own, and deal every peer its
    /// zero-hole share.
    #[instrument(skip_all)]
    fn round_two(
        &mut self,
        context: RoundOneContext,
        received: BTreeMap<PartyId, Vec<Message>>,
    ) -> Result<(RoundTwoContext, Vec<Message>)> {
        info!("Generating refresh round two messages.");

        let mut peer_commitments = BTreeMap::new();
        for peer in self.params.other_parties() {
            let message = message_of_type(
                &received,
                peer,
                MessageType::Refresh(RefreshMessageType::R1Commit),
            )?;
            let commitment = Commitment::from_bytes(message.payload()).map_err(|_| {
                Error::MalformedPayload(Blame::new(peer, "malformed commitment"))
            })?;
            let _ = peer_commitments.insert(peer.clone(), commitment);
        }

        let mut messages = vec![Message::broadcast(
            MessageType::Refresh(RefreshMessageType::R2Decommit),
            self.params.party_id(),
            2,
            decommit_payload(&context.salt, &context.commit_data),
        )];
        for peer in self.params.other_parties() {
            let index = self
                .params
                .index_of(peer)
                .ok_or(Error::InternalInvariantFailed)?;
            let share = context.polynomial.evaluate(index);
            messages.push(Message::p2p(
                MessageType::Refresh(RefreshMessageType::R2Share),
                self.params.party_id(),
                peer,
                2,
                share.to_bytes(),
            ));
        }

        self.inbox.await_round(
            2,
            uniform_contract(
                self.params.other_parties(),
                &[
                    MessageType::Refresh(RefreshMessageType::R2Decommit),
                    MessageType::Refresh(RefreshMessageType::R2Share),
                ],
            ),
        );

        Ok((
            RoundTwoContext {
                inner: context,
                peer_commitments,
            },
            messages,
        ))
    }

    /// Verify openings and zero-hole shares, derive the refreshed share
    /// `x_i' = x_i + sum_j H_j(i)`, and broadcast its share point with a
    /// proof of knowledge.
    #[instrument(skip_all)]
    fn round_three<R: RngCore + CryptoRng>(
        &mut self,
        context: RoundTwoContext,
        received: BTreeMap<PartyId, Vec<Message>>,
        rng: &mut R,
    ) -> Result<(RoundThreeContext, Vec<Message>)> {
        info!("Generating refresh round three messages.");

        let order = k256_order();
        let my_index = self
            .params
            .index_of(self.params.party_id())
            .ok_or(Error::InternalInvariantFailed)?;

        let mut share_sum = context.inner.polynomial.evaluate(my_index);
        let mut peer_paillier_pks = BTreeMap::new();

        for peer in self.params.other_parties() {
            let decommit = message_of_type(
                &received,
                peer,
                MessageType::Refresh(RefreshMessageType::R2Decommit),
            )?;
            let (salt, data) = split_decommit_payload(decommit.payload()).map_err(|_| {
                Error::MalformedPayload(Blame::new(peer, "malformed decommitment"))
            })?;
            let commitment = context
                .peer_commitments
                .get(peer)
                .ok_or_else(|| Error::MissingPeerData(peer.clone()))?;
            if !commitment::verify(commitment, &salt, data) {
                return Err(Error::CommitmentMismatch(Blame::new(
                    peer,
                    "commitment verification failed",
                )));
            }

            let commit_data =
                CommitData::from_bytes(data, self.params.threshold()).map_err(|_| {
                    Error::MalformedPayload(Blame::new(peer, "malformed decommitment"))
                })?;

            // A refresh polynomial must actually be zero-hole, or the joint
            // secret would shift.
            if !commit_data.vss_commitments[0].is_identity() {
                return Err(Error::VssShareInvalid(Blame::new(
                    peer,
                    "refresh polynomial does not share zero",
                )));
            }

            let share_message = message_of_type(
                &received,
                peer,
                MessageType::Refresh(RefreshMessageType::R2Share),
            )?;
            let share = BigNumber::from_slice(share_message.payload());
            if !verify_share(&share, my_index, &commit_data.vss_commitments)? {
                return Err(Error::VssShareInvalid(Blame::new(
                    peer,
                    "vss share verification failed",
                )));
            }

            share_sum = share_sum.modadd(&share, &order);
            let _ = peer_paillier_pks.insert(peer.clone(), commit_data.encryption_key());
        }

        let x_i_new = self.old_key_data.x_i.modadd(&share_sum, &order);
        let big_x_i_new = CurvePoint::GENERATOR.multiply_by_scalar(&x_i_new)?;
        let proof = SchnorrProof::prove(rng, self.params.session_id(), &x_i_new, &big_x_i_new)?;
        let payload = serialize!(&ProofPayload::new(&big_x_i_new, &proof))?;

        let message = Message::broadcast(
            MessageType::Refresh(RefreshMessageType::R3Proof),
            self.params.party_id(),
            3,
            payload,
        );

        self.inbox.await_round(
            3,
            uniform_contract(
                self.params.other_parties(),
                &[MessageType::Refresh(RefreshMessageType::R3Proof)],
            ),
        );

        Ok((
            RoundThreeContext {
                paillier_sk: context.inner.paillier_sk.clone(),
                x_i_new,
                big_x_i_new,
                peer_paillier_pks,
            },
            vec![message],
        ))
    }

    /// Verify every refreshed share point's proof of knowledge, then check
    /// that the Lagrange aggregation of the new share points still equals
    /// the old public key.
    #[instrument(skip_all)]
    fn round_four(
        &mut self,
        context: RoundThreeContext,
        received: BTreeMap<PartyId, Vec<Message>>,
    ) -> Result<LocalKeyData> {
        info!("Finalizing refresh.");

        let mut share_points = BTreeMap::new();
        let _ = share_points.insert(self.params.party_id().clone(), context.big_x_i_new);

        for peer in self.params.other_parties() {
            let message = message_of_type(
                &received,
                peer,
                MessageType::Refresh(RefreshMessageType::R3Proof),
            )?;
            let payload: ProofPayload = deserialize!(message.payload()).map_err(|_| {
                Error::MalformedPayload(Blame::new(peer, "malformed proof payload"))
            })?;
            let big_x_j = payload.share_point().map_err(|_| {
                Error::MalformedPayload(Blame::new(peer, "malformed proof payload"))
            })?;
            let proof = payload.proof().map_err(|_| {
                Error::MalformedPayload(Blame::new(peer, "malformed proof payload"))
            })?;
            proof
                .verify(self.params.session_id(), &big_x_j)
                .map_err(|_| {
                    Error::SchnorrInvalid(Blame::new(
                        peer,
                        "schnorr proof verification failed",
                    ))
                })?;
            let _ = share_points.insert(peer.clone(), big_x_j);
        }

        // sum_j lambda_j * X_j' over the full committee must still equal the
        // public key; a zero-hole violation by any party would surface here.
        let indices: Vec<usize> = (1..=self.params.parties().len()).collect();
        let mut aggregate = CurvePoint::IDENTITY;
        for (index, party) in self.params.parties().iter().enumerate() {
            let lambda = lagrange_at_zero(&indices, index + 1)?;
            let share_point = share_points
                .get(party)
                .ok_or_else(|| Error::MissingPeerData(party.clone()))?;
            aggregate = aggregate + share_point.multiply_by_scalar(&lambda)?;
        }
        if aggregate != *self.old_key_data.public_key() {
            return Err(Error::PublicKeyDrift { blame: None });
        }

        Ok(LocalKeyData {
            share_id: self.old_key_data.share_id(),
            committee: self.params.parties().to_vec(),
            x_i: context.x_i_new.clone(),
            big_x_i: context.big_x_i_new,
            public_key: *self.old_key_data.public_key(),
            paillier_sk: context.paillier_sk.clone(),
            peer_paillier_pks: context.peer_paillier_pks.clone(),
        })
    }
}
