// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The key resharing state machine.

use crate::commitment::{self, Commitment, CommitmentSalt};
use crate::engine::{message_of_type, Gate, RoundContract, RoundInbox};
use crate::errors::{Blame, Error, Result};
use crate::keygen::commit::{decommit_payload, split_decommit_payload};
use crate::keygen::{LocalKeyData, ProofPayload};
use crate::messages::{Message, MessageType, ReshareMessageType};
use crate::paillier::{DecryptionKey, EncryptionKey};
use crate::polynomial::{verify_share, Polynomial};
use crate::protocol::{Parameters, PartyId, ProtocolParticipant, Status};
use crate::reshare::commit::ReshareCommitData;
use crate::utils::{k256_order, lagrange_at_zero, CurvePoint};
use crate::zkp::schnorr::SchnorrProof;
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};
use zeroize::ZeroizeOnDrop;

/// Input to a resharing session.
///
/// The session [`Parameters`] describe the NEW committee (its ordered party
/// list and threshold); this input describes the outgoing one. Every member
/// of the old committee must participate.
#[derive(Debug, Clone)]
pub struct ReshareInput {
    /// The ordered party list of the old committee.
    pub old_parties: Vec<PartyId>,
    /// The old committee's threshold.
    pub old_threshold: usize,
    /// The local party's existing key material; required when it is a member
    /// of the old committee.
    pub old_key_data: Option<LocalKeyData>,
}

#[derive(Debug)]
struct RoundOneContext {
    /// Fresh Paillier key pair; present when this party joins the new
    /// committee.
    paillier_sk: Option<DecryptionKey>,
    /// The resharing polynomial with the old share as constant term; present
    /// when this party is in the old committee.
    polynomial: Option<Polynomial>,
    commit_data: Vec<u8>,
    salt: CommitmentSalt,
}

#[derive(Debug)]
struct RoundTwoContext {
    inner: RoundOneContext,
    peer_commitments: BTreeMap<PartyId, Commitment>,
    /// The share this party dealt to itself, when it sits in both
    /// committees.
    self_share: Option<BigNumber>,
}

#[derive(Debug, ZeroizeOnDrop)]
struct RoundThreeContext {
    #[zeroize(skip)]
    paillier_sk: Option<DecryptionKey>,
    x_i_new: Option<BigNumber>,
    #[zeroize(skip)]
    big_x_i_new: Option<CurvePoint>,
    #[zeroize(skip)]
    x_public_old: CurvePoint,
    #[zeroize(skip)]
    peer_paillier_pks: BTreeMap<PartyId, EncryptionKey>,
}

#[derive(Debug)]
enum State {
    RoundOne(RoundOneContext),
    RoundTwo(RoundTwoContext),
    RoundThree(RoundThreeContext),
    Finished(Option<LocalKeyData>),
    Aborted,
}

/// A [`ProtocolParticipant`] that transfers a key from an old committee to a
/// new one, possibly with a different threshold.
///
/// # Protocol input
/// A [`ReshareInput`] describing the old committee; the session
/// [`Parameters`] describe the new one.
///
/// # Protocol output
/// `Some(LocalKeyData)` for members of the new committee (the same joint
/// public key, at the new committee's indices and threshold); `None` for
/// old-only members, which merely help with the transfer and verify it.
#[derive(Debug)]
pub struct ReshareParticipant {
    params: Parameters,
    old_parties: Vec<PartyId>,
    old_key_data: Option<LocalKeyData>,
    is_old: bool,
    is_new: bool,
    inbox: RoundInbox,
    state: State,
}

impl ProtocolParticipant for ReshareParticipant {
    type Input = ReshareInput;
    type Output = Option<LocalKeyData>;

    fn new<R: RngCore + CryptoRng>(
        params: Parameters,
        input: Self::Input,
        rng: &mut R,
    ) -> Result<(Self, Vec<Message>)> {
        let is_new = params.is_member();
        let is_old = input.old_parties.contains(params.party_id());
        if !is_old && !is_new {
            return Err(Error::NotInCommittee(params.party_id().clone()));
        }

        validate_old_committee(&input)?;
        if is_old {
            let key_data = input
                .old_key_data
                .as_ref()
                .ok_or_else(|| {
                    Error::InvalidParameters(
                        "old-committee member is missing its key data".into(),
                    )
                })?;
            if key_data.committee() != input.old_parties.as_slice() {
                return Err(Error::InvalidParameters(
                    "old party list must match the key's committee".into(),
                ));
            }
        }

        let members: BTreeSet<PartyId> = input
            .old_parties
            .iter()
            .chain(params.parties())
            .cloned()
            .collect();

        let (context, messages) = round_one(
            &params,
            input.old_key_data.as_ref(),
            is_old,
            is_new,
            rng,
        )?;

        let mut inbox = RoundInbox::new(params.party_id().clone(), members.clone());
        inbox.await_round(
            1,
            members
                .iter()
                .filter(|p| *p != params.party_id())
                .map(|p| {
                    (
                        p.clone(),
                        [MessageType::Reshare(ReshareMessageType::R1Commit)]
                            .into_iter()
                            .collect(),
                    )
                })
                .collect(),
        );

        Ok((
            Self {
                params,
                old_parties: input.old_parties,
                old_key_data: input.old_key_data,
                is_old,
                is_new,
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
                let output = self.round_four(context, received)?;
                self.state = State::Finished(output);
                Ok(vec![])
            }
            State::Finished(_) | State::Aborted => Err(Error::ProtocolDone),
        }
    }

    fn result(&self) -> Option<&Self::Output> {
        match &self.state {
            State::Finished(output) => Some(output),
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
            State::Finished(_) => "Reshare Finished".to_string(),
            State::Aborted => "Reshare Aborted".to_string(),
            _ => format!("Reshare Round {}", self.inbox.round()),
        }
    }
}

fn validate_old_committee(input: &ReshareInput) -> Result<()> {
    if input.old_parties.is_empty() {
        return Err(Error::InvalidParameters("empty old party list".into()));
    }
    let distinct: BTreeSet<_> = input.old_parties.iter().collect();
    if distinct.len() != input.old_parties.len() {
        return Err(Error::InvalidParameters(
            "old party list contains duplicate ids".into(),
        ));
    }
    if input.old_threshold == 0 || input.old_threshold >= input.old_parties.len() {
        return Err(Error::InvalidParameters(format!(
            "old threshold {} out of range for {} parties",
            input.old_threshold,
            input.old_parties.len()
        )));
    }
    Ok(())
}

/// Generate role-dependent material and broadcast the commitment: a fresh
/// Paillier key for new-committee members, a resharing polynomial with the
/// old share as constant term for old-committee members.
#[instrument(skip_all)]
fn round_one<R: RngCore + CryptoRng>(
    params: &Parameters,
    old_key_data: Option<&LocalKeyData>,
    is_old: bool,
    is_new: bool,
    rng: &mut R,
) -> Result<(RoundOneContext, Vec<Message>)> {
    info!("Generating reshare round one messages.");

    let paillier_sk = if is_new {
        Some(DecryptionKey::generate_default(rng)?)
    } else {
        None
    };

    let (polynomial, x_public, vss_commitments) = if is_old {
        let key_data = old_key_data.ok_or(Error::InternalInvariantFailed)?;
        let polynomial = Polynomial::new(rng, params.threshold(), Some(&key_data.x_i));
        let vss_commitments = polynomial.feldman_commitments()?;
        (
            Some(polynomial),
            Some(*key_data.public_key()),
            Some(vss_commitments),
        )
    } else {
        (None, None, None)
    };

    let commit_data = ReshareCommitData {
        paillier_n: paillier_sk
            .as_ref()
            .map(|sk| sk.encryption_key().modulus().clone()),
        x_public,
        vss_commitments,
    }
    .to_bytes()?;
    let (commitment, salt) = commitment::commit(rng, &commit_data);

    let message = Message::broadcast(
        MessageType::Reshare(ReshareMessageType::R1Commit),
        params.party_id(),
        1,
        commitment.as_bytes().to_vec(),
    );

    Ok((
        RoundOneContext {
            paillier_sk,
            polynomial,
            commit_data,
            salt,
        },
        vec![message],
    ))
}

impl ReshareParticipant {
    fn is_party_old(&self, party: &PartyId) -> bool {
        self.old_parties.contains(party)
    }

    fn is_party_new(&self, party: &PartyId) -> bool {
        self.params.parties().contains(party)
    }

    /// The 1-based index of a party in the old committee.
    fn old_index(&self, party: &PartyId) -> Option<usize> {
        self.old_parties.iter().position(|p| p == party).map(|i| i + 1)
    }

    /// All session members other than this party.
    fn other_members(&self) -> Vec<PartyId> {
        let mut members: BTreeSet<PartyId> = self
            .old_parties
            .iter()
            .chain(self.params.parties())
            .cloned()
            .collect();
        let _ = members.remove(self.params.party_id());
        members.into_iter().collect()
    }

    /// Open our commitment to everyone; old-committee members additionally
    /// deal each new-committee member its share at that member's new index.
    #[instrument(skip_all)]
    fn round_two(
        &mut self,
        context: RoundOneContext,
        received: BTreeMap<PartyId, Vec<Message>>,
    ) -> Result<(RoundTwoContext, Vec<Message>)> {
        info!("Generating reshare round two messages.");

        let mut peer_commitments = BTreeMap::new();
        for peer in self.other_members() {
            let message = message_of_type(
                &received,
                &peer,
                MessageType::Reshare(ReshareMessageType::R1Commit),
            )?;
            let commitment = Commitment::from_bytes(message.payload()).map_err(|_| {
                Error::MalformedPayload(Blame::new(&peer, "malformed commitment"))
            })?;
            let _ = peer_commitments.insert(peer.clone(), commitment);
        }

        let mut messages = vec![Message::broadcast(
            MessageType::Reshare(ReshareMessageType::R2Decommit),
            self.params.party_id(),
            2,
            decommit_payload(&context.salt, &context.commit_data),
        )];

        let mut self_share = None;
        if let Some(polynomial) = &context.polynomial {
            for (position, peer) in self.params.parties().iter().enumerate() {
                let share = polynomial.evaluate(position + 1);
                if peer == self.params.party_id() {
                    self_share = Some(share);
                    continue;
                }
                messages.push(Message::p2p(
                    MessageType::Reshare(ReshareMessageType::R2Share),
                    self.params.party_id(),
                    peer,
                    2,
                    share.to_bytes(),
                ));
            }
        }

        // Everyone decommits; shares flow only from old members to new
        // members.
        let contract: RoundContract = self
            .other_members()
            .into_iter()
            .map(|peer| {
                let mut types: BTreeSet<MessageType> =
                    [MessageType::Reshare(ReshareMessageType::R2Decommit)]
                        .into_iter()
                        .collect();
                if self.is_new && self.is_party_old(&peer) {
                    let _ = types.insert(MessageType::Reshare(ReshareMessageType::R2Share));
                }
                (peer, types)
            })
            .collect();
        self.inbox.await_round(2, contract);

        Ok((
            RoundTwoContext {
                inner: context,
                peer_commitments,
                self_share,
            },
            messages,
        ))
    }

    /// Verify every opening and agree on the old public key. New-committee
    /// members additionally reconstruct their new share as the
    /// Lagrange-weighted sum of the old members' shares.
    #[instrument(skip_all)]
    fn round_three<R: RngCore + CryptoRng>(
        &mut self,
        context: RoundTwoContext,
        received: BTreeMap<PartyId, Vec<Message>>,
        rng: &mut R,
    ) -> Result<(RoundThreeContext, Vec<Message>)> {
        info!("Processing reshare round two messages.");

        let order = k256_order();
        let old_indices: Vec<usize> = (1..=self.old_parties.len()).collect();
        let my_new_index = self.params.index_of(self.params.party_id());

        let mut x_public: Option<CurvePoint> = self
            .old_key_data
            .as_ref()
            .map(|key_data| *key_data.public_key());
        let mut peer_paillier_pks = BTreeMap::new();
        let mut share_sum = BigNumber::zero();

        for peer in self.other_members() {
            let decommit = message_of_type(
                &received,
                &peer,
                MessageType::Reshare(ReshareMessageType::R2Decommit),
            )?;
            let (salt, data) = split_decommit_payload(decommit.payload()).map_err(|_| {
                Error::MalformedPayload(Blame::new(&peer, "malformed decommitment"))
            })?;
            let commitment = context
                .peer_commitments
                .get(&peer)
                .ok_or_else(|| Error::MissingPeerData(peer.clone()))?;
            if !commitment::verify(commitment, &salt, data) {
                return Err(Error::CommitmentMismatch(Blame::new(
                    &peer,
                    "commitment verification failed",
                )));
            }

            let commit_data = ReshareCommitData::from_bytes(
                data,
                self.is_party_new(&peer),
                self.is_party_old(&peer),
                self.params.threshold(),
            )
            .map_err(|_| {
                Error::MalformedPayload(Blame::new(&peer, "malformed decommitment"))
            })?;

            if let Some(pk) = commit_data.encryption_key() {
                let _ = peer_paillier_pks.insert(peer.clone(), pk);
            }

            // Every old member must decommit the same public key.
            if let Some(peer_x_public) = commit_data.x_public {
                match &x_public {
                    None => x_public = Some(peer_x_public),
                    Some(known) if *known == peer_x_public => {}
                    Some(_) => {
                        return Err(Error::PublicKeyDrift {
                            blame: Some(Blame::new(
                                &peer,
                                "old public key does not match the committee's",
                            )),
                        })
                    }
                }
            }

            // New members verify and accumulate the share dealt to them.
            if self.is_new && self.is_party_old(&peer) {
                let vss_commitments = commit_data
                    .vss_commitments
                    .as_ref()
                    .ok_or(Error::InternalInvariantFailed)?;
                let my_new_index = my_new_index.ok_or(Error::InternalInvariantFailed)?;

                let share_message = message_of_type(
                    &received,
                    &peer,
                    MessageType::Reshare(ReshareMessageType::R2Share),
                )?;
                let share = BigNumber::from_slice(share_message.payload());
                if !verify_share(&share, my_new_index, vss_commitments)? {
                    return Err(Error::VssShareInvalid(Blame::new(
                        &peer,
                        "vss share verification failed",
                    )));
                }

                let old_index = self
                    .old_index(&peer)
                    .ok_or(Error::InternalInvariantFailed)?;
                let lambda = lagrange_at_zero(&old_indices, old_index)?;
                share_sum = share_sum.modadd(&lambda.modmul(&share, &order), &order);
            }
        }

        let x_public_old = x_public.ok_or(Error::InternalInvariantFailed)?;

        // Fold in the share we dealt to ourselves, weighted like any other
        // old member's contribution.
        if let Some(self_share) = &context.self_share {
            let old_index = self
                .old_index(self.params.party_id())
                .ok_or(Error::InternalInvariantFailed)?;
            let lambda = lagrange_at_zero(&old_indices, old_index)?;
            share_sum = share_sum.modadd(&lambda.modmul(self_share, &order), &order);
        }

        let mut messages = vec![];
        let (x_i_new, big_x_i_new) = if self.is_new {
            let x_i_new = share_sum;
            let big_x_i_new = CurvePoint::GENERATOR.multiply_by_scalar(&x_i_new)?;
            let proof =
                SchnorrProof::prove(rng, self.params.session_id(), &x_i_new, &big_x_i_new)?;
            messages.push(Message::broadcast(
                MessageType::Reshare(ReshareMessageType::R3Proof),
                self.params.party_id(),
                3,
                serialize!(&ProofPayload::new(&big_x_i_new, &proof))?,
            ));
            (Some(x_i_new), Some(big_x_i_new))
        } else {
            (None, None)
        };

        // Proofs come from every new-committee member; old-only parties
        // observe them as verifiers.
        let contract = self
            .params
            .parties()
            .iter()
            .filter(|peer| *peer != self.params.party_id())
            .map(|peer| {
                (
                    peer.clone(),
                    [MessageType::Reshare(ReshareMessageType::R3Proof)]
                        .into_iter()
                        .collect(),
                )
            })
            .collect();
        self.inbox.await_round(3, contract);

        Ok((
            RoundThreeContext {
                paillier_sk: context.inner.paillier_sk.clone(),
                x_i_new,
                big_x_i_new,
                x_public_old,
                peer_paillier_pks,
            },
            messages,
        ))
    }

    /// Verify the new committee's proofs and check that its share points
    /// still aggregate to the old public key, then emit the new key material
    /// (or nothing, for an old-only helper).
    #[instrument(skip_all)]
    fn round_four(
        &mut self,
        context: RoundThreeContext,
        received: BTreeMap<PartyId, Vec<Message>>,
    ) -> Result<Option<LocalKeyData>> {
        info!("Finalizing reshare.");

        let mut share_points = BTreeMap::new();
        if let Some(big_x_i_new) = context.big_x_i_new {
            let _ = share_points.insert(self.params.party_id().clone(), big_x_i_new);
        }

        for peer in self.params.parties() {
            if peer == self.params.party_id() {
                continue;
            }
            let message = message_of_type(
                &received,
                peer,
                MessageType::Reshare(ReshareMessageType::R3Proof),
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

        // The new committee's share points must still aggregate to the old
        // public key at x = 0.
        let new_indices: Vec<usize> = (1..=self.params.parties().len()).collect();
        let mut aggregate = CurvePoint::IDENTITY;
        for (position, party) in self.params.parties().iter().enumerate() {
            let lambda = lagrange_at_zero(&new_indices, position + 1)?;
            let share_point = share_points
                .get(party)
                .ok_or_else(|| Error::MissingPeerData(party.clone()))?;
            aggregate = aggregate + share_point.multiply_by_scalar(&lambda)?;
        }
        if aggregate != context.x_public_old {
            return Err(Error::PublicKeyDrift { blame: None });
        }

        if !self.is_new {
            return Ok(None);
        }

        let share_id = self
            .params
            .index_of(self.params.party_id())
            .ok_or(Error::InternalInvariantFailed)?;
        let mut peer_paillier_pks = context.peer_paillier_pks.clone();
        peer_paillier_pks.retain(|party, _| self.is_party_new(party));

        Ok(Some(LocalKeyData {
            share_id,
            committee: self.params.parties().to_vec(),
            x_i: context
                .x_i_new
                .as_ref()
                .ok_or(Error::InternalInvariantFailed)?
                .clone(),
            big_x_i: context
                .big_x_i_new
                .ok_or(Error::InternalInvariantFailed)?,
            public_key: context.x_public_old,
            paillier_sk: context
                .paillier_sk
                .as_ref()
                .ok_or(Error::InternalInvariantFailed)?
                .clone(),
            peer_paillier_pks,
        }))
    }
}
