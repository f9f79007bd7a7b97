// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The key generation state machine.

use crate::commitment::{self, Commitment, CommitmentSalt};
use crate::engine::{message_of_type, uniform_contract, Gate, RoundInbox};
use crate::errors::{Blame, Error, Result};
use crate::keygen::commit::{decommit_payload, split_decommit_payload, CommitData};
use crate::keygen::keyshare::LocalKeyData;
use crate::messages::{KeygenMessageType, Message, MessageType};
use crate::paillier::DecryptionKey;
use crate::polynomial::{evaluate_in_exponent, verify_share, Polynomial};
use crate::protocol::{Parameters, PartyId, ProtocolParticipant, Status};
use crate::utils::{k256_order, CurvePoint};
use crate::zkp::schnorr::SchnorrProof;
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};
use zeroize::ZeroizeOnDrop;

/// Round-three broadcast: a public share point and the Schnorr proof that the
/// sender knows its discrete logarithm. Shared by refresh and reshare, whose
/// final rounds carry the same statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProofPayload {
    xi_x: [u8; 32],
    xi_y: [u8; 32],
    proof_r: Vec<u8>,
    proof_s: Vec<u8>,
}

impl ProofPayload {
    pub(crate) fn new(share_point: &CurvePoint, proof: &SchnorrProof) -> Self {
        let (xi_x, xi_y) = share_point.to_affine_bytes();
        let (proof_r, proof_s) = proof.to_wire();
        Self {
            xi_x,
            xi_y,
            proof_r,
            proof_s,
        }
    }

    pub(crate) fn share_point(&self) -> Result<CurvePoint> {
        CurvePoint::from_affine_bytes(&self.xi_x, &self.xi_y)
    }

    pub(crate) fn proof(&self) -> Result<SchnorrProof> {
        SchnorrProof::from_wire(&self.proof_r, &self.proof_s)
    }
}

/// Context carried from round one: everything committed to, plus the salt
/// that will open the commitment. The polynomial zeroizes itself on drop.
#[derive(Debug)]
struct RoundOneContext {
    paillier_sk: DecryptionKey,
    polynomial: Polynomial,
    vss_commitments: Vec<CurvePoint>,
    commit_data: Vec<u8>,
    salt: CommitmentSalt,
}

/// Context carried from round two: round one's, plus the peers' unopened
/// commitments.
#[derive(Debug)]
struct RoundTwoContext {
    inner: RoundOneContext,
    peer_commitments: BTreeMap<PartyId, Commitment>,
}

/// Context carried from round three: the combined secret share and the
/// verification material for the final round.
#[derive(Debug, ZeroizeOnDrop)]
struct RoundThreeContext {
    #[zeroize(skip)]
    paillier_sk: DecryptionKey,
    x_i: BigNumber,
    #[zeroize(skip)]
    big_x_i: CurvePoint,
    #[zeroize(skip)]
    public_key: CurvePoint,
    #[zeroize(skip)]
    all_vss: BTreeMap<PartyId, Vec<CurvePoint>>,
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

/// A [`ProtocolParticipant`] that runs distributed key generation.
///
/// # Protocol input
/// None.
///
/// # Protocol output
/// A [`LocalKeyData`]: this party's secret share, the joint public key, and
/// the Paillier material needed for signing.
#[derive(Debug)]
pub struct KeygenParticipant {
    params: Parameters,
    inbox: RoundInbox,
    state: State,
}

impl ProtocolParticipant for KeygenParticipant {
    type Input = ();
    type Output = LocalKeyData;

    fn new<R: RngCore + CryptoRng>(
        params: Parameters,
        _input: Self::Input,
        rng: &mut R,
    ) -> Result<(Self, Vec<Message>)> {
        params.require_membership()?;
        let mut inbox = RoundInbox::new(
            params.party_id().clone(),
            params.parties().iter().cloned(),
        );

        let (context, messages) = round_one(&params, rng)?;
        inbox.await_round(
            1,
            uniform_contract(
                params.other_parties(),
                &[MessageType::Keygen(KeygenMessageType::R1Commit)],
            ),
        );

        Ok((
            Self {
                params,
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
                let (context, messages) = self.round_two(context, received, rng)?;
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
            State::Finished(_) => "KeyGen Finished".to_string(),
            State::Aborted => "KeyGen Aborted".to_string(),
            _ => format!("KeyGen Round {}", self.inbox.round()),
        }
    }
}

/// Sample the Paillier key pair and the sharing polynomial, and broadcast a
/// commitment to (Paillier N, VSS points).
#[instrument(skip_all)]
fn round_one<R: RngCore + CryptoRng>(
    params: &Parameters,
    rng: &mut R,
) -> Result<(RoundOneContext, Vec<Message>)> {
    info!("Generating keygen round one messages.");

    let paillier_sk = DecryptionKey::generate_default(rng)?;
    let polynomial = Polynomial::new(rng, params.threshold(), None);
    let vss_commitments = polynomial.feldman_commitments()?;

    let commit_data = CommitData {
        paillier_n: paillier_sk.encryption_key().modulus().clone(),
        vss_commitments: vss_commitments.clone(),
    }
    .to_bytes()?;
    let (commitment, salt) = commitment::commit(rng, &commit_data);

    let message = Message::broadcast(
        MessageType::Keygen(KeygenMessageType::R1Commit),
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

impl KeygenParticipant {
    /// Record the peers' commitments, open our own, and deal every peer its
    /// polynomial share.
    #[instrument(skip_all)]
    fn round_two<R: RngCore + CryptoRng>(
        &mut self,
        context: RoundOneContext,
        received: BTreeMap<PartyId, Vec<Message>>,
        _rng: &mut R,
    ) -> Result<(RoundTwoContext, Vec<Message>)> {
        info!("Generating keygen round two messages.");

        let mut peer_commitments = BTreeMap::new();
        for peer in self.params.other_parties() {
            let message = message_of_type(
                &received,
                peer,
                MessageType::Keygen(KeygenMessageType::R1Commit),
            )?;
            let commitment = Commitment::from_bytes(message.payload()).map_err(|_| {
                Error::MalformedPayload(Blame::new(peer, "malformed commitment"))
            })?;
            let _ = peer_commitments.insert(peer.clone(), commitment);
        }

        let mut messages = vec![Message::broadcast(
            MessageType::Keygen(KeygenMessageType::R2Decommit),
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
                MessageType::Keygen(KeygenMessageType::R2Share),
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
                    MessageType::Keygen(KeygenMessageType::R2Decommit),
                    MessageType::Keygen(KeygenMessageType::R2Share),
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

    /// Verify every opening and share, assemble the combined secret share and
    /// the joint public key, and broadcast our share point with a proof of
    /// knowledge.
    #[instrument(skip_all)]
    fn round_three<R: RngCore + CryptoRng>(
        &mut self,
        context: RoundTwoContext,
        received: BTreeMap<PartyId, Vec<Message>>,
        rng: &mut R,
    ) -> Result<(RoundThreeContext, Vec<Message>)> {
        info!("Generating keygen round three messages.");

        let order = k256_order();
        let my_index = self
            .params
            .index_of(self.params.party_id())
            .ok_or(Error::InternalInvariantFailed)?;

        let mut x_i = context.inner.polynomial.evaluate(my_index);
        let mut public_key = context.inner.vss_commitments[0];
        let mut all_vss = BTreeMap::new();
        let _ = all_vss.insert(
            self.params.party_id().clone(),
            context.inner.vss_commitments.clone(),
        );
        let mut peer_paillier_pks = BTreeMap::new();

        for peer in self.params.other_parties() {
            let decommit = message_of_type(
                &received,
                peer,
                MessageType::Keygen(KeygenMessageType::R2Decommit),
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

            let share_message = message_of_type(
                &received,
                peer,
                MessageType::Keygen(KeygenMessageType::R2Share),
            )?;
            let share = BigNumber::from_slice(share_message.payload());
            if !verify_share(&share, my_index, &commit_data.vss_commitments)? {
                return Err(Error::VssShareInvalid(Blame::new(
                    peer,
                    "vss share verification failed",
                )));
            }

            x_i = x_i.modadd(&share, &order);
            public_key = public_key + commit_data.vss_commitments[0];
            let _ = peer_paillier_pks.insert(peer.clone(), commit_data.encryption_key());
            let _ = all_vss.insert(peer.clone(), commit_data.vss_commitments);
        }

        let big_x_i = CurvePoint::GENERATOR.multiply_by_scalar(&x_i)?;
        let proof = SchnorrProof::prove(rng, self.params.session_id(), &x_i, &big_x_i)?;
        let payload = serialize!(&ProofPayload::new(&big_x_i, &proof))?;

        let message = Message::broadcast(
            MessageType::Keygen(KeygenMessageType::R3Proof),
            self.params.party_id(),
            3,
            payload,
        );

        self.inbox.await_round(
            3,
            uniform_contract(
                self.params.other_parties(),
                &[MessageType::Keygen(KeygenMessageType::R3Proof)],
            ),
        );

        Ok((
            RoundThreeContext {
                paillier_sk: context.inner.paillier_sk.clone(),
                x_i,
                big_x_i,
                public_key,
                all_vss,
                peer_paillier_pks,
            },
            vec![message],
        ))
    }

    /// Verify every peer's proof of knowledge and check each claimed share
    /// point against the value the VSS commitments predict.
    #[instrument(skip_all)]
    fn round_four(
        &mut self,
        context: RoundThreeContext,
        received: BTreeMap<PartyId, Vec<Message>>,
    ) -> Result<LocalKeyData> {
        info!("Finalizing keygen.");

        for peer in self.params.other_parties() {
            let message = message_of_type(
                &received,
                peer,
                MessageType::Keygen(KeygenMessageType::R3Proof),
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

            let peer_index = self
                .params
                .index_of(peer)
                .ok_or(Error::InternalInvariantFailed)?;
            let expected = predicted_share_point(&context.all_vss, peer_index)?;
            if big_x_j != expected {
                return Err(Error::VssShareInvalid(Blame::new(
                    peer,
                    "public key share mismatch",
                )));
            }
        }

        Ok(LocalKeyData {
            share_id: self
                .params
                .index_of(self.params.party_id())
                .ok_or(Error::InternalInvariantFailed)?,
            committee: self.params.parties().to_vec(),
            x_i: context.x_i.clone(),
            big_x_i: context.big_x_i,
            public_key: context.public_key,
            paillier_sk: context.paillier_sk.clone(),
            peer_paillier_pks: context.peer_paillier_pks.clone(),
        })
    }
}

/// The share point the VSS commitments predict for evaluation point `index`:
/// the sum over every contributing polynomial, evaluated in the exponent.
pub(crate) fn predicted_share_point(
    all_vss: &BTreeMap<PartyId, Vec<CurvePoint>>,
    index: usize,
) -> Result<CurvePoint> {
    let mut expected = CurvePoint::IDENTITY;
    for commitments in all_vss.values() {
        expected = expected + evaluate_in_exponent(commitments, index)?;
    }
    Ok(expected)
}
