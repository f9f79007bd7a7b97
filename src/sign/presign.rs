// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The offline/online split of signing.
//!
//! [`PresignParticipant`] runs signing rounds one through three without a
//! message and stops after deriving the nonce point, leaving a
//! [`PreSignature`]. [`OnlineSignParticipant`] later spends that presignature
//! on a digest: one broadcast of the partial signature, then the same
//! aggregation and verification as interactive signing.

use crate::engine::{uniform_contract, Gate, RoundInbox};
use crate::errors::{Error, Result};
use crate::keygen::LocalKeyData;
use crate::messages::{Message, MessageType, SignMessageType};
use crate::protocol::{Parameters, ProtocolParticipant, Status};
use crate::sign::record::PreSignature;
use crate::sign::rounds::{
    self, MtaContext, NonceContext, NoncePoint, ShareContext, SigningSetup,
};
use crate::sign::Signature;
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};

/// Input to an offline signing session.
#[derive(Debug, Clone)]
pub struct PresignInput {
    /// The key material produced by keygen, refresh, or reshare.
    pub key_data: LocalKeyData,
}

#[derive(Debug)]
enum PresignState {
    RoundOne(NonceContext),
    RoundTwo {
        nonce: NonceContext,
        mta: MtaContext,
    },
    RoundThree(ShareContext),
    Finished(PreSignature),
    Aborted,
}

/// A [`ProtocolParticipant`] that precomputes signing material before the
/// message is known.
///
/// # Protocol input
/// A [`PresignInput`].
///
/// # Protocol output
/// A [`PreSignature`]. All participants derive the same nonce point; the
/// secret components are per-party.
#[derive(Debug)]
pub struct PresignParticipant {
    setup: SigningSetup,
    inbox: RoundInbox,
    state: PresignState,
}

impl ProtocolParticipant for PresignParticipant {
    type Input = PresignInput;
    type Output = PreSignature;

    fn new<R: RngCore + CryptoRng>(
        params: Parameters,
        input: Self::Input,
        rng: &mut R,
    ) -> Result<(Self, Vec<Message>)> {
        let setup = SigningSetup::new(params, input.key_data)?;

        let mut inbox = RoundInbox::new(
            setup.params().party_id().clone(),
            setup.params().parties().iter().cloned(),
        );
        let (nonce, message) = rounds::round_one(&setup, rng)?;
        inbox.await_round(
            1,
            uniform_contract(
                setup.params().other_parties(),
                &[MessageType::Sign(SignMessageType::R1NonceCommit)],
            ),
        );

        Ok((
            Self {
                setup,
                inbox,
                state: PresignState::RoundOne(nonce),
            },
            vec![message],
        ))
    }

    fn update<R: RngCore + CryptoRng>(
        &mut self,
        message: &Message,
        rng: &mut R,
    ) -> Result<Vec<Message>> {
        if matches!(
            self.state,
            PresignState::Finished(_) | PresignState::Aborted
        ) {
            return Err(Error::ProtocolDone);
        }
        if matches!(self.inbox.accept(message)?, Gate::Ignored) {
            return Ok(vec![]);
        }
        if !self.inbox.is_complete() {
            return Ok(vec![]);
        }

        let received = self.inbox.take_received();
        match std::mem::replace(&mut self.state, PresignState::Aborted) {
            PresignState::RoundOne(nonce) => {
                let (mta, messages) = rounds::round_two(&self.setup, &nonce, &received, rng)?;
                self.inbox.await_round(
                    2,
                    uniform_contract(
                        self.setup.params().other_parties(),
                        &[MessageType::Sign(SignMessageType::R2Mta)],
                    ),
                );
                self.state = PresignState::RoundTwo { nonce, mta };
                Ok(messages)
            }
            PresignState::RoundTwo { nonce, mta } => {
                let (shares, message) =
                    rounds::round_three(&self.setup, &nonce, &mta, &received)?;
                self.inbox.await_round(
                    3,
                    uniform_contract(
                        self.setup.params().other_parties(),
                        &[MessageType::Sign(SignMessageType::R3Delta)],
                    ),
                );
                self.state = PresignState::RoundThree(shares);
                Ok(vec![message])
            }
            PresignState::RoundThree(shares) => {
                // The message is unknown, so signing stops here: derive the
                // nonce point and store the per-party secrets for the online
                // round.
                let nonce_point =
                    rounds::reconstruct_nonce_point(&self.setup, &shares, &received)?;
                self.state = PresignState::Finished(PreSignature {
                    r: nonce_point.r.clone(),
                    big_r: nonce_point.big_r,
                    k_i: shares.k_i.clone(),
                    sigma_i: shares.sigma_i.clone(),
                });
                Ok(vec![])
            }
            PresignState::Finished(_) | PresignState::Aborted => Err(Error::ProtocolDone),
        }
    }

    fn result(&self) -> Option<&Self::Output> {
        match &self.state {
            PresignState::Finished(record) => Some(record),
            _ => None,
        }
    }

    fn status(&self) -> Status {
        match &self.state {
            PresignState::Finished(_) => Status::Finished,
            PresignState::Aborted => Status::Aborted,
            _ => Status::InProgress {
                round: self.inbox.round(),
            },
        }
    }

    fn details(&self) -> String {
        match &self.state {
            PresignState::Finished(_) => "Presign Finished".to_string(),
            PresignState::Aborted => "Presign Aborted".to_string(),
            _ => format!("Presign Round {}", self.inbox.round()),
        }
    }
}

/// Input to an online signing session.
#[derive(Debug, Clone)]
pub struct OnlineSignInput {
    /// The key material the presignature was created under.
    pub key_data: LocalKeyData,
    /// A fresh, unspent presignature.
    pub presignature: PreSignature,
    /// The 32-byte message digest to sign.
    pub message_digest: [u8; 32],
}

#[derive(Debug)]
enum OnlineState {
    RoundFour {
        nonce_point: NoncePoint,
        s_i: BigNumber,
    },
    Finished(Signature),
    Aborted,
}

/// A [`ProtocolParticipant`] that turns a [`PreSignature`] and a digest into
/// a signature in a single broadcast round.
///
/// The partial signature goes out at construction; the participant then
/// collects the peers' partials and runs the usual aggregation and
/// verification.
#[derive(Debug)]
pub struct OnlineSignParticipant {
    setup: SigningSetup,
    m: BigNumber,
    inbox: RoundInbox,
    state: OnlineState,
}

impl ProtocolParticipant for OnlineSignParticipant {
    type Input = OnlineSignInput;
    type Output = Signature;

    fn new<R: RngCore + CryptoRng>(
        params: Parameters,
        input: Self::Input,
        _rng: &mut R,
    ) -> Result<(Self, Vec<Message>)> {
        let setup = SigningSetup::new(params, input.key_data)?;
        let m = rounds::digest_to_bn(&input.message_digest);

        let nonce_point = NoncePoint {
            r: input.presignature.r.clone(),
            big_r: input.presignature.big_r,
        };
        let s_i = rounds::partial_signature(
            &m,
            &input.presignature.k_i,
            &nonce_point.r,
            &input.presignature.sigma_i,
        );
        let message = rounds::partial_signature_message(&setup, &s_i)?;

        let mut inbox = RoundInbox::new(
            setup.params().party_id().clone(),
            setup.params().parties().iter().cloned(),
        );
        inbox.await_round(
            4,
            uniform_contract(
                setup.params().other_parties(),
                &[MessageType::Sign(SignMessageType::R4PartialSig)],
            ),
        );

        Ok((
            Self {
                setup,
                m,
                inbox,
                state: OnlineState::RoundFour { nonce_point, s_i },
            },
            vec![message],
        ))
    }

    fn update<R: RngCore + CryptoRng>(
        &mut self,
        message: &Message,
        _rng: &mut R,
    ) -> Result<Vec<Message>> {
        if matches!(self.state, OnlineState::Finished(_) | OnlineState::Aborted) {
            return Err(Error::ProtocolDone);
        }
        if matches!(self.inbox.accept(message)?, Gate::Ignored) {
            return Ok(vec![]);
        }
        if !self.inbox.is_complete() {
            return Ok(vec![]);
        }

        let received = self.inbox.take_received();
        match std::mem::replace(&mut self.state, OnlineState::Aborted) {
            OnlineState::RoundFour { nonce_point, s_i } => {
                let signature =
                    rounds::round_five(&self.setup, &nonce_point, &s_i, &self.m, &received)?;
                self.state = OnlineState::Finished(signature);
                Ok(vec![])
            }
            OnlineState::Finished(_) | OnlineState::Aborted => Err(Error::ProtocolDone),
        }
    }

    fn result(&self) -> Option<&Self::Output> {
        match &self.state {
            OnlineState::Finished(signature) => Some(signature),
            _ => None,
        }
    }

    fn status(&self) -> Status {
        match &self.state {
            OnlineState::Finished(_) => Status::Finished,
            OnlineState::Aborted => Status::Aborted,
            _ => Status::InProgress {
                round: self.inbox.round(),
            },
        }
    }

    fn details(&self) -> String {
        match &self.state {
            OnlineState::Finished(_) => "Online Sign Finished".to_string(),
            OnlineState::Aborted => "Online Sign Aborted".to_string(),
            _ => format!("Online Sign Round {}", self.inbox.round()),
        }
    }
}
