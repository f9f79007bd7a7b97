// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The interactive five-round signing state machine.

use crate::engine::{uniform_contract, Gate, RoundInbox};
use crate::errors::{Error, Result};
use crate::keygen::LocalKeyData;
use crate::messages::{Message, MessageType, SignMessageType};
use crate::protocol::{Parameters, ProtocolParticipant, Status};
use crate::sign::rounds::{
    self, MtaContext, NonceContext, NoncePoint, ShareContext, SigningSetup,
};
use crate::sign::Signature;
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};

/// Input to an interactive signing session.
#[derive(Debug, Clone)]
pub struct SignInput {
    /// The key material produced by keygen, refresh, or reshare.
    pub key_data: LocalKeyData,
    /// The 32-byte message digest to sign.
    pub message_digest: [u8; 32],
}

#[derive(Debug)]
enum State {
    RoundOne(NonceContext),
    RoundTwo {
        nonce: NonceContext,
        mta: MtaContext,
    },
    RoundThree(ShareContext),
    RoundFour {
        nonce_point: NoncePoint,
        s_i: BigNumber,
    },
    Finished(Signature),
    Aborted,
}

/// A [`ProtocolParticipant`] that produces an ECDSA signature over a message
/// digest.
///
/// # Protocol input
/// A [`SignInput`]: this party's key material and the digest.
///
/// # Protocol output
/// A [`Signature`] that verifies against the key's joint public key. All
/// participants obtain the same signature.
#[derive(Debug)]
pub struct SignParticipant {
    setup: SigningSetup,
    m: BigNumber,
    inbox: RoundInbox,
    state: State,
}

impl ProtocolParticipant for SignParticipant {
    type Input = SignInput;
    type Output = Signature;

    fn new<R: RngCore + CryptoRng>(
        params: Parameters,
        input: Self::Input,
        rng: &mut R,
    ) -> Result<(Self, Vec<Message>)> {
        let setup = SigningSetup::new(params, input.key_data)?;
        let m = rounds::digest_to_bn(&input.message_digest);

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
                m,
                inbox,
                state: State::RoundOne(nonce),
            },
            vec![message],
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
            State::RoundOne(nonce) => {
                let (mta, messages) = rounds::round_two(&self.setup, &nonce, &received, rng)?;
                self.inbox.await_round(
                    2,
                    uniform_contract(
                        self.setup.params().other_parties(),
                        &[MessageType::Sign(SignMessageType::R2Mta)],
                    ),
                );
                self.state = State::RoundTwo { nonce, mta };
                Ok(messages)
            }
            State::RoundTwo { nonce, mta } => {
                let (shares, message) =
                    rounds::round_three(&self.setup, &nonce, &mta, &received)?;
                self.inbox.await_round(
                    3,
                    uniform_contract(
                        self.setup.params().other_parties(),
                        &[MessageType::Sign(SignMessageType::R3Delta)],
                    ),
                );
                self.state = State::RoundThree(shares);
                Ok(vec![message])
            }
            State::RoundThree(shares) => {
                let nonce_point =
                    rounds::reconstruct_nonce_point(&self.setup, &shares, &received)?;
                let s_i = rounds::partial_signature(
                    &self.m,
                    &shares.k_i,
                    &nonce_point.r,
                    &shares.sigma_i,
                );
                let message = rounds::partial_signature_message(&self.setup, &s_i)?;
                self.inbox.await_round(
                    4,
                    uniform_contract(
                        self.setup.params().other_parties(),
                        &[MessageType::Sign(SignMessageType::R4PartialSig)],
                    ),
                );
                self.state = State::RoundFour { nonce_point, s_i };
                Ok(vec![message])
            }
            State::RoundFour { nonce_point, s_i } => {
                let signature =
                    rounds::round_five(&self.setup, &nonce_point, &s_i, &self.m, &received)?;
                self.state = State::Finished(signature);
                Ok(vec![])
            }
            State::Finished(_) | State::Aborted => Err(Error::ProtocolDone),
        }
    }

    fn result(&self) -> Option<&Self::Output> {
        match &self.state {
            State::Finished(signature) => Some(signature),
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
            State::Finished(_) => "Sign Finished".to_string(),
            State::Aborted => "Sign Aborted".to_string(),
            _ => format!("Sign Round {}", self.inbox.round()),
        }
    }
}
