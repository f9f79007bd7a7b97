// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! A network-agnostic threshold ECDSA engine over secp256k1.
//!
//! A fixed group of parties jointly generates an ECDSA key such that no party
//! ever holds the full private key, then collaboratively produces signatures
//! any standard ECDSA verifier accepts against the joint public key. The
//! crate implements the protocol engine only: message-driven, round-based
//! state machines for
//!
//! - [distributed key generation](keygen::KeygenParticipant),
//! - [threshold signing](sign::SignParticipant) with an
//!   [offline](sign::PresignParticipant)/[online](sign::OnlineSignParticipant)
//!   split,
//! - [proactive key refresh](refresh::RefreshParticipant), and
//! - [committee resharing](reshare::ReshareParticipant).
//!
//! Transport, session orchestration, and persistence of key material are the
//! caller's concern: construct a participant (its round-one messages come
//! back immediately), deliver every inbound [`Message`] through
//! [`ProtocolParticipant::update`], disseminate the messages it returns, and
//! collect the output once the participant reports
//! [`Status::Finished`](protocol::Status).
//!
//! The engine follows the honest-but-curious variant of the CGGMP-style
//! protocol family: Feldman verifiable secret sharing, hash commitments,
//! Paillier-based multiplicative-to-additive conversion, and Schnorr proofs
//! of knowledge on the final shares, with identifiable aborts naming any
//! party whose payload fails verification.

#![warn(missing_docs)]

#[macro_use]
pub mod errors;
mod commitment;
mod engine;
pub mod keygen;
pub mod messages;
mod paillier;
mod parameters;
mod polynomial;
pub mod protocol;
pub mod refresh;
pub mod reshare;
pub mod sign;
#[cfg(test)]
mod test_primes;
#[cfg(test)]
mod tests;
mod utils;
mod zkp;

pub use errors::{Blame, Error, Result};
pub use keygen::{KeygenParticipant, LocalKeyData};
pub use messages::{Message, MessageType};
pub use paillier::PaillierError;
pub use protocol::{Curve, Parameters, PartyId, ProtocolParticipant, Status};
pub use refresh::RefreshParticipant;
pub use reshare::{ReshareInput, ReshareParticipant};
pub use sign::{
    OnlineSignInput, OnlineSignParticipant, PreSignature, PresignInput, PresignParticipant,
    SignInput, SignParticipant, Signature,
};
pub use utils::CurvePoint;
