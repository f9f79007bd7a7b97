// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Distributed key generation.
//!
//! Four rounds produce, on every party, a [`LocalKeyData`] holding a Shamir
//! share of a joint ECDSA key that no party ever knows in full:
//!
//! 1. each party samples a Paillier key pair and a random degree-t polynomial
//!    and broadcasts a hash commitment to (Paillier N, Feldman VSS points);
//! 2. each party opens its commitment and sends every peer its polynomial
//!    share point-to-point;
//! 3. each party verifies openings and shares, assembles its combined share
//!    x_i and the joint public key, and broadcasts X_i = x_i * G with a
//!    Schnorr proof of knowledge;
//! 4. each party verifies all proofs and checks every X_j against the value
//!    the VSS commitments predict.
//!
//! Any failed check aborts the protocol and names the offending party.

pub(crate) mod commit;
mod keyshare;
mod participant;

pub use keyshare::LocalKeyData;
pub use participant::KeygenParticipant;
pub(crate) use participant::ProofPayload;
