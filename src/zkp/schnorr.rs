// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Non-interactive Schnorr proof of knowledge of a discrete logarithm.
//!
//! Proves knowledge of `x` such that `X = x * G`, made non-interactive with a
//! Fiat-Shamir transcript. The challenge transcript is seeded with a domain
//! label and absorbs the session identifier and the canonical affine
//! encodings of both `X` and the commitment `R`, so proofs cannot be replayed
//! across sessions or statements.

use crate::errors::{Error, Result};
use crate::utils::{
    k256_order, positive_bn_random_from_transcript, random_nonzero_bn, CurvePoint,
};
use libpaillier::unknown_order::BigNumber;
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;

/// A Schnorr proof `(R, s)` with `R = k * G` and `s = k + e * x mod q`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SchnorrProof {
    /// Commitment to the proof nonce.
    big_r: CurvePoint,
    /// Response binding the nonce, the challenge, and the secret.
    s: BigNumber,
}

impl SchnorrProof {
    /// Prove knowledge of `x` with `big_x = x * G`.
    pub(crate) fn prove<R: RngCore + CryptoRng>(
        rng: &mut R,
        session_id: &[u8],
        x: &BigNumber,
        big_x: &CurvePoint,
    ) -> Result<Self> {
        let order = k256_order();

        let k = random_nonzero_bn(rng, &order)?;
        let big_r = CurvePoint::GENERATOR.multiply_by_scalar(&k)?;

        let e = challenge(session_id, big_x, &big_r);
        let s = k.modadd(&e.modmul(x, &order), &order);

        Ok(Self { big_r, s })
    }

    /// Verify this proof against the statement `big_x`.
    pub(crate) fn verify(&self, session_id: &[u8], big_x: &CurvePoint) -> Result<()> {
        let order = k256_order();
        if self.s < BigNumber::zero() || self.s >= order {
            return Err(Error::InternalInvariantFailed);
        }

        let e = challenge(session_id, big_x, &self.big_r);

        // s * G == R + e * X
        let lhs = CurvePoint::GENERATOR.multiply_by_scalar(&self.s)?;
        let rhs = self.big_r + big_x.multiply_by_scalar(&e)?;
        if lhs == rhs {
            Ok(())
        } else {
            Err(Error::InternalInvariantFailed)
        }
    }

    /// The wire encoding: R as a 33-byte SEC1 compressed point, s as
    /// big-endian scalar bytes.
    pub(crate) fn to_wire(&self) -> (Vec<u8>, Vec<u8>) {
        (self.big_r.to_compressed_bytes(), self.s.to_bytes())
    }

    /// Decode a proof from its wire encoding.
    pub(crate) fn from_wire(big_r: &[u8], s: &[u8]) -> Result<Self> {
        Ok(Self {
            big_r: CurvePoint::from_compressed_bytes(big_r)?,
            s: BigNumber::from_slice(s),
        })
    }
}

/// The Fiat-Shamir challenge `e` in [0, q).
fn challenge(session_id: &[u8], big_x: &CurvePoint, big_r: &CurvePoint) -> BigNumber {
    let mut transcript = Transcript::new(b"schnorr dlog proof");
    transcript.append_message(b"session id", session_id);
    transcript.append_message(b"public point", &affine_encoding(big_x));
    transcript.append_message(b"nonce commitment", &affine_encoding(big_r));
    positive_bn_random_from_transcript(&mut transcript, &k256_order())
}

fn affine_encoding(point: &CurvePoint) -> [u8; 64] {
    let (x, y) = point.to_affine_bytes();
    let mut encoding = [0u8; 64];
    encoding[..32].copy_from_slice(&x);
    encoding[32..].copy_from_slice(&y);
    encoding
}
