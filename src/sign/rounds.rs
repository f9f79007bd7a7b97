// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The round bodies shared by interactive signing, presigning, and the online
//! phase.

use crate::engine::message_of_type;
use crate::errors::{Blame, Error, Result};
use crate::keygen::LocalKeyData;
use crate::messages::{Message, MessageType, SignMessageType};
use crate::paillier::Ciphertext;
use crate::protocol::{Parameters, PartyId};
use crate::sign::Signature;
use crate::utils::{k256_order, lagrange_at_zero, random_positive_bn, CurvePoint};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{info, instrument};
use zeroize::ZeroizeOnDrop;

/// Round-one broadcast: the Paillier encryption of the nonce share and the
/// commitment point Gamma_i.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RoundOnePayload {
    enc_k: Vec<u8>,
    gamma_x: [u8; 32],
    gamma_y: [u8; 32],
}

/// Round-two point-to-point MtA response: ciphertexts contributing to the
/// receiver's delta and sigma shares.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MtaPayload {
    c_delta: Vec<u8>,
    c_sigma: Vec<u8>,
}

/// Round-three broadcast: the sender's delta share in the clear.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DeltaPayload {
    delta: Vec<u8>,
}

/// Round-four broadcast: the sender's partial signature.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PartialSigPayload {
    s_i: Vec<u8>,
}

/// Validated, immutable inputs of one signing session.
pub(crate) struct SigningSetup {
    params: Parameters,
    key_data: LocalKeyData,
    /// This party's evaluation point in the key's committee.
    my_point: usize,
    /// The Lagrange-reweighted key share `w_i = lambda_i * x_i mod q`, so
    /// that the w_i of the signing set sum to the joint secret.
    w_i: BigNumber,
}

impl Debug for SigningSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSetup")
            .field("party", self.params.party_id())
            .field("signers", &self.params.parties())
            .field("my_point", &self.my_point)
            .field("w_i", &"[redacted]")
            .finish()
    }
}

impl SigningSetup {
    pub(crate) fn new(params: Parameters, key_data: LocalKeyData) -> Result<Self> {
        params.require_membership()?;
        if params.parties().len() < params.threshold() + 1 {
            return Err(Error::InvalidParameters(format!(
                "signing needs at least {} parties, got {}",
                params.threshold() + 1,
                params.parties().len()
            )));
        }

        let mut points = Vec::with_capacity(params.parties().len());
        for party in params.parties() {
            let point = key_data.evaluation_point(party).ok_or_else(|| {
                Error::InvalidParameters(format!(
                    "party {party} is not a member of the key's committee"
                ))
            })?;
            points.push(point);
        }
        let my_point = key_data
            .evaluation_point(params.party_id())
            .ok_or(Error::InternalInvariantFailed)?;

        let order = k256_order();
        let lambda = lagrange_at_zero(&points, my_point)?;
        let w_i = lambda.modmul(&key_data.x_i, &order);

        Ok(Self {
            params,
            key_data,
            my_point,
            w_i,
        })
    }

    pub(crate) fn params(&self) -> &Parameters {
        &self.params
    }

    pub(crate) fn key_data(&self) -> &LocalKeyData {
        &self.key_data
    }
}

/// Secrets sampled in round one.
#[derive(Debug, ZeroizeOnDrop)]
pub(crate) struct NonceContext {
    pub(crate) k_i: BigNumber,
    pub(crate) gamma_i: BigNumber,
    #[zeroize(skip)]
    pub(crate) big_gamma_i: CurvePoint,
}

/// Per-peer state produced by the MtA round.
#[derive(Debug)]
pub(crate) struct MtaContext {
    pub(crate) peer_gammas: BTreeMap<PartyId, CurvePoint>,
    betas: BTreeMap<PartyId, BigNumber>,
    nus: BTreeMap<PartyId, BigNumber>,
}

/// State carried out of round three: the local shares that feed the nonce
/// point and the partial signature.
#[derive(Debug, ZeroizeOnDrop)]
pub(crate) struct ShareContext {
    pub(crate) k_i: BigNumber,
    pub(crate) sigma_i: BigNumber,
    pub(crate) delta_i: BigNumber,
    #[zeroize(skip)]
    pub(crate) big_gamma_i: CurvePoint,
    #[zeroize(skip)]
    pub(crate) peer_gammas: BTreeMap<PartyId, CurvePoint>,
}

/// The reconstructed nonce point and its reduced x-coordinate.
#[derive(Debug, Clone)]
pub(crate) struct NoncePoint {
    pub(crate) r: BigNumber,
    pub(crate) big_r: CurvePoint,
}

/// Interpret a 32-byte digest as an integer mod q, the reduction standard
/// ECDSA applies to prehashes.
pub(crate) fn digest_to_bn(digest: &[u8; 32]) -> BigNumber {
    BigNumber::from_slice(digest) % k256_order()
}

/// Round one: sample `k_i` and `gamma_i`, encrypt `k_i` under our own
/// Paillier key, and broadcast the ciphertext with `Gamma_i = gamma_i * G`.
#[instrument(skip_all)]
pub(crate) fn round_one<R: RngCore + CryptoRng>(
    setup: &SigningSetup,
    rng: &mut R,
) -> Result<(NonceContext, Message)> {
    info!("Generating signing round one message.");

    let order = k256_order();
    let k_i = random_positive_bn(rng, &order);
    let gamma_i = random_positive_bn(rng, &order);
    let big_gamma_i = CurvePoint::GENERATOR.multiply_by_scalar(&gamma_i)?;

    let own_pk = setup.key_data.paillier_sk.encryption_key();
    let (enc_k, _) = own_pk.encrypt(rng, &k_i)?;

    let (gamma_x, gamma_y) = big_gamma_i.to_affine_bytes();
    let payload = serialize!(&RoundOnePayload {
        enc_k: enc_k.to_bytes(),
        gamma_x,
        gamma_y,
    })?;

    let message = Message::broadcast(
        MessageType::Sign(SignMessageType::R1NonceCommit),
        setup.params.party_id(),
        1,
        payload,
    );

    Ok((
        NonceContext {
            k_i,
            gamma_i,
            big_gamma_i,
        },
        message,
    ))
}

/// Round two: for every peer, fold our `gamma_i` and `w_i` into its
/// encrypted nonce share, masked with fresh `beta`/`nu` values.
#[instrument(skip_all)]
pub(crate) fn round_two<R: RngCore + CryptoRng>(
    setup: &SigningSetup,
    nonce: &NonceContext,
    received: &BTreeMap<PartyId, Vec<Message>>,
    rng: &mut R,
) -> Result<(MtaContext, Vec<Message>)> {
    info!("Generating signing round two messages.");

    let mut peer_gammas = BTreeMap::new();
    let mut betas = BTreeMap::new();
    let mut nus = BTreeMap::new();
    let mut messages = Vec::new();

    for peer in setup.params.other_parties() {
        let message = message_of_type(
            received,
            peer,
            MessageType::Sign(SignMessageType::R1NonceCommit),
        )?;
        let payload: RoundOnePayload = deserialize!(message.payload())
            .map_err(|_| Error::MalformedPayload(Blame::new(peer, "malformed nonce payload")))?;
        let big_gamma_j = CurvePoint::from_affine_bytes(&payload.gamma_x, &payload.gamma_y)
            .map_err(|_| Error::MalformedPayload(Blame::new(peer, "malformed nonce payload")))?;
        let enc_k_j = Ciphertext::from_slice(&payload.enc_k);

        let peer_pk = setup.key_data.peer_paillier_pk(peer)?;
        let beta = random_positive_bn(rng, peer_pk.modulus());
        let nu = random_positive_bn(rng, peer_pk.modulus());

        let malformed =
            |_| Error::MalformedPayload(Blame::new(peer, "invalid nonce ciphertext"));
        let (enc_beta, _) = peer_pk.encrypt(rng, &beta)?;
        let c_delta = peer_pk
            .add(
                &peer_pk
                    .scalar_mul(&enc_k_j, &nonce.gamma_i)
                    .map_err(malformed)?,
                &enc_beta,
            )
            .map_err(malformed)?;
        let (enc_nu, _) = peer_pk.encrypt(rng, &nu)?;
        let c_sigma = peer_pk
            .add(
                &peer_pk
                    .scalar_mul(&enc_k_j, &setup.w_i)
                    .map_err(malformed)?,
                &enc_nu,
            )
            .map_err(malformed)?;

        messages.push(Message::p2p(
            MessageType::Sign(SignMessageType::R2Mta),
            setup.params.party_id(),
            peer,
            2,
            serialize!(&MtaPayload {
                c_delta: c_delta.to_bytes(),
                c_sigma: c_sigma.to_bytes(),
            })?,
        ));

        let _ = peer_gammas.insert(peer.clone(), big_gamma_j);
        let _ = betas.insert(peer.clone(), beta);
        let _ = nus.insert(peer.clone(), nu);
    }

    Ok((
        MtaContext {
            peer_gammas,
            betas,
            nus,
        },
        messages,
    ))
}

/// Round three: decrypt every MtA response and assemble the additive shares
/// `delta_i = k_i gamma_i + sum alpha - sum beta` and
/// `sigma_i = k_i w_i + sum mu - sum nu`, then broadcast `delta_i`.
#[instrument(skip_all)]
pub(crate) fn round_three(
    setup: &SigningSetup,
    nonce: &NonceContext,
    mta: &MtaContext,
    received: &BTreeMap<PartyId, Vec<Message>>,
) -> Result<(ShareContext, Message)> {
    info!("Generating signing round three message.");

    let order = k256_order();
    let mut delta_i = nonce.k_i.modmul(&nonce.gamma_i, &order);
    let mut sigma_i = nonce.k_i.modmul(&setup.w_i, &order);

    for peer in setup.params.other_parties() {
        let message =
            message_of_type(received, peer, MessageType::Sign(SignMessageType::R2Mta))?;
        let payload: MtaPayload = deserialize!(message.payload())
            .map_err(|_| Error::MalformedPayload(Blame::new(peer, "malformed MtA payload")))?;

        let sk = &setup.key_data.paillier_sk;
        let alpha = sk
            .decrypt(&Ciphertext::from_slice(&payload.c_delta))
            .map_err(|_| {
                Error::PaillierDecryptError(Blame::new(peer, "paillier decryption failed"))
            })?;
        let mu = sk
            .decrypt(&Ciphertext::from_slice(&payload.c_sigma))
            .map_err(|_| {
                Error::PaillierDecryptError(Blame::new(peer, "paillier decryption failed"))
            })?;

        let beta = mta
            .betas
            .get(peer)
            .ok_or_else(|| Error::MissingPeerData(peer.clone()))?;
        let nu = mta
            .nus
            .get(peer)
            .ok_or_else(|| Error::MissingPeerData(peer.clone()))?;

        delta_i = delta_i.modadd(&alpha, &order).modsub(beta, &order);
        sigma_i = sigma_i.modadd(&mu, &order).modsub(nu, &order);
    }

    let message = Message::broadcast(
        MessageType::Sign(SignMessageType::R3Delta),
        setup.params.party_id(),
        3,
        serialize!(&DeltaPayload {
            delta: delta_i.to_bytes(),
        })?,
    );

    Ok((
        ShareContext {
            k_i: nonce.k_i.clone(),
            sigma_i,
            delta_i,
            big_gamma_i: nonce.big_gamma_i,
            peer_gammas: mta.peer_gammas.clone(),
        },
        message,
    ))
}

/// Reconstruct the nonce point from the delta shares:
/// `R = (sum delta_j)^-1 * sum Gamma_j`, `r = R_x mod q`.
///
/// A zero delta or a zero r means the session consumed bad luck, not bad
/// faith; the caller restarts with fresh randomness.
#[instrument(skip_all)]
pub(crate) fn reconstruct_nonce_point(
    setup: &SigningSetup,
    shares: &ShareContext,
    received: &BTreeMap<PartyId, Vec<Message>>,
) -> Result<NoncePoint> {
    let order = k256_order();

    let mut delta = shares.delta_i.clone();
    let mut big_gamma = shares.big_gamma_i;
    for peer in setup.params.other_parties() {
        let message =
            message_of_type(received, peer, MessageType::Sign(SignMessageType::R3Delta))?;
        let payload: DeltaPayload = deserialize!(message.payload())
            .map_err(|_| Error::MalformedPayload(Blame::new(peer, "malformed delta payload")))?;
        delta = delta.modadd(&BigNumber::from_slice(&payload.delta), &order);

        let gamma_j = shares
            .peer_gammas
            .get(peer)
            .ok_or_else(|| Error::MissingPeerData(peer.clone()))?;
        big_gamma = big_gamma + *gamma_j;
    }

    let delta_inverse = delta.invert(&order).ok_or(Error::NonInvertibleDelta)?;
    let big_r = big_gamma.multiply_by_scalar(&delta_inverse)?;
    let r = big_r.x_mod_order();
    if r == BigNumber::zero() {
        return Err(Error::RZero);
    }

    Ok(NoncePoint { r, big_r })
}

/// The partial signature `s_i = m * k_i + r * sigma_i mod q`.
pub(crate) fn partial_signature(
    m: &BigNumber,
    k_i: &BigNumber,
    r: &BigNumber,
    sigma_i: &BigNumber,
) -> BigNumber {
    let order = k256_order();
    m.modmul(k_i, &order).modadd(&r.modmul(sigma_i, &order), &order)
}

/// The round-four broadcast carrying `s_i`.
pub(crate) fn partial_signature_message(
    setup: &SigningSetup,
    s_i: &BigNumber,
) -> Result<Message> {
    Ok(Message::broadcast(
        MessageType::Sign(SignMessageType::R4PartialSig),
        setup.params.party_id(),
        4,
        serialize!(&PartialSigPayload {
            s_i: s_i.to_bytes(),
        })?,
    ))
}

/// Round five: aggregate the partial signatures and accept only if the
/// result passes standard ECDSA verification against the joint public key.
#[instrument(skip_all)]
pub(crate) fn round_five(
    setup: &SigningSetup,
    nonce_point: &NoncePoint,
    s_i: &BigNumber,
    m: &BigNumber,
    received: &BTreeMap<PartyId, Vec<Message>>,
) -> Result<Signature> {
    info!("Aggregating partial signatures.");

    let order = k256_order();
    let mut s = s_i.clone();
    for peer in setup.params.other_parties() {
        let message = message_of_type(
            received,
            peer,
            MessageType::Sign(SignMessageType::R4PartialSig),
        )?;
        let payload: PartialSigPayload = deserialize!(message.payload()).map_err(|_| {
            Error::MalformedPayload(Blame::new(peer, "malformed partial signature"))
        })?;
        s = s.modadd(&BigNumber::from_slice(&payload.s_i), &order);
    }

    crate::utils::ecdsa_verify_prehash(setup.key_data.public_key(), m, &nonce_point.r, &s)?;

    Ok(Signature::new(
        nonce_point.r.clone(),
        s,
        Some(recovery_id(&nonce_point.big_r)),
    ))
}

/// The recovery id of a signature whose nonce point is `big_r`.
fn recovery_id(big_r: &CurvePoint) -> u8 {
    let (x, y) = big_r.to_affine_bytes();
    let mut v = y[31] & 1;
    if BigNumber::from_slice(x) >= k256_order() {
        v |= 2;
    }
    v
}
