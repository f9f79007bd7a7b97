// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! End-to-end protocol tests, driving full sessions through an in-memory
//! message router.

use crate::errors::{Error, Result};
use crate::keygen::{KeygenParticipant, LocalKeyData};
use crate::messages::{KeygenMessageType, Message, MessageType};
use crate::protocol::{Parameters, PartyId, ProtocolParticipant, Status};
use crate::refresh::RefreshParticipant;
use crate::reshare::{ReshareInput, ReshareParticipant};
use crate::sign::{
    OnlineSignInput, OnlineSignParticipant, PreSignature, PresignInput, PresignParticipant,
    SignInput, SignParticipant, Signature,
};
use crate::utils::{get_test_rng, k256_order, lagrange_at_zero, CurvePoint};
use k256::ecdsa::signature::DigestVerifier;
use libpaillier::unknown_order::BigNumber;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const SESSION: &[u8] = b"test-session";

fn party_ids(ids: &[&str]) -> Vec<PartyId> {
    ids.iter().map(|id| PartyId::from(*id)).collect()
}

fn make_params(id: &str, ids: &[&str], threshold: usize, session: &[u8]) -> Parameters {
    Parameters::new(PartyId::from(id), party_ids(ids), threshold, session).unwrap()
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Deliver batches of same-round messages until no participant produces any
/// more. Within each batch the arrival order is shuffled.
fn route<P: ProtocolParticipant>(
    parties: &mut BTreeMap<PartyId, P>,
    mut pending: Vec<Message>,
    rng: &mut StdRng,
) -> Result<()> {
    while !pending.is_empty() {
        pending.shuffle(rng);
        let mut next = vec![];
        for message in &pending {
            let recipients: Vec<PartyId> = if message.is_broadcast() {
                parties
                    .keys()
                    .filter(|id| *id != message.from())
                    .cloned()
                    .collect()
            } else {
                message.to().to_vec()
            };
            for recipient in recipients {
                let participant = parties.get_mut(&recipient).unwrap();
                next.extend(participant.update(message, rng)?);
            }
        }
        pending = next;
    }
    Ok(())
}

fn run_keygen(
    rng: &mut StdRng,
    ids: &[&str],
    threshold: usize,
    session: &[u8],
) -> BTreeMap<PartyId, LocalKeyData> {
    let mut parties = BTreeMap::new();
    let mut pending = vec![];
    for id in ids {
        let (participant, messages) =
            KeygenParticipant::new(make_params(id, ids, threshold, session), (), rng).unwrap();
        let _ = parties.insert(PartyId::from(*id), participant);
        pending.extend(messages);
    }
    route(&mut parties, pending, rng).unwrap();

    parties
        .into_iter()
        .map(|(id, participant)| {
            assert_eq!(participant.status(), Status::Finished);
            (id, participant.result().unwrap().clone())
        })
        .collect()
}

fn run_sign(
    rng: &mut StdRng,
    keys: &BTreeMap<PartyId, LocalKeyData>,
    signer_ids: &[&str],
    threshold: usize,
    session: &[u8],
    digest: [u8; 32],
) -> BTreeMap<PartyId, Signature> {
    let mut parties = BTreeMap::new();
    let mut pending = vec![];
    for id in signer_ids {
        let party = PartyId::from(*id);
        let input = SignInput {
            key_data: keys.get(&party).unwrap().clone(),
            message_digest: digest,
        };
        let (participant, messages) =
            SignParticipant::new(make_params(id, signer_ids, threshold, session), input, rng)
                .unwrap();
        let _ = parties.insert(party, participant);
        pending.extend(messages);
    }
    route(&mut parties, pending, rng).unwrap();

    let signatures: BTreeMap<PartyId, Signature> = parties
        .into_iter()
        .map(|(id, participant)| {
            assert_eq!(participant.status(), Status::Finished);
            (id, participant.result().unwrap().clone())
        })
        .collect();

    // Every signer must land on the same signature.
    let mut iter = signatures.values();
    let first = iter.next().unwrap();
    for signature in iter {
        assert_eq!(signature, first);
    }
    signatures
}

fn assert_verifies(key_data: &LocalKeyData, message: &[u8], signature: &Signature) {
    let verifying_key = key_data.verifying_key().unwrap();
    let mut hasher = Sha256::new();
    hasher.update(message);
    let ecdsa_signature = signature.to_ecdsa().unwrap();
    verifying_key
        .verify_digest(hasher, &ecdsa_signature)
        .unwrap();
}

/////////////////////////
// Key generation      //
/////////////////////////

#[test]
fn keygen_three_parties() {
    let mut rng = get_test_rng();
    let keys = run_keygen(&mut rng, &["1", "2", "3"], 1, SESSION);

    // Everyone agrees on the joint public key.
    let reference = keys.values().next().unwrap().public_key();
    for key_data in keys.values() {
        assert_eq!(key_data.public_key(), reference);
    }

    for key_data in keys.values() {
        // X_i = x_i * G.
        let expected = CurvePoint::GENERATOR
            .multiply_by_scalar(&key_data.x_i)
            .unwrap();
        assert_eq!(key_data.public_share(), &expected);

        // The Paillier modulus is a full-size 2048-bit product.
        let bits = key_data.paillier_modulus_bits();
        assert!((2040..=2048).contains(&bits), "unexpected size {bits}");

        // Paillier keys of both peers were recorded.
        assert_eq!(key_data.peer_paillier_pks.len(), 2);
    }
}

#[test]
fn keygen_two_parties() {
    let mut rng = get_test_rng();
    let keys = run_keygen(&mut rng, &["1", "2"], 1, SESSION);
    let reference = keys.values().next().unwrap().public_key();
    for key_data in keys.values() {
        assert_eq!(key_data.public_key(), reference);
    }
}

#[test]
fn any_quorum_reconstructs_the_joint_public_key() {
    let mut rng = get_test_rng();
    let keys = run_keygen(&mut rng, &["1", "2", "3"], 1, SESSION);
    let order = k256_order();
    let public_key = *keys.values().next().unwrap().public_key();

    // For every subset of size t + 1, sum lambda_j * x_j = x.
    for subset in [[1usize, 2], [1, 3], [2, 3]] {
        let mut secret = BigNumber::zero();
        for key_data in keys.values() {
            if !subset.contains(&key_data.share_id()) {
                continue;
            }
            let lambda = lagrange_at_zero(&subset, key_data.share_id()).unwrap();
            secret = secret.modadd(&lambda.modmul(&key_data.x_i, &order), &order);
        }
        let expected = CurvePoint::GENERATOR.multiply_by_scalar(&secret).unwrap();
        assert_eq!(expected, public_key);
    }
}

/////////////////////////
// Signing             //
/////////////////////////

#[test]
fn sign_after_keygen() {
    let mut rng = get_test_rng();
    let keys = run_keygen(&mut rng, &["1", "2", "3"], 1, SESSION);
    let digest = sha256(b"hello world");

    let signatures = run_sign(&mut rng, &keys, &["1", "2", "3"], 1, SESSION, digest);

    let key_data = keys.values().next().unwrap();
    for signature in signatures.values() {
        assert_verifies(key_data, b"hello world", signature);
        assert!(signature.recovery_id().is_some());
    }
}

#[test]
fn sign_with_reduced_signing_set() {
    let mut rng = get_test_rng();
    let keys = run_keygen(&mut rng, &["1", "2", "3"], 1, SESSION);
    let digest = sha256(b"reduced quorum");

    // t + 1 = 2 parties suffice; party 3 keeps its evaluation point even
    // though the signing list has only two entries.
    let signatures = run_sign(&mut rng, &keys, &["1", "3"], 1, SESSION, digest);
    assert_verifies(
        keys.values().next().unwrap(),
        b"reduced quorum",
        signatures.values().next().unwrap(),
    );
}

/////////////////////////
// Presign / online    //
/////////////////////////

#[test]
fn presign_then_online_sign() {
    let mut rng = get_test_rng();
    let ids = ["1", "2", "3"];
    let keys = run_keygen(&mut rng, &ids, 1, SESSION);

    // Offline phase: no message digest involved.
    let mut parties = BTreeMap::new();
    let mut pending = vec![];
    for id in &ids {
        let party = PartyId::from(*id);
        let input = PresignInput {
            key_data: keys.get(&party).unwrap().clone(),
        };
        let (participant, messages) =
            PresignParticipant::new(make_params(id, &ids, 1, SESSION), input, &mut rng).unwrap();
        let _ = parties.insert(party, participant);
        pending.extend(messages);
    }
    route(&mut parties, pending, &mut rng).unwrap();

    let records: BTreeMap<PartyId, PreSignature> = parties
        .into_iter()
        .map(|(id, participant)| {
            assert_eq!(participant.status(), Status::Finished);
            (id, participant.result().unwrap().clone())
        })
        .collect();

    // All parties derived the same nonce point.
    let reference = records.values().next().unwrap().r_bytes();
    for record in records.values() {
        assert_eq!(record.r_bytes(), reference);
    }

    // Online phase: one broadcast round per party.
    let digest = sha256(b"batch-1");
    let mut parties = BTreeMap::new();
    let mut pending = vec![];
    for id in &ids {
        let party = PartyId::from(*id);
        let input = OnlineSignInput {
            key_data: keys.get(&party).unwrap().clone(),
            presignature: records.get(&party).unwrap().clone(),
            message_digest: digest,
        };
        let (participant, messages) =
            OnlineSignParticipant::new(make_params(id, &ids, 1, SESSION), input, &mut rng)
                .unwrap();
        let _ = parties.insert(party, participant);
        pending.extend(messages);
    }
    route(&mut parties, pending, &mut rng).unwrap();

    for participant in parties.values() {
        assert_eq!(participant.status(), Status::Finished);
        assert_verifies(
            keys.values().next().unwrap(),
            b"batch-1",
            participant.result().unwrap(),
        );
    }
}

/////////////////////////
// Key refresh         //
/////////////////////////

#[test]
fn refresh_preserves_public_key_and_rotates_shares() {
    let mut rng = get_test_rng();
    let ids = ["1", "2", "3"];
    let keys = run_keygen(&mut rng, &ids, 1, SESSION);
    let public_key = *keys.values().next().unwrap().public_key();

    let mut parties = BTreeMap::new();
    let mut pending = vec![];
    for id in &ids {
        let party = PartyId::from(*id);
        let (participant, messages) = RefreshParticipant::new(
            make_params(id, &ids, 1, b"test-session-refresh"),
            keys.get(&party).unwrap().clone(),
            &mut rng,
        )
        .unwrap();
        let _ = parties.insert(party, participant);
        pending.extend(messages);
    }
    route(&mut parties, pending, &mut rng).unwrap();

    let new_keys: BTreeMap<PartyId, LocalKeyData> = parties
        .into_iter()
        .map(|(id, participant)| {
            assert_eq!(participant.status(), Status::Finished);
            (id, participant.result().unwrap().clone())
        })
        .collect();

    // The joint public key is untouched.
    for key_data in new_keys.values() {
        assert_eq!(key_data.public_key(), &public_key);
    }

    // The shares themselves rotated.
    let rotated = new_keys
        .iter()
        .filter(|(id, key_data)| keys.get(*id).unwrap().x_i != key_data.x_i)
        .count();
    assert!(rotated >= 2, "only {rotated} of 3 shares rotated");

    // The refreshed key material still signs.
    let digest = sha256(b"post-refresh");
    let signatures = run_sign(&mut rng, &new_keys, &ids, 1, b"sign-after-refresh", digest);
    assert_verifies(
        new_keys.values().next().unwrap(),
        b"post-refresh",
        signatures.values().next().unwrap(),
    );
}

/////////////////////////
// Key resharing       //
/////////////////////////

#[test]
fn reshare_to_changed_committee() {
    let mut rng = get_test_rng();
    let old_ids = ["1", "2", "3"];
    let new_ids = ["1", "2", "4"];
    let keys = run_keygen(&mut rng, &old_ids, 1, SESSION);
    let public_key = *keys.values().next().unwrap().public_key();

    let mut parties = BTreeMap::new();
    let mut pending = vec![];
    for id in ["1", "2", "3", "4"] {
        let party = PartyId::from(id);
        let input = ReshareInput {
            old_parties: party_ids(&old_ids),
            old_threshold: 1,
            old_key_data: keys.get(&party).cloned(),
        };
        let (participant, messages) = ReshareParticipant::new(
            make_params(id, &new_ids, 1, b"test-session-reshare"),
            input,
            &mut rng,
        )
        .unwrap();
        let _ = parties.insert(party, participant);
        pending.extend(messages);
    }
    route(&mut parties, pending, &mut rng).unwrap();

    let mut new_keys = BTreeMap::new();
    for (id, participant) in parties {
        assert_eq!(participant.status(), Status::Finished);
        match participant.result().unwrap() {
            Some(key_data) => {
                assert!(new_ids.contains(&id.as_str()));
                assert_eq!(key_data.public_key(), &public_key);
                let _ = new_keys.insert(id, key_data.clone());
            }
            // The departing party helps and verifies but gets no share.
            None => assert_eq!(id.as_str(), "3"),
        }
    }
    assert_eq!(new_keys.len(), 3);

    // The new committee signs under the same public key.
    let digest = sha256(b"post-reshare");
    let signatures = run_sign(
        &mut rng,
        &new_keys,
        &new_ids,
        1,
        b"sign-after-reshare",
        digest,
    );
    assert_verifies(
        new_keys.values().next().unwrap(),
        b"post-reshare",
        signatures.values().next().unwrap(),
    );
}

/////////////////////////
// Identifiable abort  //
/////////////////////////

/// Deliver one batch, collecting produced messages and per-recipient
/// failures instead of stopping at the first error.
fn deliver_collect(
    parties: &mut BTreeMap<PartyId, KeygenParticipant>,
    batch: &[Message],
    rng: &mut StdRng,
) -> (Vec<Message>, Vec<(PartyId, Error)>) {
    let mut next = vec![];
    let mut failures = vec![];
    for message in batch {
        let recipients: Vec<PartyId> = if message.is_broadcast() {
            parties
                .keys()
                .filter(|id| *id != message.from())
                .cloned()
                .collect()
        } else {
            message.to().to_vec()
        };
        for recipient in recipients {
            let participant = parties.get_mut(&recipient).unwrap();
            if participant.status() == Status::Aborted {
                continue;
            }
            match participant.update(message, rng) {
                Ok(messages) => next.extend(messages),
                Err(error) => failures.push((recipient, error)),
            }
        }
    }
    (next, failures)
}

/// Start a keygen session and run it until the batch of `round`-numbered
/// messages is in hand.
fn keygen_until_round(
    rng: &mut StdRng,
    ids: &[&str],
    round: u32,
) -> (BTreeMap<PartyId, KeygenParticipant>, Vec<Message>) {
    let mut parties = BTreeMap::new();
    let mut batch = vec![];
    for id in ids {
        let (participant, messages) =
            KeygenParticipant::new(make_params(id, ids, 1, SESSION), (), rng).unwrap();
        let _ = parties.insert(PartyId::from(*id), participant);
        batch.extend(messages);
    }
    while batch[0].round() < round {
        let (next, failures) = deliver_collect(&mut parties, &batch, rng);
        assert!(failures.is_empty());
        batch = next;
    }
    (parties, batch)
}

/// Flip one payload byte of party `culprit`'s message of the given type.
fn tamper(batch: Vec<Message>, culprit: &str, message_type: MessageType, at: usize) -> Vec<Message> {
    batch
        .into_iter()
        .map(|message| {
            if message.from().as_str() == culprit && message.message_type() == message_type {
                let mut payload = message.payload().to_vec();
                payload[at] ^= 0x01;
                Message::new(
                    message.message_type(),
                    message.from().clone(),
                    message.to().to_vec(),
                    message.round(),
                    payload,
                )
            } else {
                message
            }
        })
        .collect()
}

#[test]
fn tampered_decommit_blames_the_sender() {
    let mut rng = get_test_rng();
    let (mut parties, round_two) = keygen_until_round(&mut rng, &["1", "2", "3"], 2);
    let round_two = tamper(
        round_two,
        "2",
        MessageType::Keygen(KeygenMessageType::R2Decommit),
        40,
    );

    let (_, failures) = deliver_collect(&mut parties, &round_two, &mut rng);

    // Both honest receivers must name party 2.
    assert_eq!(failures.len(), 2);
    for (recipient, error) in &failures {
        assert_ne!(recipient.as_str(), "2");
        let blame = error.blame().expect("expected a blamed error");
        assert_eq!(blame.party.as_str(), "2");
        assert_eq!(blame.reason, "commitment verification failed");
    }

    // No state advanced to completion.
    for participant in parties.values() {
        assert!(participant.result().is_none());
    }
}

#[test]
fn tampered_vss_share_blames_the_sender() {
    let mut rng = get_test_rng();
    let (mut parties, round_two) = keygen_until_round(&mut rng, &["1", "2", "3"], 2);
    // The share is a raw scalar; any bit flip breaks it.
    let round_two = tamper(
        round_two,
        "3",
        MessageType::Keygen(KeygenMessageType::R2Share),
        7,
    );

    let (_, failures) = deliver_collect(&mut parties, &round_two, &mut rng);

    // Shares are point-to-point, so each tampered copy burns one receiver.
    assert_eq!(failures.len(), 2);
    for (recipient, error) in &failures {
        assert_ne!(recipient.as_str(), "3");
        let blame = error.blame().expect("expected a blamed error");
        assert_eq!(blame.party.as_str(), "3");
        assert_eq!(blame.reason, "vss share verification failed");
    }
}

#[test]
fn tampered_schnorr_proof_blames_the_sender() {
    let mut rng = get_test_rng();
    let (mut parties, round_three) = keygen_until_round(&mut rng, &["1", "2", "3"], 3);
    let round_three = tamper(
        round_three,
        "1",
        MessageType::Keygen(KeygenMessageType::R3Proof),
        10,
    );

    let (_, failures) = deliver_collect(&mut parties, &round_three, &mut rng);

    assert_eq!(failures.len(), 2);
    for (recipient, error) in &failures {
        assert_ne!(recipient.as_str(), "1");
        let blame = error.blame().expect("expected a blamed error");
        assert_eq!(blame.party.as_str(), "1");
    }
}

/////////////////////////
// Input validation    //
/////////////////////////

#[test]
fn sign_rejects_party_outside_the_committee() {
    let mut rng = get_test_rng();
    let keys = run_keygen(&mut rng, &["1", "2", "3"], 1, SESSION);
    let input = SignInput {
        key_data: keys.get(&PartyId::from("1")).unwrap().clone(),
        message_digest: sha256(b"nope"),
    };
    // Party 9 never took part in keygen.
    let result = SignParticipant::new(make_params("1", &["1", "9"], 1, SESSION), input, &mut rng);
    assert!(matches!(result, Err(Error::InvalidParameters(_))));
}

#[test]
fn refresh_rejects_committee_mismatch() {
    let mut rng = get_test_rng();
    let keys = run_keygen(&mut rng, &["1", "2", "3"], 1, SESSION);
    let result = RefreshParticipant::new(
        make_params("1", &["1", "2"], 1, SESSION),
        keys.get(&PartyId::from("1")).unwrap().clone(),
        &mut rng,
    );
    assert!(matches!(result, Err(Error::InvalidParameters(_))));
}

#[test]
fn reshare_rejects_a_party_in_neither_committee() {
    let mut rng = get_test_rng();
    let input = ReshareInput {
        old_parties: party_ids(&["1", "2", "3"]),
        old_threshold: 1,
        old_key_data: None,
    };
    let result = ReshareParticipant::new(
        make_params("9", &["1", "2", "4"], 1, SESSION),
        input,
        &mut rng,
    );
    assert!(matches!(result, Err(Error::NotInCommittee(_))));
}

/////////////////////////
// Engine gating       //
/////////////////////////

#[test]
fn future_round_messages_are_rejected_and_stale_ones_ignored() {
    let mut rng = get_test_rng();
    let ids = ["1", "2", "3"];
    let mut parties = BTreeMap::new();
    let mut round_one = vec![];
    for id in &ids {
        let (participant, messages) =
            KeygenParticipant::new(make_params(id, &ids, 1, SESSION), (), &mut rng).unwrap();
        let _ = parties.insert(PartyId::from(*id), participant);
        round_one.extend(messages);
    }

    // While collecting round 1, a round-3 message is out of order.
    let early = Message::new(
        MessageType::Keygen(KeygenMessageType::R3Proof),
        PartyId::from("2"),
        vec![],
        3,
        vec![1, 2, 3],
    );
    let participant = parties.get_mut(&PartyId::from("1")).unwrap();
    assert!(matches!(
        participant.update(&early, &mut rng),
        Err(Error::OutOfOrderRound {
            current: 1,
            received: 3
        })
    ));

    // Advance party 1 into round 2, then replay a round-1 commitment: it is
    // dropped without error or output.
    let commits: Vec<Message> = round_one
        .iter()
        .filter(|m| m.from().as_str() != "1")
        .cloned()
        .collect();
    let participant = parties.get_mut(&PartyId::from("1")).unwrap();
    for message in &commits {
        let _ = participant.update(message, &mut rng).unwrap();
    }
    assert_eq!(participant.status(), Status::InProgress { round: 2 });
    let replay = participant.update(&commits[0], &mut rng).unwrap();
    assert!(replay.is_empty());
    assert_eq!(participant.status(), Status::InProgress { round: 2 });
}

#[test]
fn duplicate_messages_are_rejected_without_losing_state() {
    let mut rng = get_test_rng();
    let ids = ["1", "2", "3"];
    let mut parties = BTreeMap::new();
    let mut pending = vec![];
    for id in &ids {
        let (participant, messages) =
            KeygenParticipant::new(make_params(id, &ids, 1, SESSION), (), &mut rng).unwrap();
        let _ = parties.insert(PartyId::from(*id), participant);
        pending.extend(messages);
    }

    // Feed party 1 the same commitment twice.
    let commit_from_2 = pending
        .iter()
        .find(|m| m.from().as_str() == "2")
        .unwrap()
        .clone();
    let participant = parties.get_mut(&PartyId::from("1")).unwrap();
    let _ = participant.update(&commit_from_2, &mut rng).unwrap();
    assert!(matches!(
        participant.update(&commit_from_2, &mut rng),
        Err(Error::DuplicateMessage { .. })
    ));
    assert_eq!(participant.status(), Status::InProgress { round: 1 });

    // The duplicate left the session intact: it still runs to completion.
    // Party 1 already holds party 2's commitment, so hand that one to party 3
    // directly and route the rest.
    let _ = parties
        .get_mut(&PartyId::from("3"))
        .unwrap()
        .update(&commit_from_2, &mut rng)
        .unwrap();
    let rest: Vec<Message> = pending
        .into_iter()
        .filter(|m| m.from().as_str() != "2")
        .collect();
    route(&mut parties, rest, &mut rng).unwrap();
    for participant in parties.values() {
        assert_eq!(participant.status(), Status::Finished);
    }
}
