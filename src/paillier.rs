// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Paillier additively homomorphic encryption.
//!
//! The multiplicative-to-additive conversion inside signing only needs a
//! minimal surface: key generation, encryption (optionally with a
//! caller-supplied nonce), decryption, ciphertext addition, and
//! ciphertext-by-plaintext multiplication. N-squared stays an implementation
//! detail of this module.

use crate::errors::Result;
use crate::parameters::{
    CRYPTOGRAPHIC_RETRY_MAX, PAILLIER_MODULUS_BITS, PAILLIER_MODULUS_MIN_BITS,
};
use crate::utils::random_bn_in_z_star;
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;
use zeroize::ZeroizeOnDrop;

/// Paillier-specific errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaillierError {
    /// The requested modulus size is below the minimum.
    #[error("modulus must be at least {PAILLIER_MODULUS_MIN_BITS} bits")]
    ModulusTooSmall,
    /// Key generation failed to produce an acceptable prime pair.
    #[error("failed to create a Paillier key from the generated primes")]
    CouldNotCreateKey,
    /// A plaintext was outside the range [0, N).
    #[error("plaintext out of range for this Paillier key")]
    PlaintextOutOfRange,
    /// A ciphertext was outside the range [0, N^2).
    #[error("ciphertext out of range for this Paillier key")]
    CiphertextOutOfRange,
    /// A decryption produced no valid plaintext.
    #[error("decryption of a Paillier ciphertext failed")]
    DecryptionFailed,

    #[cfg(test)]
    /// The test prime pool ran dry.
    #[error("no pre-generated primes with size {0}")]
    NoPregeneratedPrimes(usize),
}

/// A Paillier ciphertext, an element of Z*_{N^2}.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Ciphertext(BigNumber);

impl Ciphertext {
    /// The big-endian byte encoding used on the wire.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Decode a ciphertext from big-endian bytes.
    pub(crate) fn from_slice(bytes: impl AsRef<[u8]>) -> Self {
        Self(BigNumber::from_slice(bytes))
    }
}

/// The randomness used by an encryption.
#[derive(Clone, Debug, Serialize, Deserialize, ZeroizeOnDrop)]
pub(crate) struct Nonce(BigNumber);

/// A Paillier public key: the modulus N, with N^2 cached.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct EncryptionKey {
    n: BigNumber,
    nn: BigNumber,
}

impl EncryptionKey {
    /// Build an encryption key from a modulus received from a peer.
    pub(crate) fn from_modulus(n: BigNumber) -> Self {
        let nn = &n * &n;
        Self { n, nn }
    }

    /// The modulus N.
    pub(crate) fn modulus(&self) -> &BigNumber {
        &self.n
    }

    /// The bit length of the modulus.
    pub(crate) fn bit_length(&self) -> usize {
        self.n.bit_length()
    }

    /// Encrypt `m` in [0, N) with fresh randomness, returning the ciphertext
    /// and the nonce that produced it.
    pub(crate) fn encrypt<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        m: &BigNumber,
    ) -> Result<(Ciphertext, Nonce)> {
        let nonce = Nonce(random_bn_in_z_star(rng, &self.n)?);
        let ciphertext = self.encrypt_with_nonce(m, &nonce)?;
        Ok((ciphertext, nonce))
    }

    /// Deterministic encryption with a caller-supplied nonce:
    /// `c = (1 + N*m) * r^N mod N^2`.
    pub(crate) fn encrypt_with_nonce(&self, m: &BigNumber, nonce: &Nonce) -> Result<Ciphertext> {
        if m < &BigNumber::zero() || m >= &self.n {
            Err(PaillierError::PlaintextOutOfRange)?;
        }
        let gm = (&self.n * m) + BigNumber::one();
        let rn = nonce.0.modpow(&self.n, &self.nn);
        Ok(Ciphertext(gm.modmul(&rn, &self.nn)))
    }

    /// Homomorphic addition: `Dec(add(Enc(a), Enc(b))) = a + b mod N`.
    pub(crate) fn add(&self, c1: &Ciphertext, c2: &Ciphertext) -> Result<Ciphertext> {
        self.check_ciphertext(c1)?;
        self.check_ciphertext(c2)?;
        Ok(Ciphertext(c1.0.modmul(&c2.0, &self.nn)))
    }

    /// Homomorphic scalar multiplication:
    /// `Dec(scalar_mul(Enc(a), k)) = a * k mod N`.
    pub(crate) fn scalar_mul(&self, c: &Ciphertext, k: &BigNumber) -> Result<Ciphertext> {
        self.check_ciphertext(c)?;
        Ok(Ciphertext(c.0.modpow(k, &self.nn)))
    }

    fn check_ciphertext(&self, c: &Ciphertext) -> Result<()> {
        if c.0 < BigNumber::zero() || c.0 >= self.nn {
            Err(PaillierError::CiphertextOutOfRange)?;
        }
        Ok(())
    }
}

/// A Paillier private key: `lambda = lcm(p-1, q-1)` and
/// `mu = lambda^-1 mod N`. The secret components are zeroized on drop.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, ZeroizeOnDrop)]
pub(crate) struct DecryptionKey {
    #[zeroize(skip)]
    pk: EncryptionKey,
    lambda: BigNumber,
    mu: BigNumber,
}

impl Debug for DecryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("paillier::DecryptionKey")
            .field("pk", &self.pk)
            .field("lambda", &"[redacted]")
            .field("mu", &"[redacted]")
            .finish()
    }
}

impl DecryptionKey {
    /// Generate a fresh key pair whose modulus is `bits` long.
    ///
    /// Fails for `bits` below 1024. The two primes are drawn independently at
    /// `bits / 2`; pairs whose product misses the target length or whose
    /// lambda is not invertible are redrawn.
    pub(crate) fn generate<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> Result<Self> {
        if bits < PAILLIER_MODULUS_MIN_BITS {
            Err(PaillierError::ModulusTooSmall)?;
        }

        for _ in 0..CRYPTOGRAPHIC_RETRY_MAX {
            let (p, q) = Self::prime_pair(rng, bits / 2)?;
            if p == q {
                continue;
            }
            let n = &p * &q;

            // lambda = lcm(p-1, q-1) = (p-1)(q-1) / gcd(p-1, q-1)
            let p_minus_one = &p - BigNumber::one();
            let q_minus_one = &q - BigNumber::one();
            let gcd = p_minus_one.gcd(&q_minus_one);
            let lambda = (&p_minus_one * &q_minus_one) / gcd;

            let Some(mu) = lambda.invert(&n) else {
                continue;
            };

            return Ok(Self {
                pk: EncryptionKey::from_modulus(n),
                lambda,
                mu,
            });
        }
        Err(PaillierError::CouldNotCreateKey)?
    }

    /// Generate a key pair with the default 2048-bit modulus.
    pub(crate) fn generate_default<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        Self::generate(rng, PAILLIER_MODULUS_BITS)
    }

    #[cfg(not(test))]
    fn prime_pair<R: RngCore + CryptoRng>(
        _rng: &mut R,
        prime_bits: usize,
    ) -> Result<(BigNumber, BigNumber)> {
        Ok((BigNumber::prime(prime_bits), BigNumber::prime(prime_bits)))
    }

    // Prime generation dominates test time, so tests draw from a
    // pre-generated pool instead (the pool is insecure by construction and
    // compiled out of non-test builds).
    #[cfg(test)]
    fn prime_pair<R: RngCore + CryptoRng>(
        rng: &mut R,
        prime_bits: usize,
    ) -> Result<(BigNumber, BigNumber)> {
        prime_gen::get_prime_pair_from_pool_insecure(rng, prime_bits)
    }

    /// The public half of this key.
    pub(crate) fn encryption_key(&self) -> &EncryptionKey {
        &self.pk
    }

    /// Decrypt a ciphertext: `m = L(c^lambda mod N^2) * mu mod N` where
    /// `L(u) = (u - 1) / N`.
    pub(crate) fn decrypt(&self, c: &Ciphertext) -> Result<BigNumber> {
        self.pk.check_ciphertext(c)?;
        let u = c.0.modpow(&self.lambda, &self.pk.nn);
        let l = (u - BigNumber::one()) / &self.pk.n;
        Ok(l.modmul(&self.mu, &self.pk.n))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{get_test_rng, random_positive_bn};

    fn test_key(rng: &mut (impl RngCore + CryptoRng)) -> DecryptionKey {
        DecryptionKey::generate_default(rng).unwrap()
    }

    #[test]
    fn rejects_small_moduli() {
        let mut rng = get_test_rng();
        assert!(matches!(
            DecryptionKey::generate(&mut rng, 512),
            Err(crate::errors::Error::Paillier(
                PaillierError::ModulusTooSmall
            ))
        ));
    }

    #[test]
    fn modulus_has_expected_size() {
        let mut rng = get_test_rng();
        let sk = test_key(&mut rng);
        let bits = sk.encryption_key().bit_length();
        assert!((2040..=2048).contains(&bits), "unexpected size {bits}");
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let mut rng = get_test_rng();
        let sk = test_key(&mut rng);
        let pk = sk.encryption_key().clone();

        let m = random_positive_bn(&mut rng, pk.modulus());
        let (c, _) = pk.encrypt(&mut rng, &m).unwrap();
        assert_eq!(sk.decrypt(&c).unwrap(), m);
    }

    #[test]
    fn encrypt_with_nonce_is_deterministic() {
        let mut rng = get_test_rng();
        let sk = test_key(&mut rng);
        let pk = sk.encryption_key().clone();

        let m = random_positive_bn(&mut rng, pk.modulus());
        let (c, nonce) = pk.encrypt(&mut rng, &m).unwrap();
        let c2 = pk.encrypt_with_nonce(&m, &nonce).unwrap();
        assert_eq!(sk.decrypt(&c).unwrap(), sk.decrypt(&c2).unwrap());
    }

    #[test]
    fn rejects_out_of_range_plaintext() {
        let mut rng = get_test_rng();
        let sk = test_key(&mut rng);
        let pk = sk.encryption_key().clone();
        assert!(pk.encrypt(&mut rng, pk.modulus()).is_err());
    }

    #[test]
    fn homomorphic_addition() {
        let mut rng = get_test_rng();
        let sk = test_key(&mut rng);
        let pk = sk.encryption_key().clone();
        let order = crate::utils::k256_order();

        let a = random_positive_bn(&mut rng, &order);
        let b = random_positive_bn(&mut rng, &order);
        let (ca, _) = pk.encrypt(&mut rng, &a).unwrap();
        let (cb, _) = pk.encrypt(&mut rng, &b).unwrap();

        let sum = sk.decrypt(&pk.add(&ca, &cb).unwrap()).unwrap();
        assert_eq!(sum, (&a + &b) % pk.modulus());
    }

    #[test]
    fn homomorphic_scalar_multiplication() {
        let mut rng = get_test_rng();
        let sk = test_key(&mut rng);
        let pk = sk.encryption_key().clone();
        let order = crate::utils::k256_order();

        let a = random_positive_bn(&mut rng, &order);
        let k = random_positive_bn(&mut rng, &order);
        let (ca, _) = pk.encrypt(&mut rng, &a).unwrap();

        let product = sk.decrypt(&pk.scalar_mul(&ca, &k).unwrap()).unwrap();
        assert_eq!(product, (&a * &k) % pk.modulus());
    }
}
