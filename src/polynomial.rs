// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Secret-sharing polynomials over the scalar field of secp256k1, and the
//! Feldman commitments that make their shares verifiable.

use crate::errors::{Error, Result};
use crate::utils::{k256_order, random_positive_bn, CurvePoint};
use libpaillier::unknown_order::BigNumber;
use rand::{CryptoRng, RngCore};
use zeroize::ZeroizeOnDrop;

/// A polynomial `f(x) = a_0 + a_1 x + ... + a_t x^t` with coefficients in
/// Z_q. The constant term is the shared secret.
#[derive(Debug, Clone, ZeroizeOnDrop)]
pub(crate) struct Polynomial {
    coefficients: Vec<BigNumber>,
}

impl Polynomial {
    /// Generate a random polynomial of the given degree.
    ///
    /// When `secret` is provided it becomes the constant term (zero for a
    /// refresh polynomial, the old share for resharing); otherwise the
    /// constant term is drawn uniformly at random like every other
    /// coefficient.
    pub(crate) fn new<R: RngCore + CryptoRng>(
        rng: &mut R,
        degree: usize,
        secret: Option<&BigNumber>,
    ) -> Self {
        let order = k256_order();
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(match secret {
            Some(secret) => secret % &order,
            None => random_positive_bn(rng, &order),
        });
        for _ in 0..degree {
            coefficients.push(random_positive_bn(rng, &order));
        }
        Self { coefficients }
    }

    /// The shared secret `f(0)`.
    pub(crate) fn constant_term(&self) -> &BigNumber {
        &self.coefficients[0]
    }

    /// Evaluate `f` at the 1-based party index `x` via Horner's rule, mod q.
    pub(crate) fn evaluate(&self, x: usize) -> BigNumber {
        let order = k256_order();
        let x = BigNumber::from(x as u64);
        let mut result = self.coefficients[self.coefficients.len() - 1].clone();
        for coefficient in self.coefficients.iter().rev().skip(1) {
            result = result.modmul(&x, &order).modadd(coefficient, &order);
        }
        result
    }

    /// The Feldman commitment `(a_0 G, ..., a_t G)` to this polynomial.
    pub(crate) fn feldman_commitments(&self) -> Result<Vec<CurvePoint>> {
        self.coefficients
            .iter()
            .map(|coefficient| CurvePoint::GENERATOR.multiply_by_scalar(coefficient))
            .collect()
    }
}

/// Evaluate a committed polynomial "in the exponent" at the 1-based index
/// `x`: `sum_k x^k * A_k`.
pub(crate) fn evaluate_in_exponent(commitments: &[CurvePoint], x: usize) -> Result<CurvePoint> {
    let order = k256_order();
    let x = BigNumber::from(x as u64);
    let mut sum = CurvePoint::IDENTITY;
    for (k, commitment) in commitments.iter().enumerate() {
        let scalar = x.modpow(&BigNumber::from(k as u64), &order);
        sum = sum + commitment.multiply_by_scalar(&scalar)?;
    }
    Ok(sum)
}

/// Check a claimed share against a Feldman commitment:
/// `share * G == sum_k x^k * A_k`.
pub(crate) fn verify_share(
    share: &BigNumber,
    x: usize,
    commitments: &[CurvePoint],
) -> Result<bool> {
    if commitments.is_empty() {
        return Err(Error::InternalInvariantFailed);
    }
    let lhs = CurvePoint::GENERATOR.multiply_by_scalar(share)?;
    let rhs = evaluate_in_exponent(commitments, x)?;
    Ok(lhs == rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::get_test_rng;

    #[test]
    fn respects_fixed_constant_term() {
        let mut rng = get_test_rng();
        let secret = BigNumber::from(42u64);
        let poly = Polynomial::new(&mut rng, 3, Some(&secret));
        assert_eq!(poly.constant_term(), &secret);

        let zero_hole = Polynomial::new(&mut rng, 3, Some(&BigNumber::zero()));
        assert_eq!(zero_hole.constant_term(), &BigNumber::zero());
    }

    #[test]
    fn evaluation_matches_naive_sum() {
        let mut rng = get_test_rng();
        let order = k256_order();
        let poly = Polynomial::new(&mut rng, 4, None);
        for x in 1usize..=5 {
            let x_bn = BigNumber::from(x as u64);
            let mut expected = BigNumber::zero();
            for (k, coefficient) in poly.coefficients.iter().enumerate() {
                let term =
                    coefficient.modmul(&x_bn.modpow(&BigNumber::from(k as u64), &order), &order);
                expected = expected.modadd(&term, &order);
            }
            assert_eq!(poly.evaluate(x), expected);
        }
    }

    #[test]
    fn shares_verify_against_commitments() {
        let mut rng = get_test_rng();
        let poly = Polynomial::new(&mut rng, 2, None);
        let commitments = poly.feldman_commitments().unwrap();
        for x in 1usize..=4 {
            assert!(verify_share(&poly.evaluate(x), x, &commitments).unwrap());
        }
        // A share for index 1 must not verify for index 2.
        assert!(!verify_share(&poly.evaluate(1), 2, &commitments).unwrap());
    }

    #[test]
    fn zero_hole_commitment_starts_at_identity() {
        let mut rng = get_test_rng();
        let poly = Polynomial::new(&mut rng, 2, Some(&BigNumber::zero()));
        let commitments = poly.feldman_commitments().unwrap();
        assert!(commitments[0].is_identity());
        assert!(verify_share(&poly.evaluate(3), 3, &commitments).unwrap());
    }
}
