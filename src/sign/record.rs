// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The artefact of an offline signing run.

use crate::utils::CurvePoint;
use libpaillier::unknown_order::BigNumber;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use zeroize::ZeroizeOnDrop;

/// The output of the offline signing phase: everything a party needs to turn
/// a message digest into its partial signature in one round.
///
/// A presignature is bound to the signing set it was created with and must be
/// used at most once; reuse leaks the key share.
#[derive(Clone, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct PreSignature {
    /// The x-coordinate of the nonce point, reduced mod q.
    #[zeroize(skip)]
    pub(crate) r: BigNumber,
    /// The full nonce point R, kept for recovery-id derivation.
    #[zeroize(skip)]
    pub(crate) big_r: CurvePoint,
    /// This party's nonce share k_i.
    pub(crate) k_i: BigNumber,
    /// This party's masked key share sigma_i.
    pub(crate) sigma_i: BigNumber,
}

impl Debug for PreSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreSignature")
            .field("r", &self.r)
            .field("big_r", &self.big_r)
            .field("k_i", &"[redacted]")
            .field("sigma_i", &"[redacted]")
            .finish()
    }
}

impl PreSignature {
    /// The r scalar this presignature will sign with.
    pub fn r_bytes(&self) -> [u8; 32] {
        super::fixed_bytes(&self.r)
    }
}
