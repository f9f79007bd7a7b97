// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Zero-knowledge proofs used by the protocols.
//!
//! Only the Schnorr proof of discrete-logarithm knowledge is part of this
//! engine. The remaining CGGMP proof suite (range proofs, affine-operation
//! proofs) is intentionally absent: the message flow leaves room for the
//! extra fields, but the honest-but-curious model holds without them.

pub(crate) mod schnorr;
