// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use cosesign_common::{CborEncoder, CoseError, ParameterList};

use crate::{SignInputs, SignStatus};

/// A signer that can be placed in a message builder's signer chain.
///
/// Contract:
/// - `headers` returns this signer's header parameters (e.g. `alg`, `kid`).
///   It is called before any signature material is produced.
/// - `sign` emits one complete COSE_Signature array entry (its own headers
///   and the signature bytes) for COSE_Sign.
/// - `sign1` emits only the signature byte string for COSE_Sign1; the body
///   headers are written by the builder.
///
/// Both signing operations may return `Progress::InProgress`. The builder then
/// calls the same operation again with the same inputs and encoder; output
/// already emitted (headers, reserved signature region) must not be emitted a
/// second time.
/// - `abandon` drops any suspended signature so the next call starts a new
///   entry. The builder calls it when a partially produced message is
///   discarded.
pub trait CoseSigner {
    fn headers(&self) -> ParameterList;

    fn sign(&mut self, inputs: &SignInputs<'_>, encoder: &mut CborEncoder<'_>) -> Result<SignStatus, CoseError>;

    fn sign1(&mut self, inputs: &SignInputs<'_>, encoder: &mut CborEncoder<'_>) -> Result<SignStatus, CoseError>;

    fn abandon(&mut self) {}
}
