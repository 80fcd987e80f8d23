// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pluggable crypto backend interface.

use cosesign_common::{CoseAlgorithm, CoseError, CoseHashAlgorithm};

/// Result of one call to [`CryptoBackend::sign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutcome {
    /// The signature was written to the start of the output buffer.
    Complete(usize),
    /// The operation budget ran out; call again to continue.
    InProgress,
}

/// Incremental hash over the to-be-signed bytes.
pub trait TbsHasher {
    fn update(&mut self, data: &[u8]);

    /// Write the digest to `out` and return its length.
    fn finish(self, out: &mut [u8]) -> Result<usize, CoseError>;
}

pub trait CryptoBackend {
    type SigningKey;
    /// Execution context of an interruptible signature (e.g. an operation
    /// budget). Opaque to the signing orchestration.
    type Context;
    type Hasher: TbsHasher;

    fn hasher(&self, alg: CoseHashAlgorithm) -> Result<Self::Hasher, CoseError>;

    /// Largest signature `sign` can produce for this algorithm and key.
    fn signature_size(&self, alg: CoseAlgorithm, key: &Self::SigningKey) -> Result<usize, CoseError>;

    /// Sign a to-be-signed hash.
    ///
    /// `restarting` is true when a previous call for the same hash returned
    /// [`SignOutcome::InProgress`]. Backends that cannot be interrupted never
    /// return `InProgress`.
    fn sign(
        &self,
        alg: CoseAlgorithm,
        key: &Self::SigningKey,
        context: Option<&mut Self::Context>,
        restarting: bool,
        hash: &[u8],
        out: &mut [u8],
    ) -> Result<SignOutcome, CoseError>;
}
