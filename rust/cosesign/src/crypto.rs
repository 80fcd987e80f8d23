// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Crypto backend built on the RustCrypto ECDSA and SHA-2 crates.
//!
//! Signatures are deterministic (RFC 6979), so a signature produced across
//! several interrupted calls is identical to one produced in a single call.

use cosesign_abstractions::{CryptoBackend, SignOutcome, TbsHasher};
use cosesign_common::{CoseAlgorithm, CoseError, CoseHashAlgorithm};
use sha2::{Digest as _, Sha256, Sha384, Sha512};
use signature::hazmat::PrehashSigner;

/// ECDSA signing key.
#[derive(Clone)]
pub enum EcSigningKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

impl EcSigningKey {
    /// Algorithm this key signs with.
    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            EcSigningKey::P256(_) => CoseAlgorithm::ES256,
            EcSigningKey::P384(_) => CoseAlgorithm::ES384,
        }
    }

    /// Budget units needed for one signature: one per scalar bit, the
    /// double-and-add steps of the scalar multiplication.
    fn sign_ops(&self) -> u32 {
        match self {
            EcSigningKey::P256(_) => 256,
            EcSigningKey::P384(_) => 384,
        }
    }
}

impl From<p256::ecdsa::SigningKey> for EcSigningKey {
    fn from(k: p256::ecdsa::SigningKey) -> Self {
        EcSigningKey::P256(k)
    }
}

impl From<p384::ecdsa::SigningKey> for EcSigningKey {
    fn from(k: p384::ecdsa::SigningKey) -> Self {
        EcSigningKey::P384(k)
    }
}

/// Operation budget for interruptible signing.
///
/// Each call to [`CryptoBackend::sign`] spends at most `max_ops` units; a
/// signature that needs more returns [`SignOutcome::InProgress`] and
/// continues on the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpsBudget {
    max_ops: u32,
    consumed: u32,
}

impl OpsBudget {
    /// A budget of `max_ops_per_call` units per call (at least one).
    pub fn new(max_ops_per_call: u32) -> Self {
        Self {
            max_ops: max_ops_per_call.max(1),
            consumed: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(u32::MAX)
    }

    /// Units spent on the current signature so far.
    pub fn consumed(&self) -> u32 {
        self.consumed
    }
}

pub enum Sha2Hasher {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl TbsHasher for Sha2Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Sha2Hasher::Sha256(h) => h.update(data),
            Sha2Hasher::Sha384(h) => h.update(data),
            Sha2Hasher::Sha512(h) => h.update(data),
        }
    }

    fn finish(self, out: &mut [u8]) -> Result<usize, CoseError> {
        let digest = match self {
            Sha2Hasher::Sha256(h) => h.finalize().to_vec(),
            Sha2Hasher::Sha384(h) => h.finalize().to_vec(),
            Sha2Hasher::Sha512(h) => h.finalize().to_vec(),
        };
        out.get_mut(..digest.len())
            .ok_or(CoseError::BufferTooSmall)?
            .copy_from_slice(&digest);
        Ok(digest.len())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoBackend;

impl CryptoBackend for RustCryptoBackend {
    type SigningKey = EcSigningKey;
    type Context = OpsBudget;
    type Hasher = Sha2Hasher;

    fn hasher(&self, alg: CoseHashAlgorithm) -> Result<Self::Hasher, CoseError> {
        Ok(match alg {
            CoseHashAlgorithm::Sha256 => Sha2Hasher::Sha256(Sha256::new()),
            CoseHashAlgorithm::Sha384 => Sha2Hasher::Sha384(Sha384::new()),
            CoseHashAlgorithm::Sha512 => Sha2Hasher::Sha512(Sha512::new()),
        })
    }

    fn signature_size(&self, alg: CoseAlgorithm, key: &EcSigningKey) -> Result<usize, CoseError> {
        match (alg, key) {
            (CoseAlgorithm::ES256, EcSigningKey::P256(_)) => Ok(64),
            (CoseAlgorithm::ES384, EcSigningKey::P384(_)) => Ok(96),
            (CoseAlgorithm::ES512, _) => Err(CoseError::UnsupportedAlgorithm(alg.id())),
            _ => Err(CoseError::WrongKeyType),
        }
    }

    fn sign(
        &self,
        alg: CoseAlgorithm,
        key: &EcSigningKey,
        context: Option<&mut OpsBudget>,
        restarting: bool,
        hash: &[u8],
        out: &mut [u8],
    ) -> Result<SignOutcome, CoseError> {
        let size = self.signature_size(alg, key)?;

        if let Some(budget) = context {
            if !restarting {
                budget.consumed = 0;
            }
            budget.consumed = budget.consumed.saturating_add(budget.max_ops);
            if budget.consumed < key.sign_ops() {
                return Ok(SignOutcome::InProgress);
            }
        }

        let out = out.get_mut(..size).ok_or(CoseError::BufferTooSmall)?;
        match key {
            EcSigningKey::P256(k) => {
                let sig: p256::ecdsa::Signature =
                    k.sign_prehash(hash).map_err(|e| CoseError::Signing(e.to_string()))?;
                out.copy_from_slice(sig.to_bytes().as_slice());
            }
            EcSigningKey::P384(k) => {
                let sig: p384::ecdsa::Signature =
                    k.sign_prehash(hash).map_err(|e| CoseError::Signing(e.to_string()))?;
                out.copy_from_slice(sig.to_bytes().as_slice());
            }
        }
        Ok(SignOutcome::Complete(size))
    }
}
