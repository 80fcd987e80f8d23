// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared helpers for `cosesign` integration tests.
//!
//! Messages produced by the builder are decoded independently with minicbor
//! and the expected Sig_structure is rebuilt the same way, so the tests do
//! not trust the code under test to check itself.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use cosesign::{
    CoseAlgorithm, CoseError, CoseHashAlgorithm, CryptoBackend, EcSigningKey, RustCryptoBackend, Sha2Hasher,
    SignOutcome,
};
use minicbor::data::Type;
use minicbor::{Decoder, Encoder};
use sha2::Digest as _;

/// Fixed P-256 test key.
pub(crate) fn p256_key() -> p256::ecdsa::SigningKey {
    p256::ecdsa::SigningKey::from_slice(&[0x11; 32]).unwrap()
}

/// Fixed P-384 test key.
pub(crate) fn p384_key() -> p384::ecdsa::SigningKey {
    p384::ecdsa::SigningKey::from_slice(&[0x22; 48]).unwrap()
}

pub(crate) fn ec_p256() -> EcSigningKey {
    EcSigningKey::from(p256_key())
}

/// Call counters shared between a test and a [`ShortCircuitBackend`].
#[derive(Debug, Default, Clone)]
pub(crate) struct Counters {
    pub(crate) sign_calls: Rc<Cell<usize>>,
    pub(crate) size_calls: Rc<Cell<usize>>,
}

/// Per-signature suspension control for [`ShortCircuitBackend`].
#[derive(Debug, Default)]
pub(crate) struct Pauses {
    /// How many times each signature reports in-progress before completing.
    pub(crate) per_signature: usize,
    left: usize,
}

impl Pauses {
    pub(crate) fn new(per_signature: usize) -> Self {
        Self {
            per_signature,
            left: 0,
        }
    }
}

/// Test backend whose "signature" is the to-be-signed hash written twice.
///
/// No key material is involved, which makes the expected output easy to
/// compute from an independently built Sig_structure.
#[derive(Debug, Default, Clone)]
pub(crate) struct ShortCircuitBackend {
    pub(crate) counters: Counters,
}

impl ShortCircuitBackend {
    pub(crate) fn new(counters: Counters) -> Self {
        Self { counters }
    }
}

impl CryptoBackend for ShortCircuitBackend {
    type SigningKey = ();
    type Context = Pauses;
    type Hasher = Sha2Hasher;

    fn hasher(&self, alg: CoseHashAlgorithm) -> Result<Sha2Hasher, CoseError> {
        RustCryptoBackend.hasher(alg)
    }

    fn signature_size(&self, alg: CoseAlgorithm, _key: &()) -> Result<usize, CoseError> {
        self.counters.size_calls.set(self.counters.size_calls.get() + 1);
        Ok(alg.hash_algorithm().output_len() * 2)
    }

    fn sign(
        &self,
        alg: CoseAlgorithm,
        _key: &(),
        context: Option<&mut Pauses>,
        restarting: bool,
        hash: &[u8],
        out: &mut [u8],
    ) -> Result<SignOutcome, CoseError> {
        self.counters.sign_calls.set(self.counters.sign_calls.get() + 1);
        if let Some(p) = context {
            if !restarting {
                p.left = p.per_signature;
            }
            if p.left > 0 {
                p.left -= 1;
                return Ok(SignOutcome::InProgress);
            }
        }
        let size = alg.hash_algorithm().output_len() * 2;
        let out = out.get_mut(..size).ok_or(CoseError::BufferTooSmall)?;
        out[..hash.len()].copy_from_slice(hash);
        out[hash.len()..].copy_from_slice(hash);
        Ok(SignOutcome::Complete(size))
    }
}

/// A decoded COSE_Sign1 or COSE_Sign message.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Decoded {
    pub(crate) tag: Option<u64>,
    pub(crate) protected: Vec<u8>,
    /// Raw encoded unprotected header map.
    pub(crate) unprotected: Vec<u8>,
    /// `None` when the payload is detached (CBOR null).
    pub(crate) payload: Option<Vec<u8>>,
    /// COSE_Sign1 signature bytes. Empty for COSE_Sign.
    pub(crate) signature: Vec<u8>,
    /// COSE_Sign signature entries. Empty for COSE_Sign1.
    pub(crate) signatures: Vec<DecodedSignature>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DecodedSignature {
    pub(crate) protected: Vec<u8>,
    pub(crate) unprotected: Vec<u8>,
    pub(crate) signature: Vec<u8>,
}

fn raw_item(input: &[u8], dec: &mut Decoder<'_>) -> Vec<u8> {
    let start = dec.position();
    dec.skip().unwrap();
    input[start..dec.position()].to_vec()
}

/// Decode a message and require that it spans all of `input`.
pub(crate) fn decode_message(input: &[u8]) -> Decoded {
    let mut dec = Decoder::new(input);
    let tag = match dec.datatype().unwrap() {
        Type::Tag => Some(dec.tag().unwrap().as_u64()),
        _ => None,
    };

    assert_eq!(dec.array().unwrap(), Some(4));
    let protected = dec.bytes().unwrap().to_vec();
    assert_eq!(dec.datatype().unwrap(), Type::Map);
    let unprotected = raw_item(input, &mut dec);
    let payload = match dec.datatype().unwrap() {
        Type::Null => {
            dec.null().unwrap();
            None
        }
        _ => Some(dec.bytes().unwrap().to_vec()),
    };

    let mut signature = Vec::new();
    let mut signatures = Vec::new();
    match dec.datatype().unwrap() {
        Type::Bytes => signature = dec.bytes().unwrap().to_vec(),
        Type::Array => {
            let n = dec.array().unwrap().unwrap();
            for _ in 0..n {
                assert_eq!(dec.array().unwrap(), Some(3));
                let protected = dec.bytes().unwrap().to_vec();
                let unprotected = raw_item(input, &mut dec);
                let signature = dec.bytes().unwrap().to_vec();
                signatures.push(DecodedSignature {
                    protected,
                    unprotected,
                    signature,
                });
            }
        }
        other => panic!("unexpected signature item {other:?}"),
    }

    assert_eq!(dec.position(), input.len(), "trailing bytes after message");
    Decoded {
        tag,
        protected,
        unprotected,
        payload,
        signature,
        signatures,
    }
}

/// Encode `{ label: value, ... }` with integer values, in the given order.
pub(crate) fn int_map(entries: &[(i64, i64)]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.map(entries.len() as u64).unwrap();
    for (k, v) in entries {
        enc.i64(*k).unwrap();
        enc.i64(*v).unwrap();
    }
    buf
}

/// Independently encoded Sig_structure.
pub(crate) fn sig_structure(body_protected: &[u8], sign_protected: Option<&[u8]>, aad: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = Encoder::new(&mut out);
    match sign_protected {
        Some(sp) => {
            enc.array(5).unwrap();
            enc.str("Signature").unwrap();
            enc.bytes(body_protected).unwrap();
            enc.bytes(sp).unwrap();
        }
        None => {
            enc.array(4).unwrap();
            enc.str("Signature1").unwrap();
            enc.bytes(body_protected).unwrap();
        }
    }
    enc.bytes(aad).unwrap();
    enc.bytes(payload).unwrap();
    out
}

/// What [`ShortCircuitBackend`] produces for ES256 over `tbs`.
pub(crate) fn short_circuit_es256(tbs: &[u8]) -> Vec<u8> {
    let h = sha2::Sha256::digest(tbs);
    [h.as_slice(), h.as_slice()].concat()
}

/// Verify an ES256 signature over `tbs` with the fixed P-256 key.
pub(crate) fn verify_es256(tbs: &[u8], signature: &[u8]) {
    use p256::ecdsa::signature::Verifier as _;
    let sig = p256::ecdsa::Signature::from_slice(signature).unwrap();
    p256_key().verifying_key().verify(tbs, &sig).unwrap();
}

/// Verify an ES384 signature over `tbs` with the fixed P-384 key.
pub(crate) fn verify_es384(tbs: &[u8], signature: &[u8]) {
    use p384::ecdsa::signature::Verifier as _;
    let sig = p384::ecdsa::Signature::from_slice(signature).unwrap();
    p384_key().verifying_key().verify(tbs, &sig).unwrap();
}
