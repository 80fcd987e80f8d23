// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! To-be-signed hash over the COSE Sig_structure.
//!
//! Sig_structure = [ context, body_protected, ? sign_protected, external_aad, payload ]
//!
//! The structure is fed to the hasher piece by piece; it is never
//! materialized, so large payloads are hashed in place.

use cosesign_common::{
    CborEncoder, CoseAlgorithm, CoseError, Head, SIG_STRUCTURE_CONTEXT_SIGNATURE, SIG_STRUCTURE_CONTEXT_SIGNATURE1,
};

use crate::{CryptoBackend, SignInputs, TbsHasher};

const MAJOR_TEXT: u8 = 3;

/// Hash the Sig_structure for `inputs` into `out`, returning the digest length.
///
/// The context is "Signature" when `inputs.sign_protected` is set (a
/// COSE_Signature of a COSE_Sign) and "Signature1" otherwise.
pub fn create_tbs_hash<B: CryptoBackend + ?Sized>(
    backend: &B,
    alg: CoseAlgorithm,
    inputs: &SignInputs<'_>,
    encoder: &CborEncoder<'_>,
    out: &mut [u8],
) -> Result<usize, CoseError> {
    let payload = inputs.payload_bytes(encoder)?;

    let (context, items) = match inputs.sign_protected {
        Some(_) => (SIG_STRUCTURE_CONTEXT_SIGNATURE, 5),
        None => (SIG_STRUCTURE_CONTEXT_SIGNATURE1, 4),
    };

    let mut h = backend.hasher(alg.hash_algorithm())?;
    h.update(Head::array_len(items).as_slice());
    h.update(Head::new(MAJOR_TEXT, context.len() as u64).as_slice());
    h.update(context.as_bytes());
    hash_bstr(&mut h, inputs.body_protected);
    if let Some(sign_protected) = inputs.sign_protected {
        hash_bstr(&mut h, sign_protected);
    }
    hash_bstr(&mut h, inputs.aad);
    hash_bstr(&mut h, payload);
    h.finish(out)
}

fn hash_bstr<H: TbsHasher>(h: &mut H, bytes: &[u8]) {
    h.update(Head::bytes_len(bytes.len()).as_slice());
    h.update(bytes);
}
