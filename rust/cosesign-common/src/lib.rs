// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Encoding helpers shared by the COSE_Sign / COSE_Sign1 creation crates:
//! the structural CBOR encoder, header parameters and the error taxonomy.

pub mod algorithms;
pub mod encoder;
pub mod error;
pub mod parameters;

pub use algorithms::{CoseAlgorithm, CoseHashAlgorithm, MAX_HASH_SIZE};
pub use encoder::{CborEncoder, EncodeTarget, Encoded, EncoderState, Head};
pub use error::{CoseError, EncodeError};
pub use parameters::{
    alg_id_parameter, content_type_text_parameter, content_type_uint_parameter, encode_headers, kid_parameter,
    EncodedHeaders, HeaderLabel, HeaderParameter, HeaderValue, ParameterList, HEADER_ALG, HEADER_CONTENT_TYPE,
    HEADER_CRIT, HEADER_KID,
};

/// Standard CBOR tag number used for COSE_Sign.
pub const COSE_SIGN_TAG: u64 = 98;

/// Standard CBOR tag number used for COSE_Sign1.
pub const COSE_SIGN1_TAG: u64 = 18;

/// Context string for COSE Sig_structure for COSE_Sign.
pub const SIG_STRUCTURE_CONTEXT_SIGNATURE: &str = "Signature";

/// Context string for COSE Sig_structure for COSE_Sign1.
pub const SIG_STRUCTURE_CONTEXT_SIGNATURE1: &str = "Signature1";
