// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign / COSE_Sign1 message creation for constrained environments.
//!
//! This crate is the entry point for producing signed COSE messages:
//! - [`CoseSignBuilder`] writes the message structure and drives the signers
//! - [`MainSigner`] computes the Sig_structure hash and signs it through a
//!   [`CryptoBackend`]
//! - [`RustCryptoBackend`] signs ES256 / ES384 with the RustCrypto crates
//!
//! Signing can be split across calls: a backend given an [`OpsBudget`]
//! returns after a bounded amount of work, and a signer with a
//! [`RestartState`] reports [`Progress::InProgress`]. The caller repeats the
//! same call until the message is complete. Output never needs to be
//! buffered twice; the encoder writes directly into the caller's buffer, or
//! only measures the size with [`EncodeTarget::Measure`].
//!
//! ```ignore
//! let key = EcSigningKey::from(p256::ecdsa::SigningKey::from_slice(&secret)?);
//! let mut signer = MainSigner::new(RustCryptoBackend, CoseAlgorithm::ES256).with_signing_key(key, None);
//! let mut builder = CoseSignBuilder::new(SignOptions::default());
//! builder.add_signer(&mut signer);
//! let mut buf = [0u8; 256];
//! let message = builder.sign(b"hello", b"", &mut buf)?;
//! ```

pub mod builder;
pub mod crypto;
pub mod main_signer;
pub mod options;
pub mod restart;

pub use builder::CoseSignBuilder;
pub use crypto::{EcSigningKey, OpsBudget, RustCryptoBackend, Sha2Hasher};
pub use main_signer::MainSigner;
pub use options::{MessageType, SignOptions};
pub use restart::RestartState;

pub use cosesign_abstractions::{
    create_tbs_hash, CoseSigner, CryptoBackend, PayloadSource, Progress, SignInputs, SignOutcome, SignStatus,
    TbsHasher,
};
pub use cosesign_common::{
    alg_id_parameter, content_type_text_parameter, content_type_uint_parameter, kid_parameter, CborEncoder,
    CoseAlgorithm, CoseError, CoseHashAlgorithm, EncodeError, EncodeTarget, Encoded, HeaderLabel, HeaderParameter,
    HeaderValue, ParameterList,
};
