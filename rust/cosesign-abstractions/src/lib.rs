// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared interfaces and datatypes for the COSE signing crates.
//!
//! This crate sits between the encoding helpers (`cosesign-common`) and the
//! message builder (`cosesign`) so that signers and crypto backends can be
//! implemented outside the builder crate:
//! - [`CoseSigner`]: the contract every signer in a builder's chain implements
//! - [`CryptoBackend`]: hashing and (possibly interruptible) signature generation
//! - [`SignInputs`]: what a signer needs to compute the to-be-signed hash

pub mod crypto;
pub mod progress;
pub mod sign_inputs;
pub mod signer;
pub mod tbs;

pub use crypto::{CryptoBackend, SignOutcome, TbsHasher};
pub use progress::{Progress, SignStatus};
pub use sign_inputs::{PayloadSource, SignInputs};
pub use signer::CoseSigner;
pub use tbs::create_tbs_hash;
