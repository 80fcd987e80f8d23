// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::CoseError;

/// Signature algorithms (IANA COSE Algorithms registry).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256 over P-256.
    ES256 = -7,
    /// ECDSA w/ SHA-384 over P-384.
    ES384 = -35,
    /// ECDSA w/ SHA-512 over P-521.
    ES512 = -36,
}

impl CoseAlgorithm {
    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Result<Self, CoseError> {
        match id {
            -7 => Ok(CoseAlgorithm::ES256),
            -35 => Ok(CoseAlgorithm::ES384),
            -36 => Ok(CoseAlgorithm::ES512),
            other => Err(CoseError::UnsupportedAlgorithm(other)),
        }
    }

    /// Hash used for the to-be-signed bytes.
    pub fn hash_algorithm(self) -> CoseHashAlgorithm {
        match self {
            CoseAlgorithm::ES256 => CoseHashAlgorithm::Sha256,
            CoseAlgorithm::ES384 => CoseHashAlgorithm::Sha384,
            CoseAlgorithm::ES512 => CoseHashAlgorithm::Sha512,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CoseHashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl CoseHashAlgorithm {
    pub fn output_len(self) -> usize {
        match self {
            CoseHashAlgorithm::Sha256 => 32,
            CoseHashAlgorithm::Sha384 => 48,
            CoseHashAlgorithm::Sha512 => 64,
        }
    }
}

/// Largest digest any supported hash produces.
pub const MAX_HASH_SIZE: usize = 64;
