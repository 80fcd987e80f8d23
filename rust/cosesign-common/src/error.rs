// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types shared by the COSE signing crates.

use crate::parameters::HeaderLabel;

/// Structural encoder faults.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("output buffer too small")]
    BufferTooSmall,

    #[error("close does not match the innermost open item")]
    CloseMismatch,

    #[error("no reserved byte region is open")]
    NotReserved,

    #[error("no output region exists in measurement mode")]
    Measuring,

    #[error("encoding finished with open arrays or byte strings")]
    Unclosed,

    #[error("encoded length overflow")]
    LengthOverflow,

    #[error("encoder state resumed on a different kind of target")]
    TargetMismatch,
}

/// Errors from creating a COSE_Sign / COSE_Sign1 message.
///
/// A signing pass that needs another call is not an error; it is reported
/// as `Progress::InProgress` by the operations that can suspend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoseError {
    #[error("no signers configured")]
    NoSigners,

    #[error("COSE_Sign1 requires exactly one signer")]
    TooManySigners,

    #[error("output buffer too small")]
    BufferTooSmall,

    #[error("CBOR formatting error: {0}")]
    CborFormatting(EncodeError),

    #[error("encoded CBOR is not well formed")]
    CborNotWellFormed,

    #[error("duplicate header parameter {0}")]
    DuplicateParameter(HeaderLabel),

    #[error("critical header parameter {0} is not protected")]
    CriticalParameterUnprotected(HeaderLabel),

    #[error("failed to encode header parameters: {0}")]
    HeaderEncoding(String),

    #[error("unsupported COSE algorithm {0}")]
    UnsupportedAlgorithm(i64),

    #[error("signing key does not match the algorithm")]
    WrongKeyType,

    #[error("no signing key configured")]
    MissingSigningKey,

    #[error("crypto backend suspended a signature but no restart state is attached")]
    MissingRestartState,

    #[error("payload bytes are not available for hashing")]
    MissingPayload,

    #[error("detached payload given for a message with an inline payload")]
    UnexpectedDetachedPayload,

    #[error("signer suspended while measuring")]
    SuspendedWhileMeasuring,

    #[error("signing failed: {0}")]
    Signing(String),
}

impl From<EncodeError> for CoseError {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::BufferTooSmall => CoseError::BufferTooSmall,
            other => CoseError::CborFormatting(other),
        }
    }
}
