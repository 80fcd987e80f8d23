// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ops::Range;

use cosesign_common::{CborEncoder, CoseError};

/// Where the signed payload bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource<'a> {
    /// Content of the payload byte string already written to the encoder.
    Inline(Range<usize>),
    /// Payload carried out of band.
    Detached(&'a [u8]),
}

/// Inputs to the to-be-signed hash, shared by every signer of a message.
#[derive(Debug, Clone)]
pub struct SignInputs<'a> {
    /// Body protected header bytes (content of the bstr).
    pub body_protected: &'a [u8],
    /// Protected header bytes of one COSE_Signature. `None` for COSE_Sign1.
    pub sign_protected: Option<&'a [u8]>,
    pub payload: PayloadSource<'a>,
    /// External additional authenticated data.
    pub aad: &'a [u8],
}

impl<'a> SignInputs<'a> {
    /// Copy of these inputs for one COSE_Signature with its own protected headers.
    pub fn with_sign_protected<'b>(&self, sign_protected: &'b [u8]) -> SignInputs<'b>
    where
        'a: 'b,
    {
        SignInputs {
            body_protected: self.body_protected,
            sign_protected: Some(sign_protected),
            payload: self.payload.clone(),
            aad: self.aad,
        }
    }

    /// Resolve the payload bytes, reading inline payloads from the encoder output.
    pub fn payload_bytes<'e>(&'e self, encoder: &'e CborEncoder<'_>) -> Result<&'e [u8], CoseError> {
        match &self.payload {
            PayloadSource::Detached(p) => Ok(*p),
            PayloadSource::Inline(range) => encoder.written(range.clone()).ok_or(CoseError::MissingPayload),
        }
    }
}
