// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE header parameters and their encoding into the protected and
//! unprotected header regions.

use std::collections::BTreeMap;
use std::fmt;

use minicbor::Encoder;

use crate::{CoseAlgorithm, CoseError};

pub const HEADER_ALG: i64 = 1;
pub const HEADER_CRIT: i64 = 2;
pub const HEADER_CONTENT_TYPE: i64 = 3;
pub const HEADER_KID: i64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderLabel {
    /// Integer label (the most common COSE header key form).
    Int(i64),
    /// Text label.
    Text(String),
}

impl fmt::Display for HeaderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderLabel::Int(i) => write!(f, "{i}"),
            HeaderLabel::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for HeaderLabel {
    fn from(v: i64) -> Self {
        HeaderLabel::Int(v)
    }
}

impl From<&str> for HeaderLabel {
    fn from(v: &str) -> Self {
        HeaderLabel::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<HeaderValue>),
    Map(BTreeMap<HeaderLabel, HeaderValue>),
    Bool(bool),
    Null,
}

/// One header parameter and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderParameter {
    pub label: HeaderLabel,
    pub value: HeaderValue,
    pub protected: bool,
    /// Listed in the `crit` parameter. Only valid for protected parameters.
    pub critical: bool,
}

impl HeaderParameter {
    /// An unprotected, non-critical parameter.
    pub fn new(label: impl Into<HeaderLabel>, value: HeaderValue) -> Self {
        Self {
            label: label.into(),
            value,
            protected: false,
            critical: false,
        }
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// The `alg` parameter; always protected.
pub fn alg_id_parameter(alg: CoseAlgorithm) -> HeaderParameter {
    HeaderParameter::new(HEADER_ALG, HeaderValue::Int(alg.id())).protected()
}

/// The `kid` parameter; unprotected.
pub fn kid_parameter(kid: &[u8]) -> HeaderParameter {
    HeaderParameter::new(HEADER_KID, HeaderValue::Bytes(kid.to_vec()))
}

/// Content type as a CoAP content-format number; protected.
pub fn content_type_uint_parameter(content_format: u16) -> HeaderParameter {
    HeaderParameter::new(HEADER_CONTENT_TYPE, HeaderValue::Int(i64::from(content_format))).protected()
}

/// Content type as a media type string; protected.
pub fn content_type_text_parameter(media_type: &str) -> HeaderParameter {
    HeaderParameter::new(HEADER_CONTENT_TYPE, HeaderValue::Text(media_type.to_string())).protected()
}

/// Ordered list of header parameters. Encoding order is list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    params: Vec<HeaderParameter>,
}

impl ParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: HeaderParameter) {
        self.params.push(param);
    }

    pub fn with(mut self, param: HeaderParameter) -> Self {
        self.params.push(param);
        self
    }

    /// Move all parameters of `other` to the end of this list.
    pub fn append(&mut self, mut other: ParameterList) {
        self.params.append(&mut other.params);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderParameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, label: &HeaderLabel) -> Option<&HeaderParameter> {
        self.params.iter().find(|p| &p.label == label)
    }
}

impl FromIterator<HeaderParameter> for ParameterList {
    fn from_iter<I: IntoIterator<Item = HeaderParameter>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

impl Extend<HeaderParameter> for ParameterList {
    fn extend<I: IntoIterator<Item = HeaderParameter>>(&mut self, iter: I) {
        self.params.extend(iter);
    }
}

impl IntoIterator for ParameterList {
    type Item = HeaderParameter;
    type IntoIter = std::vec::IntoIter<HeaderParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParameterList {
    type Item = &'a HeaderParameter;
    type IntoIter = std::slice::Iter<'a, HeaderParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// The two header regions of a COSE structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedHeaders {
    /// Content of the protected header byte string. Empty when there are
    /// no protected parameters.
    pub protected: Vec<u8>,
    /// The encoded unprotected header map.
    pub unprotected: Vec<u8>,
}

/// Encode a parameter list into protected and unprotected header bytes.
pub fn encode_headers(params: &ParameterList) -> Result<EncodedHeaders, CoseError> {
    check_parameters(params)?;

    let protected: Vec<&HeaderParameter> = params.iter().filter(|p| p.protected).collect();
    let unprotected: Vec<&HeaderParameter> = params.iter().filter(|p| !p.protected).collect();
    let critical: Vec<&HeaderLabel> = protected
        .iter()
        .filter(|p| p.critical)
        .map(|p| &p.label)
        .collect();

    let protected_bytes = if protected.is_empty() {
        Vec::new()
    } else {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        let entries = protected.len() + usize::from(!critical.is_empty());
        enc.map(entries as u64).map_err(encoding_error)?;
        for p in &protected {
            encode_label(&mut enc, &p.label)?;
            encode_value(&mut enc, &p.value)?;
        }
        if !critical.is_empty() {
            enc.i64(HEADER_CRIT).map_err(encoding_error)?;
            enc.array(critical.len() as u64).map_err(encoding_error)?;
            for label in critical {
                encode_label(&mut enc, label)?;
            }
        }
        buf
    };

    let mut unprotected_bytes = Vec::new();
    let mut enc = Encoder::new(&mut unprotected_bytes);
    enc.map(unprotected.len() as u64).map_err(encoding_error)?;
    for p in &unprotected {
        encode_label(&mut enc, &p.label)?;
        encode_value(&mut enc, &p.value)?;
    }

    Ok(EncodedHeaders {
        protected: protected_bytes,
        unprotected: unprotected_bytes,
    })
}

fn check_parameters(params: &ParameterList) -> Result<(), CoseError> {
    for (i, p) in params.iter().enumerate() {
        if p.critical && !p.protected {
            return Err(CoseError::CriticalParameterUnprotected(p.label.clone()));
        }
        if params.iter().skip(i + 1).any(|q| q.label == p.label) {
            return Err(CoseError::DuplicateParameter(p.label.clone()));
        }
    }
    Ok(())
}

fn encoding_error<E: fmt::Display>(e: E) -> CoseError {
    CoseError::HeaderEncoding(e.to_string())
}

fn encode_label(enc: &mut Encoder<&mut Vec<u8>>, label: &HeaderLabel) -> Result<(), CoseError> {
    match label {
        HeaderLabel::Int(i) => enc.i64(*i).map_err(encoding_error)?,
        HeaderLabel::Text(s) => enc.str(s).map_err(encoding_error)?,
    };
    Ok(())
}

fn encode_value(enc: &mut Encoder<&mut Vec<u8>>, value: &HeaderValue) -> Result<(), CoseError> {
    match value {
        HeaderValue::Int(i) => {
            enc.i64(*i).map_err(encoding_error)?;
        }
        HeaderValue::Bytes(b) => {
            enc.bytes(b).map_err(encoding_error)?;
        }
        HeaderValue::Text(s) => {
            enc.str(s).map_err(encoding_error)?;
        }
        HeaderValue::Bool(b) => {
            enc.bool(*b).map_err(encoding_error)?;
        }
        HeaderValue::Null => {
            enc.null().map_err(encoding_error)?;
        }
        HeaderValue::Array(items) => {
            enc.array(items.len() as u64).map_err(encoding_error)?;
            for item in items {
                encode_value(enc, item)?;
            }
        }
        HeaderValue::Map(map) => {
            enc.map(map.len() as u64).map_err(encoding_error)?;
            for (k, v) in map {
                encode_label(enc, k)?;
                encode_value(enc, v)?;
            }
        }
    }
    Ok(())
}
