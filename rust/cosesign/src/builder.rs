// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign / COSE_Sign1 message builder.
//!
//! A message is produced in two phases so the payload can be streamed into
//! the output without an intermediate copy:
//! 1. [`CoseSignBuilder::start`] writes the tag, opens the message array,
//!    writes the body headers and opens payload wrapping.
//! 2. The caller writes the payload (or `null` when detached), then calls
//!    [`CoseSignBuilder::finish`], which runs the signers.
//!
//! `finish` returns [`Progress::InProgress`] when a signer suspended. Call it
//! again with the same arguments and encoder until it completes.

use std::ops::Range;

use cosesign_abstractions::{CoseSigner, PayloadSource, Progress, SignInputs, SignStatus};
use cosesign_common::{
    encode_headers, CborEncoder, CoseError, EncodeError, EncodeTarget, Encoded, EncoderState, ParameterList,
};

use crate::{MessageType, SignOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredPayload {
    /// Payload wrapping opened by `start`, not yet closed.
    Open,
    /// Range of the inline payload content in the encoder output.
    Inline(Range<usize>),
    Detached,
}

/// Builds one COSE_Sign or COSE_Sign1 message at a time.
///
/// Signers are borrowed for the builder's lifetime and run in the order
/// they were added. A builder can be reused for further messages once a
/// message completes; after an error call [`CoseSignBuilder::reset`].
///
/// Signers are asked for their signature in sequence. After a signer has
/// suspended once, `finish` also returns in-progress between signers, so
/// each call does at most one signer's worth of work. A chain that places
/// non-restartable signers before the first restartable one runs all of them
/// in the first call.
pub struct CoseSignBuilder<'a> {
    options: SignOptions,
    signers: Vec<&'a mut dyn CoseSigner>,
    body_parameters: ParameterList,
    body_protected: Vec<u8>,
    payload: Option<StoredPayload>,
    cursor: usize,
    started: bool,
    encoder_state: Option<EncoderState>,
}

impl<'a> CoseSignBuilder<'a> {
    pub fn new(options: SignOptions) -> Self {
        Self {
            options,
            signers: Vec::new(),
            body_parameters: ParameterList::new(),
            body_protected: Vec::new(),
            payload: None,
            cursor: 0,
            started: false,
            encoder_state: None,
        }
    }

    /// Append a signer to the chain.
    pub fn add_signer(&mut self, signer: &'a mut dyn CoseSigner) -> &mut Self {
        self.signers.push(signer);
        self
    }

    /// Header parameters for the message body, in addition to those a
    /// COSE_Sign1 signer contributes.
    pub fn add_body_parameters(&mut self, params: ParameterList) -> &mut Self {
        self.body_parameters.append(params);
        self
    }

    pub fn options(&self) -> SignOptions {
        self.options
    }

    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// True while a signing pass is suspended.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Forget any partially produced message.
    ///
    /// Every signer is told to abandon a suspended signature, so the next
    /// message starts from scratch.
    pub fn reset(&mut self) {
        for signer in self.signers.iter_mut() {
            signer.abandon();
        }
        self.body_protected.clear();
        self.payload = None;
        self.cursor = 0;
        self.started = false;
        self.encoder_state = None;
    }

    /// Write everything that precedes the payload.
    ///
    /// Unless `payload_is_detached`, a byte string wrapping is left open and
    /// the caller writes the payload bytes next (e.g. with
    /// [`CborEncoder::add_encoded`]). A detached message expects the caller
    /// to write `null` instead.
    pub fn start(&mut self, payload_is_detached: bool, encoder: &mut CborEncoder<'_>) -> Result<(), CoseError> {
        let first = self.signers.first().ok_or(CoseError::NoSigners)?;

        let body_parameters = match self.options.message_type {
            MessageType::Sign1 => {
                if self.signers.len() > 1 {
                    return Err(CoseError::TooManySigners);
                }
                let mut params = first.headers();
                params.append(self.body_parameters.clone());
                params
            }
            MessageType::Sign => self.body_parameters.clone(),
        };
        let headers = encode_headers(&body_parameters)?;

        tracing::debug!(
            message_type = ?self.options.message_type,
            context = self.options.message_type.sig_structure_context(),
            tagged = !self.options.omit_cbor_tag,
            signers = self.signers.len(),
            protected_len = headers.protected.len(),
            payload_is_detached,
            "starting COSE message"
        );

        if !self.options.omit_cbor_tag {
            encoder.add_tag(self.options.message_type.tag());
        }
        encoder.open_array();
        encoder.add_bytes(&headers.protected);
        encoder.add_encoded(&headers.unprotected);

        if payload_is_detached {
            self.payload = Some(StoredPayload::Detached);
        } else {
            encoder.bstr_wrap();
            self.payload = Some(StoredPayload::Open);
        }
        self.body_protected = headers.protected;
        Ok(())
    }

    /// Close the payload and produce the signature(s).
    ///
    /// `detached_payload` must be given exactly when the message was started
    /// with a detached payload. On re-entry after [`Progress::InProgress`]
    /// pass the same `aad`, `detached_payload` and encoder.
    pub fn finish(
        &mut self,
        aad: &[u8],
        detached_payload: Option<&[u8]>,
        encoder: &mut CborEncoder<'_>,
    ) -> Result<SignStatus, CoseError> {
        if !self.started {
            match (self.payload.clone(), detached_payload) {
                (Some(StoredPayload::Open), None) => {
                    let range = encoder.close_bstr_wrap();
                    self.payload = Some(StoredPayload::Inline(range));
                }
                (Some(StoredPayload::Detached), Some(_)) => {}
                (Some(StoredPayload::Detached), None) => return Err(CoseError::MissingPayload),
                (Some(StoredPayload::Open), Some(_)) => return Err(CoseError::UnexpectedDetachedPayload),
                (Some(StoredPayload::Inline(_)), _) | (None, _) => {
                    return Err(CoseError::CborFormatting(EncodeError::CloseMismatch))
                }
            }

            if let Some(e) = encoder.error() {
                return Err(e.into());
            }
            self.cursor = 0;
        } else {
            tracing::trace!(signer = self.cursor, "resuming suspended signing pass");
        }

        let payload = match (&self.payload, detached_payload) {
            (Some(StoredPayload::Inline(range)), _) => PayloadSource::Inline(range.clone()),
            (Some(StoredPayload::Detached), Some(p)) => PayloadSource::Detached(p),
            _ => return Err(CoseError::MissingPayload),
        };
        let inputs = SignInputs {
            body_protected: &self.body_protected,
            sign_protected: None,
            payload,
            aad,
        };

        match self.options.message_type {
            MessageType::Sign => {
                if !self.started {
                    encoder.open_array();
                }
                while let Some(signer) = self.signers.get_mut(self.cursor) {
                    tracing::trace!(signer = self.cursor, "dispatching COSE_Signature");
                    if signer.sign(&inputs, encoder)?.is_in_progress() {
                        tracing::trace!(signer = self.cursor, "signature in progress");
                        self.started = true;
                        return Ok(Progress::InProgress);
                    }
                    self.cursor += 1;
                    if self.started && self.cursor < self.signers.len() {
                        // Give control back before starting the next signer.
                        return Ok(Progress::InProgress);
                    }
                }
                self.started = false;
                encoder.close_array();
            }
            MessageType::Sign1 => {
                let signer = self.signers.first_mut().ok_or(CoseError::NoSigners)?;
                let status = signer.sign1(&inputs, encoder);
                self.started = matches!(status, Ok(Progress::InProgress));
                if status?.is_in_progress() {
                    tracing::trace!("signature in progress");
                    return Ok(Progress::InProgress);
                }
            }
        }

        encoder.close_array();
        tracing::debug!(len = encoder.len(), "COSE message signed");
        Ok(Progress::Complete(()))
    }

    /// Produce a complete message into `target` in one call.
    ///
    /// With a buffer target the returned bytes borrow from it; with
    /// [`EncodeTarget::Measure`] only the size is computed and no signing
    /// takes place. On [`Progress::InProgress`] call again with the same
    /// arguments and the same buffer.
    pub fn one_shot<'b>(
        &mut self,
        payload: &[u8],
        aad: &[u8],
        payload_is_detached: bool,
        target: EncodeTarget<'b>,
    ) -> Result<Progress<Encoded<'b>>, CoseError> {
        let mut encoder = if self.started {
            let state = self
                .encoder_state
                .take()
                .ok_or(CoseError::CborFormatting(EncodeError::TargetMismatch))?;
            CborEncoder::resume(target, state)
        } else {
            let mut encoder = CborEncoder::new(target);
            self.start(payload_is_detached, &mut encoder)?;
            if payload_is_detached {
                encoder.add_null();
            } else {
                encoder.add_encoded(payload);
            }
            encoder
        };

        let detached = payload_is_detached.then_some(payload);
        if self.finish(aad, detached, &mut encoder)?.is_in_progress() {
            self.encoder_state = Some(encoder.suspend());
            return Ok(Progress::InProgress);
        }

        let encoded = encoder.finish().map_err(|e| match e {
            EncodeError::BufferTooSmall => CoseError::BufferTooSmall,
            _ => CoseError::CborNotWellFormed,
        })?;
        Ok(Progress::Complete(encoded))
    }

    /// Sign `payload` carried inline, writing the message into `out`.
    pub fn sign<'b>(&mut self, payload: &[u8], aad: &[u8], out: &'b mut [u8]) -> Result<Progress<&'b [u8]>, CoseError> {
        let progress = self.one_shot(payload, aad, false, EncodeTarget::Buffer(out))?;
        Ok(progress.map(|encoded| encoded.bytes().unwrap_or_default()))
    }

    /// Sign `payload` without including it; the message carries `null`.
    pub fn sign_detached<'b>(
        &mut self,
        payload: &[u8],
        aad: &[u8],
        out: &'b mut [u8],
    ) -> Result<Progress<&'b [u8]>, CoseError> {
        let progress = self.one_shot(payload, aad, true, EncodeTarget::Buffer(out))?;
        Ok(progress.map(|encoded| encoded.bytes().unwrap_or_default()))
    }

    /// Size of the message `sign` / `sign_detached` would produce.
    pub fn measure(&mut self, payload: &[u8], aad: &[u8], payload_is_detached: bool) -> Result<usize, CoseError> {
        match self.one_shot(payload, aad, payload_is_detached, EncodeTarget::Measure)? {
            Progress::Complete(encoded) => Ok(encoded.len()),
            Progress::InProgress => {
                self.reset();
                Err(CoseError::SuspendedWhileMeasuring)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosesign_common::{alg_id_parameter, CoseAlgorithm};

    /// Writes a fixed signature; suspends `pauses` times first.
    struct FixedSigner {
        pauses: usize,
        calls: usize,
        open: bool,
    }

    impl FixedSigner {
        fn new(pauses: usize) -> Self {
            Self {
                pauses,
                calls: 0,
                open: false,
            }
        }

        fn step(&mut self, encoder: &mut CborEncoder<'_>) -> SignStatus {
            self.calls += 1;
            if self.pauses > 0 {
                self.pauses -= 1;
                return Progress::InProgress;
            }
            encoder.add_bytes(&[0x5A; 4]);
            Progress::Complete(())
        }
    }

    impl CoseSigner for FixedSigner {
        fn headers(&self) -> ParameterList {
            ParameterList::new().with(alg_id_parameter(CoseAlgorithm::ES256))
        }

        fn sign(&mut self, _inputs: &SignInputs<'_>, encoder: &mut CborEncoder<'_>) -> Result<SignStatus, CoseError> {
            if !self.open {
                encoder.open_array();
                encoder.add_bytes(&[0xA1, 0x01, 0x26]);
                encoder.add_encoded(&[0xA0]);
                self.open = true;
            }
            let status = self.step(encoder);
            if status.is_complete() {
                self.open = false;
                encoder.close_array();
            }
            Ok(status)
        }

        fn sign1(&mut self, _inputs: &SignInputs<'_>, encoder: &mut CborEncoder<'_>) -> Result<SignStatus, CoseError> {
            Ok(self.step(encoder))
        }

        fn abandon(&mut self) {
            self.open = false;
        }
    }

    #[test]
    fn sign1_message_layout() {
        let mut signer = FixedSigner::new(0);
        let mut builder = CoseSignBuilder::new(SignOptions::default());
        builder.add_signer(&mut signer);

        let mut buf = [0u8; 64];
        let out = builder.sign(b"hi", b"", &mut buf).unwrap().complete().unwrap();
        assert_eq!(hex::encode(out), "d28443a10126a042686944 5a5a5a5a".replace(' ', ""));
    }

    #[test]
    fn empty_chain_is_rejected() {
        let mut builder = CoseSignBuilder::new(SignOptions::default());
        let mut buf = [0u8; 64];
        assert_eq!(builder.sign(b"x", b"", &mut buf), Err(CoseError::NoSigners));
    }

    #[test]
    fn sign1_rejects_second_signer() {
        let mut a = FixedSigner::new(0);
        let mut b = FixedSigner::new(0);
        let mut builder = CoseSignBuilder::new(SignOptions::default());
        builder.add_signer(&mut a).add_signer(&mut b);
        let mut buf = [0u8; 64];
        assert_eq!(builder.sign(b"x", b"", &mut buf), Err(CoseError::TooManySigners));
    }

    #[test]
    fn sign_yields_between_signers_after_suspension() {
        let mut a = FixedSigner::new(1);
        let mut b = FixedSigner::new(0);
        let mut builder = CoseSignBuilder::new(SignOptions::default().with_message_type(MessageType::Sign));
        builder.add_signer(&mut a).add_signer(&mut b);

        let mut buf = [0u8; 128];
        let mut rounds = 0;
        let len = loop {
            rounds += 1;
            match builder.one_shot(b"x", b"", false, EncodeTarget::Buffer(&mut buf)).unwrap() {
                Progress::Complete(encoded) => break encoded.len(),
                Progress::InProgress => assert!(builder.is_started()),
            }
        };
        // Suspended once in `a`, then a forced yield before `b`.
        assert_eq!(rounds, 3);
        assert!(!builder.is_started());
        assert_eq!(&buf[..4], &[0xD8, 0x62, 0x84, 0x40]);
        assert!(len > 0);
    }

    #[test]
    fn measure_matches_written_length() {
        let mut signer = FixedSigner::new(0);
        let mut builder = CoseSignBuilder::new(SignOptions::default().without_cbor_tag());
        builder.add_signer(&mut signer);

        let size = builder.measure(b"payload", b"", false).unwrap();
        let mut buf = [0u8; 64];
        let out = builder.sign(b"payload", b"", &mut buf).unwrap().complete().unwrap();
        assert_eq!(size, out.len());
    }

    #[test]
    fn detached_finish_requires_payload() {
        let mut signer = FixedSigner::new(0);
        let mut builder = CoseSignBuilder::new(SignOptions::default());
        builder.add_signer(&mut signer);

        let mut buf = [0u8; 64];
        let mut encoder = CborEncoder::new(EncodeTarget::Buffer(&mut buf));
        builder.start(true, &mut encoder).unwrap();
        encoder.add_null();
        assert_eq!(builder.finish(b"", None, &mut encoder), Err(CoseError::MissingPayload));
    }

    #[test]
    fn inline_finish_rejects_detached_payload() {
        let mut signer = FixedSigner::new(0);
        let mut builder = CoseSignBuilder::new(SignOptions::default());
        builder.add_signer(&mut signer);

        let mut buf = [0u8; 64];
        let mut encoder = CborEncoder::new(EncodeTarget::Buffer(&mut buf));
        builder.start(false, &mut encoder).unwrap();
        encoder.add_encoded(b"inline");
        assert_eq!(
            builder.finish(b"", Some(b"inline"), &mut encoder),
            Err(CoseError::UnexpectedDetachedPayload)
        );
    }

    #[test]
    fn signer_suspending_during_measure_is_reported() {
        let mut signer = FixedSigner::new(1);
        let mut builder = CoseSignBuilder::new(SignOptions::default());
        builder.add_signer(&mut signer);

        assert_eq!(builder.measure(b"x", b"", false), Err(CoseError::SuspendedWhileMeasuring));
        assert!(!builder.is_started());
    }

    #[test]
    fn reset_reaches_every_signer() {
        let mut a = FixedSigner::new(0);
        let mut b = FixedSigner::new(1);
        let mut builder = CoseSignBuilder::new(SignOptions::default().with_message_type(MessageType::Sign));
        builder.add_signer(&mut a).add_signer(&mut b);

        let mut buf = [0u8; 128];
        let first = builder.one_shot(b"x", b"", false, EncodeTarget::Buffer(&mut buf)).unwrap();
        assert!(first.is_in_progress());
        builder.reset();

        // `b` has no pauses left, so the fresh pass completes in one call
        // and carries a full entry for it.
        let out = builder.sign(b"y", b"", &mut buf).unwrap().complete().unwrap();
        let entry = [0x83, 0x43, 0xA1, 0x01, 0x26, 0xA0, 0x44, 0x5A, 0x5A, 0x5A, 0x5A];
        assert_eq!(&out[out.len() - entry.len()..], &entry);
        assert_eq!(&out[out.len() - 2 * entry.len() - 1..][..1], &[0x82]);
    }

    #[test]
    fn small_buffer_reports_too_small() {
        let mut signer = FixedSigner::new(0);
        let mut builder = CoseSignBuilder::new(SignOptions::default());
        builder.add_signer(&mut signer);
        let mut buf = [0u8; 8];
        assert_eq!(builder.sign(b"payload", b"", &mut buf), Err(CoseError::BufferTooSmall));
    }
}
