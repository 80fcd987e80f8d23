// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Hash-then-sign signer with restart support.

use cosesign_abstractions::{create_tbs_hash, CoseSigner, CryptoBackend, Progress, SignInputs, SignOutcome, SignStatus};
use cosesign_common::{
    alg_id_parameter, encode_headers, kid_parameter, CborEncoder, CoseAlgorithm, CoseError, ParameterList,
    MAX_HASH_SIZE,
};

use crate::RestartState;

/// The main signer: computes the to-be-signed hash and asks a
/// [`CryptoBackend`] to sign it.
///
/// Its header contribution is the `alg` parameter (protected), the `kid`
/// parameter (unprotected) when a key id is configured, and any parameters
/// added with [`MainSigner::with_signer_parameters`].
///
/// With a [`RestartState`] attached the backend may suspend the signature;
/// without one, a backend that reports in-progress is an error.
pub struct MainSigner<'r, B: CryptoBackend> {
    backend: B,
    algorithm: CoseAlgorithm,
    signing_key: Option<B::SigningKey>,
    kid: Option<Vec<u8>>,
    crypto_context: Option<&'r mut B::Context>,
    restart: Option<&'r mut RestartState>,
    added_parameters: ParameterList,
}

impl<'r, B: CryptoBackend> MainSigner<'r, B> {
    pub fn new(backend: B, algorithm: CoseAlgorithm) -> Self {
        Self {
            backend,
            algorithm,
            signing_key: None,
            kid: None,
            crypto_context: None,
            restart: None,
            added_parameters: ParameterList::new(),
        }
    }

    pub fn with_signing_key(mut self, key: B::SigningKey, kid: Option<&[u8]>) -> Self {
        self.signing_key = Some(key);
        self.kid = kid.map(<[u8]>::to_vec);
        self
    }

    /// Allow the backend to suspend signatures, keeping progress in `state`.
    pub fn with_restart_state(mut self, state: &'r mut RestartState) -> Self {
        self.restart = Some(state);
        self
    }

    /// Execution context passed to every backend sign call.
    pub fn with_crypto_context(mut self, context: &'r mut B::Context) -> Self {
        self.crypto_context = Some(context);
        self
    }

    /// Extra header parameters emitted with this signer's `alg` / `kid`.
    pub fn with_signer_parameters(mut self, params: ParameterList) -> Self {
        self.added_parameters.append(params);
        self
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True while a signature of this signer is suspended.
    pub fn is_restarting(&self) -> bool {
        self.restart.as_deref().is_some_and(|r| r.started)
    }

    /// Emit the signature byte string.
    fn emit_signature(&mut self, inputs: &SignInputs<'_>, encoder: &mut CborEncoder<'_>) -> Result<SignStatus, CoseError> {
        let key = self.signing_key.as_ref().ok_or(CoseError::MissingSigningKey)?;
        let resuming = self.restart.as_deref().is_some_and(|r| r.started);

        let mut local_hash = [0u8; MAX_HASH_SIZE];
        let mut local_hash_len = 0;

        if resuming {
            tracing::trace!(alg = ?self.algorithm, "resuming signature with stored to-be-signed hash");
        } else {
            // The signature is written straight into the output; the head is
            // fixed up once the real length is known.
            encoder.open_bytes();

            if encoder.is_measuring() {
                let size = match self.backend.signature_size(self.algorithm, key) {
                    Ok(size) => size,
                    Err(e) => {
                        encoder.cancel_bytes();
                        return Err(e);
                    }
                };
                tracing::trace!(alg = ?self.algorithm, size, "measured signature size");
                encoder.close_bytes(size);
                return Ok(Progress::Complete(()));
            }

            let hash_out: &mut [u8] = match self.restart.as_deref_mut() {
                Some(r) => &mut r.tbs_hash,
                None => &mut local_hash,
            };
            let len = match create_tbs_hash(&self.backend, self.algorithm, inputs, encoder, hash_out) {
                Ok(len) => len,
                Err(e) => {
                    encoder.cancel_bytes();
                    return Err(e);
                }
            };
            match self.restart.as_deref_mut() {
                Some(r) => r.tbs_hash_len = len,
                None => local_hash_len = len,
            }
        }

        let hash: &[u8] = match self.restart.as_deref() {
            Some(r) => r.tbs_hash(),
            None => &local_hash[..local_hash_len],
        };

        let outcome = match encoder.reserved_region() {
            Ok(region) => self.backend.sign(
                self.algorithm,
                key,
                self.crypto_context.as_deref_mut(),
                resuming,
                hash,
                region,
            ),
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(SignOutcome::Complete(len)) => {
                if let Some(r) = self.restart.as_deref_mut() {
                    r.started = false;
                }
                encoder.close_bytes(len);
                Ok(Progress::Complete(()))
            }
            Ok(SignOutcome::InProgress) => match self.restart.as_deref_mut() {
                Some(r) => {
                    tracing::debug!(alg = ?self.algorithm, "crypto backend suspended signature");
                    r.started = true;
                    Ok(Progress::InProgress)
                }
                None => {
                    encoder.cancel_bytes();
                    Err(CoseError::MissingRestartState)
                }
            },
            Err(e) => {
                if let Some(r) = self.restart.as_deref_mut() {
                    r.started = false;
                }
                encoder.cancel_bytes();
                Err(e)
            }
        }
    }
}

impl<'r, B: CryptoBackend> CoseSigner for MainSigner<'r, B> {
    fn headers(&self) -> ParameterList {
        let mut params = ParameterList::new().with(alg_id_parameter(self.algorithm));
        if let Some(kid) = &self.kid {
            params.push(kid_parameter(kid));
        }
        params.append(self.added_parameters.clone());
        params
    }

    fn sign(&mut self, inputs: &SignInputs<'_>, encoder: &mut CborEncoder<'_>) -> Result<SignStatus, CoseError> {
        let status = if self.is_restarting() {
            // Entry array and headers were emitted by the suspended call and
            // the hash is stored, so the signer's protected bytes are not needed.
            self.emit_signature(inputs, encoder)?
        } else {
            encoder.open_array();
            let headers = encode_headers(&self.headers())?;
            encoder.add_bytes(&headers.protected);
            encoder.add_encoded(&headers.unprotected);
            let inputs = inputs.with_sign_protected(&headers.protected);
            self.emit_signature(&inputs, encoder)?
        };

        if status.is_complete() {
            encoder.close_array();
        }
        Ok(status)
    }

    fn sign1(&mut self, inputs: &SignInputs<'_>, encoder: &mut CborEncoder<'_>) -> Result<SignStatus, CoseError> {
        self.emit_signature(inputs, encoder)
    }

    fn abandon(&mut self) {
        if let Some(r) = self.restart.as_deref_mut() {
            if r.started {
                tracing::debug!(alg = ?self.algorithm, "abandoning suspended signature");
            }
            r.started = false;
        }
    }
}
