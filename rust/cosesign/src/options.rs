// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use cosesign_common::{
    COSE_SIGN1_TAG, COSE_SIGN_TAG, SIG_STRUCTURE_CONTEXT_SIGNATURE, SIG_STRUCTURE_CONTEXT_SIGNATURE1,
};

/// Which COSE signed message structure to produce.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MessageType {
    /// COSE_Sign: an array of COSE_Signature entries, one per signer.
    Sign,
    /// COSE_Sign1: a single signature; exactly one signer.
    #[default]
    Sign1,
}

impl MessageType {
    /// CBOR tag number identifying the message type.
    pub fn tag(self) -> u64 {
        match self {
            MessageType::Sign => COSE_SIGN_TAG,
            MessageType::Sign1 => COSE_SIGN1_TAG,
        }
    }

    /// Context string of the Sig_structure signed for this message type.
    pub fn sig_structure_context(self) -> &'static str {
        match self {
            MessageType::Sign => SIG_STRUCTURE_CONTEXT_SIGNATURE,
            MessageType::Sign1 => SIG_STRUCTURE_CONTEXT_SIGNATURE1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignOptions {
    pub message_type: MessageType,
    /// If true, the leading CBOR tag is not emitted.
    pub omit_cbor_tag: bool,
}

impl SignOptions {
    pub fn with_message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Produce an untagged message, for protocols that identify the message
    /// type by other means.
    pub fn without_cbor_tag(mut self) -> Self {
        self.omit_cbor_tag = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_tagged_sign1() {
        let options = SignOptions::default();
        assert_eq!(options.message_type, MessageType::Sign1);
        assert!(!options.omit_cbor_tag);
        assert_eq!(options.message_type.tag(), 18);
    }

    #[test]
    fn builders_compose() {
        let options = SignOptions::default().with_message_type(MessageType::Sign).without_cbor_tag();
        assert_eq!(options.message_type.tag(), 98);
        assert_eq!(options.message_type.sig_structure_context(), "Signature");
        assert!(options.omit_cbor_tag);
    }
}
