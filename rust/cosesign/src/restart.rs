// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use cosesign_common::MAX_HASH_SIZE;

/// Caller-owned storage that lets a suspended signature resume where it
/// stopped.
///
/// Attach it to a [`crate::MainSigner`] to allow the crypto backend to
/// return in-progress. While [`RestartState::is_started`] is true the state
/// belongs to that signer's signing pass and must be left alone; the
/// to-be-signed hash stored here is reused instead of being recomputed. The
/// signature itself is written directly into the region the signer reserved
/// in the encoder output, which stays open across the suspension.
#[derive(Debug, Clone)]
pub struct RestartState {
    pub(crate) started: bool,
    pub(crate) tbs_hash: [u8; MAX_HASH_SIZE],
    pub(crate) tbs_hash_len: usize,
}

impl RestartState {
    pub fn new() -> Self {
        Self {
            started: false,
            tbs_hash: [0u8; MAX_HASH_SIZE],
            tbs_hash_len: 0,
        }
    }

    /// True while a signature is suspended.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn tbs_hash(&self) -> &[u8] {
        &self.tbs_hash[..self.tbs_hash_len]
    }
}

impl Default for RestartState {
    fn default() -> Self {
        Self::new()
    }
}
