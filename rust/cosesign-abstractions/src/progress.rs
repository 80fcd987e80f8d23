// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Outcome of an operation that may need to be called again.
///
/// `InProgress` is not a failure: the caller must repeat the same call with
/// the same arguments until it returns `Complete` or an error. Payload and
/// AAD must not change between those calls.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<T> {
    Complete(T),
    InProgress,
}

/// Status of a signing step that produces nothing besides encoder output.
pub type SignStatus = Progress<()>;

impl<T> Progress<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Progress::Complete(_))
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Progress::InProgress)
    }

    pub fn complete(self) -> Option<T> {
        match self {
            Progress::Complete(v) => Some(v),
            Progress::InProgress => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Progress<U> {
        match self {
            Progress::Complete(v) => Progress::Complete(f(v)),
            Progress::InProgress => Progress::InProgress,
        }
    }
}
