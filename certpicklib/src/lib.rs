#![doc = include_str!("../README.md")]

pub mod decoder;
pub mod handle;
pub mod mem_store;
pub mod options;
pub mod provider;
pub mod resolver;
pub mod selection;
pub mod session;

mod misc_win;
mod utils;

pub use crate::decoder::{decode_certificate_text, CertIdentity, ParsedCertificate};
pub use crate::options::SelectOptions;
pub use crate::selection::{CandidateStatus, ResolvedFrom, Selection, SelectionOutcome, NO_SELECTION};
pub use crate::session::SelectionSession;

#[cfg(target_os = "windows")]
pub use crate::misc_win::{cert_store::WinCertStore, picker::WinPicker};

/// Result type for certpicklib
pub type Result<T> = core::result::Result<T, Error>;

/// Names the OS-level function that failed along with the status code it reported
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PlatformFailure {
    /// Name of the failing function, i.e., `CertOpenStore`
    pub api: &'static str,
    /// Status code (GetLastError value on Windows, zero when none is available)
    pub status: u32,
}

impl PlatformFailure {
    /// Creates a new PlatformFailure for the named function and status code
    pub fn new(api: &'static str, status: u32) -> Self {
        PlatformFailure { api, status }
    }
}

/// Error values for certpicklib
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Certificate text was empty or its armor was structurally invalid
    MalformedInput,
    /// Certificate text was not valid base64
    Decode(base64ct::Error),
    /// Decoded bytes were not a DER-encoded certificate
    Parse(der::Error),
    /// Reference store or disposable collection could not be opened
    StoreOpen(PlatformFailure),
    /// A parsed certificate was rejected by the platform when creating a certificate context
    CertContext(PlatformFailure),
    /// A certificate could not be added to the disposable collection
    ResolveAdd(PlatformFailure),
    /// The picker could not be displayed
    PickerInvocation(PlatformFailure),
    /// Candidates were supplied but none of them could be decoded
    NoDecodableCandidates,
    /// The native certificate selection dialog does not exist on this platform
    PickerUnavailable,
    Io,
    SerdeJson,
}

impl Error {
    /// Returns true for conditions that abort a selection session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::StoreOpen(_)
                | Error::PickerInvocation(_)
                | Error::NoDecodableCandidates
                | Error::PickerUnavailable
        )
    }
}

use std::io;
impl From<io::Error> for Error {
    fn from(_: io::Error) -> Error {
        Error::Io
    }
}
impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Parse(err)
    }
}
impl From<base64ct::Error> for Error {
    fn from(err: base64ct::Error) -> Error {
        Error::Decode(err)
    }
}
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        use log::error;
        error!("serde_json::Error: {err}");
        Error::SerdeJson
    }
}

/// Presents the native certificate picker constrained to `candidates` and returns the zero-based
/// index of the chosen certificate, or [NO_SELECTION] (-1) when nothing was chosen.
///
/// Candidates are matched against the current user's `MY` store so that entries with associated
/// private keys are offered in place of the raw certificate. The call blocks until the dialog is
/// dismissed.
#[cfg(target_os = "windows")]
pub fn select_client_cert<S: AsRef<str>>(candidates: &[S]) -> Result<i32> {
    select_client_cert_with_options(candidates, &SelectOptions::default())
}

/// As [select_client_cert] but using the provided [SelectOptions]
#[cfg(target_os = "windows")]
pub fn select_client_cert_with_options<S: AsRef<str>>(
    candidates: &[S],
    options: &SelectOptions,
) -> Result<i32> {
    let store = WinCertStore;
    let picker = WinPicker::default();
    let session = SelectionSession::new(&store, &picker, options);
    let outcome = session.select(candidates)?;
    Ok(outcome.selection.as_index())
}
