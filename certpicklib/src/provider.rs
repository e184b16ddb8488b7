//! Capabilities consumed from the platform: certificate stores and the certificate picker
//!
//! Handles returned by these functions are owned by the caller, who releases them via the
//! [ReleaseHandle] implementation of the same provider (see [ScopedHandle](crate::handle::ScopedHandle)).

use crate::{decoder::CertIdentity, handle::RawHandle, handle::ReleaseHandle, Result};

/// Certificate store operations needed to populate a disposable collection
pub trait CertStoreProvider: ReleaseHandle {
    /// Creates an empty, process-local certificate collection. Returns [Error::StoreOpen](crate::Error::StoreOpen)
    /// on failure.
    fn open_collection(&self) -> Result<RawHandle>;

    /// Opens the durable store with the given logical name (i.e., `MY`) for reading. Returns
    /// [Error::StoreOpen](crate::Error::StoreOpen) on failure.
    fn open_reference_store(&self, name: &str) -> Result<RawHandle>;

    /// Creates a certificate context from a DER-encoded certificate. Returns
    /// [Error::CertContext](crate::Error::CertContext) on failure.
    fn create_cert_context(&self, der_cert: &[u8]) -> Result<RawHandle>;

    /// Returns a certificate context for the entry in `store` matching `id`, or None if there is no
    /// such entry.
    fn find_by_identity(&self, store: RawHandle, id: &CertIdentity) -> Result<Option<RawHandle>>;

    /// Adds the certificate context to the store. The store keeps its own reference; ownership of
    /// `cert` remains with the caller. Returns [Error::ResolveAdd](crate::Error::ResolveAdd) on failure.
    fn add_cert_context(&self, store: RawHandle, cert: RawHandle) -> Result<()>;

    /// Returns the DER encoding of the certificate context
    fn encoded_cert(&self, cert: RawHandle) -> Result<Vec<u8>>;
}

/// Text shown by the picker, plus the window that should own it
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PickerPrompt {
    /// Window title
    pub title: Option<String>,
    /// Text displayed above the list of certificates
    pub display_string: Option<String>,
    /// Owner window handle, if any
    pub owner_window: Option<isize>,
}

/// Modal certificate picker
pub trait CertPicker {
    /// Displays the certificates in `collection` and blocks until the user dismisses the picker.
    /// Returns a certificate context (owned by the caller and released via the store provider used to
    /// open `collection`) or None if nothing was chosen. Returns
    /// [Error::PickerInvocation](crate::Error::PickerInvocation) if the picker could not be shown.
    fn pick(&self, collection: RawHandle, prompt: &PickerPrompt) -> Result<Option<RawHandle>>;
}
