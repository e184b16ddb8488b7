//! Windows-specific implementations of the certificate store and picker capabilities

#![cfg(target_os = "windows")]

use windows::Win32::Security::Cryptography::{
    CERT_OPEN_STORE_FLAGS, CERT_QUERY_ENCODING_TYPE, PKCS_7_ASN_ENCODING, X509_ASN_ENCODING,
};

pub(crate) mod cert_store;
pub(crate) mod picker;

/// `CERT_SYSTEM_STORE_CURRENT_USER` (CERT_SYSTEM_STORE_CURRENT_USER_ID << CERT_SYSTEM_STORE_LOCATION_SHIFT)
pub(crate) const CERT_SYSTEM_STORE_CURRENT_USER: CERT_OPEN_STORE_FLAGS =
    CERT_OPEN_STORE_FLAGS(1u32 << 16);

/// Encoding type used for all certificate operations
pub(crate) const CERT_ENCODING: CERT_QUERY_ENCODING_TYPE =
    CERT_QUERY_ENCODING_TYPE(X509_ASN_ENCODING.0 | PKCS_7_ASN_ENCODING.0);

/// Returns the status code associated with the most recent failure on the calling thread
pub(crate) fn last_error_status() -> u32 {
    windows::core::Error::from_win32().code().0 as u32
}
