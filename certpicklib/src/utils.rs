//! Utility functions for use within certpicklib

use sha2::{Digest, Sha256};
use subtle_encoding::hex;

/// Takes a buffer and returns a String containing an ASCII hex representation of the buffer's contents
pub(crate) fn buffer_to_hex(buffer: &[u8]) -> String {
    let hex = hex::encode_upper(buffer);
    let r = std::str::from_utf8(hex.as_slice());
    if let Ok(s) = r {
        s.to_string()
    } else {
        String::new()
    }
}

/// Returns the SHA-256 thumbprint of a DER-encoded certificate as an uppercase hex string
pub(crate) fn thumbprint(der_cert: &[u8]) -> String {
    buffer_to_hex(&Sha256::digest(der_cert))
}

#[test]
fn buffer_to_hex_test() {
    assert_eq!(buffer_to_hex(&[0x00, 0x1f, 0xab]), "001FAB");
    assert_eq!(buffer_to_hex(&[]), "");
}

#[test]
fn thumbprint_test() {
    assert_eq!(
        thumbprint(b"abc"),
        "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
    );
}
