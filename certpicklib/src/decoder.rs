//! Decodes textual certificate representations into parsed certificates
//!
//! Text may be PEM-armored (any `-----BEGIN <label>-----` / `-----END <label>-----` pair is accepted)
//! or bare base64. Whitespace within the base64 body is ignored.

use base64ct::{Base64, Encoding};
use der::{Decode, Encode};
use log::debug;
use x509_cert::Certificate;

use crate::{utils::thumbprint, Error, Result};

const BEGIN_MARKER: &str = "-----BEGIN ";
const END_MARKER: &str = "-----END ";
const MARKER_TAIL: &str = "-----";

/// Issuer and serial number of a certificate, used to look for the same certificate in a store
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CertIdentity {
    /// DER-encoded issuer name
    pub issuer: Vec<u8>,
    /// Serial number bytes, big-endian as they appear in the certificate
    pub serial: Vec<u8>,
}

/// A certificate that has been base64 decoded and parsed. Equality is based on the DER encoding.
#[derive(Clone, Debug)]
pub struct ParsedCertificate {
    der: Vec<u8>,
    cert: Certificate,
    identity: CertIdentity,
}

impl PartialEq for ParsedCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}
impl Eq for ParsedCertificate {}

impl ParsedCertificate {
    /// Parses a DER-encoded certificate
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let cert = Certificate::from_der(&der)?;
        let identity = CertIdentity {
            issuer: cert.tbs_certificate.issuer.to_der()?,
            serial: cert.tbs_certificate.serial_number.as_bytes().to_vec(),
        };
        Ok(ParsedCertificate {
            der,
            cert,
            identity,
        })
    }

    /// Returns the DER encoding of the certificate
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the parsed certificate
    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    /// Returns the issuer and serial number of the certificate
    pub fn identity(&self) -> &CertIdentity {
        &self.identity
    }

    /// Returns the subject name as an RFC 4514 string
    pub fn subject(&self) -> String {
        self.cert.tbs_certificate.subject.to_string()
    }

    /// Returns the SHA-256 thumbprint of the certificate as an uppercase hex string
    pub fn thumbprint(&self) -> String {
        thumbprint(&self.der)
    }
}

/// Returns the base64 body of `text`, i.e., the content between the BEGIN and END lines for armored
/// input or the entire text otherwise.
fn strip_armor(text: &str) -> Result<&str> {
    let Some(begin) = text.find(BEGIN_MARKER) else {
        return Ok(text);
    };
    let after_begin = &text[begin + BEGIN_MARKER.len()..];
    let Some(label_len) = after_begin.find(MARKER_TAIL) else {
        debug!("PEM header is not terminated");
        return Err(Error::MalformedInput);
    };
    let label = &after_begin[..label_len];
    if label.is_empty() || label.contains(['\r', '\n']) {
        debug!("PEM header has an invalid label");
        return Err(Error::MalformedInput);
    }

    let body = &after_begin[label_len + MARKER_TAIL.len()..];
    let end_line = format!("{END_MARKER}{label}{MARKER_TAIL}");
    match body.find(&end_line) {
        Some(end) => Ok(&body[..end]),
        None => {
            debug!("PEM footer for {label} was not found");
            Err(Error::MalformedInput)
        }
    }
}

/// Takes a PEM-armored or bare base64 certificate and returns a [ParsedCertificate].
///
/// Returns [Error::MalformedInput] if the text is empty or its armor is incomplete, [Error::Decode] if
/// the body is not valid base64 and [Error::Parse] if the decoded bytes are not a certificate.
pub fn decode_certificate_text(text: &str) -> Result<ParsedCertificate> {
    let body = strip_armor(text.trim())?;
    let stripped: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if stripped.is_empty() {
        return Err(Error::MalformedInput);
    }
    let der = Base64::decode_vec(&stripped)?;
    ParsedCertificate::from_der(der)
}
