// src/cert_parser.rs
use sha2::{Digest, Sha256};
use thiserror::Error;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::*;

/// The DER payload of an X.509 entry could not be decoded
#[derive(Debug, Error)]
#[error("failed to parse X.509 certificate: {0}")]
pub struct CertParseError(String);

/// Decoded certificate borrowed from a log entry.
///
/// Keeps the DER bytes next to the parsed view so callers can fingerprint or
/// re-export the certificate without a second decode.
pub struct ParsedCertificate<'a> {
    der: &'a [u8],
    x509: X509Certificate<'a>,
}

impl<'a> ParsedCertificate<'a> {
    /// Parse a DER-encoded certificate
    pub fn from_der(der: &'a [u8]) -> Result<Self, CertParseError> {
        let (_, x509) =
            X509Certificate::from_der(der).map_err(|e| CertParseError(format!("{:?}", e)))?;
        Ok(Self { der, x509 })
    }

    pub fn der(&self) -> &'a [u8] {
        self.der
    }

    /// Full x509-parser view for callers that need more than the accessors below
    pub fn x509(&self) -> &X509Certificate<'a> {
        &self.x509
    }

    /// First Common Name (CN) of the subject, if any
    pub fn common_name(&self) -> Option<&str> {
        self.x509
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
    }

    /// Every Common Name attribute of the subject, in order
    pub fn common_names(&self) -> Vec<&str> {
        self.x509
            .subject()
            .iter_common_name()
            .filter_map(|cn| cn.as_str().ok())
            .collect()
    }

    /// Textual Subject Alternative Name entries (DNS, email and URI names)
    pub fn alt_names(&self) -> Vec<&str> {
        let mut names = Vec::new();

        for ext in self.x509.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for general_name in &san.general_names {
                    match general_name {
                        GeneralName::DNSName(name)
                        | GeneralName::RFC822Name(name)
                        | GeneralName::URI(name) => names.push(*name),
                        _ => {}
                    }
                }
            }
        }

        names
    }

    /// Issuer CN, falling back to the full issuer DN
    pub fn issuer(&self) -> String {
        self.x509
            .issuer()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| self.x509.issuer().to_string())
    }

    /// Validity start as a Unix timestamp
    pub fn not_before(&self) -> i64 {
        self.x509.validity().not_before.timestamp()
    }

    /// Validity end as a Unix timestamp
    pub fn not_after(&self) -> i64 {
        self.x509.validity().not_after.timestamp()
    }

    /// Hex SHA-256 of the DER encoding
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.der);
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for ParsedCertificate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedCertificate")
            .field("common_name", &self.common_name())
            .field("alt_names", &self.alt_names())
            .field("issuer", &self.issuer())
            .finish()
    }
}
