// src/ct_log/leaf.rs
//! RFC 6962 MerkleTreeLeaf envelope
//!
//! Every `leaf_input` returned by get-entries is a TLS-encoded
//! `MerkleTreeLeaf` wrapping a `TimestampedEntry`. Only the parts the
//! scanner needs are interpreted; the certificate payload is handed on as a
//! borrowed DER slice.

use thiserror::Error;

const VERSION_V1: u8 = 0;
const TIMESTAMPED_ENTRY: u8 = 0;
const X509_ENTRY: u16 = 0;
const PRECERT_ENTRY: u16 = 1;

/// Reasons a leaf envelope could not be decoded
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeafError {
    #[error("leaf truncated at offset {offset}: {needed} more bytes required")]
    Truncated { offset: usize, needed: usize },

    #[error("unsupported leaf version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown leaf type {0}")]
    UnknownLeafType(u8),

    #[error("unknown entry type {0}")]
    UnknownEntryType(u16),

    #[error("{0} trailing bytes after leaf")]
    TrailingBytes(usize),
}

/// Payload of a timestamped entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntryType<'a> {
    /// DER-encoded final certificate
    X509(&'a [u8]),
    /// Precertificate; the TBS bytes are carried but never decoded
    Precert {
        issuer_key_hash: [u8; 32],
        tbs_certificate: &'a [u8],
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedEntry<'a> {
    /// Milliseconds since the epoch
    pub timestamp: u64,
    pub entry: LogEntryType<'a>,
    pub extensions: &'a [u8],
}

/// Decoded v1 MerkleTreeLeaf borrowing from the raw leaf bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTreeLeaf<'a> {
    pub timestamped_entry: TimestampedEntry<'a>,
}

impl<'a> MerkleTreeLeaf<'a> {
    /// Leaf carrying a final X.509 certificate
    pub fn x509(timestamp: u64, der: &'a [u8]) -> Self {
        Self {
            timestamped_entry: TimestampedEntry {
                timestamp,
                entry: LogEntryType::X509(der),
                extensions: &[],
            },
        }
    }

    /// Leaf carrying a precertificate
    pub fn precert(timestamp: u64, issuer_key_hash: [u8; 32], tbs_certificate: &'a [u8]) -> Self {
        Self {
            timestamped_entry: TimestampedEntry {
                timestamp,
                entry: LogEntryType::Precert {
                    issuer_key_hash,
                    tbs_certificate,
                },
                extensions: &[],
            },
        }
    }

    /// Decode a leaf from its TLS encoding
    pub fn parse(input: &'a [u8]) -> Result<Self, LeafError> {
        let mut reader = Reader::new(input);

        let version = reader.read_uint(1)? as u8;
        if version != VERSION_V1 {
            return Err(LeafError::UnsupportedVersion(version));
        }

        let leaf_type = reader.read_uint(1)? as u8;
        if leaf_type != TIMESTAMPED_ENTRY {
            return Err(LeafError::UnknownLeafType(leaf_type));
        }

        let timestamp = reader.read_uint(8)?;
        let entry_type = reader.read_uint(2)? as u16;

        let entry = match entry_type {
            X509_ENTRY => LogEntryType::X509(reader.read_vec(3)?),
            PRECERT_ENTRY => {
                let mut issuer_key_hash = [0u8; 32];
                issuer_key_hash.copy_from_slice(reader.take(32)?);
                LogEntryType::Precert {
                    issuer_key_hash,
                    tbs_certificate: reader.read_vec(3)?,
                }
            }
            other => return Err(LeafError::UnknownEntryType(other)),
        };

        let extensions = reader.read_vec(2)?;

        if reader.remaining() > 0 {
            return Err(LeafError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            timestamped_entry: TimestampedEntry {
                timestamp,
                entry,
                extensions,
            },
        })
    }

    /// Encode the leaf back into its TLS wire form
    pub fn encode(&self) -> Vec<u8> {
        let entry = &self.timestamped_entry;
        let mut out = Vec::with_capacity(64);

        out.push(VERSION_V1);
        out.push(TIMESTAMPED_ENTRY);
        out.extend_from_slice(&entry.timestamp.to_be_bytes());

        match &entry.entry {
            LogEntryType::X509(der) => {
                out.extend_from_slice(&X509_ENTRY.to_be_bytes());
                push_vec(&mut out, der, 3);
            }
            LogEntryType::Precert {
                issuer_key_hash,
                tbs_certificate,
            } => {
                out.extend_from_slice(&PRECERT_ENTRY.to_be_bytes());
                out.extend_from_slice(issuer_key_hash);
                push_vec(&mut out, tbs_certificate, 3);
            }
        }

        push_vec(&mut out, entry.extensions, 2);
        out
    }
}

fn push_vec(out: &mut Vec<u8>, data: &[u8], len_width: usize) {
    let len = (data.len() as u64).to_be_bytes();
    out.extend_from_slice(&len[8 - len_width..]);
    out.extend_from_slice(data);
}

/// Big-endian cursor over the leaf bytes
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LeafError> {
        if self.remaining() < n {
            return Err(LeafError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_uint(&mut self, width: usize) -> Result<u64, LeafError> {
        Ok(self
            .take(width)?
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    fn read_vec(&mut self, len_width: usize) -> Result<&'a [u8], LeafError> {
        let len = self.read_uint(len_width)? as usize;
        self.take(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_x509_leaf() {
        let der = b"not really der but opaque here";
        let bytes = MerkleTreeLeaf::x509(1_700_000_000_000, der).encode();

        // version, leaf type, timestamp, entry type, u24 length
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 0);
        assert_eq!(&bytes[10..12], &[0, 0]);
        assert_eq!(&bytes[12..15], &[0, 0, der.len() as u8]);

        let leaf = MerkleTreeLeaf::parse(&bytes).unwrap();
        assert_eq!(leaf.timestamped_entry.timestamp, 1_700_000_000_000);
        assert_eq!(leaf.timestamped_entry.entry, LogEntryType::X509(der));
        assert!(leaf.timestamped_entry.extensions.is_empty());
    }

    #[test]
    fn test_parse_precert_leaf() {
        let tbs = [0x30, 0x03, 0x02, 0x01, 0x05];
        let bytes = MerkleTreeLeaf::precert(7, [0xab; 32], &tbs).encode();

        let leaf = MerkleTreeLeaf::parse(&bytes).unwrap();
        match leaf.timestamped_entry.entry {
            LogEntryType::Precert {
                issuer_key_hash,
                tbs_certificate,
            } => {
                assert_eq!(issuer_key_hash, [0xab; 32]);
                assert_eq!(tbs_certificate, &tbs);
            }
            other => panic!("expected precert, got {:?}", other),
        }
    }

    #[test]
    fn test_extensions_are_kept() {
        let mut leaf = MerkleTreeLeaf::x509(1, b"cert");
        leaf.timestamped_entry.extensions = b"ext";
        let bytes = leaf.encode();
        assert_eq!(MerkleTreeLeaf::parse(&bytes).unwrap().timestamped_entry.extensions, b"ext");
    }

    #[test]
    fn test_truncated_leaf() {
        let bytes = MerkleTreeLeaf::x509(1, b"certificate").encode();
        let err = MerkleTreeLeaf::parse(&bytes[..bytes.len() - 4]).unwrap_err();
        assert!(matches!(err, LeafError::Truncated { .. }));

        assert!(matches!(
            MerkleTreeLeaf::parse(b"short"),
            Err(LeafError::Truncated { .. })
        ));
        assert!(MerkleTreeLeaf::parse(&[]).is_err());
    }

    #[test]
    fn test_bad_version_and_leaf_type() {
        let mut bytes = MerkleTreeLeaf::x509(1, b"c").encode();
        bytes[0] = 1;
        assert_eq!(MerkleTreeLeaf::parse(&bytes), Err(LeafError::UnsupportedVersion(1)));

        bytes[0] = 0;
        bytes[1] = 9;
        assert_eq!(MerkleTreeLeaf::parse(&bytes), Err(LeafError::UnknownLeafType(9)));
    }

    #[test]
    fn test_unknown_entry_type() {
        let mut bytes = MerkleTreeLeaf::x509(1, b"c").encode();
        bytes[11] = 5;
        assert_eq!(MerkleTreeLeaf::parse(&bytes), Err(LeafError::UnknownEntryType(5)));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = MerkleTreeLeaf::x509(1, b"c").encode();
        bytes.extend_from_slice(&[1, 2, 3]);
        assert_eq!(MerkleTreeLeaf::parse(&bytes), Err(LeafError::TrailingBytes(3)));
    }
}
