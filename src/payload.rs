//! The payload record external callers store, keyed by the signature key.
//! This crate never persists it — it only shapes and hashes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Render the raw 16-byte key as a canonical 8-4-4-4-12 hex string.
///
/// `Uuid::from_bytes` imposes no version/variant validation, so any 16
/// bytes round-trip losslessly through this string form — exactly what the
/// codec needs, since the key is an opaque identifier, not an RFC-4122 UUID.
pub fn key_to_uuid_string(key: &[u8; 16]) -> String {
    Uuid::from_bytes(*key).to_string()
}

pub fn uuid_string_to_key(s: &str) -> Option<[u8; 16]> {
    Uuid::parse_str(s).ok().map(|u| *u.as_bytes())
}

/// Human-meaningful metadata, stored externally and looked up by
/// signature key. Field order matters: `payload_hash` is computed over the
/// JSON serialization of this struct in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payload {
    pub signature_key: String,
    pub project_label: String,
    pub recipient_label: String,
    pub created_at: DateTime<Utc>,
}

impl Payload {
    pub fn new(key: &[u8; 16], project: impl Into<String>, recipient: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Payload {
            signature_key: key_to_uuid_string(key),
            project_label: project.into(),
            recipient_label: recipient.into(),
            created_at,
        }
    }

    /// Hex-encoded SHA-256 of this record's JSON serialization.
    pub fn hash(&self) -> String {
        let json = serde_json::to_vec(self).expect("Payload always serializes");
        hex_encode(&Sha256::digest(json))
    }
}

/// Hex-encoded SHA-256 of a raw 16-byte signature key, used for the
/// lookup-miss scenario where a payload record was never stored.
pub fn key_hash(key: &[u8; 16]) -> String {
    hex_encode(&Sha256::digest(key))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}
