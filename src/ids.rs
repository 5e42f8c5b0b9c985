use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Number of characters in a textual record id.
pub const RECORD_ID_LEN: usize = 24;

lazy_static! {
    static ref PROCESS_SALT: [u8; 5] = {
        let mut salt = [0u8; 5];
        rand::thread_rng().fill_bytes(&mut salt);
        salt
    };
    static ref COUNTER: AtomicU32 = AtomicU32::new(rand::random::<u32>() & 0x00ff_ffff);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordIdError {
    #[error("id must be exactly {RECORD_ID_LEN} characters")]
    Length,
    #[error("id must be a hexadecimal string")]
    NotHex,
}

/// Identifier for users and experiences.
///
/// 12 bytes rendered as 24 lowercase hex characters: 4 bytes of big-endian
/// Unix seconds, 5 per-process random bytes, 3 bytes of a wrapping counter.
/// Ids minted later in the same process compare greater as strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        Self::generate_at(OffsetDateTime::now_utc())
    }

    pub fn generate_at(at: OffsetDateTime) -> Self {
        let secs = u32::try_from(at.unix_timestamp().max(0)).unwrap_or(u32::MAX);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_SALT);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Parse a client-supplied id. Upper-case hex is accepted and normalised.
    pub fn parse(raw: &str) -> Result<Self, RecordIdError> {
        if raw.len() != RECORD_ID_LEN {
            return Err(RecordIdError::Length);
        }
        if !is_hex(raw) {
            return Err(RecordIdError::NotHex);
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub(crate) fn is_hex(raw: &str) -> bool {
    lazy_static! {
        static ref HEX_RE: Regex = Regex::new(r"^[0-9a-fA-F]+$").unwrap();
    }
    HEX_RE.is_match(raw)
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_24_lowercase_hex() {
        let id = RecordId::generate();
        assert_eq!(id.as_str().len(), RECORD_ID_LEN);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let at = OffsetDateTime::now_utc();
        let first = RecordId::generate_at(at);
        let second = RecordId::generate_at(at + time::Duration::seconds(1));
        assert!(second > first);
    }

    #[test]
    fn parse_rejects_wrong_length_and_non_hex() {
        assert_eq!(RecordId::parse("abc"), Err(RecordIdError::Length));
        assert_eq!(
            RecordId::parse("zzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(RecordIdError::NotHex)
        );
        let ok = RecordId::parse("65A1B2C3D4E5F60718293A4B").unwrap();
        assert_eq!(ok.as_str(), "65a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn serde_goes_through_parse() {
        let id: RecordId = serde_json::from_str("\"65a1b2c3d4e5f60718293a4b\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"65a1b2c3d4e5f60718293a4b\"");
        assert!(serde_json::from_str::<RecordId>("\"nope\"").is_err());
    }
}
