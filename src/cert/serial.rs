use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use thiserror::Error;

/// Length in bytes of freshly generated serial numbers
const SERIAL_LEN: usize = 16;

/// Certificate serial number, stored as lowercase hex without separators
#[derive(Debug, Clone, Eq)]
pub struct SerialNumber {
    hex: String,
}

#[derive(Error, Debug)]
pub enum SerialNumberParseError {
    #[error("Invalid hex character: {0}")]
    InvalidHexCharacter(char),

    #[error("Empty string provided")]
    EmptyString,

    #[error("Invalid length: expected even number of hex characters")]
    InvalidLength,
}

pub type Result<T> = std::result::Result<T, SerialNumberParseError>;

impl SerialNumber {
    /// Generate a random, positive serial number.
    ///
    /// 127 bits of entropy from the thread-local CSPRNG; safe to call from
    /// any number of threads at once.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SERIAL_LEN];
        rand::rng().fill_bytes(&mut bytes);
        // Positive INTEGER with no leading zero octet
        bytes[0] = (bytes[0] & 0x7f) | 0x40;
        Self::from_bytes(&bytes)
    }

    /// Build from big-endian bytes as found in a DER INTEGER
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            hex: hex::encode(bytes),
        }
    }

    /// Parse a hex identifier, with or without colons
    pub fn parse(identifier: &str) -> Result<Self> {
        if identifier.is_empty() {
            return Err(SerialNumberParseError::EmptyString);
        }

        let cleaned = identifier.replace(':', "").to_lowercase();

        if let Some(ch) = cleaned.chars().find(|ch| !ch.is_ascii_hexdigit()) {
            return Err(SerialNumberParseError::InvalidHexCharacter(ch));
        }

        if cleaned.len() % 2 != 0 {
            return Err(SerialNumberParseError::InvalidLength);
        }

        Ok(Self { hex: cleaned })
    }

    /// Big-endian bytes of the serial
    pub fn to_bytes(&self) -> Vec<u8> {
        // Constructors only ever admit even-length hex
        hex::decode(&self.hex).unwrap_or_default()
    }

    /// Get the raw hex format (no colons)
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Get the colon-separated hex format (e.g., "4b:fc:2e:b1...")
    pub fn as_colon_hex(&self) -> String {
        self.hex
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

impl FromStr for SerialNumber {
    type Err = SerialNumberParseError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Hash for SerialNumber {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hex.hash(state);
    }
}

impl PartialEq for SerialNumber {
    fn eq(&self, other: &Self) -> bool {
        self.hex == other.hex
    }
}

impl From<&SerialNumber> for rcgen::SerialNumber {
    fn from(serial: &SerialNumber) -> Self {
        rcgen::SerialNumber::from_slice(&serial.to_bytes())
    }
}

impl Serialize for SerialNumber {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_colon_hex())
    }
}

impl<'de> Deserialize<'de> for SerialNumber {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SerialNumber::parse(&s).map_err(serde::de::Error::custom)
    }
}
