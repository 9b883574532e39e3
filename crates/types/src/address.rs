use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a hardware address string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("malformed address")]
    Malformed { input: String },
    #[error("malformed prefix: {input}")]
    MalformedPrefix { input: String },
}

/// Number of raw bytes contained in a hardware address.
pub const ADDRESS_BYTES: usize = 6;
/// Number of raw bytes in a manufacturer-block prefix.
pub const PREFIX_BYTES: usize = 3;
/// Length of the canonical (dense, uppercase) address string.
pub const CANONICAL_LENGTH: usize = ADDRESS_BYTES * 2;

/// Six two-digit groups joined by `:` or `-`, or twelve contiguous hex digits.
static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$|^[0-9A-Fa-f]{12}$")
        .expect("static address pattern compiles")
});

/// A 48-bit hardware address.
///
/// Always renders in canonical form: 12 uppercase hexadecimal characters
/// with no separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; ADDRESS_BYTES]);

impl MacAddress {
    pub fn from_octets(octets: [u8; ADDRESS_BYTES]) -> Self {
        MacAddress(octets)
    }

    pub fn octets(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Dense uppercase form, e.g. `AABBCCDDEEFF`.
    pub fn canonical(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Colon separated uppercase form, e.g. `AA:BB:CC:DD:EE:FF`.
    pub fn colon_separated(&self) -> String {
        group_octets(&self.0)
    }

    /// Manufacturer block this address belongs to.
    pub fn prefix(&self) -> OuiPrefix {
        OuiPrefix([self.0[0], self.0[1], self.0[2]])
    }
}

/// Validate a raw address string and normalize it to a [`MacAddress`].
///
/// Surrounding whitespace is ignored. Accepts `AA:BB:CC:DD:EE:FF`,
/// `AA-BB-CC-DD-EE-FF` and `AABBCCDDEEFF` in any letter case.
pub fn validate(raw: &str) -> Result<MacAddress, AddressError> {
    let trimmed = raw.trim();
    if !ADDRESS_PATTERN.is_match(trimmed) {
        return Err(AddressError::Malformed {
            input: raw.to_string(),
        });
    }

    let dense: String = trimmed.chars().filter(|c| *c != ':' && *c != '-').collect();
    let mut octets = [0u8; ADDRESS_BYTES];
    hex::decode_to_slice(&dense, &mut octets).map_err(|_| AddressError::Malformed {
        input: raw.to_string(),
    })?;

    Ok(MacAddress(octets))
}

/// Derive the manufacturer-block prefix of an address.
pub fn derive_prefix(address: &MacAddress) -> OuiPrefix {
    address.prefix()
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for MacAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

impl From<MacAddress> for String {
    fn from(value: MacAddress) -> Self {
        value.canonical()
    }
}

impl TryFrom<String> for MacAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(&value)
    }
}

/// The top 24 bits of a hardware address, assigned to one manufacturer.
///
/// [`OuiPrefix::key`] is the registry storage key (`ACDE48`); `Display`
/// renders the human readable form (`AC:DE:48`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OuiPrefix([u8; PREFIX_BYTES]);

impl OuiPrefix {
    pub fn from_octets(octets: [u8; PREFIX_BYTES]) -> Self {
        OuiPrefix(octets)
    }

    /// Parse a storage key. Hyphens, colons and surrounding whitespace are
    /// tolerated so feed-style identifiers (`AC-DE-48`) parse as well.
    pub fn from_key(key: &str) -> Result<Self, AddressError> {
        let dense: String = key
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        let mut octets = [0u8; PREFIX_BYTES];
        hex::decode_to_slice(&dense, &mut octets).map_err(|_| AddressError::MalformedPrefix {
            input: key.to_string(),
        })?;
        Ok(OuiPrefix(octets))
    }

    pub fn octets(&self) -> &[u8; PREFIX_BYTES] {
        &self.0
    }

    /// Registry key: six uppercase hex characters without separators.
    pub fn key(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Human readable form with `:` every two characters.
    pub fn display_form(&self) -> String {
        group_octets(&self.0)
    }
}

impl fmt::Display for OuiPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_form())
    }
}

impl From<OuiPrefix> for String {
    fn from(value: OuiPrefix) -> Self {
        value.key()
    }
}

impl TryFrom<String> for OuiPrefix {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OuiPrefix::from_key(&value)
    }
}

fn group_octets(octets: &[u8]) -> String {
    octets
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
