//! Utility functions shared by the extension policy rules

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::FromStr;

use der::asn1::{BitString, GeneralizedTime, ObjectIdentifier};
use der::Encode;
use sha1::{Digest, Sha1};
use spki::SubjectPublicKeyInfoOwned;
use subtle_encoding::hex;
use x509_cert::name::Name;

use crate::util::error::*;
use cfg_if::cfg_if;

#[cfg(feature = "std")]
use std::{fs::File, io::Read, path::Path};

/// Number of milliseconds represented by the `M` offset suffix. This is thirty hours, not thirty days.
pub const MONTH_SUFFIX_MILLIS: u64 = 30 * 60 * 60 * 1000;

/// `buffer_to_hex` returns an upper case ASCII hex representation of the given buffer.
pub fn buffer_to_hex(buffer: &[u8]) -> String {
    let hex = hex::encode_upper(buffer);
    let r = core::str::from_utf8(hex.as_slice());
    match r {
        Ok(s) => s.to_string(),
        Err(_) => String::new(),
    }
}

/// `hex_to_buffer` decodes an upper or lower case ASCII hex string. Whitespace and colons are ignored.
pub fn hex_to_buffer(s: &str) -> Result<Vec<u8>> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    match hex::decode(cleaned.to_lowercase().as_bytes()) {
        Ok(b) => Ok(b),
        Err(_) => Err(Error::ParseError),
    }
}

/// `parse_oid` parses a dotted decimal object identifier from a configuration value, naming the
/// offending item in the resulting [`Error::Misconfiguration`] on failure.
pub fn parse_oid(item: &str, value: &str) -> Result<ObjectIdentifier> {
    match ObjectIdentifier::from_str(value.trim()) {
        Ok(oid) => Ok(oid),
        Err(_) => Err(Error::Misconfiguration(format!(
            "{} is not a valid object identifier: {}",
            item, value
        ))),
    }
}

/// `parse_offset_millis` interprets a time offset string used to define validity style windows.
///
/// A bare number is a count of milliseconds. A trailing unit character scales the number:
/// `s` (seconds), `m` (minutes), `h` (hours), `D` (days) and `M`, which is scaled by
/// [`MONTH_SUFFIX_MILLIS`]. A blank string returns None.
pub fn parse_offset_millis(offset: &str) -> Result<Option<u64>> {
    let offset = offset.trim();
    if offset.is_empty() {
        return Ok(None);
    }

    let (digits, multiplier) = match offset.chars().last() {
        Some('s') => (&offset[..offset.len() - 1], 1000),
        Some('m') => (&offset[..offset.len() - 1], 60 * 1000),
        Some('h') => (&offset[..offset.len() - 1], 60 * 60 * 1000),
        Some('D') => (&offset[..offset.len() - 1], 24 * 60 * 60 * 1000),
        Some('M') => (&offset[..offset.len() - 1], MONTH_SUFFIX_MILLIS),
        _ => (offset, 1),
    };

    let count = match digits.trim().parse::<u64>() {
        Ok(c) => c,
        Err(_) => {
            return Err(Error::Misconfiguration(format!(
                "invalid time offset: {}",
                offset
            )))
        }
    };
    match count.checked_mul(multiplier) {
        Some(ms) => Ok(Some(ms)),
        None => Err(Error::Misconfiguration(format!(
            "time offset out of range: {}",
            offset
        ))),
    }
}

/// `millis_to_generalized_time` converts milliseconds since the Unix epoch to a GeneralizedTime,
/// truncating to whole seconds.
pub fn millis_to_generalized_time(millis: u64) -> Result<GeneralizedTime> {
    Ok(GeneralizedTime::from_unix_duration(
        core::time::Duration::from_secs(millis / 1000),
    )?)
}

/// `spki_sha1` returns the SHA-1 digest of the DER encoding of the given SubjectPublicKeyInfo.
pub fn spki_sha1(spki: &SubjectPublicKeyInfoOwned) -> Result<Vec<u8>> {
    let enc = spki.to_der()?;
    Ok(Sha1::digest(enc.as_slice()).to_vec())
}

/// `public_key_sha1` returns the SHA-1 digest of the bytes of a subjectPublicKey BIT STRING, i.e.,
/// method 1 from RFC 5280 section 4.2.1.2.
pub fn public_key_sha1(public_key: &BitString) -> Vec<u8> {
    Sha1::digest(public_key.raw_bytes()).to_vec()
}

/// `name_is_empty` returns true when a Name contains no relative distinguished names.
pub fn name_is_empty(name: &Name) -> bool {
    name.0.is_empty()
}

/// `parse_bool_str` interprets `true` and `false`, ignoring case and surrounding whitespace.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

cfg_if! {
    if #[cfg(feature = "std")] {
        /// `current_time_secs` returns the current time in seconds since the Unix epoch.
        pub fn current_time_secs() -> u64 {
            match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
                Ok(d) => d.as_secs(),
                Err(_) => 0,
            }
        }
    } else {
        /// `current_time_secs` returns zero when no clock is available. Set the time of interest on
        /// each request instead.
        pub fn current_time_secs() -> u64 {
            0
        }
    }
}

/// `get_file_as_byte_vec` reads the contents of the named file into a buffer.
#[cfg(feature = "std")]
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    match File::open(filename) {
        Ok(mut f) => {
            let mut buffer = Vec::new();
            match f.read_to_end(&mut buffer) {
                Ok(_) => Ok(buffer),
                Err(e) => Err(Error::StdIoError(e.kind())),
            }
        }
        Err(e) => Err(Error::StdIoError(e.kind())),
    }
}

#[test]
fn offsets() {
    assert_eq!(None, parse_offset_millis("").unwrap());
    assert_eq!(Some(1500), parse_offset_millis("1500").unwrap());
    assert_eq!(Some(30_000), parse_offset_millis("30s").unwrap());
    assert_eq!(Some(120_000), parse_offset_millis("2m").unwrap());
    assert_eq!(Some(3_600_000), parse_offset_millis("1h").unwrap());
    assert_eq!(Some(5 * 86_400_000), parse_offset_millis("5D").unwrap());
    assert!(parse_offset_millis("5Y").is_err());
    assert!(parse_offset_millis("-5D").is_err());
}

#[test]
fn month_offset_is_thirty_hours() {
    // the M suffix has always meant 30 * 60 * 60 * 1000 ms
    assert_eq!(Some(108_000_000), parse_offset_millis("1M").unwrap());
    assert_ne!(Some(30 * 86_400_000), parse_offset_millis("1M").unwrap());
}

#[test]
fn hex_round_trip() {
    use hex_literal::hex;
    let b = hex!("0A1B2C");
    assert_eq!("0A1B2C", buffer_to_hex(&b));
    assert_eq!(b.to_vec(), hex_to_buffer("0a:1b:2c").unwrap());
    assert!(hex_to_buffer("0g").is_err());
}

#[test]
fn oid_parsing() {
    assert!(parse_oid("id0", "1.3.6.1.5.5.7.3.1").is_ok());
    match parse_oid("id0", "not.an.oid") {
        Err(Error::Misconfiguration(s)) => assert!(s.contains("id0")),
        _ => panic!("expected misconfiguration"),
    }
}
