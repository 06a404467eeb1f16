//! Parsing of general names and name constraint subtrees from configuration values.
//!
//! A general name is configured as a choice and a value, e.g., `generalNameChoice: "DNSName"` and
//! `generalNameValue: "example.com"`. Choice names are matched without regard to case and the
//! following choices (and aliases) are recognized:
//!
//! | Choice | Aliases | Value |
//! |---|---|---|
//! | RFC822Name | email | mailbox or domain |
//! | DNSName | dns | host or domain name |
//! | DirectoryName | dn | distinguished name string, e.g., `cn=Joe,o=Example` |
//! | URIName | uri, uniformResourceIdentifier | URI |
//! | IPAddress | ip | IPv4 or IPv6 address; subtrees add `/mask` or `/prefix` |
//! | OIDName | registeredID | dotted object identifier |
//! | OtherName | | `(IA5String)1.2.3,value`, `(PrintableString)...` or `(UTF8String)...` |
//!
//! EDIPartyName and X400Address are recognized and rejected as unsupported.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::net::IpAddr;
use core::str::FromStr;

use der::asn1::{Any, Ia5String, OctetString, PrintableString};
use x509_cert::ext::pkix::constraints::name::GeneralSubtree;
use x509_cert::ext::pkix::name::{GeneralName, OtherName};
use x509_cert::name::Name;

use crate::config::policy_config::PolicyRuleConfig;
use crate::util::error::*;
use crate::util::policy_utilities::parse_oid;

/// Configuration item naming the general name choice
pub const GENERAL_NAME_CHOICE: &str = "generalNameChoice";
/// Configuration item holding the general name value
pub const GENERAL_NAME_VALUE: &str = "generalNameValue";

/// Supported general name forms
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GeneralNameChoice {
    /// rfc822Name
    Rfc822Name,
    /// dNSName
    DnsName,
    /// directoryName
    DirectoryName,
    /// uniformResourceIdentifier
    UriName,
    /// iPAddress
    IpAddress,
    /// registeredID
    OidName,
    /// otherName
    OtherName,
}

impl FromStr for GeneralNameChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rfc822name" | "email" => Ok(GeneralNameChoice::Rfc822Name),
            "dnsname" | "dns" => Ok(GeneralNameChoice::DnsName),
            "directoryname" | "dn" => Ok(GeneralNameChoice::DirectoryName),
            "uriname" | "uri" | "uniformresourceidentifier" => Ok(GeneralNameChoice::UriName),
            "ipaddress" | "ip" => Ok(GeneralNameChoice::IpAddress),
            "oidname" | "registeredid" => Ok(GeneralNameChoice::OidName),
            "othername" => Ok(GeneralNameChoice::OtherName),
            "edipartyname" | "x400address" => Err(Error::Misconfiguration(format!(
                "general name choice {} is not supported",
                s
            ))),
            _ => Err(Error::Misconfiguration(format!(
                "unrecognized general name choice: {}",
                s
            ))),
        }
    }
}

fn ia5(choice: &str, value: &str) -> Result<Ia5String> {
    match Ia5String::new(value) {
        Ok(v) => Ok(v),
        Err(_) => Err(Error::Misconfiguration(format!(
            "{} value is not an IA5String: {}",
            choice, value
        ))),
    }
}

fn parse_ip(value: &str) -> Result<Vec<u8>> {
    match IpAddr::from_str(value.trim()) {
        Ok(IpAddr::V4(a)) => Ok(a.octets().to_vec()),
        Ok(IpAddr::V6(a)) => Ok(a.octets().to_vec()),
        Err(_) => Err(Error::Misconfiguration(format!(
            "invalid IP address: {}",
            value
        ))),
    }
}

/// Parses an address with a netmask (`10.0.0.0/255.0.0.0`) or prefix length (`10.0.0.0/8`) into the
/// address-then-mask octets used in name constraints.
fn parse_ip_with_mask(value: &str) -> Result<Vec<u8>> {
    let (addr, mask) = match value.split_once('/') {
        Some((a, m)) => (a, m.trim()),
        None => return parse_ip(value),
    };
    let mut octets = parse_ip(addr)?;
    let mask_octets = if mask.contains('.') || mask.contains(':') {
        parse_ip(mask)?
    } else {
        let prefix = match mask.parse::<usize>() {
            Ok(p) if p <= octets.len() * 8 => p,
            _ => {
                return Err(Error::Misconfiguration(format!(
                    "invalid prefix length: {}",
                    value
                )))
            }
        };
        let mut m = alloc::vec![0u8; octets.len()];
        for (i, b) in m.iter_mut().enumerate() {
            let bits = prefix.saturating_sub(i * 8).min(8);
            *b = if bits == 0 { 0 } else { 0xFFu8 << (8 - bits) };
        }
        m
    };
    if mask_octets.len() != octets.len() {
        return Err(Error::Misconfiguration(format!(
            "address and mask families differ: {}",
            value
        )));
    }
    octets.extend_from_slice(&mask_octets);
    Ok(octets)
}

fn parse_other_name(value: &str) -> Result<OtherName> {
    let bad = || Error::Misconfiguration(format!("invalid other name: {}", value));
    let rest = value.trim().strip_prefix('(').ok_or_else(bad)?;
    let (string_type, rest) = rest.split_once(')').ok_or_else(bad)?;
    let (oid, v) = rest.split_once(',').ok_or_else(bad)?;
    let type_id = parse_oid("otherName", oid)?;
    let any = match string_type.trim().to_lowercase().as_str() {
        "ia5string" => Any::encode_from(&ia5("OtherName", v)?)?,
        "printablestring" => match PrintableString::new(v) {
            Ok(p) => Any::encode_from(&p)?,
            Err(_) => return Err(bad()),
        },
        "utf8string" => Any::encode_from(&v.to_string())?,
        _ => return Err(bad()),
    };
    Ok(OtherName {
        type_id,
        value: any,
    })
}

fn build_general_name(choice: &str, value: &str, with_mask: bool) -> Result<GeneralName> {
    let gnc = GeneralNameChoice::from_str(choice)?;
    let value = value.trim();
    Ok(match gnc {
        GeneralNameChoice::Rfc822Name => GeneralName::Rfc822Name(ia5(choice, value)?),
        GeneralNameChoice::DnsName => GeneralName::DnsName(ia5(choice, value)?),
        GeneralNameChoice::UriName => GeneralName::UniformResourceIdentifier(ia5(choice, value)?),
        GeneralNameChoice::DirectoryName => match Name::from_str(value) {
            Ok(n) => GeneralName::DirectoryName(n),
            Err(_) => {
                return Err(Error::Misconfiguration(format!(
                    "invalid directory name: {}",
                    value
                )))
            }
        },
        GeneralNameChoice::IpAddress => {
            let octets = if with_mask {
                parse_ip_with_mask(value)?
            } else {
                parse_ip(value)?
            };
            GeneralName::IpAddress(OctetString::new(octets)?)
        }
        GeneralNameChoice::OidName => GeneralName::RegisteredId(parse_oid(choice, value)?),
        GeneralNameChoice::OtherName => GeneralName::OtherName(parse_other_name(value)?),
    })
}

/// `parse_general_name` builds a GeneralName from a configured choice and value.
pub fn parse_general_name(choice: &str, value: &str) -> Result<GeneralName> {
    build_general_name(choice, value, false)
}

/// `general_name_from_scope` reads the `generalNameChoice` and `generalNameValue` items from a
/// scope. Returns None when either item is blank.
pub fn general_name_from_scope(scope: &PolicyRuleConfig) -> Result<Option<GeneralName>> {
    let choice = scope.get_string(GENERAL_NAME_CHOICE, "")?;
    let value = scope.get_string(GENERAL_NAME_VALUE, "")?;
    if choice.trim().is_empty() || value.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_general_name(&choice, &value)?))
}

/// `subtree_from_scope` reads a name constraints subtree from a scope containing `enable` (true),
/// `base.generalNameChoice`, `base.generalNameValue`, `min` (0) and `max` (-1 for no maximum).
/// Returns None when the subtree is disabled or its base is blank.
pub fn subtree_from_scope(scope: &PolicyRuleConfig) -> Result<Option<GeneralSubtree>> {
    if !scope.get_bool("enable", true)? {
        return Ok(None);
    }
    let base_scope = scope.get_sub_scope("base");
    let choice = base_scope.get_string(GENERAL_NAME_CHOICE, "")?;
    let value = base_scope.get_string(GENERAL_NAME_VALUE, "")?;
    if choice.trim().is_empty() || value.trim().is_empty() {
        return Ok(None);
    }
    let base = build_general_name(&choice, &value, true)?;

    let min = scope.get_integer("min", 0)?;
    let max = scope.get_integer("max", -1)?;
    let minimum = match u32::try_from(min) {
        Ok(m) => m,
        Err(_) => {
            return Err(Error::Misconfiguration(format!(
                "subtree minimum must be non-negative: {}",
                min
            )))
        }
    };
    let maximum = match max {
        -1 => None,
        m => match u32::try_from(m) {
            Ok(m) if m >= minimum => Some(m),
            _ => {
                return Err(Error::Misconfiguration(format!(
                    "subtree maximum must be -1 or at least the minimum: {}",
                    max
                )))
            }
        },
    };
    Ok(Some(GeneralSubtree {
        base,
        minimum,
        maximum,
    }))
}

#[test]
fn general_name_choices() {
    match parse_general_name("dnsname", "example.com").unwrap() {
        GeneralName::DnsName(d) => assert_eq!("example.com", d.to_string()),
        _ => panic!("expected dNSName"),
    }
    match parse_general_name("RFC822Name", "joe@example.com").unwrap() {
        GeneralName::Rfc822Name(d) => assert_eq!("joe@example.com", d.to_string()),
        _ => panic!("expected rfc822Name"),
    }
    match parse_general_name("URIName", "http://ocsp.example.com").unwrap() {
        GeneralName::UniformResourceIdentifier(d) => {
            assert_eq!("http://ocsp.example.com", d.to_string())
        }
        _ => panic!("expected uniformResourceIdentifier"),
    }
    match parse_general_name("IPAddress", "192.168.1.10").unwrap() {
        GeneralName::IpAddress(o) => assert_eq!(&[192, 168, 1, 10], o.as_bytes()),
        _ => panic!("expected iPAddress"),
    }
    match parse_general_name("DirectoryName", "CN=Joe,O=Example").unwrap() {
        GeneralName::DirectoryName(n) => assert_eq!(2, n.0.len()),
        _ => panic!("expected directoryName"),
    }
    assert!(matches!(
        parse_general_name("registeredID", "1.2.3.4").unwrap(),
        GeneralName::RegisteredId(_)
    ));
    match parse_general_name("OtherName", "(UTF8String)1.3.6.1.4.1.311.20.2.3,joe@example.com")
        .unwrap()
    {
        GeneralName::OtherName(on) => assert_eq!("1.3.6.1.4.1.311.20.2.3", on.type_id.to_string()),
        _ => panic!("expected otherName"),
    }
    assert!(matches!(
        parse_general_name("EDIPartyName", "x"),
        Err(Error::Misconfiguration(_))
    ));
    assert!(matches!(
        parse_general_name("carrierPigeon", "x"),
        Err(Error::Misconfiguration(_))
    ));
    assert!(parse_general_name("IPAddress", "300.1.1.1").is_err());
    assert!(parse_general_name("OtherName", "1.2.3,value").is_err());
}

#[test]
fn subtrees() {
    let scope = PolicyRuleConfig::new()
        .with("base.generalNameChoice", "IPAddress")
        .with("base.generalNameValue", "10.0.0.0/8")
        .with("min", 0)
        .with("max", -1);
    let st = subtree_from_scope(&scope).unwrap().unwrap();
    match st.base {
        GeneralName::IpAddress(o) => assert_eq!(&[10, 0, 0, 0, 255, 0, 0, 0], o.as_bytes()),
        _ => panic!("expected iPAddress"),
    }
    assert_eq!(0, st.minimum);
    assert_eq!(None, st.maximum);

    let scope = PolicyRuleConfig::new()
        .with("base.generalNameChoice", "IPAddress")
        .with("base.generalNameValue", "192.168.0.0/255.255.0.0")
        .with("max", 2);
    let st = subtree_from_scope(&scope).unwrap().unwrap();
    match st.base {
        GeneralName::IpAddress(o) => {
            assert_eq!(&[192, 168, 0, 0, 255, 255, 0, 0], o.as_bytes())
        }
        _ => panic!("expected iPAddress"),
    }
    assert_eq!(Some(2), st.maximum);

    let disabled = PolicyRuleConfig::new()
        .with("enable", false)
        .with("base.generalNameChoice", "DNSName")
        .with("base.generalNameValue", "example.com");
    assert!(subtree_from_scope(&disabled).unwrap().is_none());

    let blank = PolicyRuleConfig::new().with("base.generalNameChoice", "DNSName");
    assert!(subtree_from_scope(&blank).unwrap().is_none());

    let bad_min = PolicyRuleConfig::new()
        .with("base.generalNameChoice", "DNSName")
        .with("base.generalNameValue", "example.com")
        .with("min", -3);
    assert!(subtree_from_scope(&bad_min).is_err());
}
