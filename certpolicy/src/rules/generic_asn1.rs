//! Rule that installs an arbitrary, configuration-defined extension

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::Chars;

use der::asn1::{Any, Ia5String, Null, ObjectIdentifier, OctetString, PrintableString};
use der::{Encode, Tag};
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::policy_utilities::{hex_to_buffer, parse_bool_str, parse_oid};

#[cfg(feature = "std")]
use {crate::util::policy_utilities::get_file_as_byte_vec, der::Decode};

/// Attribute types understood in `attribute<n>.type`
const ATTRIBUTE_TYPES: &[&str] = &[
    "Integer",
    "IA5String",
    "PrintableString",
    "UTF8String",
    "OctetString",
    "Boolean",
    "OID",
    "Null",
    "file",
];

fn bad_value(item: &str, value: &str) -> Error {
    Error::Misconfiguration(format!("{} has an invalid value: {}", item, value))
}

/// Encodes the `attribute<index>` scope as a single DER element.
fn encode_attribute(config: &PolicyRuleConfig, index: u32) -> Result<Any> {
    let item = format!("attribute{}", index);
    let scope = config.get_sub_scope(&item);
    let attr_type = scope.get_string("type", "")?;
    let value = scope.get_string("value", "")?;

    match attr_type.trim().to_lowercase().as_str() {
        "integer" => match value.trim().parse::<i64>() {
            Ok(i) => Ok(Any::encode_from(&i)?),
            Err(_) => Err(bad_value(&item, &value)),
        },
        "ia5string" => match Ia5String::new(&value) {
            Ok(s) => Ok(Any::encode_from(&s)?),
            Err(_) => Err(bad_value(&item, &value)),
        },
        "printablestring" => match PrintableString::new(&value) {
            Ok(s) => Ok(Any::encode_from(&s)?),
            Err(_) => Err(bad_value(&item, &value)),
        },
        "utf8string" => Ok(Any::encode_from(&value)?),
        "octetstring" => {
            let bytes = hex_to_buffer(&value).map_err(|_| bad_value(&item, &value))?;
            Ok(Any::encode_from(&OctetString::new(bytes)?)?)
        }
        "boolean" => match parse_bool_str(&value) {
            Some(b) => Ok(Any::encode_from(&b)?),
            None => Err(bad_value(&item, &value)),
        },
        "oid" => Ok(Any::encode_from(&parse_oid(&item, &value)?)?),
        "null" => Ok(Any::encode_from(&Null)?),
        "file" => read_encoded_file(&item, &value),
        "" => Err(Error::Misconfiguration(format!(
            "{}.type is required by the pattern",
            item
        ))),
        _ => Err(Error::Misconfiguration(format!(
            "{}.type is not recognized: {}",
            item, attr_type
        ))),
    }
}

/// Reads a file containing exactly one DER encoded element.
#[cfg(feature = "std")]
fn read_encoded_file(item: &str, path: &str) -> Result<Any> {
    let bytes = get_file_as_byte_vec(std::path::Path::new(path.trim()))?;
    match Any::from_der(&bytes) {
        Ok(a) => Ok(a),
        Err(_) => Err(Error::Misconfiguration(format!(
            "{} does not contain a DER encoded element: {}",
            item, path
        ))),
    }
}

/// Files cannot be read without the std feature.
#[cfg(not(feature = "std"))]
fn read_encoded_file(item: &str, path: &str) -> Result<Any> {
    Err(Error::Misconfiguration(format!(
        "{} reads a file, which requires the std feature: {}",
        item, path
    )))
}

/// Deepest SEQUENCE nesting accepted in a pattern
pub const MAX_PATTERN_DEPTH: usize = 32;

/// Parses elements until the end of the pattern or a closing brace. Digits reference attributes and
/// braces enclose the contents of a SEQUENCE.
fn parse_elements(
    config: &PolicyRuleConfig,
    chars: &mut Chars<'_>,
    depth: usize,
) -> Result<Vec<Any>> {
    let mut elements = Vec::new();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if depth >= MAX_PATTERN_DEPTH {
                    return Err(Error::Misconfiguration(format!(
                        "pattern nests deeper than {} levels",
                        MAX_PATTERN_DEPTH
                    )));
                }
                let children = parse_elements(config, chars, depth + 1)?;
                let mut content = Vec::new();
                for child in &children {
                    child.encode_to_vec(&mut content)?;
                }
                elements.push(Any::new(Tag::Sequence, content)?);
            }
            '}' if depth > 0 => return Ok(elements),
            d if d.is_ascii_digit() => {
                elements.push(encode_attribute(config, d.to_digit(10).unwrap_or_default())?)
            }
            c if c.is_whitespace() => {}
            _ => {
                return Err(Error::Misconfiguration(format!(
                    "unexpected character in pattern: {}",
                    c
                )))
            }
        }
    }
    if depth > 0 {
        return Err(Error::Misconfiguration("unbalanced braces in pattern".to_string()));
    }
    Ok(elements)
}

/// `encode_pattern` builds the extension value described by `pattern`, which must describe exactly
/// one element.
pub fn encode_pattern(config: &PolicyRuleConfig, pattern: &str) -> Result<Any> {
    let mut chars = pattern.chars();
    let mut elements = parse_elements(config, &mut chars, 0)?;
    if elements.len() != 1 {
        return Err(Error::Misconfiguration(format!(
            "pattern must describe exactly one element: {}",
            pattern
        )));
    }
    Ok(elements.remove(0))
}

/// `GenericASN1Ext` installs an extension whose OID and value are entirely defined by configuration.
/// The value is encoded once at initialization. The rule is inert when no OID is configured.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GenericASN1Ext {
    critical: bool,
    value: Option<(ObjectIdentifier, Any)>,
}

impl ExtensionPolicyRule for GenericASN1Ext {
    const IMPL_NAME: &'static str = "GenericASN1Ext";
    const DESCRIPTION: &'static str = "Sets an extension defined entirely by configuration";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let oid = config.get_string("oid", "")?;
        if oid.trim().is_empty() {
            return Ok(GenericASN1Ext {
                critical,
                value: None,
            });
        }
        let oid = parse_oid("oid", &oid)?;
        let pattern: String = config.get_string("pattern", "")?;
        if pattern.trim().is_empty() {
            return Err(Error::Misconfiguration(
                "pattern is required when oid is set".to_string(),
            ));
        }
        let value = encode_pattern(config, &pattern)?;
        Ok(GenericASN1Ext {
            critical,
            value: Some((oid, value)),
        })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        match &self.value {
            Some((oid, value)) => install_extension(Self::IMPL_NAME, draft, oid, self.critical, value),
            None => {
                log_message(
                    &PolicyLogLevels::Debug,
                    &format!("{}: no oid configured", Self::IMPL_NAME),
                );
                Ok(())
            }
        }
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(false),
            PluginParam::string("oid", "", "Extension OID"),
            PluginParam::string(
                "pattern",
                "",
                "Value layout: digits reference attributes and braces enclose a SEQUENCE, e.g., {01}"
            ),
        ];
        params.extend(indexed_params(10, |i| {
            alloc::vec![
                PluginParam::new(
                    &format!("attribute{}.type", i),
                    ParamSyntax::Choice(ATTRIBUTE_TYPES),
                    "",
                    "Attribute type"
                ),
                PluginParam::string(
                    &format!("attribute{}.value", i),
                    "",
                    "Attribute value; a hex string for OctetString and a path for file"
                ),
            ]
        }));
        params
    }
}

#[test]
fn sequence_pattern() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;
    use hex_literal::hex;

    let cfg = PolicyRuleConfig::new()
        .with("critical", true)
        .with("oid", "1.2.3.4")
        .with("pattern", "{0{12}3}")
        .with("attribute0.type", "Integer")
        .with("attribute0.value", "5")
        .with("attribute1.type", "IA5String")
        .with("attribute1.value", "ab")
        .with("attribute2.type", "Boolean")
        .with("attribute2.value", "true")
        .with("attribute3.type", "Null");
    let rule = GenericASN1Ext::init(&issuer(-1), &cfg).unwrap();

    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();
    let oid = ObjectIdentifier::new_unwrap("1.2.3.4");
    let ext = tbs.find_extension(&oid).unwrap();
    assert!(ext.critical);
    assert_eq!(
        &hex!("300E020105 3007 16026162 0101FF 0500"),
        ext.extn_value.as_bytes()
    );

    // applying again replaces rather than duplicates
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();
    assert_eq!(
        1,
        tbs.extensions
            .as_ref()
            .unwrap()
            .iter()
            .filter(|e| e.extn_id == oid)
            .count()
    );
}

#[test]
fn single_values() {
    use hex_literal::hex;

    let cfg = PolicyRuleConfig::new()
        .with("attribute0.type", "OctetString")
        .with("attribute0.value", "01:02")
        .with("attribute1.type", "OID")
        .with("attribute1.value", "1.2.3");
    assert_eq!(
        hex!("04020102").to_vec(),
        encode_pattern(&cfg, "0").unwrap().to_der().unwrap()
    );
    assert_eq!(
        hex!("06022A03").to_vec(),
        encode_pattern(&cfg, "1").unwrap().to_der().unwrap()
    );
    assert!(encode_pattern(&cfg, "01").is_err());
    assert!(encode_pattern(&cfg, "{0").is_err());
    assert!(encode_pattern(&cfg, "0}").is_err());
    assert!(encode_pattern(&cfg, "2").is_err());
}

#[test]
fn nesting_limit() {
    let cfg = PolicyRuleConfig::new();
    let nested = |n: usize| format!("{}{}", "{".repeat(n), "}".repeat(n));

    let deepest = encode_pattern(&cfg, &nested(MAX_PATTERN_DEPTH)).unwrap();
    assert_eq!(MAX_PATTERN_DEPTH * 2, deepest.to_der().unwrap().len());

    assert!(matches!(
        encode_pattern(&cfg, &nested(MAX_PATTERN_DEPTH + 1)),
        Err(Error::Misconfiguration(_))
    ));
    assert!(matches!(
        encode_pattern(&cfg, &nested(1_000_000)),
        Err(Error::Misconfiguration(_))
    ));
}

#[test]
fn unconfigured_is_inert() {
    use crate::util::test_support::*;

    let rule = GenericASN1Ext::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    let mut tbs = draft("CN=Joe");
    let before = tbs.clone();
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();
    assert_eq!(before, tbs);

    let cfg = PolicyRuleConfig::new().with("oid", "1.2.3.4");
    assert!(GenericASN1Ext::init(&issuer(-1), &cfg).is_err());
}

#[cfg(feature = "std")]
#[test]
fn file_attribute() {
    use crate::util::test_support::*;
    use std::io::Write;

    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&hex_literal::hex!("0C026869")).unwrap();
    let cfg = PolicyRuleConfig::new()
        .with("oid", "1.2.3.4")
        .with("pattern", "0")
        .with("attribute0.type", "file")
        .with("attribute0.value", f.path().to_str().unwrap());
    assert!(GenericASN1Ext::init(&issuer(-1), &cfg).is_ok());

    let cfg = PolicyRuleConfig::new()
        .with("oid", "1.2.3.4")
        .with("pattern", "0")
        .with("attribute0.type", "file")
        .with("attribute0.value", "/nonexistent/attr.der");
    assert!(GenericASN1Ext::init(&issuer(-1), &cfg).is_err());
}
