//! Key Usage rule

use alloc::format;
use alloc::vec::Vec;

use flagset::FlagSet;
use x509_cert::ext::pkix::{KeyUsage, KeyUsages};
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::approval::agent_approved;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::ID_CE_KEY_USAGE;
use crate::util::policy_utilities::parse_bool_str;

/// Bit source value that defers to an HTTP parameter
pub const HTTP_INPUT: &str = "HTTP_INPUT";

/// Configuration item name, HTTP parameter name and flag for each key usage bit
const KEY_USAGE_BITS: [(&str, &str, KeyUsages); 9] = [
    ("digitalSignature", "digital_signature", KeyUsages::DigitalSignature),
    ("nonRepudiation", "non_repudiation", KeyUsages::NonRepudiation),
    ("keyEncipherment", "key_encipherment", KeyUsages::KeyEncipherment),
    ("dataEncipherment", "data_encipherment", KeyUsages::DataEncipherment),
    ("keyAgreement", "key_agreement", KeyUsages::KeyAgreement),
    ("keyCertsign", "key_certsign", KeyUsages::KeyCertSign),
    ("crlSign", "crl_sign", KeyUsages::CRLSign),
    ("encipherOnly", "encipher_only", KeyUsages::EncipherOnly),
    ("decipherOnly", "decipher_only", KeyUsages::DecipherOnly),
];

/// Where the value of a key usage bit comes from
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BitSource {
    /// Bit is always set or always clear
    Fixed(bool),
    /// Bit is set when the corresponding HTTP parameter is `true`
    HttpInput,
}

/// `KeyUsageExt` builds the Key Usage extension from per-bit sources. Empty key usage is rejected,
/// as is keyCertSign or cRLSign beneath an issuer with a path length constraint of zero.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyUsageExt {
    critical: bool,
    sources: [BitSource; 9],
    issuer_path_len: i32,
}

fn check_ca_bits(issuer_path_len: i32, ku: FlagSet<KeyUsages>) -> Result<()> {
    if issuer_path_len == 0 && !(ku & (KeyUsages::KeyCertSign | KeyUsages::CRLSign)).is_empty() {
        return Err(Error::Rejected(RejectionReason::CaSigningNotPermitted));
    }
    Ok(())
}

impl KeyUsageExt {
    fn resolve(&self, request: &CertificationRequest) -> FlagSet<KeyUsages> {
        let mut ku = FlagSet::<KeyUsages>::default();
        for (source, (_, param, flag)) in self.sources.iter().zip(KEY_USAGE_BITS.iter()) {
            let set = match source {
                BitSource::Fixed(b) => *b,
                BitSource::HttpInput => matches!(
                    request.get_http_param(param).and_then(parse_bool_str),
                    Some(true)
                ),
            };
            if set {
                ku |= *flag;
            }
        }
        ku
    }
}

impl ExtensionPolicyRule for KeyUsageExt {
    const IMPL_NAME: &'static str = "KeyUsageExt";
    const DESCRIPTION: &'static str = "Sets the Key Usage extension from fixed or requester supplied bits";

    fn init(issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", true)?;
        let mut sources = [BitSource::HttpInput; 9];
        for (source, (item, _, _)) in sources.iter_mut().zip(KEY_USAGE_BITS.iter()) {
            let v = config.get_string(item, HTTP_INPUT)?;
            *source = if v.trim().is_empty() || v.trim() == HTTP_INPUT {
                BitSource::HttpInput
            } else {
                match parse_bool_str(&v) {
                    Some(b) => BitSource::Fixed(b),
                    None => {
                        return Err(Error::Misconfiguration(format!(
                            "{} must be true, false or {}: {}",
                            item, HTTP_INPUT, v
                        )))
                    }
                }
            };
        }
        Ok(KeyUsageExt {
            critical,
            sources,
            issuer_path_len: issuer.path_len,
        })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if let Some((_, existing)) = draft.get_extension_value::<KeyUsage>(&ID_CE_KEY_USAGE)? {
            check_ca_bits(self.issuer_path_len, existing.0)?;
            if agent_approved(request) {
                log_extension_decision(Self::IMPL_NAME, &ID_CE_KEY_USAGE, ExtensionDecision::Kept);
                return Ok(());
            }
            draft.delete_extension(&ID_CE_KEY_USAGE);
            log_extension_decision(Self::IMPL_NAME, &ID_CE_KEY_USAGE, ExtensionDecision::Deleted);
        }

        let ku = self.resolve(request);
        if ku.is_empty() {
            return Err(Error::Rejected(RejectionReason::EmptyKeyUsage));
        }
        check_ca_bits(self.issuer_path_len, ku)?;
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_KEY_USAGE,
            self.critical,
            &KeyUsage(ku),
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![critical_param(true)];
        for (item, _, _) in KEY_USAGE_BITS.iter() {
            params.push(PluginParam::new(
                item,
                ParamSyntax::Choice(&["true", "false", HTTP_INPUT]),
                HTTP_INPUT,
                &format!("Sets the {} bit", item),
            ));
        }
        params
    }
}

#[test]
fn bits_round_trip() {
    use crate::util::test_support::*;

    // every combination of the first five bits survives encoding
    for mask in 1u16..32 {
        let mut cfg = PolicyRuleConfig::new();
        let mut expected = FlagSet::<KeyUsages>::default();
        for (i, (item, _, flag)) in KEY_USAGE_BITS.iter().enumerate() {
            let on = i < 5 && mask & (1 << i) != 0;
            cfg.set(item, on);
            if on {
                expected |= *flag;
            }
        }
        let rule = KeyUsageExt::init(&issuer(-1), &cfg).unwrap();
        let mut tbs = draft("CN=Joe");
        rule.apply_cert(&CertificationRequest::default(), &mut tbs)
            .unwrap();
        let (critical, ku) = tbs
            .get_extension_value::<KeyUsage>(&ID_CE_KEY_USAGE)
            .unwrap()
            .unwrap();
        assert!(critical);
        assert_eq!(expected, ku.0);
    }
}

#[test]
fn empty_rejected() {
    use crate::util::test_support::*;

    let mut cfg = PolicyRuleConfig::new();
    for (item, _, _) in KEY_USAGE_BITS.iter() {
        cfg.set(item, "false");
    }
    let rule = KeyUsageExt::init(&issuer(-1), &cfg).unwrap();
    let mut tbs = draft("CN=Joe");
    assert_eq!(
        Err(Error::Rejected(RejectionReason::EmptyKeyUsage)),
        rule.apply_cert(&CertificationRequest::default(), &mut tbs)
    );

    // HTTP_INPUT bits with no parameters are clear
    let rule = KeyUsageExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    assert_eq!(
        Err(Error::Rejected(RejectionReason::EmptyKeyUsage)),
        rule.apply_cert(&CertificationRequest::default(), &mut tbs)
    );
}

#[test]
fn http_input_bits() {
    use crate::util::test_support::*;

    let rule = KeyUsageExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("critical", false),
    )
    .unwrap();
    let mut req = request("CN=Joe");
    req.set_http_param("digital_signature", "true");
    req.set_http_param("key_encipherment", "TRUE");
    req.set_http_param("data_encipherment", "false");
    req.set_http_param("key_agreement", "yes");
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&req, &mut tbs).unwrap();
    let (critical, ku) = tbs
        .get_extension_value::<KeyUsage>(&ID_CE_KEY_USAGE)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment, ku.0);
}

#[test]
fn ca_bits_beneath_zero_path_len() {
    use crate::util::test_support::*;

    for item in ["keyCertsign", "crlSign"] {
        let cfg = PolicyRuleConfig::new()
            .with(item, true)
            .with("digitalSignature", true);
        let rule = KeyUsageExt::init(&issuer(0), &cfg).unwrap();
        let mut tbs = draft("CN=Joe");
        assert_eq!(
            Err(Error::Rejected(RejectionReason::CaSigningNotPermitted)),
            rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        );
    }

    // an approved existing value is checked too
    let rule = KeyUsageExt::init(
        &issuer(0),
        &PolicyRuleConfig::new().with("digitalSignature", true),
    )
    .unwrap();
    let mut tbs = draft("CN=Joe");
    tbs.set_extension_value(&ID_CE_KEY_USAGE, true, &KeyUsage(KeyUsages::KeyCertSign.into()))
        .unwrap();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    assert_eq!(
        Err(Error::Rejected(RejectionReason::CaSigningNotPermitted)),
        rule.apply_cert(&req, &mut tbs)
    );
}

#[test]
fn existing_value_gate() {
    use crate::util::test_support::*;

    let rule = KeyUsageExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("digitalSignature", true),
    )
    .unwrap();
    let mut tbs = draft("CN=Joe");
    tbs.set_extension_value(
        &ID_CE_KEY_USAGE,
        false,
        &KeyUsage(KeyUsages::KeyAgreement.into()),
    )
    .unwrap();

    let mut approved = tbs.clone();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    rule.apply_cert(&req, &mut approved).unwrap();
    let (_, ku) = approved
        .get_extension_value::<KeyUsage>(&ID_CE_KEY_USAGE)
        .unwrap()
        .unwrap();
    assert_eq!(FlagSet::from(KeyUsages::KeyAgreement), ku.0);

    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    let (_, ku) = tbs
        .get_extension_value::<KeyUsage>(&ID_CE_KEY_USAGE)
        .unwrap()
        .unwrap();
    assert_eq!(FlagSet::from(KeyUsages::DigitalSignature), ku.0);
}

#[test]
fn bad_bit_source() {
    use crate::util::test_support::*;
    assert!(matches!(
        KeyUsageExt::init(&issuer(-1), &PolicyRuleConfig::new().with("crlSign", "maybe")),
        Err(Error::Misconfiguration(_))
    ));
}
