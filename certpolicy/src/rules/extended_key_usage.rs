//! Extended Key Usage rule

use alloc::format;
use alloc::vec::Vec;

use der::asn1::ObjectIdentifier;
use x509_cert::ext::pkix::ExtendedKeyUsage;
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::{ID_CE_EXT_KEY_USAGE, KP_CODE_SIGNING, KP_OCSP_SIGNING};
use crate::util::policy_utilities::parse_oid;

/// `ExtendedKeyUsageExt` installs a configured list of key purposes, replacing any existing value.
/// When no purposes are configured any existing value is removed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtendedKeyUsageExt {
    critical: bool,
    purposes: Vec<ObjectIdentifier>,
}

fn purpose_oid(item: &str, value: &str) -> Result<ObjectIdentifier> {
    match value.trim().to_lowercase().as_str() {
        "ocspsigning" => Ok(KP_OCSP_SIGNING),
        "codesigning" => Ok(KP_CODE_SIGNING),
        _ => parse_oid(item, value),
    }
}

impl ExtensionPolicyRule for ExtendedKeyUsageExt {
    const IMPL_NAME: &'static str = "ExtendedKeyUsageExt";
    const DESCRIPTION: &'static str = "Sets the Extended Key Usage extension to a configured list of purposes";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let num_ids = config.get_slot_count("numIds", 10)?;
        let mut purposes = Vec::new();
        for i in 0..num_ids {
            let item = format!("id{}", i);
            let v = config.get_string(&item, "")?;
            if v.trim().is_empty() {
                continue;
            }
            let oid = purpose_oid(&item, &v)?;
            if !purposes.contains(&oid) {
                purposes.push(oid);
            }
        }
        Ok(ExtendedKeyUsageExt { critical, purposes })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if self.purposes.is_empty() {
            if draft.delete_extension(&ID_CE_EXT_KEY_USAGE) {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &ID_CE_EXT_KEY_USAGE,
                    ExtensionDecision::Deleted,
                );
            }
            return Ok(());
        }
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_EXT_KEY_USAGE,
            self.critical,
            &ExtendedKeyUsage(self.purposes.clone()),
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(false),
            PluginParam::integer("numIds", 10, "Number of key purpose slots"),
        ];
        params.extend(indexed_params(10, |i| {
            alloc::vec![PluginParam::string(
                &format!("id{}", i),
                "",
                "Key purpose OID, or ocspsigning or codesigning"
            )]
        }));
        params
    }
}

#[test]
fn purposes_replace_existing() {
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("id0", "1.3.6.1.5.5.7.3.2")
        .with("id1", "OCSPSigning")
        .with("id2", "")
        .with("id3", "codesigning");
    let rule = ExtendedKeyUsageExt::init(&issuer(-1), &cfg).unwrap();

    let mut tbs = draft("CN=Joe");
    tbs.set_extension_value(
        &ID_CE_EXT_KEY_USAGE,
        true,
        &ExtendedKeyUsage(alloc::vec![KP_CODE_SIGNING]),
    )
    .unwrap();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    rule.apply_cert(&req, &mut tbs).unwrap();

    let (critical, eku) = tbs
        .get_extension_value::<ExtendedKeyUsage>(&ID_CE_EXT_KEY_USAGE)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(
        alloc::vec![
            ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2"),
            KP_OCSP_SIGNING,
            KP_CODE_SIGNING
        ],
        eku.0
    );
}

#[test]
fn bad_purpose() {
    use crate::util::test_support::*;
    assert!(matches!(
        ExtendedKeyUsageExt::init(&issuer(-1), &PolicyRuleConfig::new().with("id0", "clientAuth")),
        Err(Error::Misconfiguration(_))
    ));
    // slots beyond numIds are ignored
    let cfg = PolicyRuleConfig::new().with("numIds", 1).with("id1", "bogus");
    assert!(ExtendedKeyUsageExt::init(&issuer(-1), &cfg).is_ok());
}

#[test]
fn no_purposes_removes_extension() {
    use crate::util::test_support::*;
    let rule = ExtendedKeyUsageExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    let mut tbs = draft("CN=Joe");
    tbs.set_extension_value(
        &ID_CE_EXT_KEY_USAGE,
        false,
        &ExtendedKeyUsage(alloc::vec![KP_CODE_SIGNING]),
    )
    .unwrap();
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    assert!(tbs.find_extension(&ID_CE_EXT_KEY_USAGE).is_none());
}

#[test]
fn slot_count_out_of_range() {
    use crate::util::test_support::*;
    for count in [-5, 20_000_000] {
        let cfg = PolicyRuleConfig::new().with("numIds", count);
        assert!(matches!(
            ExtendedKeyUsageExt::init(&issuer(-1), &cfg),
            Err(Error::Misconfiguration(_))
        ));
    }
}
