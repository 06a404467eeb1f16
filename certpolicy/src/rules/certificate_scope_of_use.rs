//! Certificate scope of use rule

use alloc::format;
use alloc::vec::Vec;

use x509_cert::TbsCertificate;

use crate::asn1::certificate_scope_of_use::*;
use crate::config::general_names::*;
use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::CERTIFICATE_SCOPE_OF_USE;

/// Reads the `entry<n>` scope. Returns None when the entry is disabled or its name is blank.
fn read_entry(config: &PolicyRuleConfig, index: i64) -> Result<Option<CertificateScopeEntry>> {
    let item = format!("entry{}", index);
    let scope = config.get_sub_scope(&item);
    if !scope.get_bool("enable", true)? {
        return Ok(None);
    }
    let name = match general_name_from_scope(&scope)? {
        Some(n) => n,
        None => return Ok(None),
    };
    let port = scope.get_integer("port", -1)?;
    let port_number = match port {
        -1 => None,
        p if (0..=65535).contains(&p) => Some(p as u32),
        _ => {
            return Err(Error::Misconfiguration(format!(
                "{}.port must be between 0 and 65535: {}",
                item, port
            )))
        }
    };
    Ok(Some(CertificateScopeEntry { name, port_number }))
}

/// `CertificateScopeOfUseExt` installs the configured names and ports a certificate may be used
/// with, replacing any existing value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateScopeOfUseExt {
    critical: bool,
    entries: CertificateScopeOfUse,
}

impl ExtensionPolicyRule for CertificateScopeOfUseExt {
    const IMPL_NAME: &'static str = "CertificateScopeOfUseExt";
    const DESCRIPTION: &'static str = "Sets the Certificate Scope of Use extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let mut entries = Vec::new();
        for i in 0..config.get_slot_count("numEntries", 5)? {
            if let Some(e) = read_entry(config, i)? {
                entries.push(e);
            }
        }
        Ok(CertificateScopeOfUseExt { critical, entries })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if self.entries.is_empty() {
            if draft.delete_extension(&CERTIFICATE_SCOPE_OF_USE) {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &CERTIFICATE_SCOPE_OF_USE,
                    ExtensionDecision::Deleted,
                );
            }
            return Ok(());
        }
        install_extension(
            Self::IMPL_NAME,
            draft,
            &CERTIFICATE_SCOPE_OF_USE,
            self.critical,
            &self.entries,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(false),
            PluginParam::integer("numEntries", 5, "Number of scope entries"),
        ];
        params.extend(indexed_params(5, |i| {
            alloc::vec![
                PluginParam::boolean(&format!("entry{}.enable", i), true, "Enable this entry"),
                PluginParam::string(
                    &format!("entry{}.{}", i, GENERAL_NAME_CHOICE),
                    "",
                    "General name type"
                ),
                PluginParam::string(
                    &format!("entry{}.{}", i, GENERAL_NAME_VALUE),
                    "",
                    "General name value"
                ),
                PluginParam::string(&format!("entry{}.port", i), "", "Port number"),
            ]
        }));
        params
    }
}

#[test]
fn scope_entries() {
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("entry0.generalNameChoice", "DNSName")
        .with("entry0.generalNameValue", "host.example.com")
        .with("entry0.port", 443)
        .with("entry1.enable", false)
        .with("entry1.generalNameChoice", "DNSName")
        .with("entry1.generalNameValue", "disabled.example.com")
        .with("entry2.generalNameChoice", "URIName")
        .with("entry2.generalNameValue", "sip:joe@example.com");
    let rule = CertificateScopeOfUseExt::init(&issuer(-1), &cfg).unwrap();
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();

    let (critical, entries) = tbs
        .get_extension_value::<CertificateScopeOfUse>(&CERTIFICATE_SCOPE_OF_USE)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(2, entries.len());
    assert_eq!(Some(443), entries[0].port_number);
    assert_eq!(None, entries[1].port_number);

    let rule = CertificateScopeOfUseExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();
    assert!(tbs.find_extension(&CERTIFICATE_SCOPE_OF_USE).is_none());

    let cfg = PolicyRuleConfig::new()
        .with("entry0.generalNameChoice", "DNSName")
        .with("entry0.generalNameValue", "host.example.com")
        .with("entry0.port", 70000);
    assert!(CertificateScopeOfUseExt::init(&issuer(-1), &cfg).is_err());
}
