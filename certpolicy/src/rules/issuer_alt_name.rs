//! Issuer Alternative Name rule

use alloc::format;
use alloc::vec::Vec;

use x509_cert::ext::pkix::IssuerAltName;
use x509_cert::TbsCertificate;

use crate::config::general_names::*;
use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::ID_CE_ISSUER_ALT_NAME;

/// `IssuerAltNameExt` installs configured general names in the Issuer Alternative Name extension,
/// replacing any existing value. The extension is removed when no names are configured.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssuerAltNameExt {
    critical: bool,
    value: IssuerAltName,
}

impl ExtensionPolicyRule for IssuerAltNameExt {
    const IMPL_NAME: &'static str = "IssuerAltNameExt";
    const DESCRIPTION: &'static str = "Sets the Issuer Alternative Name extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let mut names = Vec::new();
        for i in 0..config.get_slot_count("numGeneralNames", 8)? {
            let scope = config.get_sub_scope(&format!("generalName{}", i));
            if let Some(gn) = general_name_from_scope(&scope)? {
                names.push(gn);
            }
        }
        Ok(IssuerAltNameExt {
            critical,
            value: IssuerAltName(names),
        })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if self.value.0.is_empty() {
            if draft.delete_extension(&ID_CE_ISSUER_ALT_NAME) {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &ID_CE_ISSUER_ALT_NAME,
                    ExtensionDecision::Deleted,
                );
            }
            return Ok(());
        }
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_ISSUER_ALT_NAME,
            self.critical,
            &self.value,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(false),
            PluginParam::integer("numGeneralNames", 8, "Number of general name slots"),
        ];
        params.extend(indexed_params(8, |i| {
            alloc::vec![
                PluginParam::string(
                    &format!("generalName{}.{}", i, GENERAL_NAME_CHOICE),
                    "",
                    "General name type"
                ),
                PluginParam::string(
                    &format!("generalName{}.{}", i, GENERAL_NAME_VALUE),
                    "",
                    "General name value"
                ),
            ]
        }));
        params
    }
}

#[test]
fn issuer_names() {
    use crate::util::test_support::*;
    use x509_cert::ext::pkix::name::GeneralName;

    let cfg = PolicyRuleConfig::new()
        .with("generalName0.generalNameChoice", "URIName")
        .with("generalName0.generalNameValue", "http://ca.example.com")
        .with("generalName1.generalNameChoice", "DNSName")
        .with("generalName1.generalNameValue", "")
        .with("generalName2.generalNameChoice", "DirectoryName")
        .with("generalName2.generalNameValue", "CN=Test CA,O=Example");
    let rule = IssuerAltNameExt::init(&issuer(-1), &cfg).unwrap();
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();
    let (critical, ian) = tbs
        .get_extension_value::<IssuerAltName>(&ID_CE_ISSUER_ALT_NAME)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(2, ian.0.len());
    assert!(matches!(ian.0[1], GeneralName::DirectoryName(_)));

    let rule = IssuerAltNameExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();
    assert!(tbs.find_extension(&ID_CE_ISSUER_ALT_NAME).is_none());

    let cfg = PolicyRuleConfig::new()
        .with("generalName0.generalNameChoice", "EDIPartyName")
        .with("generalName0.generalNameValue", "x");
    assert!(IssuerAltNameExt::init(&issuer(-1), &cfg).is_err());
}
