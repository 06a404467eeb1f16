//! Inhibit anyPolicy rule

use alloc::format;
use alloc::vec::Vec;

use x509_cert::ext::pkix::InhibitAnyPolicy;
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::oids::ID_CE_INHIBIT_ANY_POLICY;

/// `InhibitAnyPolicyExt` installs the Inhibit anyPolicy extension with the configured skip count,
/// replacing any existing value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InhibitAnyPolicyExt {
    critical: bool,
    value: InhibitAnyPolicy,
}

impl ExtensionPolicyRule for InhibitAnyPolicyExt {
    const IMPL_NAME: &'static str = "InhibitAnyPolicyExt";
    const DESCRIPTION: &'static str = "Sets the Inhibit anyPolicy extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let skip_certs = config.get_integer("skipCerts", 0)?;
        let skip_certs = match u32::try_from(skip_certs) {
            Ok(s) => s,
            Err(_) => {
                return Err(Error::Misconfiguration(format!(
                    "skipCerts must be a non-negative integer: {}",
                    skip_certs
                )))
            }
        };
        Ok(InhibitAnyPolicyExt {
            critical: config.get_bool("critical", true)?,
            value: InhibitAnyPolicy(skip_certs),
        })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_INHIBIT_ANY_POLICY,
            self.critical,
            &self.value,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        alloc::vec![
            critical_param(true),
            PluginParam::integer(
                "skipCerts",
                0,
                "Number of additional certificates that may appear before anyPolicy is no longer permitted"
            ),
        ]
    }
}

#[test]
fn skip_certs() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;

    let rule = InhibitAnyPolicyExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("skipCerts", 2),
    )
    .unwrap();
    let mut tbs = draft("CN=Sub CA");
    rule.apply_cert(&request("CN=Sub CA"), &mut tbs).unwrap();
    let (critical, iap) = tbs
        .get_extension_value::<InhibitAnyPolicy>(&ID_CE_INHIBIT_ANY_POLICY)
        .unwrap()
        .unwrap();
    assert!(critical);
    assert_eq!(2, iap.0);

    assert!(InhibitAnyPolicyExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("skipCerts", -1),
    )
    .is_err());
}
