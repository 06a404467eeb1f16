//! Presence server rule

use alloc::vec::Vec;

use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;

/// `PresenceServerExt` accepts every request without touching the draft. The presence server
/// extension it is named for is not produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PresenceServerExt;

impl ExtensionPolicyRule for PresenceServerExt {
    const IMPL_NAME: &'static str = "PresenceServerExt";
    const DESCRIPTION: &'static str = "Presence server extension placeholder; makes no changes";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        config.get_bool("critical", false)?;
        Ok(PresenceServerExt)
    }

    fn apply_cert(&self, _request: &CertificationRequest, _draft: &mut TbsCertificate) -> Result<()> {
        Ok(())
    }

    fn plugin_params() -> Vec<PluginParam> {
        alloc::vec![critical_param(false)]
    }
}

#[test]
fn presence_is_a_no_op() {
    use crate::util::test_support::*;

    let rule = PresenceServerExt::init(&issuer(0), &PolicyRuleConfig::new()).unwrap();
    let mut tbs = draft("");
    let before = tbs.clone();
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    assert_eq!(before, tbs);
}
