//! OCSP no check rule

use alloc::vec::Vec;

use der::asn1::Null;
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::oids::ID_PKIX_OCSP_NOCHECK;

/// `OCSPNoCheckExt` marks a certificate (typically an OCSP responder's) as exempt from revocation
/// checking by installing the id-pkix-ocsp-nocheck extension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OCSPNoCheckExt {
    critical: bool,
}

impl ExtensionPolicyRule for OCSPNoCheckExt {
    const IMPL_NAME: &'static str = "OCSPNoCheckExt";
    const DESCRIPTION: &'static str = "Sets the OCSP No Check extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        Ok(OCSPNoCheckExt {
            critical: config.get_bool("critical", false)?,
        })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_PKIX_OCSP_NOCHECK,
            self.critical,
            &Null,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        alloc::vec![critical_param(false)]
    }
}

#[test]
fn installs_null() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;
    use x509_cert::Version;

    let rule = OCSPNoCheckExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    let mut tbs = draft("CN=OCSP Responder");
    assert_eq!(Version::V1, tbs.version);
    rule.apply_cert(&request("CN=OCSP Responder"), &mut tbs)
        .unwrap();
    assert_eq!(Version::V3, tbs.version);
    let ext = tbs.find_extension(&ID_PKIX_OCSP_NOCHECK).unwrap();
    assert!(!ext.critical);
    assert_eq!(&[0x05, 0x00], ext.extn_value.as_bytes());
}
