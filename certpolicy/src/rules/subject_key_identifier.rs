//! Subject Key Identifier rule

use alloc::vec::Vec;

use der::asn1::OctetString;
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::oids::ID_CE_SUBJECT_KEY_IDENTIFIER;
use crate::util::policy_utilities::public_key_sha1;

/// `SubjectKeyIdentifierExt` installs the SHA-1 digest of the draft's subject public key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectKeyIdentifierExt {
    critical: bool,
}

impl ExtensionPolicyRule for SubjectKeyIdentifierExt {
    const IMPL_NAME: &'static str = "SubjectKeyIdentifierExt";
    const DESCRIPTION: &'static str = "Sets the Subject Key Identifier extension from the subject public key";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        Ok(SubjectKeyIdentifierExt {
            critical: config.get_bool("critical", false)?,
        })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if keep_if_approved(Self::IMPL_NAME, request, draft, &ID_CE_SUBJECT_KEY_IDENTIFIER) {
            return Ok(());
        }
        let kid = public_key_sha1(&draft.subject_public_key_info.subject_public_key);
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_SUBJECT_KEY_IDENTIFIER,
            self.critical,
            &SubjectKeyIdentifier(OctetString::new(kid)?),
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        alloc::vec![critical_param(false)]
    }
}

#[test]
fn key_id_from_public_key() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;
    use hex_literal::hex;
    use sha1::{Digest, Sha1};

    let rule = SubjectKeyIdentifierExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    let (critical, ski) = tbs
        .get_extension_value::<SubjectKeyIdentifier>(&ID_CE_SUBJECT_KEY_IDENTIFIER)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(&Sha1::digest(hex!("01020304"))[..], ski.0.as_bytes());
}
