//! Authority Key Identifier rule

use alloc::format;
use alloc::vec::Vec;

use der::asn1::OctetString;
use x509_cert::ext::pkix::AuthorityKeyIdentifier;
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::ID_CE_AUTHORITY_KEY_IDENTIFIER;
use crate::util::policy_utilities::spki_sha1;

/// Fallback used when the issuer has no subject key identifier
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AltKeyIdType {
    /// SHA-1 digest of the DER encoded issuer SubjectPublicKeyInfo
    SpkiSha1,
    /// No key identifier; the extension is omitted
    None,
}

/// `AuthorityKeyIdentifierExt` installs the issuer's key identifier. The identifier is the issuer's
/// subject key identifier when present, otherwise the configured fallback.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthorityKeyIdentifierExt {
    critical: bool,
    key_id: Option<Vec<u8>>,
}

impl AuthorityKeyIdentifierExt {
    /// Returns the key identifier the rule installs, if any
    pub fn key_id(&self) -> Option<&[u8]> {
        self.key_id.as_deref()
    }
}

impl ExtensionPolicyRule for AuthorityKeyIdentifierExt {
    const IMPL_NAME: &'static str = "AuthorityKeyIdentifierExt";
    const DESCRIPTION: &'static str = "Sets the Authority Key Identifier extension from the issuing CA's key";

    fn init(issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let alt = config.get_string("AltKeyIdType", "SpkiSHA1")?;
        let alt_type = if alt.trim().eq_ignore_ascii_case("SpkiSHA1") {
            AltKeyIdType::SpkiSha1
        } else if alt.trim().eq_ignore_ascii_case("None") {
            AltKeyIdType::None
        } else {
            return Err(Error::Misconfiguration(format!(
                "AltKeyIdType must be SpkiSHA1 or None: {}",
                alt
            )));
        };

        let key_id = match (&issuer.subject_key_identifier, alt_type) {
            (Some(ski), _) => Some(ski.clone()),
            (None, AltKeyIdType::SpkiSha1) => match &issuer.subject_public_key_info {
                Some(spki) => Some(spki_sha1(spki)?),
                None => None,
            },
            (None, AltKeyIdType::None) => None,
        };
        Ok(AuthorityKeyIdentifierExt { critical, key_id })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if keep_if_approved(
            Self::IMPL_NAME,
            request,
            draft,
            &ID_CE_AUTHORITY_KEY_IDENTIFIER,
        ) {
            return Ok(());
        }
        match &self.key_id {
            Some(kid) => {
                let aki = AuthorityKeyIdentifier {
                    key_identifier: Some(OctetString::new(kid.as_slice())?),
                    authority_cert_issuer: None,
                    authority_cert_serial_number: None,
                };
                install_extension(
                    Self::IMPL_NAME,
                    draft,
                    &ID_CE_AUTHORITY_KEY_IDENTIFIER,
                    self.critical,
                    &aki,
                )
            }
            None => {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &ID_CE_AUTHORITY_KEY_IDENTIFIER,
                    ExtensionDecision::Skipped,
                );
                Ok(())
            }
        }
    }

    fn plugin_params() -> Vec<PluginParam> {
        alloc::vec![
            critical_param(false),
            PluginParam::new(
                "AltKeyIdType",
                ParamSyntax::Choice(&["SpkiSHA1", "None"]),
                "SpkiSHA1",
                "Key identifier used when the issuing CA has no subject key identifier"
            ),
        ]
    }
}

#[cfg(test)]
fn aki_of(tbs: &TbsCertificate) -> Option<AuthorityKeyIdentifier> {
    use crate::policy::draft_extensions::DraftExtensions;
    tbs.get_extension_value::<AuthorityKeyIdentifier>(&ID_CE_AUTHORITY_KEY_IDENTIFIER)
        .unwrap()
        .map(|(_, v)| v)
}

#[test]
fn key_id_sources() {
    use crate::util::test_support::*;
    use hex_literal::hex;
    use sha1::{Digest, Sha1};

    let cert = ca_certificate(None, Some(&hex!("A1A2A3")));
    let ia = IssuingAuthority::try_from(&cert).unwrap();
    let rule = AuthorityKeyIdentifierExt::init(&ia, &PolicyRuleConfig::new()).unwrap();
    assert_eq!(Some(&hex!("A1A2A3")[..]), rule.key_id());

    let cert = ca_certificate(None, None);
    let ia = IssuingAuthority::try_from(&cert).unwrap();
    let rule = AuthorityKeyIdentifierExt::init(&ia, &PolicyRuleConfig::new()).unwrap();
    assert_eq!(Some(&Sha1::digest(SPKI)[..]), rule.key_id());

    let rule = AuthorityKeyIdentifierExt::init(
        &ia,
        &PolicyRuleConfig::new().with("AltKeyIdType", "None"),
    )
    .unwrap();
    assert_eq!(None, rule.key_id());
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    assert_eq!(None, aki_of(&tbs));

    assert!(AuthorityKeyIdentifierExt::init(
        &ia,
        &PolicyRuleConfig::new().with("AltKeyIdType", "SHA256")
    )
    .is_err());
}

#[test]
fn approval_gate() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;
    use hex_literal::hex;

    let ia = IssuingAuthority::try_from(&ca_certificate(None, Some(&hex!("B1B2")))).unwrap();
    let rule = AuthorityKeyIdentifierExt::init(&ia, &PolicyRuleConfig::new()).unwrap();
    let existing = AuthorityKeyIdentifier {
        key_identifier: Some(OctetString::new(hex!("0000").to_vec()).unwrap()),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    };
    let mut tbs = draft("CN=Joe");
    tbs.set_extension_value(&ID_CE_AUTHORITY_KEY_IDENTIFIER, false, &existing)
        .unwrap();

    let mut approved = tbs.clone();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    rule.apply_cert(&req, &mut approved).unwrap();
    assert_eq!(Some(existing), aki_of(&approved));

    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    assert_eq!(
        hex!("B1B2"),
        aki_of(&tbs).unwrap().key_identifier.unwrap().as_bytes()
    );

    // with no key id an unapproved existing value is removed
    let rule = AuthorityKeyIdentifierExt::init(
        &IssuingAuthority::default(),
        &PolicyRuleConfig::new().with("AltKeyIdType", "None"),
    )
    .unwrap();
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    assert!(tbs.find_extension(&ID_CE_AUTHORITY_KEY_IDENTIFIER).is_none());
}
