//! Netscape Certificate Type rule

use alloc::format;
use alloc::vec::Vec;

use flagset::FlagSet;
use x509_cert::TbsCertificate;

use crate::asn1::netscape_cert_type::*;
use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::approval::{request_origin, RequestOrigin};
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::NETSCAPE_CERT_TYPE;
use crate::util::policy_utilities::parse_bool_str;

/// Certificate type for which the extension is always removed
pub const CERT_TYPE_OCSP_RESPONDER: &str = "ocspResponder";

/// Configuration item (and HTTP parameter) name, flag and default for each certificate type bit
const NS_CERT_TYPE_BITS: [(&str, NsCertTypes, bool); 7] = [
    ("ssl_client", NsCertTypes::SslClient, true),
    ("ssl_server", NsCertTypes::SslServer, false),
    ("email", NsCertTypes::Email, true),
    ("object_signing", NsCertTypes::ObjectSigning, false),
    ("ssl_ca", NsCertTypes::SslCa, false),
    ("email_ca", NsCertTypes::EmailCa, false),
    ("object_signing_ca", NsCertTypes::ObjectSigningCa, false),
];

/// Returns the bits implied by a profile certificate type, if the type is recognized
fn bits_for_cert_type(cert_type: &str) -> Option<FlagSet<NsCertTypes>> {
    match cert_type {
        "client" => Some(NsCertTypes::SslClient | NsCertTypes::Email),
        "server" => Some(NsCertTypes::SslServer.into()),
        "ca" => Some(NsCertTypes::SslCa | NsCertTypes::EmailCa | NsCertTypes::ObjectSigningCa),
        "ra" => Some(NsCertTypes::SslClient.into()),
        "objSignClient" => Some(NsCertTypes::ObjectSigning.into()),
        _ => None,
    }
}

/// `NSCertTypeExt` sets the legacy Netscape certificate type extension.
///
/// Bits come from HTTP parameters when any are supplied, otherwise from the request's certificate
/// type, otherwise from configured defaults. An existing value is trusted when the request was
/// approved by an agent, used as the starting point when the request was authenticated, and
/// discarded when the request's origin is unknown.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NSCertTypeExt {
    critical: bool,
    default_bits: Option<FlagSet<NsCertTypes>>,
    issuer_path_len: i32,
}

impl NSCertTypeExt {
    fn bits_from_request(&self, request: &CertificationRequest) -> FlagSet<NsCertTypes> {
        let mut from_params = None;
        for (name, flag, _) in NS_CERT_TYPE_BITS.iter() {
            if let Some(v) = request.get_http_param(name) {
                let bits = from_params.get_or_insert_with(FlagSet::<NsCertTypes>::default);
                if let Some(true) = parse_bool_str(v) {
                    *bits |= *flag;
                }
            }
        }
        if let Some(bits) = from_params {
            return bits;
        }
        if let Some(bits) = bits_for_cert_type(&request.get_cert_type()) {
            return bits;
        }
        self.default_bits.unwrap_or_default()
    }
}

impl ExtensionPolicyRule for NSCertTypeExt {
    const IMPL_NAME: &'static str = "NSCertTypeExt";
    const DESCRIPTION: &'static str = "Sets the Netscape Certificate Type extension";

    fn init(issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let default_bits = if config.get_bool("setDefaultBits", true)? {
            let mut bits = FlagSet::<NsCertTypes>::default();
            for (name, flag, default) in NS_CERT_TYPE_BITS.iter() {
                if config.get_bool(name, *default)? {
                    bits |= *flag;
                }
            }
            Some(bits)
        } else {
            None
        };
        Ok(NSCertTypeExt {
            critical,
            default_bits,
            issuer_path_len: issuer.path_len,
        })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if request.get_cert_type() == CERT_TYPE_OCSP_RESPONDER {
            if draft.delete_extension(&NETSCAPE_CERT_TYPE) {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &NETSCAPE_CERT_TYPE,
                    ExtensionDecision::Deleted,
                );
            }
            return Ok(());
        }

        let existing = draft
            .get_extension_value::<NsCertType>(&NETSCAPE_CERT_TYPE)?
            .map(|(_, v)| v);
        let origin = request_origin(request);
        if let (Some(ct), RequestOrigin::AgentApproved) = (existing, origin) {
            if self.issuer_path_len == 0 && ct.asserts_ca() {
                return Err(Error::Rejected(RejectionReason::NsCaBitsNotPermitted));
            }
            log_extension_decision(Self::IMPL_NAME, &NETSCAPE_CERT_TYPE, ExtensionDecision::Kept);
            return Ok(());
        }

        let mut bits = match (existing, origin) {
            (Some(ct), RequestOrigin::Authenticated) => ct.0,
            _ => FlagSet::<NsCertTypes>::default(),
        };
        if bits.is_empty() {
            bits = self.bits_from_request(request);
        }

        let ct = NsCertType(bits);
        if self.issuer_path_len == 0 && ct.asserts_ca() {
            return Err(Error::Rejected(RejectionReason::NsCaBitsNotPermitted));
        }
        if bits.is_empty() {
            if draft.delete_extension(&NETSCAPE_CERT_TYPE) {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &NETSCAPE_CERT_TYPE,
                    ExtensionDecision::Deleted,
                );
            }
            return Ok(());
        }
        install_extension(
            Self::IMPL_NAME,
            draft,
            &NETSCAPE_CERT_TYPE,
            self.critical,
            &ct,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(false),
            PluginParam::boolean(
                "setDefaultBits",
                true,
                "Use the configured bits when the request supplies none"
            ),
        ];
        for (name, _, default) in NS_CERT_TYPE_BITS.iter() {
            params.push(PluginParam::boolean(
                name,
                *default,
                &format!("Default value of the {} bit", name),
            ));
        }
        params
    }
}

#[cfg(test)]
fn bits_of(tbs: &TbsCertificate) -> Option<FlagSet<NsCertTypes>> {
    tbs.get_extension_value::<NsCertType>(&NETSCAPE_CERT_TYPE)
        .unwrap()
        .map(|(_, v)| v.0)
}

#[test]
fn ocsp_responder_strips_extension() {
    use crate::util::test_support::*;
    use alloc::string::ToString;

    let rule = NSCertTypeExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    let mut tbs = draft("CN=OCSP");
    tbs.set_extension_value(
        &NETSCAPE_CERT_TYPE,
        false,
        &NsCertType(NsCertTypes::SslServer.into()),
    )
    .unwrap();
    let mut req = CertificationRequest::new(tbs.clone());
    req.set_cert_type(CERT_TYPE_OCSP_RESPONDER.to_string());
    approve(&mut req);
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(None, bits_of(&tbs));
}

#[test]
fn bit_sources() {
    use crate::util::test_support::*;
    use alloc::string::ToString;

    let rule = NSCertTypeExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();

    // certificate type heuristic
    let mut req = request("CN=www.example.com");
    req.set_cert_type("server".to_string());
    let mut tbs = draft("CN=www.example.com");
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(Some(NsCertTypes::SslServer.into()), bits_of(&tbs));

    // HTTP parameters win over the certificate type
    req.set_http_param("object_signing", "true");
    req.set_http_param("ssl_server", "false");
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(Some(NsCertTypes::ObjectSigning.into()), bits_of(&tbs));

    // unknown certificate type falls back to configured defaults
    let rule = NSCertTypeExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("email", false),
    )
    .unwrap();
    let mut req = request("CN=Joe");
    req.set_cert_type("other".to_string());
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(Some(NsCertTypes::SslClient.into()), bits_of(&tbs));

    // without defaults nothing is installed
    let rule = NSCertTypeExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("setDefaultBits", false),
    )
    .unwrap();
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(None, bits_of(&tbs));
}

#[test]
fn existing_value_by_origin() {
    use crate::request::certification_request::AuthToken;
    use crate::util::test_support::*;
    use alloc::string::ToString;

    let rule = NSCertTypeExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    let mut tbs = draft("CN=Joe");
    tbs.set_extension_value(
        &NETSCAPE_CERT_TYPE,
        false,
        &NsCertType(NsCertTypes::ObjectSigningCa.into()),
    )
    .unwrap();

    // unknown origin: asserted bits are discarded and recomputed
    let mut req = request("CN=Joe");
    req.set_cert_type("server".to_string());
    let mut unknown = tbs.clone();
    rule.apply_cert(&req, &mut unknown).unwrap();
    assert_eq!(Some(NsCertTypes::SslServer.into()), bits_of(&unknown));

    // authenticated origin: asserted bits are retained
    req.auth_token = Some(AuthToken::new());
    let mut authenticated = tbs.clone();
    rule.apply_cert(&req, &mut authenticated).unwrap();
    assert_eq!(Some(NsCertTypes::ObjectSigningCa.into()), bits_of(&authenticated));

    // agent approved: kept, but CA bits are still checked against the issuer
    approve(&mut req);
    let rule0 = NSCertTypeExt::init(&issuer(0), &PolicyRuleConfig::new()).unwrap();
    let mut approved = tbs.clone();
    assert_eq!(
        Err(Error::Rejected(RejectionReason::NsCaBitsNotPermitted)),
        rule0.apply_cert(&req, &mut approved)
    );
    rule.apply_cert(&req, &mut approved).unwrap();
    assert_eq!(Some(NsCertTypes::ObjectSigningCa.into()), bits_of(&approved));
}

#[test]
fn ca_bits_beneath_zero_path_len() {
    use crate::util::test_support::*;
    use alloc::string::ToString;

    let rule = NSCertTypeExt::init(&issuer(0), &PolicyRuleConfig::new()).unwrap();
    let mut req = request("CN=Sub CA");
    req.set_cert_type("ca".to_string());
    let mut tbs = draft("CN=Sub CA");
    assert_eq!(
        Err(Error::Rejected(RejectionReason::NsCaBitsNotPermitted)),
        rule.apply_cert(&req, &mut tbs)
    );
}
