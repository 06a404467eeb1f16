//! Subject Alternative Name rule

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::FromStr;

use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::TbsCertificate;

use crate::config::general_names::*;
use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::{CertificationRequest, RequestDataTypes};
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::ID_CE_SUBJECT_ALT_NAME;
use crate::util::policy_utilities::name_is_empty;

/// Where subject alternative names come from
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SanSource {
    /// General name templates read from configuration
    Config,
    /// Email addresses read from the request's authentication token
    AuthToken,
}

impl FromStr for SanSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "config" => Ok(SanSource::Config),
            "authToken" => Ok(SanSource::AuthToken),
            _ => Err(Error::Misconfiguration(format!(
                "unrecognized subject alt name source: {}",
                s
            ))),
        }
    }
}

/// A configured general name whose value may reference request data
#[derive(Clone, Debug, Eq, PartialEq)]
struct NameTemplate {
    choice: String,
    value: String,
}

/// Looks up a placeholder such as `request.email` or `auth.uid`.
fn resolve_placeholder(request: &CertificationRequest, placeholder: &str) -> Option<String> {
    if let Some(key) = placeholder.strip_prefix("request.") {
        if let Some(v) = request.get_http_param(key) {
            return Some(v.to_string());
        }
        return match request.extended_data.0.get(key) {
            Some(RequestDataTypes::String(s)) => Some(s.clone()),
            Some(RequestDataTypes::Strings(s)) => s.first().cloned(),
            Some(RequestDataTypes::U64(n)) => Some(n.to_string()),
            _ => None,
        };
    }
    if let Some(attr) = placeholder.strip_prefix("auth.") {
        return request
            .auth_token
            .as_ref()
            .and_then(|t| t.get_string(attr))
            .map(|s| s.to_string());
    }
    None
}

/// `substitute` replaces each `$...$` placeholder in `template`. Returns None when a placeholder
/// resolves to nothing or is left unterminated.
fn substitute(request: &CertificationRequest, template: &str) -> Option<String> {
    let mut out = String::new();
    let mut rest = template;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('$')?;
        let value = resolve_placeholder(request, &after[..end])?;
        if value.is_empty() {
            return None;
        }
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

/// `SubjectAltNameExt` builds the Subject Alternative Name extension from configured general name
/// templates or from email attributes of the authentication token.
///
/// The extension is marked critical whenever the subject name is empty. Requests relayed by a
/// subordinate registration authority that already carry extensions are left untouched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectAltNameExt {
    critical: bool,
    source: SanSource,
    templates: Vec<NameTemplate>,
    email_attributes: Vec<String>,
}

/// Parses a name whose value came from the request or its auth token. Templates without placeholders
/// are checked at init, so a failure here is the request's fault.
fn request_name(choice: &str, value: &str) -> Result<GeneralName> {
    parse_general_name(choice, value).map_err(|e| {
        log_message(
            &PolicyLogLevels::Info,
            &format!("{}: rejecting {} name {}: {}", SubjectAltNameExt::IMPL_NAME, choice, value, e),
        );
        Error::Rejected(RejectionReason::InvalidRequestParameter)
    })
}

impl SubjectAltNameExt {
    fn names_for(&self, request: &CertificationRequest) -> Result<Vec<GeneralName>> {
        let mut names = Vec::new();
        match self.source {
            SanSource::Config => {
                for t in &self.templates {
                    match substitute(request, &t.value) {
                        Some(value) if !value.trim().is_empty() => {
                            names.push(request_name(&t.choice, &value)?)
                        }
                        _ => log_message(
                            &PolicyLogLevels::Debug,
                            &format!(
                                "{}: skipping {} name with unresolved value {}",
                                Self::IMPL_NAME,
                                t.choice,
                                t.value
                            ),
                        ),
                    }
                }
            }
            SanSource::AuthToken => {
                if let Some(token) = &request.auth_token {
                    for attr in &self.email_attributes {
                        if let Some(values) = token.get_string_array(attr) {
                            for v in values.iter().filter(|v| !v.trim().is_empty()) {
                                names.push(request_name("RFC822Name", v)?);
                            }
                        }
                    }
                }
            }
        }
        Ok(names)
    }
}

impl ExtensionPolicyRule for SubjectAltNameExt {
    const IMPL_NAME: &'static str = "SubjectAltNameExt";
    const DESCRIPTION: &'static str = "Sets the Subject Alternative Name extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let source = SanSource::from_str(&config.get_string("source", "config")?)?;

        let mut templates = Vec::new();
        let num_names = config.get_slot_count("numGeneralNames", 8)?;
        for i in 0..num_names {
            let scope = config.get_sub_scope(&format!("generalName{}", i));
            let choice = scope.get_string(GENERAL_NAME_CHOICE, "")?;
            let value = scope.get_string(GENERAL_NAME_VALUE, "")?;
            if choice.trim().is_empty() || value.trim().is_empty() {
                continue;
            }
            GeneralNameChoice::from_str(&choice)?;
            if !value.contains('$') {
                parse_general_name(&choice, &value)?;
            }
            templates.push(NameTemplate { choice, value });
        }

        let email_attributes = config
            .get_string("emailAttributes", "mail")?
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        Ok(SubjectAltNameExt {
            critical,
            source,
            templates,
            email_attributes,
        })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if draft.has_extension_set() && request.has_source_id() {
            log_extension_decision(
                Self::IMPL_NAME,
                &ID_CE_SUBJECT_ALT_NAME,
                ExtensionDecision::Skipped,
            );
            return Ok(());
        }
        if keep_if_approved(Self::IMPL_NAME, request, draft, &ID_CE_SUBJECT_ALT_NAME) {
            return Ok(());
        }

        let names = self.names_for(request)?;
        if names.is_empty() {
            return Ok(());
        }
        let critical = self.critical || name_is_empty(&draft.subject);
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_SUBJECT_ALT_NAME,
            critical,
            &SubjectAltName(names),
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(false),
            PluginParam::new(
                "source",
                ParamSyntax::Choice(&["config", "authToken"]),
                "config",
                "Source of the alternative names"
            ),
            PluginParam::string(
                "emailAttributes",
                "mail",
                "Comma separated authentication token attributes holding email addresses"
            ),
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
                    "General name value; $request.<key>$ and $auth.<attribute>$ are replaced"
                ),
            ]
        }));
        params
    }
}

#[cfg(test)]
fn san_of(tbs: &TbsCertificate) -> Option<(bool, Vec<String>)> {
    tbs.get_extension_value::<SubjectAltName>(&ID_CE_SUBJECT_ALT_NAME)
        .unwrap()
        .map(|(critical, san)| {
            let names = san
                .0
                .iter()
                .map(|gn| match gn {
                    GeneralName::DnsName(d) => format!("dns:{}", d),
                    GeneralName::Rfc822Name(r) => format!("email:{}", r),
                    GeneralName::UniformResourceIdentifier(u) => format!("uri:{}", u),
                    _ => "other".to_string(),
                })
                .collect();
            (critical, names)
        })
}

#[test]
fn templates_and_placeholders() {
    use crate::request::certification_request::AuthToken;
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("generalName0.generalNameChoice", "DNSName")
        .with("generalName0.generalNameValue", "www.example.com")
        .with("generalName1.generalNameChoice", "RFC822Name")
        .with("generalName1.generalNameValue", "$auth.mail$")
        .with("generalName2.generalNameChoice", "DNSName")
        .with("generalName2.generalNameValue", "$request.host$.example.com")
        .with("generalName3.generalNameChoice", "URIName")
        .with("generalName3.generalNameValue", "$request.missing$");
    let rule = SubjectAltNameExt::init(&issuer(-1), &cfg).unwrap();

    let mut req = request("CN=Joe");
    req.set_http_param("host", "mail");
    let mut token = AuthToken::new();
    token.set_string_array("mail", alloc::vec!["joe@example.com".to_string()]);
    req.auth_token = Some(token);

    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(
        Some((
            false,
            alloc::vec![
                "dns:www.example.com".to_string(),
                "email:joe@example.com".to_string(),
                "dns:mail.example.com".to_string(),
            ]
        )),
        san_of(&tbs)
    );

    // an empty subject forces criticality
    let mut tbs = draft("");
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert!(san_of(&tbs).unwrap().0);
}

#[test]
fn auth_token_source() {
    use crate::request::certification_request::AuthToken;
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("source", "authToken")
        .with("emailAttributes", "mail, altMail");
    let rule = SubjectAltNameExt::init(&issuer(-1), &cfg).unwrap();

    let mut req = request("CN=Joe");
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(None, san_of(&tbs));

    let mut token = AuthToken::new();
    token.set_string_array("mail", alloc::vec!["joe@example.com".to_string()]);
    token.set_string_array(
        "altMail",
        alloc::vec!["joe@example.org".to_string(), "".to_string()],
    );
    req.auth_token = Some(token);
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(
        Some((
            false,
            alloc::vec![
                "email:joe@example.com".to_string(),
                "email:joe@example.org".to_string(),
            ]
        )),
        san_of(&tbs)
    );
}

#[test]
fn relayed_requests_are_trusted() {
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("generalName0.generalNameChoice", "DNSName")
        .with("generalName0.generalNameValue", "www.example.com");
    let rule = SubjectAltNameExt::init(&issuer(-1), &cfg).unwrap();

    let upstream = SubjectAltName(alloc::vec![GeneralName::DnsName(
        der::asn1::Ia5String::new("ra.example.com").unwrap()
    )]);
    let mut tbs = draft("CN=Joe");
    tbs.set_extension_value(&ID_CE_SUBJECT_ALT_NAME, false, &upstream)
        .unwrap();

    let mut req = request("CN=Joe");
    req.set_source_id("ra1".to_string());
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(
        Some((false, alloc::vec!["dns:ra.example.com".to_string()])),
        san_of(&tbs)
    );

    // without a source id the upstream value is replaced
    let req = request("CN=Joe");
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(
        Some((false, alloc::vec!["dns:www.example.com".to_string()])),
        san_of(&tbs)
    );
}

#[test]
fn malformed_request_value_rejects() {
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("generalName0.generalNameChoice", "IPAddress")
        .with("generalName0.generalNameValue", "$request.ip$");
    let rule = PolicyRule::init("san", "SubjectAltNameExt", true, &issuer(-1), &cfg).unwrap();

    let mut req = request("CN=Joe");
    req.set_http_param("ip", "not-an-ip");
    assert_eq!(PolicyOutcome::Rejected, rule.apply(&mut req));
    assert_eq!(
        Some("invalid request parameter".to_string()),
        req.get_error()
    );
    assert!(first(&req).find_extension(&ID_CE_SUBJECT_ALT_NAME).is_none());

    let mut req = request("CN=Joe");
    req.set_http_param("ip", "10.0.0.1");
    assert_eq!(PolicyOutcome::Accepted, rule.apply(&mut req));
    assert!(first(&req).find_extension(&ID_CE_SUBJECT_ALT_NAME).is_some());
}

#[test]
fn bad_configuration() {
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new().with("source", "ldap");
    assert!(SubjectAltNameExt::init(&issuer(-1), &cfg).is_err());

    let cfg = PolicyRuleConfig::new()
        .with("generalName0.generalNameChoice", "X400Address")
        .with("generalName0.generalNameValue", "x");
    assert!(SubjectAltNameExt::init(&issuer(-1), &cfg).is_err());

    let cfg = PolicyRuleConfig::new()
        .with("generalName0.generalNameChoice", "IPAddress")
        .with("generalName0.generalNameValue", "not-an-address");
    assert!(SubjectAltNameExt::init(&issuer(-1), &cfg).is_err());
}
