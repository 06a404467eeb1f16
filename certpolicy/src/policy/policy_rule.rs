//! The contract shared by extension policy rules and the closed set of rule implementations

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use der::asn1::ObjectIdentifier;
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::config::policy_settings::PolicyRuleSettings;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::request::approval::agent_approved;
use crate::request::certification_request::CertificationRequest;
use crate::rules::*;
use crate::util::error::*;
use crate::util::logging::*;

/// Result of applying a rule to a request
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PolicyOutcome {
    /// Every draft satisfied the rule
    Accepted,
    /// The rule declined the request. The reason is recorded on the request.
    Rejected,
}

impl fmt::Display for PolicyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyOutcome::Accepted => write!(f, "Accepted"),
            PolicyOutcome::Rejected => write!(f, "Rejected"),
        }
    }
}

/// `ExtensionPolicyRule` is implemented by each extension rule. Instances are built once from a
/// configuration snapshot and are not modified while requests are evaluated.
pub trait ExtensionPolicyRule: Sized {
    /// Implementation name used to select the rule in a policy configuration
    const IMPL_NAME: &'static str;
    /// Short description of the rule
    const DESCRIPTION: &'static str;

    /// Validates `config` and builds a rule instance
    fn init(issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self>;

    /// Evaluates a single draft, modifying its extension set as needed
    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()>;

    /// Describes the parameters the implementation accepts
    fn plugin_params() -> Vec<PluginParam>;
}

/// `keep_if_approved` implements the decision made when a rule finds its extension already present in
/// a draft: the value is kept if the request was approved by an agent and deleted otherwise. Returns
/// true if the existing value was kept. Returns false if the extension was absent or deleted.
pub fn keep_if_approved(
    rule: &str,
    request: &CertificationRequest,
    draft: &mut TbsCertificate,
    oid: &ObjectIdentifier,
) -> bool {
    if draft.find_extension(oid).is_none() {
        return false;
    }
    if agent_approved(request) {
        log_extension_decision(rule, oid, ExtensionDecision::Kept);
        true
    } else {
        draft.delete_extension(oid);
        log_extension_decision(rule, oid, ExtensionDecision::Deleted);
        false
    }
}

/// `install_extension` encodes and installs a value, replacing any existing value with the same OID.
pub fn install_extension<T: der::Encode>(
    rule: &str,
    draft: &mut TbsCertificate,
    oid: &ObjectIdentifier,
    critical: bool,
    value: &T,
) -> Result<()> {
    draft.set_extension_value(oid, critical, value)?;
    log_extension_decision(rule, oid, ExtensionDecision::Added);
    Ok(())
}

macro_rules! extension_policies {
    ($($variant:ident($rule:ty)),+ $(,)?) => {
        /// `ExtensionPolicy` is the closed set of rule implementations. Each variant wraps an
        /// initialized instance of the corresponding rule.
        #[derive(Clone, Debug)]
        pub enum ExtensionPolicy {
            $(
                #[doc = concat!("Wraps a [`", stringify!($rule), "`] instance")]
                $variant($rule),
            )+
        }

        impl ExtensionPolicy {
            /// Builds the implementation named `implementation` from `config`. Unknown names are a
            /// misconfiguration.
            pub fn init(
                implementation: &str,
                issuer: &IssuingAuthority,
                config: &PolicyRuleConfig,
            ) -> Result<ExtensionPolicy> {
                $(
                    if implementation == <$rule>::IMPL_NAME {
                        return Ok(ExtensionPolicy::$variant(<$rule>::init(issuer, config)?));
                    }
                )+
                Err(Error::Misconfiguration(format!(
                    "unrecognized implementation: {}",
                    implementation
                )))
            }

            /// Returns the names of all implementations
            pub fn implementation_names() -> Vec<&'static str> {
                alloc::vec![$(<$rule>::IMPL_NAME),+]
            }

            /// Returns the description and parameters of the named implementation
            pub fn describe(implementation: &str) -> Option<(&'static str, Vec<PluginParam>)> {
                $(
                    if implementation == <$rule>::IMPL_NAME {
                        return Some((<$rule>::DESCRIPTION, <$rule>::plugin_params()));
                    }
                )+
                None
            }

            /// Returns the implementation name of this instance
            pub fn impl_name(&self) -> &'static str {
                match self {
                    $(ExtensionPolicy::$variant(_) => <$rule>::IMPL_NAME,)+
                }
            }

            /// Returns the parameters of this instance's implementation
            pub fn plugin_params(&self) -> Vec<PluginParam> {
                match self {
                    $(ExtensionPolicy::$variant(_) => <$rule>::plugin_params(),)+
                }
            }

            /// Evaluates a single draft using this instance
            pub fn apply_cert(
                &self,
                request: &CertificationRequest,
                draft: &mut TbsCertificate,
            ) -> Result<()> {
                match self {
                    $(ExtensionPolicy::$variant(r) => r.apply_cert(request, draft),)+
                }
            }
        }
    };
}

extension_policies!(
    BasicConstraints(BasicConstraintsExt),
    KeyUsage(KeyUsageExt),
    ExtendedKeyUsage(ExtendedKeyUsageExt),
    NameConstraints(NameConstraintsExt),
    PolicyConstraints(PolicyConstraintsExt),
    AuthorityKeyIdentifier(AuthorityKeyIdentifierExt),
    SubjectKeyIdentifier(SubjectKeyIdentifierExt),
    AuthInfoAccess(AuthInfoAccessExt),
    SubjectInfoAccess(SubjectInfoAccessExt),
    NsCertType(NSCertTypeExt),
    SubjectAltName(SubjectAltNameExt),
    IssuerAltName(IssuerAltNameExt),
    CertificateRenewalWindow(CertificateRenewalWindowExt),
    GenericAsn1(GenericASN1Ext),
    CertificateScopeOfUse(CertificateScopeOfUseExt),
    PresenceServer(PresenceServerExt),
    InhibitAnyPolicy(InhibitAnyPolicyExt),
    OcspNoCheck(OCSPNoCheckExt),
    CertificatePolicies(CertificatePoliciesExt),
    CrlDistributionPoints(CRLDistributionPointsExt),
);

/// `PolicyRule` is a named, configured instance of an extension rule.
#[derive(Clone, Debug)]
#[readonly::make]
pub struct PolicyRule {
    /// Instance name
    #[readonly]
    pub name: String,
    /// Disabled rules are skipped by a [`PolicyChain`](crate::PolicyChain)
    #[readonly]
    pub enable: bool,
    /// Configuration the instance was built from
    #[readonly]
    pub config: PolicyRuleConfig,
    /// The initialized implementation
    #[readonly]
    pub policy: ExtensionPolicy,
}

impl PolicyRule {
    /// Builds a rule instance. Construction failures are logged and returned.
    pub fn init(
        name: &str,
        implementation: &str,
        enable: bool,
        issuer: &IssuingAuthority,
        config: &PolicyRuleConfig,
    ) -> Result<PolicyRule> {
        match ExtensionPolicy::init(implementation, issuer, config) {
            Ok(policy) => Ok(PolicyRule {
                name: name.to_string(),
                enable,
                config: config.clone(),
                policy,
            }),
            Err(e) => {
                log_message(
                    &PolicyLogLevels::Error,
                    &format!("Failed to initialize policy rule {}: {}", name, e),
                );
                Err(e)
            }
        }
    }

    /// Builds a rule instance from an entry in a [`PolicySettings`](crate::PolicySettings) object.
    pub fn from_settings(
        settings: &PolicyRuleSettings,
        issuer: &IssuingAuthority,
    ) -> Result<PolicyRule> {
        PolicyRule::init(
            &settings.name,
            &settings.implementation,
            settings.enable,
            issuer,
            &settings.params,
        )
    }

    /// `apply` evaluates every draft in the request in order.
    ///
    /// A request without drafts, or whose first draft is absent, is rejected with `no cert info`. The
    /// first draft that fails stops evaluation and the request is rejected with that failure's
    /// message; encoding failures are reported as `internal error`.
    pub fn apply(&self, request: &mut CertificationRequest) -> PolicyOutcome {
        let mut drafts = match request.cert_infos.take() {
            Some(drafts) if matches!(drafts.first(), Some(Some(_))) => drafts,
            other => {
                request.cert_infos = other;
                return self.reject(request, &Error::Rejected(RejectionReason::MissingCertInfo));
            }
        };

        let mut result = Ok(());
        for draft in drafts.iter_mut() {
            result = match draft {
                Some(tbs) => self.policy.apply_cert(request, tbs),
                None => Err(Error::Rejected(RejectionReason::MissingCertInfo)),
            };
            if result.is_err() {
                break;
            }
        }
        request.cert_infos = Some(drafts);

        match result {
            Ok(()) => PolicyOutcome::Accepted,
            Err(e) => self.reject(request, &e),
        }
    }

    fn reject(&self, request: &mut CertificationRequest, err: &Error) -> PolicyOutcome {
        let level = match err {
            Error::Rejected(_) => PolicyLogLevels::Info,
            _ => PolicyLogLevels::Error,
        };
        let detail = match err {
            Error::Asn1Error(e) => format!("{}: {}", err, e),
            _ => err.to_string(),
        };
        log_message(
            &level,
            &format!("{} rejected request: {}", self.name, detail),
        );
        request.set_error(err.to_string());
        PolicyOutcome::Rejected
    }

    /// Returns the implementation's parameter defaults as `name=value` strings
    pub fn default_params(&self) -> Vec<String> {
        default_params(&self.policy.plugin_params())
    }

    /// Returns this instance's parameters as `name=value` strings
    pub fn instance_params(&self) -> Vec<String> {
        instance_params(&self.policy.plugin_params(), &self.config)
    }

    /// Returns a structured description of the implementation's parameters
    pub fn extended_plugin_info(&self) -> Vec<PluginParam> {
        self.policy.plugin_params()
    }
}

#[test]
fn unknown_implementation() {
    let r = PolicyRule::init(
        "x",
        "NoSuchExt",
        true,
        &IssuingAuthority::default(),
        &PolicyRuleConfig::new(),
    );
    assert!(matches!(r, Err(Error::Misconfiguration(_))));
    assert_eq!(20, ExtensionPolicy::implementation_names().len());
    for name in ExtensionPolicy::implementation_names() {
        assert!(ExtensionPolicy::describe(name).is_some());
    }
}

#[test]
fn missing_cert_info() {
    use crate::util::test_support::*;

    let rule = PolicyRule::init(
        "pres",
        "PresenceServerExt",
        true,
        &IssuingAuthority::default(),
        &PolicyRuleConfig::new(),
    )
    .unwrap();

    let mut req = CertificationRequest::default();
    assert_eq!(PolicyOutcome::Rejected, rule.apply(&mut req));
    assert_eq!(Some("no cert info".to_string()), req.get_error());

    let mut req = CertificationRequest::default();
    req.cert_infos = Some(alloc::vec![None, Some(draft("CN=Joe"))]);
    assert_eq!(PolicyOutcome::Rejected, rule.apply(&mut req));
    assert_eq!(Some("no cert info".to_string()), req.get_error());
    // drafts are handed back to the request
    assert_eq!(2, req.cert_infos.as_ref().unwrap().len());

    let mut req = request("CN=Joe");
    assert_eq!(PolicyOutcome::Accepted, rule.apply(&mut req));
    assert_eq!(None, req.get_error());
}

#[test]
fn first_failing_draft_stops_evaluation() {
    use crate::util::test_support::*;
    use x509_cert::ext::pkix::BasicConstraints;

    let cfg = PolicyRuleConfig::new().with("isCA", true);
    let rule = PolicyRule::init("bc", "BasicConstraintsExt", true, &issuer(0), &cfg).unwrap();

    let mut req = CertificationRequest::default();
    req.cert_infos = Some(alloc::vec![Some(draft("CN=A")), Some(draft("CN=B"))]);
    assert_eq!(PolicyOutcome::Rejected, rule.apply(&mut req));
    let drafts = req.cert_infos.as_ref().unwrap();
    for d in drafts.iter().flatten() {
        assert!(d
            .get_extension_value::<BasicConstraints>(&crate::ID_CE_BASIC_CONSTRAINTS)
            .unwrap()
            .is_none());
    }
}

#[test]
fn rules_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PolicyRule>();
}
