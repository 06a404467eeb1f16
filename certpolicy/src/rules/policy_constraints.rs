//! Policy Constraints rule

use alloc::format;
use alloc::vec::Vec;

use x509_cert::ext::pkix::PolicyConstraints;
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::ID_CE_POLICY_CONSTRAINTS;

/// `PolicyConstraintsExt` installs requireExplicitPolicy and inhibitPolicyMapping skip counts.
///
/// `value` is None when both counts are -1 (unset) or when either count is invalid, in which case the
/// instance accepts every request without touching the draft.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyConstraintsExt {
    critical: bool,
    value: Option<PolicyConstraints>,
}

fn skip_count(item: &str, v: i64) -> Result<Option<u32>> {
    if v == -1 {
        return Ok(None);
    }
    match u32::try_from(v) {
        Ok(c) => Ok(Some(c)),
        Err(_) => Err(Error::Misconfiguration(format!(
            "{} must be -1 or a non-negative integer: {}",
            item, v
        ))),
    }
}

fn build_policy_constraints(config: &PolicyRuleConfig) -> Result<Option<PolicyConstraints>> {
    let require_explicit_policy =
        skip_count("reqExplicitPolicy", config.get_integer("reqExplicitPolicy", -1)?)?;
    let inhibit_policy_mapping = skip_count(
        "inhibitPolicyMapping",
        config.get_integer("inhibitPolicyMapping", -1)?,
    )?;
    if require_explicit_policy.is_none() && inhibit_policy_mapping.is_none() {
        return Ok(None);
    }
    Ok(Some(PolicyConstraints {
        require_explicit_policy,
        inhibit_policy_mapping,
    }))
}

impl PolicyConstraintsExt {
    /// Returns true if the instance accepts every request without modifying drafts
    pub fn is_inert(&self) -> bool {
        self.value.is_none()
    }
}

impl ExtensionPolicyRule for PolicyConstraintsExt {
    const IMPL_NAME: &'static str = "PolicyConstraintsExt";
    const DESCRIPTION: &'static str = "Sets the Policy Constraints extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", true)?;
        let value = match build_policy_constraints(config) {
            Ok(v) => v,
            Err(e) => {
                log_message(
                    &PolicyLogLevels::Error,
                    &format!(
                        "{}: failed to build policy constraints, rule will accept all requests: {}",
                        Self::IMPL_NAME,
                        e
                    ),
                );
                None
            }
        };
        Ok(PolicyConstraintsExt { critical, value })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        let value = match &self.value {
            Some(v) => v,
            None => {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &ID_CE_POLICY_CONSTRAINTS,
                    ExtensionDecision::Skipped,
                );
                return Ok(());
            }
        };
        if keep_if_approved(Self::IMPL_NAME, request, draft, &ID_CE_POLICY_CONSTRAINTS) {
            return Ok(());
        }
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_POLICY_CONSTRAINTS,
            self.critical,
            value,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        alloc::vec![
            critical_param(true),
            PluginParam::integer(
                "reqExplicitPolicy",
                -1,
                "Number of certificates before an explicit policy is required, -1 if unset"
            ),
            PluginParam::integer(
                "inhibitPolicyMapping",
                -1,
                "Number of certificates before policy mapping is inhibited, -1 if unset"
            ),
        ]
    }
}

#[test]
fn builds_and_gates() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("reqExplicitPolicy", 0)
        .with("inhibitPolicyMapping", "-1");
    let rule = PolicyConstraintsExt::init(&issuer(-1), &cfg).unwrap();
    assert!(!rule.is_inert());

    let existing = PolicyConstraints {
        require_explicit_policy: Some(7),
        inhibit_policy_mapping: Some(7),
    };
    let mut tbs = draft("CN=Sub CA");
    tbs.set_extension_value(&ID_CE_POLICY_CONSTRAINTS, false, &existing)
        .unwrap();

    let mut approved = tbs.clone();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    rule.apply_cert(&req, &mut approved).unwrap();
    let (critical, pc) = approved
        .get_extension_value::<PolicyConstraints>(&ID_CE_POLICY_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(existing, pc);

    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    let (critical, pc) = tbs
        .get_extension_value::<PolicyConstraints>(&ID_CE_POLICY_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert!(critical);
    assert_eq!(Some(0), pc.require_explicit_policy);
    assert_eq!(None, pc.inhibit_policy_mapping);
}

#[test]
fn unconfigured_or_invalid_is_inert() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;

    let rule = PolicyConstraintsExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    assert!(rule.is_inert());
    let rule = PolicyConstraintsExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("reqExplicitPolicy", -5),
    )
    .unwrap();
    assert!(rule.is_inert());
    let mut tbs = draft("CN=Sub CA");
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    assert!(tbs.find_extension(&ID_CE_POLICY_CONSTRAINTS).is_none());
}
