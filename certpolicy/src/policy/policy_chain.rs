//! Ordered evaluation of a list of configured rules

use alloc::format;
use alloc::vec::Vec;

use crate::config::policy_settings::PolicySettings;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;

/// `PolicyChain` applies enabled rules in order and stops at the first rejection.
#[derive(Clone, Debug, Default)]
pub struct PolicyChain {
    rules: Vec<PolicyRule>,
}

impl PolicyChain {
    /// Creates an empty chain
    pub fn new() -> PolicyChain {
        PolicyChain::default()
    }

    /// Builds a chain from a settings object. Any rule that fails to initialize, enabled or not,
    /// causes the whole chain to fail.
    pub fn from_settings(settings: &PolicySettings, issuer: &IssuingAuthority) -> Result<Self> {
        let mut chain = PolicyChain::new();
        for rs in &settings.rules {
            chain.add_rule(PolicyRule::from_settings(rs, issuer)?);
        }
        Ok(chain)
    }

    /// Appends a rule
    pub fn add_rule(&mut self, rule: PolicyRule) {
        self.rules.push(rule);
    }

    /// Returns the rules in evaluation order
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Applies each enabled rule in order. Returns [`PolicyOutcome::Rejected`] as soon as a rule
    /// rejects the request.
    pub fn apply(&self, request: &mut CertificationRequest) -> PolicyOutcome {
        for rule in self.rules.iter().filter(|r| r.enable) {
            if PolicyOutcome::Rejected == rule.apply(request) {
                log_message(
                    &PolicyLogLevels::Info,
                    &format!("Policy chain stopped at {}", rule.name),
                );
                return PolicyOutcome::Rejected;
            }
        }
        PolicyOutcome::Accepted
    }
}

#[test]
fn chain_stops_at_first_rejection() {
    use crate::config::policy_settings::parse_policy_settings;
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::oids::*;
    use crate::util::test_support::*;

    let json = br#"{"rules": [
        {"name": "noCheck", "implementation": "OCSPNoCheckExt"},
        {"name": "disabledKu", "implementation": "KeyUsageExt", "enable": false},
        {"name": "bc", "implementation": "BasicConstraintsExt", "params": {"isCA": true}},
        {"name": "inhibit", "implementation": "InhibitAnyPolicyExt"}
    ]}"#;
    let ps = parse_policy_settings(json).unwrap();

    // an issuer with a zero path length rejects subordinate CAs
    let chain = PolicyChain::from_settings(&ps, &issuer(0)).unwrap();
    assert_eq!(4, chain.rules().len());
    let mut req = request("CN=Sub CA");
    assert_eq!(PolicyOutcome::Rejected, chain.apply(&mut req));
    let d = first(&req);
    assert!(d.find_extension(&ID_PKIX_OCSP_NOCHECK).is_some());
    assert!(d.find_extension(&ID_CE_INHIBIT_ANY_POLICY).is_none());

    // the disabled key usage rule would reject this request for having no usage bits
    let chain = PolicyChain::from_settings(&ps, &issuer(-1)).unwrap();
    let mut req = request("CN=Sub CA");
    assert_eq!(PolicyOutcome::Accepted, chain.apply(&mut req));
    let d = first(&req);
    assert!(d.find_extension(&ID_CE_INHIBIT_ANY_POLICY).is_some());
    assert!(d.find_extension(&ID_CE_KEY_USAGE).is_none());
}

#[test]
fn chain_init_failure() {
    use crate::config::policy_settings::parse_policy_settings;
    let json = br#"{"rules": [
        {"name": "bc", "implementation": "BasicConstraintsExt", "params": {"maxPathLen": 300}}
    ]}"#;
    let ps = parse_policy_settings(json).unwrap();
    assert!(matches!(
        PolicyChain::from_settings(&ps, &IssuingAuthority::default()),
        Err(Error::Misconfiguration(_))
    ));
}
