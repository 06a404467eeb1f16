//! Certificate policies rule

use alloc::format;
use alloc::vec::Vec;

use der::asn1::{Any, Ia5String};
use x509_cert::ext::pkix::certpolicy::{CertificatePolicies, PolicyInformation, PolicyQualifierInfo};
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::{ID_CE_CERTIFICATE_POLICIES, ID_QT_CPS};
use crate::util::policy_utilities::parse_oid;

fn read_policy(config: &PolicyRuleConfig, index: i64) -> Result<Option<PolicyInformation>> {
    let item = format!("certPolicy{}", index);
    let scope = config.get_sub_scope(&item);
    if !scope.get_bool("enable", true)? {
        return Ok(None);
    }
    let policy_id = scope.get_string("policyId", "")?;
    if policy_id.trim().is_empty() {
        return Ok(None);
    }
    let policy_identifier = parse_oid(&format!("{}.policyId", item), &policy_id)?;

    let cps_uri = scope.get_string("cpsURI", "")?;
    let policy_qualifiers = if cps_uri.trim().is_empty() {
        None
    } else {
        let uri = match Ia5String::new(cps_uri.trim()) {
            Ok(u) => u,
            Err(_) => {
                return Err(Error::Misconfiguration(format!(
                    "{}.cpsURI is not an IA5String: {}",
                    item, cps_uri
                )))
            }
        };
        Some(alloc::vec![PolicyQualifierInfo {
            policy_qualifier_id: ID_QT_CPS,
            qualifier: Some(Any::encode_from(&uri)?),
        }])
    };
    Ok(Some(PolicyInformation {
        policy_identifier,
        policy_qualifiers,
    }))
}

/// `CertificatePoliciesExt` installs the configured policy identifiers, each with an optional CPS
/// pointer qualifier, replacing any existing value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificatePoliciesExt {
    critical: bool,
    value: CertificatePolicies,
}

impl ExtensionPolicyRule for CertificatePoliciesExt {
    const IMPL_NAME: &'static str = "CertificatePoliciesExt";
    const DESCRIPTION: &'static str = "Sets the Certificate Policies extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let mut policies: Vec<PolicyInformation> = Vec::new();
        for i in 0..config.get_slot_count("numCertPolicies", 5)? {
            if let Some(p) = read_policy(config, i)? {
                if policies
                    .iter()
                    .any(|e| e.policy_identifier == p.policy_identifier)
                {
                    return Err(Error::Misconfiguration(format!(
                        "policy {} is configured more than once",
                        p.policy_identifier
                    )));
                }
                policies.push(p);
            }
        }
        Ok(CertificatePoliciesExt {
            critical,
            value: CertificatePolicies(policies),
        })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if self.value.0.is_empty() {
            if draft.delete_extension(&ID_CE_CERTIFICATE_POLICIES) {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &ID_CE_CERTIFICATE_POLICIES,
                    ExtensionDecision::Deleted,
                );
            }
            return Ok(());
        }
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_CERTIFICATE_POLICIES,
            self.critical,
            &self.value,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(false),
            PluginParam::integer("numCertPolicies", 5, "Number of policy slots"),
        ];
        params.extend(indexed_params(5, |i| {
            alloc::vec![
                PluginParam::boolean(&format!("certPolicy{}.enable", i), true, "Enable this policy"),
                PluginParam::string(&format!("certPolicy{}.policyId", i), "", "Policy OID"),
                PluginParam::string(&format!("certPolicy{}.cpsURI", i), "", "CPS pointer"),
            ]
        }));
        params
    }
}

#[test]
fn policies_with_qualifiers() {
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("certPolicy0.policyId", "2.16.840.1.101.3.2.1.48.1")
        .with("certPolicy0.cpsURI", "http://pki.example.com/cps")
        .with("certPolicy1.enable", false)
        .with("certPolicy1.policyId", "2.16.840.1.101.3.2.1.48.2")
        .with("certPolicy2.policyId", "2.16.840.1.101.3.2.1.48.3");
    let rule = CertificatePoliciesExt::init(&issuer(-1), &cfg).unwrap();
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();

    let (_, cp) = tbs
        .get_extension_value::<CertificatePolicies>(&ID_CE_CERTIFICATE_POLICIES)
        .unwrap()
        .unwrap();
    assert_eq!(2, cp.0.len());
    let qualifiers = cp.0[0].policy_qualifiers.as_ref().unwrap();
    assert_eq!(ID_QT_CPS, qualifiers[0].policy_qualifier_id);
    assert!(cp.0[1].policy_qualifiers.is_none());

    let cfg = PolicyRuleConfig::new()
        .with("certPolicy0.policyId", "1.2.3")
        .with("certPolicy1.policyId", "1.2.3");
    assert!(CertificatePoliciesExt::init(&issuer(-1), &cfg).is_err());

    let cfg = PolicyRuleConfig::new().with("certPolicy0.policyId", "policy");
    assert!(CertificatePoliciesExt::init(&issuer(-1), &cfg).is_err());
}
