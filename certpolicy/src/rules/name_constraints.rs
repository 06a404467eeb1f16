//! Name Constraints rule

use alloc::format;
use alloc::vec::Vec;

use x509_cert::ext::pkix::constraints::name::GeneralSubtrees;
use x509_cert::ext::pkix::NameConstraints;
use x509_cert::TbsCertificate;

use crate::config::general_names::subtree_from_scope;
use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::ID_CE_NAME_CONSTRAINTS;

/// `NameConstraintsExt` installs configured permitted and excluded subtrees.
///
/// `value` is None when no subtree is configured or when the subtrees could not be built. Such an
/// instance is inert and accepts every request without touching the draft.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NameConstraintsExt {
    critical: bool,
    value: Option<NameConstraints>,
}

fn read_subtrees(config: &PolicyRuleConfig, prefix: &str, count: i64) -> Result<GeneralSubtrees> {
    let mut subtrees = GeneralSubtrees::new();
    for i in 0..count {
        let scope = config.get_sub_scope(&format!("{}{}", prefix, i));
        if let Some(st) = subtree_from_scope(&scope)? {
            subtrees.push(st);
        }
    }
    Ok(subtrees)
}

fn build_name_constraints(
    config: &PolicyRuleConfig,
    num_permitted: i64,
    num_excluded: i64,
) -> Result<Option<NameConstraints>> {
    let permitted = read_subtrees(config, "permittedSubtrees", num_permitted)?;
    let excluded = read_subtrees(config, "excludedSubtrees", num_excluded)?;
    if permitted.is_empty() && excluded.is_empty() {
        return Ok(None);
    }
    Ok(Some(NameConstraints {
        permitted_subtrees: if permitted.is_empty() {
            None
        } else {
            Some(permitted)
        },
        excluded_subtrees: if excluded.is_empty() {
            None
        } else {
            Some(excluded)
        },
    }))
}

impl NameConstraintsExt {
    /// Returns true if the instance accepts every request without modifying drafts
    pub fn is_inert(&self) -> bool {
        self.value.is_none()
    }
}

impl ExtensionPolicyRule for NameConstraintsExt {
    const IMPL_NAME: &'static str = "NameConstraintsExt";
    const DESCRIPTION: &'static str = "Sets the Name Constraints extension from configured permitted and excluded subtrees";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", true)?;
        let num_permitted = config.get_slot_count("numPermittedSubtrees", 8)?;
        let num_excluded = config.get_slot_count("numExcludedSubtrees", 8)?;
        let value = match build_name_constraints(config, num_permitted, num_excluded) {
            Ok(v) => v,
            Err(e) => {
                log_message(
                    &PolicyLogLevels::Error,
                    &format!(
                        "{}: failed to build name constraints, rule will accept all requests: {}",
                        Self::IMPL_NAME,
                        e
                    ),
                );
                None
            }
        };
        Ok(NameConstraintsExt { critical, value })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        let value = match &self.value {
            Some(v) => v,
            None => {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &ID_CE_NAME_CONSTRAINTS,
                    ExtensionDecision::Skipped,
                );
                return Ok(());
            }
        };
        if keep_if_approved(Self::IMPL_NAME, request, draft, &ID_CE_NAME_CONSTRAINTS) {
            return Ok(());
        }
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_NAME_CONSTRAINTS,
            self.critical,
            value,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(true),
            PluginParam::integer("numPermittedSubtrees", 8, "Number of permitted subtree slots"),
            PluginParam::integer("numExcludedSubtrees", 8, "Number of excluded subtree slots"),
        ];
        for prefix in ["permittedSubtrees", "excludedSubtrees"] {
            params.extend(indexed_params(8, |i| {
                alloc::vec![
                    PluginParam::boolean(&format!("{}{}.enable", prefix, i), true, "Enable this subtree"),
                    PluginParam::string(
                        &format!("{}{}.base.generalNameChoice", prefix, i),
                        "",
                        "General name type of the subtree base"
                    ),
                    PluginParam::string(
                        &format!("{}{}.base.generalNameValue", prefix, i),
                        "",
                        "General name value of the subtree base"
                    ),
                    PluginParam::integer(&format!("{}{}.min", prefix, i), 0, "Minimum distance"),
                    PluginParam::integer(
                        &format!("{}{}.max", prefix, i),
                        -1,
                        "Maximum distance, -1 for no maximum"
                    ),
                ]
            }));
        }
        params
    }
}

#[cfg(test)]
fn nc_config() -> PolicyRuleConfig {
    let json = r#"{
        "permittedSubtrees0": {"base": {"generalNameChoice": "DNSName", "generalNameValue": "example.com"}},
        "permittedSubtrees1.base.generalNameChoice": "DirectoryName",
        "permittedSubtrees1.base.generalNameValue": "O=Example,C=US",
        "excludedSubtrees0": {"base": {"generalNameChoice": "IPAddress", "generalNameValue": "10.0.0.0/8"}, "max": 2}
    }"#;
    serde_json::from_str(json).unwrap()
}

#[test]
fn builds_subtrees() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;

    let rule = NameConstraintsExt::init(&issuer(-1), &nc_config()).unwrap();
    assert!(!rule.is_inert());
    let mut tbs = draft("CN=Sub CA");
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    let (critical, nc) = tbs
        .get_extension_value::<NameConstraints>(&ID_CE_NAME_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert!(critical);
    assert_eq!(2, nc.permitted_subtrees.as_ref().unwrap().len());
    let excluded = nc.excluded_subtrees.unwrap();
    assert_eq!(1, excluded.len());
    assert_eq!(Some(2), excluded[0].maximum);
}

#[test]
fn approval_gate() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;
    use der::Encode;

    let rule = NameConstraintsExt::init(&issuer(-1), &nc_config()).unwrap();
    let existing = NameConstraints {
        permitted_subtrees: None,
        excluded_subtrees: Some(alloc::vec![x509_cert::ext::pkix::constraints::name::GeneralSubtree {
            base: crate::config::general_names::parse_general_name("DNSName", "bad.example").unwrap(),
            minimum: 0,
            maximum: None,
        }]),
    };
    let mut tbs = draft("CN=Sub CA");
    tbs.set_extension_value(&ID_CE_NAME_CONSTRAINTS, false, &existing)
        .unwrap();
    let before = tbs.find_extension(&ID_CE_NAME_CONSTRAINTS).unwrap().to_der().unwrap();

    let mut approved = tbs.clone();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    rule.apply_cert(&req, &mut approved).unwrap();
    assert_eq!(
        before,
        approved.find_extension(&ID_CE_NAME_CONSTRAINTS).unwrap().to_der().unwrap()
    );

    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    let (_, nc) = tbs
        .get_extension_value::<NameConstraints>(&ID_CE_NAME_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert_eq!(2, nc.permitted_subtrees.unwrap().len());
}

#[test]
fn construction_failure_is_inert() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("permittedSubtrees0.base.generalNameChoice", "EDIPartyName")
        .with("permittedSubtrees0.base.generalNameValue", "x");
    let rule = NameConstraintsExt::init(&issuer(-1), &cfg).unwrap();
    assert!(rule.is_inert());
    let mut tbs = draft("CN=Sub CA");
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    assert!(!tbs.has_extension_set());

    let rule = NameConstraintsExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    assert!(rule.is_inert());
}
