//! CRL distribution points rule

use alloc::format;
use alloc::vec::Vec;

use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::DistributionPointName;
use x509_cert::ext::pkix::CrlDistributionPoints;
use x509_cert::TbsCertificate;

use crate::config::general_names::parse_general_name;
use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::ID_CE_CRL_DISTRIBUTION_POINTS;

fn read_point(config: &PolicyRuleConfig, index: i64) -> Result<Option<DistributionPoint>> {
    let scope = config.get_sub_scope(&format!("point{}", index));
    if !scope.get_bool("enable", true)? {
        return Ok(None);
    }
    let point_name = scope.get_string("pointName", "")?;
    if point_name.trim().is_empty() {
        return Ok(None);
    }
    let point_type = scope.get_string("pointType", "URIName")?;
    let gn = parse_general_name(&point_type, &point_name)?;
    Ok(Some(DistributionPoint {
        distribution_point: Some(DistributionPointName::FullName(alloc::vec![gn])),
        reasons: None,
        crl_issuer: None,
    }))
}

/// `CRLDistributionPointsExt` installs the configured full-name distribution points, replacing any
/// existing value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CRLDistributionPointsExt {
    critical: bool,
    value: CrlDistributionPoints,
}

impl ExtensionPolicyRule for CRLDistributionPointsExt {
    const IMPL_NAME: &'static str = "CRLDistributionPointsExt";
    const DESCRIPTION: &'static str = "Sets the CRL Distribution Points extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let mut points = Vec::new();
        for i in 0..config.get_slot_count("numPoints", 5)? {
            if let Some(p) = read_point(config, i)? {
                points.push(p);
            }
        }
        Ok(CRLDistributionPointsExt {
            critical,
            value: CrlDistributionPoints(points),
        })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if self.value.0.is_empty() {
            if draft.delete_extension(&ID_CE_CRL_DISTRIBUTION_POINTS) {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &ID_CE_CRL_DISTRIBUTION_POINTS,
                    ExtensionDecision::Deleted,
                );
            }
            return Ok(());
        }
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_CRL_DISTRIBUTION_POINTS,
            self.critical,
            &self.value,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        let mut params = alloc::vec![
            critical_param(false),
            PluginParam::integer("numPoints", 5, "Number of distribution point slots"),
        ];
        params.extend(indexed_params(5, |i| {
            alloc::vec![
                PluginParam::boolean(&format!("point{}.enable", i), true, "Enable this point"),
                PluginParam::string(
                    &format!("point{}.pointType", i),
                    "URIName",
                    "General name type of the point name"
                ),
                PluginParam::string(&format!("point{}.pointName", i), "", "Point name"),
            ]
        }));
        params
    }
}

#[test]
fn distribution_points() {
    use crate::util::test_support::*;
    use x509_cert::ext::pkix::name::GeneralName;

    let cfg = PolicyRuleConfig::new()
        .with("point0.pointName", "http://crl.example.com/ca.crl")
        .with("point1.pointType", "DirectoryName")
        .with("point1.pointName", "CN=CRL1,O=Example")
        .with("point2.enable", false)
        .with("point2.pointName", "http://disabled.example.com/ca.crl");
    let rule = CRLDistributionPointsExt::init(&issuer(-1), &cfg).unwrap();
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();

    let (critical, dps) = tbs
        .get_extension_value::<CrlDistributionPoints>(&ID_CE_CRL_DISTRIBUTION_POINTS)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(2, dps.0.len());
    match &dps.0[0].distribution_point {
        Some(DistributionPointName::FullName(gns)) => {
            assert!(matches!(gns[0], GeneralName::UniformResourceIdentifier(_)))
        }
        _ => panic!("expected a full name"),
    }

    let rule = CRLDistributionPointsExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();
    assert!(tbs.find_extension(&ID_CE_CRL_DISTRIBUTION_POINTS).is_none());
}
