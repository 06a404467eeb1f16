//! Authority Information Access and Subject Information Access rules

use alloc::format;
use alloc::vec::Vec;

use der::asn1::ObjectIdentifier;
use x509_cert::ext::pkix::{AccessDescription, AuthorityInfoAccessSyntax, SubjectInfoAccessSyntax};
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
use crate::util::oids::*;
use crate::util::policy_utilities::parse_oid;

const AIA_METHODS: &[(&str, ObjectIdentifier)] = &[
    ("ocsp", ID_AD_OCSP),
    ("caIssuers", ID_AD_CA_ISSUERS),
    ("renewal", ACCESS_METHOD_RENEWAL),
];

const SIA_METHODS: &[(&str, ObjectIdentifier)] = &[
    ("caRepository", ID_AD_CA_REPOSITORY),
    ("timeStamping", ID_AD_TIME_STAMPING),
];

/// Reads `ad<n>_method`, `ad<n>_location_type` and `ad<n>_location` items until the first blank method.
fn read_access_descriptions(
    config: &PolicyRuleConfig,
    aliases: &[(&str, ObjectIdentifier)],
) -> Result<Vec<AccessDescription>> {
    let num_ads = config.get_slot_count("numADs", 3)?;
    let mut ads = Vec::new();
    for i in 0..num_ads {
        let method_item = format!("ad{}_method", i);
        let method = config.get_string(&method_item, "")?;
        if method.trim().is_empty() {
            break;
        }
        let access_method = match aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(method.trim()))
        {
            Some((_, oid)) => *oid,
            None => parse_oid(&method_item, &method)?,
        };

        let location_type = config.get_string(&format!("ad{}_location_type", i), "URIName")?;
        let location = config.get_string(&format!("ad{}_location", i), "")?;
        if location.trim().is_empty() {
            return Err(Error::Misconfiguration(format!(
                "ad{}_location is required when ad{}_method is set",
                i, i
            )));
        }
        ads.push(AccessDescription {
            access_method,
            access_location: parse_general_name(&location_type, &location)?,
        });
    }
    Ok(ads)
}

fn access_params(method_choices: &'static [&'static str]) -> Vec<PluginParam> {
    let mut params = alloc::vec![
        critical_param(false),
        PluginParam::integer("numADs", 3, "Number of access description slots"),
    ];
    params.extend(indexed_params(3, |i| {
        alloc::vec![
            PluginParam::new(
                &format!("ad{}_method", i),
                ParamSyntax::Choice(method_choices),
                "",
                "Access method alias or OID; a blank method ends the list"
            ),
            PluginParam::string(
                &format!("ad{}_location_type", i),
                "URIName",
                "General name type of the access location"
            ),
            PluginParam::string(&format!("ad{}_location", i), "", "Access location"),
        ]
    }));
    params
}

/// Replaces the extension identified by `oid` with `value` or removes it when there are no entries.
fn rebuild<T: der::Encode>(
    rule: &str,
    draft: &mut TbsCertificate,
    oid: &ObjectIdentifier,
    critical: bool,
    empty: bool,
    value: &T,
) -> Result<()> {
    if empty {
        if draft.delete_extension(oid) {
            log_extension_decision(rule, oid, ExtensionDecision::Deleted);
        }
        return Ok(());
    }
    install_extension(rule, draft, oid, critical, value)
}

/// `AuthInfoAccessExt` installs configured access descriptions in the Authority Information Access
/// extension, replacing any existing value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthInfoAccessExt {
    critical: bool,
    value: AuthorityInfoAccessSyntax,
}

impl ExtensionPolicyRule for AuthInfoAccessExt {
    const IMPL_NAME: &'static str = "AuthInfoAccessExt";
    const DESCRIPTION: &'static str = "Sets the Authority Information Access extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        Ok(AuthInfoAccessExt {
            critical: config.get_bool("critical", false)?,
            value: AuthorityInfoAccessSyntax(read_access_descriptions(config, AIA_METHODS)?),
        })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        rebuild(
            Self::IMPL_NAME,
            draft,
            &ID_PE_AUTHORITY_INFO_ACCESS,
            self.critical,
            self.value.0.is_empty(),
            &self.value,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        access_params(&["ocsp", "caIssuers", "renewal"])
    }
}

/// `SubjectInfoAccessExt` installs configured access descriptions in the Subject Information Access
/// extension, replacing any existing value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectInfoAccessExt {
    critical: bool,
    value: SubjectInfoAccessSyntax,
}

impl ExtensionPolicyRule for SubjectInfoAccessExt {
    const IMPL_NAME: &'static str = "SubjectInfoAccessExt";
    const DESCRIPTION: &'static str = "Sets the Subject Information Access extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        Ok(SubjectInfoAccessExt {
            critical: config.get_bool("critical", false)?,
            value: SubjectInfoAccessSyntax(read_access_descriptions(config, SIA_METHODS)?),
        })
    }

    fn apply_cert(&self, _request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        rebuild(
            Self::IMPL_NAME,
            draft,
            &ID_PE_SUBJECT_INFO_ACCESS,
            self.critical,
            self.value.0.is_empty(),
            &self.value,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        access_params(&["caRepository", "timeStamping"])
    }
}

#[test]
fn aia_entries_end_at_blank_method() {
    use crate::util::test_support::*;
    use x509_cert::ext::pkix::name::GeneralName;

    let cfg = PolicyRuleConfig::new()
        .with("ad0_method", "ocsp")
        .with("ad0_location", "http://ocsp.example.com")
        .with("ad1_method", "1.3.6.1.5.5.7.48.2")
        .with("ad1_location_type", "URIName")
        .with("ad1_location", "http://certs.example.com/ca.crt")
        .with("ad2_method", "")
        .with("ad2_location", "http://ignored.example.com")
        .with("numADs", 5)
        .with("ad3_method", "renewal")
        .with("ad3_location", "http://renew.example.com");
    let rule = AuthInfoAccessExt::init(&issuer(-1), &cfg).unwrap();

    let mut tbs = draft("CN=Joe");
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    tbs.set_extension_value(
        &ID_PE_AUTHORITY_INFO_ACCESS,
        true,
        &AuthorityInfoAccessSyntax(alloc::vec![AccessDescription {
            access_method: ID_AD_OCSP,
            access_location: parse_general_name("URIName", "http://old.example.com").unwrap(),
        }]),
    )
    .unwrap();
    rule.apply_cert(&req, &mut tbs).unwrap();

    let (critical, aia) = tbs
        .get_extension_value::<AuthorityInfoAccessSyntax>(&ID_PE_AUTHORITY_INFO_ACCESS)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(2, aia.0.len());
    assert_eq!(ID_AD_OCSP, aia.0[0].access_method);
    assert_eq!(ID_AD_CA_ISSUERS, aia.0[1].access_method);
    match &aia.0[0].access_location {
        GeneralName::UniformResourceIdentifier(u) => {
            assert_eq!("http://ocsp.example.com", u.to_string())
        }
        _ => panic!("expected URI"),
    }
}

#[test]
fn sia_aliases_and_errors() {
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("ad0_method", "caRepository")
        .with("ad0_location", "http://repo.example.com");
    let rule = SubjectInfoAccessExt::init(&issuer(-1), &cfg).unwrap();
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    let (_, sia) = tbs
        .get_extension_value::<SubjectInfoAccessSyntax>(&ID_PE_SUBJECT_INFO_ACCESS)
        .unwrap()
        .unwrap();
    assert_eq!(ID_AD_CA_REPOSITORY, sia.0[0].access_method);

    // AIA aliases are not SIA aliases
    let cfg = PolicyRuleConfig::new()
        .with("ad0_method", "ocsp")
        .with("ad0_location", "http://ocsp.example.com");
    assert!(SubjectInfoAccessExt::init(&issuer(-1), &cfg).is_err());

    let cfg = PolicyRuleConfig::new().with("ad0_method", "ocsp");
    assert!(AuthInfoAccessExt::init(&issuer(-1), &cfg).is_err());

    // nothing configured removes any existing value
    let rule = SubjectInfoAccessExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    rule.apply_cert(&CertificationRequest::default(), &mut tbs)
        .unwrap();
    assert!(tbs.find_extension(&ID_PE_SUBJECT_INFO_ACCESS).is_none());
}
