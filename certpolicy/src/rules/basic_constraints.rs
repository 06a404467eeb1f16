//! Basic Constraints rule

use alloc::format;
use alloc::vec::Vec;

use x509_cert::ext::pkix::BasicConstraints;
use x509_cert::TbsCertificate;

use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::draft_extensions::DraftExtensions;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::approval::agent_approved;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::logging::*;
use crate::util::oids::ID_CE_BASIC_CONSTRAINTS;

/// HTTP parameter a requester may use to ask for a specific path length
pub const HTTP_BASIC_CONSTRAINTS_PATH_LEN: &str = "basicConstraintsPathLen";

/// `BasicConstraintsExt` sets the cA flag and path length constraint.
///
/// For CA certificates, path lengths are bounded by the issuer's own constraint (issuer path length
/// minus one) and by the configured `maxPathLen`. A path length of -1 means no constraint.
///
/// A value already present in a draft is checked against the issuer bound and rejected if it
/// exceeds it. If it passes and the request was approved by an agent it is kept as is, otherwise its
/// path length is clamped to the configured maximum. A freshly requested path length that exceeds
/// either bound is rejected rather than clamped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicConstraintsExt {
    critical: bool,
    is_ca: bool,
    max_path_len: i32,
    issuer_path_len: i32,
}

/// Returns true if `path_len` is permitted beneath an issuer whose path length is `issuer_path_len`.
fn within_issuer_bound(issuer_path_len: i32, path_len: i32) -> bool {
    if issuer_path_len > 0 {
        (0..issuer_path_len).contains(&path_len)
    } else {
        path_len >= -1
    }
}

/// Returns true if `path_len` is permitted by a configured maximum of `max_path_len`.
fn within_configured_max(max_path_len: i32, path_len: i32) -> bool {
    if max_path_len >= 0 {
        (0..=max_path_len).contains(&path_len)
    } else {
        path_len >= -1
    }
}

fn to_constraint(path_len: i32) -> Result<Option<u8>> {
    if path_len < 0 {
        return Ok(None);
    }
    match u8::try_from(path_len) {
        Ok(p) => Ok(Some(p)),
        Err(_) => Err(Error::Rejected(RejectionReason::PathLengthExceeded)),
    }
}

impl BasicConstraintsExt {
    /// Returns the maximum path length in effect after reconciling the configuration with the issuer
    pub fn max_path_len(&self) -> i32 {
        self.max_path_len
    }

    fn install(&self, draft: &mut TbsCertificate, ca: bool, path_len: i32) -> Result<()> {
        let bc = BasicConstraints {
            ca,
            path_len_constraint: if ca { to_constraint(path_len)? } else { None },
        };
        install_extension(
            Self::IMPL_NAME,
            draft,
            &ID_CE_BASIC_CONSTRAINTS,
            self.critical,
            &bc,
        )
    }

    fn requested_path_len(&self, request: &CertificationRequest) -> Result<i32> {
        match request.get_http_param(HTTP_BASIC_CONSTRAINTS_PATH_LEN) {
            Some(s) if !s.trim().is_empty() => match s.trim().parse::<i32>() {
                Ok(p) => Ok(p),
                Err(_) => Err(Error::Rejected(RejectionReason::InvalidRequestParameter)),
            },
            _ => Ok(self.max_path_len),
        }
    }
}

impl ExtensionPolicyRule for BasicConstraintsExt {
    const IMPL_NAME: &'static str = "BasicConstraintsExt";
    const DESCRIPTION: &'static str = "Sets the Basic Constraints extension, including the cA flag and path length constraint";

    fn init(issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", true)?;
        let is_ca = config.get_bool("isCA", true)?;
        let configured = config.get_integer("maxPathLen", -1)?;
        if !(-1..=255).contains(&configured) {
            return Err(Error::Misconfiguration(format!(
                "maxPathLen must be between -1 and 255: {}",
                configured
            )));
        }
        let mut max_path_len = configured as i32;
        let issuer_path_len = issuer.path_len;
        if issuer_path_len > 0 && (max_path_len == -1 || max_path_len >= issuer_path_len) {
            max_path_len = issuer_path_len - 1;
        }
        Ok(BasicConstraintsExt {
            critical,
            is_ca,
            max_path_len,
            issuer_path_len,
        })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        if !self.is_ca {
            return self.install(draft, false, -1);
        }

        if self.issuer_path_len == 0 {
            return Err(Error::Rejected(RejectionReason::CaNotPermitted));
        }

        if let Some((_, existing)) =
            draft.get_extension_value::<BasicConstraints>(&ID_CE_BASIC_CONSTRAINTS)?
        {
            let mut path_len = match existing.path_len_constraint {
                Some(p) => p as i32,
                None => -1,
            };
            if !within_issuer_bound(self.issuer_path_len, path_len) {
                return Err(Error::Rejected(RejectionReason::PathLengthExceeded));
            }
            if agent_approved(request) {
                log_extension_decision(
                    Self::IMPL_NAME,
                    &ID_CE_BASIC_CONSTRAINTS,
                    ExtensionDecision::Kept,
                );
                return Ok(());
            }
            if self.max_path_len >= 0 && (path_len == -1 || path_len > self.max_path_len) {
                path_len = self.max_path_len;
            }
            return self.install(draft, true, path_len);
        }

        let path_len = self.requested_path_len(request)?;
        if !within_issuer_bound(self.issuer_path_len, path_len)
            || !within_configured_max(self.max_path_len, path_len)
        {
            return Err(Error::Rejected(RejectionReason::PathLengthExceeded));
        }
        self.install(draft, true, path_len)
    }

    fn plugin_params() -> Vec<PluginParam> {
        alloc::vec![
            critical_param(true),
            PluginParam::boolean("isCA", true, "Indicates whether the certificate is a CA"),
            PluginParam::integer(
                "maxPathLen",
                -1,
                "Maximum path length for CA certificates, -1 for no constraint"
            ),
        ]
    }
}

#[cfg(test)]
fn bc_of(req: &CertificationRequest) -> (bool, BasicConstraints) {
    crate::util::test_support::first(req)
        .get_extension_value::<BasicConstraints>(&ID_CE_BASIC_CONSTRAINTS)
        .unwrap()
        .unwrap()
}

#[test]
fn fresh_ca_extension() {
    use crate::util::test_support::*;
    use x509_cert::certificate::Version;

    let cfg = PolicyRuleConfig::new()
        .with("isCA", true)
        .with("maxPathLen", 2)
        .with("critical", true);
    let rule = PolicyRule::init("bc", BasicConstraintsExt::IMPL_NAME, true, &issuer(5), &cfg)
        .unwrap();
    let mut req = request("CN=Sub CA");
    assert_eq!(PolicyOutcome::Accepted, rule.apply(&mut req));
    let (critical, bc) = bc_of(&req);
    assert!(critical);
    assert!(bc.ca);
    assert_eq!(Some(2), bc.path_len_constraint);
    assert_eq!(Version::V3, first(&req).version);
}

#[test]
fn existing_value_clamped() {
    use crate::util::test_support::*;

    let cfg = PolicyRuleConfig::new()
        .with("maxPathLen", 1)
        .with("critical", false);
    let rule = BasicConstraintsExt::init(&issuer(-1), &cfg).unwrap();
    let mut tbs = draft("CN=Sub CA");
    tbs.set_extension_value(
        &ID_CE_BASIC_CONSTRAINTS,
        true,
        &BasicConstraints {
            ca: true,
            path_len_constraint: Some(3),
        },
    )
    .unwrap();
    let req = CertificationRequest::new(tbs.clone());
    rule.apply_cert(&req, &mut tbs).unwrap();
    let (critical, bc) = tbs
        .get_extension_value::<BasicConstraints>(&ID_CE_BASIC_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert!(bc.ca);
    assert_eq!(Some(1), bc.path_len_constraint);
}

#[test]
fn clamp_and_reject_diverge() {
    use crate::util::test_support::*;

    // the same numbers are clamped when already present in a draft and rejected when requested
    let cfg = PolicyRuleConfig::new().with("maxPathLen", 1);
    let rule = BasicConstraintsExt::init(&issuer(-1), &cfg).unwrap();

    let mut existing = draft("CN=Sub CA");
    existing
        .set_extension_value(
            &ID_CE_BASIC_CONSTRAINTS,
            true,
            &BasicConstraints {
                ca: true,
                path_len_constraint: Some(3),
            },
        )
        .unwrap();
    let req = CertificationRequest::new(existing.clone());
    assert!(rule.apply_cert(&req, &mut existing).is_ok());

    let mut fresh = draft("CN=Sub CA");
    let mut req = CertificationRequest::new(fresh.clone());
    req.set_http_param(HTTP_BASIC_CONSTRAINTS_PATH_LEN, "3");
    assert_eq!(
        Err(Error::Rejected(RejectionReason::PathLengthExceeded)),
        rule.apply_cert(&req, &mut fresh)
    );
}

#[test]
fn issuer_bounds() {
    use crate::util::test_support::*;

    // issuer path length zero rejects every CA request
    let rule = BasicConstraintsExt::init(&issuer(0), &PolicyRuleConfig::new()).unwrap();
    let mut req = request("CN=Sub CA");
    assert_eq!(
        PolicyOutcome::Rejected,
        PolicyRule::init("bc", "BasicConstraintsExt", true, &issuer(0), &PolicyRuleConfig::new())
            .unwrap()
            .apply(&mut req)
    );
    let mut tbs = draft("CN=Sub CA");
    assert_eq!(
        Err(Error::Rejected(RejectionReason::CaNotPermitted)),
        rule.apply_cert(&CertificationRequest::default(), &mut tbs)
    );

    // unbounded configuration beneath a bounded issuer is reduced to issuer minus one
    let rule = BasicConstraintsExt::init(&issuer(3), &PolicyRuleConfig::new()).unwrap();
    assert_eq!(2, rule.max_path_len());
    let rule = BasicConstraintsExt::init(
        &issuer(3),
        &PolicyRuleConfig::new().with("maxPathLen", 7),
    )
    .unwrap();
    assert_eq!(2, rule.max_path_len());
    let rule = BasicConstraintsExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    assert_eq!(-1, rule.max_path_len());

    // an existing value over the issuer bound is rejected even when approved
    let rule = BasicConstraintsExt::init(&issuer(2), &PolicyRuleConfig::new()).unwrap();
    let mut tbs = draft("CN=Sub CA");
    tbs.set_extension_value(
        &ID_CE_BASIC_CONSTRAINTS,
        true,
        &BasicConstraints {
            ca: true,
            path_len_constraint: Some(5),
        },
    )
    .unwrap();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    assert_eq!(
        Err(Error::Rejected(RejectionReason::PathLengthExceeded)),
        rule.apply_cert(&req, &mut tbs)
    );
}

#[test]
fn approved_existing_value_kept() {
    use crate::util::test_support::*;
    use der::Encode;

    let rule = BasicConstraintsExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("maxPathLen", 1),
    )
    .unwrap();
    let mut tbs = draft("CN=Sub CA");
    tbs.set_extension_value(
        &ID_CE_BASIC_CONSTRAINTS,
        false,
        &BasicConstraints {
            ca: true,
            path_len_constraint: Some(4),
        },
    )
    .unwrap();
    let before = tbs.to_der().unwrap();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    rule.apply_cert(&req, &mut tbs).unwrap();
    assert_eq!(before, tbs.to_der().unwrap());
}

#[test]
fn configured_max_property() {
    use crate::util::test_support::*;

    for m in -1..=4 {
        let rule = BasicConstraintsExt::init(
            &issuer(-1),
            &PolicyRuleConfig::new().with("maxPathLen", m as i64),
        )
        .unwrap();
        for p in -3..=6 {
            let mut tbs = draft("CN=Sub CA");
            let mut req = CertificationRequest::new(tbs.clone());
            req.set_http_param(HTTP_BASIC_CONSTRAINTS_PATH_LEN, &alloc::format!("{}", p));
            let accepted = rule.apply_cert(&req, &mut tbs).is_ok();
            let expected = if m >= 0 { 0 <= p && p <= m } else { p >= -1 };
            assert_eq!(expected, accepted, "maxPathLen {} requested {}", m, p);
        }
    }
}

#[test]
fn end_entity_overwritten() {
    use crate::util::test_support::*;

    let rule = BasicConstraintsExt::init(
        &issuer(0),
        &PolicyRuleConfig::new().with("isCA", false),
    )
    .unwrap();
    let mut tbs = draft("CN=Joe");
    tbs.set_extension_value(
        &ID_CE_BASIC_CONSTRAINTS,
        true,
        &BasicConstraints {
            ca: true,
            path_len_constraint: Some(1),
        },
    )
    .unwrap();
    let mut req = CertificationRequest::new(tbs.clone());
    approve(&mut req);
    rule.apply_cert(&req, &mut tbs).unwrap();
    let (_, bc) = tbs
        .get_extension_value::<BasicConstraints>(&ID_CE_BASIC_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert!(!bc.ca);
    assert_eq!(None, bc.path_len_constraint);
}

#[test]
fn misconfigured_max() {
    use crate::util::test_support::*;
    for bad in [-2i64, 256] {
        assert!(matches!(
            BasicConstraintsExt::init(&issuer(-1), &PolicyRuleConfig::new().with("maxPathLen", bad)),
            Err(Error::Misconfiguration(_))
        ));
    }
    assert!(BasicConstraintsExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("maxPathLen", "two")
    )
    .is_err());
}
