//! Certificate renewal window rule

use alloc::vec::Vec;

use x509_cert::TbsCertificate;

use crate::asn1::certificate_renewal_window::CertificateRenewalWindow;
use crate::config::policy_config::PolicyRuleConfig;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::policy::plugin_info::*;
use crate::policy::policy_rule::*;
use crate::request::certification_request::CertificationRequest;
use crate::util::error::*;
use crate::util::oids::CERTIFICATE_RENEWAL_WINDOW;
use crate::util::policy_utilities::{millis_to_generalized_time, parse_offset_millis};

/// `CertificateRenewalWindowExt` installs a renewal window relative to the request's time of
/// interest. The begin offset defaults to zero, i.e., renewal may begin immediately. The end bound
/// is omitted unless an end offset is configured.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateRenewalWindowExt {
    critical: bool,
    begin_offset: u64,
    end_offset: Option<u64>,
}

impl CertificateRenewalWindowExt {
    /// Builds the window for `now`, expressed in milliseconds since the Unix epoch.
    pub fn window_at(&self, now: u64) -> Result<CertificateRenewalWindow> {
        let begin_time = millis_to_generalized_time(now.saturating_add(self.begin_offset))?;
        let end_time = match self.end_offset {
            Some(end) => Some(millis_to_generalized_time(now.saturating_add(end))?),
            None => None,
        };
        Ok(CertificateRenewalWindow {
            begin_time,
            end_time,
        })
    }
}

impl ExtensionPolicyRule for CertificateRenewalWindowExt {
    const IMPL_NAME: &'static str = "CertificateRenewalWindowExt";
    const DESCRIPTION: &'static str = "Sets the Certificate Renewal Window extension";

    fn init(_issuer: &IssuingAuthority, config: &PolicyRuleConfig) -> Result<Self> {
        let critical = config.get_bool("critical", false)?;
        let begin_offset = parse_offset_millis(&config.get_string("beginTime", "0")?)?.unwrap_or(0);
        let end_offset = parse_offset_millis(&config.get_string("endTime", "")?)?;
        if let Some(end) = end_offset {
            if end < begin_offset {
                return Err(Error::Misconfiguration(
                    "endTime must not precede beginTime".into(),
                ));
            }
        }
        Ok(CertificateRenewalWindowExt {
            critical,
            begin_offset,
            end_offset,
        })
    }

    fn apply_cert(&self, request: &CertificationRequest, draft: &mut TbsCertificate) -> Result<()> {
        let now = request.get_time_of_interest().saturating_mul(1000);
        let window = self.window_at(now)?;
        install_extension(
            Self::IMPL_NAME,
            draft,
            &CERTIFICATE_RENEWAL_WINDOW,
            self.critical,
            &window,
        )
    }

    fn plugin_params() -> Vec<PluginParam> {
        alloc::vec![
            critical_param(false),
            PluginParam::string(
                "beginTime",
                "0",
                "Offset from now at which renewal may begin: a number of milliseconds or a number followed by s, m, h, D or M"
            ),
            PluginParam::string(
                "endTime",
                "",
                "Offset from now at which the renewal window closes; blank for no end"
            ),
        ]
    }
}

#[test]
fn five_day_begin_without_end() {
    use crate::policy::draft_extensions::DraftExtensions;
    use crate::util::test_support::*;

    let rule = CertificateRenewalWindowExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("beginTime", "5D"),
    )
    .unwrap();
    let mut tbs = draft("CN=Joe");
    rule.apply_cert(&request("CN=Joe"), &mut tbs).unwrap();

    let (critical, window) = tbs
        .get_extension_value::<CertificateRenewalWindow>(&CERTIFICATE_RENEWAL_WINDOW)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(
        (TOI * 1000 + 5 * 86_400_000) / 1000,
        window.begin_time.to_unix_duration().as_secs()
    );
    assert_eq!(None, window.end_time);
}

#[test]
fn begin_and_end() {
    use crate::util::test_support::*;

    let rule = CertificateRenewalWindowExt::init(&issuer(-1), &PolicyRuleConfig::new()).unwrap();
    let w = rule.window_at(TOI * 1000).unwrap();
    assert_eq!(TOI, w.begin_time.to_unix_duration().as_secs());

    let rule = CertificateRenewalWindowExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new()
            .with("beginTime", "1h")
            .with("endTime", "2M"),
    )
    .unwrap();
    let w = rule.window_at(TOI * 1000).unwrap();
    assert_eq!(TOI + 3600, w.begin_time.to_unix_duration().as_secs());
    assert_eq!(
        TOI + 2 * 30 * 3600,
        w.end_time.unwrap().to_unix_duration().as_secs()
    );

    assert!(CertificateRenewalWindowExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new()
            .with("beginTime", "2D")
            .with("endTime", "1D"),
    )
    .is_err());
    assert!(CertificateRenewalWindowExt::init(
        &issuer(-1),
        &PolicyRuleConfig::new().with("beginTime", "soon"),
    )
    .is_err());
}
