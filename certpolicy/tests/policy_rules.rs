#![cfg(feature = "std")]

use std::str::FromStr;

use certpolicy::*;
use der::asn1::{BitString, OctetString};
use der::{Decode, Encode};
use hex_literal::hex;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::certificate::Version;
use x509_cert::ext::pkix::constraints::name::{GeneralSubtree, NameConstraints};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, KeyUsages, PolicyConstraints,
    SubjectKeyIdentifier,
};
use x509_cert::name::Name;
use x509_cert::{Certificate, TbsCertificate};

const TOI: u64 = 1_700_000_000;
const SPKI: [u8; 24] = hex!("3016300d06092a864886f70d010101050003050001020304");
const CA_SKI: [u8; 4] = hex!("01020304");

fn make_draft(subject: &str) -> TbsCertificate {
    let issuer = Name::from_str("CN=Test CA,O=Example").unwrap();
    let subject = Name::from_str(subject).unwrap();
    let spki = SubjectPublicKeyInfoOwned::from_der(&SPKI).unwrap();
    new_draft(&issuer, subject, spki, TOI, TOI + 86_400 * 365).unwrap()
}

fn make_request(drafts: Vec<TbsCertificate>) -> CertificationRequest {
    let mut req = CertificationRequest::default();
    req.cert_infos = Some(drafts.into_iter().map(Some).collect());
    req.set_time_of_interest(TOI);
    req
}

fn approve(req: &mut CertificationRequest) {
    req.set_agent_approvals(vec!["agent1".to_string()]);
}

fn ca_cert(path_len: Option<u8>) -> Certificate {
    let mut tbs = make_draft("CN=Test CA,O=Example");
    tbs.set_extension_value(
        &ID_CE_BASIC_CONSTRAINTS,
        true,
        &BasicConstraints {
            ca: true,
            path_len_constraint: path_len,
        },
    )
    .unwrap();
    tbs.set_extension_value(
        &ID_CE_SUBJECT_KEY_IDENTIFIER,
        false,
        &SubjectKeyIdentifier(OctetString::new(CA_SKI.to_vec()).unwrap()),
    )
    .unwrap();
    Certificate {
        tbs_certificate: tbs,
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            parameters: None,
        },
        signature: BitString::from_bytes(&[0u8; 8]).unwrap(),
    }
}

fn chain_from_json(json: &str, issuer: &IssuingAuthority) -> PolicyChain {
    let settings = parse_policy_settings(json.as_bytes()).unwrap();
    PolicyChain::from_settings(&settings, issuer).unwrap()
}

fn rule(implementation: &str, issuer: &IssuingAuthority, config: PolicyRuleConfig) -> PolicyRule {
    PolicyRule::init(implementation, implementation, true, issuer, &config).unwrap()
}

fn first(req: &CertificationRequest) -> &TbsCertificate {
    req.first_draft().unwrap()
}

#[test]
fn fresh_basic_constraints_end_to_end() {
    let chain = chain_from_json(
        r#"{"rules": [{"name": "bc", "implementation": "BasicConstraintsExt",
            "params": {"isCA": true, "maxPathLen": 2, "critical": true}}]}"#,
        &IssuingAuthority::with_path_len(5),
    );
    let mut req = make_request(vec![make_draft("CN=Sub CA")]);
    assert!(!first(&req).has_extension_set());

    assert_eq!(PolicyOutcome::Accepted, chain.apply(&mut req));
    let tbs = first(&req);
    assert_eq!(Version::V3, tbs.version);
    let (critical, bc) = tbs
        .get_extension_value::<BasicConstraints>(&ID_CE_BASIC_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert!(critical);
    assert!(bc.ca);
    assert_eq!(Some(2), bc.path_len_constraint);
}

#[test]
fn existing_basic_constraints_clamped_end_to_end() {
    let chain = chain_from_json(
        r#"{"rules": [{"name": "bc", "implementation": "BasicConstraintsExt",
            "params": {"maxPathLen": 1, "critical": true}}]}"#,
        &IssuingAuthority::default(),
    );
    let mut tbs = make_draft("CN=Sub CA");
    tbs.set_extension_value(
        &ID_CE_BASIC_CONSTRAINTS,
        false,
        &BasicConstraints {
            ca: true,
            path_len_constraint: Some(3),
        },
    )
    .unwrap();
    let mut req = make_request(vec![tbs]);

    assert_eq!(PolicyOutcome::Accepted, chain.apply(&mut req));
    let (critical, bc) = first(&req)
        .get_extension_value::<BasicConstraints>(&ID_CE_BASIC_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert!(critical);
    assert!(bc.ca);
    assert_eq!(Some(1), bc.path_len_constraint);
}

#[test]
fn zero_path_len_issuer_rejects_ca_requests() {
    let issuer = IssuingAuthority::try_from(&ca_cert(Some(0))).unwrap();
    assert_eq!(0, issuer.path_len);

    let bc = rule("BasicConstraintsExt", &issuer, PolicyRuleConfig::new());
    let mut req = make_request(vec![make_draft("CN=Sub CA")]);
    assert_eq!(PolicyOutcome::Rejected, bc.apply(&mut req));
    assert_eq!(
        Some(RejectionReason::CaNotPermitted.to_string()),
        req.get_error()
    );

    for bit in ["keyCertsign", "crlSign"] {
        let ku = rule(
            "KeyUsageExt",
            &issuer,
            PolicyRuleConfig::new()
                .with("digitalSignature", "true")
                .with(bit, "true"),
        );
        let mut req = make_request(vec![make_draft("CN=Joe")]);
        assert_eq!(PolicyOutcome::Rejected, ku.apply(&mut req));
        assert!(first(&req).find_extension(&ID_CE_KEY_USAGE).is_none());
    }
}

#[test]
fn key_usage_bits_survive_encoding() {
    let issuer = IssuingAuthority::default();
    let ku = rule(
        "KeyUsageExt",
        &issuer,
        PolicyRuleConfig::new()
            .with("keyEncipherment", "false")
            .with("keyAgreement", "true"),
    );
    let mut req = make_request(vec![make_draft("CN=Joe")]);
    req.set_http_param("digital_signature", "true");
    req.set_http_param("key_encipherment", "true");
    req.set_http_param("non_repudiation", "false");
    assert_eq!(PolicyOutcome::Accepted, ku.apply(&mut req));
    let (_, value) = first(&req)
        .get_extension_value::<KeyUsage>(&ID_CE_KEY_USAGE)
        .unwrap()
        .unwrap();
    assert_eq!(
        KeyUsages::DigitalSignature | KeyUsages::KeyAgreement,
        value.0
    );

    let none = rule("KeyUsageExt", &issuer, PolicyRuleConfig::new());
    let mut req = make_request(vec![make_draft("CN=Joe")]);
    assert_eq!(PolicyOutcome::Rejected, none.apply(&mut req));
    assert_eq!(
        Some(RejectionReason::EmptyKeyUsage.to_string()),
        req.get_error()
    );
}

/// Seeds a draft with the given extension value, applies the rule with and without agent approval
/// and returns the resulting extension bytes for each.
fn approved_and_unapproved(
    rule: &PolicyRule,
    oid: &der::asn1::ObjectIdentifier,
    seeded: &[u8],
) -> (Vec<u8>, Option<Vec<u8>>) {
    let mut tbs = make_draft("CN=Sub CA");
    tbs.set_extension(x509_cert::ext::Extension {
        extn_id: *oid,
        critical: false,
        extn_value: OctetString::new(seeded.to_vec()).unwrap(),
    });

    let mut approved = make_request(vec![tbs.clone()]);
    approve(&mut approved);
    assert_eq!(PolicyOutcome::Accepted, rule.apply(&mut approved));
    let kept = first(&approved)
        .find_extension(oid)
        .unwrap()
        .to_der()
        .unwrap();

    let mut unapproved = make_request(vec![tbs]);
    assert_eq!(PolicyOutcome::Accepted, rule.apply(&mut unapproved));
    let replaced = first(&unapproved)
        .find_extension(oid)
        .map(|e| e.extn_value.as_bytes().to_vec());
    (kept, replaced)
}

#[test]
fn approved_values_are_kept_verbatim() {
    let issuer = IssuingAuthority::try_from(&ca_cert(None)).unwrap();

    // authority key identifier
    let seeded = AuthorityKeyIdentifier {
        key_identifier: Some(OctetString::new(hex!("AABBCCDD").to_vec()).unwrap()),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    }
    .to_der()
    .unwrap();
    let aki = rule("AuthorityKeyIdentifierExt", &issuer, PolicyRuleConfig::new());
    let (kept, replaced) = approved_and_unapproved(&aki, &ID_CE_AUTHORITY_KEY_IDENTIFIER, &seeded);
    let expected_kept = x509_cert::ext::Extension {
        extn_id: ID_CE_AUTHORITY_KEY_IDENTIFIER,
        critical: false,
        extn_value: OctetString::new(seeded.clone()).unwrap(),
    }
    .to_der()
    .unwrap();
    assert_eq!(expected_kept, kept);
    let replaced = AuthorityKeyIdentifier::from_der(&replaced.unwrap()).unwrap();
    assert_eq!(
        CA_SKI.as_slice(),
        replaced.key_identifier.unwrap().as_bytes()
    );

    // name constraints
    let seeded = NameConstraints {
        permitted_subtrees: Some(vec![GeneralSubtree {
            base: GeneralName::DnsName(der::asn1::Ia5String::new("old.example.com").unwrap()),
            minimum: 0,
            maximum: None,
        }]),
        excluded_subtrees: None,
    }
    .to_der()
    .unwrap();
    let nc = rule(
        "NameConstraintsExt",
        &issuer,
        PolicyRuleConfig::new()
            .with("permittedSubtrees0.base.generalNameChoice", "DNSName")
            .with("permittedSubtrees0.base.generalNameValue", "new.example.com"),
    );
    let (kept, replaced) = approved_and_unapproved(&nc, &ID_CE_NAME_CONSTRAINTS, &seeded);
    assert!(kept.ends_with(&seeded));
    let replaced = NameConstraints::from_der(&replaced.unwrap()).unwrap();
    match &replaced.permitted_subtrees.unwrap()[0].base {
        GeneralName::DnsName(d) => assert_eq!("new.example.com", d.to_string()),
        _ => panic!("expected dNSName"),
    }

    // policy constraints
    let seeded = PolicyConstraints {
        require_explicit_policy: Some(5),
        inhibit_policy_mapping: None,
    }
    .to_der()
    .unwrap();
    let pc = rule(
        "PolicyConstraintsExt",
        &issuer,
        PolicyRuleConfig::new().with("reqExplicitPolicy", 0),
    );
    let (kept, replaced) = approved_and_unapproved(&pc, &ID_CE_POLICY_CONSTRAINTS, &seeded);
    assert!(kept.ends_with(&seeded));
    let replaced = PolicyConstraints::from_der(&replaced.unwrap()).unwrap();
    assert_eq!(Some(0), replaced.require_explicit_policy);
    assert_eq!(None, replaced.inhibit_policy_mapping);
}

#[test]
fn ocsp_responders_never_carry_netscape_cert_type() {
    let ns = rule("NSCertTypeExt", &IssuingAuthority::default(), PolicyRuleConfig::new());
    for approved in [false, true] {
        let mut tbs = make_draft("CN=OCSP Responder");
        tbs.set_extension_value(
            &NETSCAPE_CERT_TYPE,
            false,
            &NsCertType(NsCertTypes::SslClient | NsCertTypes::Email),
        )
        .unwrap();
        let mut req = make_request(vec![tbs, make_draft("CN=OCSP Responder")]);
        req.set_cert_type("ocspResponder".to_string());
        if approved {
            approve(&mut req);
        }
        assert_eq!(PolicyOutcome::Accepted, ns.apply(&mut req));
        for tbs in req.cert_infos.as_ref().unwrap().iter().flatten() {
            assert!(tbs.find_extension(&NETSCAPE_CERT_TYPE).is_none());
        }
    }
}

#[test]
fn renewal_window_begins_five_days_out() {
    let rw = rule(
        "CertificateRenewalWindowExt",
        &IssuingAuthority::default(),
        PolicyRuleConfig::new().with("beginTime", "5D"),
    );
    let mut req = make_request(vec![make_draft("CN=Joe")]);
    assert_eq!(PolicyOutcome::Accepted, rw.apply(&mut req));
    let (_, window) = first(&req)
        .get_extension_value::<CertificateRenewalWindow>(&CERTIFICATE_RENEWAL_WINDOW)
        .unwrap()
        .unwrap();
    let start_millis = window.begin_time.to_unix_duration().as_millis() as u64;
    assert_eq!(TOI * 1000 + 5 * 86_400_000, start_millis);
    assert!(window.end_time.is_none());
}

#[test]
fn no_op_rules_leave_drafts_alone() {
    let issuer = IssuingAuthority::default();
    for implementation in ["PresenceServerExt", "GenericASN1Ext"] {
        let r = rule(implementation, &issuer, PolicyRuleConfig::new());
        let mut tbs = make_draft("CN=Joe");
        tbs.set_extension_value(&ID_PKIX_OCSP_NOCHECK, false, &der::asn1::Null)
            .unwrap();
        let before = tbs.clone();
        let mut req = make_request(vec![tbs]);
        assert_eq!(PolicyOutcome::Accepted, r.apply(&mut req));
        assert_eq!(&before, first(&req));
    }
}

#[test]
fn every_draft_is_evaluated() {
    let issuer = IssuingAuthority::try_from(&ca_cert(Some(3))).unwrap();
    let chain = chain_from_json(
        r#"{"rules": [
            {"name": "ski", "implementation": "SubjectKeyIdentifierExt"},
            {"name": "aki", "implementation": "AuthorityKeyIdentifierExt"},
            {"name": "eku", "implementation": "ExtendedKeyUsageExt",
             "params": {"id0": "1.3.6.1.5.5.7.3.1", "id1": "ocspsigning"}}
        ]}"#,
        &issuer,
    );
    let mut req = make_request(vec![make_draft("CN=a"), make_draft("CN=b")]);
    assert_eq!(PolicyOutcome::Accepted, chain.apply(&mut req));
    for tbs in req.cert_infos.as_ref().unwrap().iter().flatten() {
        assert_eq!(
            vec![
                ID_CE_SUBJECT_KEY_IDENTIFIER,
                ID_CE_AUTHORITY_KEY_IDENTIFIER,
                ID_CE_EXT_KEY_USAGE
            ],
            extension_oids(tbs)
        );
    }
}

#[test]
fn policy_settings_from_file() {
    use std::io::Write;

    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(
        br#"{"rules": [
            {"name": "inhibit", "implementation": "InhibitAnyPolicyExt", "params": {"skipCerts": 1}},
            {"name": "cp", "implementation": "CertificatePoliciesExt",
             "params": {"certPolicy0": {"policyId": "2.16.840.1.101.3.2.1.48.1"}}}
        ]}"#,
    )
    .unwrap();
    let settings = read_policy_settings(f.path().to_str().unwrap()).unwrap();
    let chain = PolicyChain::from_settings(&settings, &IssuingAuthority::default()).unwrap();
    assert_eq!("inhibit", chain.rules()[0].name);
    assert_eq!(
        vec!["critical=true".to_string(), "skipCerts=1".to_string()],
        chain.rules()[0].instance_params()
    );

    let mut req = make_request(vec![make_draft("CN=Sub CA")]);
    assert_eq!(PolicyOutcome::Accepted, chain.apply(&mut req));
    assert!(first(&req)
        .find_extension(&ID_CE_CERTIFICATE_POLICIES)
        .is_some());

    assert_eq!(
        Err(Error::NotFound),
        read_policy_settings("/nonexistent/policy.json")
    );
}
