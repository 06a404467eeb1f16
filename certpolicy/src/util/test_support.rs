//! Fixtures shared by unit tests

use core::str::FromStr;

use der::asn1::{BitString, OctetString};
use der::Decode;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::ext::pkix::{BasicConstraints, SubjectKeyIdentifier};
use x509_cert::name::Name;
use x509_cert::{Certificate, TbsCertificate};

use crate::policy::draft_extensions::*;
use crate::policy::issuing_authority::IssuingAuthority;
use crate::request::certification_request::CertificationRequest;
use crate::util::oids::*;

pub(crate) const SPKI: [u8; 24] = hex_literal::hex!("3016300d06092a864886f70d010101050003050001020304");

pub(crate) const TOI: u64 = 1_700_000_000;

pub(crate) fn spki() -> SubjectPublicKeyInfoOwned {
    SubjectPublicKeyInfoOwned::from_der(&SPKI).unwrap()
}

pub(crate) fn draft(subject: &str) -> TbsCertificate {
    let issuer = Name::from_str("CN=Test CA,O=Example").unwrap();
    let subject = if subject.is_empty() {
        Name::default()
    } else {
        Name::from_str(subject).unwrap()
    };
    new_draft(&issuer, subject, spki(), TOI, TOI + 86_400 * 365).unwrap()
}

pub(crate) fn request(subject: &str) -> CertificationRequest {
    let mut req = CertificationRequest::new(draft(subject));
    req.set_time_of_interest(TOI);
    req
}

pub(crate) fn approve(req: &mut CertificationRequest) {
    use alloc::string::ToString;
    req.set_agent_approvals(alloc::vec!["agent1".to_string()]);
}

pub(crate) fn issuer(path_len: i32) -> IssuingAuthority {
    IssuingAuthority::with_path_len(path_len)
}

pub(crate) fn ca_certificate(path_len: Option<u8>, ski: Option<&[u8]>) -> Certificate {
    let mut tbs = draft("CN=Test CA,O=Example");
    tbs.set_extension_value(
        &ID_CE_BASIC_CONSTRAINTS,
        true,
        &BasicConstraints {
            ca: true,
            path_len_constraint: path_len,
        },
    )
    .unwrap();
    if let Some(ski) = ski {
        tbs.set_extension_value(
            &ID_CE_SUBJECT_KEY_IDENTIFIER,
            false,
            &SubjectKeyIdentifier(OctetString::new(ski).unwrap()),
        )
        .unwrap();
    }
    Certificate {
        tbs_certificate: tbs,
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            parameters: None,
        },
        signature: BitString::from_bytes(&[0u8; 8]).unwrap(),
    }
}

/// Returns the first draft held by a request after rule evaluation
pub(crate) fn first(req: &CertificationRequest) -> &TbsCertificate {
    req.first_draft().unwrap()
}
