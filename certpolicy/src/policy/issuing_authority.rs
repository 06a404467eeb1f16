//! Description of the certification authority on whose behalf policy rules are evaluated

use alloc::vec::Vec;

use spki::SubjectPublicKeyInfoOwned;
use x509_cert::ext::pkix::{BasicConstraints, SubjectKeyIdentifier};
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::policy::draft_extensions::DraftExtensions;
use crate::util::error::*;
use crate::util::oids::*;

/// `IssuingAuthority` carries the properties of the issuing CA that extension rules consult.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssuingAuthority {
    /// Path length constraint of the issuing CA, or -1 when unbounded
    pub path_len: i32,
    /// Value of the issuing CA's subject key identifier extension, if present
    pub subject_key_identifier: Option<Vec<u8>>,
    /// Public key of the issuing CA, if known
    pub subject_public_key_info: Option<SubjectPublicKeyInfoOwned>,
    /// Subject name of the issuing CA
    pub name: Name,
}

impl Default for IssuingAuthority {
    fn default() -> Self {
        IssuingAuthority {
            path_len: -1,
            subject_key_identifier: None,
            subject_public_key_info: None,
            name: Name::default(),
        }
    }
}

impl IssuingAuthority {
    /// Returns an issuer with the given path length constraint and no other properties.
    pub fn with_path_len(path_len: i32) -> Self {
        IssuingAuthority {
            path_len,
            ..Default::default()
        }
    }
}

impl TryFrom<&Certificate> for IssuingAuthority {
    type Error = Error;

    fn try_from(cert: &Certificate) -> Result<Self> {
        let tbs = &cert.tbs_certificate;
        let path_len = match tbs.get_extension_value::<BasicConstraints>(&ID_CE_BASIC_CONSTRAINTS)? {
            Some((_, bc)) => match bc.path_len_constraint {
                Some(pl) => pl as i32,
                None => -1,
            },
            None => -1,
        };
        let subject_key_identifier = tbs
            .get_extension_value::<SubjectKeyIdentifier>(&ID_CE_SUBJECT_KEY_IDENTIFIER)?
            .map(|(_, ski)| ski.0.as_bytes().to_vec());
        Ok(IssuingAuthority {
            path_len,
            subject_key_identifier,
            subject_public_key_info: Some(tbs.subject_public_key_info.clone()),
            name: tbs.subject.clone(),
        })
    }
}

#[test]
fn from_ca_certificate() {
    use crate::util::test_support::*;
    use hex_literal::hex;

    let cert = ca_certificate(Some(3), Some(&hex!("0102030405")));
    let ia = IssuingAuthority::try_from(&cert).unwrap();
    assert_eq!(3, ia.path_len);
    assert_eq!(Some(hex!("0102030405").to_vec()), ia.subject_key_identifier);
    assert!(ia.subject_public_key_info.is_some());

    let cert = ca_certificate(None, None);
    let ia = IssuingAuthority::try_from(&cert).unwrap();
    assert_eq!(-1, ia.path_len);
    assert_eq!(None, ia.subject_key_identifier);

    assert_eq!(-1, IssuingAuthority::default().path_len);
}
