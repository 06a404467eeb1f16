//! Helpers for reading and writing the extension set of an in-progress TBSCertificate

use alloc::vec::Vec;

use const_oid::db::rfc5912::ECDSA_WITH_SHA_256;
use der::asn1::{GeneralizedTime, Null, ObjectIdentifier, OctetString};
use der::{Decode, Encode};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::certificate::Version;
use x509_cert::ext::pkix::{
    AuthorityInfoAccessSyntax, AuthorityKeyIdentifier, BasicConstraints, CertificatePolicies,
    CrlDistributionPoints, ExtendedKeyUsage, InhibitAnyPolicy, IssuerAltName, KeyUsage,
    NameConstraints, PolicyConstraints, SubjectAltName, SubjectInfoAccessSyntax,
    SubjectKeyIdentifier,
};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::TbsCertificate;

use crate::asn1::*;
use crate::util::error::*;
use crate::util::oids::*;

/// `DraftExtensions` provides the operations rules use to inspect and modify the extension set of a
/// TBSCertificate draft. The set holds at most one extension per OID.
pub trait DraftExtensions {
    /// Returns the extension identified by `oid`, if present.
    fn find_extension(&self, oid: &ObjectIdentifier) -> Option<&Extension>;

    /// Returns true if the draft carries an extension set, even an empty one.
    fn has_extension_set(&self) -> bool;

    /// Decodes the extension identified by `oid`, returning its criticality and value.
    fn get_extension_value<'a, T: Decode<'a>>(
        &'a self,
        oid: &ObjectIdentifier,
    ) -> Result<Option<(bool, T)>>;

    /// Removes the extension identified by `oid`, returning true if it was present.
    fn delete_extension(&mut self, oid: &ObjectIdentifier) -> bool;

    /// Installs an extension, replacing any existing extension with the same OID. If the draft has no
    /// extension set, one is created and the version is set to v3.
    fn set_extension(&mut self, ext: Extension);

    /// Encodes `value` and installs it as the extension identified by `oid`.
    fn set_extension_value<T: Encode>(
        &mut self,
        oid: &ObjectIdentifier,
        critical: bool,
        value: &T,
    ) -> Result<()>;
}

impl DraftExtensions for TbsCertificate {
    fn find_extension(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        match &self.extensions {
            Some(exts) => exts.iter().find(|e| e.extn_id == *oid),
            None => None,
        }
    }

    fn has_extension_set(&self) -> bool {
        self.extensions.is_some()
    }

    fn get_extension_value<'a, T: Decode<'a>>(
        &'a self,
        oid: &ObjectIdentifier,
    ) -> Result<Option<(bool, T)>> {
        match self.find_extension(oid) {
            Some(ext) => {
                let v = T::from_der(ext.extn_value.as_bytes())?;
                Ok(Some((ext.critical, v)))
            }
            None => Ok(None),
        }
    }

    fn delete_extension(&mut self, oid: &ObjectIdentifier) -> bool {
        if let Some(exts) = self.extensions.as_mut() {
            let len = exts.len();
            exts.retain(|e| e.extn_id != *oid);
            return len != exts.len();
        }
        false
    }

    fn set_extension(&mut self, ext: Extension) {
        self.delete_extension(&ext.extn_id);
        match self.extensions.as_mut() {
            Some(exts) => exts.push(ext),
            None => {
                self.extensions = Some(alloc::vec![ext]);
                self.version = Version::V3;
            }
        }
    }

    fn set_extension_value<T: Encode>(
        &mut self,
        oid: &ObjectIdentifier,
        critical: bool,
        value: &T,
    ) -> Result<()> {
        let enc = value.to_der()?;
        self.set_extension(Extension {
            extn_id: *oid,
            critical,
            extn_value: OctetString::new(enc)?,
        });
        Ok(())
    }
}

/// `new_draft` creates a v1 TBSCertificate draft with no extension set. The signature algorithm is a
/// placeholder that the signing step is expected to replace.
pub fn new_draft(
    issuer: &Name,
    subject: Name,
    subject_public_key_info: SubjectPublicKeyInfoOwned,
    not_before_secs: u64,
    not_after_secs: u64,
) -> Result<TbsCertificate> {
    let not_before = GeneralizedTime::from_unix_duration(core::time::Duration::from_secs(
        not_before_secs,
    ))?;
    let not_after =
        GeneralizedTime::from_unix_duration(core::time::Duration::from_secs(not_after_secs))?;
    Ok(TbsCertificate {
        version: Version::V1,
        serial_number: SerialNumber::new(&[0x01])?,
        signature: AlgorithmIdentifierOwned {
            oid: ECDSA_WITH_SHA_256,
            parameters: None,
        },
        issuer: issuer.clone(),
        validity: Validity {
            not_before: Time::GeneralTime(not_before),
            not_after: Time::GeneralTime(not_after),
        },
        subject,
        subject_public_key_info,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    })
}

/// Decoded form of the extensions produced by the policy rules
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum DecodedExtension {
    BasicConstraints(BasicConstraints),
    KeyUsage(KeyUsage),
    ExtendedKeyUsage(ExtendedKeyUsage),
    NameConstraints(NameConstraints),
    PolicyConstraints(PolicyConstraints),
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    AuthorityInfoAccessSyntax(AuthorityInfoAccessSyntax),
    SubjectInfoAccessSyntax(SubjectInfoAccessSyntax),
    SubjectAltName(SubjectAltName),
    IssuerAltName(IssuerAltName),
    InhibitAnyPolicy(InhibitAnyPolicy),
    CertificatePolicies(CertificatePolicies),
    CrlDistributionPoints(CrlDistributionPoints),
    OcspNoCheck(Null),
    NsCertType(NsCertType),
    CertificateRenewalWindow(CertificateRenewalWindow),
    CertificateScopeOfUse(CertificateScopeOfUse),
}

/// `decode_extension` decodes extensions the policy rules know how to produce. Returns None for other
/// extensions and an error for recognized extensions that fail to decode.
pub fn decode_extension(ext: &Extension) -> Result<Option<DecodedExtension>> {
    macro_rules! decode_and_return {
        ($v:ident, $t:ident) => {
            match $t::from_der($v) {
                Ok(r) => return Ok(Some(DecodedExtension::$t(r))),
                Err(e) => return Err(Error::Asn1Error(e)),
            }
        };
        ($v:ident, $t:ident, $variant:ident) => {
            match <$t>::from_der($v) {
                Ok(r) => return Ok(Some(DecodedExtension::$variant(r))),
                Err(e) => return Err(Error::Asn1Error(e)),
            }
        };
    }

    let v = ext.extn_value.as_bytes();
    match ext.extn_id {
        ID_CE_BASIC_CONSTRAINTS => decode_and_return!(v, BasicConstraints),
        ID_CE_KEY_USAGE => decode_and_return!(v, KeyUsage),
        ID_CE_EXT_KEY_USAGE => decode_and_return!(v, ExtendedKeyUsage),
        ID_CE_NAME_CONSTRAINTS => decode_and_return!(v, NameConstraints),
        ID_CE_POLICY_CONSTRAINTS => decode_and_return!(v, PolicyConstraints),
        ID_CE_AUTHORITY_KEY_IDENTIFIER => decode_and_return!(v, AuthorityKeyIdentifier),
        ID_CE_SUBJECT_KEY_IDENTIFIER => decode_and_return!(v, SubjectKeyIdentifier),
        ID_PE_AUTHORITY_INFO_ACCESS => decode_and_return!(v, AuthorityInfoAccessSyntax),
        ID_PE_SUBJECT_INFO_ACCESS => decode_and_return!(v, SubjectInfoAccessSyntax),
        ID_CE_SUBJECT_ALT_NAME => decode_and_return!(v, SubjectAltName),
        ID_CE_ISSUER_ALT_NAME => decode_and_return!(v, IssuerAltName),
        ID_CE_INHIBIT_ANY_POLICY => decode_and_return!(v, InhibitAnyPolicy),
        ID_CE_CERTIFICATE_POLICIES => decode_and_return!(v, CertificatePolicies),
        ID_CE_CRL_DISTRIBUTION_POINTS => decode_and_return!(v, CrlDistributionPoints),
        ID_PKIX_OCSP_NOCHECK => decode_and_return!(v, Null, OcspNoCheck),
        NETSCAPE_CERT_TYPE => decode_and_return!(v, NsCertType),
        CERTIFICATE_RENEWAL_WINDOW => decode_and_return!(v, CertificateRenewalWindow),
        CERTIFICATE_SCOPE_OF_USE => {
            decode_and_return!(v, CertificateScopeOfUse, CertificateScopeOfUse)
        }
        _ => Ok(None),
    }
}

/// Returns the OIDs of the extensions present in a draft, in set order.
pub fn extension_oids(draft: &TbsCertificate) -> Vec<ObjectIdentifier> {
    match &draft.extensions {
        Some(exts) => exts.iter().map(|e| e.extn_id).collect(),
        None => Vec::new(),
    }
}

#[test]
fn set_forces_v3_and_replaces() {
    use crate::util::test_support::*;

    let mut tbs = draft("CN=Joe");
    assert_eq!(Version::V1, tbs.version);
    assert!(!tbs.has_extension_set());

    let bc = BasicConstraints {
        ca: true,
        path_len_constraint: Some(2),
    };
    tbs.set_extension_value(&ID_CE_BASIC_CONSTRAINTS, true, &bc)
        .unwrap();
    assert_eq!(Version::V3, tbs.version);
    assert!(tbs.has_extension_set());

    let bc2 = BasicConstraints {
        ca: false,
        path_len_constraint: None,
    };
    tbs.set_extension_value(&ID_CE_BASIC_CONSTRAINTS, false, &bc2)
        .unwrap();
    assert_eq!(1, tbs.extensions.as_ref().unwrap().len());
    let (critical, v): (bool, BasicConstraints) = tbs
        .get_extension_value(&ID_CE_BASIC_CONSTRAINTS)
        .unwrap()
        .unwrap();
    assert!(!critical);
    assert_eq!(bc2, v);

    assert!(tbs.delete_extension(&ID_CE_BASIC_CONSTRAINTS));
    assert!(!tbs.delete_extension(&ID_CE_BASIC_CONSTRAINTS));
    assert!(tbs.has_extension_set());
    assert!(tbs.find_extension(&ID_CE_BASIC_CONSTRAINTS).is_none());
}

#[test]
fn decode_known_and_unknown() {
    use hex_literal::hex;

    let ku = Extension {
        extn_id: ID_CE_KEY_USAGE,
        critical: true,
        extn_value: OctetString::new(hex!("03020780").to_vec()).unwrap(),
    };
    match decode_extension(&ku).unwrap() {
        Some(DecodedExtension::KeyUsage(k)) => assert!(k.digital_signature()),
        _ => panic!("expected key usage"),
    }

    let other = Extension {
        extn_id: KP_CODE_SIGNING,
        critical: false,
        extn_value: OctetString::new(hex!("0500").to_vec()).unwrap(),
    };
    assert_eq!(None, decode_extension(&other).unwrap());

    let garbage = Extension {
        extn_id: ID_CE_KEY_USAGE,
        critical: true,
        extn_value: OctetString::new(hex!("0401FF").to_vec()).unwrap(),
    };
    assert!(matches!(
        decode_extension(&garbage),
        Err(Error::Asn1Error(_))
    ));
}
