//! Object identifiers for the extensions, access methods and key purposes the policy rules produce

use der::asn1::ObjectIdentifier;

pub use const_oid::db::rfc5912::{
    ID_AD_CA_ISSUERS, ID_AD_CA_REPOSITORY, ID_AD_OCSP, ID_AD_TIME_STAMPING,
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES,
    ID_CE_CRL_DISTRIBUTION_POINTS, ID_CE_EXT_KEY_USAGE, ID_CE_INHIBIT_ANY_POLICY,
    ID_CE_ISSUER_ALT_NAME, ID_CE_KEY_USAGE, ID_CE_NAME_CONSTRAINTS, ID_CE_POLICY_CONSTRAINTS,
    ID_CE_SUBJECT_ALT_NAME, ID_CE_SUBJECT_KEY_IDENTIFIER, ID_PE_AUTHORITY_INFO_ACCESS,
    ID_PE_SUBJECT_INFO_ACCESS, ID_QT_CPS,
};
pub use const_oid::db::rfc6960::ID_PKIX_OCSP_NOCHECK;

// -------------------------------------------------------------------------------------------------
// Netscape certificate extensions
// -------------------------------------------------------------------------------------------------

/// netscape-cert-type OBJECT IDENTIFIER ::= { 2 16 840 1 113730 1 1 }
pub const NETSCAPE_CERT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113730.1.1");

/// certificate renewal window OBJECT IDENTIFIER ::= { 2 16 840 1 113730 1 15 }
pub const CERTIFICATE_RENEWAL_WINDOW: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113730.1.15");

/// certificate scope of use OBJECT IDENTIFIER ::= { 2 16 840 1 113730 1 17 }
pub const CERTIFICATE_SCOPE_OF_USE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113730.1.17");

/// Access method used in AIA entries that point to a certificate renewal service
pub const ACCESS_METHOD_RENEWAL: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113730.16.1");

// -------------------------------------------------------------------------------------------------
// Key purposes
// -------------------------------------------------------------------------------------------------

/// id-kp-OCSPSigning OBJECT IDENTIFIER ::= { id-kp 9 }
pub const KP_OCSP_SIGNING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.9");

/// id-kp-codeSigning OBJECT IDENTIFIER ::= { id-kp 3 }
pub const KP_CODE_SIGNING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.3");

/// Returns a short display name for extension OIDs produced by the policy rules, or None.
pub fn extension_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    let name = match *oid {
        ID_CE_BASIC_CONSTRAINTS => "basicConstraints",
        ID_CE_KEY_USAGE => "keyUsage",
        ID_CE_EXT_KEY_USAGE => "extKeyUsage",
        ID_CE_NAME_CONSTRAINTS => "nameConstraints",
        ID_CE_POLICY_CONSTRAINTS => "policyConstraints",
        ID_CE_AUTHORITY_KEY_IDENTIFIER => "authorityKeyIdentifier",
        ID_CE_SUBJECT_KEY_IDENTIFIER => "subjectKeyIdentifier",
        ID_PE_AUTHORITY_INFO_ACCESS => "authorityInfoAccess",
        ID_PE_SUBJECT_INFO_ACCESS => "subjectInfoAccess",
        ID_CE_SUBJECT_ALT_NAME => "subjectAltName",
        ID_CE_ISSUER_ALT_NAME => "issuerAltName",
        ID_CE_INHIBIT_ANY_POLICY => "inhibitAnyPolicy",
        ID_CE_CERTIFICATE_POLICIES => "certificatePolicies",
        ID_CE_CRL_DISTRIBUTION_POINTS => "cRLDistributionPoints",
        ID_PKIX_OCSP_NOCHECK => "ocspNoCheck",
        NETSCAPE_CERT_TYPE => "netscapeCertType",
        CERTIFICATE_RENEWAL_WINDOW => "certificateRenewalWindow",
        CERTIFICATE_SCOPE_OF_USE => "certificateScopeOfUse",
        _ => return None,
    };
    Some(name)
}

#[test]
fn extension_names() {
    assert_eq!(Some("keyUsage"), extension_name(&ID_CE_KEY_USAGE));
    assert_eq!(Some("netscapeCertType"), extension_name(&NETSCAPE_CERT_TYPE));
    assert_eq!(None, extension_name(&KP_CODE_SIGNING));
}
