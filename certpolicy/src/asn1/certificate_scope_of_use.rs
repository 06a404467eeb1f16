//! Types for the certificate scope of use extension

use alloc::vec::Vec;

use der::Sequence;
use x509_cert::ext::pkix::name::GeneralName;

/// One entry of a certificate scope of use extension.
///
/// ```text
/// CertificateScopeEntry ::= SEQUENCE {
///      name          GeneralName,
///      portNumber    INTEGER OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct CertificateScopeEntry {
    pub name: GeneralName,
    pub port_number: Option<u32>,
}

/// Certificate scope of use extension, identified by the
/// [`CERTIFICATE_SCOPE_OF_USE`](crate::CERTIFICATE_SCOPE_OF_USE) OID.
///
/// ```text
/// CertificateScopeOfUse ::= SEQUENCE OF CertificateScopeEntry
/// ```
pub type CertificateScopeOfUse = Vec<CertificateScopeEntry>;

#[test]
fn scope_entry_encoding() {
    use der::{asn1::Ia5String, Decode, Encode};

    let entries: CertificateScopeOfUse = alloc::vec![
        CertificateScopeEntry {
            name: GeneralName::DnsName(Ia5String::new("host.example.com").unwrap()),
            port_number: Some(443),
        },
        CertificateScopeEntry {
            name: GeneralName::DnsName(Ia5String::new("other.example.com").unwrap()),
            port_number: None,
        },
    ];
    let enc = entries.to_der().unwrap();
    let dec = CertificateScopeOfUse::from_der(&enc).unwrap();
    assert_eq!(entries, dec);
    assert_eq!(Some(443), dec[0].port_number);
}
