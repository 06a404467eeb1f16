//! Type for the certificate renewal window extension

use const_oid::AssociatedOid;
use der::asn1::{GeneralizedTime, ObjectIdentifier};
use der::Sequence;

use crate::util::oids::CERTIFICATE_RENEWAL_WINDOW;

/// Certificate renewal window extension, which advertises when a subscriber is expected to renew.
///
/// This extension is identified by the [`CERTIFICATE_RENEWAL_WINDOW`] OID.
///
/// ```text
/// CertificateRenewalWindow ::= SEQUENCE {
///      beginTime    GeneralizedTime,
///      endTime      GeneralizedTime OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct CertificateRenewalWindow {
    pub begin_time: GeneralizedTime,
    pub end_time: Option<GeneralizedTime>,
}

impl AssociatedOid for CertificateRenewalWindow {
    const OID: ObjectIdentifier = CERTIFICATE_RENEWAL_WINDOW;
}
