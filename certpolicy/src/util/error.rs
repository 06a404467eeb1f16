//! Error types

use alloc::string::String;
use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Reasons a policy rule declines to issue a certificate for a given request
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum RejectionReason {
    /// The request carried no TBSCertificate drafts, or the first draft was absent.
    MissingCertInfo,
    /// The issuing CA has a path length constraint of zero, so no subordinate CA can be issued.
    CaNotPermitted,
    /// A requested or pre-existing path length exceeds what the issuer or the rule configuration allows.
    PathLengthExceeded,
    /// The resolved key usage bit vector was empty.
    EmptyKeyUsage,
    /// keyCertSign or cRLSign was asserted beneath an issuer with a path length constraint of zero.
    CaSigningNotPermitted,
    /// A Netscape certificate type CA bit was asserted beneath an issuer with a path length constraint of zero.
    NsCaBitsNotPermitted,
    /// A request parameter or auth token attribute could not be interpreted.
    InvalidRequestParameter,
}

/// Error type
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Misconfiguration occurs when a rule configuration contains a malformed OID, an out of range
    /// number or lacks a required parameter. Carries a description of the offending item.
    Misconfiguration(String),
    /// Rejected occurs when a policy invariant is violated by a specific request.
    Rejected(RejectionReason),
    /// Asn1Error is used to propagate error information from the der and x509-cert crates.
    Asn1Error(der::Error),
    /// An artifact could not be parsed
    ParseError,
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    #[cfg(feature = "std")]
    StdIoError(std::io::ErrorKind),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<RejectionReason> for Error {
    fn from(reason: RejectionReason) -> Error {
        Error::Rejected(reason)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::MissingCertInfo => write!(f, "no cert info"),
            RejectionReason::CaNotPermitted => {
                write!(f, "issuing CA does not permit subordinate CA certificates")
            }
            RejectionReason::PathLengthExceeded => write!(f, "path length exceeds allowed maximum"),
            RejectionReason::EmptyKeyUsage => write!(f, "key usage must assert at least one bit"),
            RejectionReason::CaSigningNotPermitted => {
                write!(f, "keyCertSign and cRLSign are not permitted by the issuing CA")
            }
            RejectionReason::NsCaBitsNotPermitted => {
                write!(f, "Netscape CA certificate types are not permitted by the issuing CA")
            }
            RejectionReason::InvalidRequestParameter => write!(f, "invalid request parameter"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Misconfiguration(what) => write!(f, "Misconfiguration: {}", what),
            Error::Rejected(reason) => write!(f, "{}", reason),
            Error::Asn1Error(_) => write!(f, "internal error"),
            Error::ParseError => write!(f, "ParseError"),
            Error::NotFound => write!(f, "NotFound"),
            #[cfg(feature = "std")]
            Error::StdIoError(err) => write!(f, "StdIoError: {:?}", err),
        }
    }
}

#[test]
fn rejection_display() {
    use alloc::string::ToString;
    assert_eq!(
        "no cert info",
        Error::Rejected(RejectionReason::MissingCertInfo).to_string()
    );
    assert_eq!(
        "internal error",
        Error::Asn1Error(der::Error::from(der::ErrorKind::Failed)).to_string()
    );
    assert!(Error::Misconfiguration("maxPathLen".to_string())
        .to_string()
        .contains("maxPathLen"));
}
