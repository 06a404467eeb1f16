//! ASN.1 definitions for vendor extensions that are not provided by the x509-cert crate

pub mod certificate_renewal_window;
pub mod certificate_scope_of_use;
pub mod netscape_cert_type;

pub use crate::asn1::{
    certificate_renewal_window::*, certificate_scope_of_use::*, netscape_cert_type::*,
};
