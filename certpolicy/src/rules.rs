//! Extension rule implementations, one per extension type

pub mod authority_key_identifier;
pub mod basic_constraints;
pub mod certificate_policies;
pub mod certificate_renewal_window;
pub mod certificate_scope_of_use;
pub mod crl_distribution_points;
pub mod extended_key_usage;
pub mod generic_asn1;
pub mod inhibit_any_policy;
pub mod info_access;
pub mod issuer_alt_name;
pub mod key_usage;
pub mod name_constraints;
pub mod ns_cert_type;
pub mod ocsp_no_check;
pub mod policy_constraints;
pub mod presence_server;
pub mod subject_alt_name;
pub mod subject_key_identifier;

pub use crate::rules::{
    authority_key_identifier::*, basic_constraints::*, certificate_policies::*,
    certificate_renewal_window::*, certificate_scope_of_use::*, crl_distribution_points::*,
    extended_key_usage::*, generic_asn1::*, inhibit_any_policy::*, info_access::*,
    issuer_alt_name::*, key_usage::*, name_constraints::*, ns_cert_type::*, ocsp_no_check::*,
    policy_constraints::*, presence_server::*, subject_alt_name::*, subject_key_identifier::*,
};
