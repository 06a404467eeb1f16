//! Certificate issuance requests and the origin checks that decide whether request-supplied
//! extension values are trusted

pub mod approval;
pub mod certification_request;

pub use crate::{request::approval::*, request::certification_request::*};
