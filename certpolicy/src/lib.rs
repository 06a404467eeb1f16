#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(not(feature = "std"), no_std)]

pub mod asn1;
pub mod config;
pub mod policy;
pub mod request;
pub mod rules;
pub mod util;

extern crate alloc;

// order of pub use statements below is intended to assure the list emitted by cargo doc on the main
// index.html page is in alphabetical order.
pub use crate::asn1::*;

pub use crate::{config::*, policy::*, request::*, rules::*, util::*};
