//! Basic utility functionality supporting extension policy evaluation

pub mod error;
pub mod logging;
pub mod oids;
pub mod policy_utilities;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::{
    util::error::*, util::logging::*, util::oids::*, util::policy_utilities::*,
};
