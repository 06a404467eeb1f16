//! Extension policy evaluation: draft extension handling, rule dispatch and rule chains

pub mod draft_extensions;
pub mod issuing_authority;
pub mod plugin_info;
pub mod policy_chain;
pub mod policy_rule;

pub use crate::{
    policy::draft_extensions::*, policy::issuing_authority::*, policy::plugin_info::*,
    policy::policy_chain::*, policy::policy_rule::*,
};
