//! Configuration snapshots used to initialize extension policy rules

pub mod general_names;
pub mod policy_config;
pub mod policy_settings;

pub use crate::{
    config::general_names::*, config::policy_config::*, config::policy_settings::*,
};
