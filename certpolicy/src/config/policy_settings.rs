//! Structures and functions related to configuring a chain of extension policy rules

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::config::policy_config::PolicyRuleConfig;
use crate::util::error::*;

#[cfg(feature = "std")]
use std::path::Path;

#[cfg(feature = "std")]
use crate::util::policy_utilities::get_file_as_byte_vec;

fn default_enable() -> bool {
    true
}

/// Configuration for one policy rule instance
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRuleSettings {
    /// Instance name, e.g., `BasicConstraintsExt_CA`
    pub name: String,
    /// Implementation name, e.g., `BasicConstraintsExt`
    pub implementation: String,
    /// Disabled rules are skipped by a [`PolicyChain`](crate::PolicyChain)
    #[serde(default = "default_enable")]
    pub enable: bool,
    /// Parameters handed to the implementation when the rule is initialized
    #[serde(default)]
    pub params: PolicyRuleConfig,
}

/// `PolicySettings` is the ordered list of rules making up a policy chain
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Rules in evaluation order
    pub rules: Vec<PolicyRuleSettings>,
}

/// `parse_policy_settings` deserializes a JSON buffer containing a [`PolicySettings`] object.
pub fn parse_policy_settings(json: &[u8]) -> Result<PolicySettings> {
    match serde_json::from_slice(json) {
        Ok(ps) => Ok(ps),
        Err(_e) => Err(Error::ParseError),
    }
}

/// `read_policy_settings` reads a JSON file containing a [`PolicySettings`] object.
#[cfg(feature = "std")]
pub fn read_policy_settings(fname: &str) -> Result<PolicySettings> {
    let p = Path::new(fname);
    if !Path::exists(p) {
        return Err(Error::NotFound);
    }
    let json = get_file_as_byte_vec(p)?;
    parse_policy_settings(&json)
}

#[test]
fn parse_settings() {
    let json = br#"{
        "rules": [
            {"name": "BasicConstraintsExt_CA", "implementation": "BasicConstraintsExt",
             "params": {"isCA": true, "maxPathLen": 2}},
            {"name": "PresenceServerExt", "implementation": "PresenceServerExt", "enable": false}
        ]
    }"#;
    let ps = parse_policy_settings(json).unwrap();
    assert_eq!(2, ps.rules.len());
    assert!(ps.rules[0].enable);
    assert_eq!(2, ps.rules[0].params.get_integer("maxPathLen", -1).unwrap());
    assert!(!ps.rules[1].enable);
    assert!(ps.rules[1].params.is_empty());

    assert_eq!(Err(Error::ParseError), parse_policy_settings(b"{\"rules\": 5}"));
}

#[cfg(feature = "std")]
#[test]
fn read_settings_file() {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(br#"{"rules": [{"name": "a", "implementation": "OCSPNoCheckExt"}]}"#)
        .unwrap();
    let ps = read_policy_settings(f.path().to_str().unwrap()).unwrap();
    assert_eq!("OCSPNoCheckExt", ps.rules[0].implementation);
    assert_eq!(
        Err(Error::NotFound),
        read_policy_settings("/nonexistent/policy.json")
    );
}
