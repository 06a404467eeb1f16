//! Configuration snapshot handed to each policy rule when it is initialized

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::util::error::*;
use crate::util::policy_utilities::parse_bool_str;

/// Largest count accepted for indexed entries such as `numIds` or `numGeneralNames`
pub const MAX_SLOT_COUNT: i64 = 100;

/// A single configuration value. Nested objects form sub-scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyConfigValue {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// String value
    String(String),
    /// Nested configuration scope
    Scope(PolicyRuleConfig),
}

impl From<bool> for PolicyConfigValue {
    fn from(v: bool) -> Self {
        PolicyConfigValue::Bool(v)
    }
}

impl From<i64> for PolicyConfigValue {
    fn from(v: i64) -> Self {
        PolicyConfigValue::Integer(v)
    }
}

impl From<i32> for PolicyConfigValue {
    fn from(v: i32) -> Self {
        PolicyConfigValue::Integer(v as i64)
    }
}

impl From<&str> for PolicyConfigValue {
    fn from(v: &str) -> Self {
        PolicyConfigValue::String(v.to_string())
    }
}

impl From<String> for PolicyConfigValue {
    fn from(v: String) -> Self {
        PolicyConfigValue::String(v)
    }
}

impl From<PolicyRuleConfig> for PolicyConfigValue {
    fn from(v: PolicyRuleConfig) -> Self {
        PolicyConfigValue::Scope(v)
    }
}

/// `PolicyRuleConfig` is a named configuration scope for one policy rule instance. It is read once
/// when the rule is initialized and is not changed afterwards.
///
/// Values may be nested (`{"generalName0": {"generalNameChoice": "DNSName"}}`) or expressed with
/// flat dotted keys (`{"generalName0.generalNameChoice": "DNSName"}`). [`get_sub_scope`](Self::get_sub_scope)
/// treats the two forms identically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRuleConfig(pub BTreeMap<String, PolicyConfigValue>);

impl PolicyRuleConfig {
    /// Creates an empty configuration scope
    pub fn new() -> PolicyRuleConfig {
        PolicyRuleConfig(BTreeMap::new())
    }

    /// Adds or replaces a value, returning self to allow chaining.
    pub fn with(mut self, key: &str, value: impl Into<PolicyConfigValue>) -> PolicyRuleConfig {
        self.set(key, value);
        self
    }

    /// Adds or replaces a value.
    pub fn set(&mut self, key: &str, value: impl Into<PolicyConfigValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Returns the names of the items present at this level of the scope, in sorted order.
    pub fn property_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Returns true if no item is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a boolean value. Strings `true` and `false` are accepted, a missing or blank item yields
    /// the default and anything else is a misconfiguration.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.0.get(key) {
            None => Ok(default),
            Some(PolicyConfigValue::Bool(b)) => Ok(*b),
            Some(PolicyConfigValue::String(s)) if s.trim().is_empty() => Ok(default),
            Some(PolicyConfigValue::String(s)) => match parse_bool_str(s) {
                Some(b) => Ok(b),
                None => Err(Error::Misconfiguration(format!(
                    "{} must be true or false: {}",
                    key, s
                ))),
            },
            Some(_) => Err(Error::Misconfiguration(format!(
                "{} must be true or false",
                key
            ))),
        }
    }

    /// Returns a string value. Booleans and integers are rendered as strings; a missing item yields
    /// the default and a sub-scope is a misconfiguration.
    pub fn get_string(&self, key: &str, default: &str) -> Result<String> {
        match self.0.get(key) {
            None => Ok(default.to_string()),
            Some(PolicyConfigValue::String(s)) => Ok(s.clone()),
            Some(PolicyConfigValue::Bool(b)) => Ok(b.to_string()),
            Some(PolicyConfigValue::Integer(i)) => Ok(i.to_string()),
            Some(PolicyConfigValue::Scope(_)) => Err(Error::Misconfiguration(format!(
                "{} must be a string",
                key
            ))),
        }
    }

    /// Returns an integer value. Numeric strings are accepted, a missing or blank item yields the
    /// default and anything else is a misconfiguration.
    pub fn get_integer(&self, key: &str, default: i64) -> Result<i64> {
        match self.0.get(key) {
            None => Ok(default),
            Some(PolicyConfigValue::Integer(i)) => Ok(*i),
            Some(PolicyConfigValue::String(s)) if s.trim().is_empty() => Ok(default),
            Some(PolicyConfigValue::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(i),
                Err(_) => Err(Error::Misconfiguration(format!(
                    "{} must be an integer: {}",
                    key, s
                ))),
            },
            Some(_) => Err(Error::Misconfiguration(format!(
                "{} must be an integer",
                key
            ))),
        }
    }

    /// Returns the number of indexed entries a rule reads, e.g. `numIds`. Counts outside
    /// 0..=[`MAX_SLOT_COUNT`] are a misconfiguration.
    pub fn get_slot_count(&self, key: &str, default: i64) -> Result<i64> {
        let count = self.get_integer(key, default)?;
        if !(0..=MAX_SLOT_COUNT).contains(&count) {
            return Err(Error::Misconfiguration(format!(
                "{} must be between 0 and {}: {}",
                key, MAX_SLOT_COUNT, count
            )));
        }
        Ok(count)
    }

    /// Returns the named sub-scope. Items from a nested object and from flat `name.`-prefixed keys are
    /// merged, with nested items taking precedence. An absent sub-scope yields an empty scope.
    pub fn get_sub_scope(&self, name: &str) -> PolicyRuleConfig {
        let mut scope = PolicyRuleConfig::new();
        let prefix = format!("{}.", name);
        for (k, v) in self.0.iter() {
            if let Some(rest) = k.strip_prefix(prefix.as_str()) {
                if !rest.is_empty() {
                    scope.0.insert(rest.to_string(), v.clone());
                }
            }
        }
        if let Some(PolicyConfigValue::Scope(nested)) = self.0.get(name) {
            for (k, v) in nested.0.iter() {
                scope.0.insert(k.clone(), v.clone());
            }
        }
        scope
    }
}

#[test]
fn typed_getters() {
    let cfg = PolicyRuleConfig::new()
        .with("critical", "TRUE")
        .with("isCA", false)
        .with("maxPathLen", "3")
        .with("numIds", 4)
        .with("blank", "")
        .with("name", "value");

    assert!(cfg.get_bool("critical", false).unwrap());
    assert!(!cfg.get_bool("isCA", true).unwrap());
    assert!(cfg.get_bool("missing", true).unwrap());
    assert!(cfg.get_bool("blank", true).unwrap());
    assert!(cfg.get_bool("name", true).is_err());

    assert_eq!(3, cfg.get_integer("maxPathLen", -1).unwrap());
    assert_eq!(4, cfg.get_integer("numIds", 10).unwrap());
    assert_eq!(-1, cfg.get_integer("blank", -1).unwrap());
    assert!(cfg.get_integer("name", 0).is_err());

    assert_eq!("value", cfg.get_string("name", "").unwrap());
    assert_eq!("false", cfg.get_string("isCA", "").unwrap());
    assert_eq!("dflt", cfg.get_string("missing", "dflt").unwrap());
}

#[test]
fn slot_counts() {
    let cfg = PolicyRuleConfig::new()
        .with("numIds", 4)
        .with("numNegative", -5)
        .with("numHuge", 20_000_000)
        .with("numMax", MAX_SLOT_COUNT)
        .with("numOver", "101");

    assert_eq!(4, cfg.get_slot_count("numIds", 10).unwrap());
    assert_eq!(10, cfg.get_slot_count("missing", 10).unwrap());
    assert_eq!(MAX_SLOT_COUNT, cfg.get_slot_count("numMax", 10).unwrap());
    assert!(matches!(
        cfg.get_slot_count("numNegative", 10),
        Err(Error::Misconfiguration(_))
    ));
    assert!(matches!(
        cfg.get_slot_count("numHuge", 10),
        Err(Error::Misconfiguration(_))
    ));
    assert!(matches!(
        cfg.get_slot_count("numOver", 10),
        Err(Error::Misconfiguration(_))
    ));
}

#[test]
fn sub_scopes() {
    let json = r#"{
        "permittedSubtrees0": {"base": {"generalNameChoice": "DNSName"}, "min": 0},
        "permittedSubtrees0.base.generalNameValue": "example.com",
        "permittedSubtrees1.max": "2"
    }"#;
    let cfg: PolicyRuleConfig = serde_json::from_str(json).unwrap();

    let st0 = cfg.get_sub_scope("permittedSubtrees0");
    let base = st0.get_sub_scope("base");
    assert_eq!("DNSName", base.get_string("generalNameChoice", "").unwrap());
    assert_eq!("example.com", base.get_string("generalNameValue", "").unwrap());
    assert_eq!(0, st0.get_integer("min", 5).unwrap());

    let st1 = cfg.get_sub_scope("permittedSubtrees1");
    assert_eq!(2, st1.get_integer("max", -1).unwrap());
    assert_eq!(alloc::vec!["max".to_string()], st1.property_names());

    assert!(cfg.get_sub_scope("permittedSubtrees2").is_empty());
}
