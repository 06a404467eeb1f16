//! Structured descriptions of the parameters each rule implementation accepts, suitable for
//! presentation by an administrative interface

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::config::policy_config::PolicyRuleConfig;

/// Syntax of a rule parameter
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParamSyntax {
    /// true or false
    Boolean,
    /// Signed integer
    Integer,
    /// Free form string
    String,
    /// One of a fixed set of strings
    Choice(&'static [&'static str]),
}

impl fmt::Display for ParamSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSyntax::Boolean => write!(f, "boolean"),
            ParamSyntax::Integer => write!(f, "integer"),
            ParamSyntax::String => write!(f, "string"),
            ParamSyntax::Choice(choices) => write!(f, "choice({})", choices.join(",")),
        }
    }
}

/// Describes one parameter of a rule implementation
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PluginParam {
    /// Parameter name. Dotted names address items in sub-scopes.
    pub name: String,
    /// Parameter syntax
    pub syntax: ParamSyntax,
    /// Value used when the parameter is not configured
    pub default: String,
    /// Human readable description
    pub description: String,
}

impl PluginParam {
    /// Creates a parameter description
    pub fn new(name: &str, syntax: ParamSyntax, default: &str, description: &str) -> PluginParam {
        PluginParam {
            name: name.to_string(),
            syntax,
            default: default.to_string(),
            description: description.to_string(),
        }
    }

    /// Creates a boolean parameter description
    pub fn boolean(name: &str, default: bool, description: &str) -> PluginParam {
        PluginParam::new(name, ParamSyntax::Boolean, &default.to_string(), description)
    }

    /// Creates an integer parameter description
    pub fn integer(name: &str, default: i64, description: &str) -> PluginParam {
        PluginParam::new(name, ParamSyntax::Integer, &default.to_string(), description)
    }

    /// Creates a string parameter description
    pub fn string(name: &str, default: &str, description: &str) -> PluginParam {
        PluginParam::new(name, ParamSyntax::String, default, description)
    }
}

impl fmt::Display for PluginParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.name, self.syntax, self.description)
    }
}

/// Returns the `critical` parameter shared by every rule implementation.
pub fn critical_param(default: bool) -> PluginParam {
    PluginParam::boolean("critical", default, "Set criticality for the extension")
}

/// Returns the parameters of an indexed series, e.g., `ad0_method` through `ad2_method`, by invoking
/// `each` for every index below `count`.
pub fn indexed_params(count: i64, each: impl Fn(i64) -> Vec<PluginParam>) -> Vec<PluginParam> {
    let mut params = Vec::new();
    for i in 0..count {
        params.extend(each(i));
    }
    params
}

/// `default_params` renders parameter defaults as `name=value` strings.
pub fn default_params(params: &[PluginParam]) -> Vec<String> {
    params
        .iter()
        .map(|p| format!("{}={}", p.name, p.default))
        .collect()
}

fn lookup(config: &PolicyRuleConfig, name: &str) -> Option<String> {
    if config.0.contains_key(name) {
        if let Ok(s) = config.get_string(name, "") {
            return Some(s);
        }
    }
    match name.split_once('.') {
        Some((head, tail)) => lookup(&config.get_sub_scope(head), tail),
        None => None,
    }
}

/// `instance_params` renders parameters as `name=value` strings, using the configured value where
/// present and the default otherwise.
pub fn instance_params(params: &[PluginParam], config: &PolicyRuleConfig) -> Vec<String> {
    params
        .iter()
        .map(|p| {
            let value = lookup(config, &p.name).unwrap_or_else(|| p.default.clone());
            format!("{}={}", p.name, value)
        })
        .collect()
}

#[test]
fn params_render() {
    let params = alloc::vec![
        critical_param(true),
        PluginParam::integer("maxPathLen", -1, "Max path length"),
        PluginParam::string("generalName0.generalNameValue", "", "Value"),
        PluginParam::new(
            "AltKeyIdType",
            ParamSyntax::Choice(&["SpkiSHA1", "None"]),
            "SpkiSHA1",
            "Fallback"
        ),
    ];
    assert_eq!(
        alloc::vec![
            "critical=true".to_string(),
            "maxPathLen=-1".to_string(),
            "generalName0.generalNameValue=".to_string(),
            "AltKeyIdType=SpkiSHA1".to_string()
        ],
        default_params(&params)
    );

    let cfg = PolicyRuleConfig::new()
        .with("maxPathLen", 3)
        .with("generalName0", PolicyRuleConfig::new().with("generalNameValue", "a.example"));
    let inst = instance_params(&params, &cfg);
    assert_eq!("critical=true", inst[0]);
    assert_eq!("maxPathLen=3", inst[1]);
    assert_eq!("generalName0.generalNameValue=a.example", inst[2]);

    assert_eq!("choice(SpkiSHA1,None)", params[3].syntax.to_string());
    let idx = indexed_params(2, |i| {
        alloc::vec![PluginParam::string(&format!("ad{}_method", i), "", "")]
    });
    assert_eq!("ad1_method", idx[1].name);
}
