//! Logging support

use const_oid::ObjectIdentifier;
use core::fmt;
#[cfg(feature = "std")]
use log::{debug, error, info, warn};

/// Enum that describes level associated with a log message
#[derive(Debug, Eq, PartialEq)]
pub enum PolicyLogLevels {
    /// Common error logging level
    Error,
    /// Common info logging level
    Info,
    /// Common warn logging level
    Warn,
    /// Common debug logging level
    Debug,
}

/// `log_message` provides a logging function that uses the log facade.
#[cfg(feature = "std")]
pub fn log_message(level: &PolicyLogLevels, message: &str) {
    if &PolicyLogLevels::Error == level {
        error!("{}", message);
    } else if &PolicyLogLevels::Warn == level {
        warn!("{}", message);
    } else if &PolicyLogLevels::Info == level {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}

#[cfg(not(feature = "std"))]
/// `log_message` does nothing when std feature gate is not used
pub fn log_message(_level: &PolicyLogLevels, _message: &str) {}

/// What a rule did with its extension while evaluating a draft
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExtensionDecision {
    /// A freshly built value was installed
    Added,
    /// An existing value was removed without a replacement
    Deleted,
    /// An existing value was retained verbatim
    Kept,
    /// The rule intentionally left the extension set alone
    Skipped,
}

impl fmt::Display for ExtensionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionDecision::Added => write!(f, "added"),
            ExtensionDecision::Deleted => write!(f, "deleted"),
            ExtensionDecision::Kept => write!(f, "kept"),
            ExtensionDecision::Skipped => write!(f, "skipped"),
        }
    }
}

/// Emits a debug trace line describing an add/delete/keep/skip decision made by the named rule.
#[cfg(feature = "std")]
pub fn log_extension_decision(rule: &str, oid: &ObjectIdentifier, decision: ExtensionDecision) {
    debug!("{}: extension {} {}", rule, oid, decision);
}

#[cfg(not(feature = "std"))]
/// `log_extension_decision` does nothing when std feature gate is not used
pub fn log_extension_decision(_rule: &str, _oid: &ObjectIdentifier, _decision: ExtensionDecision) {
}
