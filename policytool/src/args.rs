//! Arguments for the policytool utility

use clap::Parser;

/// Certificate extension policy tool
#[derive(Parser, Debug, Default)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
pub struct PolicyToolArgs {
    /// Full path and filename of a JSON file containing the rules to evaluate, i.e., an object with
    /// a `rules` array whose entries carry `name`, `implementation`, `enable` and `params` items.
    #[clap(short, long, help_heading = "EVALUATION")]
    pub policy: Option<String>,

    /// Full path and filename of the binary DER-encoded or PEM-encoded certificate of the issuing
    /// CA. When absent, the issuer is treated as having no path length constraint and no key
    /// identifier.
    #[clap(short, long, help_heading = "EVALUATION")]
    pub ca_cert: Option<String>,

    /// Full path and filename of a JSON file describing the certification request to evaluate.
    #[clap(short, long, help_heading = "EVALUATION")]
    pub request: Option<String>,

    /// Full path and filename to receive the binary DER-encoded TBSCertificate of the first draft
    /// when the request is accepted.
    #[clap(short, long, help_heading = "EVALUATION")]
    pub output: Option<String>,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,

    /// Lists the available rule implementations along with the parameters each accepts.
    #[clap(long, help_heading = "DIAGNOSTICS")]
    pub list_rules: bool,
}
