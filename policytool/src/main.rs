#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;
mod report;
mod request_file;

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use der::{DecodePem, Encode};
use log::{debug, error, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use x509_cert::Certificate;

use certpolicy::*;

use crate::args::*;
use crate::report::*;
use crate::request_file::*;

/// Exit code used when a request is rejected
const EXIT_REJECTED: u8 = 1;
/// Exit code used for usage and configuration errors
const EXIT_ERROR: u8 = 2;

fn configure_logging(args: &PolicyToolArgs) {
    if let Some(logging_config) = &args.logging_config {
        if let Err(e) = log4rs::init_file(logging_config, Default::default()) {
            println!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing without logging.",
                logging_config, e
            );
        } else {
            return;
        }
    }

    // if there's no config, prepare one using stdout
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
    {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                println!(
                    "ERROR: failed to configure logging for stdout with {:?}. Continuing without logging.",
                    e
                );
            }
        }
        Err(e) => {
            println!(
                "ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging",
                e
            );
        }
    }
}

fn list_rules() {
    for name in ExtensionPolicy::implementation_names() {
        if let Some((description, params)) = ExtensionPolicy::describe(name) {
            println!("{}: {}", name, description);
            for p in params {
                println!("    {}", p);
            }
        }
    }
}

/// Reads the issuing CA certificate, accepting either PEM or DER encoding.
fn read_issuer(fname: &str) -> Result<IssuingAuthority> {
    let bytes = get_file_as_byte_vec(std::path::Path::new(fname))?;
    let cert = if bytes.starts_with(b"-----BEGIN") {
        Certificate::from_pem(&bytes)?
    } else {
        <Certificate as der::Decode<'_>>::from_der(&bytes)?
    };
    IssuingAuthority::try_from(&cert)
}

fn evaluate(args: &PolicyToolArgs) -> Result<PolicyOutcome> {
    let policy = match &args.policy {
        Some(p) => p,
        None => {
            error!("A policy file is required to evaluate a request");
            return Err(Error::NotFound);
        }
    };
    let request_fname = match &args.request {
        Some(r) => r,
        None => {
            error!("A request file is required to evaluate a request");
            return Err(Error::NotFound);
        }
    };

    let issuer = match &args.ca_cert {
        Some(c) => read_issuer(c)?,
        None => IssuingAuthority::default(),
    };
    debug!("Issuer path length: {}", issuer.path_len);

    let settings = read_policy_settings(policy)?;
    let chain = PolicyChain::from_settings(&settings, &issuer)?;

    let mut request = read_request_file(request_fname)?.to_request(&issuer)?;
    let outcome = chain.apply(&mut request);
    for line in report_lines(&request, outcome) {
        println!("{}", line);
    }

    if let (Some(output), PolicyOutcome::Accepted) = (&args.output, outcome) {
        if let Some(draft) = request.first_draft() {
            let enc = draft.to_der()?;
            if let Err(e) = fs::write(output, enc) {
                error!("Failed to write {}: {}", output, e);
                return Err(Error::from(e));
            }
        }
    }
    Ok(outcome)
}

/// Point of entry for the policytool application.
fn main() -> ExitCode {
    let args = PolicyToolArgs::parse();
    configure_logging(&args);
    debug!("policytool start");

    if args.list_rules {
        list_rules();
        if args.policy.is_none() && args.request.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    let code = match evaluate(&args) {
        Ok(PolicyOutcome::Accepted) => ExitCode::SUCCESS,
        Ok(PolicyOutcome::Rejected) => ExitCode::from(EXIT_REJECTED),
        Err(e) => {
            println!("ERROR: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    };
    debug!("policytool end");
    code
}
