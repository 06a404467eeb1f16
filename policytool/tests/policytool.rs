//! Tests that exercise the policytool binary

use assert_cmd::prelude::*;
use der::Decode;
use predicates::prelude::*;
use std::process::Command;
use x509_cert::TbsCertificate;

#[test]
fn list_rules() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("--list-rules");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("BasicConstraintsExt: "))
        .stdout(predicate::str::contains("CRLDistributionPointsExt: "))
        .stdout(predicate::str::contains("    maxPathLen;integer;"));
    Ok(())
}

#[test]
fn subordinate_ca_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("subca.tbs.der");

    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-p").arg("tests/examples/ca_policy.json");
    cmd.arg("-c").arg("tests/examples/ca_pathlen1.der");
    cmd.arg("-r").arg("tests/examples/subca_request.json");
    cmd.arg("-o").arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Outcome: Accepted"))
        // path length clamped beneath an issuer with a path length of one
        .stdout(predicate::str::contains(
            "basicConstraints (2.5.29.19) critical: 30060101FF020100",
        ))
        .stdout(predicate::str::contains("keyUsage (2.5.29.15) critical: "))
        .stdout(predicate::str::contains("authorityKeyIdentifier (2.5.29.35): "))
        .stdout(predicate::str::contains("authorityInfoAccess (1.3.6.1.5.5.7.1.1): "));

    let tbs = TbsCertificate::from_der(&std::fs::read(&output)?)?;
    assert_eq!(x509_cert::certificate::Version::V3, tbs.version);
    assert_eq!(5, tbs.extensions.map(|e| e.len()).unwrap_or_default());
    Ok(())
}

#[test]
fn server_request_with_two_drafts() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-p").arg("tests/examples/server_policy.json");
    cmd.arg("-r").arg("tests/examples/server_request.json");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Outcome: Accepted"))
        .stdout(predicate::str::contains("Draft 1:"))
        .stdout(predicate::str::contains("basicConstraints (2.5.29.19): 3000"))
        .stdout(predicate::str::contains("subjectAltName (2.5.29.17): "))
        .stdout(predicate::str::contains("netscapeCertType (2.16.840.1.113730.1.1): 03020640"))
        .stdout(predicate::str::contains("certificateRenewalWindow"));
    Ok(())
}

#[test]
fn approved_value_beyond_issuer_rejected() -> Result<(), Box<dyn std::error::Error>> {
    // kept when the issuer imposes no constraint
    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-p").arg("tests/examples/ca_policy.json");
    cmd.arg("-r").arg("tests/examples/approved_subca_request.json");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "basicConstraints (2.5.29.19) critical: 30060101FF020105",
        ));

    // rejected beneath an issuer with a path length of one
    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-p").arg("tests/examples/ca_policy.json");
    cmd.arg("-c").arg("tests/examples/ca_pathlen1.der");
    cmd.arg("-r").arg("tests/examples/approved_subca_request.json");
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("Outcome: Rejected"))
        .stdout(predicate::str::contains(
            "Reason: path length exceeds allowed maximum",
        ));
    Ok(())
}

#[test]
fn zero_path_len_issuer_from_pem() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-p").arg("tests/examples/ca_policy.json");
    cmd.arg("-c").arg("tests/examples/ca_pathlen0.pem");
    cmd.arg("-r").arg("tests/examples/subca_request.json");
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("Outcome: Rejected"));
    Ok(())
}

#[test]
fn configuration_errors() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-p").arg("tests/examples/bad_policy.json");
    cmd.arg("-r").arg("tests/examples/subca_request.json");
    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains("ERROR: Misconfiguration"));

    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-r").arg("tests/examples/subca_request.json");
    cmd.assert().code(2);

    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-p").arg("tests/examples/missing.json");
    cmd.arg("-r").arg("tests/examples/subca_request.json");
    cmd.assert().code(2);
    Ok(())
}

#[test]
fn logging_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("policytool")?;
    cmd.arg("-l").arg("tests/examples/log4rs.yaml");
    cmd.arg("-p").arg("tests/examples/ca_policy.json");
    cmd.arg("-r").arg("tests/examples/subca_request.json");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("DEBUG policytool start"));
    Ok(())
}
