//! JSON description of a certification request

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use der::Decode;
use log::error;
use serde::Deserialize;
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::ext::Extension;
use x509_cert::name::Name;

use certpolicy::*;

/// Number of seconds a draft is valid for, counted from the time of interest
const VALIDITY_SECS: u64 = 365 * 86_400;

/// An extension to place in each draft before evaluation
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedExtension {
    /// Dotted extension OID
    pub oid: String,
    /// Criticality flag
    pub critical: bool,
    /// Hex encoded extension value
    pub value: String,
}

/// `RequestFile` is the JSON form of a certification request accepted by policytool.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestFile {
    /// Subject name, e.g., `CN=Joe,O=Example`
    pub subject: String,
    /// Hex encoded SubjectPublicKeyInfo
    pub public_key: String,
    /// Profile style certificate type
    pub cert_type: Option<String>,
    /// Identifier of a relaying registration authority
    pub source_id: Option<String>,
    /// Agents that approved the request
    pub agent_approvals: Vec<String>,
    /// Processing state recorded by the request queue, e.g., `Approved`
    pub request_status: Option<RequestStatus>,
    /// Form parameters
    pub http_params: BTreeMap<String, String>,
    /// Authentication token attributes
    pub auth_token: Option<BTreeMap<String, Vec<String>>>,
    /// Time of interest in seconds since the Unix epoch
    pub time_of_interest: Option<u64>,
    /// Extensions present in each draft before evaluation
    pub extensions: Vec<SeedExtension>,
    /// Number of identical drafts to carry
    pub drafts: Option<usize>,
}

impl RequestFile {
    /// Builds a [`CertificationRequest`] whose drafts are issued by `issuer`.
    pub fn to_request(&self, issuer: &IssuingAuthority) -> Result<CertificationRequest> {
        let subject = if self.subject.trim().is_empty() {
            Name::default()
        } else {
            match Name::from_str(&self.subject) {
                Ok(n) => n,
                Err(e) => {
                    error!("Failed to parse subject {}: {:?}", self.subject, e);
                    return Err(Error::ParseError);
                }
            }
        };
        if self.public_key.trim().is_empty() {
            error!("Request does not include a publicKey");
            return Err(Error::NotFound);
        }
        let spki = SubjectPublicKeyInfoOwned::from_der(&hex_to_buffer(&self.public_key)?)?;

        let toi = self.time_of_interest.unwrap_or_else(current_time_secs);
        let mut draft = new_draft(&issuer.name, subject, spki, toi, toi + VALIDITY_SECS)?;
        for seed in &self.extensions {
            draft.set_extension(Extension {
                extn_id: parse_oid("oid", &seed.oid)?,
                critical: seed.critical,
                extn_value: der::asn1::OctetString::new(hex_to_buffer(&seed.value)?)?,
            });
        }

        let count = self.drafts.unwrap_or(1).max(1);
        let mut request = CertificationRequest {
            cert_infos: Some(vec![Some(draft); count]),
            ..Default::default()
        };
        request.http_params = self.http_params.clone();
        request.set_time_of_interest(toi);
        if let Some(cert_type) = &self.cert_type {
            request.set_cert_type(cert_type.clone());
        }
        if let Some(source_id) = &self.source_id {
            request.set_source_id(source_id.clone());
        }
        if !self.agent_approvals.is_empty() {
            request.set_agent_approvals(self.agent_approvals.clone());
        }
        if let Some(status) = self.request_status {
            request.set_request_status(status);
        }
        if let Some(token) = &self.auth_token {
            request.auth_token = Some(AuthToken(token.clone()));
        }
        Ok(request)
    }
}

/// `read_request_file` reads a JSON request description from the named file.
pub fn read_request_file(fname: &str) -> Result<RequestFile> {
    let json = get_file_as_byte_vec(Path::new(fname))?;
    match serde_json::from_slice(&json) {
        Ok(rf) => Ok(rf),
        Err(e) => {
            error!("Failed to parse request file {}: {}", fname, e);
            Err(Error::ParseError)
        }
    }
}

#[test]
fn request_from_json() {
    let json = r#"{
        "subject": "CN=Joe,O=Example",
        "publicKey": "3016300d06092a864886f70d010101050003050001020304",
        "certType": "server",
        "agentApprovals": ["agent1"],
        "httpParams": {"digital_signature": "true"},
        "authToken": {"mail": ["joe@example.com"]},
        "timeOfInterest": 1700000000,
        "extensions": [{"oid": "1.3.6.1.5.5.7.48.1.5", "value": "0500"}],
        "drafts": 3
    }"#;
    let rf: RequestFile = serde_json::from_str(json).unwrap();
    let req = rf.to_request(&IssuingAuthority::default()).unwrap();
    assert_eq!(3, req.cert_infos.as_ref().unwrap().len());
    assert_eq!("server", req.get_cert_type());
    assert_eq!(1_700_000_000, req.get_time_of_interest());
    assert_eq!(RequestOrigin::AgentApproved, request_origin(&req));
    assert_eq!(Some("true"), req.get_http_param("digital_signature"));
    assert!(req
        .first_draft()
        .unwrap()
        .find_extension(&ID_PKIX_OCSP_NOCHECK)
        .is_some());

    let rf: RequestFile = serde_json::from_str(r#"{"subject": "CN=Joe"}"#).unwrap();
    assert_eq!(
        Err(Error::NotFound),
        rf.to_request(&IssuingAuthority::default()).map(|_| ())
    );
}

#[test]
fn request_status_from_json() {
    let json = r#"{
        "subject": "CN=Joe",
        "publicKey": "3016300d06092a864886f70d010101050003050001020304",
        "requestStatus": "Approved"
    }"#;
    let rf: RequestFile = serde_json::from_str(json).unwrap();
    let req = rf.to_request(&IssuingAuthority::default()).unwrap();
    assert_eq!(Some(RequestStatus::Approved), req.get_request_status());
    assert!(agent_approved(&req));
}
