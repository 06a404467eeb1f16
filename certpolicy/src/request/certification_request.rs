//! The certificate issuance request evaluated by extension policy rules

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use x509_cert::TbsCertificate;

use pkiprocmacros::*;

/// `Strings` is a typedef for a vector of String values.
pub type Strings = Vec<String>;

/// `TbsCertificates` is a typedef for the draft array carried by a request. Individual entries may
/// be absent.
pub type TbsCertificates = Vec<Option<TbsCertificate>>;

/// Processing state of a request as recorded by the request queue
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Request has been created but not yet processed
    Begin,
    /// Request is awaiting agent review
    Pending,
    /// Request was approved by an agent
    Approved,
    /// Request is awaiting a service
    SvcPending,
    /// Request was canceled
    Canceled,
    /// Request was rejected
    Rejected,
    /// Request processing is complete
    Complete,
}

/// `RequestDataTypes` is used to define a variant map with types associated with the side channel
/// data carried by a [`CertificationRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestDataTypes {
    /// Represents bool values
    Bool(bool),
    /// Represents u64 values
    U64(u64),
    /// Represents String values
    String(String),
    /// Represents vectors of Strings
    Strings(Strings),
    /// Represents request status values
    RequestStatus(RequestStatus),
}

/// `RequestData` is a typedef for a `BTreeMap` that maps arbitrary string values to a variant map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestData(pub BTreeMap<String, RequestDataTypes>);

/// Claims carried by the authentication token that accompanied a request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken(pub BTreeMap<String, Strings>);

impl AuthToken {
    /// Creates a new empty [`AuthToken`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the values of the named attribute, if present.
    pub fn get_string_array(&self, attribute: &str) -> Option<&Strings> {
        self.0.get(attribute)
    }

    /// Returns the first value of the named attribute, if present.
    pub fn get_string(&self, attribute: &str) -> Option<&str> {
        self.0
            .get(attribute)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    /// Sets the values of the named attribute.
    pub fn set_string_array(&mut self, attribute: &str, values: Strings) {
        self.0.insert(attribute.to_string(), values);
    }
}

/// `CertificationRequest` is the unit of work passed through a chain of extension policy rules. It
/// holds one or more TBSCertificate drafts along with data gathered by the enrollment front end.
#[derive(Clone, Debug, Default)]
pub struct CertificationRequest {
    /// Drafts to be evaluated. Rules reject requests where this is absent or the first entry is absent.
    pub cert_infos: Option<TbsCertificates>,
    /// Form parameters submitted with the request
    pub http_params: BTreeMap<String, String>,
    /// Authentication token, if the request was authenticated
    pub auth_token: Option<AuthToken>,
    /// Keyed side channel data. See the `RQ_` keys for items with typed accessors.
    pub extended_data: RequestData,
}

impl CertificationRequest {
    /// Creates a new request containing the given draft
    pub fn new(draft: TbsCertificate) -> Self {
        CertificationRequest {
            cert_infos: Some(alloc::vec![Some(draft)]),
            ..Default::default()
        }
    }

    /// Returns the named HTTP parameter, if present.
    pub fn get_http_param(&self, name: &str) -> Option<&str> {
        self.http_params.get(name).map(|s| s.as_str())
    }

    /// Sets the named HTTP parameter.
    pub fn set_http_param(&mut self, name: &str, value: &str) {
        self.http_params.insert(name.to_string(), value.to_string());
    }

    /// Returns the first draft, if present.
    pub fn first_draft(&self) -> Option<&TbsCertificate> {
        match &self.cert_infos {
            Some(infos) => infos.first().and_then(|d| d.as_ref()),
            None => None,
        }
    }

    /// Returns true if the request carries a non-empty source identifier, i.e., it was relayed by a
    /// subordinate registration authority.
    pub fn has_source_id(&self) -> bool {
        matches!(self.get_source_id(), Some(s) if !s.is_empty())
    }
}

//-----------------------------------------------------------------------------------------------
// Keys for side channel data
//-----------------------------------------------------------------------------------------------
/// `RQ_SOURCE_ID` identifies the subordinate registration authority that relayed a request
pub static RQ_SOURCE_ID: &str = "sourceId";
/// `RQ_CERT_TYPE` is the profile style certificate type, e.g., client, server, ca, ra or ocspResponder
pub static RQ_CERT_TYPE: &str = "certType";
/// `RQ_AGENT_APPROVALS` lists the agents that approved a request
pub static RQ_AGENT_APPROVALS: &str = "agentApprovals";
/// `RQ_REQUEST_STATUS` is the request's processing state
pub static RQ_REQUEST_STATUS: &str = "requestStatus";
/// `RQ_ERROR` holds the reason the request was rejected
pub static RQ_ERROR: &str = "error";
/// `RQ_TIME_OF_INTEREST` is the time, in seconds since the Unix epoch, used as "now" by rules
pub static RQ_TIME_OF_INTEREST: &str = "timeOfInterest";

req_gets_and_sets!(RQ_SOURCE_ID, String);
req_gets_and_sets_with_default!(RQ_CERT_TYPE, String, "client".to_string());
req_gets_and_sets!(RQ_AGENT_APPROVALS, Strings);
req_gets_and_sets!(RQ_REQUEST_STATUS, RequestStatus);
req_gets_and_sets!(RQ_ERROR, String);
req_gets_and_sets_with_default!(
    RQ_TIME_OF_INTEREST,
    u64,
    crate::util::policy_utilities::current_time_secs()
);

#[test]
fn test_default_gets() {
    use crate::util::test_support::*;
    let req = CertificationRequest::new(draft("CN=Joe"));
    assert_eq!(None, req.get_source_id());
    assert!(!req.has_source_id());
    assert_eq!("client", req.get_cert_type());
    assert_eq!(None, req.get_agent_approvals());
    assert_eq!(None, req.get_request_status());
    assert_eq!(None, req.get_error());
    assert!(req.first_draft().is_some());
}

#[test]
fn test_sets() {
    let mut req = CertificationRequest::default();
    assert!(req.first_draft().is_none());
    req.set_source_id("ra1".to_string());
    req.set_cert_type("server".to_string());
    req.set_agent_approvals(alloc::vec!["agent1".to_string()]);
    req.set_request_status(RequestStatus::Approved);
    req.set_time_of_interest(1_700_000_000);
    req.set_http_param("ssl_server", "true");

    assert!(req.has_source_id());
    assert_eq!("server", req.get_cert_type());
    assert_eq!(Some(alloc::vec!["agent1".to_string()]), req.get_agent_approvals());
    assert_eq!(Some(RequestStatus::Approved), req.get_request_status());
    assert_eq!(1_700_000_000, req.get_time_of_interest());
    assert_eq!(Some("true"), req.get_http_param("ssl_server"));

    let mut token = AuthToken::new();
    token.set_string_array("mail", alloc::vec!["joe@example.com".to_string()]);
    assert_eq!(Some("joe@example.com"), token.get_string("mail"));
    assert!(token.get_string_array("uid").is_none());
}

#[test]
fn request_data_serde() {
    let mut req = CertificationRequest::default();
    req.set_cert_type("ca".to_string());
    let json = serde_json::to_string(&req.extended_data).unwrap();
    let rd: RequestData = serde_json::from_str(&json).unwrap();
    assert_eq!(req.extended_data, rd);
}
