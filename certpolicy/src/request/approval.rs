//! Gates consulted by rules that find their extension already present in a draft

use crate::request::certification_request::{CertificationRequest, RequestStatus};

/// How much a request's origin can be trusted
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RequestOrigin {
    /// An agent has approved the request
    AgentApproved,
    /// The request carried an authentication token but has not been approved by an agent
    Authenticated,
    /// Neither an authentication token nor an agent approval is present
    Unknown,
}

/// `agent_approved` returns true when at least one agent has approved the request or the request's
/// status is [`RequestStatus::Approved`]. Rules use this to decide whether an extension value already
/// present in a draft is kept verbatim.
pub fn agent_approved(request: &CertificationRequest) -> bool {
    if Some(RequestStatus::Approved) == request.get_request_status() {
        return true;
    }
    match request.get_agent_approvals() {
        Some(approvals) => !approvals.is_empty(),
        None => false,
    }
}

/// `request_origin` classifies a request's origin. Agent approval takes precedence over an
/// authentication token.
pub fn request_origin(request: &CertificationRequest) -> RequestOrigin {
    if agent_approved(request) {
        RequestOrigin::AgentApproved
    } else if request.auth_token.is_some() {
        RequestOrigin::Authenticated
    } else {
        RequestOrigin::Unknown
    }
}

#[test]
fn origins() {
    use crate::request::certification_request::AuthToken;
    use alloc::string::ToString;

    let mut req = CertificationRequest::default();
    assert!(!agent_approved(&req));
    assert_eq!(RequestOrigin::Unknown, request_origin(&req));

    req.set_agent_approvals(alloc::vec![]);
    assert!(!agent_approved(&req));

    req.auth_token = Some(AuthToken::new());
    assert_eq!(RequestOrigin::Authenticated, request_origin(&req));

    req.set_agent_approvals(alloc::vec!["agent1".to_string()]);
    assert!(agent_approved(&req));
    assert_eq!(RequestOrigin::AgentApproved, request_origin(&req));
}

#[test]
fn approved_status() {
    let mut req = CertificationRequest::default();
    req.set_request_status(RequestStatus::Pending);
    assert!(!agent_approved(&req));
    assert_eq!(RequestOrigin::Unknown, request_origin(&req));

    req.set_request_status(RequestStatus::Approved);
    assert!(agent_approved(&req));
    assert_eq!(RequestOrigin::AgentApproved, request_origin(&req));
}
