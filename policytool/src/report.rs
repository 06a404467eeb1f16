//! Rendering of evaluation results

use x509_cert::ext::Extension;

use certpolicy::*;

/// Renders an extension as `name (oid)[ critical]: HEX`.
pub fn describe_extension(ext: &Extension) -> String {
    format!(
        "{} ({}){}: {}",
        extension_name(&ext.extn_id).unwrap_or("unknown"),
        ext.extn_id,
        if ext.critical { " critical" } else { "" },
        buffer_to_hex(ext.extn_value.as_bytes())
    )
}

/// Returns the lines reported for an evaluated request: the outcome, the rejection reason if any,
/// then the extensions of each draft.
pub fn report_lines(request: &CertificationRequest, outcome: PolicyOutcome) -> Vec<String> {
    let mut lines = vec![format!("Outcome: {}", outcome)];
    if PolicyOutcome::Rejected == outcome {
        lines.push(format!(
            "Reason: {}",
            request.get_error().unwrap_or_default()
        ));
    }
    if let Some(drafts) = &request.cert_infos {
        for (i, draft) in drafts.iter().enumerate() {
            lines.push(format!("Draft {}:", i));
            if let Some(exts) = draft.as_ref().and_then(|d| d.extensions.as_ref()) {
                for ext in exts {
                    lines.push(format!("    {}", describe_extension(ext)));
                }
            }
        }
    }
    lines
}

#[test]
fn extension_lines() {
    let ext = Extension {
        extn_id: ID_CE_BASIC_CONSTRAINTS,
        critical: true,
        extn_value: der::asn1::OctetString::new(vec![0x30, 0x03, 0x01, 0x01, 0xFF]).unwrap(),
    };
    assert_eq!(
        "basicConstraints (2.5.29.19) critical: 30030101FF",
        describe_extension(&ext)
    );

    let mut req = CertificationRequest::default();
    req.set_error("no cert info".to_string());
    assert_eq!(
        vec![
            "Outcome: Rejected".to_string(),
            "Reason: no cert info".to_string()
        ],
        report_lines(&req, PolicyOutcome::Rejected)
    );
}
