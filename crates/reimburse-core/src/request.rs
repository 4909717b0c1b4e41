use std::fmt;

use serde::{Deserialize, Serialize};

/// Shown in place of the proof list when a request has no receipts.
pub const NO_PROOFS: &str = "No proofs attached";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Submitted")]
    Submitted,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Not Approved")]
    NotApproved,
    #[serde(rename = "Paid")]
    Paid,
}

impl Status {
    pub const ALL: &[Status] = &[
        Status::Submitted,
        Status::Approved,
        Status::NotApproved,
        Status::Paid,
    ];

    /// The exact cell value stored in the sheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Submitted => "Submitted",
            Status::Approved => "Approved",
            Status::NotApproved => "Not Approved",
            Status::Paid => "Paid",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Submitted" => Some(Status::Submitted),
            "Approved" => Some(Status::Approved),
            "Not Approved" => Some(Status::NotApproved),
            "Paid" => Some(Status::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reimbursement request, i.e. one data row of the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: String,
    pub email: String,
    pub purpose: String,
    pub amount: String,
    pub timestamp: String,
    /// Raw status cell. Use [`Request::status`] for the parsed value.
    pub status: String,
    pub previous_status: String,
    pub changer_name: String,
    pub reason: String,
    pub proof_refs: Vec<String>,
}

impl Request {
    /// Parsed status, or `None` when the cell holds something outside the pipeline.
    pub fn status(&self) -> Option<Status> {
        Status::parse_str(&self.status)
    }

    pub fn changer_display(&self) -> &str {
        if self.changer_name.trim().is_empty() {
            "N/A"
        } else {
            &self.changer_name
        }
    }

    pub fn proof_links(&self) -> String {
        format_proof_links(&self.proof_refs)
    }
}

/// Split a receipts cell into its URIs. The form joins uploads with `", "`.
pub fn parse_proof_refs(cell: &str) -> Vec<String> {
    cell.split(", ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render proof URIs as numbered references, `View Proof 1 <uri>`, space-joined.
///
/// URIs are rendered as given; nothing is validated.
pub fn format_proof_links(proof_refs: &[String]) -> String {
    let links: Vec<String> = proof_refs
        .iter()
        .map(|uri| uri.trim())
        .filter(|uri| !uri.is_empty())
        .enumerate()
        .map(|(i, uri)| format!("View Proof {} <{uri}>", i + 1))
        .collect();
    if links.is_empty() {
        NO_PROOFS.to_string()
    } else {
        links.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(uris: &[&str]) -> Vec<String> {
        uris.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn status_round_trips_through_sheet_value() {
        for &status in Status::ALL {
            assert_eq!(Status::parse_str(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse_str("Rejected"), None);
        assert_eq!(Status::parse_str(" Paid "), Some(Status::Paid));
    }

    #[test]
    fn status_serializes_as_sheet_value() {
        let json = serde_json::to_string(&Status::NotApproved).unwrap();
        assert_eq!(json, "\"Not Approved\"");
    }

    #[test]
    fn empty_proofs_use_sentinel() {
        assert_eq!(format_proof_links(&[]), NO_PROOFS);
        assert_eq!(format_proof_links(&refs(&["", "  "])), NO_PROOFS);
    }

    #[test]
    fn proofs_are_numbered_in_order() {
        let out = format_proof_links(&refs(&["https://a/1", "https://b/2", "https://c/3"]));
        assert_eq!(
            out,
            "View Proof 1 <https://a/1> View Proof 2 <https://b/2> View Proof 3 <https://c/3>"
        );
    }

    #[test]
    fn single_proof_is_stable() {
        let once = format_proof_links(&refs(&["https://drive/x"]));
        let twice = format_proof_links(&refs(&["https://drive/x"]));
        assert_eq!(once, twice);
        assert_eq!(once, "View Proof 1 <https://drive/x>");
    }

    #[test]
    fn malformed_uri_is_rendered_as_given() {
        let out = format_proof_links(&refs(&["not a uri ::"]));
        assert_eq!(out, "View Proof 1 <not a uri ::>");
    }

    #[test]
    fn receipts_cell_splits_on_comma_space() {
        assert_eq!(
            parse_proof_refs("https://a, https://b ,  https://c"),
            refs(&["https://a", "https://b", "https://c"])
        );
        assert!(parse_proof_refs("").is_empty());
    }

    #[test]
    fn blank_changer_displays_na() {
        let mut req = Request {
            request_id: "REQ-1".into(),
            email: String::new(),
            purpose: String::new(),
            amount: String::new(),
            timestamp: String::new(),
            status: "Submitted".into(),
            previous_status: String::new(),
            changer_name: " ".into(),
            reason: String::new(),
            proof_refs: vec![],
        };
        assert_eq!(req.changer_display(), "N/A");
        req.changer_name = "Aisha".into();
        assert_eq!(req.changer_display(), "Aisha");
    }
}
