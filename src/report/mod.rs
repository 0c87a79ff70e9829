//! Final report handed to the external collaborator when a session ends.

pub mod sink;

use serde::{Deserialize, Serialize};

use crate::pipeline::types::{ExtractedIntelligence, IntelCategory, ScamAssessment};
use crate::session::Session;

pub use sink::{HttpReportSink, LogReportSink, ReportSink, dispatch_detached};

/// Intelligence in the collaborator's wire shape: one list per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIntelligence {
    pub bank_accounts: Vec<String>,
    pub upi_ids: Vec<String>,
    pub phishing_links: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub email_addresses: Vec<String>,
    pub crypto_addresses: Vec<String>,
    pub ip_addresses: Vec<String>,
    pub suspicious_keywords: Vec<String>,
}

impl From<&ExtractedIntelligence> for ReportIntelligence {
    fn from(intel: &ExtractedIntelligence) -> Self {
        let values = |c: IntelCategory| intel.values(c).to_vec();
        Self {
            bank_accounts: values(IntelCategory::BankAccount),
            upi_ids: values(IntelCategory::UpiId),
            phishing_links: values(IntelCategory::PhishingLink),
            phone_numbers: values(IntelCategory::PhoneNumber),
            email_addresses: values(IntelCategory::Email),
            crypto_addresses: values(IntelCategory::CryptoAddress),
            ip_addresses: values(IntelCategory::IpAddress),
            suspicious_keywords: values(IntelCategory::SuspiciousKeyword),
        }
    }
}

/// Summary of a finished conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub session_id: String,
    pub scam_detected: bool,
    pub total_messages_exchanged: usize,
    pub extracted_intelligence: ReportIntelligence,
    pub agent_notes: String,
}

impl FinalReport {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            scam_detected: session.assessment.detected,
            total_messages_exchanged: session.message_count(),
            extracted_intelligence: ReportIntelligence::from(&session.intelligence),
            agent_notes: agent_notes(&session.assessment, &session.intelligence),
        }
    }
}

/// Free-text notes: tactics in the order they fired, then what was disclosed.
pub fn agent_notes(assessment: &ScamAssessment, intel: &ExtractedIntelligence) -> String {
    let tactics = if assessment.tactic_tags.is_empty() {
        "social engineering".to_string()
    } else {
        assessment
            .tactic_tags
            .iter()
            .map(|t| t.describe())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut notes = vec![format!("Scammer employed: {tactics}.")];

    let remarks = [
        (IntelCategory::UpiId, "Requested UPI ID sharing."),
        (IntelCategory::BankAccount, "Asked for bank details."),
        (IntelCategory::PhishingLink, "Provided suspicious links."),
        (IntelCategory::PhoneNumber, "Shared contact phone numbers."),
        (IntelCategory::CryptoAddress, "Pushed cryptocurrency payment."),
    ];
    for (category, remark) in remarks {
        if !intel.values(category).is_empty() {
            notes.push(remark.to_string());
        }
    }

    if assessment.reasons.iter().any(|r| r.starts_with("escalation")) {
        notes.push("Escalated demands after the victim hesitated.".to_string());
    }

    notes.push("Attempted to establish false trust and urgency throughout conversation.".to_string());
    notes.join(" ")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::pipeline::types::{Message, TacticTag};

    #[test]
    fn notes_list_tactics_in_first_seen_order() {
        let assessment = ScamAssessment {
            tactic_tags: vec![TacticTag::Urgency, TacticTag::Credential],
            ..ScamAssessment::default()
        };
        let notes = agent_notes(&assessment, &ExtractedIntelligence::new());
        assert!(notes.starts_with("Scammer employed: urgency pressure, credential theft."));
    }

    #[test]
    fn notes_mention_disclosed_intelligence() {
        let mut intel = ExtractedIntelligence::new();
        intel.add(IntelCategory::UpiId, "fraud@ybl");
        intel.add(IntelCategory::BankAccount, "9876543210123456");
        let notes = agent_notes(&ScamAssessment::default(), &intel);
        assert!(notes.contains("social engineering"));
        assert!(notes.contains("Requested UPI ID sharing."));
        assert!(notes.contains("Asked for bank details."));
        assert!(!notes.contains("Provided suspicious links."));
    }

    #[test]
    fn report_serializes_wire_shape() {
        let mut session = Session::new("abc", Utc::now());
        session.history.push(Message::scammer("send OTP", 1));
        session.history.push(Message::user("why?", 2));
        session.assessment.detected = true;
        session.intelligence.add(IntelCategory::PhishingLink, "http://bad.example");

        let json = serde_json::to_value(FinalReport::from_session(&session)).unwrap();
        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["scamDetected"], true);
        assert_eq!(json["totalMessagesExchanged"], 2);
        assert_eq!(json["extractedIntelligence"]["phishingLinks"][0], "http://bad.example");
        assert!(json["extractedIntelligence"]["upiIds"].as_array().unwrap().is_empty());
        assert!(json["agentNotes"].as_str().unwrap().contains("Provided suspicious links."));
    }
}
