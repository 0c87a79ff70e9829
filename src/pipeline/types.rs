//! Shared types for the message analysis pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Longest session identifier accepted from a client.
const MAX_SESSION_ID_LEN: usize = 128;

/// Longest message body accepted from a client.
const MAX_TEXT_LEN: usize = 10_000;

// ── Messages ────────────────────────────────────────────────────────

/// Which side of the conversation sent a message.
///
/// The honeypot persona plays the `User`; the suspected attacker is the `Scammer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Scammer,
    User,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scammer => write!(f, "scammer"),
            Self::User => write!(f, "user"),
        }
    }
}

/// A single chat message. Immutable once recorded in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    /// Epoch time in milliseconds, as supplied by the client.
    #[serde(rename = "timestamp", alias = "timestampMillis")]
    pub timestamp_millis: i64,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp_millis,
        }
    }

    pub fn scammer(text: impl Into<String>, timestamp_millis: i64) -> Self {
        Self::new(Sender::Scammer, text, timestamp_millis)
    }

    pub fn user(text: impl Into<String>, timestamp_millis: i64) -> Self {
        Self::new(Sender::User, text, timestamp_millis)
    }
}

/// Inbound request handed to the orchestrator, one message at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub session_id: String,
    pub message: Message,
    /// The client's view of the prior conversation. Cross-check only; the
    /// stored session history is authoritative.
    #[serde(default)]
    pub conversation_history: Vec<Message>,
    /// Channel/language/locale hints. Carried along, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl InboundMessage {
    pub fn new(session_id: impl Into<String>, message: Message) -> Self {
        Self {
            session_id: session_id.into(),
            message,
            conversation_history: Vec::new(),
            metadata: None,
        }
    }

    /// Reject malformed input before it reaches any stateful step.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let session_id = self.session_id.trim();
        if session_id.is_empty() {
            return Err(PipelineError::InvalidInput("sessionId must not be empty".into()));
        }
        if session_id.len() > MAX_SESSION_ID_LEN {
            return Err(PipelineError::InvalidInput(format!(
                "sessionId exceeds {MAX_SESSION_ID_LEN} characters"
            )));
        }
        if self.message.text.trim().is_empty() {
            return Err(PipelineError::InvalidInput("message text must not be empty".into()));
        }
        if self.message.text.chars().count() > MAX_TEXT_LEN {
            return Err(PipelineError::InvalidInput(format!(
                "message text exceeds {MAX_TEXT_LEN} characters"
            )));
        }
        if self.message.timestamp_millis < 0 {
            return Err(PipelineError::InvalidInput("timestamp must not be negative".into()));
        }
        Ok(())
    }
}

// ── Replies ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Ignored,
}

/// Outbound reply contract: `{status, reply}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub status: ReplyStatus,
    pub reply: Option<String>,
}

impl AgentReply {
    pub fn success(reply: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Success,
            reply: Some(reply.into()),
        }
    }

    pub fn ignored() -> Self {
        Self {
            status: ReplyStatus::Ignored,
            reply: None,
        }
    }
}

// ── Tactics ─────────────────────────────────────────────────────────

/// Scam tactic category, attached to a conversation once its pattern fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticTag {
    Credential,
    Financial,
    Urgency,
    Threat,
    Verification,
    Link,
}

impl TacticTag {
    pub const ALL: [TacticTag; 6] = [
        Self::Credential,
        Self::Financial,
        Self::Urgency,
        Self::Threat,
        Self::Verification,
        Self::Link,
    ];

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Financial => "financial",
            Self::Urgency => "urgency",
            Self::Threat => "threat",
            Self::Verification => "verification",
            Self::Link => "link",
        }
    }

    /// Human-readable tactic name used in reasons and report notes.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Credential => "credential theft",
            Self::Financial => "financial exploitation",
            Self::Urgency => "urgency pressure",
            Self::Threat => "threat/coercion",
            Self::Verification => "verification phishing",
            Self::Link => "malicious link or download",
        }
    }

    /// Tags that ask the victim to hand something over or do something.
    pub fn is_demand(&self) -> bool {
        matches!(
            self,
            Self::Credential | Self::Financial | Self::Verification | Self::Link
        )
    }

    /// Tags that apply pressure rather than make a request.
    pub fn is_pressure(&self) -> bool {
        matches!(self, Self::Urgency | Self::Threat)
    }
}

impl std::fmt::Display for TacticTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ── Assessment ──────────────────────────────────────────────────────

/// Cumulative scam assessment for one conversation.
///
/// `score` never decreases and `detected` never flips back to false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamAssessment {
    pub score: u32,
    pub detected: bool,
    /// One entry per triggering category per turn, append-only.
    pub reasons: Vec<String>,
    /// Union of tags over the whole conversation, in first-seen order.
    pub tactic_tags: Vec<TacticTag>,
}

impl ScamAssessment {
    pub fn has_tag(&self, tag: TacticTag) -> bool {
        self.tactic_tags.contains(&tag)
    }

    /// Add a tag if not already present. Returns true when newly added.
    pub fn add_tag(&mut self, tag: TacticTag) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tactic_tags.push(tag);
        true
    }
}

// ── Intelligence ────────────────────────────────────────────────────

/// Kind of artifact an attacker can disclose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntelCategory {
    BankAccount,
    UpiId,
    PhishingLink,
    PhoneNumber,
    Email,
    CryptoAddress,
    IpAddress,
    SuspiciousKeyword,
}

impl IntelCategory {
    pub const ALL: [IntelCategory; 8] = [
        Self::BankAccount,
        Self::UpiId,
        Self::PhishingLink,
        Self::PhoneNumber,
        Self::Email,
        Self::CryptoAddress,
        Self::IpAddress,
        Self::SuspiciousKeyword,
    ];

    /// Severity a category starts at when its first value is recorded.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::BankAccount | Self::CryptoAddress => Severity::Critical,
            Self::UpiId | Self::PhishingLink | Self::PhoneNumber | Self::Email => Severity::High,
            Self::IpAddress | Self::SuspiciousKeyword => Severity::Medium,
        }
    }

    /// Key used in the report payload.
    pub fn report_key(&self) -> &'static str {
        match self {
            Self::BankAccount => "bankAccounts",
            Self::UpiId => "upiIds",
            Self::PhishingLink => "phishingLinks",
            Self::PhoneNumber => "phoneNumbers",
            Self::Email => "emailAddresses",
            Self::CryptoAddress => "cryptoAddresses",
            Self::IpAddress => "ipAddresses",
            Self::SuspiciousKeyword => "suspiciousKeywords",
        }
    }
}

impl std::fmt::Display for IntelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.report_key())
    }
}

/// Severity of an intelligence category. Ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

/// Values recorded for one category, in first-seen order, plus its severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelEntry {
    pub values: Vec<String>,
    pub severity: Severity,
}

/// Union-accumulated intelligence. Values are never removed, duplicates are
/// never stored, and a category's severity only rises.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedIntelligence {
    entries: BTreeMap<IntelCategory, IntelEntry>,
}

impl ExtractedIntelligence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Returns true when it was not already present.
    pub fn add(&mut self, category: IntelCategory, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }
        let entry = self.entries.entry(category).or_insert_with(|| IntelEntry {
            values: Vec::new(),
            severity: category.default_severity(),
        });
        if entry.values.contains(&value) {
            return false;
        }
        entry.values.push(value);
        true
    }

    /// Raise a category's severity. No-op for categories without values or
    /// when the current severity is already at least `severity`.
    pub fn raise_severity(&mut self, category: IntelCategory, severity: Severity) {
        if let Some(entry) = self.entries.get_mut(&category) {
            entry.severity = entry.severity.max(severity);
        }
    }

    /// Union-merge `other` into `self`. Returns the number of new values.
    pub fn merge(&mut self, other: &ExtractedIntelligence) -> usize {
        let mut added = 0;
        for (category, entry) in &other.entries {
            for value in &entry.values {
                if self.add(*category, value.clone()) {
                    added += 1;
                }
            }
            self.raise_severity(*category, entry.severity);
        }
        added
    }

    pub fn values(&self, category: IntelCategory) -> &[String] {
        self.entries
            .get(&category)
            .map(|e| e.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn severity(&self, category: IntelCategory) -> Option<Severity> {
        self.entries.get(&category).map(|e| e.severity)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|e| e.values.is_empty())
    }

    /// Count of recorded values across all categories.
    pub fn total_values(&self) -> usize {
        self.entries.values().map(|e| e.values.len()).sum()
    }

    /// Highest severity over categories that hold values.
    pub fn overall_severity(&self) -> Option<Severity> {
        self.entries
            .values()
            .filter(|e| !e.values.is_empty())
            .map(|e| e.severity)
            .max()
    }
}
