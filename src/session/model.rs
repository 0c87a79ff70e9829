//! Session aggregate and its lifecycle.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::types::{ExtractedIntelligence, Message, ScamAssessment, Severity, TacticTag};

/// Lifecycle of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Created, no message processed yet.
    New,
    /// At least one message processed. Replies start once a scam is detected.
    Engaged,
    /// Report built; no further messages accepted.
    Concluded,
    /// Idle past the session timeout.
    Expired,
}

impl SessionState {
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, target),
            (New, Engaged) | (New, Expired) | (Engaged, Concluded) | (Engaged, Expired)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Concluded | Self::Expired)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Engaged => "ENGAGED",
            Self::Concluded => "CONCLUDED",
            Self::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

/// All state for one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    /// Append-only, insertion order.
    pub history: Vec<Message>,
    pub intelligence: ExtractedIntelligence,
    pub assessment: ScamAssessment,
    /// Persona replies already used, oldest first.
    pub replies_sent: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub state: SessionState,
    /// Consecutive detected turns that produced no new intelligence.
    pub stale_turns: u32,
}

impl Session {
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
            intelligence: ExtractedIntelligence::new(),
            assessment: ScamAssessment::default(),
            replies_sent: Vec::new(),
            created_at: now,
            last_activity_at: now,
            state: SessionState::New,
            stale_turns: 0,
        }
    }

    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Move to `target` if the lifecycle allows it. Returns false otherwise.
    pub fn transition(&mut self, target: SessionState) -> bool {
        if !self.state.can_transition_to(target) {
            return false;
        }
        self.state = target;
        true
    }

    /// Idle for longer than `timeout` as of `now`.
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(self.last_activity_at) > timeout
    }

    /// Timestamps of every recorded message.
    pub fn known_timestamps(&self) -> Vec<i64> {
        self.history.iter().map(|m| m.timestamp_millis).collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            message_count: self.message_count(),
            scam_detected: self.assessment.detected,
            score: self.assessment.score,
            intelligence: self.intelligence.clone(),
            severity: self.intelligence.overall_severity(),
            state: self.state,
            reasons: self.assessment.reasons.clone(),
            tactic_tags: self.assessment.tactic_tags.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity_at,
        }
    }
}

/// Read-only view of a session for introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub message_count: usize,
    pub scam_detected: bool,
    pub score: u32,
    pub intelligence: ExtractedIntelligence,
    pub severity: Option<Severity>,
    pub state: SessionState,
    pub reasons: Vec<String>,
    pub tactic_tags: Vec<TacticTag>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_one_way() {
        use SessionState::*;

        assert!(New.can_transition_to(Engaged));
        assert!(New.can_transition_to(Expired));
        assert!(Engaged.can_transition_to(Concluded));
        assert!(Engaged.can_transition_to(Expired));

        assert!(!New.can_transition_to(Concluded));
        assert!(!Engaged.can_transition_to(New));
        assert!(!Concluded.can_transition_to(Engaged));
        assert!(!Concluded.can_transition_to(Expired));
        assert!(!Expired.can_transition_to(New));
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Concluded.is_terminal());
        assert!(SessionState::Expired.is_terminal());
        assert!(!SessionState::New.is_terminal());
        assert!(!SessionState::Engaged.is_terminal());
    }

    #[test]
    fn transition_rejects_invalid_target() {
        let mut session = Session::new("s1", Utc::now());
        assert!(!session.transition(SessionState::Concluded));
        assert_eq!(session.state, SessionState::New);
        assert!(session.transition(SessionState::Engaged));
        assert!(session.transition(SessionState::Concluded));
        assert!(!session.transition(SessionState::Expired));
    }

    #[test]
    fn idle_check_uses_last_activity() {
        let start = Utc::now();
        let session = Session::new("s1", start);
        let timeout = Duration::from_secs(30 * 60);

        assert!(!session.is_idle(start + chrono::Duration::minutes(30), timeout));
        assert!(session.is_idle(start + chrono::Duration::minutes(31), timeout));
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let mut session = Session::new("s1", Utc::now());
        session.history.push(Message::scammer("hi", 1));
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["messageCount"], 1);
        assert_eq!(json["scamDetected"], false);
        assert_eq!(json["state"], "NEW");
        assert!(json["severity"].is_null());
    }
}
