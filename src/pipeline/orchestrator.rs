//! Conversation orchestrator: drives one inbound message through the pipeline.
//!
//! Flow per message:
//! 1. Validate, then fetch-or-create the session and take its lock
//! 2. Lazy expiry; terminal sessions are rejected
//! 3. `ScamScorer::evaluate()` on scammer messages
//! 4. Once detected: `IntelligenceExtractor::extract()`, then `ResponseSelector::select()`
//! 5. Conclusion check on every message; a concluded session that detected a
//!    scam hands its report to the sink
//!
//! Steps 3–5 run on a clone of the session. The clone replaces the stored
//! session in one assignment, so a request dropped mid-way leaves the last
//! committed state untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::extractor::IntelligenceExtractor;
use crate::pipeline::responder::ResponseSelector;
use crate::pipeline::scorer::ScamScorer;
use crate::pipeline::types::{AgentReply, InboundMessage, Message, Sender};
use crate::report::{FinalReport, ReportSink, dispatch_detached};
use crate::session::{Session, SessionHandle, SessionSnapshot, SessionState, SessionStore};

/// The only component that calls scorer, extractor, responder and sink.
pub struct ConversationOrchestrator {
    config: PipelineConfig,
    store: Arc<SessionStore>,
    sink: Arc<dyn ReportSink>,
    scorer: ScamScorer,
    extractor: IntelligenceExtractor,
    responder: ResponseSelector,
}

impl ConversationOrchestrator {
    pub fn new(config: PipelineConfig, store: Arc<SessionStore>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            scorer: ScamScorer::new(config.scam_threshold),
            extractor: IntelligenceExtractor::new(),
            responder: ResponseSelector::new(),
            config,
            store,
            sink,
        }
    }

    /// Process one inbound message.
    pub async fn process(&self, inbound: InboundMessage) -> Result<AgentReply, PipelineError> {
        self.process_at(inbound, Utc::now()).await
    }

    /// Process one inbound message as of `now`.
    pub async fn process_at(
        &self,
        inbound: InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<AgentReply, PipelineError> {
        inbound.validate()?;
        let session_id = inbound.session_id.trim().to_string();

        let handle = self.store.get_or_create(&session_id, now).await;
        let mut guard = handle.lock().await;

        self.expire_if_idle(&handle, &mut guard, now).await;
        if guard.state.is_terminal() {
            debug!(session_id = %session_id, state = %guard.state, "Rejecting message for closed session");
            return Err(PipelineError::SessionClosed {
                session_id,
                state: guard.state.to_string(),
            });
        }

        if inbound.conversation_history.len() > guard.history.len() {
            warn!(
                session_id = %session_id,
                client = inbound.conversation_history.len(),
                stored = guard.history.len(),
                "Client history is ahead of stored history; using stored history"
            );
        }

        let mut session = guard.clone();
        let (reply, report) = self.advance(&mut session, &inbound, now);
        *guard = session;
        drop(guard);

        if let Some(report) = report {
            dispatch_detached(Arc::clone(&self.sink), report, self.config.report_timeout);
        }

        Ok(reply)
    }

    /// Read-only view of a session. Applies lazy expiry first.
    pub async fn session_snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        let handle = self.store.get(session_id).await?;
        let mut guard = handle.lock().await;
        self.expire_if_idle(&handle, &mut guard, Utc::now()).await;
        Some(guard.snapshot())
    }

    /// Expire every idle session as of `now`. Returns how many expired.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let expired = self
            .store
            .expire_idle(now, self.config.session_timeout)
            .await;
        for session in &expired {
            self.report_on_expiry(session);
        }
        expired.len()
    }

    /// Number of sessions currently held in memory.
    pub async fn active_sessions(&self) -> usize {
        self.store.count().await
    }

    /// Apply one message to `session`. Returns the reply and, when the
    /// session concluded on this turn with a detected scam, its report.
    fn advance(
        &self,
        session: &mut Session,
        inbound: &InboundMessage,
        now: DateTime<Utc>,
    ) -> (AgentReply, Option<FinalReport>) {
        let reply = self.respond(session, inbound, now);
        if !self.should_conclude(session) {
            return (reply, None);
        }

        session.transition(SessionState::Concluded);
        info!(
            session_id = %session.session_id,
            messages = session.message_count(),
            detected = session.assessment.detected,
            intelligence = session.intelligence.total_values(),
            "Session concluded"
        );
        let report = session
            .assessment
            .detected
            .then(|| FinalReport::from_session(session));
        (reply, report)
    }

    /// Record the message and, once a scam is detected, extract and reply.
    fn respond(&self, session: &mut Session, inbound: &InboundMessage, now: DateTime<Utc>) -> AgentReply {
        let message = &inbound.message;
        session.transition(SessionState::Engaged);
        session.last_activity_at = now;

        if message.sender == Sender::User {
            session.history.push(message.clone());
            debug!(session_id = %session.session_id, "Recorded user-side message");
            return AgentReply::ignored();
        }

        let was_detected = session.assessment.detected;
        let outcome = self
            .scorer
            .evaluate(message, &session.assessment, &session.history);
        session.assessment = outcome.assessment;

        let transcript = IntelligenceExtractor::scammer_transcript(&session.history);
        session.history.push(message.clone());

        if !session.assessment.detected {
            debug!(
                session_id = %session.session_id,
                score = session.assessment.score,
                "Below scam threshold, ignoring"
            );
            return AgentReply::ignored();
        }
        if !was_detected {
            info!(
                session_id = %session.session_id,
                score = session.assessment.score,
                tags = ?session.assessment.tactic_tags,
                "Scam detected, engaging"
            );
        }

        let mut known_timestamps = session.known_timestamps();
        known_timestamps.extend(inbound.conversation_history.iter().map(|m| m.timestamp_millis));
        let found = self
            .extractor
            .extract(&message.text, &transcript, &known_timestamps);
        let added = session.intelligence.merge(&found);
        session.stale_turns = if added > 0 { 0 } else { session.stale_turns + 1 };
        if added > 0 {
            info!(session_id = %session.session_id, added, "New intelligence extracted");
        }

        let tags = if outcome.turn.tags.is_empty() {
            session.assessment.tactic_tags.clone()
        } else {
            outcome.turn.tags
        };
        let reply = self.responder.select(&tags, &session.replies_sent);
        session.replies_sent.push(reply.clone());
        session
            .history
            .push(Message::user(reply.clone(), now.timestamp_millis()));

        AgentReply::success(reply)
    }

    /// Max-message cap on every session, or the plateau heuristic once enough
    /// messages exist.
    fn should_conclude(&self, session: &Session) -> bool {
        let count = session.message_count();
        if count >= self.config.max_messages_per_session {
            return true;
        }

        let plateaued = self.config.plateau_turns > 0
            && !session.intelligence.is_empty()
            && session.stale_turns >= self.config.plateau_turns;
        count >= self.config.min_messages_before_report && plateaued
    }

    /// Expire a locked session if it has been idle too long, removing it
    /// from the store.
    async fn expire_if_idle(&self, handle: &SessionHandle, session: &mut Session, now: DateTime<Utc>) {
        if session.state.is_terminal() || !session.is_idle(now, self.config.session_timeout) {
            return;
        }
        session.transition(SessionState::Expired);
        info!(session_id = %session.session_id, "Session expired on access");
        self.store.remove_if_same(&session.session_id, handle).await;
        self.report_on_expiry(session);
    }

    /// An abandoned engagement that already detected a scam still reports.
    fn report_on_expiry(&self, session: &Session) {
        if session.assessment.detected
            && session.message_count() >= self.config.min_messages_before_report
        {
            dispatch_detached(
                Arc::clone(&self.sink),
                FinalReport::from_session(session),
                self.config.report_timeout,
            );
        } else {
            debug!(session_id = %session.session_id, "Discarding expired session without report");
        }
    }
}

/// Spawn a background task that periodically expires idle sessions.
pub fn spawn_expiry_task(
    orchestrator: Arc<ConversationOrchestrator>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        loop {
            interval.tick().await;
            orchestrator.sweep_expired(Utc::now()).await;
        }
    })
}
