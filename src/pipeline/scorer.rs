//! Scam scoring: turns lexicon matches into a cumulative risk score.

use tracing::debug;

use crate::pipeline::lexicon;
use crate::pipeline::types::{Message, ScamAssessment, Sender, TacticTag};

/// Keyword occurrences counted per category per message.
pub const CATEGORY_OCCURRENCE_CAP: u32 = 3;

/// Financial context + a requested action + urgency in one message.
pub const COMBINATION_BONUS: u32 = 5;

/// Scammer pressing the same tactic after the victim pushed back.
pub const ESCALATION_BONUS: u32 = 3;

/// What a single message contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnScore {
    /// Points scored by this message alone.
    pub raw: u32,
    /// Tags matched by this message, in lexicon order.
    pub tags: Vec<TacticTag>,
    /// Reasons produced by this message.
    pub reasons: Vec<String>,
    pub escalated: bool,
}

/// Result of scoring one message against the prior assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub assessment: ScamAssessment,
    pub turn: TurnScore,
}

/// Cumulative scam scorer.
#[derive(Debug, Clone)]
pub struct ScamScorer {
    threshold: u32,
}

impl ScamScorer {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Score `message` on top of `prior`. The returned assessment never has a
    /// lower score than `prior`, and never un-detects.
    pub fn score(
        &self,
        message: &Message,
        prior: &ScamAssessment,
        history: &[Message],
    ) -> ScamAssessment {
        self.evaluate(message, prior, history).assessment
    }

    /// Like [`score`](Self::score), but also reports the per-turn breakdown.
    pub fn evaluate(
        &self,
        message: &Message,
        prior: &ScamAssessment,
        history: &[Message],
    ) -> ScoreOutcome {
        let turn = self.score_turn(message, prior, history);

        let mut assessment = prior.clone();
        assessment.score = prior.score.saturating_add(turn.raw);
        assessment.detected = prior.detected || assessment.score >= self.threshold;
        assessment.reasons.extend(turn.reasons.iter().cloned());
        for tag in &turn.tags {
            assessment.add_tag(*tag);
        }

        debug!(
            raw = turn.raw,
            score = assessment.score,
            detected = assessment.detected,
            escalated = turn.escalated,
            "Scored message"
        );

        ScoreOutcome { assessment, turn }
    }

    fn score_turn(
        &self,
        message: &Message,
        prior: &ScamAssessment,
        history: &[Message],
    ) -> TurnScore {
        let text = &message.text;
        let signals = lexicon::pattern_signals(text);

        let mut raw = 0u32;
        let mut tags = Vec::new();
        let mut reasons = Vec::new();

        for table in lexicon::tactics() {
            let hits = table.occurrences(text);
            let tag_signals: Vec<_> = signals.iter().filter(|s| s.tag == table.tag).collect();
            if hits.is_empty() && tag_signals.is_empty() {
                continue;
            }

            let counted = (hits.len() as u32).min(CATEGORY_OCCURRENCE_CAP);
            let points = table.weight * counted + tag_signals.iter().map(|s| s.points).sum::<u32>();
            raw += points;
            tags.push(table.tag);

            let mut evidence: Vec<&str> = Vec::new();
            for hit in &hits {
                if !evidence.contains(&hit.as_str()) {
                    evidence.push(hit);
                }
            }
            evidence.extend(tag_signals.iter().map(|s| s.label));
            reasons.push(format!(
                "{}: {} (+{points})",
                table.tag.describe(),
                evidence.join(", ")
            ));
        }

        if tags.contains(&TacticTag::Financial)
            && tags.contains(&TacticTag::Verification)
            && tags.contains(&TacticTag::Urgency)
        {
            raw += COMBINATION_BONUS;
            reasons.push(format!("classic scam pattern (+{COMBINATION_BONUS})"));
        }

        let repeats_demand = tags.iter().any(|t| t.is_demand() && prior.has_tag(*t));
        let intensifies = tags.iter().any(|t| t.is_pressure())
            && tags.iter().any(|t| prior.has_tag(*t));
        let escalated = (repeats_demand || intensifies) && last_user_hesitated(history);
        if escalated {
            raw += ESCALATION_BONUS;
            reasons.push(format!(
                "escalation despite user hesitation (+{ESCALATION_BONUS})"
            ));
        }

        TurnScore {
            raw,
            tags,
            reasons,
            escalated,
        }
    }
}

/// Did the victim's most recent message push back?
fn last_user_hesitated(history: &[Message]) -> bool {
    history
        .iter()
        .rev()
        .find(|m| m.sender == Sender::User)
        .is_some_and(|m| lexicon::shows_hesitation(&m.text))
}
