//! Reply selection for the honeypot persona.
//!
//! Replies come from fixed template pools keyed by tactic. The persona plays a
//! confused but cooperative victim: it asks questions and never hands
//! anything over. Selection is a pure function of the active tags and the
//! replies already sent, so the same conversation always gets the same reply.

use tracing::debug;

use crate::pipeline::types::TacticTag;

/// Template pool, in descending priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResponsePool {
    Credential,
    Financial,
    Threat,
    Verification,
    Default,
}

impl ResponsePool {
    /// Highest priority first.
    pub const PRIORITY: [ResponsePool; 5] = [
        Self::Credential,
        Self::Financial,
        Self::Threat,
        Self::Verification,
        Self::Default,
    ];

    /// Pool that answers a tactic.
    pub fn for_tag(tag: TacticTag) -> Self {
        match tag {
            TacticTag::Credential => Self::Credential,
            TacticTag::Financial => Self::Financial,
            TacticTag::Urgency | TacticTag::Threat => Self::Threat,
            TacticTag::Verification | TacticTag::Link => Self::Verification,
        }
    }

    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            Self::Credential => CREDENTIAL_REPLIES,
            Self::Financial => FINANCIAL_REPLIES,
            Self::Threat => THREAT_REPLIES,
            Self::Verification => VERIFICATION_REPLIES,
            Self::Default => DEFAULT_REPLIES,
        }
    }
}

const CREDENTIAL_REPLIES: &[&str] = &[
    "Why do you need my OTP? I've heard it's dangerous.",
    "Is it safe to share OTP? What will you use it for?",
    "Can someone misuse my OTP if I share it?",
    "Should I really share my password? That sounds risky.",
    "I don't think it's safe to share passwords. Right?",
    "You're asking for my CVV? That's the security code, right?",
    "Why would you need my CVV to verify my account?",
];

const FINANCIAL_REPLIES: &[&str] = &[
    "Which account are you talking about? I have two.",
    "I'm not sure what UPI is, can you explain?",
    "Is it safe to share my UPI ID? I'm worried about security.",
    "Can you tell me why you need my UPI ID?",
    "Where should the money go? Can you send me the details again?",
];

const THREAT_REPLIES: &[&str] = &[
    "Why is my account blocked? What did I do?",
    "Why is this so urgent? What happens if I don't act now?",
    "When will my account be unblocked? How long does it take?",
    "How much time do I have to respond?",
    "Is there another way to resolve this without verification?",
    "Is this really an emergency? Can it wait?",
];

const VERIFICATION_REPLIES: &[&str] = &[
    "How will the verification process work?",
    "Can you explain what this link is for?",
    "Is this link safe to click? Where does it take me?",
    "Why do I need to download an app to verify my account?",
    "What happens after I verify? Is my account safe?",
    "Can you explain this verification process?",
];

const DEFAULT_REPLIES: &[&str] = &[
    "Can you explain that more clearly?",
    "I didn't understand. Can you rephrase?",
    "What exactly are you asking me to do?",
    "Can you provide more details?",
    "I'm confused about this. Help me understand.",
];

/// Picks the persona's next reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseSelector;

impl ResponseSelector {
    pub fn new() -> Self {
        Self
    }

    /// Choose a reply for the currently active `tags`, avoiding anything in
    /// `replies_sent`.
    ///
    /// Order of preference:
    /// 1. the first unused template of the highest-priority active pool;
    /// 2. the first unused template of any pool, lowest priority first;
    /// 3. the default template whose last use is oldest.
    pub fn select(&self, tags: &[TacticTag], replies_sent: &[String]) -> String {
        let active = active_pool(tags);
        let unused = |pool: ResponsePool| {
            pool.templates()
                .iter()
                .find(|t| !replies_sent.iter().any(|r| r == *t))
                .copied()
        };

        if let Some(reply) = unused(active) {
            debug!(pool = ?active, "Selected reply");
            return reply.to_string();
        }

        for pool in ResponsePool::PRIORITY.iter().rev() {
            if let Some(reply) = unused(*pool) {
                debug!(active = ?active, pool = ?pool, "Active pool exhausted, falling back");
                return reply.to_string();
            }
        }

        // Every template has been used at least once.
        let reply = DEFAULT_REPLIES
            .iter()
            .min_by_key(|t| replies_sent.iter().rposition(|r| r == *t))
            .copied()
            .unwrap_or(DEFAULT_REPLIES[0]);
        debug!("All reply pools exhausted, reusing least recent default");
        reply.to_string()
    }
}

/// Highest-priority pool among `tags`; the default pool when there are none.
fn active_pool(tags: &[TacticTag]) -> ResponsePool {
    tags.iter()
        .map(|t| ResponsePool::for_tag(*t))
        .min()
        .unwrap_or(ResponsePool::Default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_templates() -> Vec<String> {
        ResponsePool::PRIORITY
            .iter()
            .flat_map(|p| p.templates().iter().map(|t| t.to_string()))
            .collect()
    }

    #[test]
    fn credential_outranks_urgency() {
        let reply = ResponseSelector::new().select(&[TacticTag::Urgency, TacticTag::Credential], &[]);
        assert_eq!(reply, CREDENTIAL_REPLIES[0]);
    }

    #[test]
    fn no_tags_uses_default_pool() {
        let reply = ResponseSelector::new().select(&[], &[]);
        assert_eq!(reply, DEFAULT_REPLIES[0]);
    }

    #[test]
    fn link_maps_to_verification_pool() {
        let reply = ResponseSelector::new().select(&[TacticTag::Link], &[]);
        assert_eq!(reply, VERIFICATION_REPLIES[0]);
    }

    #[test]
    fn selection_is_deterministic() {
        let s = ResponseSelector::new();
        let sent = vec![THREAT_REPLIES[0].to_string()];
        let a = s.select(&[TacticTag::Threat], &sent);
        let b = s.select(&[TacticTag::Threat], &sent);
        assert_eq!(a, b);
        assert_eq!(a, THREAT_REPLIES[1]);
    }

    #[test]
    fn never_repeats_until_every_pool_is_exhausted() {
        let s = ResponseSelector::new();
        let total = all_templates().len();
        let mut sent: Vec<String> = Vec::new();

        for _ in 0..total {
            let reply = s.select(&[TacticTag::Credential], &sent);
            assert!(!sent.contains(&reply), "repeated reply: {reply}");
            sent.push(reply);
        }

        let mut sorted = sent.clone();
        sorted.sort();
        let mut expected = all_templates();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn exhausted_pool_falls_back_to_default_first() {
        let sent: Vec<String> = CREDENTIAL_REPLIES.iter().map(|t| t.to_string()).collect();
        let reply = ResponseSelector::new().select(&[TacticTag::Credential], &sent);
        assert_eq!(reply, DEFAULT_REPLIES[0]);
    }

    #[test]
    fn fallback_climbs_from_default_upward() {
        let mut sent: Vec<String> = CREDENTIAL_REPLIES.iter().map(|t| t.to_string()).collect();
        sent.extend(DEFAULT_REPLIES.iter().map(|t| t.to_string()));
        let reply = ResponseSelector::new().select(&[TacticTag::Credential], &sent);
        assert_eq!(reply, VERIFICATION_REPLIES[0]);
    }

    #[test]
    fn full_exhaustion_reuses_least_recent_default() {
        let mut sent = all_templates();
        // Move the first default template to the end so the second one is the oldest.
        let first_default = DEFAULT_REPLIES[0].to_string();
        sent.retain(|r| *r != first_default);
        sent.push(first_default);

        let reply = ResponseSelector::new().select(&[TacticTag::Financial], &sent);
        assert_eq!(reply, DEFAULT_REPLIES[1]);
    }
}
