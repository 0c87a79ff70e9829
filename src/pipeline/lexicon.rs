//! Static scam lexicon: weighted tactic keywords and compiled artifact patterns.
//!
//! Everything here is built once on first use and read-only afterwards, so
//! any number of concurrent callers can share it without locking.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::TacticTag;

/// Keyword table for one tactic category.
#[derive(Debug)]
pub struct TacticLexicon {
    pub tag: TacticTag,
    /// Points per keyword occurrence.
    pub weight: u32,
    pub keywords: &'static [&'static str],
    matcher: Regex,
}

impl TacticLexicon {
    fn new(tag: TacticTag, weight: u32, keywords: &'static [&'static str]) -> Self {
        Self {
            tag,
            weight,
            keywords,
            matcher: word_alternation(keywords),
        }
    }

    /// Every keyword occurrence in `text`, lowercased, in order of appearance.
    pub fn occurrences(&self, text: &str) -> Vec<String> {
        self.matcher
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }
}

/// A non-keyword signal (a URL, an email-like domain) that scores under a tactic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSignal {
    pub tag: TacticTag,
    pub points: u32,
    pub label: &'static str,
}

const CREDENTIAL_KEYWORDS: &[&str] = &[
    "otp", "pin", "mpin", "password", "passcode", "cvv", "secret", "code",
];

const FINANCIAL_KEYWORDS: &[&str] = &[
    "bank", "account", "accounts", "upi", "payment", "transaction", "wallet", "credit",
    "debit", "refund", "kyc", "transfer",
];

const URGENCY_KEYWORDS: &[&str] = &[
    "urgent", "urgently", "immediately", "now", "asap", "quickly", "today", "hurry",
    "expire", "expires", "expiring", "deadline",
];

const THREAT_KEYWORDS: &[&str] = &[
    "block", "blocked", "suspend", "suspended", "freeze", "frozen", "cancel", "cancelled",
    "close", "closed", "locked", "unauthorized", "penalty", "legal", "police", "arrest",
];

const VERIFICATION_KEYWORDS: &[&str] = &[
    "verify", "confirm", "update", "validate", "authenticate", "share", "provide", "enter",
    "send",
];

const LINK_KEYWORDS: &[&str] = &["click", "download", "install", "link", "renew", "apk"];

/// Phrases in the victim's side of the chat that signal resistance.
const HESITATION_MARKERS: &[&str] = &[
    "why", "not sure", "can't", "cant", "can’t", "don't think", "dont think", "don’t think",
    "worried", "doubt", "hesitate", "is it safe",
];

/// Keywords reported as intelligence when an attacker uses them.
const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "urgent", "verify", "blocked", "suspended", "freeze", "confirm", "immediate", "claim",
    "update", "click", "download", "authenticate", "password", "otp", "pin", "cvv", "secret",
    "validate", "activate", "renew", "expire", "unauthorized", "secure", "protect", "danger",
    "limited", "today", "now", "asap", "hurry", "quickly", "immediately",
];

/// Closed list of UPI payment-service-provider handles.
const UPI_PROVIDERS: &[&str] = &[
    "upi", "ybl", "ibl", "axl", "apl", "yapl", "okaxis", "okhdfcbank", "okicici", "oksbi",
    "paytm", "ptyes", "ptaxis", "pthdfc", "ptsbi", "airtel", "freecharge", "jio", "sbi",
    "icici", "hdfcbank", "axisbank", "kotak", "barodampay", "unionbank", "pnb", "boi",
    "indus", "federal", "rbl", "idfcbank", "waaxis", "wahdfcbank", "wasbi", "waicici",
    "ikwik", "mobikwik", "fbl", "postbank", "aubank", "yesbank",
];

/// Throwaway-mailbox providers. Addresses on these are kept but flagged.
const DISPOSABLE_EMAIL_DOMAINS: &[&str] = &[
    "mailinator.com", "guerrillamail.com", "10minutemail.com", "tempmail.com",
    "temp-mail.org", "yopmail.com", "trashmail.com", "sharklasers.com", "getnada.com",
    "dispostable.com", "maildrop.cc", "throwawaymail.com", "fakeinbox.com",
];

/// Domain fragments that impersonate support or verification desks.
static SUSPICIOUS_DOMAIN_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(verify|secure|kyc|refund|support|helpdesk|reward)[\-.]").unwrap()
});

static TACTICS: LazyLock<Vec<TacticLexicon>> = LazyLock::new(|| {
    vec![
        TacticLexicon::new(TacticTag::Credential, 3, CREDENTIAL_KEYWORDS),
        TacticLexicon::new(TacticTag::Financial, 1, FINANCIAL_KEYWORDS),
        TacticLexicon::new(TacticTag::Urgency, 2, URGENCY_KEYWORDS),
        TacticLexicon::new(TacticTag::Threat, 2, THREAT_KEYWORDS),
        TacticLexicon::new(TacticTag::Verification, 1, VERIFICATION_KEYWORDS),
        TacticLexicon::new(TacticTag::Link, 2, LINK_KEYWORDS),
    ]
});

static HESITATION: LazyLock<Regex> = LazyLock::new(|| word_alternation(HESITATION_MARKERS));

static SUSPICIOUS: LazyLock<Regex> = LazyLock::new(|| word_alternation(SUSPICIOUS_KEYWORDS));

/// HTTP(S) links and bare `www.` hosts.
pub static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhttps?://[^\s<>"']+|\bwww\.[^\s<>"']+"#).unwrap()
});

pub static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}\b").unwrap()
});

/// An `@host.tld` fragment, used as a scoring signal.
pub static EMAIL_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[a-zA-Z0-9\-]+\.[a-zA-Z]{2,}").unwrap());

/// Candidate phone numbers; digits are validated against the numbering plan.
pub static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\+91[\s\-]?)?\b\d{10,12}\b").unwrap());

/// Contiguous digit runs long enough to be bank account numbers.
pub static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{9,18}\b").unwrap());

/// `handle@provider`; the provider is checked against [`is_upi_provider`].
pub static UPI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z0-9._\-]{2,})@([a-z]{2,})\b").unwrap());

pub static BITCOIN_LEGACY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b").unwrap());

pub static BITCOIN_BECH32: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbc1[a-z0-9]{39,59}\b").unwrap());

pub static ETHEREUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b0x[a-fA-F0-9]{40}\b").unwrap());

pub static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

/// Case-insensitive whole-word alternation over a fixed phrase list.
fn word_alternation(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
}

/// All tactic keyword tables, in tag declaration order.
pub fn tactics() -> &'static [TacticLexicon] {
    &TACTICS
}

/// Keyword table for one tag.
pub fn tactic(tag: TacticTag) -> &'static TacticLexicon {
    TACTICS
        .iter()
        .find(|t| t.tag == tag)
        .unwrap_or_else(|| unreachable!("every tactic tag has a keyword table"))
}

/// Non-keyword signals present in `text`.
pub fn pattern_signals(text: &str) -> Vec<PatternSignal> {
    let mut signals = Vec::new();
    if URL.is_match(text) {
        signals.push(PatternSignal {
            tag: TacticTag::Link,
            points: 3,
            label: "external link",
        });
    }
    if EMAIL_DOMAIN.is_match(text) {
        signals.push(PatternSignal {
            tag: TacticTag::Verification,
            points: 2,
            label: "suspicious domain",
        });
    }
    signals
}

/// Does `text` contain any hesitation marker?
pub fn shows_hesitation(text: &str) -> bool {
    HESITATION.is_match(text)
}

/// Distinct suspicious keywords in `text`, lowercased, in order of first appearance.
pub fn suspicious_keywords(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in SUSPICIOUS.find_iter(text) {
        let kw = m.as_str().to_lowercase();
        if !found.contains(&kw) {
            found.push(kw);
        }
    }
    found
}

pub fn is_upi_provider(provider: &str) -> bool {
    let provider = provider.to_ascii_lowercase();
    UPI_PROVIDERS.contains(&provider.as_str())
}

/// Disposable mailbox providers and support-desk lookalike domains.
pub fn is_flagged_email_domain(domain: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    DISPOSABLE_EMAIL_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{d}")))
        || SUSPICIOUS_DOMAIN_FRAGMENT.is_match(&domain)
}
