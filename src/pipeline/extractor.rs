//! Intelligence extraction: pulls payment identifiers, contacts and links
//! out of attacker messages.
//!
//! Each category is extracted independently. A failure in one category is
//! logged and skipped; the others still run.

use std::net::Ipv4Addr;

use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::pipeline::lexicon;
use crate::pipeline::types::{ExtractedIntelligence, IntelCategory, Message, Sender, Severity};

/// Window around a known timestamp inside which a 13-digit run is treated as
/// a millisecond timestamp rather than an account number.
const TIMESTAMP_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Characters stripped from the end of a matched link.
const LINK_TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// A single extracted value plus whether it should raise its category to critical.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Finding {
    value: String,
    flagged: bool,
}

impl Finding {
    fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            flagged: false,
        }
    }
}

/// Stateless extractor. Cheap to construct and safe to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntelligenceExtractor;

impl IntelligenceExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract from the incoming message and, separately, from the full
    /// scammer-side transcript, merging both by category union.
    ///
    /// `known_timestamps` are the millisecond timestamps of the messages being
    /// scanned; digit runs matching them are never reported as accounts.
    pub fn extract(
        &self,
        text: &str,
        history_text: &str,
        known_timestamps: &[i64],
    ) -> ExtractedIntelligence {
        let mut intel = self.scan(text, known_timestamps);
        if !history_text.trim().is_empty() {
            let from_history = self.scan(history_text, known_timestamps);
            intel.merge(&from_history);
        }
        debug!(values = intel.total_values(), "Extracted intelligence");
        intel
    }

    /// Concatenate the scammer's messages, oldest first.
    pub fn scammer_transcript(history: &[Message]) -> String {
        history
            .iter()
            .filter(|m| m.sender == Sender::Scammer)
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn scan(&self, text: &str, known_timestamps: &[i64]) -> ExtractedIntelligence {
        scan_with(text, known_timestamps, extract_category)
    }
}

/// Run `extract` for every category. A failing category is logged and skipped.
fn scan_with<F>(text: &str, known_timestamps: &[i64], extract: F) -> ExtractedIntelligence
where
    F: Fn(IntelCategory, &str, &[i64]) -> Result<Vec<Finding>, ExtractionError>,
{
    let mut intel = ExtractedIntelligence::new();
    for category in IntelCategory::ALL {
        match extract(category, text, known_timestamps) {
            Ok(findings) => {
                for finding in findings {
                    intel.add(category, finding.value);
                    if finding.flagged {
                        intel.raise_severity(category, Severity::Critical);
                    }
                }
            }
            Err(e) => {
                warn!(category = %category, error = %e, "Skipping intelligence category");
            }
        }
    }
    intel
}

fn extract_category(
    category: IntelCategory,
    text: &str,
    known_timestamps: &[i64],
) -> Result<Vec<Finding>, ExtractionError> {
    match category {
        IntelCategory::BankAccount => bank_accounts(text, known_timestamps),
        IntelCategory::UpiId => Ok(upi_ids(text)),
        IntelCategory::PhishingLink => Ok(links(text)),
        IntelCategory::PhoneNumber => Ok(phone_numbers(text)
            .into_iter()
            .map(Finding::plain)
            .collect()),
        IntelCategory::Email => Ok(emails(text)),
        IntelCategory::CryptoAddress => Ok(crypto_addresses(text)),
        IntelCategory::IpAddress => Ok(ip_addresses(text)),
        IntelCategory::SuspiciousKeyword => Ok(lexicon::suspicious_keywords(text)
            .into_iter()
            .map(Finding::plain)
            .collect()),
    }
}

fn bank_accounts(text: &str, known_timestamps: &[i64]) -> Result<Vec<Finding>, ExtractionError> {
    let link_spans: Vec<_> = lexicon::URL.find_iter(text).map(|l| l.range()).collect();
    let mut found = Vec::new();
    for m in lexicon::DIGIT_RUN.find_iter(text) {
        let candidate = m.as_str();
        if link_spans.iter().any(|span| span.start <= m.start() && m.end() <= span.end) {
            continue;
        }
        if is_timestamp_like(candidate, known_timestamps)? {
            debug!(candidate, "Digit run matches a message timestamp, not an account");
            continue;
        }
        if normalize_phone(candidate).is_some() {
            continue;
        }
        found.push(Finding::plain(candidate));
    }
    Ok(found)
}

/// Is this digit run one of the known timestamps (or close enough to be one)?
fn is_timestamp_like(candidate: &str, known_timestamps: &[i64]) -> Result<bool, ExtractionError> {
    for ts in known_timestamps.iter().filter(|t| **t > 0) {
        let ts_str = ts.to_string();
        if candidate == ts_str || ts_str.contains(candidate) || candidate.contains(&ts_str) {
            return Ok(true);
        }
    }

    let window = match candidate.len() {
        13 => Some((TIMESTAMP_WINDOW_MS, 1)),
        10 => Some((TIMESTAMP_WINDOW_MS / 1000, 1000)),
        _ => None,
    };
    if let Some((window, divisor)) = window {
        let value: i64 = candidate
            .parse()
            .map_err(|e: std::num::ParseIntError| ExtractionError::FieldFailure {
                category: IntelCategory::BankAccount.to_string(),
                reason: format!("digit run '{candidate}': {e}"),
            })?;
        if known_timestamps
            .iter()
            .filter(|t| **t > 0)
            .any(|t| (value - t / divisor).abs() <= window)
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Validate against the Indian numbering plan and normalize to `+91XXXXXXXXXX`.
fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("91") => &digits[2..],
        _ => return None,
    };
    match national.chars().next() {
        Some('6'..='9') => Some(format!("+91{national}")),
        _ => None,
    }
}

fn phone_numbers(text: &str) -> Vec<String> {
    lexicon::PHONE
        .find_iter(text)
        .filter_map(|m| normalize_phone(m.as_str()))
        .collect()
}

fn upi_ids(text: &str) -> Vec<Finding> {
    let mut found = Vec::new();
    for caps in lexicon::UPI.captures_iter(text) {
        let (Some(whole), Some(provider)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        if !lexicon::is_upi_provider(provider.as_str()) {
            continue;
        }
        // `name@provider.tld` is an email address, not a UPI handle.
        let mut rest = text[whole.end()..].chars();
        if rest.next() == Some('.') && rest.next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            continue;
        }
        found.push(Finding::plain(whole.as_str().to_lowercase()));
    }
    found
}

fn links(text: &str) -> Vec<Finding> {
    lexicon::URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(LINK_TRAILING_PUNCTUATION))
        .filter(|link| !link.is_empty())
        .map(Finding::plain)
        .collect()
}

fn emails(text: &str) -> Vec<Finding> {
    lexicon::EMAIL
        .find_iter(text)
        .map(|m| {
            let address = m.as_str().to_lowercase();
            let flagged = address
                .split_once('@')
                .is_some_and(|(_, domain)| lexicon::is_flagged_email_domain(domain));
            Finding {
                value: address,
                flagged,
            }
        })
        .collect()
}

fn crypto_addresses(text: &str) -> Vec<Finding> {
    [
        &lexicon::BITCOIN_LEGACY,
        &lexicon::BITCOIN_BECH32,
        &lexicon::ETHEREUM,
    ]
    .into_iter()
    .flat_map(|re| re.find_iter(text).map(|m| Finding::plain(m.as_str())))
    .collect()
}

fn ip_addresses(text: &str) -> Vec<Finding> {
    lexicon::IPV4
        .find_iter(text)
        .filter(|m| m.as_str().parse::<Ipv4Addr>().is_ok())
        .map(|m| Finding::plain(m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_MS: i64 = 1_770_000_000_000;

    fn extract(text: &str) -> ExtractedIntelligence {
        IntelligenceExtractor::new().extract(text, "", &[NOW_MS])
    }

    #[test]
    fn extracts_bank_account_and_upi() {
        let intel = extract("send OTP to 9876543210123456 or UPI scammer@upi");
        assert_eq!(intel.values(IntelCategory::BankAccount), ["9876543210123456"]);
        assert_eq!(intel.values(IntelCategory::UpiId), ["scammer@upi"]);
        assert!(intel.values(IntelCategory::PhoneNumber).is_empty());
    }

    #[test]
    fn repeated_extraction_merges_without_duplicates() {
        let text = "send OTP to 9876543210123456 or UPI scammer@upi";
        let extractor = IntelligenceExtractor::new();
        let mut state = ExtractedIntelligence::new();
        state.merge(&extractor.extract(text, text, &[NOW_MS]));
        state.merge(&extractor.extract(text, &format!("{text}\n{text}"), &[NOW_MS, NOW_MS + 5]));
        assert_eq!(state.values(IntelCategory::BankAccount).len(), 1);
        assert_eq!(state.values(IntelCategory::UpiId).len(), 1);
    }

    #[test]
    fn message_timestamp_is_not_an_account() {
        let intel = extract(&format!("Reference {NOW_MS} please verify"));
        assert!(intel.values(IntelCategory::BankAccount).is_empty());
    }

    #[test]
    fn nearby_millisecond_timestamp_is_not_an_account() {
        let intel = extract(&format!("sent at {}", NOW_MS - 60_000));
        assert!(intel.values(IntelCategory::BankAccount).is_empty());
    }

    #[test]
    fn unrelated_thirteen_digit_run_is_an_account() {
        let intel = extract("deposit to 4000123456789");
        assert_eq!(intel.values(IntelCategory::BankAccount), ["4000123456789"]);
    }

    #[test]
    fn digit_run_containing_timestamp_is_rejected() {
        let intel = extract(&format!("id {NOW_MS}12"));
        assert!(intel.values(IntelCategory::BankAccount).is_empty());
    }

    #[test]
    fn phone_numbers_are_normalized() {
        let intel = extract("Call +919876543210 or 08765432109 or +91 7654321098");
        assert_eq!(
            intel.values(IntelCategory::PhoneNumber),
            ["+919876543210", "+918765432109", "+917654321098"]
        );
        // Valid phones are not double-reported as accounts.
        assert!(intel.values(IntelCategory::BankAccount).is_empty());
    }

    #[test]
    fn phone_rejects_bad_prefix() {
        let intel = extract("call 1234567890 now");
        assert!(intel.values(IntelCategory::PhoneNumber).is_empty());
        assert_eq!(intel.values(IntelCategory::BankAccount), ["1234567890"]);
    }

    #[test]
    fn upi_on_unknown_provider_is_ignored() {
        let intel = extract("pay me at someone@notabank");
        assert!(intel.values(IntelCategory::UpiId).is_empty());
    }

    #[test]
    fn email_is_not_a_upi_handle() {
        let intel = extract("write to refunds@paytm.com today");
        assert!(intel.values(IntelCategory::UpiId).is_empty());
        assert_eq!(intel.values(IntelCategory::Email), ["refunds@paytm.com"]);
    }

    #[test]
    fn disposable_email_raises_severity() {
        let intel = extract("reply to agent@mailinator.com");
        assert_eq!(intel.values(IntelCategory::Email), ["agent@mailinator.com"]);
        assert_eq!(intel.severity(IntelCategory::Email), Some(Severity::Critical));

        let intel = extract("reply to agent@example.com");
        assert_eq!(intel.severity(IntelCategory::Email), Some(Severity::High));
    }

    #[test]
    fn links_are_trimmed() {
        let intel = extract("Click https://verify-bank.example/login. Or www.fake.example!");
        assert_eq!(
            intel.values(IntelCategory::PhishingLink),
            ["https://verify-bank.example/login", "www.fake.example"]
        );
    }

    #[test]
    fn invalid_ip_octets_are_rejected() {
        let intel = extract("hosts 192.168.1.1 and 999.1.1.1");
        assert_eq!(intel.values(IntelCategory::IpAddress), ["192.168.1.1"]);
    }

    #[test]
    fn crypto_addresses() {
        let intel = extract(
            "BTC 1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa or ETH 0x52908400098527886E0F7030069857D2E4169EE7",
        );
        assert_eq!(intel.values(IntelCategory::CryptoAddress).len(), 2);
        assert_eq!(intel.severity(IntelCategory::CryptoAddress), Some(Severity::Critical));
    }

    #[test]
    fn suspicious_keywords_collected() {
        let intel = extract("URGENT: verify your password now");
        let kws = intel.values(IntelCategory::SuspiciousKeyword);
        assert!(kws.contains(&"urgent".to_string()));
        assert!(kws.contains(&"password".to_string()));
    }

    #[test]
    fn history_scan_finds_earlier_intelligence() {
        let history = vec![
            Message::scammer("My UPI is fraud@ybl", NOW_MS - 10_000),
            Message::user("why?", NOW_MS - 5_000),
        ];
        let transcript = IntelligenceExtractor::scammer_transcript(&history);
        let intel = IntelligenceExtractor::new().extract("hurry up", &transcript, &[NOW_MS]);
        assert_eq!(intel.values(IntelCategory::UpiId), ["fraud@ybl"]);
    }

    #[test]
    fn transcript_skips_user_messages() {
        let history = vec![
            Message::scammer("first", 1),
            Message::user("my account 123456789012", 2),
            Message::scammer("second", 3),
        ];
        assert_eq!(IntelligenceExtractor::scammer_transcript(&history), "first\nsecond");
    }

    #[test]
    fn digits_inside_a_link_are_not_an_account() {
        let intel = extract("pay here https://x.example/pay/123456789012 or to 4000123456789");
        assert_eq!(intel.values(IntelCategory::PhishingLink), ["https://x.example/pay/123456789012"]);
        assert_eq!(intel.values(IntelCategory::BankAccount), ["4000123456789"]);
    }

    #[test]
    fn failing_category_does_not_block_others() {
        let intel = scan_with("UPI scammer@upi, account 9876543210123456", &[NOW_MS], |category, text, ts| {
            if category == IntelCategory::BankAccount {
                return Err(ExtractionError::FieldFailure {
                    category: category.to_string(),
                    reason: "unreadable".into(),
                });
            }
            extract_category(category, text, ts)
        });
        assert!(intel.values(IntelCategory::BankAccount).is_empty());
        assert_eq!(intel.values(IntelCategory::UpiId), ["scammer@upi"]);
    }

    #[test]
    fn plain_text_yields_nothing() {
        assert!(extract("Hi, how are you?").is_empty());
    }
}
