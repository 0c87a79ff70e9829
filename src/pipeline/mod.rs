//! Message analysis pipeline.
//!
//! Every inbound message flows through:
//! 1. `ScamScorer::evaluate()`: weighted lexicon matches, cumulative score
//! 2. `IntelligenceExtractor::extract()`: artifacts from the message and transcript
//! 3. `ResponseSelector::select()`: the persona's next reply
//! 4. `ConversationOrchestrator`: ties the steps together per session
//!
//! **No reply is sent until the conversation is detected as a scam.**

pub mod extractor;
pub mod lexicon;
pub mod orchestrator;
pub mod responder;
pub mod scorer;
pub mod types;
