//! Per-conversation state and its in-memory store.

pub mod model;
pub mod store;

pub use model::{Session, SessionSnapshot, SessionState};
pub use store::{SessionHandle, SessionStore};
