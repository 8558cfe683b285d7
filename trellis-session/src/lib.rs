//! Conversation sessions and user preferences for Trellis.
//!
//! A session tracks one clarification dialogue from creation to completion;
//! the [`SessionManager`] enforces expiry and archives finished sessions to
//! plan history. [`UserPreferences`] hold per-user planning defaults that
//! stages and agents fold into their prompts.

mod manager;
mod preferences;
mod session;
mod store;

pub use manager::SessionManager;
pub use preferences::{InMemoryPreferencesStore, PreferencesStore, UserPreferences};
pub use session::{ConversationSession, MessageRole, SessionMessage, SessionStatus};
pub use store::{InMemorySessionStore, SessionStore};
