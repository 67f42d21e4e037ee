//! Conversation threads and their in-process store.

mod thread;

pub use thread::{Session, SessionStore};
