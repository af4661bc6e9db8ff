//! The per-invocation reason–act driver.
//!
//! [`ReactRunner::run`] alternates LLM calls with in-order tool dispatch
//! until a text-only response, a sentinel final result, or the iteration
//! cap ends the loop. Conversation history is owned by one invocation and
//! discarded when it returns; compression replaces it wholesale, never
//! partially.

mod runner;

pub use runner::{LoopOutcome, ReactOptions, ReactRunner, TextCallback};
