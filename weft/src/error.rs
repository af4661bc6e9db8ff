//! Error types and message-based classification.
//!
//! [`AgentError`] is the propagation type used by `Result` + `?` throughout
//! the crate. [`classify`] answers the retryability question from an error
//! message alone, so errors surfacing from LLM transports and tool executors
//! (which arrive as strings) classify the same way as internal ones.

use std::time::Duration;

use thiserror::Error;

/// Execution error for agents, the loop, the executor, and the orchestrator.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (LLM call failed, tool dispatch
    /// failed, summarization failed).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The workflow graph failed validation; nothing was run.
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// No registered agent matched a node's type tag.
    #[error("no agent found for type '{0}'")]
    AgentNotFound(String),

    /// A node exceeded its deadline. Never retried.
    #[error("agent timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The workflow was cancelled. Latching; never retried.
    #[error("workflow cancelled")]
    Cancelled,
}

/// Semantic category of an error, decided by message inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Validation,
    AgentNotFound,
    Execution,
    Unknown,
}

/// Coarse severity attached to each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Classification result: kind, severity, and whether a retry can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClass {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub retryable: bool,
}

const NETWORK_PATTERNS: [&str; 5] = [
    "econnrefused",
    "etimedout",
    "enotfound",
    "network",
    "fetch failed",
];
const VALIDATION_PATTERNS: [&str; 3] = ["invalid", "validation", "circular dependency"];
const EXECUTION_PATTERNS: [&str; 3] = ["execution", "failed to execute", "runtime error"];

/// Classifies an error by case-insensitive substring match on its message.
///
/// Deterministic: the same message always yields the same kind and the same
/// retryability answer. Only network and timeout errors are retryable.
pub fn classify(message: &str) -> ErrorClass {
    let m = message.to_lowercase();

    if NETWORK_PATTERNS.iter().any(|p| m.contains(p)) {
        return ErrorClass {
            kind: ErrorKind::Network,
            severity: Severity::Medium,
            retryable: true,
        };
    }
    if m.contains("timeout") {
        return ErrorClass {
            kind: ErrorKind::Timeout,
            severity: Severity::Low,
            retryable: true,
        };
    }
    if VALIDATION_PATTERNS.iter().any(|p| m.contains(p)) {
        return ErrorClass {
            kind: ErrorKind::Validation,
            severity: Severity::High,
            retryable: false,
        };
    }
    if (m.contains("agent") && m.contains("not found")) || m.contains("no agent found") {
        return ErrorClass {
            kind: ErrorKind::AgentNotFound,
            severity: Severity::High,
            retryable: false,
        };
    }
    if EXECUTION_PATTERNS.iter().any(|p| m.contains(p)) {
        return ErrorClass {
            kind: ErrorKind::Execution,
            severity: Severity::Medium,
            retryable: false,
        };
    }
    ErrorClass {
        kind: ErrorKind::Unknown,
        severity: Severity::Medium,
        retryable: false,
    }
}

impl AgentError {
    /// Classifies this error. Timeout and cancellation carry their category
    /// directly; everything else goes through the message table.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout(_) => ErrorClass {
                kind: ErrorKind::Timeout,
                severity: Severity::Low,
                retryable: true,
            },
            Self::AgentNotFound(_) => ErrorClass {
                kind: ErrorKind::AgentNotFound,
                severity: Severity::High,
                retryable: false,
            },
            Self::InvalidWorkflow(_) => ErrorClass {
                kind: ErrorKind::Validation,
                severity: Severity::High,
                retryable: false,
            },
            Self::Cancelled => ErrorClass {
                kind: ErrorKind::Unknown,
                severity: Severity::High,
                retryable: false,
            },
            Self::ExecutionFailed(m) => classify(m),
        }
    }
}
