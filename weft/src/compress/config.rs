//! Compression configuration: ceilings for conversation history.

/// Controls when conversation history is collapsed into a summary.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Whether the context manager may rewrite history at all.
    pub enabled: bool,
    /// Message-count ceiling; above this the history is compressed.
    pub max_messages: usize,
    /// Token ceiling (heuristic estimate); above this the history is compressed.
    pub max_tokens: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages: 20,
            max_tokens: 8000,
        }
    }
}
