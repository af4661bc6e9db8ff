//! Token estimation and pair-safe suffix selection.
//!
//! Token counts use a heuristic (~4 chars per token). Suffix selection picks
//! the most recent messages to preserve verbatim and then extends backwards
//! so that no tool-result message is separated from the assistant message
//! that issued its tool call.

use std::collections::HashMap;

use crate::message::Message;

/// Heuristic: approximate characters per token for English/mixed text.
const CHARS_PER_TOKEN: usize = 4;

/// Heuristic token estimate over a message slice.
pub fn estimate_tokens(messages: &[Message]) -> u32 {
    let chars: usize = messages.iter().map(Message::approx_chars).sum();
    (chars / CHARS_PER_TOKEN) as u32
}

/// Returns the start index of the preserved suffix.
///
/// Starts from the last `keep_recent` messages, shrinks while the suffix
/// alone exceeds `token_budget`, then extends backwards until every
/// tool-result in the suffix has its issuing assistant message inside too.
/// Pair extension takes precedence over the token budget.
pub fn preserved_suffix_start(
    messages: &[Message],
    keep_recent: usize,
    token_budget: u32,
) -> usize {
    if messages.is_empty() {
        return 0;
    }
    let mut start = messages.len().saturating_sub(keep_recent.max(1));

    // Shrink while over budget (always keep at least the last message).
    while start < messages.len() - 1 && estimate_tokens(&messages[start..]) > token_budget {
        start += 1;
    }

    // Map call id → index of the assistant message that issued it.
    let mut issued_at: HashMap<&str, usize> = HashMap::new();
    for (idx, m) in messages.iter().enumerate() {
        for id in m.tool_call_ids() {
            issued_at.insert(id, idx);
        }
    }

    // Extend until stable: pulling in an assistant message may pull in
    // results of even earlier calls sitting between it and the old start.
    loop {
        let mut extended = start;
        for (idx, m) in messages.iter().enumerate().skip(start) {
            if let Some(call_id) = m.answered_call_id() {
                if let Some(&assistant_idx) = issued_at.get(call_id) {
                    if assistant_idx < extended && idx >= extended {
                        extended = assistant_idx;
                    }
                }
            }
        }
        if extended == start {
            return start;
        }
        start = extended;
    }
}
