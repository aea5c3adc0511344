//! Output formatting utilities for the CLI.

use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate `s` to at most `max_len` characters, appending `...` when
/// it was cut. Operates on chars, not bytes, so it never splits a
/// multi-byte UTF-8 sequence.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}
