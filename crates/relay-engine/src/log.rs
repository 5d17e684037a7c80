//! Append-only attempt logs.
//!
//! Every executed dispatch attempt produces exactly one [`AttemptLog`]
//! row, success or failure. Rows are never updated or deleted by the
//! pipeline; retention is a concern of the surrounding deployment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relay_core::TaskId;

/// Maximum stored length of a response body, in characters.
pub const RESPONSE_BODY_MAX_CHARS: usize = 2_000;

/// Maximum stored length of an error message, in characters.
pub const ERROR_MESSAGE_MAX_CHARS: usize = 1_000;

/// One delivery attempt for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLog {
    /// The task this attempt belongs to.
    pub task_id: TaskId,
    /// 1-based attempt number, strictly increasing per task.
    pub attempt_number: u32,
    /// HTTP status observed, if the target answered at all.
    pub http_status: Option<u16>,
    /// Response body, truncated to [`RESPONSE_BODY_MAX_CHARS`].
    pub response_body: Option<String>,
    /// Failure description, truncated to [`ERROR_MESSAGE_MAX_CHARS`].
    pub error_message: Option<String>,
    /// Wall-clock duration of the attempt in milliseconds.
    pub latency_ms: u64,
    /// Whether the attempt delivered successfully.
    pub success: bool,
    /// When the row was appended.
    pub created_at: DateTime<Utc>,
}

/// Truncates a string to at most `max_chars` characters.
///
/// Operates on character boundaries so multi-byte content is never split.
/// The stored value never exceeds the cap.
#[must_use]
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_index, _)) => value[..byte_index].to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(truncate_chars("ok", 10), "ok");
        assert_eq!(truncate_chars("", 10), "");
    }

    #[test]
    fn long_strings_are_cut_to_the_cap() {
        let long = "x".repeat(RESPONSE_BODY_MAX_CHARS + 500);
        let cut = truncate_chars(&long, RESPONSE_BODY_MAX_CHARS);
        assert_eq!(cut.chars().count(), RESPONSE_BODY_MAX_CHARS);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let value = "日本語テスト".repeat(10);
        let cut = truncate_chars(&value, 7);
        assert_eq!(cut.chars().count(), 7);
        assert_eq!(cut, "日本語テスト日");
    }

    #[test]
    fn exact_length_is_untouched() {
        let value = "a".repeat(5);
        assert_eq!(truncate_chars(&value, 5), value);
    }
}
