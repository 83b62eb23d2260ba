//! Request validation at the service boundary.
//!
//! Everything rejected here is a client error and never reaches the loop.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};

use crate::error::{Result, SwitchyardError};
use crate::util::text::take_chars;

pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 10_000;
pub const MIN_MESSAGE_CHARS: usize = 2;

fn unsafe_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            r"(?i)<script\b",
            r"(?i)javascript:",
            // Event handler attributes only count inside a tag, so `response = ...` passes.
            r"(?i)<[a-z][^>]*\bon\w+\s*=",
            r"(?i)<iframe",
        ])
        .expect("unsafe content patterns must compile")
    })
}

fn thread_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^thread_[a-f0-9]{16}$").expect("thread id regex must compile"))
}

/// Check a user message and return it trimmed.
pub fn validate_message(message: &str, max_chars: usize) -> Result<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(invalid("Message cannot be empty"));
    }

    let chars = trimmed.chars().count();
    if chars > max_chars {
        return Err(invalid(format!(
            "Message too long (max {} characters). Please break your request into smaller parts.",
            group_thousands(max_chars)
        )));
    }
    if chars < MIN_MESSAGE_CHARS {
        return Err(invalid(format!(
            "Message too short (min {MIN_MESSAGE_CHARS} characters)"
        )));
    }

    if unsafe_patterns().is_match(trimmed) {
        return Err(invalid(
            "Message contains potentially unsafe content. Please rephrase your question.",
        ));
    }

    Ok(trimmed.to_string())
}

pub fn is_valid_thread_id(thread_id: &str) -> bool {
    thread_id_regex().is_match(thread_id)
}

/// Check a client-supplied thread id and return it trimmed.
pub fn validate_thread_id(thread_id: &str) -> Result<String> {
    let trimmed = thread_id.trim();
    if !is_valid_thread_id(trimmed) {
        return Err(invalid(format!(
            "Invalid thread_id format. Expected 'thread_' followed by 16 hex characters, got: {}",
            take_chars(trimmed, 50)
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate a whole chat request.
pub fn validate_chat_request(
    message: &str,
    thread_id: Option<&str>,
    max_chars: usize,
) -> Result<(String, Option<String>)> {
    let message = validate_message(message, max_chars)?;
    let thread_id = thread_id.map(validate_thread_id).transpose()?;
    Ok((message, thread_id))
}

fn invalid(message: impl Into<String>) -> SwitchyardError {
    SwitchyardError::InvalidInput(message.into())
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rejection(message: &str) -> String {
        match validate_message(message, DEFAULT_MAX_MESSAGE_CHARS) {
            Err(SwitchyardError::InvalidInput(msg)) => msg,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn messages_are_trimmed() {
        let ok = validate_message("  What is the capital of France?  ", DEFAULT_MAX_MESSAGE_CHARS).unwrap();
        assert_eq!(ok, "What is the capital of France?");
    }

    #[test]
    fn length_bounds() {
        assert_eq!(rejection("   "), "Message cannot be empty");
        assert_eq!(rejection("a"), "Message too short (min 2 characters)");
        assert_eq!(
            rejection(&"x".repeat(10_001)),
            "Message too long (max 10,000 characters). Please break your request into smaller parts."
        );
        assert!(validate_message(&"x".repeat(10_000), DEFAULT_MAX_MESSAGE_CHARS).is_ok());
    }

    #[test]
    fn unsafe_markup_is_rejected() {
        let expected = "Message contains potentially unsafe content. Please rephrase your question.";
        assert_eq!(rejection("hi <SCRIPT>alert(1)</script>"), expected);
        assert_eq!(rejection("open javascript:void(0)"), expected);
        assert_eq!(rejection("<img src=x onerror = boom>"), expected);
        assert_eq!(rejection("<iframe src=evil>"), expected);
        assert!(validate_message("explain the onion model", DEFAULT_MAX_MESSAGE_CHARS).is_ok());
    }

    #[test]
    fn script_tags_are_rejected_across_lines_and_unclosed() {
        let expected = "Message contains potentially unsafe content. Please rephrase your question.";
        assert_eq!(rejection("see <script>\nalert(1)\n</script>"), expected);
        assert_eq!(rejection("load <script src=\"https://evil.example/x.js\">"), expected);
        assert_eq!(rejection("<Script\ttype=\"module\">"), expected);
        assert!(validate_message("my <scripts> folder is empty", DEFAULT_MAX_MESSAGE_CHARS).is_ok());
    }

    #[test]
    fn event_handlers_only_count_inside_tags() {
        let expected = "Message contains potentially unsafe content. Please rephrase your question.";
        assert_eq!(rejection("<body\nonload=start()>"), expected);
        assert_eq!(rejection("<img src=x onerror=alert(1)"), expected);
        for ok in [
            "why does response = requests.get(url) hang?",
            "conditions = 1 breaks my loop",
            "set one = 1 and online = True",
            "if a < b and online = True: pass",
        ] {
            assert!(validate_message(ok, DEFAULT_MAX_MESSAGE_CHARS).is_ok(), "{ok}");
        }
    }

    #[test]
    fn thread_ids_need_prefix_and_sixteen_hex() {
        assert_eq!(validate_thread_id(" thread_0123456789abcdef ").unwrap(), "thread_0123456789abcdef");
        assert!(!is_valid_thread_id("thread_0123456789ABCDEF"));
        assert!(!is_valid_thread_id("thread_0123"));
        let err = validate_thread_id(&"z".repeat(80)).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Invalid input: Invalid thread_id format. Expected 'thread_' followed by 16 hex characters, got: {}",
                "z".repeat(50)
            )
        );
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(10_000), "10,000");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
