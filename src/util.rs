//! Helpers for message validation and log formatting.

use regex::Regex;
use std::sync::LazyLock;

/// Telegram's maximum message length.
pub const MAX_MESSAGE_CHARS: usize = 4096;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\w\s.,!?\-:;()\[\]'"]+"#).expect("static regex")
});

/// Describe a user for logs: `ID:1 | @name | Name:First Last`.
pub fn format_user_info(
    user_id: u64,
    username: Option<&str>,
    first_name: &str,
    last_name: Option<&str>,
) -> String {
    let mut parts = vec![format!("ID:{user_id}")];
    if let Some(username) = username {
        parts.push(format!("@{username}"));
    }
    if !first_name.is_empty() {
        match last_name {
            Some(last) => parts.push(format!("Name:{first_name} {last}")),
            None => parts.push(format!("Name:{first_name}")),
        }
    }
    parts.join(" | ")
}

/// Non-empty after trimming and within Telegram's length limit.
pub fn is_valid_message(text: Option<&str>) -> bool {
    let Some(text) = text else {
        return false;
    };
    if text.trim().is_empty() {
        return false;
    }
    let len = text.chars().count();
    if len > MAX_MESSAGE_CHARS {
        tracing::warn!("Message too long: {len} characters");
        return false;
    }
    true
}

/// Strip unusual characters and cap at 200 chars for logging.
pub fn sanitize_text(text: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(text, "");
    let cleaned = if cleaned.chars().count() > 200 {
        format!("{}...", truncate_chars(&cleaned, 197))
    } else {
        cleaned.into_owned()
    };
    cleaned.trim().to_string()
}

/// Lowercase command name without the leading `/` or a trailing `@botname`.
pub fn parse_command(text: &str) -> Option<String> {
    let first = text.strip_prefix('/')?.split_whitespace().next()?;
    let name = first.split('@').next().unwrap_or(first);
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

/// Human-readable uptime, e.g. "1 day, 2 hours, 3 minutes".
pub fn format_uptime(uptime: chrono::Duration) -> String {
    let total = uptime.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    fn unit(n: i64, name: &str) -> String {
        if n == 1 {
            format!("{n} {name}")
        } else {
            format!("{n} {name}s")
        }
    }

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(unit(days, "day"));
    }
    if hours > 0 {
        parts.push(unit(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(unit(minutes, "minute"));
    }
    if seconds > 0 && parts.is_empty() {
        parts.push(unit(seconds, "second"));
    }

    if parts.is_empty() {
        "Less than a minute".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_user_info() {
        assert_eq!(
            format_user_info(5, Some("alice"), "Alice", Some("Smith")),
            "ID:5 | @alice | Name:Alice Smith"
        );
        assert_eq!(format_user_info(5, None, "Bob", None), "ID:5 | Name:Bob");
        assert_eq!(format_user_info(5, None, "", None), "ID:5");
    }

    #[test]
    fn test_is_valid_message() {
        assert!(is_valid_message(Some("hello")));
        assert!(!is_valid_message(None));
        assert!(!is_valid_message(Some("   \n")));
        assert!(!is_valid_message(Some(&"x".repeat(4097))));
        assert!(is_valid_message(Some(&"x".repeat(4096))));
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("hi <script> there!"), "hi script there!");
        assert_eq!(sanitize_text("  ok  "), "ok");
        let long = sanitize_text(&"a".repeat(300));
        assert_eq!(long.chars().count(), 200);
        assert!(long.ends_with("..."));
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/Start"), Some("start".to_string()));
        assert_eq!(parse_command("/echo@relay_bot hello"), Some("echo".to_string()));
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/"), None);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(chrono::Duration::zero()), "Less than a minute");
        assert_eq!(format_uptime(chrono::Duration::seconds(1)), "1 second");
        assert_eq!(format_uptime(chrono::Duration::seconds(45)), "45 seconds");
        assert_eq!(format_uptime(chrono::Duration::seconds(61)), "1 minute");
        assert_eq!(
            format_uptime(chrono::Duration::seconds(86_400 + 2 * 3600 + 3 * 60)),
            "1 day, 2 hours, 3 minutes"
        );
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
