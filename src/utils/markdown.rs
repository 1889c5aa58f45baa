/// Utility functions for handling Telegram MarkdownV2 formatting
///
/// MarkdownV2 requires escaping of special characters to prevent formatting issues.
/// Escapes markdown special characters for MarkdownV2 parsing mode
///
/// # Example
/// ```
/// use therapy_helper_bot::utils::markdown::escape_markdown;
///
/// let text = "Hello *world* (test)";
/// let escaped = escape_markdown(text);
/// assert_eq!(escaped, "Hello \\*world\\* \\(test\\)");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|' | '{' | '}' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_basic_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("_italic_"), "\\_italic\\_");
    }

    #[test]
    fn test_escape_reminder_text() {
        let input = "Напоминание: Сессия (онлайн) через час (10:00).";
        let expected = "Напоминание: Сессия \\(онлайн\\) через час \\(10:00\\)\\.";
        assert_eq!(escape_markdown(input), expected);
    }

    #[test]
    fn test_escape_empty_and_plain_text() {
        assert_eq!(escape_markdown(""), "");
        assert_eq!(escape_markdown("plain text"), "plain text");
    }
}
