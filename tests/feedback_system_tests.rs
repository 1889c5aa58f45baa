use therapy_helper_bot::utils::feedback::FeedbackType;
use therapy_helper_bot::utils::markdown::escape_markdown;

#[cfg(test)]
mod feedback_system_tests {
    use super::*;

    #[test]
    fn test_feedback_message_formatting() {
        let test_cases = vec![
            (FeedbackType::Success, "Часовой пояс сохранен", "✅"),
            (FeedbackType::Warning, "Неизвестная команда", "⚠️"),
            (FeedbackType::Error, "Не удалось получить события", "❌"),
            (FeedbackType::Info, "Укажите имя пользователя", "ℹ️"),
        ];

        for (feedback_type, message, expected_emoji) in test_cases {
            let formatted = feedback_type.format(message);
            assert!(
                formatted.starts_with(expected_emoji),
                "Message should start with emoji {} for type {:?}: {}",
                expected_emoji,
                feedback_type,
                formatted
            );
            assert!(formatted.ends_with(message), "Message should contain original text: {}", formatted);
        }
    }

    #[test]
    fn test_markdown_escaping() {
        let test_cases = vec![
            ("Simple text", "Simple text"),
            ("Text with *bold*", "Text with \\*bold\\*"),
            ("Text with _italic_", "Text with \\_italic\\_"),
            ("Text with [link](url)", "Text with \\[link\\]\\(url\\)"),
            ("Special chars: ~`>#+-=|{}.!", "Special chars: \\~\\`\\>\\#\\+\\-\\=\\|\\{\\}\\.\\!"),
            ("Тест завершен 🎯", "Тест завершен 🎯"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(escape_markdown(input), expected, "Markdown escaping failed for input: '{}'", input);
        }
    }

    #[test]
    fn test_format_escapes_timezone_names() {
        assert_eq!(
            FeedbackType::Success.format("America/Port-au-Prince"),
            "✅ America/Port\\-au\\-Prince"
        );
    }
}
