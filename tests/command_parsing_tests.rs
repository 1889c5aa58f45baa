use therapy_helper_bot::bot::commands::Command;
use teloxide::utils::command::BotCommands;

#[cfg(test)]
mod command_parsing_tests {
    use super::*;

    #[test]
    fn test_every_command_parses() {
        let cases = [
            ("/help", Command::Help),
            ("/start", Command::Start),
            ("/cancel", Command::Cancel),
            ("/test", Command::Test),
            ("/history", Command::History),
        ];
        for (input, expected) in cases {
            assert_eq!(Command::parse(input, "testbot").ok(), Some(expected), "input: {input}");
        }
    }

    #[test]
    fn test_command_addressed_to_this_bot() {
        assert_eq!(Command::parse("/start@testbot", "testbot").ok(), Some(Command::Start));
    }

    #[test]
    fn test_command_addressed_to_other_bot_is_rejected() {
        assert!(Command::parse("/start@otherbot", "testbot").is_err());
    }

    #[test]
    fn test_unknown_commands_are_rejected() {
        for input in ["/schedule", "/stats", "/unknown", "start", ""] {
            assert!(Command::parse(input, "testbot").is_err(), "input: {input}");
        }
    }

    #[test]
    fn test_descriptions_list_every_command() {
        let descriptions = Command::descriptions().to_string();
        for command in ["/help", "/start", "/cancel", "/test", "/history"] {
            assert!(descriptions.contains(command), "missing {command}");
        }
    }
}
