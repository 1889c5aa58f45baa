use tokio_test::{assert_err, assert_ok};
use therapy_helper_bot::utils::validation::{
    validate_coordinates, validate_telegram_chat_id, validate_timezone_name,
};

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_chat_id_validation() {
        assert_ok!(validate_telegram_chat_id(123456789));
        assert_ok!(validate_telegram_chat_id(-1001234567890));
        assert_err!(validate_telegram_chat_id(0));
        assert_err!(validate_telegram_chat_id(-3000000000000));
    }

    #[test]
    fn test_timezone_name_validation() {
        assert_eq!(
            validate_timezone_name(" Europe/Moscow ").map(|tz| tz.name()).ok(),
            Some("Europe/Moscow")
        );
        assert_ok!(validate_timezone_name("UTC"));
        assert_err!(validate_timezone_name(""));
        assert_err!(validate_timezone_name("   "));
        assert_err!(validate_timezone_name("Mars/Olympus"));
    }

    #[test]
    fn test_coordinate_validation() {
        assert_ok!(validate_coordinates(55.75, 37.62));
        assert_ok!(validate_coordinates(-90.0, 180.0));
        assert_err!(validate_coordinates(90.5, 0.0));
        assert_err!(validate_coordinates(0.0, -180.5));
        assert_err!(validate_coordinates(f64::NAN, 0.0));
        assert_err!(validate_coordinates(0.0, f64::INFINITY));
    }
}
