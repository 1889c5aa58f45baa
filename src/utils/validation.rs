use anyhow::{anyhow, Result};
use chrono_tz::Tz;

use crate::utils::datetime::parse_timezone;

pub fn validate_telegram_chat_id(chat_id: i64) -> Result<()> {
    // Telegram chat IDs should be non-zero
    if chat_id == 0 {
        return Err(anyhow!("Chat ID cannot be zero"));
    }

    // Reject extremely large negative numbers beyond Telegram's known ranges
    if chat_id < -2000000000000 {
        return Err(anyhow!("Chat ID out of valid range"));
    }

    Ok(())
}

pub fn validate_timezone_name(name: &str) -> Result<Tz> {
    let name = name.trim();

    if name.is_empty() {
        return Err(anyhow!("Timezone cannot be empty"));
    }

    parse_timezone(name).ok_or_else(|| anyhow!("Unknown timezone '{}'", name))
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(anyhow!("Latitude must be between -90 and 90"));
    }

    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(anyhow!("Longitude must be between -180 and 180"));
    }

    Ok(())
}
