use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/bot.db";
const DEFAULT_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TIMEZONE_API_URL: &str = "https://timeapi.io/api/timezone/coordinate";
const DEFAULT_LEAD_TIMES: &str = "1440:через сутки,60:через час";
/// One year; keeps the reminder window arithmetic in range.
pub const MAX_LEAD_MINUTES: i64 = 525_600;
pub const MAX_UPCOMING_DAYS: i64 = 366;
pub const MAX_CHECK_INTERVAL_MINUTES: i64 = 1440;

/// A reminder kind: how many minutes before an occurrence it fires and the
/// label used both in the message and in the delivery ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadTime {
    pub minutes: i64,
    pub label: String,
}

impl LeadTime {
    pub fn new(minutes: i64, label: impl Into<String>) -> Self {
        Self {
            minutes,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub calendar_id: String,
    pub calendar_api_url: String,
    pub calendar_access_token: Option<String>,
    pub calendar_api_key: Option<String>,
    pub check_interval_minutes: i64,
    pub reminder_lead_times: Vec<LeadTime>,
    pub questionnaire_dir: PathBuf,
    pub materials_url: Option<String>,
    pub timezone_api_url: String,
    pub upcoming_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = database_url_from_env();

        let port_str = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let check_interval_minutes: i64 = var_or_default("CHECK_INTERVAL_MINUTES", "5")
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid CHECK_INTERVAL_MINUTES"))?;
        if !(1..=MAX_CHECK_INTERVAL_MINUTES).contains(&check_interval_minutes) {
            return Err(anyhow!(
                "Invalid CHECK_INTERVAL_MINUTES: must be between 1 and {}",
                MAX_CHECK_INTERVAL_MINUTES
            ));
        }

        let reminder_lead_times =
            parse_lead_times(&var_or_default("REMINDER_LEAD_TIMES", DEFAULT_LEAD_TIMES))?;

        let upcoming_days: i64 = var_or_default("UPCOMING_DAYS", "14")
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid UPCOMING_DAYS"))?;
        if !(1..=MAX_UPCOMING_DAYS).contains(&upcoming_days) {
            return Err(anyhow!("Invalid UPCOMING_DAYS: must be between 1 and {}", MAX_UPCOMING_DAYS));
        }

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            calendar_id: var_or_default("CALENDAR_ID", "primary"),
            calendar_api_url: var_or_default("CALENDAR_API_URL", DEFAULT_CALENDAR_API_URL),
            calendar_access_token: optional_var("CALENDAR_ACCESS_TOKEN"),
            calendar_api_key: optional_var("CALENDAR_API_KEY"),
            check_interval_minutes,
            reminder_lead_times,
            questionnaire_dir: PathBuf::from(var_or_default(
                "QUESTIONNAIRE_DIR",
                "./data/questionnaires",
            )),
            materials_url: optional_var("MATERIALS_URL"),
            timezone_api_url: var_or_default("TIMEZONE_API_URL", DEFAULT_TIMEZONE_API_URL),
            upcoming_days,
        })
    }
}

/// `DATABASE_URL`, or the default SQLite file. Needs no bot token, so the
/// migration tool can use it on its own.
pub fn database_url_from_env() -> String {
    var_or_default("DATABASE_URL", DEFAULT_DATABASE_URL)
}

/// Parses `minutes:label` pairs separated by commas, e.g.
/// `1440:через сутки,60:через час`.
pub fn parse_lead_times(input: &str) -> Result<Vec<LeadTime>> {
    let mut lead_times = Vec::new();

    for entry in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (minutes, label) = entry
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid REMINDER_LEAD_TIMES entry '{}'", entry))?;
        let minutes: i64 = minutes
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid REMINDER_LEAD_TIMES minutes in '{}'", entry))?;
        let label = label.trim();
        if !(1..=MAX_LEAD_MINUTES).contains(&minutes) || label.is_empty() {
            return Err(anyhow!("Invalid REMINDER_LEAD_TIMES entry '{}'", entry));
        }
        lead_times.push(LeadTime::new(minutes, label));
    }

    if lead_times.is_empty() {
        return Err(anyhow!("REMINDER_LEAD_TIMES must contain at least one entry"));
    }

    Ok(lead_times)
}

fn var_or_default(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
