use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

use crate::bot::callback_data::CallbackAction;
use crate::database::models::AttemptRecord;
use crate::questionnaire::{Locale, QuestionView, QuestionnaireKind};
use crate::services::timezone::TIMEZONE_CHOICES;
use crate::utils::datetime::format_datetime;

pub const MENU_TAKE_TEST: &str = "Пройти тест";
pub const MENU_UPCOMING: &str = "Ближайшие встречи";
pub const MENU_MATERIALS: &str = "Материалы";
pub const MENU_TIMEZONE: &str = "Часовой пояс";

const OPTIONS_PER_ROW: usize = 5;
const TIMEZONES_PER_ROW: usize = 2;

pub fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(MENU_TAKE_TEST), KeyboardButton::new(MENU_UPCOMING)],
        vec![KeyboardButton::new(MENU_MATERIALS), KeyboardButton::new(MENU_TIMEZONE)],
    ])
}

/// Option buttons numbered from 1, then back and quit.
pub fn question_keyboard(view: &QuestionView, locale: Locale) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = (0..view.options.len())
        .map(|option| {
            let action = CallbackAction::Answer {
                option,
                question: view.question,
                block: view.block,
            };
            InlineKeyboardButton::callback((option + 1).to_string(), action.encode())
        })
        .collect();

    let mut rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .chunks(OPTIONS_PER_ROW)
        .map(<[InlineKeyboardButton]>::to_vec)
        .collect();

    let (back, quit) = match locale {
        Locale::Ru => ("⬅️ Назад", "❌ Выйти"),
        Locale::En => ("⬅️ Back", "❌ Quit"),
    };
    rows.push(vec![
        InlineKeyboardButton::callback(back, CallbackAction::Back.encode()),
        InlineKeyboardButton::callback(quit, CallbackAction::Quit.encode()),
    ]);

    InlineKeyboardMarkup::new(rows)
}

pub fn test_list_keyboard(available: &[QuestionnaireKind]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = available
        .iter()
        .map(|kind| {
            vec![InlineKeyboardButton::callback(
                kind.title(),
                CallbackAction::SelectTest(*kind).encode(),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        "📜 История",
        CallbackAction::ViewHistory.encode(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Newest attempts shown in the history list. Telegram caps an inline
/// keyboard at 100 buttons.
pub const HISTORY_LIMIT: usize = 20;

/// One button per attempt, in the order given (newest first), up to
/// [`HISTORY_LIMIT`].
pub fn history_keyboard(attempts: &[AttemptRecord], timezone: Option<&str>) -> InlineKeyboardMarkup {
    let rows = attempts
        .iter()
        .take(HISTORY_LIMIT)
        .enumerate()
        .map(|(index, attempt)| {
            let label = format!(
                "{} - {}",
                attempt.kind.title(),
                format_datetime(&attempt.completed_at, timezone)
            );
            vec![InlineKeyboardButton::callback(
                label,
                CallbackAction::ViewHistoryItem(index).encode(),
            )]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn timezone_keyboard() -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = TIMEZONE_CHOICES
        .iter()
        .enumerate()
        .map(|(index, name)| {
            InlineKeyboardButton::callback(*name, CallbackAction::SelectTimezone(index).encode())
        })
        .collect();
    InlineKeyboardMarkup::new(
        buttons
            .chunks(TIMEZONES_PER_ROW)
            .map(<[InlineKeyboardButton]>::to_vec)
            .collect::<Vec<_>>(),
    )
}

pub fn location_request_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new("📍 Отправить геопозицию").request(ButtonRequest::Location)],
    ])
}
