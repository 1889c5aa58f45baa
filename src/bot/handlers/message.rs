use chrono::{Duration, Utc};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::Location;
use teloxide::utils::command::BotCommands;

use crate::bot::commands::Command;
use crate::bot::context::AppContext;
use crate::bot::handlers::flows::{self, user_timezone};
use crate::bot::keyboards::{
    location_request_keyboard, main_menu, timezone_keyboard, MENU_MATERIALS, MENU_TAKE_TEST,
    MENU_TIMEZONE, MENU_UPCOMING,
};
use crate::bot::state::{BotDialogue, ConversationState, HandlerResult};
use crate::questionnaire::Locale;
use crate::services::calendar::CalendarEvent;
use crate::utils::datetime::render_event_time;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_start, log_command_success};
use crate::utils::validation::{validate_coordinates, validate_telegram_chat_id, validate_timezone_name};

const DEFAULT_SUMMARY: &str = "Встреча";

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: BotDialogue,
    ctx: Arc<AppContext>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let user_id = sender_id(&msg);
    let username = msg.from().and_then(|u| u.username.clone());
    let display_name = username.as_deref().unwrap_or("unknown");
    let command_name = format!("{cmd:?}").to_lowercase();

    log_command_start(&command_name, display_name, user_id, chat_id.0, None);

    match cmd {
        Command::Help => {
            bot.send_message(chat_id, Command::descriptions().to_string()).await?;
        }
        Command::Start => {
            dialogue.update(ConversationState::Idle).await?;
            register_recipient(&bot, &msg, username.as_deref(), &ctx).await?;
            bot.send_message(
                chat_id,
                "Здравствуйте! Я помогу пройти тесты и напомню о встречах.\n\nВыберите пункт меню:",
            )
            .reply_markup(main_menu())
            .await?;
        }
        Command::Cancel => {
            cancel(&bot, chat_id, user_id, &dialogue, &ctx).await?;
        }
        Command::Test => {
            flows::show_test_list(&bot, chat_id, &dialogue, &ctx).await?;
        }
        Command::History => {
            flows::show_history(&bot, chat_id, user_id, &ctx).await?;
        }
    }

    log_command_success(&command_name, display_name, user_id, chat_id.0, None);
    Ok(())
}

/// Main menu buttons, free-text timezone names and everything else typed.
pub async fn text_handler(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    state: ConversationState,
    ctx: Arc<AppContext>,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    match text.trim() {
        MENU_TAKE_TEST => flows::show_test_list(&bot, chat_id, &dialogue, &ctx).await?,
        MENU_UPCOMING => show_upcoming(&bot, &msg, &ctx).await?,
        MENU_MATERIALS => show_materials(&bot, chat_id, &ctx).await?,
        MENU_TIMEZONE => start_timezone_setup(&bot, chat_id, &dialogue, &ctx).await?,
        other => {
            let feedback = CommandFeedback::new(bot.clone(), chat_id);
            match state {
                ConversationState::TimezoneSetup => match validate_timezone_name(other) {
                    Ok(tz) => set_timezone(&bot, chat_id, &dialogue, &ctx, tz.name()).await?,
                    Err(_) => {
                        feedback
                            .warning("Не удалось распознать часовой пояс. Пример: Europe/Moscow")
                            .await?;
                    }
                },
                ConversationState::Questionnaire(session) => {
                    let hint = match session.kind().locale() {
                        Locale::Ru => "Используйте кнопки под вопросом или /cancel, чтобы выйти",
                        Locale::En => "Use the buttons below the question or /cancel to quit",
                    };
                    feedback.info(hint).await?;
                }
                ConversationState::Idle | ConversationState::SelectingTest => {
                    if other.starts_with('/') {
                        feedback.warning("Неизвестная команда. Список команд: /help").await?;
                    } else {
                        bot.send_message(chat_id, "Выберите пункт меню:")
                            .reply_markup(main_menu())
                            .await?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// A shared location resolves the chat's timezone.
pub async fn location_handler(
    bot: Bot,
    msg: Message,
    location: Location,
    dialogue: BotDialogue,
    ctx: Arc<AppContext>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    if let Err(e) = validate_coordinates(location.latitude, location.longitude) {
        tracing::warn!("Rejected location from chat {}: {}", chat_id, e);
        feedback.warning("Некорректная геопозиция").await?;
        return Ok(());
    }

    match ctx
        .timezone_resolver
        .lookup(location.latitude, location.longitude)
        .await
    {
        Ok(Some(name)) => set_timezone(&bot, chat_id, &dialogue, &ctx, &name).await?,
        Ok(None) => {
            tracing::warn!("No timezone found for location shared in chat {}", chat_id);
            offer_timezone_list(&bot, chat_id, &dialogue).await?;
        }
        Err(e) => {
            tracing::warn!("Timezone lookup failed for chat {}: {}", chat_id, e);
            offer_timezone_list(&bot, chat_id, &dialogue).await?;
        }
    }
    Ok(())
}

async fn register_recipient(
    bot: &Bot,
    msg: &Message,
    username: Option<&str>,
    ctx: &AppContext,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(username) = username else {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("Чтобы получать напоминания о встречах, укажите username в настройках Telegram и нажмите /start")
            .await?;
        return Ok(());
    };

    if let Err(e) = validate_telegram_chat_id(chat_id.0) {
        tracing::warn!("Not registering @{}: {}", username, e);
        return Ok(());
    }

    if let Err(e) = ctx.stores.recipients.upsert_recipient(username, chat_id.0).await {
        log_command_error("start", username, sender_id(msg), chat_id.0, &e.to_string());
    }
    Ok(())
}

async fn cancel(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    dialogue: &BotDialogue,
    ctx: &AppContext,
) -> HandlerResult {
    match dialogue.get().await?.unwrap_or_default() {
        ConversationState::Questionnaire(session) => {
            let transition = ctx.engine.abandon(session);
            flows::apply_transition(bot, chat_id, user_id, dialogue, ctx, transition).await?;
        }
        ConversationState::TimezoneSetup => {
            dialogue.update(ConversationState::Idle).await?;
            bot.send_message(chat_id, "Настройка часового пояса отменена")
                .reply_markup(main_menu())
                .await?;
        }
        ConversationState::SelectingTest => {
            dialogue.update(ConversationState::Idle).await?;
            bot.send_message(chat_id, "Выбор теста отменен")
                .reply_markup(main_menu())
                .await?;
        }
        ConversationState::Idle => {
            bot.send_message(chat_id, "Нечего отменять")
                .reply_markup(main_menu())
                .await?;
        }
    }
    Ok(())
}

async fn show_upcoming(bot: &Bot, msg: &Message, ctx: &AppContext) -> HandlerResult {
    let chat_id = msg.chat.id;
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let Some(username) = msg.from().and_then(|u| u.username.clone()) else {
        feedback
            .warning("Чтобы видеть свои встречи, укажите username в настройках Telegram")
            .await?;
        return Ok(());
    };

    let now = Utc::now();
    let until = now + Duration::days(ctx.upcoming_days);
    let events = match ctx
        .calendar
        .list_events_for_recipient_in_range(&username, now, until)
        .await
    {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("Failed to load upcoming events for @{}: {}", username, e);
            feedback.error("Не удалось получить расписание, попробуйте позже").await?;
            return Ok(());
        }
    };

    if events.is_empty() {
        feedback.info("Ближайших встреч нет").await?;
        return Ok(());
    }

    let timezone = user_timezone(ctx, chat_id).await;
    let text = upcoming_text(&events, timezone.as_deref());

    bot.send_message(chat_id, text).await?;
    Ok(())
}

async fn show_materials(bot: &Bot, chat_id: ChatId, ctx: &AppContext) -> HandlerResult {
    match &ctx.materials_url {
        Some(url) => {
            bot.send_message(chat_id, format!("Материалы: {url}")).await?;
        }
        None => {
            CommandFeedback::new(bot.clone(), chat_id)
                .info("Материалы пока не добавлены")
                .await?;
        }
    }
    Ok(())
}

async fn start_timezone_setup(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    ctx: &AppContext,
) -> HandlerResult {
    dialogue.update(ConversationState::TimezoneSetup).await?;

    let current = match user_timezone(ctx, chat_id).await {
        Some(tz) => format!("Текущий часовой пояс: {tz}\n\n"),
        None => String::new(),
    };
    bot.send_message(
        chat_id,
        format!("{current}Отправьте геопозицию или название часового пояса (например, Europe/Moscow)."),
    )
    .reply_markup(location_request_keyboard())
    .await?;
    bot.send_message(chat_id, "Или выберите из списка:")
        .reply_markup(timezone_keyboard())
        .await?;
    Ok(())
}

async fn offer_timezone_list(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    dialogue.update(ConversationState::TimezoneSetup).await?;
    bot.send_message(chat_id, "Не удалось определить часовой пояс. Выберите его из списка:")
        .reply_markup(timezone_keyboard())
        .await?;
    Ok(())
}

pub async fn set_timezone(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    ctx: &AppContext,
    timezone: &str,
) -> HandlerResult {
    if let Err(e) = ctx.stores.timezones.set_timezone(chat_id.0, timezone).await {
        tracing::error!("Failed to save timezone for chat {}: {}", chat_id, e);
        CommandFeedback::new(bot.clone(), chat_id)
            .error("Не удалось сохранить часовой пояс")
            .await?;
        return Ok(());
    }

    dialogue.update(ConversationState::Idle).await?;
    bot.send_message(chat_id, format!("Часовой пояс установлен: {timezone}"))
        .reply_markup(main_menu())
        .await?;
    Ok(())
}

/// Upcoming meetings list. Without a stored timezone each start keeps the
/// offset the calendar reported.
pub fn upcoming_text(events: &[CalendarEvent], timezone: Option<&str>) -> String {
    let mut text = String::from("Ближайшие встречи:\n");
    for event in events {
        let summary = event
            .summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SUMMARY);
        text.push_str(&format!(
            "\n• {} - {}",
            summary,
            render_event_time(&event.start, timezone, true)
        ));
    }
    if timezone.is_none() {
        text.push_str("\n\nВремя указано по часовому поясу календаря. Настройте свой часовой пояс в меню.");
    }
    text
}

fn sender_id(msg: &Message) -> i64 {
    msg.from()
        .map(|u| u.id.0 as i64)
        .unwrap_or(msg.chat.id.0)
}
