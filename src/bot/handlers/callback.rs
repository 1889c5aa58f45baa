use std::sync::Arc;
use teloxide::prelude::*;

use crate::bot::callback_data::CallbackAction;
use crate::bot::context::AppContext;
use crate::bot::handlers::{flows, message::set_timezone};
use crate::bot::state::{BotDialogue, ConversationState, HandlerResult};
use crate::questionnaire::{QuestionnaireSession, Transition};
use crate::services::timezone::TIMEZONE_CHOICES;

const NO_ACTIVE_TEST: &str = "Нет активного теста. Выберите тест: /test";

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: BotDialogue,
    state: ConversationState,
    ctx: Arc<AppContext>,
) -> HandlerResult {
    let user_id = q.from.id.0 as i64;
    let username = q.from.username.as_deref().unwrap_or("unknown");

    let (Some(data), Some(chat_id)) = (q.data.as_deref(), q.message.as_ref().map(|m| m.chat.id))
    else {
        bot.answer_callback_query(q.id).text("Некорректные данные").await?;
        return Ok(());
    };

    tracing::info!(
        "Callback received: '{}' from user {} ({}) in chat {}",
        data, username, user_id, chat_id
    );

    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!("Rejected callback '{}': {}", data, e);
            bot.answer_callback_query(q.id).text("Некорректный выбор").await?;
            return Ok(());
        }
    };

    let notice: Option<String> = match action {
        CallbackAction::Answer {
            option,
            question,
            block,
        } => {
            step(&bot, chat_id, user_id, &dialogue, &ctx, state, |session| {
                ctx.engine.answer(session, option, question, block)
            })
            .await?
        }
        CallbackAction::Back => {
            step(&bot, chat_id, user_id, &dialogue, &ctx, state, |session| {
                ctx.engine.back(session)
            })
            .await?
        }
        CallbackAction::Quit => {
            step(&bot, chat_id, user_id, &dialogue, &ctx, state, |session| {
                ctx.engine.abandon(session)
            })
            .await?
        }
        CallbackAction::SelectTest(kind) => {
            flows::start_questionnaire(&bot, chat_id, user_id, &dialogue, &ctx, kind).await?;
            None
        }
        CallbackAction::ViewHistory => {
            flows::show_history(&bot, chat_id, user_id, &ctx).await?;
            None
        }
        CallbackAction::ViewHistoryItem(index) => {
            flows::show_history_item(&bot, chat_id, user_id, &ctx, index).await?;
            None
        }
        CallbackAction::SelectTimezone(index) => match TIMEZONE_CHOICES.get(index) {
            Some(name) => {
                set_timezone(&bot, chat_id, &dialogue, &ctx, name).await?;
                None
            }
            None => Some("Некорректный выбор".to_string()),
        },
    };

    match notice {
        Some(text) => bot.answer_callback_query(q.id).text(text).await?,
        None => bot.answer_callback_query(q.id).await?,
    };
    Ok(())
}

/// Runs one engine transition against the chat's questionnaire session.
/// Returns the text of a refused input, if any.
async fn step<F>(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    dialogue: &BotDialogue,
    ctx: &AppContext,
    state: ConversationState,
    transition: F,
) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>
where
    F: FnOnce(QuestionnaireSession) -> Transition,
{
    let ConversationState::Questionnaire(session) = state else {
        return Ok(Some(NO_ACTIVE_TEST.to_string()));
    };

    let notice = flows::apply_transition(bot, chat_id, user_id, dialogue, ctx, transition(session)).await?;
    Ok(notice.map(|(notice, locale)| notice.text(locale).to_string()))
}
