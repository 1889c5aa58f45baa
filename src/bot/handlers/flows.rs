//! Steps shared by command, menu and callback handlers.

use teloxide::prelude::*;

use crate::bot::context::AppContext;
use crate::bot::keyboards::{history_keyboard, main_menu, question_keyboard, test_list_keyboard};
use crate::bot::state::{BotDialogue, ConversationState, HandlerResult};
use crate::database::models::AttemptRecord;
use crate::questionnaire::{Locale, Notice, Prompt, QuestionnaireKind, Transition};
use crate::questionnaire::scoring::format_score;
use crate::utils::feedback::CommandFeedback;

/// Shows the questionnaire list. An in-progress questionnaire is kept
/// until another one is actually started.
pub async fn show_test_list(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    ctx: &AppContext,
) -> HandlerResult {
    let available = ctx.engine.catalog().available();
    if available.is_empty() {
        CommandFeedback::new(bot.clone(), chat_id)
            .warning("Тесты временно недоступны")
            .await?;
        return Ok(());
    }

    if !matches!(dialogue.get().await?, Some(ConversationState::Questionnaire(_))) {
        dialogue.update(ConversationState::SelectingTest).await?;
    }

    bot.send_message(chat_id, "Выберите тест:")
        .reply_markup(test_list_keyboard(&available))
        .await?;
    Ok(())
}

pub async fn start_questionnaire(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    dialogue: &BotDialogue,
    ctx: &AppContext,
    kind: QuestionnaireKind,
) -> HandlerResult {
    match ctx.engine.start(kind) {
        Ok(transition) => {
            tracing::info!("User {} started questionnaire '{}'", user_id, kind.key());
            apply_transition(bot, chat_id, user_id, dialogue, ctx, transition).await?;
        }
        Err(e) => {
            tracing::warn!("Cannot start questionnaire '{}': {}", kind.key(), e);
            CommandFeedback::new(bot.clone(), chat_id)
                .error("Этот тест сейчас недоступен")
                .await?;
        }
    }
    Ok(())
}

/// Persists the outcome of an engine transition and shows it to the user.
/// A refused input leaves the dialogue untouched and is returned to the
/// caller, which reports it as a callback notification.
pub async fn apply_transition(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    dialogue: &BotDialogue,
    ctx: &AppContext,
    transition: Transition,
) -> Result<Option<(Notice, Locale)>, Box<dyn std::error::Error + Send + Sync>> {
    match transition {
        Transition::Continue { session, prompts } => {
            let locale = session.kind().locale();
            dialogue
                .update(ConversationState::Questionnaire(session))
                .await?;
            send_prompts(bot, chat_id, &prompts, locale).await?;
            Ok(None)
        }
        Transition::Rejected { session, notice } => Ok(Some((notice, session.kind().locale()))),
        Transition::Finished(attempt) => {
            dialogue.update(ConversationState::Idle).await?;

            let record = AttemptRecord::from_completed(user_id, &attempt);
            if let Err(e) = ctx.stores.results.append_attempt(&record).await {
                tracing::error!("Failed to save attempt for user {}: {}", user_id, e);
            }
            tracing::info!(
                "User {} finished questionnaire '{}' ({} answers)",
                user_id,
                attempt.kind.key(),
                attempt.answers.len()
            );

            bot.send_message(chat_id, attempt.report)
                .reply_markup(main_menu())
                .await?;
            Ok(None)
        }
        Transition::Abandoned { kind } => {
            dialogue.update(ConversationState::Idle).await?;
            tracing::info!("User {} abandoned questionnaire '{}'", user_id, kind.key());

            let text = match kind.locale() {
                Locale::Ru => "Тест прерван",
                Locale::En => "Test aborted",
            };
            bot.send_message(chat_id, text)
                .reply_markup(main_menu())
                .await?;
            Ok(None)
        }
    }
}

async fn send_prompts(bot: &Bot, chat_id: ChatId, prompts: &[Prompt], locale: Locale) -> HandlerResult {
    for prompt in prompts {
        match prompt {
            Prompt::BlockIntro { .. } => {
                bot.send_message(chat_id, prompt.text()).await?;
            }
            Prompt::Question(view) => {
                bot.send_message(chat_id, view.text())
                    .reply_markup(question_keyboard(view, locale))
                    .await?;
            }
        }
    }
    Ok(())
}

pub async fn show_history(bot: &Bot, chat_id: ChatId, user_id: i64, ctx: &AppContext) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let attempts = match ctx.stores.results.attempts_for_user(user_id).await {
        Ok(attempts) => attempts,
        Err(e) => {
            tracing::error!("Failed to load history for user {}: {}", user_id, e);
            feedback.error("Не удалось загрузить историю").await?;
            return Ok(());
        }
    };

    if attempts.is_empty() {
        feedback.info("Вы еще не прошли ни одного теста").await?;
        return Ok(());
    }

    let timezone = user_timezone(ctx, chat_id).await;
    bot.send_message(chat_id, "Ваши результаты:")
        .reply_markup(history_keyboard(&attempts, timezone.as_deref()))
        .await?;
    Ok(())
}

pub async fn show_history_item(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    ctx: &AppContext,
    index: usize,
) -> HandlerResult {
    let attempt = match ctx.stores.results.attempts_for_user(user_id).await {
        Ok(attempts) => attempts.into_iter().nth(index),
        Err(e) => {
            tracing::error!("Failed to load history for user {}: {}", user_id, e);
            None
        }
    };

    let Some(attempt) = attempt else {
        CommandFeedback::new(bot.clone(), chat_id)
            .warning("Запись не найдена, откройте историю заново")
            .await?;
        return Ok(());
    };

    bot.send_message(chat_id, render_attempt(ctx, &attempt)).await?;
    Ok(())
}

/// Re-renders a stored attempt; falls back to the stored score when the
/// questionnaire is no longer loaded.
fn render_attempt(ctx: &AppContext, attempt: &AttemptRecord) -> String {
    match ctx.engine.render_result(attempt.kind, &attempt.answers) {
        Ok(report) => report,
        Err(_) => match attempt.score {
            Some(score) => format!("{}: {}", attempt.kind.title(), format_score(score)),
            None => attempt.kind.title().to_string(),
        },
    }
}

/// Stored timezone of a chat; unreadable store means no timezone.
pub async fn user_timezone(ctx: &AppContext, chat_id: ChatId) -> Option<String> {
    ctx.stores
        .timezones
        .timezone(chat_id.0)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to read timezone for chat {}: {}", chat_id, e);
            None
        })
}
