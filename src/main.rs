//! # Therapy Helper Bot Main Entry Point
//!
//! Initializes logging, loads configuration and questionnaires, sets up
//! the database, starts the reminder service and runs the Telegram bot
//! next to the health check server.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::dispatching::dialogue::InMemStorage;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use therapy_helper_bot::bot::{handlers, AppContext, ConversationState};
use therapy_helper_bot::config::Config;
use therapy_helper_bot::database::connection::DatabaseManager;
use therapy_helper_bot::database::Stores;
use therapy_helper_bot::questionnaire::{Catalog, QuestionnaireEngine};
use therapy_helper_bot::services::calendar::{CalendarSource, GoogleCalendarClient};
use therapy_helper_bot::services::health::HealthService;
use therapy_helper_bot::services::notifier::TelegramNotifier;
use therapy_helper_bot::services::reminder::{ReminderEngine, ReminderService};
use therapy_helper_bot::services::timezone::HttpTimezoneResolver;
use therapy_helper_bot::utils::logging::log_system_event;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "therapy_helper_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Therapy Helper Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded - Database: {}, HTTP Port: {}, Calendar: {}",
        config.database_url, config.http_port, config.calendar_id);

    // Questionnaires
    let catalog = Arc::new(Catalog::load_dir(&config.questionnaire_dir)?);
    if catalog.is_empty() {
        tracing::warn!(
            "No questionnaires found in {}, the test menu will be empty",
            config.questionnaire_dir.display()
        );
    }

    // Database
    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    let stores = Stores::from_backend(db_arc.clone());
    info!("Database initialized successfully");

    // External services
    let bot = Bot::new(&config.telegram_bot_token);
    let calendar: Arc<dyn CalendarSource> = Arc::new(GoogleCalendarClient::new(
        config.calendar_api_url.clone(),
        config.calendar_id.clone(),
        config.calendar_access_token.clone(),
        config.calendar_api_key.clone(),
    )?);
    let timezone_resolver = Arc::new(HttpTimezoneResolver::new(config.timezone_api_url.clone())?);

    // Reminders
    let reminder_engine = Arc::new(ReminderEngine::new(
        calendar.clone(),
        Arc::new(TelegramNotifier::new(bot.clone())),
        stores.clone(),
        config.reminder_lead_times.clone(),
        config.check_interval_minutes,
    ));
    let mut reminder_service = ReminderService::new(reminder_engine, config.check_interval_minutes)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create reminder service: {}", e))?;

    if let Err(e) = reminder_service.start().await {
        tracing::error!("Failed to start reminder service: {}", e);
    }
    if let Some(report) = reminder_service.check_reminders_now().await {
        log_system_event(
            "STARTUP_REMINDER_CHECK",
            Some(&format!("{} reminders delivered", report.delivered())),
        );
    }

    let ctx = Arc::new(AppContext {
        engine: QuestionnaireEngine::new(catalog.clone()),
        stores,
        calendar,
        timezone_resolver,
        materials_url: config.materials_url.clone(),
        upcoming_days: config.upcoming_days,
    });

    // Health server
    let health_service = HealthService::new(db_arc.clone(), catalog);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handlers::schema())
            .dependencies(dptree::deps![InMemStorage::<ConversationState>::new(), ctx])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Err(e) = reminder_service.stop().await {
        tracing::warn!("Error stopping reminder service: {}", e);
    }

    log_system_event("SHUTDOWN", None);
    Ok(())
}
