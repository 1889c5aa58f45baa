//! # Therapy Helper Bot
//!
//! A Telegram bot that runs psychological questionnaires and reminds
//! clients about upcoming meetings from a shared calendar.
//!
//! ## Features
//! - Multi-block questionnaires with back-step, abandon and history
//! - Sum scoring and a rule-based sensory profile report
//! - Calendar polling with windowed, de-duplicated reminders
//! - Per-user timezone rendering
//! - Persistent storage with SQLite

/// Telegram surface: commands, dialogue state, keyboards and handlers
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Stores, database models and migrations
pub mod database;
/// Questionnaire definitions, the answering state machine and scoring
pub mod questionnaire;
/// Background and external services: calendar, reminders, health
pub mod services;
/// Utility functions for datetime, validation, logging and formatting
pub mod utils;
