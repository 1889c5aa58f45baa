pub mod calendar;
pub mod health;
pub mod notifier;
pub mod reminder;
pub mod timezone;
