pub mod callback_data;
pub mod commands;
pub mod context;
pub mod handlers;
pub mod keyboards;
pub mod state;

pub use callback_data::{CallbackAction, CallbackParseError};
pub use commands::Command;
pub use context::AppContext;
pub use state::{BotDialogue, ConversationState, HandlerResult};
