pub mod callback;
pub mod flows;
pub mod message;

use teloxide::{
    dispatching::{dialogue, dialogue::InMemStorage, UpdateHandler},
    prelude::*,
};

use crate::bot::commands::Command;
use crate::bot::state::ConversationState;

/// Dispatch tree. Expects `Arc<AppContext>` and
/// `Arc<InMemStorage<ConversationState>>` among the dependencies.
pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let message_handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(message::command_handler),
        )
        .branch(
            dptree::filter_map(|msg: Message| msg.location().cloned())
                .endpoint(message::location_handler),
        )
        .branch(dptree::endpoint(message::text_handler));

    let callback_handler = Update::filter_callback_query().endpoint(callback::callback_handler);

    dialogue::enter::<Update, InMemStorage<ConversationState>, ConversationState, _>()
        .branch(message_handler)
        .branch(callback_handler)
}
