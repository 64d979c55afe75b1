use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::requests::ResponseResult;
use teloxide::types::ChatId;
use teloxide::utils::command::BotCommands;
use teloxide::{ApiError, RequestError};
use tracing::info;

use crate::core::scheduler::Schedule;
use crate::core::subscription;
use crate::error::DeliveryError;
use crate::models::SubscriberId;
use crate::providers::ChatTransport;
use crate::store::SubscriberStore;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "subscribe to the daily digest.")]
    Start,
    #[command(description = "subscribe to the daily digest.")]
    Subscribe,
    #[command(description = "show this text.")]
    Help,
}

/// Shared state handed to every command handler.
#[derive(Clone)]
pub struct CommandState {
    pub store: Arc<SubscriberStore>,
    pub schedule: Schedule,
}

#[derive(Clone)]
pub struct Telegram {
    pub bot: Bot,
}

impl Telegram {
    pub fn new(token: &str) -> Self {
        Telegram {
            bot: Bot::new(token),
        }
    }

    /// Long-polls for commands until the process receives Ctrl-C.
    pub async fn listen(self, state: CommandState) {
        let handler = Update::filter_message()
            .filter_command::<Command>()
            .endpoint(answer);

        info!("Listening for Telegram commands");
        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![state])
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

async fn answer(bot: Bot, msg: Message, cmd: Command, state: CommandState) -> ResponseResult<()> {
    let reply = match cmd {
        Command::Start | Command::Subscribe => {
            let outcome = subscription::subscribe(&state.store, SubscriberId(msg.chat.id.0)).await;
            outcome.reply(&state.schedule)
        }
        Command::Help => Command::descriptions().to_string(),
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

// Errors after which the chat will never accept messages from us again
pub(crate) fn classify(error: RequestError) -> DeliveryError {
    match error {
        RequestError::Api(
            api @ (ApiError::BotBlocked
            | ApiError::ChatNotFound
            | ApiError::UserDeactivated
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup),
        ) => DeliveryError::RecipientGone(api.to_string()),
        other => DeliveryError::Transport(other.to_string()),
    }
}

#[async_trait]
impl ChatTransport for Telegram {
    async fn send_message(&self, recipient: SubscriberId, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(recipient.0), text)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}
