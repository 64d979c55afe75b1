use std::sync::Arc;

use tracing::{error, info};

use crate::core::scheduler::Schedule;
use crate::models::SubscriberId;
use crate::store::SubscriberStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
    /// Subscribed in memory, but the store could not be written.
    Unsaved,
}

/// Adds `id` to the store. The write-through flush runs on the blocking pool.
pub async fn subscribe(store: &Arc<SubscriberStore>, id: SubscriberId) -> SubscribeOutcome {
    let task_store = store.clone();
    match tokio::task::spawn_blocking(move || task_store.add(id)).await {
        Ok(Ok(true)) => {
            info!(%id, subscribers = store.len(), "New subscriber");
            SubscribeOutcome::Subscribed
        }
        Ok(Ok(false)) => SubscribeOutcome::AlreadySubscribed,
        // The store has already logged the write failure
        Ok(Err(_)) => SubscribeOutcome::Unsaved,
        Err(e) => {
            error!(%id, error = %e, "Subscribe task failed");
            SubscribeOutcome::Unsaved
        }
    }
}

impl SubscribeOutcome {
    pub fn reply(&self, schedule: &Schedule) -> String {
        match self {
            SubscribeOutcome::Subscribed => format!(
                "Subscription activated.\nEvery day at {} you will receive the weather and a good news story.",
                schedule
            ),
            SubscribeOutcome::AlreadySubscribed => format!(
                "You are already subscribed. The next digest arrives at {}.",
                schedule
            ),
            SubscribeOutcome::Unsaved => format!(
                "Subscription activated for now, but it could not be saved and may be lost if the bot restarts.\nDigests are sent daily at {}.",
                schedule
            ),
        }
    }
}
