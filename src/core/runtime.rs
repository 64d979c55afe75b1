use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::dispatch::DigestDispatcher;
use crate::core::scheduler::Scheduler;
use crate::providers::news::NewsApi;
use crate::providers::telegram::{CommandState, Telegram};
use crate::providers::weather::OpenWeather;
use crate::store::SubscriberStore;

pub struct Runtime {
    config: Config,
    store: Arc<SubscriberStore>,
    telegram: Telegram,
    dispatcher: Arc<DigestDispatcher>,
}

impl Runtime {
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(SubscriberStore::load(&config.subscribers_file));
        let telegram = Telegram::new(&config.telegram_bot_token);
        let weather = OpenWeather::new(
            &config.openweather_api_key,
            &config.weather_language,
            config.request_timeout,
        )?;
        let news = NewsApi::new(
            &config.news_api_key,
            &config.news_query,
            &config.news_language,
            config.news_filter.build(),
            config.request_timeout,
        )?;

        let dispatcher = DigestDispatcher::new(
            store.clone(),
            Arc::new(weather),
            Arc::new(news),
            Arc::new(telegram.clone()),
            config.location.clone(),
            config.schedule,
        )
        .with_pruning(config.prune_unreachable);

        Ok(Runtime {
            config,
            store,
            telegram,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub async fn run(self) -> Result<()> {
        info!("=== Starting Daily Digest Bot ===");
        info!(location = %self.config.location.name, "Location");
        info!(schedule = %self.config.schedule, "Digest time");
        info!(
            subscribers = self.store.len(),
            file = %self.store.path().display(),
            "Subscriber store"
        );
        if self.store.is_empty() {
            info!("No subscribers yet, send /start to the bot to subscribe");
        }

        let scheduler = Scheduler::new(self.config.schedule, self.dispatcher.clone());
        let scheduler_task = tokio::spawn(scheduler.run());

        let state = CommandState {
            store: self.store.clone(),
            schedule: self.config.schedule,
        };
        self.telegram.listen(state).await;

        info!("Command listener stopped, shutting down");
        scheduler_task.abort();
        if let Err(e) = scheduler_task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Scheduler task ended abnormally");
            }
        }
        Ok(())
    }
}
