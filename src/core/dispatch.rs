use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::digest;
use crate::core::scheduler::Schedule;
use crate::models::{Location, SubscriberId};
use crate::providers::{ChatTransport, NewsSource, WeatherSource};
use crate::store::SubscriberStore;

/// What happened during one dispatch run.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<(SubscriberId, String)>,
    pub pruned: usize,
}

pub struct DigestDispatcher {
    store: Arc<SubscriberStore>,
    weather: Arc<dyn WeatherSource>,
    news: Arc<dyn NewsSource>,
    transport: Arc<dyn ChatTransport>,
    location: Location,
    schedule: Schedule,
    prune_unreachable: bool,
}

impl DigestDispatcher {
    pub fn new(
        store: Arc<SubscriberStore>,
        weather: Arc<dyn WeatherSource>,
        news: Arc<dyn NewsSource>,
        transport: Arc<dyn ChatTransport>,
        location: Location,
        schedule: Schedule,
    ) -> Self {
        DigestDispatcher {
            store,
            weather,
            news,
            transport,
            location,
            schedule,
            prune_unreachable: true,
        }
    }

    pub fn with_pruning(mut self, prune_unreachable: bool) -> Self {
        self.prune_unreachable = prune_unreachable;
        self
    }

    pub async fn run_daily_digest(&self) -> DispatchReport {
        self.run_daily_digest_at(Utc::now()).await
    }

    /// Fetch, compose and send to every subscriber once. Never fails as a whole.
    pub async fn run_daily_digest_at(&self, now: DateTime<Utc>) -> DispatchReport {
        let mut report = DispatchReport::default();

        let snapshot = self.store.snapshot();
        let recipients = snapshot.subscribers;
        if recipients.is_empty() {
            info!("No subscribers yet, skip digest");
            return report;
        }

        let news_date = self.schedule.yesterday(now);
        let (weather, news) = tokio::join!(
            self.weather.fetch(&self.location),
            self.news.fetch(news_date)
        );
        let message = digest::compose(&self.location.name, &weather, &news);

        info!(recipients = recipients.len(), %news_date, "Sending daily digest");

        let mut unreachable = Vec::new();
        for recipient in recipients {
            report.attempted += 1;
            match self.transport.send_message(recipient, &message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(%recipient, error = %e, "Cannot send digest");
                    if e.is_permanent() {
                        unreachable.push(recipient);
                    }
                    report.failed.push((recipient, e.to_string()));
                }
            }
        }

        if self.prune_unreachable && !unreachable.is_empty() {
            let store = self.store.clone();
            let since = snapshot.generation;
            let pruned =
                tokio::task::spawn_blocking(move || store.remove_all(&unreachable, since)).await;
            match pruned {
                Ok(Ok(removed)) => {
                    info!(removed, "Removed unreachable subscribers");
                    report.pruned = removed;
                }
                Ok(Err(e)) => warn!(error = %e, "Failed to remove unreachable subscribers"),
                Err(e) => warn!(error = %e, "Prune task failed"),
            }
        }

        report
    }
}
