pub mod news;
pub mod telegram;
pub mod weather;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::DeliveryError;
use crate::models::{Location, NewsReport, SubscriberId, WeatherReport};

/// Current conditions for a place. Implementations never fail, they fall back.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, location: &Location) -> WeatherReport;
}

/// One news item covering `for_date`, or the fallback.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, for_date: NaiveDate) -> NewsReport;
}

/// Outbound half of the chat transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, recipient: SubscriberId, text: &str) -> Result<(), DeliveryError>;
}
