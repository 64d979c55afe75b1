use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identifier as assigned by the transport (a Telegram chat id).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct SubscriberId(pub i64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeatherSummary {
    pub temperature: i64,
    pub feels_like: i64,
    pub humidity: u8,
    pub description: String,
}

/// Either a complete weather summary or the fallback. There are no partial summaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WeatherReport {
    Summary(WeatherSummary),
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    /// Calendar day the item was picked for.
    pub date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NewsReport {
    Item(NewsItem),
    Fallback,
}
