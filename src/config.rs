use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{FixedOffset, NaiveTime};

use crate::core::scheduler::Schedule;
use crate::models::Location;
use crate::providers::news::{self, Complete, Headline, NewsFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsFilterKind {
    Headline,
    Complete,
}

impl NewsFilterKind {
    pub fn build(self) -> Arc<dyn NewsFilter> {
        match self {
            NewsFilterKind::Headline => Arc::new(Headline),
            NewsFilterKind::Complete => Arc::new(Complete),
        }
    }
}

impl FromStr for NewsFilterKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headline" => Ok(NewsFilterKind::Headline),
            "complete" => Ok(NewsFilterKind::Complete),
            other => bail!("unknown news filter '{}', expected 'headline' or 'complete'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub openweather_api_key: String,
    pub news_api_key: String,
    pub subscribers_file: PathBuf,
    pub location: Location,
    pub schedule: Schedule,
    pub request_timeout: Duration,
    pub weather_language: String,
    pub news_query: String,
    pub news_language: String,
    pub news_filter: NewsFilterKind,
    pub prune_unreachable: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env is fine, variables may come from the environment
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let required = ["TELEGRAM_BOT_TOKEN", "OPENWEATHER_API_KEY", "NEWS_API_KEY"];
        let missing: Vec<&str> = required.iter().copied().filter(|k| get(*k).is_none()).collect();
        if !missing.is_empty() {
            bail!("Missing required environment variables: {}", missing.join(", "));
        }
        let required_value = |key: &str| get(key).ok_or_else(|| anyhow!("{} not set", key));

        let time = match get("DIGEST_TIME") {
            Some(raw) => parse_time(&raw).context("Invalid DIGEST_TIME")?,
            None => NaiveTime::from_hms_opt(9, 0, 0).ok_or_else(|| anyhow!("invalid default time"))?,
        };
        let offset = parse_offset(&get("DIGEST_UTC_OFFSET").unwrap_or_else(|| "+03:00".to_string()))
            .context("Invalid DIGEST_UTC_OFFSET")?;

        let timeout_secs: u64 =
            parse_or(get("REQUEST_TIMEOUT_SECS"), 15).context("Invalid REQUEST_TIMEOUT_SECS")?;
        if timeout_secs == 0 {
            bail!("Invalid REQUEST_TIMEOUT_SECS: must be at least 1 second");
        }

        Ok(Config {
            telegram_bot_token: required_value("TELEGRAM_BOT_TOKEN")?,
            openweather_api_key: required_value("OPENWEATHER_API_KEY")?,
            news_api_key: required_value("NEWS_API_KEY")?,
            subscribers_file: get("SUBSCRIBERS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("storage/subscribers.json")),
            location: Location {
                name: get("LOCATION_NAME").unwrap_or_else(|| "Moscow".to_string()),
                latitude: parse_or(get("LOCATION_LAT"), 55.7558).context("Invalid LOCATION_LAT")?,
                longitude: parse_or(get("LOCATION_LON"), 37.6176).context("Invalid LOCATION_LON")?,
            },
            schedule: Schedule::new(time, offset),
            request_timeout: Duration::from_secs(timeout_secs),
            weather_language: get("WEATHER_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            news_query: get("NEWS_QUERY").unwrap_or_else(|| news::DEFAULT_QUERY.to_string()),
            news_language: get("NEWS_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            news_filter: parse_or(get("NEWS_FILTER"), NewsFilterKind::Headline)
                .context("Invalid NEWS_FILTER")?,
            prune_unreachable: parse_or(get("PRUNE_UNREACHABLE"), true)
                .context("Invalid PRUNE_UNREACHABLE")?,
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| anyhow!("cannot parse '{}': {}", raw, e)),
        None => Ok(default),
    }
}

/// `HH:MM` in 24 hour time.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("expected HH:MM, got '{}'", raw))
}

/// `+HH:MM`, `-HH:MM` or `Z`.
pub fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"));
    }

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        bail!("offset must start with '+' or '-', got '{}'", raw);
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("expected +HH:MM, got '{}'", raw))?;
    let hours: i32 = hours.parse().with_context(|| format!("bad hours in '{}'", raw))?;
    let minutes: i32 = minutes.parse().with_context(|| format!("bad minutes in '{}'", raw))?;
    if !(0..60).contains(&minutes) {
        bail!("minutes out of range in '{}'", raw);
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("offset out of range: '{}'", raw))
}
