use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::models::{Location, WeatherReport, WeatherSummary};
use crate::providers::WeatherSource;

const WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Deserialize)]
pub struct CurrentWeather {
    #[serde(default)]
    pub main: Option<MainReadings>,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
pub struct MainReadings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub description: Option<String>,
}

impl CurrentWeather {
    /// All four readings or nothing.
    pub fn into_summary(self) -> Result<WeatherSummary, ProviderError> {
        let main = self.main.ok_or(ProviderError::MissingField("main"))?;
        let temp = main.temp.ok_or(ProviderError::MissingField("main.temp"))?;
        let feels_like = main
            .feels_like
            .ok_or(ProviderError::MissingField("main.feels_like"))?;
        let humidity = main
            .humidity
            .ok_or(ProviderError::MissingField("main.humidity"))?;
        let description = self
            .weather
            .into_iter()
            .next()
            .and_then(|c| c.description)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or(ProviderError::MissingField("weather[0].description"))?;

        Ok(WeatherSummary {
            temperature: temp.round() as i64,
            feels_like: feels_like.round() as i64,
            humidity: humidity.round().clamp(0.0, 100.0) as u8,
            description: capitalize(&description),
        })
    }
}

pub fn parse_current_weather(body: &str) -> Result<WeatherSummary, ProviderError> {
    let response: CurrentWeather = serde_json::from_str(body)?;
    response.into_summary()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// OpenWeather "current weather" client.
pub struct OpenWeather {
    api_key: String,
    language: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenWeather {
    pub fn new(api_key: &str, language: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create weather HTTP client")?;

        Ok(OpenWeather {
            api_key: api_key.to_string(),
            language: language.to_string(),
            base_url: WEATHER_URL.to_string(),
            client,
        })
    }

    /// Points the client at another endpoint, such as a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn get_current(&self, location: &Location) -> Result<WeatherSummary, ProviderError> {
        debug!(location = %location.name, "Requesting current weather");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("units", "metric".to_string()),
                ("lang", self.language.clone()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            // The query string carries the api key
            .map_err(|e| e.without_url())?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| e.without_url())?;
        parse_current_weather(&body)
    }
}

#[async_trait]
impl WeatherSource for OpenWeather {
    async fn fetch(&self, location: &Location) -> WeatherReport {
        match self.get_current(location).await {
            Ok(summary) => WeatherReport::Summary(summary),
            Err(e) => {
                warn!(error = %e, location = %location.name, "Weather request failed, using fallback");
                WeatherReport::Fallback
            }
        }
    }
}
