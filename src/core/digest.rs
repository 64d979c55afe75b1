use crate::models::{NewsReport, WeatherReport};

pub const WEATHER_FALLBACK: &str =
    "🌡 Weather: temporarily unavailable (the provider did not answer or the quota is exhausted).";
pub const NEWS_FALLBACK: &str =
    "Could not find a good news story today (none matched or the provider is unavailable).";

/// Renders the daily message. Total over every weather/news combination.
pub fn compose(location: &str, weather: &WeatherReport, news: &NewsReport) -> String {
    let mut lines = vec![
        "Good morning ☀️".to_string(),
        String::new(),
        format!("📍 {}", location),
    ];

    match weather {
        WeatherReport::Summary(w) => {
            lines.push(format!("🌡 Temperature: {}°C", w.temperature));
            lines.push(format!("🤍 Feels like: {}°C", w.feels_like));
            lines.push(format!("💧 Humidity: {}%", w.humidity));
            lines.push(format!("🌤 Conditions: {}", w.description));
        }
        WeatherReport::Fallback => lines.push(WEATHER_FALLBACK.to_string()),
    }

    lines.push(String::new());
    lines.push("📰 Good news of the day:".to_string());

    match news {
        NewsReport::Item(item) => {
            lines.push(format!("🗓 {}", item.date.format("%Y-%m-%d")));
            lines.push(item.title.clone());
            if let Some(description) = &item.description {
                lines.push(description.clone());
            }
            if let Some(source) = &item.source {
                lines.push(format!("Source: {}", source));
            }
            if let Some(url) = &item.url {
                lines.push(url.clone());
            }
        }
        NewsReport::Fallback => lines.push(NEWS_FALLBACK.to_string()),
    }

    lines.join("\n")
}
