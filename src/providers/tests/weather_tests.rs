// src/providers/tests/weather_tests.rs

use super::super::weather::{parse_current_weather, OpenWeather};
use super::{serve_once, serve_silence, SHORT_TIMEOUT};
use crate::error::ProviderError;
use crate::models::{Location, WeatherReport, WeatherSummary};
use crate::providers::WeatherSource;

#[test]
fn test_parse_full_response() {
    let body = r#"{
        "coord": {"lon": 37.6176, "lat": 55.7558},
        "weather": [{"id": 601, "main": "Snow", "description": "snow", "icon": "13d"}],
        "main": {"temp": -3.2, "feels_like": -7.4, "temp_min": -4.0, "temp_max": -2.0, "pressure": 1012, "humidity": 80},
        "name": "Moscow"
    }"#;

    let summary = parse_current_weather(body).unwrap();
    assert_eq!(
        summary,
        WeatherSummary {
            temperature: -3,
            feels_like: -7,
            humidity: 80,
            description: "Snow".to_string(),
        }
    );
}

#[test]
fn test_rounding_and_capitalization() {
    let body = r#"{"weather": [{"description": "  light intensity drizzle "}],
                   "main": {"temp": 12.5, "feels_like": 11.49, "humidity": 99.6}}"#;

    let summary = parse_current_weather(body).unwrap();
    assert_eq!(summary.temperature, 13);
    assert_eq!(summary.feels_like, 11);
    assert_eq!(summary.humidity, 100);
    assert_eq!(summary.description, "Light intensity drizzle");
}

#[test]
fn test_any_missing_field_fails_whole_summary() {
    let cases = [
        (r#"{"weather": [{"description": "snow"}]}"#, "main"),
        (
            r#"{"weather": [{"description": "snow"}], "main": {"feels_like": 1, "humidity": 2}}"#,
            "main.temp",
        ),
        (
            r#"{"weather": [{"description": "snow"}], "main": {"temp": 1, "humidity": 2}}"#,
            "main.feels_like",
        ),
        (
            r#"{"weather": [{"description": "snow"}], "main": {"temp": 1, "feels_like": 2}}"#,
            "main.humidity",
        ),
        (
            r#"{"weather": [], "main": {"temp": 1, "feels_like": 2, "humidity": 3}}"#,
            "weather[0].description",
        ),
        (
            r#"{"weather": [{"description": ""}], "main": {"temp": 1, "feels_like": 2, "humidity": 3}}"#,
            "weather[0].description",
        ),
    ];

    for (body, field) in cases {
        match parse_current_weather(body) {
            Err(ProviderError::MissingField(missing)) => assert_eq!(missing, field),
            other => panic!("Expected missing {}, got {:?}", field, other),
        }
    }
}

#[test]
fn test_malformed_body() {
    let result = parse_current_weather("<html>502 Bad Gateway</html>");
    assert!(matches!(result, Err(ProviderError::Malformed(_))));
}

fn moscow() -> Location {
    Location {
        name: "Moscow".to_string(),
        latitude: 55.7558,
        longitude: 37.6176,
    }
}

fn client(base_url: String) -> OpenWeather {
    OpenWeather::new("test-key", "en", SHORT_TIMEOUT)
        .unwrap()
        .with_base_url(base_url)
}

#[tokio::test]
async fn test_fetch_success() {
    let url = serve_once(
        "200 OK",
        r#"{"weather": [{"description": "clear sky"}], "main": {"temp": 21.6, "feels_like": 20.9, "humidity": 40}}"#,
    )
    .await;

    match client(url).fetch(&moscow()).await {
        WeatherReport::Summary(summary) => {
            assert_eq!(summary.temperature, 22);
            assert_eq!(summary.description, "Clear sky");
        }
        WeatherReport::Fallback => panic!("Expected a summary"),
    }
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let url = serve_once("500 Internal Server Error", r#"{"cod": 500}"#).await;
    match client(url).get_current(&moscow()).await {
        Err(ProviderError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("Expected status error, got {:?}", other),
    }

    let url = serve_once("500 Internal Server Error", r#"{"cod": 500}"#).await;
    assert_eq!(client(url).fetch(&moscow()).await, WeatherReport::Fallback);
}

#[tokio::test]
async fn test_rate_limit_falls_back() {
    let url = serve_once("429 Too Many Requests", r#"{"cod": 429}"#).await;
    assert!(matches!(
        client(url).get_current(&moscow()).await,
        Err(ProviderError::RateLimited)
    ));

    let url = serve_once("429 Too Many Requests", r#"{"cod": 429}"#).await;
    assert_eq!(client(url).fetch(&moscow()).await, WeatherReport::Fallback);
}

#[tokio::test]
async fn test_timeout_falls_back() {
    let url = serve_silence().await;
    assert_eq!(client(url).fetch(&moscow()).await, WeatherReport::Fallback);
}
