use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ProviderError;
use crate::models::{NewsItem, NewsReport};
use crate::providers::NewsSource;

const NEWS_URL: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_QUERY: &str = "good OR positive OR inspiring OR breakthrough OR success";
const PAGE_SIZE: u32 = 20;
pub const MAX_DESCRIPTION_LEN: usize = 260;

// NewsAPI swaps the content of taken-down articles for this marker
const REMOVED_MARKER: &str = "[Removed]";

#[derive(Debug, Deserialize)]
pub struct EverythingResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Article {
    #[serde(default)]
    pub source: Option<ArticleSource>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

/// Decides whether a candidate may be picked as the item of the day.
pub trait NewsFilter: Send + Sync {
    fn accepts(&self, item: &NewsItem) -> bool;
}

impl<F> NewsFilter for F
where
    F: Fn(&NewsItem) -> bool + Send + Sync,
{
    fn accepts(&self, item: &NewsItem) -> bool {
        self(item)
    }
}

/// Anything with a real headline.
pub struct Headline;

impl NewsFilter for Headline {
    fn accepts(&self, item: &NewsItem) -> bool {
        !item.title.is_empty() && item.title != REMOVED_MARKER
    }
}

/// Headline, description and link must all be present.
pub struct Complete;

impl NewsFilter for Complete {
    fn accepts(&self, item: &NewsItem) -> bool {
        Headline.accepts(item) && item.description.is_some() && item.url.is_some()
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
    format!("{}...", cut.trim_end())
}

impl Article {
    fn into_item(self, date: NaiveDate) -> NewsItem {
        NewsItem {
            title: clean(self.title).unwrap_or_default(),
            description: clean(self.description).map(|d| truncate_description(&d)),
            url: clean(self.url),
            source: self.source.and_then(|s| clean(s.name)),
            date,
        }
    }
}

/// First candidate, in provider order, that the filter accepts.
pub fn select_item(articles: Vec<Article>, filter: &dyn NewsFilter, date: NaiveDate) -> Option<NewsItem> {
    articles
        .into_iter()
        .map(|article| article.into_item(date))
        .find(|item| filter.accepts(item))
}

pub fn parse_everything(body: &str) -> Result<Vec<Article>, ProviderError> {
    let response: EverythingResponse = serde_json::from_str(body)?;
    if response.status == "error" {
        return Err(ProviderError::Api(
            response
                .message
                .unwrap_or_else(|| "Unknown News API error".to_string()),
        ));
    }
    Ok(response.articles)
}

/// NewsAPI "everything" search client.
pub struct NewsApi {
    api_key: String,
    query: String,
    language: String,
    filter: Arc<dyn NewsFilter>,
    base_url: String,
    client: reqwest::Client,
}

impl NewsApi {
    pub fn new(
        api_key: &str,
        query: &str,
        language: &str,
        filter: Arc<dyn NewsFilter>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create news HTTP client")?;

        Ok(NewsApi {
            api_key: api_key.to_string(),
            query: query.to_string(),
            language: language.to_string(),
            filter,
            base_url: NEWS_URL.to_string(),
            client,
        })
    }

    /// Points the client at another endpoint, such as a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn get_articles(&self, for_date: NaiveDate) -> Result<Vec<Article>, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Api-Key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| ProviderError::Api("API key is not a valid header value".to_string()))?,
        );

        let from = for_date.format("%Y-%m-%d").to_string();
        let to = for_date
            .succ_opt()
            .unwrap_or(for_date)
            .format("%Y-%m-%d")
            .to_string();
        debug!(%from, %to, "Requesting news");

        let response = self
            .client
            .get(&self.base_url)
            .headers(headers)
            .query(&[
                ("q", self.query.as_str()),
                ("language", self.language.as_str()),
                ("sortBy", "popularity"),
                ("from", from.as_str()),
                ("to", to.as_str()),
            ])
            .query(&[("pageSize", PAGE_SIZE)])
            .send()
            .await?;

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

        let body = response.text().await?;
        parse_everything(&body)
    }
}

#[async_trait]
impl NewsSource for NewsApi {
    async fn fetch(&self, for_date: NaiveDate) -> NewsReport {
        let articles = match self.get_articles(for_date).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(error = %e, date = %for_date, "News request failed, using fallback");
                return NewsReport::Fallback;
            }
        };

        let candidates = articles.len();
        match select_item(articles, self.filter.as_ref(), for_date) {
            Some(item) => {
                info!(candidates, title = %item.title, "Picked news item");
                NewsReport::Item(item)
            }
            None => {
                warn!(candidates, date = %for_date, "No acceptable news item, using fallback");
                NewsReport::Fallback
            }
        }
    }
}
