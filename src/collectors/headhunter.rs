use async_trait::async_trait;
use serde_json::Value;

use crate::collectors::{FetchQuery, VacancySource};
use crate::error::AppError;

pub const DEFAULT_PAGES: u32 = 2;
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Employers fetched in enumeration mode when none are given on the
/// command line: Yandex, Sber, T-Bank, VK, Kaspersky, Ozon, Avito, 2GIS,
/// Positive Technologies, MTS.
pub const DEFAULT_EMPLOYERS: [i64; 10] = [
    1740, 3529, 78638, 15478, 1057, 2180, 84585, 64174, 87021, 3776,
];

/// Client for the public HeadHunter API.
pub struct HeadHunter {
    client: reqwest::Client,
    base_url: String,
}

#[async_trait]
impl VacancySource for HeadHunter {
    fn name(&self) -> &str {
        "headhunter"
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Value>, AppError> {
        self.connect_to_api().await;

        match query {
            FetchQuery::Keyword {
                text,
                pages,
                per_page,
            } => self.search(text, *pages, *per_page).await,
            FetchQuery::Employers { ids, per_page } => self.by_employers(ids, *per_page).await,
        }
    }
}

impl HeadHunter {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Touch the API root before real queries. The outcome is only logged.
    async fn connect_to_api(&self) {
        match self.client.get(&self.base_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!("HeadHunter handshake ok");
            }
            Ok(resp) => {
                tracing::warn!("HeadHunter handshake returned {}", resp.status());
            }
            Err(e) => {
                tracing::warn!("HeadHunter handshake failed: {e}");
            }
        }
    }

    async fn search(&self, text: &str, pages: u32, per_page: u32) -> Result<Vec<Value>, AppError> {
        let mut items = Vec::new();
        for page in 0..pages {
            let params = [
                ("text", text.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ];
            let batch = self.get_items(&params).await?;
            tracing::info!("Page {page} for '{text}': {} items", batch.len());
            items.extend(batch);
        }
        Ok(items)
    }

    async fn by_employers(&self, ids: &[i64], per_page: u32) -> Result<Vec<Value>, AppError> {
        let mut items = Vec::new();
        for id in ids {
            let params = [
                ("employer_id", id.to_string()),
                ("per_page", per_page.to_string()),
            ];
            let batch = self.get_items(&params).await?;
            tracing::info!("Employer {id}: {} items", batch.len());
            items.extend(batch);
        }
        Ok(items)
    }

    /// GET `/vacancies` and return its `items`. A non-success status yields
    /// an empty page.
    async fn get_items(&self, params: &[(&str, String)]) -> Result<Vec<Value>, AppError> {
        let url = format!("{}/vacancies", self.base_url);
        let resp = self.client.get(&url).query(params).send().await?;

        if !resp.status().is_success() {
            tracing::warn!("HeadHunter returned {} for {params:?}", resp.status());
            return Ok(Vec::new());
        }

        let data: Value = resp.json().await?;
        Ok(parse_items(&data))
    }
}

fn parse_items(data: &Value) -> Vec<Value> {
    match data.get("items").and_then(|v| v.as_array()) {
        Some(items) => items.clone(),
        None => {
            tracing::warn!("Response has no 'items' array");
            Vec::new()
        }
    }
}
