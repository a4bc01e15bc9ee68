// Vacancy sources and the fetch → normalize → persist → report runner.

pub mod headhunter;
pub mod runner;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppError;

/// What to ask a source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchQuery {
    /// Page through a keyword search, `pages` pages of `per_page` items.
    Keyword {
        text: String,
        pages: u32,
        per_page: u32,
    },
    /// One request per employer for up to `per_page` open vacancies.
    Employers { ids: Vec<i64>, per_page: u32 },
}

/// Trait that all vacancy sources must implement.
/// A source returns raw, unvalidated items; normalization happens later.
#[async_trait]
pub trait VacancySource: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Fetch raw items. Individual failed pages yield no items rather than
    /// an error; transport failures propagate.
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Value>, AppError>;
}
