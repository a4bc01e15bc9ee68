use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::collectors::{FetchQuery, VacancySource};
use crate::error::AppError;
use crate::models::organization::CompanyVacancies;
use crate::models::vacancy::{Vacancy, VacancyRow, VacancySummary, by_salary};
use crate::store::{UpsertSummary, VacancyStore};

/// How invalid items are handled during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidItems {
    /// Abort the run on the first invalid item.
    #[default]
    Abort,
    /// Log and drop invalid items.
    Skip,
}

/// Everything one run produced, ready to print.
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub fetched: usize,
    pub rejected: usize,
    pub stored: UpsertSummary,
    pub best_paid: Option<Vacancy>,
    pub companies: Vec<CompanyVacancies>,
    pub vacancies: Vec<VacancySummary>,
    pub average_salary: f64,
    pub above_average: Vec<VacancyRow>,
    pub keyword: String,
    pub keyword_matches: Vec<VacancyRow>,
}

/// Fetch, normalize and persist one batch, then run the report queries.
pub async fn run(
    source: &dyn VacancySource,
    store: &mut dyn VacancyStore,
    query: &FetchQuery,
    keyword: &str,
    invalid: InvalidItems,
) -> Result<Report, AppError> {
    tracing::info!("Fetching from '{}': {query:?}", source.name());
    let items = source.fetch(query).await?;
    tracing::info!("Fetched {} raw items", items.len());

    let (vacancies, rejected) = match invalid {
        InvalidItems::Abort => (Vacancy::cast_to_object_list(&items)?, 0),
        InvalidItems::Skip => Vacancy::cast_lenient(&items),
    };
    if rejected > 0 {
        tracing::warn!("Rejected {rejected} of {} items", items.len());
    }

    let stored = store.add_vacancy(&vacancies).await?;
    let best_paid = vacancies.iter().max_by(|a, b| by_salary(a, b)).cloned();

    Ok(Report {
        generated_at: Utc::now(),
        source: source.name().to_string(),
        fetched: items.len(),
        rejected,
        stored,
        best_paid,
        companies: store.get_companies_and_vacancies_count().await?,
        vacancies: store.get_all_vacancies().await?,
        average_salary: store.get_avg_salary().await?,
        above_average: store.get_vacancies_with_higher_salary().await?,
        keyword: keyword.to_string(),
        keyword_matches: store.get_vacancies_with_keyword(keyword).await?,
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::store::memory::MemoryStore;

    struct FakeSource {
        items: Vec<Value>,
    }

    #[async_trait]
    impl VacancySource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch(&self, _query: &FetchQuery) -> Result<Vec<Value>, AppError> {
            Ok(self.items.clone())
        }
    }

    fn raw(id: i64, name: &str, company_id: i64, company: &str, salary: i64) -> Value {
        json!({
            "id": id.to_string(),
            "name": name,
            "apply_alternate_url": format!("https://hh.ru/vacancy/{id}"),
            "salary_range": { "from": salary, "to": salary },
            "snippet": { "responsibility": null },
            "employer": { "id": company_id.to_string(), "name": company }
        })
    }

    fn query() -> FetchQuery {
        FetchQuery::Keyword {
            text: "python".into(),
            pages: 1,
            per_page: 10,
        }
    }

    #[tokio::test]
    async fn pipeline_reports_over_stored_batch() {
        let source = FakeSource {
            items: vec![
                raw(1, "Python Developer", 1, "Acme", 100),
                raw(2, "Go Developer", 2, "Acme", 200),
                raw(3, "Python Team Lead", 3, "Globex", 300),
            ],
        };
        let mut store = MemoryStore::new();

        let report = run(&source, &mut store, &query(), "python", InvalidItems::Abort)
            .await
            .unwrap();

        assert_eq!(report.source, "fake");
        assert_eq!(report.fetched, 3);
        assert_eq!(report.stored.vacancies_inserted, 3);
        assert_eq!(report.best_paid.as_ref().map(|v| v.vacancy_id), Some(3));
        assert_eq!(report.average_salary, 200.0);
        assert_eq!(report.above_average.len(), 1);
        assert_eq!(report.companies.len(), 2);
        assert_eq!(report.keyword_matches.len(), 2);
    }

    #[tokio::test]
    async fn invalid_item_aborts_by_default() {
        let mut bad = raw(2, "Broken", 1, "Acme", 0);
        bad["employer"]["id"] = json!("not-a-number");
        let source = FakeSource {
            items: vec![raw(1, "Ok", 1, "Acme", 0), bad],
        };
        let mut store = MemoryStore::new();

        let result = run(&source, &mut store, &query(), "ok", InvalidItems::Abort).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.table_counts(), (0, 0));
    }

    #[tokio::test]
    async fn skip_mode_stores_valid_items_only() {
        let mut bad = raw(2, "Broken", 1, "Acme", 0);
        bad.as_object_mut().unwrap().remove("apply_alternate_url");
        let source = FakeSource {
            items: vec![raw(1, "Ok", 1, "Acme", 0), bad],
        };
        let mut store = MemoryStore::new();

        let report = run(&source, &mut store, &query(), "ok", InvalidItems::Skip)
            .await
            .unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.stored.vacancies_inserted, 1);
        assert_eq!(store.table_counts(), (1, 1));
    }
}
