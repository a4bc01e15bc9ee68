pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;
use crate::models::organization::CompanyVacancies;
use crate::models::vacancy::{Vacancy, VacancyRow, VacancySummary};

/// Rows written by one `add_vacancy` call. Conflicting ids are skipped and
/// show up only as the difference to `found`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub found: usize,
    pub organizations_inserted: usize,
    pub vacancies_inserted: usize,
}

/// Persistence and reporting over stored vacancies.
#[async_trait]
pub trait VacancyStore: Send {
    /// Insert organization then vacancy for each record, skipping known ids.
    async fn add_vacancy(&mut self, vacancies: &[Vacancy]) -> Result<UpsertSummary, AppError>;

    /// Vacancy count per company name, one row per name with a vacancy.
    async fn get_companies_and_vacancies_count(
        &mut self,
    ) -> Result<Vec<CompanyVacancies>, AppError>;

    async fn get_all_vacancies(&mut self) -> Result<Vec<VacancySummary>, AppError>;

    /// Mean of `avg(salary_from)` and `avg(salary_to)`; 0.0 when empty.
    async fn get_avg_salary(&mut self) -> Result<f64, AppError>;

    /// Vacancies whose `salary_to` is strictly above [`get_avg_salary`].
    ///
    /// [`get_avg_salary`]: VacancyStore::get_avg_salary
    async fn get_vacancies_with_higher_salary(&mut self) -> Result<Vec<VacancyRow>, AppError>;

    /// Case-insensitive substring match on the vacancy name.
    async fn get_vacancies_with_keyword(
        &mut self,
        keyword: &str,
    ) -> Result<Vec<VacancyRow>, AppError>;
}
