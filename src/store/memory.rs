use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::organization::CompanyVacancies;
use crate::models::vacancy::{Vacancy, VacancyRow, VacancySummary};
use crate::store::{UpsertSummary, VacancyStore};

/// In-process store with the same conflict-skip and query semantics as the
/// PostgreSQL tables. Used for `--dry-run` and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    organizations: BTreeMap<i64, String>,
    vacancies: BTreeMap<i64, VacancyRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row counts of `(organizations, vacancies)`.
    pub fn table_counts(&self) -> (usize, usize) {
        (self.organizations.len(), self.vacancies.len())
    }

    fn average(&self) -> f64 {
        if self.vacancies.is_empty() {
            return 0.0;
        }
        let n = self.vacancies.len() as f64;
        let from: f64 = self.vacancies.values().map(|v| f64::from(v.salary_from)).sum();
        let to: f64 = self.vacancies.values().map(|v| f64::from(v.salary_to)).sum();
        (from / n + to / n) / 2.0
    }
}

#[async_trait]
impl VacancyStore for MemoryStore {
    async fn add_vacancy(&mut self, vacancies: &[Vacancy]) -> Result<UpsertSummary, AppError> {
        let mut summary = UpsertSummary {
            found: vacancies.len(),
            ..Default::default()
        };

        for vacancy in vacancies {
            if !self.organizations.contains_key(&vacancy.company_id) {
                self.organizations
                    .insert(vacancy.company_id, vacancy.company_name.clone());
                summary.organizations_inserted += 1;
            }
            if !self.vacancies.contains_key(&vacancy.vacancy_id) {
                self.vacancies.insert(
                    vacancy.vacancy_id,
                    VacancyRow {
                        id: vacancy.vacancy_id,
                        company_id: vacancy.company_id,
                        name: vacancy.title.clone(),
                        address: vacancy.url.clone(),
                        salary_from: vacancy.salary_from,
                        salary_to: vacancy.salary_to,
                        description: Some(vacancy.description.clone()),
                    },
                );
                summary.vacancies_inserted += 1;
            }
        }

        tracing::info!(
            "Stored {} vacancies in memory: {} new, {} new organizations",
            summary.found,
            summary.vacancies_inserted,
            summary.organizations_inserted
        );
        Ok(summary)
    }

    async fn get_companies_and_vacancies_count(
        &mut self,
    ) -> Result<Vec<CompanyVacancies>, AppError> {
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for row in self.vacancies.values() {
            if let Some(name) = self.organizations.get(&row.company_id) {
                *counts.entry(name.as_str()).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(name, vacancies)| CompanyVacancies {
                company_name: name.to_string(),
                vacancies,
            })
            .collect())
    }

    async fn get_all_vacancies(&mut self) -> Result<Vec<VacancySummary>, AppError> {
        Ok(self
            .vacancies
            .values()
            .filter_map(|row| {
                let company = self.organizations.get(&row.company_id)?;
                Some(VacancySummary {
                    company_name: company.clone(),
                    vacancy_name: row.name.clone(),
                    salary: format!("{}-{}", row.salary_from, row.salary_to),
                    url: row.address.clone(),
                })
            })
            .collect())
    }

    async fn get_avg_salary(&mut self) -> Result<f64, AppError> {
        Ok(self.average())
    }

    async fn get_vacancies_with_higher_salary(&mut self) -> Result<Vec<VacancyRow>, AppError> {
        let avg = self.get_avg_salary().await?;
        Ok(self
            .vacancies
            .values()
            .filter(|row| f64::from(row.salary_to) > avg)
            .cloned()
            .collect())
    }

    async fn get_vacancies_with_keyword(
        &mut self,
        keyword: &str,
    ) -> Result<Vec<VacancyRow>, AppError> {
        let needle = keyword.to_lowercase();
        Ok(self
            .vacancies
            .values()
            .filter(|row| row.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
