use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{Connection, PgConnection};

use crate::config::DbSettings;
use crate::db;
use crate::error::AppError;
use crate::models::organization::{CompanyVacancies, Organization};
use crate::models::vacancy::{Vacancy, VacancyRow, VacancySummary};
use crate::store::{UpsertSummary, VacancyStore};

/// PostgreSQL-backed store owning a single connection.
///
/// Created unconnected; every operation fails with
/// [`AppError::NotInitialized`] until [`DbManager::open`] succeeds.
pub struct DbManager {
    settings: DbSettings,
    conn: Option<PgConnection>,
}

impl DbManager {
    pub fn new(settings: DbSettings) -> Self {
        Self {
            settings,
            conn: None,
        }
    }

    /// Provision the database if needed, connect and ensure the tables exist.
    pub async fn open(&mut self) -> Result<(), AppError> {
        db::create_database(&self.settings).await?;
        let mut conn = db::connect(&self.settings).await?;
        if let Err(e) = db::run_migrations(&mut conn).await {
            let _ = conn.close().await;
            return Err(e);
        }
        tracing::info!(
            "Connected to {}:{}/{}",
            self.settings.host,
            self.settings.port,
            self.settings.database_name
        );
        self.conn = Some(conn);
        Ok(())
    }

    /// Release the connection. Safe to call when not connected.
    pub async fn close(&mut self) -> Result<(), AppError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            tracing::debug!("Database connection closed");
        }
        Ok(())
    }

    fn connection(&mut self) -> Result<&mut PgConnection, AppError> {
        self.conn.as_mut().ok_or_else(|| {
            AppError::NotInitialized(
                "database connection is not open; call DbManager::open first".to_string(),
            )
        })
    }

    /// Row counts of `(organizations, vacancy)`.
    pub async fn table_counts(&mut self) -> Result<(i64, i64), AppError> {
        let conn = self.connection()?;
        let organizations = Organization::count(conn).await?;
        let vacancies = Vacancy::count(conn).await?;
        Ok((organizations, vacancies))
    }
}

/// Run `f` against an open [`DbManager`], closing it afterwards whether or
/// not `f` succeeded.
///
/// ```ignore
/// let avg = with_manager(settings, |db| Box::pin(db.get_avg_salary())).await?;
/// ```
pub async fn with_manager<T, F>(settings: DbSettings, f: F) -> Result<T, AppError>
where
    T: Send,
    F: for<'a> FnOnce(&'a mut DbManager) -> BoxFuture<'a, Result<T, AppError>>,
{
    let mut manager = DbManager::new(settings);
    if let Err(e) = manager.open().await {
        let _ = manager.close().await;
        return Err(e);
    }

    let result = f(&mut manager).await;

    match (result, manager.close().await) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), close) => {
            if let Err(close_err) = close {
                tracing::warn!("Failed to close database connection: {close_err}");
            }
            Err(e)
        }
    }
}

#[async_trait]
impl VacancyStore for DbManager {
    async fn add_vacancy(&mut self, vacancies: &[Vacancy]) -> Result<UpsertSummary, AppError> {
        let conn = self.connection()?;
        let mut summary = UpsertSummary {
            found: vacancies.len(),
            ..Default::default()
        };

        for vacancy in vacancies {
            if vacancy.organization().insert_or_ignore(conn).await? {
                summary.organizations_inserted += 1;
            }
            if vacancy.insert_or_ignore(conn).await? {
                summary.vacancies_inserted += 1;
            }
        }

        tracing::info!(
            "Stored {} vacancies: {} new, {} new organizations",
            summary.found,
            summary.vacancies_inserted,
            summary.organizations_inserted
        );
        Ok(summary)
    }

    async fn get_companies_and_vacancies_count(
        &mut self,
    ) -> Result<Vec<CompanyVacancies>, AppError> {
        Organization::vacancy_counts(self.connection()?).await
    }

    async fn get_all_vacancies(&mut self) -> Result<Vec<VacancySummary>, AppError> {
        Vacancy::list_with_company(self.connection()?).await
    }

    async fn get_avg_salary(&mut self) -> Result<f64, AppError> {
        Vacancy::average_salary(self.connection()?).await
    }

    async fn get_vacancies_with_higher_salary(&mut self) -> Result<Vec<VacancyRow>, AppError> {
        let avg = self.get_avg_salary().await?;
        Vacancy::with_salary_above(self.connection()?, avg).await
    }

    async fn get_vacancies_with_keyword(
        &mut self,
        keyword: &str,
    ) -> Result<Vec<VacancyRow>, AppError> {
        Vacancy::search_by_name(self.connection()?, keyword).await
    }
}
