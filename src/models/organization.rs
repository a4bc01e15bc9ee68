use serde::Serialize;
use sqlx::PgConnection;

use crate::error::AppError;

/// The employer a vacancy belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Organization {
    pub company_id: i64,
    pub company_name: String,
}

/// Vacancy count per company name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CompanyVacancies {
    pub company_name: String,
    pub vacancies: i64,
}

impl Organization {
    /// Insert unless the company id is already known. Existing names are left
    /// untouched.
    pub async fn insert_or_ignore(&self, conn: &mut PgConnection) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO organizations (company_id, company_name) VALUES ($1, $2) ON CONFLICT (company_id) DO NOTHING",
        )
        .bind(self.company_id)
        .bind(&self.company_name)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Companies with at least one vacancy, grouped by name.
    pub async fn vacancy_counts(conn: &mut PgConnection) -> Result<Vec<CompanyVacancies>, AppError> {
        let rows = sqlx::query_as::<_, CompanyVacancies>(
            "SELECT o.company_name, COUNT(*) AS vacancies FROM organizations o INNER JOIN vacancy v USING (company_id) GROUP BY o.company_name ORDER BY o.company_name",
        )
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    pub async fn count(conn: &mut PgConnection) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations")
            .fetch_one(conn)
            .await?;
        Ok(row.0)
    }
}
