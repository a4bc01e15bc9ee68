use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;
use sqlx::PgConnection;

use crate::error::AppError;
use crate::models::organization::Organization;

/// Stored when an item carries no responsibility snippet.
pub const NO_DESCRIPTION: &str = "no description";

/// A validated vacancy ready for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vacancy {
    pub vacancy_id: i64,
    pub title: String,
    pub url: String,
    pub salary_from: i32,
    pub salary_to: i32,
    pub description: String,
    pub company_id: i64,
    pub company_name: String,
}

/// A full row of the `vacancy` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct VacancyRow {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub address: String,
    pub salary_from: i32,
    pub salary_to: i32,
    pub description: Option<String>,
}

/// One line of the all-vacancies listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct VacancySummary {
    pub company_name: String,
    pub vacancy_name: String,
    pub salary: String,
    pub url: String,
}

/// Walk `path` through nested objects. Missing keys and non-object
/// intermediates yield `None`.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Sort key for vacancies: the upper salary bound.
pub fn salary_key(vacancy: &Vacancy) -> i32 {
    vacancy.salary_to
}

/// Orders vacancies by `salary_to`, ascending.
pub fn by_salary(a: &Vacancy, b: &Vacancy) -> Ordering {
    salary_key(a).cmp(&salary_key(b))
}

impl Vacancy {
    /// Build a vacancy from one raw API item.
    ///
    /// Ids, title, url and company name are required; salaries fall back to 0
    /// and the description to [`NO_DESCRIPTION`].
    pub fn from_raw(item: &Value) -> Result<Vacancy, AppError> {
        Ok(Vacancy {
            vacancy_id: required_id(item, &["id"])?,
            title: required_text(item, &["name"])?,
            url: required_text(item, &["apply_alternate_url"])?,
            salary_from: salary(item, "from"),
            salary_to: salary(item, "to"),
            description: lookup(item, &["snippet", "responsibility"])
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(NO_DESCRIPTION)
                .to_string(),
            company_id: required_id(item, &["employer", "id"])?,
            company_name: required_text(item, &["employer", "name"])?,
        })
    }

    /// Normalize a batch, preserving order. The first invalid item aborts
    /// the whole batch.
    pub fn cast_to_object_list(items: &[Value]) -> Result<Vec<Vacancy>, AppError> {
        items.iter().map(Vacancy::from_raw).collect()
    }

    /// Normalize a batch, dropping invalid items. Returns the valid vacancies
    /// and the number of rejected items.
    pub fn cast_lenient(items: &[Value]) -> (Vec<Vacancy>, usize) {
        let mut vacancies = Vec::with_capacity(items.len());
        let mut rejected = 0;
        for (index, item) in items.iter().enumerate() {
            match Vacancy::from_raw(item) {
                Ok(vacancy) => vacancies.push(vacancy),
                Err(e) => {
                    tracing::warn!("Skipping item {index}: {e}");
                    rejected += 1;
                }
            }
        }
        (vacancies, rejected)
    }

    pub fn organization(&self) -> Organization {
        Organization {
            company_id: self.company_id,
            company_name: self.company_name.clone(),
        }
    }

    /// Insert unless a vacancy with the same id exists. Returns whether a row
    /// was written.
    pub async fn insert_or_ignore(&self, conn: &mut PgConnection) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO vacancy (id, name, address, salary_from, salary_to, description, company_id) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.vacancy_id)
        .bind(&self.title)
        .bind(&self.url)
        .bind(self.salary_from)
        .bind(self.salary_to)
        .bind(&self.description)
        .bind(self.company_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_with_company(
        conn: &mut PgConnection,
    ) -> Result<Vec<VacancySummary>, AppError> {
        let rows = sqlx::query_as::<_, VacancySummary>(
            "SELECT o.company_name, v.name AS vacancy_name, v.salary_from::text || '-' || v.salary_to::text AS salary, v.address AS url FROM organizations o INNER JOIN vacancy v USING (company_id) ORDER BY v.id",
        )
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    /// `(avg(salary_from) + avg(salary_to)) / 2`, or 0.0 for an empty table.
    pub async fn average_salary(conn: &mut PgConnection) -> Result<f64, AppError> {
        let row: (Option<f64>,) = sqlx::query_as(
            "SELECT ((AVG(salary_from) + AVG(salary_to)) / 2)::float8 FROM vacancy",
        )
        .fetch_one(conn)
        .await?;
        Ok(row.0.unwrap_or(0.0))
    }

    pub async fn with_salary_above(
        conn: &mut PgConnection,
        threshold: f64,
    ) -> Result<Vec<VacancyRow>, AppError> {
        let rows = sqlx::query_as::<_, VacancyRow>(
            "SELECT * FROM vacancy WHERE salary_to > $1::float8 ORDER BY id",
        )
        .bind(threshold)
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    pub async fn search_by_name(
        conn: &mut PgConnection,
        keyword: &str,
    ) -> Result<Vec<VacancyRow>, AppError> {
        let rows = sqlx::query_as::<_, VacancyRow>(
            "SELECT * FROM vacancy WHERE name ILIKE $1 ORDER BY id",
        )
        .bind(like_pattern(keyword))
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    pub async fn count(conn: &mut PgConnection) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vacancy")
            .fetch_one(conn)
            .await?;
        Ok(row.0)
    }
}

/// Substring pattern for `LIKE`/`ILIKE` with the keyword's wildcards escaped.
pub fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn required_id(item: &Value, path: &[&str]) -> Result<i64, AppError> {
    let dotted = path.join(".");
    match lookup(item, path) {
        None | Some(Value::Null) => Err(AppError::missing_field(&dotted)),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| AppError::invalid_field(&dotted, "not an integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::invalid_field(&dotted, "not a numeric string")),
        Some(_) => Err(AppError::invalid_field(&dotted, "expected integer or string")),
    }
}

fn required_text(item: &Value, path: &[&str]) -> Result<String, AppError> {
    let dotted = path.join(".");
    match lookup(item, path) {
        None | Some(Value::Null) => Err(AppError::missing_field(&dotted)),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(AppError::invalid_field(&dotted, "empty string")),
        Some(_) => Err(AppError::invalid_field(&dotted, "expected a string")),
    }
}

fn salary(item: &Value, bound: &str) -> i32 {
    lookup(item, &["salary_range", bound])
        .and_then(|v| v.as_i64())
        .and_then(|v| i32::try_from(v).ok())
        .filter(|v| *v >= 0)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn item() -> Value {
        json!({
            "id": "93353083",
            "name": "Senior Python Developer",
            "apply_alternate_url": "https://hh.ru/applicant/vacancy_response?vacancyId=93353083",
            "salary_range": { "from": 150000, "to": 250000, "currency": "RUR" },
            "snippet": { "responsibility": "Build data pipelines." },
            "employer": { "id": "1740", "name": "Yandex" }
        })
    }

    #[test]
    fn well_formed_item_is_normalized() {
        let vacancy = Vacancy::from_raw(&item()).unwrap();
        assert_eq!(vacancy.vacancy_id, 93353083);
        assert_eq!(vacancy.title, "Senior Python Developer");
        assert_eq!(vacancy.salary_from, 150000);
        assert_eq!(vacancy.salary_to, 250000);
        assert_eq!(vacancy.description, "Build data pipelines.");
        assert_eq!(vacancy.company_id, 1740);
        assert_eq!(vacancy.company_name, "Yandex");
    }

    #[rstest]
    #[case(json!(42), 42)]
    #[case(json!("42"), 42)]
    #[case(json!(" 7 "), 7)]
    #[case(json!(-3), -3)]
    fn numeric_ids_resolve_to_integers(#[case] id: Value, #[case] expected: i64) {
        let mut raw = item();
        raw["id"] = id.clone();
        raw["employer"]["id"] = id;
        let vacancy = Vacancy::from_raw(&raw).unwrap();
        assert_eq!(vacancy.vacancy_id, expected);
        assert_eq!(vacancy.company_id, expected);
    }

    #[rstest]
    #[case(json!("abc"))]
    #[case(json!(null))]
    #[case(json!(4.5))]
    #[case(json!(["1"]))]
    fn non_numeric_company_id_is_rejected(#[case] id: Value) {
        let mut raw = item();
        raw["employer"]["id"] = id;
        let err = Vacancy::from_raw(&raw).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{err}");
    }

    #[rstest]
    #[case("id")]
    #[case("name")]
    #[case("apply_alternate_url")]
    #[case("employer")]
    fn missing_required_key_is_rejected(#[case] key: &str) {
        let mut raw = item();
        raw.as_object_mut().unwrap().remove(key);
        assert!(matches!(
            Vacancy::from_raw(&raw),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut raw = item();
        raw["name"] = json!("");
        let err = Vacancy::from_raw(&raw).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn missing_salary_range_defaults_to_zero() {
        let mut raw = item();
        raw.as_object_mut().unwrap().remove("salary_range");
        let vacancy = Vacancy::from_raw(&raw).unwrap();
        assert_eq!((vacancy.salary_from, vacancy.salary_to), (0, 0));
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!(-100))]
    #[case(json!("50000"))]
    #[case(json!(9_999_999_999i64))]
    fn invalid_salary_bound_defaults_to_zero(#[case] bound: Value) {
        let mut raw = item();
        raw["salary_range"] = json!({ "from": bound, "to": 1000 });
        let vacancy = Vacancy::from_raw(&raw).unwrap();
        assert_eq!(vacancy.salary_from, 0);
        assert_eq!(vacancy.salary_to, 1000);
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({ "responsibility": null }))]
    #[case(json!({ "responsibility": "" }))]
    fn missing_description_uses_sentinel(#[case] snippet: Value) {
        let mut raw = item();
        raw["snippet"] = snippet;
        let vacancy = Vacancy::from_raw(&raw).unwrap();
        assert_eq!(vacancy.description, NO_DESCRIPTION);
    }

    #[test]
    fn batch_preserves_order() {
        let mut second = item();
        second["id"] = json!(2);
        let mut first = item();
        first["id"] = json!(1);
        let batch = Vacancy::cast_to_object_list(&[second, first]).unwrap();
        let ids: Vec<i64> = batch.iter().map(|v| v.vacancy_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn strict_batch_aborts_on_first_invalid_item() {
        let mut bad = item();
        bad["id"] = json!("n/a");
        assert!(Vacancy::cast_to_object_list(&[item(), bad, item()]).is_err());
    }

    #[test]
    fn lenient_batch_skips_invalid_items() {
        let mut bad = item();
        bad["employer"] = json!({ "name": "No id" });
        let (vacancies, rejected) = Vacancy::cast_lenient(&[item(), bad, item()]);
        assert_eq!(vacancies.len(), 2);
        assert_eq!(rejected, 1);
    }

    #[test]
    fn lookup_returns_none_for_missing_intermediate() {
        let raw = json!({ "salary_range": null, "snippet": "text" });
        assert!(lookup(&raw, &["salary_range", "from"]).is_none());
        assert!(lookup(&raw, &["snippet", "responsibility"]).is_none());
        assert!(lookup(&raw, &["nothing", "here"]).is_none());
        assert_eq!(lookup(&raw, &["snippet"]), Some(&json!("text")));
    }

    #[test]
    fn ordering_uses_salary_to_only() {
        let mut low = Vacancy::from_raw(&item()).unwrap();
        low.salary_from = 900_000;
        low.salary_to = 100;
        let high = Vacancy::from_raw(&item()).unwrap();
        assert_eq!(by_salary(&low, &high), Ordering::Less);

        let mut batch = vec![high.clone(), low.clone()];
        batch.sort_by(by_salary);
        assert_eq!(batch, vec![low, high]);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("python"), "%python%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
