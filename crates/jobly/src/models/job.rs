//! Jobs: create, filtered listing, lookup, partial update and removal.

use super::{double_option, ensure_known_fields, from_body, parse_query_value};
use crate::changeset::ValidationErrors;
use crate::client::GenericClient;
use crate::error::{JoblyError, JoblyResult};
use crate::partial_update::{FieldNameMap, UpdatePayload, sql_for_partial_update};
use crate::row::{FromRow, RowExt};
use crate::sql::{Sql, sql};
use crate::validate::contains_pattern;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio_postgres::Row;

pub(super) const JOB_COLUMNS: &str = "id, title, salary, equity, company_handle";

/// Payload fields [`Job::update`] accepts.
const UPDATABLE_FIELDS: &[&str] = &["title", "salary", "equity", "companyHandle"];

const COMPANY_HANDLE_MAX_LEN: usize = 25;

fn field_names() -> &'static FieldNameMap {
    static NAMES: OnceLock<FieldNameMap> = OnceLock::new();
    NAMES.get_or_init(|| FieldNameMap::from([("companyHandle", "company_handle")]))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

impl FromRow for Job {
    fn from_row(row: &Row) -> JoblyResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            title: row.try_get_column("title")?,
            salary: row.try_get_column("salary")?,
            equity: row.try_get_column("equity")?,
            company_handle: row.try_get_column("company_handle")?,
        })
    }
}

/// Input for [`Job::create`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub salary: Option<i32>,
    #[serde(default)]
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

impl NewJob {
    /// Parse a request body. Missing, mistyped or unknown fields are a bad request.
    pub fn from_json(body: serde_json::Value) -> JoblyResult<Self> {
        from_body(body)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::default();
        errs.check_len("title", &self.title, 1, None);
        if let Some(salary) = self.salary {
            errs.check_min("salary", salary, 0);
        }
        if let Some(equity) = self.equity {
            errs.check_range("equity", equity, Decimal::ZERO, Decimal::ONE);
        }
        errs.check_len(
            "companyHandle",
            &self.company_handle,
            1,
            Some(COMPANY_HANDLE_MAX_LEN),
        );
        errs
    }
}

/// Patch input for [`Job::patch`].
///
/// Absent fields are left alone; `salary` and `equity` may be set to `null`.
/// The owning company cannot be changed through a patch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub salary: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub equity: Option<Option<Decimal>>,
}

impl JobUpdate {
    pub fn from_json(body: serde_json::Value) -> JoblyResult<Self> {
        from_body(body)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::default();
        if let Some(title) = &self.title {
            errs.check_len("title", title, 1, None);
        }
        if let Some(Some(salary)) = self.salary {
            errs.check_min("salary", salary, 0);
        }
        if let Some(Some(equity)) = self.equity {
            errs.check_range("equity", equity, Decimal::ZERO, Decimal::ONE);
        }
        errs
    }

    /// The fields that were set, in declaration order.
    pub fn into_payload(self) -> UpdatePayload {
        let mut payload = UpdatePayload::new();
        if let Some(title) = self.title {
            payload.set("title", title);
        }
        if let Some(salary) = self.salary {
            payload.set("salary", salary);
        }
        if let Some(equity) = self.equity {
            payload.set("equity", equity);
        }
        payload
    }
}

/// Optional listing filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub min_salary: Option<i32>,
    /// `true` keeps only jobs with equity above zero; `false` is no filter.
    pub has_equity: Option<bool>,
}

impl JobFilter {
    /// Parse `title`, `minSalary` and `hasEquity` from query-string pairs.
    ///
    /// Any other key, or a value that does not parse, is a bad request.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> JoblyResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "title" => filter.title = Some(value.to_string()),
                "minSalary" => filter.min_salary = Some(parse_query_value(key, value)?),
                "hasEquity" => filter.has_equity = Some(parse_query_value(key, value)?),
                other => {
                    return Err(JoblyError::bad_request(format!("Unknown filter: {other}")));
                }
            }
        }
        filter.validate().into_result()?;
        Ok(filter)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::default();
        if let Some(min) = self.min_salary {
            errs.check_min("minSalary", min, 0);
        }
        errs
    }

    fn select_sql(&self) -> Sql {
        let mut conditions = Vec::new();
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            conditions.push(Sql::bound("title ILIKE ", contains_pattern(title)));
        }
        if let Some(min) = self.min_salary {
            conditions.push(Sql::bound("salary >= ", min));
        }
        if self.has_equity == Some(true) {
            conditions.push(Sql::new("equity > 0"));
        }

        let mut q = sql(format!("SELECT {JOB_COLUMNS} FROM jobs"));
        q.push_where_and(conditions);
        q.push(" ORDER BY title, id");
        q
    }
}

impl Job {
    /// Insert a job and return it with its generated id.
    pub async fn create(conn: &impl GenericClient, data: NewJob) -> JoblyResult<Job> {
        data.validate().into_result()?;

        let sql = format!(
            "INSERT INTO jobs (title, salary, equity, company_handle) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {JOB_COLUMNS}"
        );
        let row = conn
            .query_one_tagged(
                "job.create",
                &sql,
                &[&data.title, &data.salary, &data.equity, &data.company_handle],
            )
            .await?;
        let job = Job::from_row(&row)?;
        tracing::debug!(target: "jobly", job_id = job.id, company = %job.company_handle, "created job");
        Ok(job)
    }

    /// List jobs matching `filter`, ordered by title.
    pub async fn find_all(conn: &impl GenericClient, filter: &JobFilter) -> JoblyResult<Vec<Job>> {
        filter.validate().into_result()?;
        filter.select_sql().fetch_all_tagged_as(conn, "job.find_all").await
    }

    /// Look up one job.
    pub async fn get(conn: &impl GenericClient, id: i32) -> JoblyResult<Job> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row = conn
            .query_opt_tagged("job.get", &sql, &[&id])
            .await?
            .ok_or_else(|| JoblyError::not_found(format!("No job: {id}")))?;
        Job::from_row(&row)
    }

    /// Apply a partial update and return the updated job.
    ///
    /// `payload` may hold `title`, `salary`, `equity` and `companyHandle`.
    /// An empty payload or an unknown field is a bad request; a missing job is
    /// not found.
    pub async fn update(
        conn: &impl GenericClient,
        id: i32,
        payload: UpdatePayload,
    ) -> JoblyResult<Job> {
        ensure_known_fields(&payload, UPDATABLE_FIELDS, "job")?;
        tracing::debug!(
            target: "jobly",
            job_id = id,
            fields = ?payload.keys().collect::<Vec<_>>(),
            "updating job"
        );

        let update = sql_for_partial_update(payload, field_names())?;
        let sql = format!(
            "UPDATE jobs SET {} WHERE id = ${} RETURNING {JOB_COLUMNS}",
            update.set_cols,
            update.next_placeholder()
        );
        let params = update.params_with(&[&id]);

        let row = conn
            .query_opt_tagged("job.update", &sql, &params)
            .await?
            .ok_or_else(|| JoblyError::not_found(format!("No job: {id}")))?;
        Job::from_row(&row)
    }

    /// Validate a typed patch and apply it with [`Job::update`].
    pub async fn patch(conn: &impl GenericClient, id: i32, data: JobUpdate) -> JoblyResult<Job> {
        data.validate().into_result()?;
        Job::update(conn, id, data.into_payload()).await
    }

    /// Delete a job.
    pub async fn remove(conn: &impl GenericClient, id: i32) -> JoblyResult<()> {
        let deleted = conn
            .execute_tagged("job.remove", "DELETE FROM jobs WHERE id = $1", &[&id])
            .await?;
        if deleted == 0 {
            return Err(JoblyError::not_found(format!("No job: {id}")));
        }
        tracing::debug!(target: "jobly", job_id = id, "removed job");
        Ok(())
    }
}
