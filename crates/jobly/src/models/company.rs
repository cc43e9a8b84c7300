//! Companies and the jobs they own.

use super::job::{JOB_COLUMNS, Job};
use super::{double_option, ensure_known_fields, from_body, parse_query_value};
use crate::changeset::ValidationErrors;
use crate::client::GenericClient;
use crate::error::{JoblyError, JoblyResult};
use crate::partial_update::{FieldNameMap, UpdatePayload, sql_for_partial_update};
use crate::row::{FromRow, RowExt};
use crate::sql::{Sql, sql};
use crate::validate::contains_pattern;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio_postgres::Row;

const COMPANY_COLUMNS: &str = "handle, name, description, num_employees, logo_url";

const UPDATABLE_FIELDS: &[&str] = &["name", "description", "numEmployees", "logoUrl"];

const HANDLE_MAX_LEN: usize = 25;

const NAME_UNIQUE_CONSTRAINT: &str = "companies_name_key";

fn field_names() -> &'static FieldNameMap {
    static NAMES: OnceLock<FieldNameMap> = OnceLock::new();
    NAMES.get_or_init(|| {
        FieldNameMap::from([("numEmployees", "num_employees"), ("logoUrl", "logo_url")])
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

impl FromRow for Company {
    fn from_row(row: &Row) -> JoblyResult<Self> {
        Ok(Self {
            handle: row.try_get_column("handle")?,
            name: row.try_get_column("name")?,
            description: row.try_get_column("description")?,
            num_employees: row.try_get_column("num_employees")?,
            logo_url: row.try_get_column("logo_url")?,
        })
    }
}

/// A company together with its jobs, as returned by [`Company::get`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    pub handle: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub num_employees: Option<i32>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl NewCompany {
    pub fn from_json(body: serde_json::Value) -> JoblyResult<Self> {
        from_body(body)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::default();
        errs.check_len("handle", &self.handle, 1, Some(HANDLE_MAX_LEN));
        errs.check_len("name", &self.name, 1, None);
        if let Some(n) = self.num_employees {
            errs.check_min("numEmployees", n, 0);
        }
        if let Some(url) = &self.logo_url {
            errs.check_url("logoUrl", url);
        }
        errs
    }
}

/// Patch input for [`Company::patch`]. The handle is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub num_employees: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub logo_url: Option<Option<String>>,
}

impl CompanyUpdate {
    pub fn from_json(body: serde_json::Value) -> JoblyResult<Self> {
        from_body(body)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::default();
        if let Some(name) = &self.name {
            errs.check_len("name", name, 1, None);
        }
        if let Some(Some(n)) = self.num_employees {
            errs.check_min("numEmployees", n, 0);
        }
        if let Some(Some(url)) = &self.logo_url {
            errs.check_url("logoUrl", url);
        }
        errs
    }

    pub fn into_payload(self) -> UpdatePayload {
        let mut payload = UpdatePayload::new();
        if let Some(name) = self.name {
            payload.set("name", name);
        }
        if let Some(description) = self.description {
            payload.set("description", description);
        }
        if let Some(n) = self.num_employees {
            payload.set("numEmployees", n);
        }
        if let Some(url) = self.logo_url {
            payload.set("logoUrl", url);
        }
        payload
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyFilter {
    /// Case-insensitive substring of the name.
    pub name_like: Option<String>,
    pub min_employees: Option<i32>,
    pub max_employees: Option<i32>,
}

impl CompanyFilter {
    /// Parse `nameLike`, `minEmployees` and `maxEmployees` from query-string pairs.
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
                "nameLike" => filter.name_like = Some(value.to_string()),
                "minEmployees" => filter.min_employees = Some(parse_query_value(key, value)?),
                "maxEmployees" => filter.max_employees = Some(parse_query_value(key, value)?),
                other => {
                    return Err(JoblyError::bad_request(format!("Unknown filter: {other}")));
                }
            }
        }
        filter.check()?;
        Ok(filter)
    }

    fn check(&self) -> JoblyResult<()> {
        if let (Some(min), Some(max)) = (self.min_employees, self.max_employees)
            && min > max
        {
            return Err(JoblyError::bad_request(
                "minEmployees cannot be greater than maxEmployees",
            ));
        }
        Ok(())
    }

    fn select_sql(&self) -> Sql {
        let mut conditions = Vec::new();
        if let Some(name) = self.name_like.as_deref().filter(|n| !n.is_empty()) {
            conditions.push(Sql::bound("name ILIKE ", contains_pattern(name)));
        }
        if let Some(min) = self.min_employees {
            conditions.push(Sql::bound("num_employees >= ", min));
        }
        if let Some(max) = self.max_employees {
            conditions.push(Sql::bound("num_employees <= ", max));
        }

        let mut q = sql(format!("SELECT {COMPANY_COLUMNS} FROM companies"));
        q.push_where_and(conditions);
        q.push(" ORDER BY name");
        q
    }
}

impl Company {
    /// Insert a company. A taken handle or name is a bad request.
    pub async fn create(conn: &impl GenericClient, data: NewCompany) -> JoblyResult<Company> {
        data.validate().into_result()?;

        let sql = format!(
            "INSERT INTO companies (handle, name, description, num_employees, logo_url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COMPANY_COLUMNS}"
        );
        let row = conn
            .query_one_tagged(
                "company.create",
                &sql,
                &[
                    &data.handle,
                    &data.name,
                    &data.description,
                    &data.num_employees,
                    &data.logo_url,
                ],
            )
            .await
            .map_err(|e| match e.violated_constraint() {
                Some(NAME_UNIQUE_CONSTRAINT) if e.is_unique_violation() => {
                    JoblyError::bad_request(format!("Duplicate company name: {}", data.name))
                }
                Some(_) if e.is_unique_violation() => {
                    JoblyError::bad_request(format!("Duplicate company: {}", data.handle))
                }
                _ => e,
            })?;
        let company = Company::from_row(&row)?;
        tracing::debug!(target: "jobly", handle = %company.handle, "created company");
        Ok(company)
    }

    /// List companies matching `filter`, ordered by name.
    pub async fn find_all(
        conn: &impl GenericClient,
        filter: &CompanyFilter,
    ) -> JoblyResult<Vec<Company>> {
        filter.check()?;
        filter
            .select_sql()
            .fetch_all_tagged_as(conn, "company.find_all")
            .await
    }

    /// Look up a company and its jobs.
    pub async fn get(conn: &impl GenericClient, handle: &str) -> JoblyResult<CompanyDetail> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE handle = $1");
        let row = conn
            .query_opt_tagged("company.get", &sql, &[&handle])
            .await?
            .ok_or_else(|| JoblyError::not_found(format!("No company: {handle}")))?;
        let company = Company::from_row(&row)?;

        let jobs_sql =
            format!("SELECT {JOB_COLUMNS} FROM jobs WHERE company_handle = $1 ORDER BY id");
        let jobs = conn
            .query_tagged("company.get.jobs", &jobs_sql, &[&handle])
            .await?
            .iter()
            .map(Job::from_row)
            .collect::<JoblyResult<Vec<_>>>()?;

        Ok(CompanyDetail { company, jobs })
    }

    /// Apply a partial update and return the updated company.
    ///
    /// `payload` may hold `name`, `description`, `numEmployees` and `logoUrl`.
    pub async fn update(
        conn: &impl GenericClient,
        handle: &str,
        payload: UpdatePayload,
    ) -> JoblyResult<Company> {
        ensure_known_fields(&payload, UPDATABLE_FIELDS, "company")?;
        tracing::debug!(
            target: "jobly",
            handle,
            fields = ?payload.keys().collect::<Vec<_>>(),
            "updating company"
        );

        let update = sql_for_partial_update(payload, field_names())?;
        let sql = format!(
            "UPDATE companies SET {} WHERE handle = ${} RETURNING {COMPANY_COLUMNS}",
            update.set_cols,
            update.next_placeholder()
        );
        let params = update.params_with(&[&handle]);

        let row = conn
            .query_opt_tagged("company.update", &sql, &params)
            .await?
            .ok_or_else(|| JoblyError::not_found(format!("No company: {handle}")))?;
        Company::from_row(&row)
    }

    /// Validate a typed patch and apply it with [`Company::update`].
    pub async fn patch(
        conn: &impl GenericClient,
        handle: &str,
        data: CompanyUpdate,
    ) -> JoblyResult<Company> {
        data.validate().into_result()?;
        Company::update(conn, handle, data.into_payload()).await
    }

    /// Delete a company; its jobs go with it.
    pub async fn remove(conn: &impl GenericClient, handle: &str) -> JoblyResult<()> {
        let deleted = conn
            .execute_tagged(
                "company.remove",
                "DELETE FROM companies WHERE handle = $1",
                &[&handle],
            )
            .await?;
        if deleted == 0 {
            return Err(JoblyError::not_found(format!("No company: {handle}")));
        }
        tracing::debug!(target: "jobly", handle, "removed company");
        Ok(())
    }
}
