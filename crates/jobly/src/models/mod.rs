//! Data-access models for the `companies` and `jobs` tables.
//!
//! Every operation takes `&impl GenericClient`, so it can run on a pooled
//! connection, a plain `tokio_postgres::Client`, a transaction, or a
//! [`crate::TracedClient`] around any of those.

pub mod company;
pub mod job;

pub use company::{Company, CompanyDetail, CompanyFilter, CompanyUpdate, NewCompany};
pub use job::{Job, JobFilter, JobUpdate, NewJob};

use crate::error::{JoblyError, JoblyResult};
use crate::partial_update::UpdatePayload;
use serde::{Deserialize, Deserializer};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Deserialize a request body, reporting shape errors as bad requests.
pub(crate) fn from_body<T>(body: serde_json::Value) -> JoblyResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(body).map_err(|e| JoblyError::bad_request(e.to_string()))
}

/// Reject payload fields the entity does not have.
///
/// Unmapped fields are used verbatim as column names, so only known fields
/// may reach the partial-update builder.
pub(crate) fn ensure_known_fields(
    payload: &UpdatePayload,
    allowed: &[&str],
    entity: &str,
) -> JoblyResult<()> {
    match payload.keys().find(|field| !allowed.contains(field)) {
        Some(field) => Err(JoblyError::bad_request(format!(
            "Unknown field for {entity}: {field}"
        ))),
        None => Ok(()),
    }
}

pub(crate) fn parse_query_value<T: std::str::FromStr>(key: &str, raw: &str) -> JoblyResult<T> {
    raw.parse()
        .map_err(|_| JoblyError::bad_request(format!("Invalid value for {key}: '{raw}'")))
}
