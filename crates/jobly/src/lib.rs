//! # jobly
//!
//! Postgres data access for a jobs/companies API.
//!
//! ## Features
//!
//! - **Partial updates**: [`sql_for_partial_update`] turns a sparse, ordered
//!   payload into a parameterized `SET` list plus its values
//! - **Models**: [`Job`] and [`Company`] with create / filtered listing / get /
//!   update / remove
//! - **Validation**: typed inputs collect every failing field into
//!   [`ValidationErrors`]
//! - **No string-built filters**: listing filters are bound parameters
//! - **SQL logging**: [`TracedClient`] emits a `tracing` event per statement
//!
//! ## Partial update
//!
//! ```ignore
//! use jobly::{FieldNameMap, UpdatePayload, sql_for_partial_update};
//!
//! let payload = UpdatePayload::new()
//!     .with("firstName", "Yvonne")
//!     .with("lastName", "Yukon");
//! let names = FieldNameMap::from([("firstName", "first_name"), ("lastName", "last_name")]);
//!
//! let update = sql_for_partial_update(payload, &names)?;
//! assert_eq!(update.set_cols, r#""first_name"=$1, "last_name"=$2"#);
//! ```
//!
//! ## Models
//!
//! ```ignore
//! let pool = jobly::DbConfig::from_env()?.create_pool()?;
//! let conn = pool.get().await?;
//!
//! let job = Job::patch(&conn, 1, JobUpdate::from_json(body)?).await?;
//! let jobs = Job::find_all(&conn, &JobFilter::from_query_pairs(query)?).await?;
//! ```

pub mod changeset;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod partial_update;
pub mod row;
pub mod sql;
pub mod trace;
pub mod validate;
pub mod value;

pub use changeset::{ValidationCode, ValidationError, ValidationErrors};
pub use client::GenericClient;
pub use config::DbConfig;
pub use error::{JoblyError, JoblyResult};
pub use models::{
    Company, CompanyDetail, CompanyFilter, CompanyUpdate, Job, JobFilter, JobUpdate, NewCompany,
    NewJob,
};
pub use partial_update::{FieldNameMap, PartialUpdate, UpdatePayload, sql_for_partial_update};
pub use row::{FromRow, RowExt};
pub use sql::{Sql, sql};
pub use trace::{SqlLogConfig, TracedClient};
pub use value::{BindError, SqlValue};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "migrate")]
pub mod migrate;
