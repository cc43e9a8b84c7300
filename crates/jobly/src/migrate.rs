//! Schema migrations via [`refinery`].
//!
//! The `companies` and `jobs` tables ship as SQL files under `migrations/` and
//! are embedded into the crate at build time.
//!
//! # Example
//!
//! ```ignore
//! let pool = jobly::create_pool(&std::env::var("DATABASE_URL")?)?;
//! let report = jobly::migrate::run_pool(&pool).await?;
//! ```

use crate::error::JoblyResult;

pub use refinery::{Migration, Report, Runner};

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Runner over the embedded migrations.
pub fn runner() -> Runner {
    embedded::migrations::runner()
}

/// Run pending migrations on a single PostgreSQL connection.
pub async fn run(client: &mut tokio_postgres::Client) -> JoblyResult<Report> {
    let report = runner().run_async(client).await?;
    for applied in report.applied_migrations() {
        tracing::info!(
            target: "jobly.migrate",
            version = applied.version(),
            name = applied.name(),
            "applied migration"
        );
    }
    Ok(report)
}

/// Acquire a connection from a pool and run migrations on it.
#[cfg(feature = "pool")]
pub async fn run_pool(pool: &deadpool_postgres::Pool) -> JoblyResult<Report> {
    let mut client = pool.get().await?;
    run(&mut client).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_schema_migration() {
        let migrations = runner().get_migrations().to_vec();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].version(), 1);
        assert_eq!(migrations[0].name(), "create_companies_and_jobs");
    }
}
