//! Database-backed tests for the Job and Company models.
//!
//! Each test runs inside a transaction that is rolled back on drop. Tests are
//! skipped when `DATABASE_URL` is not set.

use jobly::{
    Company, CompanyFilter, CompanyUpdate, GenericClient, Job, JobFilter, JobUpdate, JoblyError,
    JoblyResult, NewCompany, NewJob, TracedClient, UpdatePayload, migrate,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio::sync::OnceCell;
use tokio_postgres::NoTls;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

async fn connect(test: &str) -> JoblyResult<Option<tokio_postgres::Client>> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };

    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .map_err(JoblyError::from_db_error)?;
    tokio::spawn(async move {
        let _ = connection.await;
    });

    MIGRATED
        .get_or_try_init(|| async {
            let (mut client, connection) = tokio_postgres::connect(&database_url, NoTls)
                .await
                .map_err(JoblyError::from_db_error)?;
            tokio::spawn(async move {
                let _ = connection.await;
            });
            migrate::run(&mut client).await.map(|_| ())
        })
        .await?;

    Ok(Some(client))
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal")
}

/// Three companies and one job per company: J1 (no equity), J2, J3.
async fn seed(conn: &impl GenericClient) -> JoblyResult<Vec<Job>> {
    for n in 1..=3 {
        Company::create(
            conn,
            NewCompany {
                handle: format!("c{n}"),
                name: format!("C{n}"),
                description: format!("Desc{n}"),
                num_employees: Some(n),
                logo_url: Some(format!("http://c{n}.img")),
            },
        )
        .await?;
    }

    let mut jobs = Vec::new();
    for (n, equity) in [(1, "0"), (2, "0.002"), (3, "0.003")] {
        jobs.push(
            Job::create(
                conn,
                NewJob {
                    title: format!("J{n}"),
                    salary: Some(n * 100_000),
                    equity: Some(dec(equity)),
                    company_handle: format!("c{n}"),
                },
            )
            .await?,
        );
    }
    Ok(jobs)
}

fn titles(jobs: &[Job]) -> Vec<&str> {
    jobs.iter().map(|j| j.title.as_str()).collect()
}

#[tokio::test]
async fn job_create_and_get() -> JoblyResult<()> {
    let Some(mut client) = connect("job_create_and_get").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    seed(&tx).await?;

    let job = Job::create(
        &tx,
        NewJob {
            title: "New".into(),
            salary: Some(100_000),
            equity: Some(dec("0.001")),
            company_handle: "c1".into(),
        },
    )
    .await?;
    assert_eq!(job.title, "New");
    assert_eq!(job.equity, Some(dec("0.001")));

    let fetched = Job::get(&tx, job.id).await?;
    assert_eq!(fetched, job);

    let err = Job::get(&tx, 0).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn job_create_for_unknown_company_fails() -> JoblyResult<()> {
    let Some(mut client) = connect("job_create_for_unknown_company_fails").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;

    let err = Job::create(
        &tx,
        NewJob {
            title: "Orphan".into(),
            salary: None,
            equity: None,
            company_handle: "nope".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, JoblyError::ForeignKeyViolation(_)));
    assert_eq!(err.status_code(), 400);
    Ok(())
}

#[tokio::test]
async fn job_find_all_filters() -> JoblyResult<()> {
    let Some(mut client) = connect("job_find_all_filters").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    seed(&tx).await?;

    let all = Job::find_all(&tx, &JobFilter::default()).await?;
    assert_eq!(titles(&all), vec!["J1", "J2", "J3"]);

    let by_title = Job::find_all(&tx, &JobFilter::from_query_pairs([("title", "1")])?).await?;
    assert_eq!(titles(&by_title), vec!["J1"]);

    let by_salary =
        Job::find_all(&tx, &JobFilter::from_query_pairs([("minSalary", "200000")])?).await?;
    assert_eq!(titles(&by_salary), vec!["J2", "J3"]);

    let with_equity =
        Job::find_all(&tx, &JobFilter::from_query_pairs([("hasEquity", "true")])?).await?;
    assert_eq!(titles(&with_equity), vec!["J2", "J3"]);

    let combined = Job::find_all(
        &tx,
        &JobFilter::from_query_pairs([
            ("title", "j"),
            ("minSalary", "300000"),
            ("hasEquity", "true"),
        ])?,
    )
    .await?;
    assert_eq!(titles(&combined), vec!["J3"]);

    // Quotes and wildcards in a title filter are data, not SQL.
    let hostile =
        Job::find_all(&tx, &JobFilter::from_query_pairs([("title", "%' OR '1'='1")])?).await?;
    assert!(hostile.is_empty());
    Ok(())
}

#[tokio::test]
async fn job_update() -> JoblyResult<()> {
    let Some(mut client) = connect("job_update").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    let jobs = seed(&tx).await?;
    let id = jobs[0].id;

    let payload = UpdatePayload::new()
        .with("title", "New")
        .with("salary", 1_000_000)
        .with("equity", "0.001");
    let job = Job::update(&tx, id, payload).await?;
    assert_eq!(job.title, "New");
    assert_eq!(job.salary, Some(1_000_000));
    assert_eq!(job.equity, Some(dec("0.001")));
    assert_eq!(job.company_handle, "c1");
    assert_eq!(Job::get(&tx, id).await?, job);
    Ok(())
}

#[tokio::test]
async fn job_update_sets_nulls() -> JoblyResult<()> {
    let Some(mut client) = connect("job_update_sets_nulls").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    let jobs = seed(&tx).await?;
    let id = jobs[0].id;

    let patch = JobUpdate::from_json(serde_json::json!({
        "title": "New",
        "salary": null,
        "equity": null,
    }))?;
    let job = Job::patch(&tx, id, patch).await?;
    assert_eq!(job.title, "New");
    assert_eq!(job.salary, None);
    assert_eq!(job.equity, None);
    Ok(())
}

#[tokio::test]
async fn job_update_errors() -> JoblyResult<()> {
    let Some(mut client) = connect("job_update_errors").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    let jobs = seed(&tx).await?;

    let missing = Job::update(&tx, 0, UpdatePayload::new().with("title", "New"))
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    let empty = Job::update(&tx, jobs[0].id, UpdatePayload::new())
        .await
        .unwrap_err();
    assert!(empty.is_bad_request());

    let invalid = Job::patch(
        &tx,
        jobs[0].id,
        JobUpdate {
            salary: Some(Some(-100_000)),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(invalid.status_code(), 400);
    Ok(())
}

#[tokio::test]
async fn job_remove() -> JoblyResult<()> {
    let Some(mut client) = connect("job_remove").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    let jobs = seed(&tx).await?;

    Job::remove(&tx, jobs[0].id).await?;
    assert!(Job::get(&tx, jobs[0].id).await.unwrap_err().is_not_found());
    assert!(Job::remove(&tx, 0).await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn company_lifecycle() -> JoblyResult<()> {
    let Some(mut client) = connect("company_lifecycle").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    seed(&tx).await?;
    let traced = TracedClient::new(&tx);

    let detail = Company::get(&traced, "c1").await?;
    assert_eq!(detail.company.name, "C1");
    assert_eq!(titles(&detail.jobs), vec!["J1"]);

    let filtered = Company::find_all(
        &traced,
        &CompanyFilter::from_query_pairs([("minEmployees", "2"), ("maxEmployees", "3")])?,
    )
    .await?;
    assert_eq!(
        filtered.iter().map(|c| c.handle.as_str()).collect::<Vec<_>>(),
        vec!["c2", "c3"]
    );

    let updated = Company::patch(
        &traced,
        "c1",
        CompanyUpdate::from_json(serde_json::json!({ "name": "C1 New", "logoUrl": null }))?,
    )
    .await?;
    assert_eq!(updated.name, "C1 New");
    assert_eq!(updated.logo_url, None);
    assert_eq!(updated.num_employees, Some(1));

    Company::remove(&traced, "c1").await?;
    assert!(Company::get(&traced, "c1").await.unwrap_err().is_not_found());
    // Jobs go with their company.
    let remaining = Job::find_all(&traced, &JobFilter::default()).await?;
    assert_eq!(titles(&remaining), vec!["J2", "J3"]);
    Ok(())
}

#[tokio::test]
async fn company_duplicate_handle_is_bad_request() -> JoblyResult<()> {
    let Some(mut client) = connect("company_duplicate_handle_is_bad_request").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    seed(&tx).await?;

    let err = Company::create(
        &tx,
        NewCompany {
            handle: "c1".into(),
            name: "Another".into(),
            description: "Dup".into(),
            num_employees: None,
            logo_url: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(err.to_string(), "Bad request: Duplicate company: c1");
    Ok(())
}

#[tokio::test]
async fn company_duplicate_name_is_bad_request() -> JoblyResult<()> {
    let Some(mut client) = connect("company_duplicate_name_is_bad_request").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    seed(&tx).await?;

    let err = Company::create(
        &tx,
        NewCompany {
            handle: "fresh".into(),
            name: "C1".into(),
            description: "Same name as c1".into(),
            num_employees: None,
            logo_url: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(err.to_string(), "Bad request: Duplicate company name: C1");
    Ok(())
}

#[tokio::test]
async fn company_update_errors() -> JoblyResult<()> {
    let Some(mut client) = connect("company_update_errors").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    seed(&tx).await?;

    let missing = Company::update(&tx, "nope", UpdatePayload::new().with("name", "New"))
        .await
        .unwrap_err();
    assert!(missing.is_not_found());
    assert_eq!(missing.to_string(), "Not found: No company: nope");

    let missing_patch = Company::patch(
        &tx,
        "nope",
        CompanyUpdate {
            name: Some("New".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(missing_patch.is_not_found());

    let empty = Company::update(&tx, "c1", UpdatePayload::new())
        .await
        .unwrap_err();
    assert!(empty.is_bad_request());

    let unknown = Company::update(&tx, "c1", UpdatePayload::new().with("handle", "c1-new"))
        .await
        .unwrap_err();
    assert!(unknown.is_bad_request());

    // Nothing above touched c1.
    assert_eq!(Company::get(&tx, "c1").await?.company.name, "C1");
    Ok(())
}

#[tokio::test]
async fn company_remove_missing_is_not_found() -> JoblyResult<()> {
    let Some(mut client) = connect("company_remove_missing_is_not_found").await? else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    seed(&tx).await?;

    let err = Company::remove(&tx, "nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);
    Ok(())
}

#[tokio::test]
async fn job_update_with_unbindable_value_is_bad_request() -> JoblyResult<()> {
    let Some(mut client) = connect("job_update_with_unbindable_value_is_bad_request").await?
    else {
        return Ok(());
    };
    let tx = client.transaction().await.map_err(JoblyError::from_db_error)?;
    let jobs = seed(&tx).await?;

    let payload = UpdatePayload::from_json(serde_json::json!({ "salary": "lots" }))?;
    let err = Job::update(&tx, jobs[0].id, payload).await.unwrap_err();
    assert!(err.is_bad_request(), "unexpected error: {err}");
    assert_eq!(err.status_code(), 400);
    Ok(())
}
