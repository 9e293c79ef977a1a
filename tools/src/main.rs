//! renewal-server: staff HTTP surface and periodic reminder sweep.
//!
//! Usage:
//!   renewal-server --db renewals.db --bind 127.0.0.1:8080 --data-dir ./data
//!   renewal-server --seed-demo
//!
//! Environment overrides: RENEWALS_DB, RENEWALS_BIND, RENEWALS_STAFF_TOKEN.

use anyhow::Result;
use chrono::{Duration, Months, Utc};
use renewal_core::{
    config::RenewalConfig,
    engine::RenewalEngine,
    http::{router, AppState},
    policy::PolicyStatus,
    store::{NewPolicy, RenewalStore},
    sweep::SweepScheduler,
};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed_demo = args.iter().any(|a| a == "--seed-demo");
    let db = arg_or_env(&args, "--db", "RENEWALS_DB").unwrap_or_else(|| ":memory:".to_string());
    let bind = arg_or_env(&args, "--bind", "RENEWALS_BIND")
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let data_dir = arg_value(&args, "--data-dir").unwrap_or_else(|| "./data".to_string());

    let mut config = RenewalConfig::load(&data_dir)?;
    if let Ok(token) = env::var("RENEWALS_STAFF_TOKEN") {
        config.staff_token = Some(token).filter(|t| !t.trim().is_empty());
    }

    log::info!("renewal-server");
    log::info!("  db:         {db}");
    log::info!("  bind:       {bind}");
    log::info!("  data_dir:   {data_dir}");
    log::info!("  thresholds: {:?}", config.thresholds.thresholds());
    log::info!("  interval:   {:?}", config.sweep_interval());
    if db == ":memory:" {
        log::warn!("using an in-memory database; the reminder ledger will not survive restarts");
    }
    if config.staff_token.is_none() {
        log::warn!("no staff token configured; staff routes rely on the fronting gateway for auth");
    }

    let store = Arc::new(RenewalStore::open(&db)?);
    store.migrate()?;
    if seed_demo {
        seed_demo_policies(&store)?;
    }

    let engine = Arc::new(RenewalEngine::build(store, config.thresholds.clone()));
    let scheduler = SweepScheduler::new(engine.clone(), config.sweep_interval());
    let sweep = config.sweep_enabled.then(|| scheduler.start());

    let addr: SocketAddr = bind.parse()?;
    let app = router(AppState::new(engine, &config));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweep {
        handle.stop().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("cannot listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("shutdown requested");
}

/// A few policies spread across the reminder tiers, relative to today.
fn seed_demo_policies(store: &RenewalStore) -> Result<()> {
    let today = Utc::now().date_naive();
    let auto = store.insert_insurance_type("auto")?;
    let home = store.insert_insurance_type("home")?;

    let demo: [(&str, &str, i64, Option<i64>, PolicyStatus); 5] = [
        ("Grace Hopper", "grace@example.com", auto, Some(20), PolicyStatus::Active),
        ("Alan Turing", "alan@example.com", home, Some(6), PolicyStatus::Active),
        ("Ada Lovelace", "ada@example.com", auto, Some(1), PolicyStatus::Active),
        ("Edsger Dijkstra", "edsger@example.com", home, Some(45), PolicyStatus::Active),
        ("Barbara Liskov", "barbara@example.com", auto, Some(3), PolicyStatus::Lapsed),
    ];

    for (i, (name, email, type_id, end_in_days, status)) in demo.into_iter().enumerate() {
        let user_id = store.insert_user(name, email, None)?;
        let end_date = end_in_days.map(|d| today + Duration::days(d));
        let start_date = end_date
            .and_then(|e| e.checked_sub_months(Months::new(12)))
            .unwrap_or(today);
        store.insert_policy(&NewPolicy {
            policy_number: format!("DEMO-{:04}", i + 1),
            user_id,
            insurance_type_id: type_id,
            start_date,
            end_date,
            status,
            is_current: true,
        })?;
    }
    log::info!("seeded {} demo policies", demo.len());
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
}

fn arg_or_env(args: &[String], flag: &str, var: &str) -> Option<String> {
    arg_value(args, flag).or_else(|| env::var(var).ok())
}
