#[macro_use]
extern crate rocket;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use chrono::NaiveDate;
use merge_rewards_server::{
    db,
    entrypoints::{self, AdminToken},
    github_pull::GithubClient,
    scan::{self, ScanConfig},
    ProgramConfig,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, serde::Deserialize)]
pub struct Env {
    github_token: String,
    admin_token: String,
    program_start_date: NaiveDate,
    scan_interval_in_minutes: Option<u32>,
    scan_batch_size: Option<usize>,
    scan_batch_delay_in_seconds: Option<u64>,
}

#[launch]
async fn rocket() -> _ {
    dotenv::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().pretty());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let env = envy::from_env::<Env>().expect("Failed to load environment variables");
    let start_date = env
        .program_start_date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();

    let mut scan_config = ScanConfig::new(start_date);
    if let Some(size) = env.scan_batch_size {
        scan_config.batch_size = size;
    }
    if let Some(delay) = env.scan_batch_delay_in_seconds {
        scan_config.inter_batch_delay = Duration::from_secs(delay);
    }
    let sleep_duration = Duration::from_secs(env.scan_interval_in_minutes.unwrap_or(60) as u64 * 60);

    let github =
        GithubClient::new(env.github_token.clone()).expect("Failed to create GitHub client");

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    let span = tracing::info_span!("Starting Rocket");
    let _enter = span.enter();

    rocket::build()
        .manage(AdminToken(env.admin_token.clone()))
        .manage(ProgramConfig { start_date })
        .attach(db::stage())
        .attach(scan::stage(github, scan_config, sleep_duration, running))
        .attach(rocket::fairing::AdHoc::on_shutdown(
            "Stop the periodic scan",
            move |_| {
                Box::pin(async move {
                    running_clone.store(false, Ordering::Relaxed);
                })
            },
        ))
        .attach(entrypoints::stage())
}
