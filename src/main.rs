use anyhow::Context;
use campusnet::cache::JsonFileCache;
use campusnet::cli::Args;
use campusnet::config::Config;
use campusnet::json::{read_json_file, write_json_file};
use campusnet::logging::setup_logging;
use campusnet::portal::{
    CampusNetClient, IdpSessionCredentials, LoginCredentials, PortalSessionCredentials,
};
use campusnet::utils::fmt_duration;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        data_dir = %config.data_dir.display(),
        "starting campusnet"
    );

    let start = Instant::now();
    match run(&config, &args).await {
        Ok(()) => {
            info!(duration = fmt_duration(start.elapsed()), "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = format!("{e:#}"), "campusnet failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, args: &Args) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    let idp: Option<IdpSessionCredentials> = read_json_file(&config.dsf_credentials_path()).await?;
    let portal: Option<PortalSessionCredentials> =
        read_json_file(&config.cnet_credentials_path()).await?;
    let cache = JsonFileCache::load(config.cache_path()).await?;

    let login = LoginCredentials::new(&config.cnet_username, &config.cnet_password);
    let mut client = CampusNetClient::create(login, cache, idp, portal)
        .await
        .context("Failed to establish portal session")?
        .with_time_zone(config.time_zone);

    let user = client.user_info().await.context("Failed to fetch profile")?;
    println!("{user:#?}");

    client
        .fetch_courses()
        .await
        .context("Failed to fetch courses")?;

    let events = client
        .calendar(args.week, !args.no_repeat, args.pivot)
        .await
        .context("Failed to fetch schedule")?;
    let ics = campusnet::calendar::to_ics(&events, chrono::Utc::now());
    let calendar_path = config.calendar_path();
    tokio::fs::write(&calendar_path, ics)
        .await
        .with_context(|| format!("Failed to write {}", calendar_path.display()))?;
    info!(events = events.len(), path = %calendar_path.display(), "calendar written");

    write_json_file(&config.dsf_credentials_path(), &client.idp_credentials().await?).await?;
    write_json_file(&config.cnet_credentials_path(), &client.portal_credentials().await?).await?;

    Ok(())
}
