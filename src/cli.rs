use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::{
    asc::AppStoreConnectClient,
    config::{ClientOptions, Config},
    envelope::Resource,
    query::{ListOptions, split_csv},
    resources::{AppsQuery, BuildAttributes, BuildsQuery},
    util::{app_label, build_label, build_status, compare_builds_desc},
};

#[derive(Parser, Debug)]
#[command(name = "asc", version, about = "App Store Connect API client", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print raw JSON instead of tab-separated rows
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a short-lived App Store Connect bearer token
    Token,
    /// List apps
    Apps {
        /// Page size
        #[arg(short, long, default_value_t = 0)]
        limit: i64,
        /// Comma-separated bundle IDs to filter by
        #[arg(long)]
        bundle_id: Option<String>,
        /// Comma-separated sort fields, e.g. -name
        #[arg(long)]
        sort: Option<String>,
        /// Fetch the page at this cursor URL instead
        #[arg(long)]
        next: Option<String>,
    },
    /// List builds for an app
    Builds {
        /// App ID
        #[arg(short, long)]
        app: String,
        /// Comma-separated platforms (ios, mac_os, tv_os, vision_os)
        #[arg(long)]
        platform: Option<String>,
        /// Comma-separated processing states
        #[arg(long)]
        state: Option<String>,
        /// Page size
        #[arg(short, long, default_value_t = 0)]
        limit: i64,
        /// Fetch the page at this cursor URL instead
        #[arg(long)]
        next: Option<String>,
        /// Follow pagination until every build is fetched
        #[arg(long)]
        all: bool,
    },
    /// Show details for a build
    BuildInfo {
        /// Build ID
        #[arg(short, long)]
        build: String,
    },
    /// Wait for a build to finish processing
    BuildWait {
        /// Build ID
        #[arg(short, long)]
        build: String,
        /// Seconds between polls
        #[arg(long, default_value_t = 30)]
        interval: u64,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 1800)]
        timeout: u64,
    },
    /// GET an arbitrary API path and print the JSON
    Get {
        /// Path such as v1/apps/123, or a full API URL
        path: String,
    },
}

pub fn init_tracing(verbose: bool) {
    let default = if verbose { "asc_kit=debug" } else { "asc_kit=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = Config::from_env()?;
    let options = ClientOptions::from_env()?;
    let client = AppStoreConnectClient::new(cfg, options)?;

    match cli.command {
        Commands::Token => print_token_cmd(&client).await?,
        Commands::Apps {
            limit,
            bundle_id,
            sort,
            next,
        } => {
            let mut query = AppsQuery::new().limit(limit);
            if let Some(ids) = bundle_id {
                query = query.bundle_ids(split_csv(&ids));
            }
            if let Some(sort) = sort {
                query = query.sort(split_csv(&sort));
            }
            if let Some(next) = next {
                query = query.next_url(next);
            }
            list_apps_cmd(&client, query, cli.json).await?
        }
        Commands::Builds {
            app,
            platform,
            state,
            limit,
            next,
            all,
        } => {
            let mut query = BuildsQuery::new().app(&app).limit(limit);
            if let Some(platforms) = platform {
                query = query.platforms(split_csv(&platforms));
            }
            if let Some(states) = state {
                query = query.processing_states(split_csv(&states));
            }
            if let Some(next) = next {
                query = query.next_url(next);
            }
            list_builds_cmd(&client, query, all, cli.json).await?
        }
        Commands::BuildInfo { build } => build_info_cmd(&client, &build).await?,
        Commands::BuildWait {
            build,
            interval,
            timeout,
        } => {
            build_wait_cmd(
                &client,
                &build,
                Duration::from_secs(interval.max(1)),
                Duration::from_secs(timeout),
            )
            .await?
        }
        Commands::Get { path } => raw_get_cmd(&client, &path).await?,
    }

    Ok(())
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_token_cmd(client: &AppStoreConnectClient) -> Result<()> {
    let token = client.bearer().await?;
    println!("{}", token);
    Ok(())
}

async fn list_apps_cmd(client: &AppStoreConnectClient, query: AppsQuery, json: bool) -> Result<()> {
    let pb = spinner("Loading apps...");
    let page = client.list_apps(query).await;
    pb.finish_and_clear();
    let page = page?;

    if json {
        return print_json(&page);
    }
    if page.data.is_empty() {
        println!("No apps found");
        return Ok(());
    }
    for app in &page.data {
        let bundle_id = app
            .attributes
            .as_ref()
            .and_then(|a| a.bundle_id.as_deref())
            .unwrap_or("");
        println!("{}\t{}\t{}", app.id, app_label(app), bundle_id);
    }
    if let Some(next) = page.next_url() {
        println!("next: {}", next);
    }
    Ok(())
}

async fn list_builds_cmd(
    client: &AppStoreConnectClient,
    query: BuildsQuery,
    all: bool,
    json: bool,
) -> Result<()> {
    let pb = spinner("Loading builds...");
    let res = fetch_builds(client, query, all).await;
    pb.finish_and_clear();
    let (mut builds, next) = res?;

    if json {
        return print_json(&builds);
    }
    if builds.is_empty() {
        println!("No builds found");
        return Ok(());
    }
    builds.sort_by(compare_builds_desc);
    for b in builds.iter() {
        let uploaded = b
            .attributes
            .as_ref()
            .and_then(|a| a.uploaded_date.as_deref())
            .unwrap_or("");
        println!("{}\t{}\t{}\t{}", b.id, build_label(b), build_status(b), uploaded);
    }
    if let Some(next) = next {
        println!("next: {}", next);
    }
    Ok(())
}

async fn fetch_builds(
    client: &AppStoreConnectClient,
    query: BuildsQuery,
    all: bool,
) -> crate::Result<(Vec<Resource<BuildAttributes>>, Option<String>)> {
    if all {
        let target = query.into_list_query().target("v1/builds");
        return Ok((client.list_all(&target).await?, None));
    }
    let page = client.list_builds(query).await?;
    let next = page.next_url().map(str::to_string);
    Ok((page.data, next))
}

async fn build_info_cmd(client: &AppStoreConnectClient, build_id: &str) -> Result<()> {
    let pb = spinner("Loading build...");
    let build = client.get_build(build_id).await;
    pb.finish_and_clear();
    print_json(&build?)
}

async fn build_wait_cmd(
    client: &AppStoreConnectClient,
    build_id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let pb = spinner(&format!("Waiting for build {} to finish processing...", build_id));
    let res = client
        .with_timeout(timeout)
        .wait_for_build_processing(build_id, interval)
        .await;
    pb.finish_and_clear();
    let build = res.with_context(|| format!("build {} did not finish processing", build_id))?;
    println!("{}\t{}", build.data.id, build_status(&build.data));
    Ok(())
}

async fn raw_get_cmd(client: &AppStoreConnectClient, path: &str) -> Result<()> {
    let v = client.get_raw(path).await?;
    print_json(&v)
}
