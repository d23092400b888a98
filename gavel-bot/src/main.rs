use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use diesel::sqlite::SqliteConnection;
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;

mod actions;
mod browser;
mod config;
mod ledgers;
mod loader;
mod models;
mod routes;
mod rules;
mod schema;
mod services;
#[cfg(test)]
mod testutil;

use browser::{Browser, SubredditHandle};
use config::AppConfig;
use gavel_shared::clients::db::create_pool;
use gavel_shared::clients::reddit::RedditClient;
use gavel_shared::clients::site::Site;
use gavel_shared::AppResult;

#[derive(Debug, Parser)]
#[command(name = "gavel-bot", about = "Reddit moderation automated through reports", version)]
struct Cli {
    /// Directory of per-subreddit rule files (<subreddit>.yaml)
    rules_dir: PathBuf,
    /// SQLite database holding the audit log
    database: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load()?;

    let alerts = cfg
        .discord_webhook
        .as_deref()
        .map(gavel_shared::middleware::discord_alert_layer);
    gavel_shared::middleware::init_tracing("gavel_bot", alerts);

    let database = cli
        .database
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("database path is not valid UTF-8"))?;
    let pool = create_pool(database);

    let site: Arc<dyn Site> = Arc::new(RedditClient::new(
        &cfg.reddit_api_url,
        &cfg.reddit_token,
        &cfg.user_agent,
    )?);

    // Configuration problems are fatal here, before the first poll.
    let browsers = load_browsers(&cli.rules_dir, &cfg, site.clone(), &pool).await?;
    tracing::info!(subreddits = browsers.len(), "loaded");

    serve_health(cfg.health_port).await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.poll_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle: u32 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received; shutting down");
                break;
            }
            _ = ticker.tick() => {
                let mut conn = match pool.get() {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!(error = %e, "could not check out a database connection");
                        continue;
                    }
                };

                for browser in &browsers {
                    browser.run(&mut conn).await;
                }

                cycle += 1;
                if cycle >= cfg.refresh_cycles {
                    cycle = 0;
                    for browser in &browsers {
                        if let Err(e) =
                            refresh_metadata(site.as_ref(), &mut conn, &browser.subreddit).await
                        {
                            tracing::error!(
                                error = %e,
                                subreddit = %browser.subreddit.name,
                                "metadata refresh failed"
                            );
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

async fn load_browsers(
    rules_dir: &PathBuf,
    cfg: &AppConfig,
    site: Arc<dyn Site>,
    pool: &gavel_shared::clients::db::DbPool,
) -> anyhow::Result<Vec<Browser>> {
    let mut conn = pool.get()?;
    let mut browsers = Vec::new();

    let mut entries: Vec<PathBuf> = std::fs::read_dir(rules_dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for path in entries {
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let Some(sub_name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let info = site.subreddit_info(sub_name).await?;
        let moderators = site.moderators(sub_name).await?;
        services::audit::refresh_subreddit(&mut conn, &info, &moderators)?;

        let handle = Arc::new(SubredditHandle {
            name: info.display_name.clone(),
            id: info.id.id,
        });
        let browser = loader::load_rules_file(
            &path,
            &loader::LoadContext {
                site: site.clone(),
                subreddit: handle,
                public_url: &cfg.reddit_public_url,
                dedup_per_moderator: cfg.dedup_per_moderator,
            },
        )?;
        browsers.push(browser);
    }

    Ok(browsers)
}

async fn refresh_metadata(
    site: &dyn Site,
    conn: &mut SqliteConnection,
    subreddit: &SubredditHandle,
) -> AppResult<()> {
    let info = site.subreddit_info(&subreddit.name).await?;
    let moderators = site.moderators(&subreddit.name).await?;
    services::audit::refresh_subreddit(conn, &info, &moderators)
}

async fn serve_health(port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(addr = %format!("0.0.0.0:{port}"), "health endpoint listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "health endpoint failed");
        }
    });
    Ok(())
}
