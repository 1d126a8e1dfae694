//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! CLI 子命令的执行逻辑。

use super::{Cli, Commands};
use crate::config::Config;
use crate::manager::ViewSyncManager;
use crate::response::{PageResult, Response};
use crate::sync::TaskContext;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            info!("no config file given, using defaults");
            Ok(Config::default())
        }
    }
}

fn print<T: Serialize>(response: &Response<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

pub async fn execute(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let manager = ViewSyncManager::init(config)
        .await
        .context("failed to initialize view sync engine")?;
    let service = manager.service();

    match &cli.command {
        Commands::Run => {
            manager.start();
            info!("scheduler running, press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
        }
        Commands::Reconcile => {
            let timeout = manager.config().reconcile.timeout();
            let ctx = TaskContext::detached((!timeout.is_zero()).then_some(timeout));
            print(&Response::from_result(service.reconcile_views(&ctx).await))?;
        }
        Commands::List(args) => {
            let result = service
                .list_articles(args.page, args.size)
                .await
                .map(|page| PageResult::from_page(args.page, args.size, page));
            print(&Response::from_result(result))?;
        }
        Commands::Popular(args) => {
            let limit = args.limit.unwrap_or(manager.config().cache.popular_limit);
            print(&Response::from_result(service.popular_articles(limit).await))?;
        }
        Commands::Get(args) => {
            let viewer = args
                .viewer
                .clone()
                .unwrap_or_else(|| format!("cli:{}", Uuid::new_v4()));
            print(&Response::from_result(
                service.get_article(args.id, &viewer).await,
            ))?;
        }
        Commands::Pending => {
            print(&Response::from_result(service.pending_views().await))?;
        }
    }

    manager.shutdown().await;
    Ok(())
}
