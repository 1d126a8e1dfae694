//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "viewsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Path to the TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log filter used when RUST_LOG is not set"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "run", about = "Run the reconciliation scheduler until Ctrl-C")]
    Run,

    #[command(name = "reconcile", about = "Run one reconciliation pass now")]
    Reconcile,

    #[command(name = "list", about = "List public articles by page")]
    List(ListArgs),

    #[command(name = "popular", about = "List the most viewed articles")]
    Popular(PopularArgs),

    #[command(name = "get", about = "Read one article and record a view")]
    Get(GetArgs),

    #[command(name = "pending", about = "Show articles with unreconciled views")]
    Pending,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[arg(short, long, default_value_t = 1, help = "Page number, starting at 1")]
    pub page: u64,

    #[arg(short, long, default_value_t = 10, help = "Page size")]
    pub size: u64,
}

#[derive(Parser, Debug)]
pub struct PopularArgs {
    #[arg(short, long, help = "Number of articles (defaults to cache.popular_limit)")]
    pub limit: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    #[arg(short, long, help = "Article id")]
    pub id: i64,

    #[arg(short, long, help = "Viewer identity, e.g. client IP (random when omitted)")]
    pub viewer: Option<String>,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("viewsync", &cli.log_level);

    let result = commands::execute(&cli).await;
    crate::telemetry::shutdown_tracing();
    result
}
