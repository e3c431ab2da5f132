use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use approval_desk::cli::{self, Commands, RequestCommands};
use approval_desk::config::{self, Config};
use approval_desk::models::dashboard::{DashboardParams, DashboardQuery};
use approval_desk::store::sqlite::SqliteStore;
use approval_desk::workflow::{dashboard, lifecycle};
use approval_desk::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let cfg = config::load()?;
    init_tracing(&cfg);

    let result = match args.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(Commands::Migrate) => {
            let db = SqliteStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            println!("Database schema is up to date.");
            Ok(())
        }
        Some(Commands::Requests { command }) => {
            let db = SqliteStore::connect(&cfg.database_url).await?;
            handle_request_command(&db, &cfg, command).await
        }
        Some(Commands::Stats) => {
            let db = SqliteStore::connect(&cfg.database_url).await?;
            let s = db.status_counts().await?;
            println!("{:<12} {:>6}", "Total", s.total);
            println!("{:<12} {:>6}", "Pending L1", s.pending_l1);
            println!("{:<12} {:>6}", "Pending L2", s.pending_l2);
            println!("{:<12} {:>6}", "Approved", s.approved);
            println!("{:<12} {:>6}", "Rejected", s.rejected);
            Ok(())
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(cfg: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "approval_desk=debug,tower_http=info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if cfg.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Opening database...");
    let db = SqliteStore::connect(&cfg.database_url)
        .await
        .context("failed to open database")?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let state = Arc::new(AppState { db, config: cfg });
    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Approval desk listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_request_command(
    db: &SqliteStore,
    cfg: &Config,
    cmd: RequestCommands,
) -> anyhow::Result<()> {
    match cmd {
        RequestCommands::List {
            filter,
            sort,
            project,
            unit,
        } => {
            let query = DashboardQuery::from(DashboardParams {
                filter: Some(filter),
                sort: Some(sort),
                project,
                unit,
            });
            let view = dashboard::load(db, query).await?;
            if view.requests.is_empty() {
                println!("No requests found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<20} {:<8} {:<12} {:<20} CREATED",
                "ID", "PROJECT", "UNIT", "STATUS", "BUYER"
            );
            for r in view.requests {
                println!(
                    "{:<6} {:<20} {:<8} {:<12} {:<20} {}",
                    r.id,
                    r.project_name(),
                    r.unit_number(),
                    r.status,
                    r.draft.get("buyer_name"),
                    r.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        RequestCommands::Show { id } => {
            let detail = match lifecycle::read(db, id).await {
                Ok(d) => d,
                Err(approval_desk::errors::AppError::NotFound) => {
                    println!("Request {} not found.", id);
                    return Ok(());
                }
                Err(e) => return Err(anyhow::anyhow!(e)),
            };
            let r = &detail.request;
            println!("Request {}", r.id);
            println!("  Status:   {} (step {})", r.status, r.step);
            println!("  Project:  {}", r.project_name());
            println!("  Unit:     {}", r.unit_number());
            println!("  Buyer:    {}", r.draft.get("buyer_name"));
            println!("  Agent:    {} ({})", r.draft.get("agent_name"), r.draft.get("agency_name"));
            let types: Vec<String> = r
                .draft
                .selected
                .iter()
                .map(|t| format!("{:?}", t))
                .collect();
            println!("  Types:    {}", types.join(", "));
            println!("  Created:  {}", r.created_at.to_rfc3339());
            println!("  Updated:  {}", r.updated_at.to_rfc3339());
            println!("  Edit:     {}", lifecycle::edit_link(&cfg.public_base_url, &r.edit_token));

            if detail.approvals.is_empty() {
                println!("  No decisions yet.");
            }
            for a in &detail.approvals {
                println!(
                    "  L{} {:<9} by {} at {}{}",
                    a.level,
                    a.decision.as_str(),
                    a.approver_name,
                    a.decided_at.format("%Y-%m-%d %H:%M"),
                    a.comments
                        .as_deref()
                        .map(|c| format!(" ({})", c))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
