//! comments_server: standalone server for the group comments service.
//!
//! See `config` for the environment variables it reads.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use comments_core::memory::MemoryStore;
use comments_core::ports::Store;
use comments_core::service::{CommentService, CommentServiceImpl};
use comments_postgres::PgStore;
use comments_server::config::{Cli, Command, DatabaseArgs, ServeArgs};
use comments_server::middleware::jwt::JwtConfig;
use comments_server::password::Argon2Hasher;
use comments_server::router::{build_router, cors_layer};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real env vars still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,comments_server=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Migrate(args) => {
            connect(&args).await?.migrate().await?;
            Ok(())
        }
        Command::Seed(args) => {
            let store = connect(&args).await?;
            store.migrate().await?;
            let service = service_for(Arc::new(store));
            let report = comments_server::seed::seed(service.as_ref()).await?;
            tracing::info!(
                "seeded {} users and {} comments",
                report.users_created,
                report.comments_created
            );
            Ok(())
        }
    }
}

async fn connect(args: &DatabaseArgs) -> anyhow::Result<PgStore> {
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .connect(args.require_url()?)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Connected to database");
    Ok(PgStore::new(pool))
}

fn service_for(store: Arc<dyn Store>) -> Arc<dyn CommentService> {
    Arc::new(CommentServiceImpl::new(store, Arc::new(Argon2Hasher::new())))
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = if args.in_memory {
        tracing::warn!("using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let store = connect(&args.database).await?;
        store.migrate().await?;
        Arc::new(store)
    };
    let service = service_for(store);

    let jwt_config = JwtConfig::from_secret(args.jwt_secret.as_bytes())
        .with_ttl(chrono::Duration::minutes(args.token_ttl_minutes));
    tracing::info!(
        token_ttl_minutes = jwt_config.ttl().num_minutes(),
        "access tokens configured"
    );
    let app = build_router(service, jwt_config, cors_layer(&args.cors_origins));

    let listener = TcpListener::bind(&args.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", args.bind_addr))?;
    tracing::info!("comments_server listening on {}", args.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("comments_server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
