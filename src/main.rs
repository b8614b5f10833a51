//! Wildwatch - case and investigation lifecycle engine for wildlife threat reports

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wildwatch::{
    auth::JwtValidator,
    config::{Args, LogFormat, StoreBackend},
    db::Stores,
    logging::AuditLogger,
    server::{self, AppState},
    services::{Engine, HttpMediaResolver, HttpMediaResolverConfig, MediaResolver, MemoryMediaCatalog},
};

/// Session token lifetime for tokens minted by this process (dev tooling only)
const TOKEN_EXPIRY_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wildwatch={},info", log_level).into());
    match args.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Wildwatch - wildlife threat cases");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Store: {:?}", args.store);
    if args.store == StoreBackend::Mongo {
        info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
    }
    info!(
        "Media storage: {}",
        args.storage_url.as_deref().unwrap_or("(none, permissive)")
    );
    info!("Request timeout: {} ms", args.request_timeout_ms);
    info!("======================================");

    // Connect the store (Mongo is optional in dev mode)
    let stores = match args.store {
        StoreBackend::Memory => {
            warn!("Using in-memory store - data is lost on restart");
            Stores::memory()
        }
        StoreBackend::Mongo => match Stores::mongo(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(stores) => {
                info!("MongoDB connected successfully");
                stores
            }
            Err(e) => {
                if args.dev_mode {
                    warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                    Stores::memory()
                } else {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        },
    };

    let media: Arc<dyn MediaResolver> = match args.storage_url.as_deref() {
        Some(url) => Arc::new(HttpMediaResolver::new(HttpMediaResolverConfig::new(url))),
        None => {
            warn!("No STORAGE_URL configured - evidence URLs are accepted unchecked");
            Arc::new(MemoryMediaCatalog::permissive())
        }
    };

    let audit = AuditLogger::new(args.node_id.to_string());
    if let Some(path) = args.audit_log_path.clone() {
        match audit.init_file(path.clone()).await {
            Ok(()) => info!("Audit log: {}", path.display()),
            Err(e) => {
                error!("Failed to open audit log {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    let jwt = match args.jwt_secret.clone() {
        Some(secret) if !secret.is_empty() => JwtValidator::new(secret, TOKEN_EXPIRY_SECS)?,
        _ => {
            warn!("No JWT_SECRET configured - using the development secret");
            JwtValidator::new_dev()
        }
    };

    let engine = Engine::new(stores, media, audit);
    let state = Arc::new(AppState::new(args, engine, jwt));

    server::run(state).await?;

    Ok(())
}
