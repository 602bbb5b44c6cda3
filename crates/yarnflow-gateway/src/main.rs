//! Yarnflow Gateway - HTTP API for the order tracker
//!
//! This is the main entry point for the gateway service. The gateway embeds
//! the order desk and serves the JSON API over a local RocksDB store.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use a mock token validator that
//! accepts `test-token:<user-uuid>` in place of a signed token.
//!
//! # Environment
//!
//! - `LISTEN_ADDR`, `DATA_DIR`, `UPLOAD_DIR`
//! - `TOKEN_SECRET`, `TOKEN_TTL_SECONDS`
//! - `SEED_DEMO_USERS` (`true` creates demo accounts when no admin exists)

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yarnflow_auth::{AuthConfig, TokenIssuer};
#[cfg(feature = "dev-mode")]
use yarnflow_auth::MockJwtValidator;
#[cfg(not(feature = "dev-mode"))]
use yarnflow_auth::HmacJwtValidator;
use yarnflow_desk::{DeskConfig, OrderDesk, OrderDeskService};
use yarnflow_gateway::{create_router, GatewayConfig, GatewayState};
use yarnflow_store::RocksStore;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn load_config() -> Result<(GatewayConfig, AuthConfig), Box<dyn std::error::Error>> {
    let mut config = GatewayConfig::default();
    if let Ok(addr) = std::env::var("LISTEN_ADDR") {
        config.listen_addr = addr;
    }
    if let Ok(dir) = std::env::var("DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("UPLOAD_DIR") {
        config.upload_dir = PathBuf::from(dir);
    }
    config.seed_demo_users = env_flag("SEED_DEMO_USERS");

    let mut auth_config = AuthConfig::default();
    if let Ok(secret) = std::env::var("TOKEN_SECRET") {
        auth_config.secret = secret;
    }
    if let Ok(ttl) = std::env::var("TOKEN_TTL_SECONDS") {
        auth_config.token_ttl_seconds = ttl
            .parse()
            .map_err(|e| format!("invalid TOKEN_TTL_SECONDS {ttl:?}: {e}"))?;
    }

    Ok((config, auth_config))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,yarnflow=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Yarnflow Gateway");

    let (gateway_config, auth_config) = load_config()?;

    tracing::info!(
        listen_addr = %gateway_config.listen_addr,
        data_dir = %gateway_config.data_dir.display(),
        upload_dir = %gateway_config.upload_dir.display(),
        token_ttl_seconds = auth_config.token_ttl_seconds,
        seed_demo_users = gateway_config.seed_demo_users,
        "Gateway configuration loaded"
    );

    if auth_config.uses_dev_secret() {
        tracing::warn!("TOKEN_SECRET not set - signing tokens with the development secret");
    }

    // Initialize RocksDB store
    tracing::info!(path = %gateway_config.data_dir.display(), "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&gateway_config.data_dir)?);

    let desk_config = DeskConfig {
        upload_dir: gateway_config.upload_dir.clone(),
        ..DeskConfig::default()
    };
    let desk = Arc::new(OrderDeskService::new(store, desk_config));

    if gateway_config.seed_demo_users {
        let created = desk.seed_default_users().await?;
        tracing::info!(created, "Demo account seeding finished");
    }

    // Initialize token validation
    #[cfg(feature = "dev-mode")]
    let jwt_validator = {
        tracing::warn!("DEV MODE ENABLED - using mock token validator");
        tracing::warn!("Use tokens in format: test-token:<user-uuid>");
        Arc::new(MockJwtValidator)
    };

    #[cfg(not(feature = "dev-mode"))]
    let jwt_validator = Arc::new(HmacJwtValidator::new(&auth_config));

    let token_issuer = Arc::new(TokenIssuer::new(auth_config));
    tracing::info!("Token validator initialized");

    let listen_addr = gateway_config.listen_addr.clone();
    let state = GatewayState::new(desk, jwt_validator, token_issuer, gateway_config);
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
