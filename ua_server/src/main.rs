//! User authentication server.
//!
//! Wires PostgreSQL, Redis and SMTP into the registration and session
//! managers and serves the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use ua_server::{
    api::{self, AppState, cookies::CookieSettings},
    config::ServerConfig,
    logging, metrics,
};
use user_auth::{
    RegistrationManager, SessionManager,
    auth::CredentialHasher,
    cache::{EphemeralStore, RedisStore},
    db::{
        Database, PgRefreshTokenRepository, PgUserRepository, RefreshTokenRepository,
        UserRepository,
        seed::{SeedOutcome, ensure_admin},
    },
    mail::build_notifier,
    token::TokenCodec,
};

const HELP: &str = "\
Run the user authentication server

USAGE:
  ua_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --redis-url  URL         Redis connection string     [default: env REDIS_URL or redis://127.0.0.1:6379/0]

FLAGS:
  --seed                   Create the administrator from ADMIN_EMAIL / ADMIN_PASSWORD
  -h, --help               Print help information

ENVIRONMENT:
  JWT_SECRET               JWT signing secret (required, >= 32 chars)
  PASSWORD_HASH_KEY        Password hashing key (required, >= 16 chars)
  FRONTEND_URL             Base URL of verification links
  SMTP_HOST / SMTP_USER    SMTP relay; without it registration fails
  MAIL_MODE                Set to `log` to log verification emails instead of sending
  METRICS_BIND             Prometheus listener (optional)
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    redis_url: Option<String>,
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        redis_url: pargs.opt_value_from_str("--redis-url")?,
        seed: pargs.contains("--seed"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.redis_url)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("Prometheus metrics listening on {}", addr);
    }

    tracing::info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.ensure_schema()
        .await
        .context("Failed to apply database schema")?;
    db.seed_roles().await.context("Failed to seed roles")?;
    tracing::info!("Database ready");

    let cache: Arc<dyn EphemeralStore> = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await
            .context("Failed to connect to Redis")?,
    );

    let notifier = build_notifier(&config.mail).context("Failed to set up email delivery")?;

    let codec = Arc::new(TokenCodec::new(
        &config.security.jwt_secret,
        config.security.jwt_default_ttl_secs,
    )?);
    let hasher = Arc::new(CredentialHasher::new(
        config.security.password_hash_key.clone(),
    )?);

    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db.pool().clone()));
    let refresh_tokens: Arc<dyn RefreshTokenRepository> =
        Arc::new(PgRefreshTokenRepository::new(db.pool().clone()));

    if args.seed {
        match &config.admin {
            Some(admin) => {
                match ensure_admin(users.as_ref(), &hasher, &admin.email, &admin.password).await? {
                    SeedOutcome::Created(user) => {
                        tracing::info!("Created administrator {} (id {})", user.email, user.id)
                    }
                    SeedOutcome::AlreadyPresent(user) => {
                        tracing::info!("Administrator {} already exists", user.email)
                    }
                }
            }
            None => tracing::warn!("--seed given without ADMIN_EMAIL and ADMIN_PASSWORD"),
        }
    }

    let registration = Arc::new(RegistrationManager::new(
        users.clone(),
        cache.clone(),
        notifier,
        codec.clone(),
        hasher.clone(),
        config.sessions,
    ));
    let sessions = Arc::new(SessionManager::new(
        users,
        refresh_tokens,
        cache.clone(),
        codec,
        hasher,
        config.sessions,
    ));

    let state = AppState {
        registration,
        sessions,
        cache,
        database: Some(db.clone()),
        cookies: CookieSettings {
            secure: config.http.cookie_secure,
        },
        app_name: config.http.app_name.clone(),
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
