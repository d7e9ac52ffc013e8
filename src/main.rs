use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    response::IntoResponse,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use supportdesk_backend::{
    app_with,
    config::{Config, LogFormat},
    db::{
        postgres_app_repository::PostgresAppRepository,
        postgres_faq_repository::PostgresFaqRepository,
        postgres_ticket_repository::PostgresTicketRepository,
        postgres_user_repository::PostgresUserRepository,
    },
    responses::JsonResponse,
    services::{
        blob_store::LocalBlobStore, identity::PostgresCredentialProvider, mailer::SmtpMailer,
    },
    utils::{csrf::CSRF_HEADER, jwt::JwtKeys},
    AppState,
};

const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|err| anyhow!(err))
}

async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("connected to the database");
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format)?;
    let jwt_keys = JwtKeys::from_env()?;

    let limits = config.rate_limits;
    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(limits.global_period_ms)
            .burst_size(limits.global_burst)
            .use_headers()
            .error_handler(|_err| JsonResponse::too_many_requests(RATE_LIMITED_MESSAGE).into_response())
            .finish()
            .ok_or_else(|| anyhow!("invalid RATE_LIMITER_MILLISECONDS / RATE_LIMITER_BURST"))?,
    );
    // Stricter limiter for /api/auth/*
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(limits.auth_period_secs)
            .burst_size(limits.auth_burst)
            .use_headers()
            .error_handler(|_err| JsonResponse::too_many_requests(RATE_LIMITED_MESSAGE).into_response())
            .finish()
            .ok_or_else(|| anyhow!("invalid RATE_LIMITER_AUTH_SECONDS / RATE_LIMITER_AUTH_BURST"))?,
    );

    // Drop idle client keys from both limiters.
    let global_limiter = global_governor_conf.limiter().clone();
    let auth_limiter = auth_governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            global_limiter.retain_recent();
            auth_limiter.retain_recent();
        }
    });

    let mailer = SmtpMailer::from_env(config.verification_link_base())
        .context("failed to configure the SMTP mailer")?;

    let pg_pool = establish_connection(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("failed to run database migrations")?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;

    let frontend_origin = config
        .frontend_origin
        .parse::<HeaderValue>()
        .context("FRONTEND_ORIGIN is not a valid origin")?;
    let cors = CorsLayer::new()
        .allow_origin(frontend_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(CSRF_HEADER),
        ])
        .allow_credentials(true);

    let bind_addr = config.bind_addr;
    let state = AppState {
        users: Arc::new(PostgresUserRepository {
            pool: pg_pool.clone(),
        }),
        apps: Arc::new(PostgresAppRepository {
            pool: pg_pool.clone(),
        }),
        tickets: Arc::new(PostgresTicketRepository {
            pool: pg_pool.clone(),
        }),
        faqs: Arc::new(PostgresFaqRepository {
            pool: pg_pool.clone(),
        }),
        identity: Arc::new(PostgresCredentialProvider { pool: pg_pool }),
        mailer: Arc::new(mailer),
        blob_store: Arc::new(LocalBlobStore::new(
            config.upload_dir.clone(),
            &config.upload_public_base_url,
        )),
        config: Arc::new(config),
        jwt_keys: Arc::new(jwt_keys),
    };

    let app = app_with(state, |auth| {
        auth.layer(GovernorLayer {
            config: auth_governor_conf,
        })
    })
    .layer(GovernorLayer {
        config: global_governor_conf,
    })
    .layer(cors);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "support desk listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
