//! Score backend server entry point.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use score_backend::api;
use score_backend::config::{self, Config, LogFormat};
use score_backend::keep_alive::KeepAliveJob;
use score_backend::models::AppState;
use score_backend::rate_limit::{rate_limit, IpRateLimiter, RateLimitPruneJob};
use score_backend::scheduler::SchedulerService;
use score_backend::upstream::{HttpTransport, SaavnClient, Transport};

/// Initialize the tracing/logging subsystem.
fn init_tracing(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            subscriber
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Configure CORS based on application config.
fn configure_cors(config: &Config) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600);

    if config.cors_origins.len() == 1 && config.cors_origins[0] == "*" {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// Security headers added to every response.
fn security_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "SAMEORIGIN"))
        .add((header::REFERRER_POLICY, "no-referrer"))
        .add((header::X_DNS_PREFETCH_CONTROL, "off"))
        .add((
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=15552000; includeSubDomains",
        ))
}

/// Graceful shutdown handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize configuration
    let config = config::init()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    // Initialize logging
    init_tracing(config);

    // Validate configuration
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());
    let upstream = SaavnClient::from_config(config, Arc::clone(&transport));

    let rate_limiter =
        IpRateLimiter::new(config.rate_limit_max_requests, config.rate_limit_window)
            .map(web::Data::new);
    if rate_limiter.is_none() {
        tracing::warn!("Rate limiting disabled");
    }

    // The first ping fires immediately, then every interval.
    let mut scheduler = SchedulerService::new().with_job(KeepAliveJob::new(
        transport,
        upstream.base_url(),
        config.keep_alive_interval,
    ));
    if let Some(limiter) = &rate_limiter {
        scheduler = scheduler.with_job(RateLimitPruneJob::new(
            limiter.clone(),
            config.rate_limit_window,
        ));
    }
    let jobs = scheduler.start();

    let app_state = AppState { upstream };
    let bind_address = config.bind_address();

    tracing::info!(
        address = %bind_address,
        upstream = %config.upstream_base_url,
        "Starting Score backend server"
    );

    let server = HttpServer::new(move || {
        let mut app = App::new();
        if let Some(limiter) = &rate_limiter {
            // Shared by every worker so the quota is per process.
            app = app.app_data(limiter.clone());
        }

        app
            // Middleware (order matters - last registered runs first)
            .wrap(middleware::from_fn(rate_limit))
            .wrap(security_headers())
            .wrap(middleware::Compress::default())
            .wrap(configure_cors(config))
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(app_state.clone()))
            .configure(api::health::configure)
            .configure(api::search::configure)
            .default_service(web::to(api::health::not_found))
    })
    .bind(&bind_address)?
    .shutdown_timeout(30)
    .run();

    let result = tokio::select! {
        result = server => {
            result
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
    };

    for job in jobs {
        job.abort();
    }

    result
}
