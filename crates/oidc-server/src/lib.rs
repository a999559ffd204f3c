//! Server assembly.
//!
//! Startup is strictly sequential: configuration, keystore, adapter, provider, and
//! only then the listener. Any failure before the listener binds ends the process.

use actix::Actor;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use oidc_actix::actors::InteractionActor;
use oidc_actix::{handlers, session, Views};
use oidc_config::{Config, ConfigError};
use oidc_core::OidcError;
use oidc_keystore::{Keystore, KeystoreError};
use oidc_observability::{init_telemetry, shutdown_telemetry, Metrics, MetricsMiddleware};
use oidc_ports::DynAdapter;
use oidc_provider::{DemoAccounts, Provider};

pub const SERVICE_NAME: &str = "oidc_provider_demo";

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("keystore: {0}")]
    Keystore(#[from] KeystoreError),
    #[error("adapter: {0}")]
    Adapter(OidcError),
    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("views: {0}")]
    Views(#[from] tera::Error),
}

/// Everything the HTTP workers share, built before the listener starts.
pub struct Bootstrapped {
    pub config: Config,
    pub provider: Arc<Provider>,
    pub adapter: DynAdapter,
    pub metrics: Metrics,
    pub views: Arc<Views>,
}

pub async fn bootstrap(config: Config) -> Result<Bootstrapped, BootstrapError> {
    tracing::info!(app = %config.app_name, config = ?config, "configuration loaded");

    let settings = config.provider_settings()?;
    let keystore = Arc::new(Keystore::load(&config.keystore_path)?);

    let adapter = oidc_adapter_factory::create_adapter(&config.redis.url)
        .await
        .map_err(BootstrapError::Adapter)?;
    adapter.healthcheck().await.map_err(BootstrapError::Adapter)?;

    let provider = Arc::new(Provider::new(
        config.issuer.clone(),
        keystore,
        settings,
        config.secure_keys.clone(),
        adapter.clone(),
        Arc::new(DemoAccounts::new()),
    ));

    Ok(Bootstrapped {
        config,
        provider,
        adapter,
        metrics: Metrics::new()?,
        views: Arc::new(Views::new()?),
    })
}

pub async fn serve(app: Bootstrapped) -> std::io::Result<()> {
    let Bootstrapped {
        config,
        provider,
        adapter,
        metrics,
        views,
    } = app;

    let interaction_actor = InteractionActor::new(provider.clone()).start();

    // The current key signs; cookies signed with the previous key are re-signed on the way in.
    let cookie_key = session::cookie_key(&provider.cookie_keys().current);
    let previous_cookie_key = session::cookie_key(&provider.cookie_keys().previous);
    let secure_cookie = provider.issuer().starts_with("https://");

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        issuer = %provider.issuer(),
        "starting HTTP server"
    );

    let result = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(provider.clone()))
            .app_data(web::Data::new(adapter.clone()))
            .app_data(web::Data::new(interaction_actor.clone()))
            .app_data(web::Data::from(views.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .wrap(session::session_middleware(cookie_key.clone(), secure_cookie))
            .wrap(session::PreviousKeyFallback::new(
                cookie_key.clone(),
                previous_cookie_key.clone(),
            ))
            .wrap(MetricsMiddleware::new(metrics.clone()))
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
            .default_service(web::to(handlers::provider::not_found))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await;

    shutdown_telemetry();
    result
}

pub async fn run() -> std::io::Result<()> {
    if let Err(e) = init_telemetry(SERVICE_NAME) {
        eprintln!("failed to initialize telemetry: {e}");
    }

    let app = match Config::from_env() {
        Ok(config) => bootstrap(config).await,
        Err(e) => Err(e.into()),
    };

    match app {
        Ok(app) => serve(app).await,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            shutdown_telemetry();
            Err(std::io::Error::other(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(dir: &std::path::Path) -> Vec<(String, String)> {
        vec![
            ("HEROKU_APP_NAME".into(), "oidc-demo".into()),
            ("PORT".into(), "0".into()),
            ("SECURE_KEY".into(), "k1,k2".into()),
            ("REDIS_URL".into(), "memory://".into()),
            (
                "KEYSTORE_PATH".into(),
                dir.join("keystore.json").display().to_string(),
            ),
            (
                "PROVIDER_CONFIG".into(),
                dir.join("provider.conf").display().to_string(),
            ),
        ]
    }

    #[actix_rt::test]
    async fn missing_keystore_fails_before_listening() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_vars(vars(dir.path())).unwrap();
        let err = bootstrap(config).await.err().unwrap();
        assert!(matches!(err, BootstrapError::Keystore(_)));
    }

    #[actix_rt::test]
    async fn unsupported_adapter_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        Keystore::generate_rsa(1024)
            .unwrap()
            .save(dir.path().join("keystore.json"))
            .unwrap();

        let mut vars = vars(dir.path());
        vars.retain(|(k, _)| k != "REDIS_URL");
        vars.push(("REDIS_URL".into(), "postgres://localhost".into()));

        let config = Config::from_vars(vars).unwrap();
        let err = bootstrap(config).await.err().unwrap();
        assert!(matches!(err, BootstrapError::Adapter(_)));
    }

    #[actix_rt::test]
    async fn bootstraps_with_memory_adapter() {
        let dir = tempfile::tempdir().unwrap();
        Keystore::generate_rsa(1024)
            .unwrap()
            .save(dir.path().join("keystore.json"))
            .unwrap();

        let config = Config::from_vars(vars(dir.path())).unwrap();
        let app = bootstrap(config).await.unwrap();
        assert_eq!(app.provider.issuer(), "http://localoidc");
        assert_eq!(app.provider.jwks().keys.len(), 1);
        app.adapter.healthcheck().await.unwrap();
    }
}
