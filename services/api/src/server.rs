use crate::cli::ServeArgs;
use crate::infra::{load_engine, AppState, InMemoryModuleGateway};
use crate::routes::with_module_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use clinic_modules::config::{AppConfig, AppEnvironment};
use clinic_modules::error::AppError;
use clinic_modules::modules::{ModuleConfigurationService, TenantId};
use clinic_modules::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let engine = match load_engine(&config.catalog) {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            error!(error = %err, "refusing to start with an invalid module catalog");
            return Err(err);
        }
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let mut gateway = InMemoryModuleGateway::default();
    if config.environment == AppEnvironment::Development {
        gateway = gateway.with_tenant(TenantId("demo-clinic".to_string()), engine.baseline());
    }
    let service = Arc::new(
        ModuleConfigurationService::new(engine.clone(), Arc::new(gateway))
            .with_idle_timeout(config.sessions.idle_timeout()),
    );

    let app = with_module_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        modules = engine.catalog().len(),
        "clinic module service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
