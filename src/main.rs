//! Gallery Gateway - HTTP front door of a multi-tenant photo gallery.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gallery_gateway::{
    app_state::{ensure_initialized, Bootstrap, InitializationGate},
    config::ServeConfig,
    cors::{CorsGate, CorsPolicyCache, CORS_ALLOWED_ORIGINS_KEY},
    error::StoreError,
    server::{create_router, AppState, RouterConfig},
    settings::{MemorySettingStore, SettingEventBus, TenantSettingStore},
    tenant::{HostTenantResolver, Tenant},
    web::{MemoryPhotoStore, MemorySiteConfig, ShareDocumentComposer, StaticDocumentServer},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServeConfig::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match run_serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Serve
// =============================================================================

async fn run_serve(config: ServeConfig) -> Result<(), String> {
    let tenants = config.parsed_tenants()?;
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to read working directory: {}", e))?;

    print_banner();

    info!("Configuration:");
    info!("  Base domain: {}", config.base_domain);
    info!(
        "  Tenants: {}",
        if tenants.is_empty() {
            "(none)".to_string()
        } else {
            tenants
                .iter()
                .map(|t| t.slug.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    info!("  Reserved subdomains: {}", config.reserved_slugs.join(", "));

    // Settings, events and first-run state
    let events = Arc::new(SettingEventBus::new());
    let settings = Arc::new(MemorySettingStore::new().with_events(Arc::clone(&events)));
    let gate = Arc::new(InitializationGate::new(settings.clone()));

    // CORS policies follow tenant setting changes until shutdown
    let policies = Arc::new(CorsPolicyCache::new(settings.clone()));
    let subscriptions = policies.start(&events);

    let seed = SeedTenantSettings {
        settings: settings.clone(),
        tenants: tenants.clone(),
        cors_origins: config.cors_origins.clone(),
    };
    if config.skip_initialization {
        seed.provision()
            .await
            .map_err(|e| format!("Failed to seed tenant settings: {}", e))?;
        warn!("  Setup: skipped - CORS is permissive until the application is initialized");
    } else {
        let initialized = ensure_initialized(&gate, &seed)
            .await
            .map_err(|e| format!("First-run setup failed: {}", e))?;
        info!(
            "  Setup: {}",
            if initialized {
                "completed on this start"
            } else {
                "already complete"
            }
        );
    }

    // Tenant resolution
    let mut resolver = HostTenantResolver::new(config.base_domain.clone())
        .with_reserved_slugs(config.reserved_slugs.iter().cloned())
        .with_initialization_gate(gate.clone());
    for tenant in &tenants {
        resolver = resolver.with_tenant(tenant.clone());
    }

    // Documents
    let dashboard = StaticDocumentServer::new("dashboard", config.dashboard_candidates(&cwd))
        .with_cache_capacity(config.document_cache);
    let web = StaticDocumentServer::new("web", config.web_candidates(&cwd))
        .with_cache_capacity(config.document_cache);
    log_roots(&dashboard);
    log_roots(&web);

    let photos = MemoryPhotoStore::new();
    for (slug, path) in config.parsed_photo_manifests()? {
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read photo manifest {}: {}", path.display(), e))?;
        let count = photos
            .load_manifest(&slug, &json)
            .map_err(|e| format!("Failed to load photo manifest {}: {}", path.display(), e))?;
        info!("  Photos: {} for tenant {}", count, slug);
    }

    let composer = ShareDocumentComposer::new(Arc::new(photos), Arc::new(MemorySiteConfig::new()));

    // Router
    let state = AppState::new(dashboard, web, composer, gate.clone());
    let cors = CorsGate::new(gate, Arc::new(resolver), policies);
    let router_config = RouterConfig::new()
        .with_tenantless_paths(config.tenantless_paths.clone())
        .with_tracing(!config.no_tracing);
    let router = create_router(state, cors, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    if let Some(tenant) = tenants.first() {
        info!(
            "    curl -H 'Host: {}.{}' http://{}/",
            tenant.slug, config.base_domain, addr
        );
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    subscriptions.stop(&events);
    info!("Server stopped");

    served.map_err(|e| format!("Server error: {}", e))
}

/// Startup provisioning: seed the initial CORS origins of configured
/// tenants that have none yet.
struct SeedTenantSettings {
    settings: Arc<MemorySettingStore>,
    tenants: Vec<Tenant>,
    cors_origins: Option<String>,
}

#[async_trait]
impl Bootstrap for SeedTenantSettings {
    async fn provision(&self) -> Result<(), StoreError> {
        let Some(origins) = &self.cors_origins else {
            return Ok(());
        };

        for tenant in &self.tenants {
            let existing = self
                .settings
                .get_setting(&tenant.id, CORS_ALLOWED_ORIGINS_KEY)
                .await?;
            if existing.is_none() {
                self.settings
                    .set_tenant_setting(&tenant.id, CORS_ALLOWED_ORIGINS_KEY, origins.clone())
                    .await;
            }
        }
        Ok(())
    }
}

fn log_roots(server: &StaticDocumentServer) {
    let existing: Vec<_> = server.roots().iter().filter(|root| root.is_dir()).collect();
    match existing.first() {
        Some(root) => info!(
            "  {} documents: {} ({} candidate roots)",
            server.name(),
            root.display(),
            server.roots().len()
        ),
        None => warn!(
            "  {} documents: no build output found in {} candidate roots",
            server.name(),
            server.roots().len()
        ),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!(" ██████╗  █████╗ ██╗     ██╗     ███████╗██████╗ ██╗   ██╗");
    info!("██╔════╝ ██╔══██╗██║     ██║     ██╔════╝██╔══██╗╚██╗ ██╔╝");
    info!("██║  ███╗███████║██║     ██║     █████╗  ██████╔╝ ╚████╔╝ ");
    info!("██║   ██║██╔══██║██║     ██║     ██╔══╝  ██╔══██╗  ╚██╔╝  ");
    info!("╚██████╔╝██║  ██║███████╗███████╗███████╗██║  ██║   ██║   ");
    info!(" ╚═════╝ ╚═╝  ╚═╝╚══════╝╚══════╝╚══════╝╚═╝  ╚═╝   ╚═╝   ");
    info!("");
    info!("                     gateway v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "gallery_gateway=debug,tower_http=debug"
    } else {
        "gallery_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
