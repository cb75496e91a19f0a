use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderName, Method},
    middleware,
    routing::{get, patch, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    application::{crm_service::CrmService, transfer_service::TransferService},
    auth::{AdminDirectory, SessionSigner},
    config::{AppConfig, StoreBackend},
    crm::{CrmClient, FileTokenStore, MemoryTokenStore, TokenStore},
    infrastructure::{
        TransferRepository, demo_seed::demo_transfers,
        in_memory_transfer_repository::InMemoryTransferRepository,
        json_file_transfer_repository::JsonFileTransferRepository,
    },
    interface::http::{
        auth_handler, crm_handler,
        session_guard::require_admin,
        transfers_handler::{
            advance_status, create_transfer, get_transfer, healthcheck, list_transfers,
            report_problem, undo_status,
        },
    },
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let admin_routes = Router::new()
        .route("/transfers", post(create_transfer).get(list_transfers))
        .route(
            "/crm/auth",
            get(crm_handler::connection_status).post(crm_handler::refresh_token),
        )
        .route("/crm/auth/login", get(crm_handler::begin_login))
        .route("/crm/auth/logout", post(crm_handler::logout))
        .route("/crm/deals/search", get(crm_handler::search_deals))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new()
        .route("/health", get(healthcheck))
        .route("/transfers/{id}", get(get_transfer).patch(advance_status))
        .route("/transfers/{id}/undo", patch(undo_status))
        .route("/transfers/{id}/problem", post(report_problem))
        .route("/auth/login", post(auth_handler::login))
        .route("/auth/session", get(auth_handler::session))
        .route("/auth/logout", post(auth_handler::logout))
        .route("/crm/auth/callback", get(crm_handler::oauth_callback));

    Router::new()
        .merge(admin_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS]),
        )
        .with_state(state)
}

/// Wires stores, services and the auth gate from configuration.
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let repository: Arc<dyn TransferRepository> = match config.transfer_store {
        StoreBackend::Memory => Arc::new(InMemoryTransferRepository::new()),
        StoreBackend::File => Arc::new(
            JsonFileTransferRepository::open(&config.data_dir)
                .await
                .with_context(|| {
                    format!("failed to open transfer store in {}", config.data_dir.display())
                })?,
        ),
    };

    if config.seed_demo {
        seed_demo_transfers(repository.as_ref()).await?;
    }

    let tokens: Arc<dyn TokenStore> = match config.token_store {
        StoreBackend::Memory => Arc::new(MemoryTokenStore::new()),
        StoreBackend::File => Arc::new(FileTokenStore::new(config.token_file.clone())),
    };
    let crm_client = CrmClient::new(config.crm.clone(), tokens)
        .context("failed to build CRM HTTP client")?;

    let admin_password = config.admin_password.clone();
    let root_password = config.root_password.clone();
    let cost = config.password_hash_cost;
    let admins = tokio::task::spawn_blocking(move || {
        AdminDirectory::with_default_accounts(&admin_password, &root_password, cost)
    })
    .await
    .context("admin account setup panicked")?
    .context("failed to set up admin accounts")?;
    tracing::info!(accounts = ?admins.usernames(), "admin accounts ready");

    let sessions = SessionSigner::new(
        config.session_secret.clone(),
        chrono::Duration::hours(config.session_ttl_hours),
    )
    .with_secure_cookies(config.secure_cookies);

    Ok(AppState::new(
        Arc::new(TransferService::new(repository, config.public_base_url.clone())),
        Arc::new(CrmService::new(Arc::new(crm_client))),
        Arc::new(admins),
        Arc::new(sessions),
    ))
}

/// Inserts the demo transfers that are not already stored.
pub async fn seed_demo_transfers(repository: &dyn TransferRepository) -> Result<usize> {
    let mut inserted = 0;
    for transfer in demo_transfers(chrono::Utc::now()) {
        if repository.get(&transfer.id).await?.is_some() {
            continue;
        }
        repository.create(transfer).await?;
        inserted += 1;
    }
    tracing::info!(inserted, "demo transfers seeded");
    Ok(inserted)
}
