use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    middleware::from_fn_with_state,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::auth::{CredentialStore, TokenService};
use crate::config::AppConfig;
use crate::database::models::{Expense, Income, Todo};
use crate::database::{
    DatabaseManager, IncomeStore, MemoryStore, OwnedStore, PgStore, PrincipalStore, Repository,
};
use crate::error::ApiError;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{require_admin, require_user};
use crate::services::{AccountService, IncomeLedger};

/// Everything a handler can reach. Cheap to clone; all members share the backend.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub credentials: CredentialStore,
    pub accounts: AccountService,
    pub expenses: Repository<Expense>,
    pub incomes: Repository<Income>,
    pub income_ledger: IncomeLedger,
    pub todos: Repository<Todo>,
    pub storage: &'static str,
}

impl AppState {
    /// Wire every service to one backend
    pub fn from_backend<B>(backend: Arc<B>, tokens: TokenService, bcrypt_cost: u32, storage: &'static str) -> Self
    where
        B: PrincipalStore + OwnedStore<Expense> + OwnedStore<Todo> + IncomeStore + 'static,
    {
        let credentials = CredentialStore::new(backend.clone(), bcrypt_cost);
        let expenses: Repository<Expense> = Repository::new(backend.clone());
        let incomes: Repository<Income> = Repository::new(backend.clone());
        let todos: Repository<Todo> = Repository::new(backend.clone());
        let income_ledger = IncomeLedger::new(backend);
        let accounts = AccountService::new(
            credentials.clone(),
            tokens.clone(),
            expenses.clone(),
            incomes.clone(),
            todos.clone(),
        );

        Self { tokens, credentials, accounts, expenses, incomes, income_ledger, todos, storage }
    }

    pub fn in_memory(config: &AppConfig) -> anyhow::Result<Self> {
        let tokens = TokenService::from_config(config)?;
        Ok(Self::from_backend(
            Arc::new(MemoryStore::new()),
            tokens,
            config.security.bcrypt_cost,
            "memory",
        ))
    }

    /// Postgres when a database is configured, otherwise the in-memory store
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        if config.database.url.is_none() {
            warn!("DATABASE_URL not set; data lives in memory and is lost on restart");
            return Self::in_memory(config);
        }

        let tokens = TokenService::from_config(config)?;
        let pool = DatabaseManager::connect(&config.database).await?;
        Ok(Self::from_backend(
            Arc::new(PgStore::new(pool)),
            tokens,
            config.security.bcrypt_cost,
            "postgres",
        ))
    }
}

pub fn router(state: AppState, config: &AppConfig) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/register", post(public::register))
        .route("/auth/login", post(public::login))
        .route("/admin/login", post(public::admin_login));

    let user_routes = Router::new()
        .route("/auth/me", get(protected::session::me))
        .route(
            "/expenses",
            get(protected::expenses::list).post(protected::expenses::create),
        )
        .route(
            "/expenses/:id",
            get(protected::expenses::get)
                .put(protected::expenses::update)
                .delete(protected::expenses::delete),
        )
        .route(
            "/income",
            get(protected::income::list).post(protected::income::record),
        )
        .route("/income/latest", get(protected::income::latest))
        .route(
            "/income/:id",
            get(protected::income::get)
                .put(protected::income::update)
                .delete(protected::income::delete),
        )
        .route("/todo", get(protected::todo::list).post(protected::todo::create))
        .route(
            "/todo/:id",
            get(protected::todo::get)
                .put(protected::todo::update)
                .delete(protected::todo::delete),
        )
        .route(
            "/todo/:id/subtasks",
            get(protected::todo::list_subtasks).post(protected::todo::add_subtask),
        )
        .route(
            "/todo/:id/subtasks/:sub_id",
            axum::routing::put(protected::todo::update_subtask).delete(protected::todo::remove_subtask),
        )
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let admin_routes = Router::new()
        .route("/admin/me", get(elevated::admin::me))
        .route(
            "/admin/users",
            get(elevated::users::list).post(elevated::users::create),
        )
        .route(
            "/admin/users/:id",
            get(elevated::users::get)
                .put(elevated::users::update)
                .delete(elevated::users::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .with_state(state);

    if config.api.enable_request_logging {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    info!("CORS restricted to {} origin(s)", allowed.len());
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "Ledger API (Rust)",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.storage,
        "endpoints": {
            "public": "/auth/register, /auth/login, /admin/login",
            "user": "/auth/me, /expenses[/:id], /income[/latest|/:id], /todo[/:id[/subtasks[/:subId]]]",
            "admin": "/admin/me, /admin/users[/:id]",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.credentials.ping().await {
        Ok(()) => Ok(Json(json!({
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "storage": state.storage,
        }))),
        Err(e) => {
            warn!("Health check failed: {}", e);
            Err(ApiError::service_unavailable("database unavailable"))
        }
    }
}
