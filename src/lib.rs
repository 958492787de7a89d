use axum::{
    extract::FromRef,
    http::HeaderValue,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;
pub mod validation;


use services::{AuthService, TaskService};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::users::me,
        handlers::users::set_active,
        handlers::users::verify_email,
        handlers::tasks::create_task,
        handlers::tasks::get_tasks,
        handlers::tasks::get_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,
        handlers::tasks::set_task_status,
        handlers::tasks::toggle_task_completion
    ),
    components(
        schemas(
            models::RegisterRequest,
            models::LoginRequest,
            models::RefreshRequest,
            models::SetActiveRequest,
            models::Token,
            models::UserPublic,
            models::Role,
            models::NewTask,
            models::TaskPatch,
            models::TaskStatus,
            models::StatusUpdate,
            models::TaskResponse,
            models::ListTasksQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "Account endpoints"),
        (name = "tasks", description = "Task management endpoints")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

/// Shared handler state. Both services are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,
    pub auth: AuthService,
}

impl FromRef<AppState> for TaskService {
    fn from_ref(state: &AppState) -> Self {
        state.tasks.clone()
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub fn create_app(state: AppState, cors_allow_origin: &str) -> Router {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let cors = match cors_allow_origin {
        "*" => cors.allow_origin(Any),
        origin => match origin.parse::<HeaderValue>() {
            Ok(value) => cors.allow_origin(value),
            Err(_) => {
                tracing::warn!(origin, "invalid CORS origin, allowing any");
                cors.allow_origin(Any)
            }
        },
    };

    let tasks: Router<AppState> = Router::new()
        .route(
            "/",
            post(handlers::tasks::create_task).get(handlers::tasks::get_tasks),
        )
        .route(
            "/:task_id",
            get(handlers::tasks::get_task)
                .put(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        .route("/:task_id/status", put(handlers::tasks::set_task_status))
        .route(
            "/:task_id/complete",
            patch(handlers::tasks::toggle_task_completion),
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(|| async { "Todo service is running!" }))
        .route("/health", get(handlers::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/users/me", get(handlers::users::me))
        .route("/api/admin/users/:id/active", put(handlers::users::set_active))
        .route("/api/admin/users/:id/verify", put(handlers::users::verify_email))
        .nest("/api/users/:user_id/tasks", tasks)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
