//! Serve command - runs the Tollgate demo web server.
//!
//! Every route sits behind the permission middleware: `/admin` needs an
//! admin, `/data` a logged-in user, and only the pages in `PUBLIC_PATHS`
//! plus the root are open to everyone. Anything else is refused.

use std::time::Instant;

use axum::{
    Form, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::signal::unix::{SignalKind, signal};

use tollgate::{Permissions, UserState, user::valid_username_password};

use crate::backend::open_user_state;
use crate::cli::ServeArgs;
use crate::commands::users::user_row;
use crate::templates;

/// Prefixes reachable without logging in
const PUBLIC_PATHS: &[&str] = &[
    "/login",
    "/register",
    "/confirm/",
    "/logout",
    "/health",
    "/favicon.ico",
];

/// Shared application state
#[derive(Clone)]
struct AppState {
    users: UserState,
    backend_kind: &'static str,
    started: Instant,
}

/// Login form data
#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

/// Registration form data
#[derive(Deserialize)]
struct RegisterForm {
    username: String,
    password: String,
    email: String,
}

/// Promotion form data
#[derive(Deserialize)]
struct PromoteForm {
    username: String,
}

/// Run the Tollgate server
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (users, backend) = open_user_state(&args.backend_config).await?;
    users.set_secure_cookies(args.secure_cookies);
    if args.backend_config.cookie_secret.is_none() {
        tracing::warn!("No cookie secret configured; sessions end when the server restarts");
    }

    let permissions = demo_permissions(users.clone());

    let app_state = AppState {
        users,
        backend_kind: backend.kind,
        started: Instant::now(),
    };

    let app = router(app_state.clone(), permissions);

    // Bind server
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    println!("Tollgate server started on http://localhost:{}", local_addr.port());
    println!();
    println!("Available endpoints:");
    println!("  GET  /                - Home");
    println!("  GET  /login           - Login page");
    println!("  POST /login           - Login submission");
    println!("  GET  /register        - Registration page");
    println!("  POST /register        - Registration submission");
    println!("  GET  /confirm/{{code}}  - Confirm a registration");
    println!("  GET  /logout          - Log out");
    println!("  GET  /data            - Your data (requires login)");
    println!("  GET  /admin           - User list (requires admin)");
    println!("  POST /admin/promote   - Grant admin rights (requires admin)");
    println!("  GET  /health          - Health check");
    println!();
    println!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Save users on shutdown (only needed for the in-memory backend)
    if let Err(e) = backend.save().await {
        tracing::error!("Failed to save users: {e}");
        eprintln!("Failed to save users: {e}");
    }
    app_state.users.close().await?;

    println!("Server shut down");
    Ok(())
}

/// Default admin and user prefixes with an explicit public whitelist.
fn demo_permissions(users: UserState) -> Permissions {
    let permissions = Permissions::new(users);
    permissions.set_public_path(PUBLIC_PATHS.iter().map(|p| p.to_string()).collect());
    permissions
}

fn router(state: AppState, permissions: Permissions) -> Router {
    Router::new()
        .route("/", get(handle_home))
        .route("/health", get(handle_health))
        .route("/login", get(handle_login_page).post(handle_login_submit))
        .route(
            "/register",
            get(handle_register_page).post(handle_register_submit),
        )
        .route("/confirm/{code}", get(handle_confirm))
        .route("/logout", get(handle_logout).post(handle_logout))
        .route("/data", get(handle_data))
        .route("/admin", get(handle_admin))
        .route("/admin/promote", post(handle_promote))
        .layer(from_fn_with_state(permissions, Permissions::guard))
        .with_state(state)
}

async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed to install signal handlers: {e}");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    tracing::error!("Request failed: {e}");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
}

// ============================================================================
// Authentication Handlers
// ============================================================================

/// Handler for GET /
async fn handle_home(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let username = state.users.username(&headers);
    let logged_in = state.users.user_rights(&headers).await;
    Html(templates::home_page(logged_in.then_some(username.as_str())))
}

/// Handler for GET /login
async fn handle_login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.users.user_rights(&headers).await {
        return Redirect::to("/data").into_response();
    }
    Html(templates::login_page(None)).into_response()
}

/// Handler for POST /login
async fn handle_login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    if let Err(e) = state.users.verify_password(&form.username, &form.password).await {
        tracing::info!(username = %form.username, "Login refused: {e}");
        return Html(templates::login_page(Some("Wrong username or password"))).into_response();
    }

    let mut response_headers = HeaderMap::new();
    match state.users.login(&mut response_headers, &form.username).await {
        Ok(()) => (response_headers, Redirect::to("/data")).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Handler for /logout
async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let username = state.users.username(&headers);
    if !username.is_empty() {
        if let Err(e) = state.users.logout(&username).await {
            return internal_error(e);
        }
    }

    let mut response_headers = HeaderMap::new();
    if let Err(e) = state.users.clear_cookie(&mut response_headers) {
        return internal_error(e);
    }
    (response_headers, Redirect::to("/")).into_response()
}

/// Handler for GET /register
async fn handle_register_page() -> Html<String> {
    Html(templates::register_page(None))
}

/// Handler for POST /register
async fn handle_register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let users = &state.users;
    if let Err(e) = valid_username_password(&form.username, &form.password) {
        return Html(templates::register_page(Some(&e.to_string()))).into_response();
    }
    if users.has_user(&form.username).await {
        return Html(templates::register_page(Some("Username already exists"))).into_response();
    }
    if users.has_email(&form.email).await.is_ok() {
        return Html(templates::register_page(Some("E-mail already registered"))).into_response();
    }

    let result = async {
        let code = users.generate_unique_confirmation_code().await?;
        users
            .add_user(&form.username, &form.password, &form.email)
            .await?;
        users.add_unconfirmed(&form.username, &code).await?;
        Ok::<_, tollgate::Error>(code)
    }
    .await;

    match result {
        Ok(code) => {
            tracing::info!("Registered user {}", form.username);
            Html(templates::registered_page(&form.username, &code)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// Handler for GET /confirm/{code}
async fn handle_confirm(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    let username = match state.users.find_user_by_confirmation_code(&code).await {
        Ok(username) => username,
        Err(e) if e.is_not_found() => {
            return (StatusCode::NOT_FOUND, "Unknown confirmation code").into_response();
        }
        Err(e) => return internal_error(e),
    };
    match state.users.confirm(&username).await {
        Ok(()) => Html(templates::confirmed_page(&username)).into_response(),
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Protected Handlers
// ============================================================================

/// Handler for GET /data
async fn handle_data(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let username = state.users.username(&headers);
    match state.users.email(&username).await {
        Ok(email) => {
            let confirmed = state.users.is_confirmed(&username).await;
            Html(templates::data_page(&username, &email, confirmed)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// Handler for GET /admin
async fn handle_admin(State(state): State<AppState>) -> Response {
    let usernames = match state.users.all_usernames().await {
        Ok(usernames) => usernames,
        Err(e) => return internal_error(e),
    };
    let mut rows = Vec::with_capacity(usernames.len());
    for username in usernames {
        rows.push(user_row(&state.users, username).await);
    }
    Html(templates::admin_page(&rows)).into_response()
}

/// Handler for POST /admin/promote
async fn handle_promote(
    State(state): State<AppState>,
    Form(form): Form<PromoteForm>,
) -> Response {
    if !state.users.has_user(&form.username).await {
        return (StatusCode::NOT_FOUND, "Unknown user").into_response();
    }
    match state.users.set_admin_status(&form.username).await {
        Ok(()) => {
            tracing::info!("Promoted {} to admin", form.username);
            Redirect::to("/admin").into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Health Handler
// ============================================================================

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
    uptime_secs: u64,
}

/// Handler for GET /health
async fn handle_health(State(state): State<AppState>) -> Response {
    let status = match state.users.host().ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Backend ping failed: {e}");
            "unhealthy"
        }
    };
    let code = if status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = HealthResponse {
        status,
        backend: state.backend_kind,
        uptime_secs: state.started.elapsed().as_secs(),
    };
    (code, axum::Json(body)).into_response()
}
