use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use tollgate::Permissions;
use tower::ServiceExt;

use crate::helpers::{login_headers, state_with_bob};

/// A router whose handlers count how often they run.
fn counted_app(permissions: Permissions, hits: Arc<AtomicUsize>) -> Router {
    let handler = move || {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            "ok"
        }
    };
    Router::new()
        .route("/", get(handler.clone()))
        .route("/data/{item}", get(handler.clone()))
        .route("/admin/panel", get(handler))
        .layer(from_fn_with_state(permissions, Permissions::guard))
}

async fn send(app: Router, path: &str, headers: HeaderMap) -> (StatusCode, HeaderMap, String) {
    let mut request = axum::http::Request::builder()
        .uri(path)
        .body(Body::empty())
        .unwrap();
    *request.headers_mut() = headers;
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_denied_request_skips_handler() {
    let permissions = Permissions::new(state_with_bob().await);
    let hits = Arc::new(AtomicUsize::new(0));

    let (status, headers, body) = send(
        counted_app(permissions, hits.clone()),
        "/data/1",
        HeaderMap::new(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Permission denied.");
    assert!(headers.get(SET_COOKIE).is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_allowed_request_reaches_handler() {
    let state = state_with_bob().await;
    let request = login_headers(&state, "bob").await;
    let permissions = Permissions::new(state);
    let hits = Arc::new(AtomicUsize::new(0));

    let (status, _, body) = send(counted_app(permissions.clone(), hits.clone()), "/data/1", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _, _) = send(counted_app(permissions, hits.clone()), "/", HeaderMap::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_deny_function_replaced_at_runtime() {
    let permissions = Permissions::new(state_with_bob().await);
    let app = counted_app(permissions.clone(), Arc::new(AtomicUsize::new(0)));

    permissions.set_deny_function(Arc::new(|request: &Request| {
        (StatusCode::SEE_OTHER, [("location", "/login")], request.uri().path().to_string())
            .into_response()
    }));

    let (status, headers, body) = send(app, "/admin/panel", HeaderMap::new()).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers.get("location").unwrap(), "/login");
    assert_eq!(body, "/admin/panel");

    let deny = permissions.deny_function();
    let request = axum::http::Request::builder()
        .uri("/x")
        .body(Body::empty())
        .unwrap();
    assert_eq!(deny(&request).status(), StatusCode::SEE_OTHER);
}
