use std::any::Any;
use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::error::{error_response, INTERNAL_MESSAGE};
use crate::state::AppState;
use crate::{auth, experiences};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .merge(auth::router())
        .merge(experiences::router())
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = config
        .frontend_url
        .as_deref()
        .and_then(|url| HeaderValue::from_str(url.trim_end_matches('/')).ok());
    match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    }
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{body::Body, extract::FromRef, http::Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::google::{IdentityVerifier, VerifiedIdentity};
    use crate::auth::jwt::JwtKeys;
    use crate::ids::RecordId;
    use crate::memory::MemoryStore;

    /// Accepts `good-<name>` tokens as `<name>@x.com`.
    struct FakeVerifier;

    #[async_trait]
    impl IdentityVerifier for FakeVerifier {
        async fn verify(&self, id_token: &str) -> anyhow::Result<VerifiedIdentity> {
            let name = id_token
                .strip_prefix("good-")
                .ok_or_else(|| anyhow::anyhow!("signature mismatch"))?;
            Ok(VerifiedIdentity {
                subject: format!("sub-{name}"),
                email: format!("{name}@x.com"),
                name: name.to_string(),
            })
        }
    }

    fn app() -> Router {
        let state = AppState::from_store(
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryStore::new()),
            Some(Arc::new(FakeVerifier)),
        );
        build_app(state)
    }

    fn request(method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn google_login(app: &Router, name: &str) -> (String, Value) {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/auth/google",
                Some(json!({ "idToken": format!("good-{name}") })),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (body["token"].as_str().unwrap().to_string(), body["user"].clone())
    }

    fn acme() -> Value {
        json!({ "company": "Acme", "role": "SDE", "year": 2025 })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(&app(), request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn unknown_route_is_uniform_404() {
        let (status, body) = send(&app(), request("GET", "/nope", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn login_then_create_then_list() {
        let app = app();
        let (token, user) = google_login(&app, "a").await;
        assert_eq!(user["email"], "a@x.com");
        assert!(user.get("passwordHash").is_none());

        let (status, created) =
            send(&app, request("POST", "/experiences", Some(acme()), Some(&token))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["authorId"], user["id"]);
        assert_eq!(created["verdict"], "awaiting");
        assert!(created["createdAt"].is_string());

        let (status, page) = send(
            &app,
            request("GET", "/experiences?sort=recent&page=1&limit=10", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);
        assert_eq!(page["totalPages"], 1);
        assert_eq!(page["page"], 1);
        assert_eq!(page["pageSize"], 10);
        assert_eq!(page["items"][0]["id"], created["id"]);
        assert_eq!(page["items"][0]["author"]["email"], "a@x.com");
        assert!(page["items"][0]["author"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn created_record_sets_location_and_ignores_client_author() {
        let app = app();
        let (token, user) = google_login(&app, "a").await;
        let mut body = acme();
        body["authorId"] = json!("ffffffffffffffffffffffff");

        let res = app
            .clone()
            .oneshot(request("POST", "/experiences", Some(body), Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let location = res.headers()[header::LOCATION].to_str().unwrap().to_string();
        let bytes = axum::body::to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
        let created: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(created["authorId"], user["id"]);
        assert_eq!(location, format!("/experiences/{}", created["id"].as_str().unwrap()));

        let (status, fetched) = send(&app, request("GET", &location, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["company"], "Acme");
        assert_eq!(fetched["author"]["id"], user["id"]);
    }

    #[tokio::test]
    async fn unauthenticated_create_is_401_whatever_the_body() {
        let app = app();
        for body in [acme(), json!({ "year": "nope" }), json!([])] {
            let req = request("POST", "/experiences", Some(body.clone()), None);
            let (status, res) = send(&app, req).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(res["error"].is_string());

            let (status, _) =
                send(&app, request("POST", "/experiences", Some(body), Some("garbage"))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn token_for_unknown_user_cannot_create() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign(&RecordId::generate()).unwrap();
        let app = build_app(state);

        let (status, res) =
            send(&app, request("POST", "/experiences", Some(acme()), Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(res, json!({ "error": "User not found" }));

        let (_, page) = send(&app, request("GET", "/experiences", None, None)).await;
        assert_eq!(page["total"], 0);
    }

    #[tokio::test]
    async fn out_of_range_year_names_the_constraint() {
        let app = app();
        let (token, _) = google_login(&app, "a").await;
        let mut body = acme();
        body["year"] = json!(1899);
        let (status, res) =
            send(&app, request("POST", "/experiences", Some(body), Some(&token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["error"], "year must be greater than or equal to 1900");
    }

    #[tokio::test]
    async fn malformed_json_body_is_400() {
        let app = app();
        let (token, _) = google_login(&app, "a").await;
        let req = Request::builder()
            .method("POST")
            .uri("/experiences")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, res) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["error"], "request body must be valid JSON");
    }

    #[tokio::test]
    async fn get_by_id_distinguishes_malformed_from_missing() {
        let app = app();
        let (status, res) = send(&app, request("GET", "/experiences/123", None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["error"], "id must be exactly 24 characters");

        let (status, _) =
            send(&app, request("GET", "/experiences/zzzzzzzzzzzzzzzzzzzzzzzz", None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, res) =
            send(&app, request("GET", "/experiences/65a1b2c3d4e5f60718293a4b", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(res, json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn list_rejects_unknown_sort_and_clamps_paging() {
        let app = app();
        let (status, res) =
            send(&app, request("GET", "/experiences?sort=popular", None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["error"], "sort must be one of: recent, oldest, company");

        let (status, page) =
            send(&app, request("GET", "/experiences?page=0&limit=999", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["page"], 1);
        assert_eq!(page["pageSize"], 50);
        assert_eq!(page["total"], 0);
        assert_eq!(page["totalPages"], 1);
    }

    #[tokio::test]
    async fn list_filters_and_sorts_by_company() {
        let app = app();
        let (token, _) = google_login(&app, "a").await;
        let rows = [("Beta", "SDE"), ("Acme", "SDE"), ("Beta", "PM"), ("Beta", "SDE")];
        for (company, role) in rows {
            let body = json!({ "company": company, "role": role, "year": 2024 });
            let (status, _) =
                send(&app, request("POST", "/experiences", Some(body), Some(&token))).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, page) =
            send(&app, request("GET", "/experiences?sort=company&role=SDE", None, None)).await;
        assert_eq!(page["total"], 3);
        let companies: Vec<_> = page["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["company"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(companies, ["Acme", "Beta", "Beta"]);

        let uri = "/experiences?company=Beta&limit=1&page=2";
        let (_, page) = send(&app, request("GET", uri, None, None)).await;
        assert_eq!(page["total"], 3);
        assert_eq!(page["totalPages"], 3);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn google_login_failures() {
        let app = app();
        let (status, res) = send(
            &app,
            request("POST", "/auth/google", Some(json!({ "idToken": "forged" })), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(res["error"], "Google sign-in failed");

        let (status, res) =
            send(&app, request("POST", "/auth/google", Some(json!({})), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["error"], "idToken is required");
    }

    #[tokio::test]
    async fn google_login_without_client_id_is_503() {
        let app = build_app(AppState::fake());
        let (status, res) = send(
            &app,
            request("POST", "/auth/google", Some(json!({ "idToken": "good-a" })), None),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res["error"], "Google sign-in temporarily unavailable");
    }

    #[tokio::test]
    async fn repeated_google_login_resolves_same_user() {
        let app = app();
        let (_, first) = google_login(&app, "a").await;
        let (_, second) = google_login(&app, "a").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn local_register_login_and_me() {
        let app = app();
        let creds = json!({ "name": "Ada", "email": "Ada@X.com", "password": "long-enough-pw" });
        let (status, reg) =
            send(&app, request("POST", "/auth/register", Some(creds.clone()), None)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reg["user"]["email"], "ada@x.com");

        let (status, _) = send(&app, request("POST", "/auth/register", Some(creds), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, res) = send(
            &app,
            request(
                "POST",
                "/auth/register",
                Some(json!({ "name": "B", "email": "b@x.com", "password": "short" })),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["error"], "password must be at least 8 characters");

        let (status, login) = send(
            &app,
            request(
                "POST",
                "/auth/login",
                Some(json!({ "email": "ada@x.com", "password": "long-enough-pw" })),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, me) =
            send(&app, request("GET", "/auth/me", None, login["token"].as_str())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], reg["user"]["id"]);

        let (status, res) = send(
            &app,
            request(
                "POST",
                "/auth/login",
                Some(json!({ "email": "ada@x.com", "password": "wrong-password" })),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(res["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn google_login_links_existing_local_account() {
        let app = app();
        let creds = json!({ "name": "A", "email": "a@x.com", "password": "long-enough-pw" });
        let (_, reg) = send(&app, request("POST", "/auth/register", Some(creds), None)).await;
        let (_, user) = google_login(&app, "a").await;
        assert_eq!(user["id"], reg["user"]["id"]);
    }
}
