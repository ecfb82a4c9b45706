//! REST API router.
//!
//! Three route tables share one `ApiContext`:
//! - public: health, login, token refresh, logout, password reset
//! - authenticated: every dashboard resource
//! - admin: doctor accounts, counters, the admin's own credentials
//!
//! Middleware stack (outermost → innermost):
//! Extension(ApiContext) → Auth → Role gate (admin only) → Audit → Handler

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints::{
    admin, appointments, auth, consultations, dialysis, health, patients, protocols, reports,
    tasks,
};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

pub(crate) fn build_router(ctx: ApiContext) -> Router {
    let public = Router::new()
        .route("/health", get(health::check))
        .route("/login", post(auth::login))
        .route("/refresh-token", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/reset-password", post(auth::reset_password))
        .route("/reset-password/:email", get(auth::reset_lookup))
        .route("/send-temp-password", post(auth::send_temp_password))
        .with_state(ctx.clone());

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let authenticated = Router::new()
        .route("/user", get(auth::current_user))
        .route("/patients", get(patients::list).post(patients::create))
        .route(
            "/patients/:id",
            get(patients::show)
                .put(patients::update)
                .delete(patients::delete),
        )
        .route(
            "/patients/:id/administrative",
            put(patients::update_administrative),
        )
        .route("/patients/:id/medical", put(patients::update_medical))
        .route("/patients/:id/consultations", get(patients::consultations))
        .route(
            "/patients/:id/consultations/export",
            get(patients::export_consultations),
        )
        .route(
            "/patients/:id/dialysis-steps",
            get(dialysis::list_for_patient).post(dialysis::create),
        )
        .route(
            "/patients/:id/protocols",
            get(protocols::list_for_patient).post(protocols::assign),
        )
        .route(
            "/appointments",
            get(appointments::list).post(appointments::create),
        )
        .route(
            "/appointments/:id",
            get(appointments::show)
                .put(appointments::update)
                .delete(appointments::delete),
        )
        .route("/appointments/:id/tasks", post(appointments::attach_task))
        .route("/appointment-tasks", get(tasks::list).post(tasks::create))
        .route(
            "/consultations",
            get(consultations::list).post(consultations::create),
        )
        .route(
            "/consultations/:id",
            get(consultations::show)
                .put(consultations::update)
                .delete(consultations::delete),
        )
        .route(
            "/consultations/from-appointment/:id",
            post(consultations::from_appointment),
        )
        .route(
            "/dialysis-steps/:id",
            get(dialysis::show)
                .put(dialysis::update)
                .delete(dialysis::delete),
        )
        .route("/protocols", get(protocols::list).post(protocols::create))
        .route(
            "/protocols/:id",
            get(protocols::show)
                .put(protocols::update)
                .delete(protocols::delete),
        )
        .route("/generate-report", post(reports::generate))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth));

    let admin = Router::new()
        .route("/doctors", get(admin::list_doctors).post(admin::create_doctor))
        .route("/stat", get(admin::stats))
        .route("/user", put(admin::update_account))
        .route("/user/password", put(admin::update_password))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_admin))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth));

    let router = Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin)
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));

    match cors_layer(&ctx.core.config.cors_origin) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the dashboard origin. Credentials are allowed so the browser
/// sends the refresh cookie.
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_DISPOSITION, COOKIE, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::crypto::hash_password;
    use crate::db;
    use crate::mailer::{MailError, Mailer, MemoryMailer, OutgoingMail};
    use crate::models::enums::Role;
    use crate::models::NewUser;

    const ITERATIONS: u32 = 1_000;
    const ADMIN_EMAIL: &str = "admin@renalcare.test";
    const DOCTOR_EMAIL: &str = "doctor@renalcare.test";
    const PASSWORD: &str = "S3cure!pass";

    /// App over a temp database with one admin and one doctor.
    /// The tempdir guard must be kept alive for the duration of the test.
    struct TestApp {
        core: Arc<CoreState>,
        mailer: Arc<MemoryMailer>,
        doctor_id: i64,
        _dir: tempfile::TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let outbox = Arc::new(MemoryMailer::new());
            Self::with_delivery(outbox.clone(), outbox)
        }

        /// `delivery` receives outgoing mail; `outbox` is what tests inspect.
        fn with_delivery(delivery: Arc<dyn Mailer>, outbox: Arc<MemoryMailer>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = ServerConfig {
                database_path: dir.path().join("renalcare.db"),
                pbkdf2_iterations: ITERATIONS,
                ..ServerConfig::default()
            };
            let core = Arc::new(CoreState::new(config, delivery));
            core.initialize().unwrap();

            let conn = core.open_db().unwrap();
            for (email, role) in [(ADMIN_EMAIL, Role::Admin), (DOCTOR_EMAIL, Role::User)] {
                db::insert_user(
                    &conn,
                    &NewUser {
                        first_name: "Koffi".into(),
                        last_name: "Mensah".into(),
                        email: email.into(),
                        contact: None,
                        role,
                        password_hash: hash_password(PASSWORD, ITERATIONS).unwrap(),
                    },
                )
                .unwrap();
            }
            let doctor_id = db::find_credentials_by_email(&conn, DOCTOR_EMAIL)
                .unwrap()
                .unwrap()
                .user
                .id;

            Self {
                core,
                mailer: outbox,
                doctor_id,
                _dir: dir,
            }
        }

        async fn send(&self, req: Request<Body>) -> Response {
            api_router(self.core.clone()).oneshot(req).await.unwrap()
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let response = self.send(make_request(method, uri, token, body)).await;
            let status = response.status();
            (status, body_json(response).await)
        }

        async fn login(&self, email: &str, password: &str) -> Response {
            self.send(make_request(
                "POST",
                "/login",
                None,
                Some(json!({"email": email, "password": password})),
            ))
            .await
        }

        async fn token_for(&self, email: &str) -> String {
            let response = self.login(email, PASSWORD).await;
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await["accessToken"]
                .as_str()
                .unwrap()
                .to_string()
        }

        async fn create_patient(&self, token: &str, first_name: &str, address: &str) -> i64 {
            let (status, body) = self
                .call(
                    "POST",
                    "/patients",
                    Some(token),
                    Some(json!({
                        "first_name": first_name,
                        "last_name": "Kone",
                        "date_of_birth": "1980-06-15",
                        "phone": "+229 97 00 00 00",
                        "address": address,
                        "sex": "F",
                        "registration_date": "2025-01-10",
                        "referring_doctor": "Dr Adjovi",
                        "mrc_stage": 3
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["patient"]["id"].as_i64().unwrap()
        }
    }

    fn make_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = body_bytes(response).await;
        if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        }
    }

    fn refresh_cookie(response: &Response) -> String {
        let header = response.headers()[SET_COOKIE].to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    // ── Auth ──────────────────────────────────────────────────

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn login_returns_token_role_and_cookie() {
        let app = TestApp::new();
        let response = app.login(ADMIN_EMAIL, PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("refresh_token="));
        assert!(cookie.contains("HttpOnly"));

        let body = body_json(response).await;
        assert_eq!(body["role"], "admin");
        assert_eq!(body["homePath"], "/admin");
        assert!(!body["accessToken"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_403_without_token() {
        let app = TestApp::new();
        let response = app.login(DOCTOR_EMAIL, "Wrong!pass1").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
        assert!(body.get("accessToken").is_none());
    }

    #[tokio::test]
    async fn login_without_fields_lists_them() {
        let app = TestApp::new();
        let (status, body) = app.call("POST", "/login", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["email"].is_array());
        assert!(body["error"]["fields"]["password"].is_array());
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = TestApp::new();
        let req = Request::builder()
            .method("POST")
            .uri("/login")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.send(req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn protected_route_without_token_is_401() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/patients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

        let (status, _) = app.call("GET", "/patients", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_responses_are_not_cached() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let response = app.send(make_request("GET", "/user", Some(token.as_str()), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["Cache-Control"], "no-store");
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        let body = body_json(response).await;
        assert_eq!(body["email"], DOCTOR_EMAIL);
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let app = TestApp::new();
        let token = crate::crypto::generate_token();
        {
            let conn = app.core.open_db().unwrap();
            let past = db::timestamp() - chrono::Duration::minutes(5);
            db::insert_token(
                &conn,
                app.doctor_id,
                &crate::crypto::hash_token(&token),
                crate::models::enums::TokenKind::Access,
                past,
            )
            .unwrap();
        }
        let (status, body) = app.call("GET", "/user", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn refresh_cookie_issues_new_access_token() {
        let app = TestApp::new();
        let login = app.login(DOCTOR_EMAIL, PASSWORD).await;
        let cookie = refresh_cookie(&login);

        let req = Request::builder()
            .method("POST")
            .uri("/refresh-token")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.send(req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["role"], "user");
        let token = body["accessToken"].as_str().unwrap();

        let (status, _) = app.call("GET", "/patients", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_403() {
        let app = TestApp::new();
        let (status, body) = app.call("POST", "/refresh-token", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn logout_revokes_access_and_refresh() {
        let app = TestApp::new();
        let login = app.login(DOCTOR_EMAIL, PASSWORD).await;
        let cookie = refresh_cookie(&login);
        let token = body_json(login).await["accessToken"]
            .as_str()
            .unwrap()
            .to_string();

        let req = Request::builder()
            .method("POST")
            .uri("/logout")
            .header("Authorization", format!("Bearer {token}"))
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.send(req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));

        let (status, _) = app.call("GET", "/user", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let req = Request::builder()
            .method("POST")
            .uri("/refresh-token")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(req).await.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn password_reset_flow() {
        let app = TestApp::new();
        let (status, body) = app
            .call("GET", "/reset-password/doctor@renalcare.test", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], DOCTOR_EMAIL);
        let (status, _) = app
            .call("GET", "/reset-password/nobody@renalcare.test", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .call("POST", "/send-temp-password", None, Some(json!({"email": DOCTOR_EMAIL})))
            .await;
        assert_eq!(status, StatusCode::OK);
        let mail = app.mailer.last_to(DOCTOR_EMAIL).unwrap();
        let temporary = mail
            .body
            .lines()
            .find_map(|l| l.strip_prefix("Temporary password: "))
            .unwrap()
            .to_string();

        let (status, _) = app
            .call(
                "POST",
                "/reset-password",
                None,
                Some(json!({
                    "email": DOCTOR_EMAIL,
                    "temporary_password": "wrong-one",
                    "password": "N3w!password",
                    "password_confirmation": "N3w!password"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .call(
                "POST",
                "/reset-password",
                None,
                Some(json!({
                    "email": DOCTOR_EMAIL,
                    "temporary_password": temporary,
                    "password": "N3w!password",
                    "password_confirmation": "N3w!password"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.login(DOCTOR_EMAIL, "N3w!password").await.status(), StatusCode::OK);
        assert_eq!(app.login(DOCTOR_EMAIL, PASSWORD).await.status(), StatusCode::FORBIDDEN);
    }

    // ── Role dispatch ─────────────────────────────────────────

    #[tokio::test]
    async fn doctor_cannot_reach_admin_table() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        for (method, uri) in [("GET", "/doctors"), ("GET", "/stat")] {
            let (status, body) = app.call(method, uri, Some(token.as_str()), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(body["error"]["code"], "FORBIDDEN");
        }
        let (status, _) = app
            .call("PUT", "/user", Some(token.as_str()), Some(json!({"email": "x@y.z", "password": PASSWORD})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.call("GET", "/doctors", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_creates_doctor_and_mails_password() {
        let app = TestApp::new();
        let token = app.token_for(ADMIN_EMAIL).await;
        let doctor = json!({
            "first_name": "Afi",
            "last_name": "Dossou",
            "email": "afi@renalcare.test",
            "contact": "+229 96 11 22 33"
        });

        let (status, body) = app.call("POST", "/doctors", Some(token.as_str()), Some(doctor.clone())).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["doctor"]["role"], "user");
        let mail = app.mailer.last_to("afi@renalcare.test").unwrap();
        let temporary = mail
            .body
            .lines()
            .find_map(|l| l.strip_prefix("Temporary password: "))
            .unwrap()
            .to_string();
        assert_eq!(temporary.len(), 10);
        assert_eq!(app.login("afi@renalcare.test", &temporary).await.status(), StatusCode::OK);

        let (status, _) = app.call("POST", "/doctors", Some(token.as_str()), Some(doctor)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app.call("GET", "/doctors?search=DOSSOU", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stats_count_doctors_and_patients() {
        let app = TestApp::new();
        let admin = app.token_for(ADMIN_EMAIL).await;
        app.create_patient(&admin, "Awa", "Cotonou").await;
        let (status, body) = app.call("GET", "/stat", Some(admin.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["doctors"], 1);
        assert_eq!(body["patients"], 1);
        assert_eq!(body["appointments"], 0);
    }

    #[tokio::test]
    async fn admin_updates_own_email_and_password() {
        let app = TestApp::new();
        let token = app.token_for(ADMIN_EMAIL).await;

        let (status, body) = app
            .call("PUT", "/user", Some(token.as_str()), Some(json!({"email": DOCTOR_EMAIL, "password": PASSWORD})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["email"].is_array());

        let (status, body) = app
            .call("PUT", "/user", Some(token.as_str()), Some(json!({"email": "chief@renalcare.test", "password": "nope"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["password"].is_array());

        let (status, body) = app
            .call("PUT", "/user", Some(token.as_str()), Some(json!({"email": "chief@renalcare.test", "password": PASSWORD})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "chief@renalcare.test");

        let (status, body) = app
            .call(
                "PUT",
                "/user/password",
                Some(token.as_str()),
                Some(json!({
                    "current_password": PASSWORD,
                    "password": PASSWORD,
                    "password_confirmation": PASSWORD
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["password"].is_array());

        let (status, body) = app
            .call(
                "PUT",
                "/user/password",
                Some(token.as_str()),
                Some(json!({
                    "current_password": PASSWORD,
                    "password": "weakpass",
                    "password_confirmation": "weakpass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["password"].as_array().unwrap().len() >= 2);

        let (status, _) = app
            .call(
                "PUT",
                "/user/password",
                Some(token.as_str()),
                Some(json!({
                    "current_password": PASSWORD,
                    "password": "Br4nd!newpass",
                    "password_confirmation": "Br4nd!newpass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            app.login("chief@renalcare.test", "Br4nd!newpass").await.status(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn passwords_keep_surrounding_whitespace() {
        let app = TestApp::new();
        let token = app.token_for(ADMIN_EMAIL).await;
        let spaced = "N3w!pass ";

        let (status, body) = app
            .call(
                "PUT",
                "/user/password",
                Some(token.as_str()),
                Some(json!({
                    "current_password": PASSWORD,
                    "password": spaced,
                    "password_confirmation": spaced
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(app.login(ADMIN_EMAIL, spaced).await.status(), StatusCode::OK);

        let (status, body) = app
            .call(
                "PUT",
                "/user/password",
                Some(token.as_str()),
                Some(json!({
                    "current_password": "N3w!pass",
                    "password": "Th1rd!pass",
                    "password_confirmation": "Th1rd!pass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["current_password"].is_array());

        let (status, body) = app
            .call(
                "PUT",
                "/user",
                Some(token.as_str()),
                Some(json!({"email": "chief@renalcare.test", "password": spaced})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (status, body) = app
            .call(
                "PUT",
                "/user/password",
                Some(token.as_str()),
                Some(json!({
                    "current_password": spaced,
                    "password": "Th1rd!pass",
                    "password_confirmation": "Th1rd!pass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    #[tokio::test]
    async fn padded_temporary_password_is_rejected() {
        let app = TestApp::new();
        let (status, _) = app
            .call("POST", "/send-temp-password", None, Some(json!({"email": DOCTOR_EMAIL})))
            .await;
        assert_eq!(status, StatusCode::OK);
        let mail = app.mailer.last_to(DOCTOR_EMAIL).unwrap();
        let temporary = mail
            .body
            .lines()
            .find_map(|l| l.strip_prefix("Temporary password: "))
            .unwrap()
            .to_string();

        let (status, _) = app
            .call(
                "POST",
                "/reset-password",
                None,
                Some(json!({
                    "email": DOCTOR_EMAIL,
                    "temporary_password": format!(" {temporary} "),
                    "password": "N3w!password",
                    "password_confirmation": "N3w!password"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(app.login(DOCTOR_EMAIL, PASSWORD).await.status(), StatusCode::OK);
    }

    struct UnreachableMailer;

    impl Mailer for UnreachableMailer {
        fn send(&self, _mail: &OutgoingMail) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn doctor_is_not_created_when_mail_fails() {
        let app = TestApp::with_delivery(Arc::new(UnreachableMailer), Arc::new(MemoryMailer::new()));
        let token = app.token_for(ADMIN_EMAIL).await;

        let (status, body) = app
            .call(
                "POST",
                "/doctors",
                Some(token.as_str()),
                Some(json!({
                    "first_name": "Afi",
                    "last_name": "Dossou",
                    "email": "afi@renalcare.test"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");

        let conn = app.core.open_db().unwrap();
        assert!(!db::email_taken(&conn, "afi@renalcare.test", None).unwrap());
        let (_, body) = app.call("GET", "/doctors", Some(token.as_str()), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    // ── Patients ──────────────────────────────────────────────

    #[tokio::test]
    async fn create_patient_reports_missing_fields() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let (status, body) = app
            .call("POST", "/patients", Some(token.as_str()), Some(json!({"first_name": "Awa"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        let fields = body["error"]["fields"].as_object().unwrap();
        assert!(fields.contains_key("last_name"));
        assert!(fields.contains_key("referring_doctor"));
        assert!(!fields.contains_key("first_name"));
    }

    #[tokio::test]
    async fn create_patient_echoes_sub_records() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let id = app.create_patient(&token, "Awa", "Cotonou").await;

        let (status, body) = app.call("GET", &format!("/patients/{id}"), Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["first_name"], "Awa");
        assert_eq!(body["medical_data"]["mrc_stage"], 3);
        assert_eq!(body["administrative_data"]["referring_doctor"], "Dr Adjovi");
        assert!(body["age"].as_u64().unwrap() >= 44);
    }

    #[tokio::test]
    async fn duplicate_record_number_is_conflict() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let first = app.create_patient(&token, "Awa", "Cotonou").await;
        let second = app.create_patient(&token, "Ali", "Parakou").await;

        let (_, body) = app.call("GET", &format!("/patients/{first}"), Some(token.as_str()), None).await;
        let record_number = body["administrative_data"]["record_number"].as_str().unwrap().to_string();

        let (status, _) = app
            .call(
                "PUT",
                &format!("/patients/{second}/administrative"),
                Some(token.as_str()),
                Some(json!({"record_number": record_number})),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn mrc_stage_below_one_is_rejected() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let id = app.create_patient(&token, "Awa", "Cotonou").await;
        let (status, body) = app
            .call("PUT", &format!("/patients/{id}/medical"), Some(token.as_str()), Some(json!({"mrc_stage": 0})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["mrc_stage"].is_array());

        let (status, body) = app
            .call("PUT", &format!("/patients/{id}"), Some(token.as_str()), Some(json!({"mrc_stage": 4, "phone": "0102"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patient"]["medical_data"]["mrc_stage"], 4);
        assert_eq!(body["patient"]["phone"], "0102");
    }

    #[tokio::test]
    async fn patient_search_and_pagination() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        app.create_patient(&token, "Awa", "Cotonou").await;
        app.create_patient(&token, "Ali", "Parakou").await;
        app.create_patient(&token, "Bio", "Cotonou Akpakpa").await;

        let (_, body) = app.call("GET", "/patients?search=cotonou", Some(token.as_str()), None).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["first_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Awa", "Bio"]);

        let (status, body) = app
            .call("GET", "/patients?page=2&per_page=2", Some(token.as_str()), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["total_pages"], 2);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, body) = app.call("GET", "/patients?per_page=7", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["per_page"].is_array());
    }

    #[tokio::test]
    async fn deleting_patient_cascades() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let id = app.create_patient(&token, "Awa", "Cotonou").await;
        let (status, _) = app
            .call(
                "POST",
                &format!("/patients/{id}/dialysis-steps"),
                Some(token.as_str()),
                Some(json!({
                    "type": "hemodialysis",
                    "start_time": "2025-03-01 08:00:00",
                    "duration_minutes": 240,
                    "parameters": {"uf_volume": 2}
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = app
            .call(
                "POST",
                "/consultations",
                Some(token.as_str()),
                Some(json!({
                    "patient_id": id,
                    "doctor_id": app.doctor_id,
                    "consultation_date": "2025-03-02 10:00",
                    "doctor_remarks": "Stable",
                    "cost": 15000
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let consultation_id = body["consultation"]["id"].as_i64().unwrap();

        let (status, _) = app.call("DELETE", &format!("/patients/{id}"), Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.call("GET", &format!("/patients/{id}"), Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Patient not found");
        let (status, _) = app
            .call("GET", &format!("/consultations/{consultation_id}"), Some(token.as_str()), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.call("DELETE", &format!("/patients/{id}"), Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_id_is_bad_request() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let (status, body) = app.call("GET", "/patients/abc", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    // ── Appointments & consultations ──────────────────────────

    #[tokio::test]
    async fn appointment_with_tasks_then_consultation_from_it() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let patient = app.create_patient(&token, "Awa", "Cotonou").await;

        let (status, body) = app
            .call(
                "POST",
                "/appointment-tasks",
                Some(token.as_str()),
                Some(json!({"type": "Blood test", "description": "Creatinine"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let task = body["task"]["id"].as_i64().unwrap();

        let (status, body) = app
            .call(
                "POST",
                "/appointments",
                Some(token.as_str()),
                Some(json!({
                    "patient_id": patient,
                    "doctor_id": app.doctor_id,
                    "date": "2025-04-01 09:00",
                    "notes": "Quarterly check",
                    "tasks": [task]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let appointment = body["appointment"]["id"].as_i64().unwrap();
        assert_eq!(body["appointment"]["status"], "scheduled");
        assert_eq!(body["appointment"]["tasks"][0]["user_id"], app.doctor_id);
        assert_eq!(body["appointment"]["patient"]["first_name"], "Awa");

        let (status, body) = app
            .call(
                "POST",
                &format!("/consultations/from-appointment/{appointment}"),
                Some(token.as_str()),
                Some(json!({"doctor_remarks": "Creatinine stable", "cost": "12000"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["consultation"]["status"], "completed");
        assert_eq!(body["consultation"]["patient_id"], patient);
        assert_eq!(body["consultation"]["doctor_id"], app.doctor_id);
        assert_eq!(body["consultation"]["appointment_id"], appointment);

        let (_, body) = app
            .call("GET", &format!("/appointments/{appointment}"), Some(token.as_str()), None)
            .await;
        assert_eq!(body["status"], "completed");

        let (status, _) = app
            .call(
                "POST",
                "/consultations/from-appointment/9999",
                Some(token.as_str()),
                Some(json!({"doctor_remarks": "x", "cost": 1})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn appointment_rejects_unknown_references() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let (status, body) = app
            .call(
                "POST",
                "/appointments",
                Some(token.as_str()),
                Some(json!({"patient_id": 404, "doctor_id": 405, "date": "2025-04-01", "tasks": [77]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields = body["error"]["fields"].as_object().unwrap();
        for field in ["patient_id", "doctor_id", "tasks"] {
            assert!(fields.contains_key(field), "missing {field}");
        }
    }

    #[tokio::test]
    async fn appointment_update_and_task_attach() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let patient = app.create_patient(&token, "Awa", "Cotonou").await;
        let (_, body) = app
            .call("POST", "/appointment-tasks", Some(token.as_str()), Some(json!({"type": "Ultrasound"})))
            .await;
        let task = body["task"]["id"].as_i64().unwrap();
        let (_, body) = app
            .call(
                "POST",
                "/appointments",
                Some(token.as_str()),
                Some(json!({"patient_id": patient, "doctor_id": app.doctor_id, "date": "2025-04-01 09:00"})),
            )
            .await;
        let appointment = body["appointment"]["id"].as_i64().unwrap();

        let (status, body) = app
            .call(
                "PUT",
                &format!("/appointments/{appointment}"),
                Some(token.as_str()),
                Some(json!({"status": "archived"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["status"].is_array());

        let (status, body) = app
            .call(
                "PUT",
                &format!("/appointments/{appointment}"),
                Some(token.as_str()),
                Some(json!({"status": "canceled", "notes": null})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["appointment"]["status"], "canceled");

        for _ in 0..2 {
            let (status, body) = app
                .call(
                    "POST",
                    &format!("/appointments/{appointment}/tasks"),
                    Some(token.as_str()),
                    Some(json!({"task_id": task, "user_id": app.doctor_id})),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["appointment"]["tasks"].as_array().unwrap().len(), 1);
        }

        let (status, _) = app
            .call("DELETE", &format!("/appointments/{appointment}"), Some(token.as_str()), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app
            .call("GET", &format!("/appointments/{appointment}"), Some(token.as_str()), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Appointment not found");
    }

    #[tokio::test]
    async fn consultation_validation_and_update() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let patient = app.create_patient(&token, "Awa", "Cotonou").await;

        let (status, body) = app
            .call(
                "POST",
                "/consultations",
                Some(token.as_str()),
                Some(json!({"patient_id": patient, "doctor_id": app.doctor_id, "cost": -1})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields = body["error"]["fields"].as_object().unwrap();
        assert!(fields.contains_key("cost"));
        assert!(fields.contains_key("consultation_date"));
        assert!(fields.contains_key("doctor_remarks"));

        let (_, body) = app
            .call(
                "POST",
                "/consultations",
                Some(token.as_str()),
                Some(json!({
                    "patient_id": patient,
                    "doctor_id": app.doctor_id,
                    "consultation_date": "2025-03-02 10:00",
                    "doctor_remarks": "Stable",
                    "cost": 15000
                })),
            )
            .await;
        assert_eq!(body["consultation"]["status"], "pending");
        let id = body["consultation"]["id"].as_i64().unwrap();

        let (status, body) = app
            .call("PUT", &format!("/consultations/{id}"), Some(token.as_str()), Some(json!({"status": "billed"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["consultation"]["status"], "billed");
        assert_eq!(body["consultation"]["doctor_remarks"], "Stable");
        assert_eq!(body["consultation"]["doctor"]["email"], DOCTOR_EMAIL);

        let (status, _) = app.call("DELETE", &format!("/consultations/{id}"), Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call("PUT", &format!("/consultations/{id}"), Some(token.as_str()), Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ── Dialysis & protocols ──────────────────────────────────

    #[tokio::test]
    async fn dialysis_step_lifecycle() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let patient = app.create_patient(&token, "Awa", "Cotonou").await;

        let (status, body) = app
            .call(
                "POST",
                &format!("/patients/{patient}/dialysis-steps"),
                Some(token.as_str()),
                Some(json!({
                    "type": "Dialyse péritonéale",
                    "start_time": "2025-03-01T08:00",
                    "duration_minutes": 60,
                    "parameters": {"weight_before": 70, "weight_after": 68}
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["dialysis_step"]["type"], "peritoneal_dialysis");
        let step = body["dialysis_step"]["id"].as_i64().unwrap();

        let (status, body) = app
            .call("PUT", &format!("/dialysis-steps/{step}"), Some(token.as_str()), Some(json!({"notes": "Tolerated well"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dialysis_step"]["notes"], "Tolerated well");
        assert_eq!(body["dialysis_step"]["parameters"]["weight_after"], 68);

        let (_, body) = app
            .call("GET", &format!("/patients/{patient}/dialysis-steps?search=tolerated"), Some(token.as_str()), None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = app.call("DELETE", &format!("/dialysis-steps/{step}"), Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call("GET", &format!("/dialysis-steps/{step}"), Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .call("GET", "/patients/9999/dialysis-steps", Some(token.as_str()), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn protocol_crud_and_assignment() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let patient = app.create_patient(&token, "Awa", "Cotonou").await;

        let (status, body) = app
            .call(
                "POST",
                "/protocols",
                Some(token.as_str()),
                Some(json!({"name": "Stage 3", "stage": 9, "recommendations": {}})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["stage"].is_array());

        let (status, body) = app
            .call(
                "POST",
                "/protocols",
                Some(token.as_str()),
                Some(json!({"name": "Stage 3", "stage": 3, "recommendations": {"diet": "low sodium"}})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let protocol = body["protocol"]["id"].as_i64().unwrap();

        for _ in 0..2 {
            let (status, body) = app
                .call(
                    "POST",
                    &format!("/patients/{patient}/protocols"),
                    Some(token.as_str()),
                    Some(json!({"protocol_id": protocol})),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["protocols"].as_array().unwrap().len(), 1);
            assert_eq!(body["protocols"][0]["assigned_by"], app.doctor_id);
        }

        let (status, body) = app
            .call("PUT", &format!("/protocols/{protocol}"), Some(token.as_str()), Some(json!({"name": "Stage 3 CKD"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["protocol"]["stage"], 3);

        let (status, _) = app.call("DELETE", &format!("/protocols/{protocol}"), Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app
            .call("GET", &format!("/patients/{patient}/protocols"), Some(token.as_str()), None)
            .await;
        assert!(body.as_array().unwrap().is_empty());
    }

    // ── Reports ───────────────────────────────────────────────

    async fn seed_consultations(app: &TestApp, token: &str) -> i64 {
        let patient = app.create_patient(token, "Awa", "Cotonou").await;
        for (date, remarks) in [
            ("2025-01-01 08:00", "New year, stable"),
            ("2025-01-31 23:30", "Late visit, \"edema\""),
            ("2025-02-01 09:00", "Out of range"),
        ] {
            let (status, _) = app
                .call(
                    "POST",
                    "/consultations",
                    Some(token),
                    Some(json!({
                        "patient_id": patient,
                        "doctor_id": app.doctor_id,
                        "consultation_date": date,
                        "doctor_remarks": remarks,
                        "cost": 10000
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }
        patient
    }

    #[tokio::test]
    async fn csv_report_covers_inclusive_range() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        seed_consultations(&app, &token).await;

        let response = app
            .send(make_request(
                "POST",
                "/generate-report",
                Some(token.as_str()),
                Some(json!({"start_date": "2025-01-01", "end_date": "2025-01-31", "type": "csv"})),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"report-2025-01-01-to-2025-01-31.csv\""
        );
        let csv = String::from_utf8(body_bytes(response).await).unwrap();
        let rows: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(rows.len(), 3, "header plus two rows: {csv}");
        assert!(csv.contains("\"Late visit, \"\"edema\"\"\""));
        assert!(!csv.contains("Out of range"));
    }

    #[tokio::test]
    async fn pdf_report_and_patient_export() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let patient = seed_consultations(&app, &token).await;

        let response = app
            .send(make_request(
                "POST",
                "/generate-report",
                Some(token.as_str()),
                Some(json!({
                    "start_date": "2025-01-01",
                    "end_date": "2025-12-31",
                    "patient_id": patient,
                    "type": "pdf"
                })),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert!(body_bytes(response).await.starts_with(b"%PDF"));

        let response = app
            .send(make_request(
                "GET",
                &format!("/patients/{patient}/consultations/export?search=2025-01"),
                Some(token.as_str()),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            format!("attachment; filename=\"patient-{patient}-consultations.pdf\"")
        );
        assert!(body_bytes(response).await.starts_with(b"%PDF"));

        let (status, body) = app
            .call("GET", &format!("/patients/{patient}/consultations"), Some(token.as_str()), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn report_rejects_inverted_range_and_bad_type() {
        let app = TestApp::new();
        let token = app.token_for(DOCTOR_EMAIL).await;
        let (status, body) = app
            .call(
                "POST",
                "/generate-report",
                Some(token.as_str()),
                Some(json!({"start_date": "2025-02-01", "end_date": "2025-01-01", "type": "xlsx"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields = body["error"]["fields"].as_object().unwrap();
        assert!(fields.contains_key("end_date"));
        assert!(fields.contains_key("type"));
    }

    // ── CORS ──────────────────────────────────────────────────

    #[tokio::test]
    async fn preflight_allows_dashboard_origin_with_credentials() {
        let app = TestApp::new();
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/login")
            .header("Origin", "http://localhost:5173")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.send(req).await;
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
        assert_eq!(response.headers()["access-control-allow-credentials"], "true");
    }

    #[test]
    fn invalid_origin_disables_cors() {
        assert!(cors_layer("bad\norigin").is_none());
        assert!(cors_layer("http://localhost:5173").is_some());
    }
}
