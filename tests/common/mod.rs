#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use svca::config::Config;
use svca::services::{MailError, Mailer, OutgoingMail};
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "change-me-now";
pub const RESET_BASE_URL: &str = "http://svca.test/reset-password";

pub const REGISTERED: i32 = 5;
pub const IN_PROGRESS: i32 = 1;
pub const CLOSED_UNSOLVED: i32 = 2;
pub const CLOSED_SOLVED: i32 = 3;
pub const REJECTED: i32 = 4;

pub const MODERATOR_PROFILE: i32 = 2;

/// Collects outgoing mail instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, OutgoingMail)>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, OutgoingMail)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Build("relay unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), mail.clone()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
    db_path: PathBuf,
    upload_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub cookie: Option<String>,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(RecordingMailer::default()).await
    }

    pub async fn spawn_with(mailer: RecordingMailer) -> Self {
        let id = Uuid::new_v4();
        let db_path = std::env::temp_dir().join(format!("svca_test_{id}.db"));
        let upload_dir = std::env::temp_dir().join(format!("svca_uploads_{id}"));

        let mut config = Config::default();
        config.general.database_path = format!("sqlite:{}", db_path.display());
        config.server.secure_cookies = false;
        config.security.argon2_memory_cost_kib = 1024;
        config.security.argon2_time_cost = 1;
        config.uploads.path = upload_dir.to_string_lossy().to_string();
        config.mail.reset_base_url = RESET_BASE_URL.to_string();

        let mailer = Arc::new(mailer);
        let state = svca::api::create_app_state_with_mailer(config, mailer.clone(), None)
            .await
            .expect("Failed to create app state");
        let router = svca::api::router(state).await;

        Self {
            router,
            mailer,
            db_path,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            cookie,
            body,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> TestResponse {
        self.request("GET", uri, Some(cookie), None).await
    }

    /// Current account as seen by the holder of `cookie`.
    pub async fn me(&self, cookie: &str) -> Value {
        self.get("/api/users/me", cookie).await.body["data"].clone()
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        self.request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": name,
                "email": email,
                "password": password,
                "confirm_password": password,
            })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Logs in and returns the session cookie.
    pub async fn session(&self, email: &str, password: &str) -> String {
        let response = self.login(email, password).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.cookie.expect("login did not set a session cookie")
    }

    pub async fn admin_session(&self) -> String {
        self.session(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Registers a citizen account and returns `(user_id, session)`.
    pub async fn citizen(&self, name: &str, email: &str) -> (i64, String) {
        let response = self.register(name, email, "secret123").await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        let id = response.data()["id"].as_i64().unwrap();
        (id, self.session(email, "secret123").await)
    }

    /// Registers an account and promotes it to moderator.
    pub async fn moderator(&self, email: &str) -> String {
        let (id, _) = self.citizen("Moderadora", email).await;
        let admin = self.admin_session().await;

        let response = self
            .request(
                "PUT",
                &format!("/api/users/{id}"),
                Some(&admin),
                Some(json!({
                    "name": "Moderadora",
                    "email": email,
                    "profile_id": MODERATOR_PROFILE,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

        self.session(email, "secret123").await
    }

    pub async fn create_occurrence(&self, cookie: &str, title: &str) -> TestResponse {
        let form = MultipartForm::new()
            .text("title", title)
            .text("description", "Descrição do problema")
            .text("address", "Rua das Flores, 100")
            .text("latitude", "-23.5505")
            .text("longitude", "-46.6333");
        self.send(form.into_request("/api/occurrences", cookie)).await
    }

    pub async fn set_status(
        &self,
        cookie: &str,
        occurrence_id: i64,
        status_id: i32,
        justification: Option<&str>,
    ) -> TestResponse {
        self.request(
            "PUT",
            &format!("/api/occurrences/{occurrence_id}"),
            Some(cookie),
            Some(json!({
                "status_id": status_id,
                "rejection_justification": justification,
            })),
        )
        .await
    }
}

/// Minimal multipart/form-data encoder.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("svca-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str, cookie: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}
