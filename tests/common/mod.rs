#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Method, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

use research_hub_api::config::AppConfig;
use research_hub_api::database::{MemoryStore, Store};
use research_hub_api::models::UserRole;
use research_hub_api::services::{LocalFileStorage, MailError, Mailer, OutgoingMail};
use research_hub_api::{app, AppState};

/// Keeps every message so tests can follow the links inside.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Token from the newest link of the given kind (`verify-email` or `reset-password`) sent to `to`.
    pub fn token_for(&self, to: &str, kind: &str) -> Option<String> {
        let marker = format!("/{}/", kind);
        self.sent()
            .iter()
            .rev()
            .filter(|m| m.to == to)
            .find_map(|m| {
                let start = m.html.find(&marker)? + marker.len();
                let rest = &m.html[start..];
                let end = rest.find('"')?;
                Some(rest[..end].to_string())
            })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// One server per test, bound to an ephemeral port on loopback.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub client: reqwest::Client,
    uploads: TempDir,
}

/// A registered, verified and logged-in account.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub token: String,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(RecordingMailer::default()).await
    }

    pub async fn start_with(mailer: RecordingMailer) -> Result<Self> {
        let uploads = tempfile::tempdir()?;
        let files = LocalFileStorage::new(uploads.path().join("uploads")).await?;
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);

        let state = AppState {
            store: store.clone(),
            mailer: mailer.clone(),
            files: Arc::new(files),
            config: Arc::new(AppConfig::development()),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let service = app(state).into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            store,
            mailer,
            client: reqwest::Client::new(),
            uploads,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.json::<Value>().await.context("response was not JSON")?;
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PUT, path, token, Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        self.call(Method::PATCH, path, token, body).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, token, None).await
    }

    /// Registers an account and returns the verification token from the mail.
    pub async fn register(&self, username: &str, role: &str) -> Result<(String, String)> {
        let email = format!("{}@example.org", username);
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "username": username,
                    "email": email,
                    "password": "secret123",
                    "affiliation": "Institute of Testing",
                    "role": role,
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
        let token = self
            .mailer
            .token_for(&email, "verify-email")
            .context("no verification mail recorded")?;
        Ok((email, token))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        self.post("/api/auth/login", None, json!({ "email": email, "password": password }))
            .await
    }

    /// Register, verify and log in.
    pub async fn user(&self, username: &str) -> Result<TestUser> {
        self.user_with_role(username, "researcher").await
    }

    pub async fn user_with_role(&self, username: &str, role: &str) -> Result<TestUser> {
        let (email, verification) = self.register(username, role).await?;
        let (status, body) = self.get(&format!("/api/auth/verify-email/{}", verification), None).await?;
        anyhow::ensure!(status == StatusCode::OK, "verify failed: {} {}", status, body);
        self.logged_in(&email).await
    }

    /// Logs in an account that exists already.
    pub async fn logged_in(&self, email: &str) -> Result<TestUser> {
        let (status, body) = self.login(email, "secret123").await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        Ok(TestUser {
            id: body["data"]["user"]["id"].as_str().context("user id")?.parse()?,
            email: email.to_string(),
            username: body["data"]["user"]["username"].as_str().unwrap_or_default().to_string(),
            token: body["data"]["token"].as_str().context("token")?.to_string(),
        })
    }

    /// Administrators cannot self-register; promote directly in the store.
    pub async fn admin(&self, username: &str) -> Result<TestUser> {
        let user = self.user(username).await?;
        let mut record = self.store.find_user(user.id).await?.context("admin user missing")?;
        record.role = UserRole::Administrator;
        self.store.update_user(&record).await?;
        Ok(user)
    }

    pub async fn project(&self, owner: &TestUser, title: &str, is_public: bool) -> Result<Uuid> {
        let (status, body) = self
            .post("/api/projects", Some(&owner.token), project_body(title, is_public))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create project failed: {} {}", status, body);
        Ok(body["data"]["id"].as_str().context("project id")?.parse()?)
    }

    pub async fn add_member(&self, owner: &TestUser, project: Uuid, member: &TestUser, role: &str) -> Result<()> {
        let (status, body) = self
            .post(
                &format!("/api/projects/{}/members", project),
                Some(&owner.token),
                json!({ "email": member.email, "role": role }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "add member failed: {} {}", status, body);
        Ok(())
    }

    pub async fn upload(
        &self,
        user: &TestUser,
        project: Uuid,
        title: &str,
        contents: &'static [u8],
        is_public: bool,
    ) -> Result<(StatusCode, Value)> {
        let file = multipart::Part::bytes(contents)
            .file_name("notes.txt")
            .mime_str("text/plain")?;
        let form = multipart::Form::new()
            .text("title", title.to_string())
            .text("description", "Field notes")
            .text("category", "report")
            .text("tags", "field, raw")
            .text("isPublic", is_public.to_string())
            .part("document", file);

        self.post_form(&format!("/api/documents/upload/{}", project), &user.token, form)
            .await
    }

    pub async fn post_form(&self, path: &str, token: &str, form: multipart::Form) -> Result<(StatusCode, Value)> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }

    /// Number of files currently in the upload directory.
    pub fn stored_files(&self) -> Result<usize> {
        Ok(std::fs::read_dir(self.uploads.path().join("uploads"))?.count())
    }

    pub async fn document(&self, user: &TestUser, project: Uuid, title: &str) -> Result<Uuid> {
        let (status, body) = self.upload(user, project, title, b"hello research", false).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "upload failed: {} {}", status, body);
        Ok(body["data"]["id"].as_str().context("document id")?.parse()?)
    }
}

pub fn project_body(title: &str, is_public: bool) -> Value {
    json!({
        "title": title,
        "description": "A study of things that need studying",
        "goals": ["Understand"],
        "objectives": ["Measure"],
        "timeline": { "startDate": "2024-01-01", "endDate": "2024-12-31" },
        "category": "research",
        "isPublic": is_public,
        "tags": ["genomics", "ml"],
    })
}
