//! Common test utilities - TrackerTest harness for end-to-end testing

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use initrack::{Config, Server};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Test harness that spawns a real initrack server on a random port
pub struct TrackerTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl TrackerTest {
    /// Start a server with an in-memory database
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    /// Start a server after adjusting the default config
    pub async fn start_with(configure: impl FnOnce(&mut Config)) -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let mut config = Config {
            bind_addr: addr,
            request_timeout_secs: 5,
            ..Config::default()
        };
        configure(&mut config);

        let server = Arc::new(Server::new(config).await?);
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// POST and decode the JSON answer, asserting the status
    pub async fn post_ok(&self, path: &str, body: &Value, status: u16) -> Value {
        let resp = self.post(path, body).await.expect("request failed");
        assert_eq!(resp.status(), status, "POST {}", path);
        resp.json().await.expect("Failed to parse JSON")
    }

    /// Current session view
    pub async fn session(&self) -> Value {
        let resp = self.get("/session").await.expect("request failed");
        assert_eq!(resp.status(), 200);
        resp.json().await.expect("Failed to parse JSON")
    }

    /// Add a monster and return its generated id
    pub async fn add_monster(&self, name: &str, max_hp: i32, dex_mod: i32) -> String {
        let body = self
            .post_ok(
                "/combatants/monster",
                &json!({"name": name, "maxHp": max_hp, "dexMod": dex_mod}),
                201,
            )
            .await;
        body["id"].as_str().expect("missing id").to_string()
    }

    /// Set a combatant's initiative
    pub async fn set_initiative(&self, id: &str, value: Option<i32>) -> Value {
        let resp = self
            .put(&format!("/combatants/{}/initiative", id), &json!({ "value": value }))
            .await
            .expect("request failed");
        assert_eq!(resp.status(), 200);
        resp.json().await.expect("Failed to parse JSON")
    }

    /// Get direct access to the database for test setup/assertions
    pub fn db(&self) -> Arc<initrack::db::Database> {
        self.server.db()
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

impl Drop for TrackerTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}

/// Stand-in for the character sheet service
///
/// - `43889142`: Aria, dexterity 14 under `value`
/// - `555`: dexterity 8 under `score`, no name
/// - `404`: not found
/// - `nodata`: 200 without a `data` object
/// - `garbage`: 200 with a non-JSON body
pub struct FakeSheetService {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl FakeSheetService {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let router = Router::new().route("/character/v5/character/{id}", get(character));
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn character(Path(id): Path<String>) -> axum::response::Response {
    match id.as_str() {
        "43889142" => (
            [("content-security-policy", "default-src 'none'")],
            Json(json!({
                "success": true,
                "data": {
                    "name": "Aria",
                    "stats": [
                        {"id": 1, "value": 10},
                        {"id": 2, "value": 14},
                        {"id": 3, "value": 13}
                    ]
                }
            })),
        )
            .into_response(),
        "555" => Json(json!({
            "data": {"stats": [{"abilityId": 2, "score": 8}]}
        }))
        .into_response(),
        "nodata" => Json(json!({"success": true})).into_response(),
        "garbage" => (StatusCode::OK, "<html>oops</html>").into_response(),
        _ => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
