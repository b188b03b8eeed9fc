#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use tr_core::core::CriteriaCatalog;
use tr_server::bootstrap::StorageTarget;
use tr_server::handler::{router, AppState};

// ---------------------------------------------------------------------------
// TestServer: the real router over an in-memory store
// ---------------------------------------------------------------------------

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let store = StorageTarget::InMemory
            .open()
            .expect("in-memory store should open");
        let state = Arc::new(AppState {
            store,
            catalog: Arc::new(CriteriaCatalog::default_rubric()),
        });
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            _handle: handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn create_project(&self, name: &str) -> String {
        let resp = self
            .client
            .post(format!("{}/api/projects", self.url()))
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("create project request");
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.expect("valid JSON");
        body["id"].as_str().expect("project id").to_owned()
    }

    /// Imports `payload` and returns the new conversation ids.
    pub async fn import(&self, project_id: &str, payload: &Value) -> Vec<String> {
        let resp = self
            .client
            .post(format!("{}/api/projects/{project_id}/conversations", self.url()))
            .json(payload)
            .send()
            .await
            .expect("import request");
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.expect("valid JSON");
        body["conversation_ids"]
            .as_array()
            .expect("id list")
            .iter()
            .map(|id| id.as_str().expect("string id").to_owned())
            .collect()
    }

    pub fn annotation_url(&self, project_id: &str, conversation_id: &str, user_id: &str) -> String {
        format!(
            "{}/api/projects/{project_id}/conversations/{conversation_id}/annotations/{user_id}",
            self.url()
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

pub const TEST_USER: &str = "reviewer@example.com";

pub fn sample_import() -> Value {
    json!([
        {
            "conversation": [
                {"role": "user", "content": "What is my balance?"},
                {"role": "assistant", "content": "", "tool_calls": [{"name": "get_balance", "arguments": "{}"}]},
                {"role": "tool", "content": "{\"balance\": 120}"},
                {"role": "assistant", "content": "Your balance is 120."},
                {"role": "user", "content": "Thanks"},
                {"role": "assistant", "content": "You're welcome."}
            ],
            "source": "bank-bot"
        },
        {
            "conversation": [
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello!"}
            ]
        }
    ])
}
