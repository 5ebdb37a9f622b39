#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use user_api::auth::TokenIssuer;
use user_api::startup::run;
use user_api::store::{InMemoryUserStore, UserStore};

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-characters-long";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryUserStore>,
    pub issuer: TokenIssuer,
    pub client: reqwest::Client,
}

pub fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(InMemoryUserStore::new());
    let issuer = TokenIssuer::new(TEST_SECRET);

    let server = run(
        listener,
        store.clone() as Arc<dyn UserStore>,
        issuer.clone(),
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        issuer,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> reqwest::Response {
        self.post_json(
            "/users/register",
            &json!({
                "email": email,
                "password": password,
                "confirmPassword": password,
                "name": name
            }),
        )
        .await
    }

    /// Register and return the parsed `{ user, accessToken, refreshToken }` body
    pub async fn register_ok(&self, email: &str, password: &str, name: &str) -> Value {
        let response = self.register(email, password, name).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}{}", &self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}
