#![allow(dead_code)]

use callme_dashboard::{app, InjectableServices};
use reqwest::{redirect::Policy, Client};
use std::fs;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestApp {
    pub address: String,
    pub port: u16,
    client: Client,
}

impl TestApp {
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
    }

    pub async fn get_with_cookie(
        &self,
        path: &str,
        cookie: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .get(format!("{}{}", self.address, path))
            .header("Cookie", cookie)
            .send()
            .await
    }

    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(format!("{}{}", self.address, path))
            .form(form)
            .send()
            .await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
    }

    pub fn live_url(&self, query: &str) -> String {
        format!("ws://127.0.0.1:{}/live{}", self.port, query)
    }
}

/// Spawns the dashboard against `api`. Redirects are not followed so tests
/// can assert on them.
pub async fn spawn_app(api: &MockServer) -> TestApp {
    let services = InjectableServices {
        reminders_api_address: Some(api.uri()),
    };

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let router = app(services).await.expect("Failed to build app");

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address,
        port,
        client: Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("Failed to build client"),
    }
}

pub fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{}.json", name))
        .unwrap_or_else(|_| panic!("Failed to read {} fixture", name))
}

pub async fn mount_list(api: &MockServer, fixture_name: &str) {
    Mock::given(method("GET"))
        .and(path("/api/reminders"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(fixture(fixture_name), "application/json"))
        .named("Reminders list")
        .mount(api)
        .await;
}

pub async fn mount_stats(api: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(fixture("stats"), "application/json"))
        .named("Stats")
        .mount(api)
        .await;
}
