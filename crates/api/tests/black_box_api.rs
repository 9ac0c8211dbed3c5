use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;

use raware_api::app::dto::LoginResponse;
use raware_core::ProductId;
use raware_events::{BusError, Delivery, EventBus, Subscription, Topic};
use raware_infra::{AppConfig, Components, SharedBus, Workers, event_bus};
use raware_inventory::{InMemoryReservationJournal, ReservationJournal};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    workers: Option<Workers>,
    journal: Arc<InMemoryReservationJournal>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(Components::all()).await
    }

    async fn spawn_with(components: Components) -> Self {
        let config = AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            components,
            ..AppConfig::default()
        };
        let bus: SharedBus = event_bus::connect(&config.bus).unwrap();
        Self::spawn_on(config, bus).await
    }

    async fn spawn_on(config: AppConfig, bus: SharedBus) -> Self {
        let components = config.components;

        // Same wiring as prod, but bound to an ephemeral port.
        let journal = Arc::new(InMemoryReservationJournal::new());

        let workers = if components.inventory {
            let sink: Arc<dyn ReservationJournal> = journal.clone();
            raware_api::app::inventory_subscriptions(Some(sink))
                .start(bus.as_ref())
                .unwrap()
        } else {
            Workers::default()
        };

        let app = raware_api::app::build_app(&config, bus).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            workers: Some(workers),
            journal,
        }
    }

    async fn reservations_for_eventually(&self, id: &str, expected: usize) -> usize {
        // The listener runs behind the bus; poll briefly until it catches up.
        let id = ProductId::new(id);
        for _ in 0..100 {
            if self.journal.count_for(&id) >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // Give a duplicate delivery a chance to show up.
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.journal.count_for(&id)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
        if let Some(workers) = self.workers.take() {
            workers.shutdown();
        }
    }
}

/// Bus that refuses every publish.
struct UnreachableBus;

impl EventBus<Vec<u8>> for UnreachableBus {
    fn publish(&self, topic: &Topic, _message: Vec<u8>) -> Delivery {
        Delivery::failed(
            topic.clone(),
            BusError::Publish {
                topic: topic.clone(),
                reason: "broker unreachable".to_string(),
            },
        )
    }

    fn subscribe(&self, topic: &Topic) -> Result<Subscription<Vec<u8>>, BusError> {
        Err(BusError::Subscribe {
            topic: topic.clone(),
            reason: "broker unreachable".to_string(),
        })
    }
}

async fn spawn_orders_on_unreachable_bus(await_delivery: bool) -> TestServer {
    let config = AppConfig {
        jwt_secret: JWT_SECRET.to_string(),
        components: Components {
            auth: false,
            orders: true,
            inventory: false,
        },
        await_delivery,
        ..AppConfig::default()
    };
    TestServer::spawn_on(config, Arc::new(UnreachableBus)).await
}

async fn create_order(client: &reqwest::Client, base_url: &str, id: &str) -> reqwest::Response {
    client
        .post(format!("{}/orders/{}", base_url, id))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_mints_a_one_hour_token_for_the_fixed_subject() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: LoginResponse = res.json().await.unwrap();
    let data = jsonwebtoken::decode::<serde_json::Value>(
        &body.token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .expect("token should verify with the configured secret");

    assert_eq!(data.header.alg, Algorithm::HS256);
    assert_eq!(data.claims["sub"], "user");
    let iat = data.claims["iat"].as_i64().unwrap();
    let exp = data.claims["exp"].as_i64().unwrap();
    assert_eq!(exp - iat, 3600);
}

#[tokio::test]
async fn login_ignores_the_request_body() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .body("{\"username\":\"anyone\",\"password\":\"wrong\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn token_does_not_verify_with_another_secret() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let body: LoginResponse = client
        .post(format!("{}/auth/login", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let res = jsonwebtoken::decode::<serde_json::Value>(
        &body.token,
        &DecodingKey::from_secret(b"some-other-secret"),
        &Validation::new(Algorithm::HS256),
    );
    assert!(res.is_err());
}

#[tokio::test]
async fn order_is_acknowledged_and_reserved_once() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = create_order(&client, &srv.base_url, "widget-42").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ORDER_CREATED");

    assert_eq!(srv.reservations_for_eventually("widget-42", 1).await, 1);
}

#[tokio::test]
async fn repeated_orders_are_not_deduplicated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let res = create_order(&client, &srv.base_url, "gadget").await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    assert_eq!(srv.reservations_for_eventually("gadget", 2).await, 2);
}

#[tokio::test]
async fn orders_need_no_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/orders/no-auth", srv.base_url))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn order_is_acknowledged_without_an_inventory_listener() {
    let srv = TestServer::spawn_with(Components {
        auth: false,
        orders: true,
        inventory: false,
    })
    .await;
    let client = reqwest::Client::new();

    let res = create_order(&client, &srv.base_url, "lonely").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ORDER_CREATED");
    assert!(srv.journal.is_empty());
}

#[tokio::test]
async fn disabled_components_are_not_routed() {
    let srv = TestServer::spawn_with(Components {
        auth: true,
        orders: false,
        inventory: false,
    })
    .await;
    let client = reqwest::Client::new();

    let res = create_order(&client, &srv.base_url, "widget").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_only_accepts_post() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/auth/login", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn awaited_publish_failure_is_a_bad_gateway() {
    let srv = spawn_orders_on_unreachable_bus(true).await;
    let client = reqwest::Client::new();

    let res = create_order(&client, &srv.base_url, "widget-42").await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "publish_error");
    assert!(body["message"].as_str().unwrap().contains("broker unreachable"));
}

#[tokio::test]
async fn detached_publish_failure_still_acknowledges() {
    let srv = spawn_orders_on_unreachable_bus(false).await;
    let client = reqwest::Client::new();

    let res = create_order(&client, &srv.base_url, "widget-42").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ORDER_CREATED");
}
