use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{AppState, routes};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::webhooks::router())
        .merge(routes::integrations::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use axum::{
        Router,
        body::{Body, to_bytes},
        extract::ConnectInfo,
        http::{Request, StatusCode, header},
    };
    use db::{
        DBService,
        models::{
            integration::{Integration, UpsertIntegration},
            payment::{CreatePayment, Payment},
            transaction::{CreateTransaction, Transaction},
        },
        types::{IntegrationPlatform, IntegrationStatus, OrderType, PaymentStatus},
    };
    use services::services::{
        config::WebhookGuardConfig, vault::CredentialVault, verify::compute_signature,
    };
    use tower::ServiceExt;

    use crate::AppState;

    const TEST_SECRET: &str = "whsec_test_1";

    async fn setup_with_config(config: WebhookGuardConfig) -> (AppState, Router) {
        let db_path =
            std::env::temp_dir().join(format!("pos-http-{}.sqlite", uuid::Uuid::new_v4()));
        let db = DBService::connect(&format!("sqlite://{}?mode=rwc", db_path.to_string_lossy()))
            .await
            .unwrap();
        let state = AppState::new(db, CredentialVault::new("test-master-key"), &config);
        let router = super::router(state.clone());
        (state, router)
    }

    async fn setup() -> (AppState, Router) {
        setup_with_config(WebhookGuardConfig::default()).await
    }

    async fn seed_integration(
        state: &AppState,
        platform: IntegrationPlatform,
        configuration: serde_json::Value,
    ) {
        let blob = state
            .vault()
            .encrypt_json(&serde_json::json!({"webhookSecret": TEST_SECRET}))
            .unwrap();
        Integration::upsert(
            &state.db().pool,
            1,
            platform,
            &UpsertIntegration {
                status: Some(IntegrationStatus::Active),
                is_active: Some(true),
                configuration: Some(configuration),
                credentials: Some(blob),
            },
        )
        .await
        .unwrap();
    }

    fn loopback_connect_info() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            12345,
        ))
    }

    fn webhook_request(
        platform: &str,
        payload: &serde_json::Value,
        signature: Option<&str>,
    ) -> Request<Body> {
        let bytes = serde_json::to_vec(payload).unwrap();
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/webhooks/{platform}"))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(format!("x-{platform}-signature"), signature);
        }
        let mut request = builder.body(Body::from(bytes)).unwrap();
        request.extensions_mut().insert(loopback_connect_info());
        request
    }

    fn signed_webhook_request(platform: &str, payload: &serde_json::Value) -> Request<Body> {
        let bytes = serde_json::to_vec(payload).unwrap();
        let signature = compute_signature(TEST_SECRET, &bytes);
        webhook_request(platform, payload, Some(&signature))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let (_state, app) = setup().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signed_gofood_order_creates_a_transaction() {
        let (state, app) = setup().await;
        seed_integration(
            &state,
            IntegrationPlatform::Gofood,
            serde_json::json!({"outletId": 7}),
        )
        .await;

        let payload = serde_json::json!({
            "orderId": "A1",
            "status": "new",
            "items": [{"name": "Nasi Goreng", "price": 25000, "quantity": 2}],
            "totalAmount": 50000,
        });
        let response = app.oneshot(signed_webhook_request("gofood", &payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "GoFood order created successfully");
        assert_eq!(json["data"]["transactionNumber"], "GOFOOD-A1");
        assert_eq!(json["data"]["total"], 50000.0);

        let transaction = Transaction::find_by_number(&state.db().pool, "GOFOOD-A1")
            .await
            .unwrap()
            .expect("transaction should exist");
        assert_eq!(transaction.status, "pending");
        assert_eq!(transaction.subtotal, 50000.0);
        assert_eq!(transaction.outlet_id, 7);
    }

    #[tokio::test]
    async fn identical_redelivery_replays_the_cached_response() {
        let (state, app) = setup().await;
        seed_integration(
            &state,
            IntegrationPlatform::Gofood,
            serde_json::json!({"outletId": 7}),
        )
        .await;

        let payload = serde_json::json!({
            "orderId": "A1",
            "status": "new",
            "items": [{"name": "Nasi Goreng", "price": 25000, "quantity": 2}],
        });

        let first = app
            .clone()
            .oneshot(signed_webhook_request("gofood", &payload))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first_json = body_json(first).await;

        let second = app
            .oneshot(signed_webhook_request("gofood", &payload))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        let second_json = body_json(second).await;

        // Replayed verbatim: still the creation message, not an update.
        assert_eq!(first_json, second_json);
        assert_eq!(second_json["message"], "GoFood order created successfully");
        assert_eq!(
            Transaction::count_by_number(&state.db().pool, "GOFOOD-A1")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn delivered_redelivery_completes_the_existing_transaction() {
        let (state, app) = setup().await;
        seed_integration(
            &state,
            IntegrationPlatform::Gofood,
            serde_json::json!({"outletId": 7}),
        )
        .await;

        let creation = serde_json::json!({"orderId": "A1", "status": "new", "totalAmount": 50000});
        let response = app
            .clone()
            .oneshot(signed_webhook_request("gofood", &creation))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let delivered = serde_json::json!({"orderId": "A1", "status": "delivered"});
        let response = app
            .oneshot(signed_webhook_request("gofood", &delivered))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "GoFood order status updated");
        assert_eq!(json["data"]["status"], "completed");

        let transaction = Transaction::find_by_number(&state.db().pool, "GOFOOD-A1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transaction.status, "completed");
        assert!(transaction.completed_at.is_some());
        assert_eq!(
            Transaction::count_by_number(&state.db().pool, "GOFOOD-A1")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn missing_signature_never_creates_state() {
        let (state, app) = setup().await;
        seed_integration(
            &state,
            IntegrationPlatform::Gofood,
            serde_json::json!({"outletId": 7}),
        )
        .await;

        let payload = serde_json::json!({"orderId": "A1", "status": "new", "totalAmount": 50000});
        let response = app
            .oneshot(webhook_request("gofood", &payload, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error_code"], "MISSING_SIGNATURE");
        assert!(
            Transaction::find_by_number(&state.db().pool, "GOFOOD-A1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn invalid_signature_never_creates_state() {
        let (state, app) = setup().await;
        seed_integration(
            &state,
            IntegrationPlatform::Gofood,
            serde_json::json!({"outletId": 7}),
        )
        .await;

        let payload = serde_json::json!({"orderId": "A1", "status": "new", "totalAmount": 50000});
        let bytes = serde_json::to_vec(&payload).unwrap();
        let wrong = compute_signature("wrong-secret", &bytes);
        let response = app
            .oneshot(webhook_request("gofood", &payload, Some(&wrong)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error_code"], "INVALID_SIGNATURE");
        assert!(
            Transaction::find_by_number(&state.db().pool, "GOFOOD-A1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unconfigured_platform_is_a_client_error() {
        let (_state, app) = setup().await;
        let payload = serde_json::json!({"orderId": "A1", "status": "new"});
        let response = app
            .oneshot(webhook_request("grabfood", &payload, Some("deadbeef")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error_code"], "INTEGRATION_NOT_FOUND");
    }

    #[tokio::test]
    async fn missing_outlet_binding_is_a_client_error() {
        let (state, app) = setup().await;
        seed_integration(&state, IntegrationPlatform::Gofood, serde_json::json!({})).await;

        let payload = serde_json::json!({"orderId": "A1", "status": "new", "totalAmount": 50000});
        let response = app
            .oneshot(signed_webhook_request("gofood", &payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error_code"], "OUTLET_NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn requests_beyond_the_window_maximum_are_rejected() {
        let config = WebhookGuardConfig {
            rate_limit_max: 2,
            ..WebhookGuardConfig::default()
        };
        let (state, app) = setup_with_config(config).await;
        seed_integration(
            &state,
            IntegrationPlatform::Gofood,
            serde_json::json!({"outletId": 7}),
        )
        .await;

        // Rate limiting runs before signature verification, so unsigned
        // requests still count against the window.
        let payload = serde_json::json!({"orderId": "A1", "status": "new"});
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(webhook_request("gofood", &payload, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app
            .oneshot(webhook_request("gofood", &payload, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(response).await;
        assert_eq!(json["error_code"], "RATE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn unknown_platform_is_not_found() {
        let (_state, app) = setup().await;
        let response = app
            .oneshot(webhook_request(
                "dana",
                &serde_json::json!({"orderId": "A1"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn qris_webhook_with_unknown_reference_is_not_found() {
        let (state, app) = setup().await;
        seed_integration(&state, IntegrationPlatform::Qris, serde_json::json!({})).await;

        let payload = serde_json::json!({"referenceNumber": "NOPE", "status": "success"});
        let response = app
            .oneshot(signed_webhook_request("qris", &payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error_code"], "PAYMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn qris_success_settles_the_pending_payment() {
        let (state, app) = setup().await;
        seed_integration(&state, IntegrationPlatform::Qris, serde_json::json!({})).await;

        let transaction = Transaction::create_with_children(
            &state.db().pool,
            &CreateTransaction {
                transaction_number: "TRX-100".to_string(),
                order_type: OrderType::DineIn,
                customer_name: "Walk-in".to_string(),
                customer_phone: None,
                subtotal: 42000.0,
                status: "pending".to_string(),
                outlet_id: 1,
                notes: None,
                items: vec![],
                payment: CreatePayment {
                    method: "qris".to_string(),
                    amount: 42000.0,
                    change_amount: 0.0,
                    reference_number: Some("QR-REF-1".to_string()),
                    status: PaymentStatus::Pending,
                },
            },
        )
        .await
        .unwrap();

        let payload = serde_json::json!({"referenceNumber": "QR-REF-1", "status": "success"});
        let response = app
            .oneshot(signed_webhook_request("qris", &payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "QRIS webhook processed successfully");
        assert_eq!(json["data"]["status"], "completed");

        let updated = Transaction::find_by_uuid(&state.db().pool, transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "completed");
        assert!(updated.completed_at.is_some());

        let payments = Payment::find_by_transaction(&state.db().pool, transaction.id)
            .await
            .unwrap();
        assert_eq!(payments[0].status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn integrations_require_the_tenant_header() {
        let (_state, app) = setup().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/integrations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error_code"], "NO_TENANT");
    }

    #[tokio::test]
    async fn integration_save_encrypts_at_rest_and_lists_decrypted() {
        let (state, app) = setup().await;

        let body = serde_json::json!({
            "status": "active",
            "isActive": true,
            "configuration": {"outletId": 7},
            "credentials": {"webhookSecret": "whsec_new"},
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/integrations/gofood")
                    .header("x-tenant-id", "1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["integrationType"], "gofood");
        assert_eq!(json["data"]["credentials"]["webhookSecret"], "whsec_new");

        // At rest the blob is opaque, not the plaintext secret.
        let stored = Integration::find_by_tenant_and_platform(
            &state.db().pool,
            1,
            IntegrationPlatform::Gofood,
        )
        .await
        .unwrap()
        .unwrap();
        let blob = stored.credentials.expect("credentials stored");
        assert!(!blob.contains("whsec_new"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/integrations")
                    .header("x-tenant-id", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let list = json["data"].as_array().unwrap();
        // Defaults merged in for the three unconfigured platforms.
        assert_eq!(list.len(), 4);
        let gofood = list
            .iter()
            .find(|entry| entry["integrationType"] == "gofood")
            .unwrap();
        assert_eq!(gofood["isActive"], true);
        assert_eq!(gofood["credentials"]["webhookSecret"], "whsec_new");
        let grabfood = list
            .iter()
            .find(|entry| entry["integrationType"] == "grabfood")
            .unwrap();
        assert_eq!(grabfood["isActive"], false);
        assert!(grabfood.get("id").is_none());
    }

    #[tokio::test]
    async fn second_save_updates_the_same_integration_row() {
        let (state, app) = setup().await;

        for is_active in [true, false] {
            let body = serde_json::json!({
                "status": if is_active { "active" } else { "inactive" },
                "isActive": is_active,
                "configuration": {"outletId": 7},
                "credentials": {"webhookSecret": "whsec_1"},
            });
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("PUT")
                        .uri("/integrations/shopeefood")
                        .header("x-tenant-id", "9")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(serde_json::to_vec(&body).unwrap()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let all = Integration::find_all_by_tenant(&state.db().pool, 9)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_active);
    }
}
