use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use renewed::config::AppConfig;
use renewed::db::{self, queries};
use renewed::handlers;
use renewed::models::{PaymentRecordStatus, PaymentStatus};
use renewed::services::email::{Mailer, OutgoingEmail};
use renewed::services::payments::signature;
use renewed::services::payments::{
    CreatedPaymentIntent, GatewayError, NewPaymentIntent, PaymentGateway,
};
use renewed::state::AppState;

const WEBHOOK_SECRET: &str = "whsec_test_secret";

// ── Mock Providers ──

struct MockGateway {
    calls: Arc<Mutex<Vec<NewPaymentIntent>>>,
    fail: Arc<AtomicBool>,
    counter: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_intent(
        &self,
        _secret_key: &str,
        request: &NewPaymentIntent,
    ) -> Result<CreatedPaymentIntent, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected("Your card was declined.".to_string()));
        }

        // Same idempotency key, same intent, as the real gateway behaves.
        let id = match &request.idempotency_key {
            Some(key) => format!("pi_{key}"),
            None => format!("pi_{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1),
        };
        Ok(CreatedPaymentIntent {
            client_secret: format!("{id}_secret"),
            id,
        })
    }
}

struct MockMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<String> {
        self.sent.lock().unwrap().push(email.clone());
        Ok("email_1".to_string())
    }
}

// ── Helpers ──

struct Harness {
    state: Arc<AppState>,
    gateway_calls: Arc<Mutex<Vec<NewPaymentIntent>>>,
    gateway_fail: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_email: "admin@example.com".to_string(),
        admin_password: "test-password".to_string(),
        session_secret: "test-session-secret".to_string(),
        session_ttl_hours: 1,
        stripe_secret_key: "sk_test_env".to_string(),
        stripe_publishable_key: "pk_test_env".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        stripe_api_base: "http://localhost:12111".to_string(),
        currency: "usd".to_string(),
        resend_api_key: String::new(),
        contact_to: "admin@example.com".to_string(),
        contact_from: "Contact Form <contact@example.com>".to_string(),
        orphan_sweep_minutes: 30,
    }
}

fn harness_with(config: AppConfig) -> Harness {
    let conn = db::init_db(":memory:").unwrap();
    let gateway_calls = Arc::new(Mutex::new(vec![]));
    let gateway_fail = Arc::new(AtomicBool::new(false));
    let sent = Arc::new(Mutex::new(vec![]));

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
        gateway: Box::new(MockGateway {
            calls: Arc::clone(&gateway_calls),
            fail: Arc::clone(&gateway_fail),
            counter: AtomicUsize::new(0),
        }),
        mailer: Box::new(MockMailer {
            sent: Arc::clone(&sent),
        }),
    });

    Harness {
        state,
        gateway_calls,
        gateway_fail,
        sent,
    }
}

fn harness() -> Harness {
    harness_with(test_config())
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn checkout_body(email: &str) -> serde_json::Value {
    serde_json::json!({
        "amount": 100,
        "bookingData": {
            "serviceId": "individual-therapy",
            "serviceName": "Individual Therapy",
            "servicePrice": 100,
            "serviceDuration": "1 hr",
            "firstName": "Jane",
            "lastName": "Doe",
            "email": email,
            "phone": "555-123-4567",
            "message": "First visit",
            "appointmentDate": "2025-06-16",
            "appointmentTime": "10:00 am"
        }
    })
}

async fn start_checkout(state: &Arc<AppState>) -> (String, String) {
    let (status, json) = send(
        state,
        json_request("POST", "/api/create-payment-intent", checkout_body("user@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let booking_id = json["bookingId"].as_str().unwrap().to_string();
    let client_secret = json["clientSecret"].as_str().unwrap().to_string();
    let intent_id = client_secret.trim_end_matches("_secret").to_string();
    (booking_id, intent_id)
}

fn event_body(kind: &str, object: serde_json::Value) -> String {
    serde_json::json!({
        "id": format!("evt_{kind}"),
        "type": kind,
        "data": {"object": object}
    })
    .to_string()
}

fn signed_webhook(body: &str) -> Request<Body> {
    let header =
        signature::sign(body.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp()).unwrap();
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("Stripe-Signature", header)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn booking_and_payment_status(
    state: &Arc<AppState>,
    booking_id: &str,
    intent_id: &str,
) -> (PaymentStatus, PaymentRecordStatus) {
    let conn = state.db.lock().unwrap();
    let bookings = queries::get_bookings_by_payment_intent(&conn, intent_id).unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].id, booking_id);
    let payments = queries::get_payments_for_intent(&conn, intent_id).unwrap();
    assert_eq!(payments.len(), 1);
    (bookings[0].payment_status, payments[0].status)
}

async fn login(state: &Arc<AppState>) -> String {
    let (status, json) = send(
        state,
        json_request(
            "POST",
            "/api/admin/login",
            serde_json::json!({"email": "admin@example.com", "password": "test-password"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["token"].as_str().unwrap().to_string()
}

// ── Health & Catalog ──

#[tokio::test]
async fn test_health() {
    let h = harness();
    let (status, json) = send(&h.state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_catalog() {
    let h = harness();
    let (status, json) = send(&h.state, get("/api/services")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 4);

    let (status, json) = send(&h.state, get("/api/services/individual-therapy")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["price"], 100.0);

    let (status, _) = send(&h.state, get("/api/services/massage")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_slots() {
    let h = harness();

    // 2099-06-15 is a Monday.
    let (status, json) =
        send(&h.state, get("/api/services/group-therapy/slots?date=2099-06-15")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], true);
    assert_eq!(json["slots"].as_array().unwrap().len(), 16);
    assert_eq!(json["slots"][0], "9:00 am");

    let (_, json) = send(&h.state, get("/api/services/group-therapy/slots?date=2099-06-13")).await;
    assert_eq!(json["available"], false);
    assert!(json["slots"].as_array().unwrap().is_empty());
    assert_eq!(json["next_available"], "2099-06-15");

    let (status, _) = send(&h.state, get("/api/services/group-therapy/slots?date=tomorrow")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Checkout ──

#[tokio::test]
async fn test_checkout_links_booking_and_payment() {
    let h = harness();
    let (booking_id, intent_id) = start_checkout(&h.state).await;

    let conn = h.state.db.lock().unwrap();
    let booking = queries::get_booking_by_id(&conn, &booking_id).unwrap().unwrap();
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.payment_intent_id.as_deref(), Some(intent_id.as_str()));

    let payments = queries::get_payments_for_intent(&conn, &intent_id).unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentRecordStatus::Pending);
    assert_eq!(payments[0].booking_id, booking_id);
    assert_eq!(payments[0].amount, 100.0);

    let calls = h.gateway_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].amount_minor, 10_000);
    assert_eq!(calls[0].booking_id, booking_id);
    assert_eq!(calls[0].customer_email, "user@example.com");
    assert_eq!(calls[0].description, "Individual Therapy - Jane Doe");
}

#[tokio::test]
async fn test_checkout_invalid_email_rejected_before_any_write() {
    let h = harness();
    let (status, json) = send(
        &h.state,
        json_request("POST", "/api/create-payment-intent", checkout_body("not-an-email")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"]["email"], "Invalid email format");

    let conn = h.state.db.lock().unwrap();
    assert_eq!(queries::count_bookings_by_status(&conn).unwrap().all, 0);
    assert!(h.gateway_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_without_secret_key_is_configuration_error() {
    let mut config = test_config();
    config.stripe_secret_key = String::new();
    let h = harness_with(config);

    let (status, json) = send(
        &h.state,
        json_request("POST", "/api/create-payment-intent", checkout_body("user@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("not configured"));

    let conn = h.state.db.lock().unwrap();
    assert_eq!(queries::count_bookings_by_status(&conn).unwrap().all, 0);
}

#[tokio::test]
async fn test_gateway_failure_leaves_detectable_orphan() {
    let h = harness();
    h.gateway_fail.store(true, Ordering::SeqCst);

    let (status, json) = send(
        &h.state,
        json_request("POST", "/api/create-payment-intent", checkout_body("user@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "Your card was declined.");

    {
        let conn = h.state.db.lock().unwrap();
        let bookings = queries::list_bookings(&conn, None, 10).unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].payment_status, PaymentStatus::Pending);
        assert!(bookings[0].payment_intent_id.is_none());
        conn.execute("UPDATE bookings SET created_at = '2000-01-01 00:00:00'", [])
            .unwrap();
    }

    let token = login(&h.state).await;
    let (status, json) = send(
        &h.state,
        authed_get("/api/admin/bookings/orphaned?older_than_minutes=30", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_replayed_key_describes_stored_booking() {
    let h = harness();
    let request = |email: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/create-payment-intent")
            .header("Content-Type", "application/json")
            .header("Idempotency-Key", "replay-1")
            .body(Body::from(checkout_body(email).to_string()))
            .unwrap()
    };

    let (status, _) = send(&h.state, request("user@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.state, request("someone-else@example.com")).await;
    assert_eq!(status, StatusCode::OK);

    let calls = h.gateway_calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].customer_email, "user@example.com");
    assert_eq!(calls[1].booking_id, calls[0].booking_id);
    assert_eq!(calls[1].description, calls[0].description);
}

#[tokio::test]
async fn test_malformed_json_gets_error_body() {
    let h = harness();
    let req = Request::builder()
        .method("POST")
        .uri("/api/create-payment-intent")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&h.state, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, json) = send(
        &h.state,
        json_request("POST", "/api/contact", serde_json::json!({"firstName": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_idempotency_key_reuses_booking() {
    let h = harness();
    let request = || {
        Request::builder()
            .method("POST")
            .uri("/api/create-payment-intent")
            .header("Content-Type", "application/json")
            .header("Idempotency-Key", "abc123")
            .body(Body::from(checkout_body("user@example.com").to_string()))
            .unwrap()
    };

    let (status, first) = send(&h.state, request()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(&h.state, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["bookingId"], second["bookingId"]);
    assert_eq!(first["clientSecret"], second["clientSecret"]);

    let conn = h.state.db.lock().unwrap();
    assert_eq!(queries::count_bookings_by_status(&conn).unwrap().all, 1);
    assert_eq!(queries::get_payments_for_intent(&conn, "pi_checkout-abc123").unwrap().len(), 1);

    let calls = h.gateway_calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].idempotency_key.as_deref(), Some("checkout-abc123"));
}

#[tokio::test]
async fn test_booking_status_lookup() {
    let h = harness();
    let (booking_id, _) = start_checkout(&h.state).await;

    let (status, json) = send(&h.state, get(&format!("/api/bookings/{booking_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payment_status"], "pending");
    assert_eq!(json["appointment_time"], "10:00 am");

    let (status, _) = send(&h.state, get("/api/bookings/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Webhooks ──

#[tokio::test]
async fn test_webhook_payment_succeeded() {
    let h = harness();
    let (booking_id, intent_id) = start_checkout(&h.state).await;

    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": intent_id}));
    let (status, json) = send(&h.state, signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    assert_eq!(
        booking_and_payment_status(&h.state, &booking_id, &intent_id),
        (PaymentStatus::Completed, PaymentRecordStatus::Succeeded)
    );
}

#[tokio::test]
async fn test_webhook_payment_failed() {
    let h = harness();
    let (booking_id, intent_id) = start_checkout(&h.state).await;

    let body = event_body("payment_intent.payment_failed", serde_json::json!({"id": intent_id}));
    let (status, _) = send(&h.state, signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        booking_and_payment_status(&h.state, &booking_id, &intent_id),
        (PaymentStatus::Failed, PaymentRecordStatus::Failed)
    );
}

#[tokio::test]
async fn test_webhook_replay_is_idempotent() {
    let h = harness();
    let (booking_id, intent_id) = start_checkout(&h.state).await;
    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": intent_id}));

    send(&h.state, signed_webhook(&body)).await;
    let once = booking_and_payment_status(&h.state, &booking_id, &intent_id);
    let (status, _) = send(&h.state, signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);
    let twice = booking_and_payment_status(&h.state, &booking_id, &intent_id);

    assert_eq!(once, twice);
    let conn = h.state.db.lock().unwrap();
    assert_eq!(queries::count_bookings_by_status(&conn).unwrap().completed, 1);
}

#[tokio::test]
async fn test_webhook_refund_leaves_booking_status() {
    let h = harness();
    let (booking_id, intent_id) = start_checkout(&h.state).await;

    let succeeded = event_body("payment_intent.succeeded", serde_json::json!({"id": intent_id}));
    send(&h.state, signed_webhook(&succeeded)).await;

    let refunded = event_body(
        "charge.refunded",
        serde_json::json!({"id": "ch_1", "payment_intent": intent_id}),
    );
    let (status, _) = send(&h.state, signed_webhook(&refunded)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        booking_and_payment_status(&h.state, &booking_id, &intent_id),
        (PaymentStatus::Completed, PaymentRecordStatus::Refunded)
    );
}

#[tokio::test]
async fn test_webhook_unknown_intent_acknowledged() {
    let h = harness();
    let (booking_id, intent_id) = start_checkout(&h.state).await;

    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": "pi_unknown"}));
    let (status, json) = send(&h.state, signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    assert_eq!(
        booking_and_payment_status(&h.state, &booking_id, &intent_id),
        (PaymentStatus::Pending, PaymentRecordStatus::Pending)
    );
}

#[tokio::test]
async fn test_webhook_unhandled_event_acknowledged() {
    let h = harness();
    let body = event_body("customer.created", serde_json::json!({"id": "cus_1"}));
    let (status, json) = send(&h.state, signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
}

#[tokio::test]
async fn test_webhook_missing_signature() {
    let h = harness();
    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": "pi_1"}));
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(&h.state, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No signature provided");
}

#[tokio::test]
async fn test_webhook_bad_signature_mutates_nothing() {
    let h = harness();
    let (booking_id, intent_id) = start_checkout(&h.state).await;

    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": intent_id}));
    let forged = signature::sign(body.as_bytes(), "whsec_wrong", chrono::Utc::now().timestamp())
        .unwrap();
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("Stripe-Signature", forged)
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(&h.state, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid signature");
    assert_eq!(
        booking_and_payment_status(&h.state, &booking_id, &intent_id),
        (PaymentStatus::Pending, PaymentRecordStatus::Pending)
    );
}

#[tokio::test]
async fn test_webhook_unverified_mode_without_secret() {
    let mut config = test_config();
    config.stripe_webhook_secret = String::new();
    let h = harness_with(config);
    let (booking_id, intent_id) = start_checkout(&h.state).await;

    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": intent_id}));
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("Stripe-Signature", "t=1,v1=unchecked")
        .body(Body::from(body))
        .unwrap();

    let (status, _) = send(&h.state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        booking_and_payment_status(&h.state, &booking_id, &intent_id),
        (PaymentStatus::Completed, PaymentRecordStatus::Succeeded)
    );
}

#[tokio::test]
async fn test_webhook_missing_signature_checked_before_configuration() {
    let mut config = test_config();
    config.stripe_secret_key = String::new();
    let h = harness_with(config);

    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": "pi_1"}));
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(&h.state, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No signature provided");
}

#[tokio::test]
async fn test_webhook_extreme_timestamp_rejected() {
    let h = harness();
    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": "pi_1"}));
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("Stripe-Signature", "t=-9223372036854775808,v1=00")
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(&h.state, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid signature");
}

#[tokio::test]
async fn test_webhook_without_stripe_configured() {
    let mut config = test_config();
    config.stripe_secret_key = String::new();
    let h = harness_with(config);

    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": "pi_1"}));
    let (status, _) = send(&h.state, signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ── Contact ──

#[tokio::test]
async fn test_contact_sends_email() {
    let h = harness();
    let (status, json) = send(
        &h.state,
        json_request(
            "POST",
            "/api/contact",
            serde_json::json!({
                "firstName": "Jane",
                "lastName": "Doe",
                "email": "jane@example.com",
                "message": "<script>hi</script>"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Email sent successfully");

    let sent = h.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Contact Form Submission from Jane Doe");
    assert_eq!(sent[0].to, vec!["admin@example.com".to_string()]);
    assert_eq!(sent[0].reply_to.as_deref(), Some("jane@example.com"));
    assert!(sent[0].html.contains("&lt;script&gt;"));
    assert!(!sent[0].html.contains("<script>"));
}

#[tokio::test]
async fn test_contact_validation() {
    let h = harness();
    let (status, json) = send(
        &h.state,
        json_request("POST", "/api/contact", serde_json::json!({"email": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"]["email"], "Invalid email format");
    assert!(h.sent.lock().unwrap().is_empty());
}

// ── Admin API Tests ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let h = harness();
    for uri in [
        "/api/admin/dashboard",
        "/api/admin/bookings",
        "/api/admin/bookings/orphaned",
        "/api/admin/settings",
    ] {
        let (status, json) = send(&h.state, get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(json["error"], "unauthorized");
    }

    let (status, _) = send(&h.state, authed_get("/api/admin/dashboard", "wrong-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_wrong_password() {
    let h = harness();
    let (status, _) = send(
        &h.state,
        json_request(
            "POST",
            "/api/admin/login",
            serde_json::json!({"email": "admin@example.com", "password": "guess"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_dashboard_and_bookings() {
    let h = harness();
    let (_, intent_id) = start_checkout(&h.state).await;
    start_checkout(&h.state).await;
    let body = event_body("payment_intent.succeeded", serde_json::json!({"id": intent_id}));
    send(&h.state, signed_webhook(&body)).await;

    let token = login(&h.state).await;

    let (status, json) = send(&h.state, authed_get("/api/admin/dashboard", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_bookings"], 2);
    assert_eq!(json["completed_payments"], 1);
    assert_eq!(json["pending_payments"], 1);
    assert_eq!(json["failed_payments"], 0);
    assert_eq!(json["total_revenue"], 100.0);
    assert_eq!(json["recent_bookings"].as_array().unwrap().len(), 2);

    let (status, json) =
        send(&h.state, authed_get("/api/admin/bookings?status=completed", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bookings"].as_array().unwrap().len(), 1);
    assert_eq!(json["bookings"][0]["customer_name"], "Jane Doe");
    assert_eq!(json["counts"]["all"], 2);

    let (status, _) =
        send(&h.state, authed_get("/api/admin/bookings?status=refunded", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_orphaned_age_out_of_range() {
    let h = harness();
    let token = login(&h.state).await;

    for minutes in ["9223372036854775807", "-1", "600000"] {
        let (status, json) = send(
            &h.state,
            authed_get(
                &format!("/api/admin/bookings/orphaned?older_than_minutes={minutes}"),
                &token,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{minutes}");
        assert!(json["error"].as_str().unwrap().contains("older_than_minutes"));
    }

    let (status, _) = send(&h.state, authed_get("/api/admin/bookings/orphaned", &token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_settings_report_environment_keys() {
    let h = harness();
    let token = login(&h.state).await;

    let (status, json) = send(&h.state, authed_get("/api/admin/settings", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stripe_secret_key"], "");
    assert_eq!(json["hasKeysConfigured"], true);

    let mut config = test_config();
    config.stripe_secret_key = String::new();
    let h = harness_with(config);
    let token = login(&h.state).await;
    let (_, json) = send(&h.state, authed_get("/api/admin/settings", &token)).await;
    assert_eq!(json["hasKeysConfigured"], false);
}

#[tokio::test]
async fn test_admin_settings_masking() {
    let h = harness();
    let token = login(&h.state).await;

    let save = |body: serde_json::Value| {
        Request::builder()
            .method("POST")
            .uri("/api/admin/settings")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (status, json) = send(
        &h.state,
        save(serde_json::json!({
            "stripe_publishable_key": "pk_test_db",
            "stripe_secret_key": "sk_test_db",
            "stripe_webhook_secret": "whsec_db"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, json) = send(&h.state, authed_get("/api/admin/settings", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stripe_publishable_key"], "pk_test_db");
    assert_eq!(json["stripe_secret_key"], "••••••••");
    assert_eq!(json["hasKeysConfigured"], true);

    // Re-saving the form as displayed must not overwrite the stored secrets.
    let (status, _) = send(&h.state, save(json.clone())).await;
    assert_eq!(status, StatusCode::OK);
    {
        let conn = h.state.db.lock().unwrap();
        let stored = queries::get_settings(&conn).unwrap();
        assert_eq!(stored.stripe_secret_key.as_deref(), Some("sk_test_db"));
        assert_eq!(stored.stripe_webhook_secret.as_deref(), Some("whsec_db"));
    }

    let (status, json) =
        send(&h.state, save(serde_json::json!({"stripe_secret_key": "pk_wrong"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["fields"]["stripe_secret_key"]
        .as_str()
        .unwrap()
        .contains("sk_"));
}
