use atelier::api::{self, AppState};
use atelier::checkout::{CheckoutService, PayoutEngine, Reconciler, ReversalEngine};
use atelier::config::Config;
use atelier::db::init_db;
use atelier::domain::{
    Artwork, ArtistId, ArtworkId, Cart, CartId, CartItem, CartOwner, Country, Edition, EditionId,
    ListingStatus, Minor, OrderId, OrderStatus, PayoutStatus, TimeMs,
};
use atelier::gateway::{
    sign_payload, MockPaymentGateway, MockTaxIdValidator, PaymentGateway, TaxIdValidator,
};
use atelier::Repository;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

const WEBHOOK_SECRET: &str = "whsec_test";

struct TestApp {
    app: axum::Router,
    repo: Arc<Repository>,
    gateway: Arc<MockPaymentGateway>,
    _temp: TempDir,
}

async fn setup_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();

    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let gateway = Arc::new(MockPaymentGateway::new());

    let config = Config {
        port: 0,
        database_path: db_path,
        payment_api_url: "http://example.invalid".to_string(),
        payment_secret_key: "sk_test".to_string(),
        payment_webhook_secret: WEBHOOK_SECRET.to_string(),
        shipping_api_url: None,
        platform_fee_bps: 3000,
        payout_delay_days: 0,
        hold_ttl_minutes: 15,
        home_country: Country::new("PT"),
        tax_rate_bps: 2300,
        tax_jurisdiction: vec![Country::new("PT"), Country::new("DE")],
        flat_shipping_minor: 2500,
        allow_guest_checkout: true,
        vat_cache_ttl_minutes: 60,
    };

    let vat: Arc<dyn TaxIdValidator> = Arc::new(MockTaxIdValidator::invalid());
    let checkout = Arc::new(CheckoutService::new(
        repo.clone(),
        gateway.clone() as Arc<dyn PaymentGateway>,
        None,
        vat,
        config.clone(),
    ));
    let payouts = Arc::new(PayoutEngine::new(
        repo.clone(),
        gateway.clone() as Arc<dyn PaymentGateway>,
        config.platform_fee_bps,
        config.payout_delay_days,
    ));
    let reversals = Arc::new(ReversalEngine::new(
        repo.clone(),
        gateway.clone() as Arc<dyn PaymentGateway>,
    ));
    let reconciler = Arc::new(Reconciler::new(repo.clone(), payouts, reversals));

    let app = api::create_router(AppState::new(repo.clone(), config, checkout, reconciler));

    TestApp {
        app,
        repo,
        gateway,
        _temp: temp_dir,
    }
}

/// Seed a cart with one unique artwork, one limited print, and one digital
/// edition, then create a pending order through the API.
async fn seed_and_create_order(test: &TestApp) -> (OrderId, ArtworkId, EditionId, EditionId, CartId) {
    let artist = ArtistId::new();
    test.repo
        .insert_artist(&artist, "Ana Reis", Some("acct_ana"), TimeMs::new(0))
        .await
        .unwrap();

    let artwork = Artwork {
        id: ArtworkId::new(),
        artist_id: artist,
        title: "Sea Study".to_string(),
        price: Minor::new(250_000),
        currency: "eur".to_string(),
        status: ListingStatus::Published,
        width_cm: 60.0,
        height_cm: 80.0,
        depth_cm: 4.0,
        framed: true,
        created_at: TimeMs::new(0),
    };
    test.repo.insert_artwork(&artwork).await.unwrap();

    let print = Edition {
        id: EditionId::new(),
        artist_id: artist,
        title: "Print".to_string(),
        unit_price: Minor::new(5_000),
        currency: "eur".to_string(),
        status: ListingStatus::Published,
        available: Some(5),
        digital: false,
        created_at: TimeMs::new(0),
    };
    test.repo.insert_edition(&print).await.unwrap();

    let digital = Edition {
        id: EditionId::new(),
        artist_id: artist,
        title: "Digital pack".to_string(),
        unit_price: Minor::new(2_000),
        currency: "eur".to_string(),
        status: ListingStatus::Published,
        available: None,
        digital: true,
        created_at: TimeMs::new(0),
    };
    test.repo.insert_edition(&digital).await.unwrap();

    let cart = Cart {
        id: CartId::new(),
        owner: CartOwner::Anonymous("sess-1".to_string()),
        currency: "eur".to_string(),
        items: vec![
            CartItem::Unique {
                artwork_id: artwork.id,
                advisory_price: None,
            },
            CartItem::Print {
                edition_id: print.id,
                quantity: 2,
                advisory_price: None,
            },
            CartItem::Digital {
                edition_id: digital.id,
                quantity: 2,
                advisory_price: None,
            },
        ],
        created_at: TimeMs::new(0),
    };
    test.repo.insert_cart(&cart).await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/payments/create-intent")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "cartId": cart.id.to_string(),
                "shippingAddress": {
                    "name": "Ana Buyer",
                    "line1": "Rua das Flores 1",
                    "city": "Lisboa",
                    "postalCode": "1100-001",
                    "country": "PT"
                }
            })
            .to_string(),
        ))
        .unwrap();
    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let order_id = OrderId::parse(body["orderId"].as_str().unwrap()).unwrap();

    (order_id, artwork.id, print.id, digital.id, cart.id)
}

fn signed_event(event: &serde_json::Value) -> Request<Body> {
    let payload = event.to_string();
    let header = sign_payload(
        payload.as_bytes(),
        WEBHOOK_SECRET,
        chrono::Utc::now().timestamp(),
    );

    Request::builder()
        .method("POST")
        .uri("/webhooks/payment")
        .header("payment-signature", header)
        .body(Body::from(payload))
        .unwrap()
}

fn succeeded_event(event_id: &str, transaction_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": transaction_id } }
    })
}

#[tokio::test]
async fn test_payment_succeeded_finalizes_order() {
    let test = setup_app().await;
    let (order_id, artwork_id, print_id, digital_id, cart_id) =
        seed_and_create_order(&test).await;

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    let tx_id = order.transaction_id.clone().unwrap();

    let response = test
        .app
        .clone()
        .oneshot(signed_event(&succeeded_event("evt_1", &tx_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    // Unique piece sold, hold released.
    let artwork = test.repo.get_artwork(&artwork_id).await.unwrap().unwrap();
    assert_eq!(artwork.status, ListingStatus::Sold);
    assert!(test.repo.get_hold(&artwork_id).await.unwrap().is_none());

    // Print stock decremented once.
    let print = test.repo.get_edition(&print_id).await.unwrap().unwrap();
    assert_eq!(print.available, Some(3));

    // Two entitlement tokens minted for the digital line.
    let items = test.repo.list_order_items(&order_id).await.unwrap();
    let digital_item = items
        .iter()
        .find(|i| i.edition_id == Some(digital_id))
        .unwrap();
    let tokens = test.repo.list_entitlements(&digital_item.id).await.unwrap();
    assert_eq!(tokens.len(), 2);

    // One payout per item; zero delay pays them out synchronously.
    let payouts = test.repo.list_payouts_for_order(&order_id).await.unwrap();
    assert_eq!(payouts.len(), 3);
    assert!(payouts.iter().all(|p| p.status == PayoutStatus::Paid));
    let paid_total: i64 = payouts.iter().map(|p| p.amount.as_i64()).sum();
    // floor(250000*0.7) + floor(10000*0.7) + floor(4000*0.7)
    assert_eq!(paid_total, 175_000 + 7_000 + 2_800);

    // Cart destroyed after successful payment.
    assert!(test.repo.get_cart(&cart_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_delivery_is_idempotent() {
    let test = setup_app().await;
    let (order_id, _, print_id, digital_id, _) = seed_and_create_order(&test).await;

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    let tx_id = order.transaction_id.clone().unwrap();

    // Same event id twice, then a distinct event id for the same payment.
    for event_id in ["evt_1", "evt_1", "evt_2"] {
        let response = test
            .app
            .clone()
            .oneshot(signed_event(&succeeded_event(event_id, &tx_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Stock decremented exactly once, entitlements minted exactly once.
    let print = test.repo.get_edition(&print_id).await.unwrap().unwrap();
    assert_eq!(print.available, Some(3));

    let items = test.repo.list_order_items(&order_id).await.unwrap();
    let digital_item = items
        .iter()
        .find(|i| i.edition_id == Some(digital_id))
        .unwrap();
    assert_eq!(
        test.repo
            .list_entitlements(&digital_item.id)
            .await
            .unwrap()
            .len(),
        2
    );

    let payouts = test.repo.list_payouts_for_order(&order_id).await.unwrap();
    assert_eq!(payouts.len(), 3);
}

#[tokio::test]
async fn test_unsigned_event_rejected_without_state_change() {
    let test = setup_app().await;
    let (order_id, _, _, _, _) = seed_and_create_order(&test).await;

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    let tx_id = order.transaction_id.clone().unwrap();

    let payload = succeeded_event("evt_1", &tx_id).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/payment")
        .header("payment-signature", "t=1,v1=deadbeef")
        .body(Body::from(payload))
        .unwrap();

    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_payment_failed_releases_holds() {
    let test = setup_app().await;
    let (order_id, artwork_id, _, _, _) = seed_and_create_order(&test).await;

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    let tx_id = order.transaction_id.clone().unwrap();

    let event = serde_json::json!({
        "id": "evt_fail",
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": tx_id } }
    });
    let response = test.app.clone().oneshot(signed_event(&event)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    assert!(test.repo.get_hold(&artwork_id).await.unwrap().is_none());

    // The artwork was never sold.
    let artwork = test.repo.get_artwork(&artwork_id).await.unwrap().unwrap();
    assert_eq!(artwork.status, ListingStatus::Published);
}

#[tokio::test]
async fn test_out_of_order_failure_after_success_is_noop() {
    let test = setup_app().await;
    let (order_id, _, _, _, _) = seed_and_create_order(&test).await;

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    let tx_id = order.transaction_id.clone().unwrap();

    let response = test
        .app
        .clone()
        .oneshot(signed_event(&succeeded_event("evt_ok", &tx_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A late payment_failed must not clobber the paid state.
    let event = serde_json::json!({
        "id": "evt_late",
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": tx_id } }
    });
    let response = test.app.clone().oneshot(signed_event(&event)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_refund_updates_amount_and_reverses_payouts() {
    let test = setup_app().await;
    let (order_id, _, _, _, _) = seed_and_create_order(&test).await;

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    let tx_id = order.transaction_id.clone().unwrap();
    let charge = order.total.as_i64();

    let response = test
        .app
        .clone()
        .oneshot(signed_event(&succeeded_event("evt_ok", &tx_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let event = serde_json::json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "data": { "object": {
            "payment_intent": tx_id,
            "amount_refunded": charge,
            "amount": charge
        }}
    });
    let response = test.app.clone().oneshot(signed_event(&event)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let order = test.repo.get_order(&order_id).await.unwrap().unwrap();
    // Status never changes on refund; only the refunded amount moves.
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.refunded, order.total);

    let payouts = test.repo.list_payouts_for_order(&order_id).await.unwrap();
    assert!(payouts.iter().all(|p| p.status == PayoutStatus::Reversed));

    // Full refund reverses each payout by exactly what was paid out.
    let reversed: i64 = test
        .gateway
        .reversals
        .lock()
        .unwrap()
        .iter()
        .map(|(_, amount)| amount.as_i64())
        .sum();
    assert_eq!(reversed, 175_000 + 7_000 + 2_800);
}

#[tokio::test]
async fn test_unknown_transaction_acknowledged() {
    let test = setup_app().await;

    let response = test
        .app
        .clone()
        .oneshot(signed_event(&succeeded_event("evt_x", "pi_unknown")))
        .await
        .unwrap();
    // Verified but unactionable events are acknowledged so the provider
    // stops retrying.
    assert_eq!(response.status(), StatusCode::OK);
}
