use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Days, Utc};
use serde_json::{json, Value};
use slotbook_api::{app, AppState};
use slotbook_catalog::{Promo, PromoKind};
use slotbook_store::app_config::BusinessRules;
use slotbook_store::MemoryStore;
use tower::ServiceExt;

struct Fixture {
    app: Router,
    store: MemoryStore,
    experience_id: i64,
    slot_id: i64,
    small_slot_id: i64,
}

/// Kayaking at 99900 with an upcoming slot of 6 seats and one of 5 seats.
async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let today = Utc::now().date_naive();

    let experience_id = store
        .add_experience("Kayaking", "kayaking", 99900, Some("/images/kayak1.jpg"), Some("Udupi, Karnataka"))
        .await;
    let other_id = store.add_experience("Nandi Hills Sunrise", "nandi-hills", 89900, None, None).await;

    let slot_id = store
        .add_slot(experience_id, today.checked_add_days(Days::new(2)).unwrap(), "09:00", 6)
        .await;
    let small_slot_id = store
        .add_slot(experience_id, today.checked_add_days(Days::new(2)).unwrap(), "07:00", 5)
        .await;
    store
        .add_slot(experience_id, today.checked_sub_days(Days::new(1)).unwrap(), "07:00", 5)
        .await;
    store
        .add_slot(other_id, today.checked_add_days(Days::new(3)).unwrap(), "06:00", 12)
        .await;

    store.add_promo(Promo { code: "SAVE10".into(), kind: PromoKind::Percent, value: 10, active: true }).await;
    store.add_promo(Promo { code: "FLAT100".into(), kind: PromoKind::Flat, value: 10000, active: true }).await;
    store.add_promo(Promo { code: "EXPIRED".into(), kind: PromoKind::Flat, value: 500, active: false }).await;

    let state = AppState::in_memory(store.clone(), &BusinessRules::default());
    Fixture {
        app: app(state),
        store,
        experience_id,
        slot_id,
        small_slot_id,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn booking(slot_id: i64, qty: i64) -> Value {
    json!({ "name": "Jane Doe", "email": "jane@example.com", "slotId": slot_id, "qty": qty })
}

#[tokio::test]
async fn test_health() {
    let fx = fixture().await;
    let (status, body) = send(&fx.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let fx = fixture().await;
    let id = "6f1c2b1e-3f6a-4c38-9d2c-8b0a6a1e9f10";
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", id)
        .body(Body::empty())
        .unwrap();
    let response = fx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], id);

    let response = fx.app.clone().oneshot(get("/health")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_list_and_search_experiences() {
    let fx = fixture().await;

    let (status, body) = send(&fx.app, get("/experiences")).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body.as_array().unwrap().iter().map(|e| e["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Kayaking", "Nandi Hills Sunrise"]);
    assert_eq!(body[0]["priceCents"], 99900);

    let (_, body) = send(&fx.app, get("/experiences?search=KAYAK")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&fx.app, get("/experiences?search=")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_experience_detail_lists_upcoming_slots() {
    let fx = fixture().await;

    let (status, body) = send(&fx.app, get(&format!("/experiences/{}", fx.experience_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["experience"]["slug"], "kayaking");

    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["slotTime"], "07:00");
    assert_eq!(slots[1]["slotTime"], "09:00");
    assert_eq!(slots[1]["available"], 6);

    let (status, body) = send(&fx.app, get("/experiences/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(&fx.app, get("/experiences/abc")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_promo_validation() {
    let fx = fixture().await;

    let (status, body) = send(&fx.app, post_json("/promo/validate", json!({ "code": "SAVE10" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["promo"]["type"], "percent");
    assert_eq!(body["promo"]["value"], 10);

    let (status, body) = send(&fx.app, post_json("/promo/validate", json!({ "code": "EXPIRED" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "valid": false }));

    let (status, _) = send(&fx.app, post_json("/promo/validate", json!({ "code": "NOPE" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&fx.app, post_json("/promo/validate", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_booking_and_look_it_up() {
    let fx = fixture().await;

    let mut request = booking(fx.slot_id, 2);
    request["promoCode"] = json!("SAVE10");
    request["experienceId"] = json!(fx.experience_id);
    let (status, body) = send(&fx.app, post_json("/bookings", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    // 199800 - 19980 = 179820, + 6% tax 10789
    assert_eq!(body["totalCents"], 190609);

    let booking_id = body["bookingId"].as_i64().unwrap();
    let reference = body["refId"].as_str().unwrap().to_string();
    assert_eq!(reference.len(), 6);
    assert_eq!(fx.store.slot_booked(fx.slot_id).await, Some(2));

    let (status, first) = send(&fx.app, get(&format!("/bookings/{}", booking_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["refId"], reference.as_str());
    assert_eq!(first["qty"], 2);
    assert_eq!(first["subtotalCents"], 179820);
    assert_eq!(first["discountCents"], 19980);
    assert_eq!(first["taxesCents"], 10789);
    assert_eq!(first["promoCode"], "SAVE10");
    assert_eq!(first["slot"]["id"], fx.slot_id);
    assert_eq!(first["experience"]["title"], "Kayaking");

    let (_, again) = send(&fx.app, get(&format!("/bookings/{}", booking_id))).await;
    assert_eq!(first, again);

    let (status, by_reference) = send(&fx.app, get(&format!("/bookings/{}", reference.to_lowercase()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_reference, first);

    let (status, _) = send(&fx.app, get("/bookings/ZZZZZZ")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_snake_case_payload_with_string_numbers() {
    let fx = fixture().await;
    let request = json!({
        "full_name": "Jane Doe",
        "email": "jane@example.com",
        "slot_id": fx.slot_id.to_string(),
        "qty": "1",
        "promo_code": "FLAT100"
    });
    let (status, body) = send(&fx.app, post_json("/bookings", request)).await;
    assert_eq!(status, StatusCode::OK);
    // 99900 - 10000 = 89900, + 5394 tax
    assert_eq!(body["totalCents"], 95294);
}

#[tokio::test]
async fn test_invalid_bookings_are_rejected() {
    let fx = fixture().await;

    let (status, body) = send(&fx.app, post_json("/bookings", json!({ "email": "jane@example.com" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, _) = send(&fx.app, post_json("/bookings", booking(fx.slot_id, 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method("POST")
        .uri("/bookings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&fx.app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&fx.app, post_json("/bookings", booking(999, 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut wrong_experience = booking(fx.slot_id, 1);
    wrong_experience["experienceId"] = json!(fx.experience_id + 100);
    let (status, _) = send(&fx.app, post_json("/bookings", wrong_experience)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(fx.store.booking_count().await, 0);
    assert_eq!(fx.store.slot_booked(fx.slot_id).await, Some(0));
}

#[tokio::test]
async fn test_capacity_is_exact() {
    let fx = fixture().await;

    let (status, _) = send(&fx.app, post_json("/bookings", booking(fx.small_slot_id, 4))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&fx.app, post_json("/bookings", booking(fx.small_slot_id, 1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fx.store.slot_booked(fx.small_slot_id).await, Some(5));

    let (status, body) = send(&fx.app, post_json("/bookings", booking(fx.small_slot_id, 1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
    assert_eq!(fx.store.slot_booked(fx.small_slot_id).await, Some(5));
    assert_eq!(fx.store.booking_count().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_bookings_for_last_seats() {
    let fx = fixture().await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let app = fx.app.clone();
        let request = post_json("/bookings", booking(fx.small_slot_id, 3));
        handles.push(tokio::spawn(async move { send(&app, request).await.0 }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    statuses.sort();

    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(fx.store.slot_booked(fx.small_slot_id).await, Some(3));
    assert_eq!(fx.store.booked_by_bookings(fx.small_slot_id).await, 3);
}
