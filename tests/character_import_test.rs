//! Character import and relay tests against a fake sheet service

mod common;

use common::{FakeSheetService, TrackerTest};
use serde_json::{json, Value};

async fn tracker_for(sheets: &FakeSheetService) -> TrackerTest {
    let origin = sheets.origin();
    TrackerTest::start_with(move |c| {
        c.character_service_url = origin;
        c.relay_allowed_hosts = vec!["127.0.0.1".to_string()];
    })
    .await
    .expect("Failed to start server")
}

#[tokio::test]
async fn test_import_character() {
    let sheets = FakeSheetService::start().await.unwrap();
    let tracker = tracker_for(&sheets).await;

    let body = tracker
        .post_ok("/combatants/character", &json!({"id": " 43889142 "}), 201)
        .await;
    assert_eq!(body["id"], "43889142");

    let aria = &body["session"]["ordered"][0];
    assert_eq!(aria["name"], "Aria");
    assert_eq!(aria["source"], "ddb");
    assert_eq!(aria["dex"], 14);
    assert_eq!(aria["dexMod"], 2);
    assert!(aria["initiative"].is_null());
    assert!(aria.get("hp").is_none());
}

#[tokio::test]
async fn test_import_uses_score_and_fallback_name() {
    let sheets = FakeSheetService::start().await.unwrap();
    let tracker = tracker_for(&sheets).await;

    let body = tracker
        .post_ok("/combatants/character", &json!({"id": "555"}), 201)
        .await;
    let pc = &body["session"]["ordered"][0];
    assert_eq!(pc["name"], "Character 555");
    assert_eq!(pc["dex"], 8);
    assert_eq!(pc["dexMod"], -1);
}

#[tokio::test]
async fn test_import_failures_add_nothing() {
    let sheets = FakeSheetService::start().await.unwrap();
    let tracker = tracker_for(&sheets).await;

    let cases = [
        ("404", 502, "Fetch failed (404)"),
        ("nodata", 502, "Character data missing"),
        ("garbage", 502, "Failed to parse response"),
        ("   ", 400, "empty"),
    ];
    for (id, status, message) in cases {
        let body = tracker
            .post_ok("/combatants/character", &json!({ "id": id }), status)
            .await;
        let error = body["error"].as_str().unwrap();
        assert!(error.contains(message), "{} -> {}", id, error);
    }

    let session = tracker.session().await;
    assert_eq!(session["ordered"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_import_twice_conflicts() {
    let sheets = FakeSheetService::start().await.unwrap();
    let tracker = tracker_for(&sheets).await;

    tracker
        .post_ok("/combatants/character", &json!({"id": "43889142"}), 201)
        .await;
    tracker
        .post_ok("/combatants/character", &json!({"id": "43889142"}), 409)
        .await;

    let session = tracker.session().await;
    assert_eq!(session["ordered"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_roll_all_monsters_leaves_characters() {
    let sheets = FakeSheetService::start().await.unwrap();
    let tracker = tracker_for(&sheets).await;

    tracker
        .post_ok("/combatants/character", &json!({"id": "43889142"}), 201)
        .await;
    let goblin = tracker.add_monster("Goblin", 7, 0).await;

    let session = tracker.post_ok("/combat/roll-monsters", &json!({}), 200).await;
    let ordered = session["ordered"].as_array().unwrap();
    let pc = ordered.iter().find(|c| c["id"] == "43889142").unwrap();
    let mon = ordered.iter().find(|c| c["id"] == goblin.as_str()).unwrap();
    assert!(pc["initiative"].is_null());
    let rolled = mon["initiative"].as_i64().unwrap();
    assert!((1..=20).contains(&rolled));
}

#[tokio::test]
async fn test_import_through_relay() {
    let sheets = FakeSheetService::start().await.unwrap();

    // First server only relays; the second fetches through it
    let relay = tracker_for(&sheets).await;
    let relay_origin = relay.base_url();
    let origin = sheets.origin();
    let tracker = TrackerTest::start_with(move |c| {
        c.character_service_url = origin;
        c.relay_origin = Some(relay_origin);
    })
    .await
    .expect("Failed to start server");

    let body = tracker
        .post_ok("/combatants/character", &json!({"id": "43889142"}), 201)
        .await;
    assert_eq!(body["session"]["ordered"][0]["name"], "Aria");
}

#[tokio::test]
async fn test_relay_forwards_with_cors() {
    let sheets = FakeSheetService::start().await.unwrap();
    let tracker = tracker_for(&sheets).await;

    let target = format!("{}/character/v5/character/43889142", sheets.origin());
    let resp = tracker
        .client
        .get(format!("{}/fetch", tracker.base_url()))
        .query(&[("url", target.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
    assert!(headers.get("content-security-policy").is_none());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Aria");
}

#[tokio::test]
async fn test_relay_passes_upstream_status() {
    let sheets = FakeSheetService::start().await.unwrap();
    let tracker = tracker_for(&sheets).await;

    let target = format!("{}/character/v5/character/404", sheets.origin());
    let resp = tracker
        .client
        .get(format!("{}/fetch", tracker.base_url()))
        .query(&[("url", target.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_relay_rejections() {
    let tracker = TrackerTest::start().await.expect("Failed to start server");

    let resp = tracker.get("/fetch").await.unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "Missing url param");

    let resp = tracker.get("/fetch?url=%3A%3Anope").await.unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "Bad target URL");

    let resp = tracker
        .get("/fetch?url=https%3A%2F%2Fexample.com%2F")
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(resp.text().await.unwrap(), "Target not allowed");
}

#[tokio::test]
async fn test_relay_preflight() {
    let tracker = TrackerTest::start().await.expect("Failed to start server");

    let resp = tracker
        .client
        .request(reqwest::Method::OPTIONS, format!("{}/fetch", tracker.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(resp.headers()["access-control-allow-headers"], "Content-Type");
}
