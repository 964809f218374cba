//! HTTP Server & Routing Integration Tests
//! Test File: http_server_tests.rs

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use dreamly_roots::build_router;
use dreamly_roots::text::Language;
use helpers::{test_app, test_app_with_token};

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// TC-HTTP-001: Health endpoint reports module identity
#[tokio::test]
async fn tc_http_001_health_check() {
    // Given: Running server
    let app = build_router(test_app().await.state);

    // When: GET /health
    let response = app.oneshot(get("/health")).await.unwrap();

    // Then: Returns module identity and uptime
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "dreamly-roots");
    assert!(json["uptime_seconds"].is_u64());
    assert!(json.get("last_error").is_none());
}

/// TC-HTTP-002: Missing text is rejected without a model call
#[tokio::test]
async fn tc_http_002_rootwords_missing_text() {
    let test = test_app().await;
    let model = test.model.clone();
    let app = build_router(test.state);

    let response = app
        .oneshot(post_json("/api/dreams/rootwords", json!({"text": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert_eq!(model.call_count(), 0);
}

/// TC-HTTP-003: Root words for a Russian dream come back with aligned English roots
#[tokio::test]
async fn tc_http_003_rootwords_with_translation() {
    let test = test_app().await;
    test.model.push_json(
        "root_words",
        json!({"lang": "ru", "core": ["Лес", "колокол"], "support": ["ветер"], "themes": ["тревога"]}),
    );
    test.model.push_json(
        "roots_translation",
        json!({"rootsEn": ["forest", "bell", "wind"]}),
    );
    let app = build_router(test.state);

    let response = app
        .oneshot(post_json(
            "/api/dreams/rootwords",
            json!({"text": "Лес, колокол и ветер"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["lang"], "ru");
    assert_eq!(json["roots"], json!(["Лес", "колокол", "ветер"]));
    assert_eq!(json["rootsEn"], json!(["forest", "bell", "wind"]));
    assert_eq!(json["core"], json!(["Лес", "колокол"]));
    assert_eq!(json["themes"], json!(["тревога"]));
}

/// TC-HTTP-004: Extraction failure surfaces as 500 and is recorded for /health
#[tokio::test]
async fn tc_http_004_rootwords_extraction_failure() {
    let test = test_app().await;
    let state = test.state.clone();
    let app = build_router(test.state);

    let response = app
        .oneshot(post_json("/api/dreams/rootwords", json!({"text": "a burning forest"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(state.last_error.read().await.is_some());
}

/// TC-HTTP-005: Emoji pick input validation
#[tokio::test]
async fn tc_http_005_emoji_pick_validation() {
    let test = test_app().await;
    let model = test.model.clone();
    let app = build_router(test.state);

    let missing_root = app
        .clone()
        .oneshot(post_json(
            "/api/dreams/emoji-pick",
            json!({"candidates": [{"native": "🌲", "id": "evergreen_tree"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(missing_root.status(), StatusCode::BAD_REQUEST);

    let missing_candidates = app
        .clone()
        .oneshot(post_json("/api/dreams/emoji-pick", json!({"root": "forest"})))
        .await
        .unwrap();
    assert_eq!(missing_candidates.status(), StatusCode::BAD_REQUEST);

    let no_valid = app
        .oneshot(post_json(
            "/api/dreams/emoji-pick",
            json!({"root": "forest", "candidates": [{"native": "  ", "id": "blank"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(no_valid.status(), StatusCode::BAD_REQUEST);

    assert_eq!(model.call_count(), 0);
}

/// TC-HTTP-006: Emoji pick outside the submitted set falls back to the first candidate
#[tokio::test]
async fn tc_http_006_emoji_pick_fallback() {
    let test = test_app().await;
    test.model
        .push_json("emoji_pick", json!({"native": "🚩", "reason": "flag"}));
    let app = build_router(test.state);

    let response = app
        .oneshot(post_json(
            "/api/dreams/emoji-pick",
            json!({
                "root": "forest",
                "lang": "en",
                "candidates": [
                    {"native": "🌲", "id": "evergreen_tree", "name": "Evergreen Tree", "keywords": ["forest"]},
                    {"native": "🌳", "id": "deciduous_tree", "name": "Deciduous Tree"}
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["native"], "🌲");
    assert_eq!(json["reason"], "fallback_first_candidate");
}

/// TC-HTTP-007: Dream lifecycle over HTTP: create, process, fetch, ingest
#[tokio::test]
async fn tc_http_007_dream_lifecycle() {
    let test = test_app().await;
    test.model.push_json(
        "root_words",
        json!({"lang": "en", "core": ["fire", "forest"], "support": [], "themes": []}),
    );
    let app = build_router(test.state);

    // Create
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users/u1/dreams",
            json!({"text": "I was flying over a burning forest"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let dream_id = created["dreamId"].as_str().unwrap().to_string();
    assert_eq!(created["roots"], json!([]));

    // Process
    let response = app
        .clone()
        .oneshot(post_json(&format!("/api/users/u1/dreams/{}/roots", dream_id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["status"], "processed");
    assert_eq!(outcome["roots"], json!(["fire", "forest"]));
    assert_eq!(outcome["emojis"][0]["native"], "🔥");

    // Second run is a no-op
    let response = app
        .clone()
        .oneshot(post_json(&format!("/api/users/u1/dreams/{}/roots", dream_id), json!({})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "already_processed");

    // Fetch
    let response = app
        .clone()
        .oneshot(get(&format!("/api/users/u1/dreams/{}", dream_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stored = body_json(response).await;
    assert_eq!(stored["rootsLang"], "en");
    assert_eq!(stored["emojis"][0]["native"], "🔥");

    // Ingest twice
    let ingest = json!({"uid": "u1", "dreamId": dream_id});
    let response = app
        .clone()
        .oneshot(post_json("/api/map/ingest-dream", ingest.clone()))
        .await
        .unwrap();
    let first = body_json(response).await;
    assert_eq!(first["ok"], true);
    assert_eq!(first["cityId"], "US|DC|Washington");
    assert!(first.get("skipped").is_none());

    let response = app
        .clone()
        .oneshot(post_json("/api/map/ingest-dream", ingest))
        .await
        .unwrap();
    let second = body_json(response).await;
    assert_eq!(second["skipped"], true);

    // Stats
    let response = app.clone().oneshot(get("/api/map/users/u1")).await.unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["totalDreams"], 1);
    assert_eq!(stats["emojis"][0]["native"], "🔥");

    let response = app.oneshot(get("/api/map/cities")).await.unwrap();
    let cities = body_json(response).await;
    assert_eq!(cities["cities"][0]["cityId"], "US|DC|Washington");
    assert_eq!(cities["cities"][0]["totalDreams"], 1);
}

/// TC-HTTP-008: Unknown dream answers 404 with the error envelope
#[tokio::test]
async fn tc_http_008_unknown_dream() {
    let app = build_router(test_app().await.state);

    let response = app
        .clone()
        .oneshot(get("/api/users/u1/dreams/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");

    let response = app
        .oneshot(post_json(
            "/api/map/ingest-dream",
            json!({"uid": "u1", "dreamId": "missing"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// TC-HTTP-009: Analysis is stored on the dream
#[tokio::test]
async fn tc_http_009_analyze_dream() {
    let test = test_app().await;
    let store = test.state.store.clone();
    let dream = store.create_dream("u1", "Я гулял в лесу").await.unwrap();
    test.model.push_text("Лес часто отражает поиск себя.");
    let app = build_router(test.state);

    let response = app
        .oneshot(post_json(
            &format!("/api/users/u1/dreams/{}/analyze", dream.dream_id),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["model"], "scripted-model");

    let stored = store.get_dream("u1", &dream.dream_id).await.unwrap().unwrap();
    assert_eq!(stored.analysis_text.as_deref(), Some("Лес часто отражает поиск себя."));
    assert_eq!(stored.analysis_model.as_deref(), Some("scripted-model"));
}

/// TC-HTTP-010: Admin routes require the bearer token when configured
#[tokio::test]
async fn tc_http_010_admin_requires_token() {
    let app = build_router(test_app_with_token(Some("s3cret")).await.state);

    let response = app
        .clone()
        .oneshot(get("/api/admin/emoji-overrides"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/emoji-overrides")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/emoji-overrides")
                .header(header::AUTHORIZATION, "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// TC-HTTP-011: Override metadata takes effect for ranking after save
#[tokio::test]
async fn tc_http_011_override_changes_ranking() {
    let test = test_app().await;
    let state = test.state.clone();
    let app = build_router(test.state);
    let score_of = |ranked: &[dreamly_roots::emoji::EmojiCandidate], id: &str| {
        ranked.iter().find(|c| c.id == id).map(|c| c.score)
    };

    // Given: both trees match "forest" by keyword only
    let before = state.resolver.rank_candidates("forest", Language::En).await;
    let library_score = score_of(&before, "deciduous_tree").unwrap();

    // When: the deciduous tree is renamed "Forest"
    let response = app
        .clone()
        .oneshot(put_json(
            "/api/admin/emoji-overrides/deciduous_tree",
            json!({"name": "Forest"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Then: the exact name match puts it first, with effective metadata in search
    let after = state.resolver.rank_candidates("forest", Language::En).await;
    assert_eq!(after[0].id, "deciduous_tree");
    assert!(after[0].score > library_score);

    let response = app
        .clone()
        .oneshot(get("/api/admin/emoji-search?q=forest"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["ranked"][0]["id"], "deciduous_tree");
    let hit = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|h| h["id"] == "deciduous_tree")
        .unwrap();
    assert_eq!(hit["name"], "Forest");
    assert_eq!(hit["overridden"], true);

    // And: deleting restores library metadata
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/emoji-overrides/deciduous_tree")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["deleted"], true);
    let restored = state.resolver.rank_candidates("forest", Language::En).await;
    assert_eq!(score_of(&restored, "deciduous_tree"), Some(library_score));
}

/// TC-HTTP-012: Hints remap a root before search
#[tokio::test]
async fn tc_http_012_hints_remap_root() {
    let test = test_app().await;
    let state = test.state.clone();
    let app = build_router(test.state);

    let response = app
        .clone()
        .oneshot(put_json(
            "/api/admin/emoji-hints",
            json!({"hints": {" Blaze ": "Fire"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["hints"], json!({"blaze": "fire"}));

    let ranked = state
        .resolver
        .rank_candidates("blaze", Language::En)
        .await;
    assert_eq!(ranked[0].native, "🔥");

    let response = app.oneshot(get("/api/admin/emoji-hints")).await.unwrap();
    assert_eq!(body_json(response).await["hints"]["blaze"], "fire");
}

/// TC-HTTP-013: Settings validation
#[tokio::test]
async fn tc_http_013_settings() {
    let test = test_app().await;
    let db = test.state.db.clone();
    let app = build_router(test.state);

    let response = app
        .clone()
        .oneshot(put_json("/api/admin/settings", json!({"defaultCity": "nowhere"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(put_json(
            "/api/admin/settings",
            json!({"modelApiKey": " sk-test ", "defaultCity": "IL|TA|Tel Aviv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        dreamly_roots::db::settings::get_model_api_key(&db).await.unwrap(),
        Some("sk-test".to_string())
    );
    assert_eq!(
        dreamly_roots::db::settings::get_default_city(&db).await.unwrap(),
        Some("IL|TA|Tel Aviv".to_string())
    );
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// TC-HTTP-014: Malformed or mistyped JSON bodies answer 400 with the error envelope
#[tokio::test]
async fn tc_http_014_json_rejections_use_error_envelope() {
    let test = test_app().await;
    let model = test.model.clone();
    let app = build_router(test.state);

    // Given: a body that is not JSON at all
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/dreams/rootwords")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    // Then: 400 with a JSON error body, not axum's plain-text rejection
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"].as_str().unwrap().starts_with("Invalid JSON body"));

    // Given: candidates of the wrong type
    let response = app
        .oneshot(post_json(
            "/api/dreams/emoji-pick",
            json!({"root": "forest", "candidates": "abc"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "Missing candidates");

    assert_eq!(model.call_count(), 0);
}

/// TC-HTTP-015: Emoji pick reads candidates leniently and sends unknown lang
#[tokio::test]
async fn tc_http_015_emoji_pick_lenient_candidates() {
    let test = test_app().await;
    let model = test.model.clone();
    let app = build_router(test.state);

    // Given: a numeric glyph and no lang; the model is unscripted and fails
    let response = app
        .oneshot(post_json(
            "/api/dreams/emoji-pick",
            json!({"root": "five", "candidates": [{"native": 5, "id": "five", "keywords": [1, "count"]}]}),
        ))
        .await
        .unwrap();

    // Then: the coerced candidate is picked via fallback
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["native"], "5");
    assert_eq!(json["reason"], "fallback_first_candidate");

    // And: the model saw lang "unknown"
    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(r#""lang": "unknown""#));
}

/// TC-HTTP-016: Override save validates icon key and emoji id
#[tokio::test]
async fn tc_http_016_override_validation() {
    let app = build_router(test_app().await.state);

    let response = app
        .clone()
        .oneshot(put_json(
            "/api/admin/emoji-overrides/deciduous_tree",
            json!({"iconKey": "spaceship"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(put_json(
            "/api/admin/emoji-overrides/no_such_emoji",
            json!({"name": "Ghost"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");

    let response = app
        .oneshot(put_json(
            "/api/admin/emoji-overrides/deciduous_tree",
            json!({"iconKey": "forest"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// TC-HTTP-017: Listing, sharing and soft delete of dreams
#[tokio::test]
async fn tc_http_017_share_and_soft_delete() {
    let test = test_app().await;
    let store = test.state.store.clone();
    let kept = store.create_dream("u1", "I was swimming").await.unwrap();
    let dream = store.create_dream("u1", "I was flying").await.unwrap();
    let app = build_router(test.state);

    // Given: both dreams listed
    let response = app.clone().oneshot(get("/api/users/u1/dreams")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["dreams"].as_array().unwrap().len(), 2);

    // When: one is shared
    let share_uri = format!("/api/users/u1/dreams/{}/share", dream.dream_id);
    let response = app
        .clone()
        .oneshot(post_json(&share_uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["shared"], true);

    // Then: it appears in the feed
    let response = app.clone().oneshot(get("/api/shared")).await.unwrap();
    let feed = body_json(response).await;
    assert_eq!(feed["dreams"][0]["sharedId"], format!("u1_{}", dream.dream_id));
    assert_eq!(feed["dreams"][0]["text"], "I was flying");
    assert_eq!(feed["dreams"][0]["reactions"], json!({"heart": 0, "like": 0, "star": 0}));

    // When: it is deleted
    let response = app
        .clone()
        .oneshot(delete(&format!("/api/users/u1/dreams/{}", dream.dream_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], true);

    // Then: it leaves the list, the feed and direct fetch
    let response = app.clone().oneshot(get("/api/users/u1/dreams")).await.unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed["dreams"].as_array().unwrap().len(), 1);
    assert_eq!(listed["dreams"][0]["dreamId"], kept.dream_id.as_str());

    let response = app.clone().oneshot(get("/api/shared")).await.unwrap();
    assert_eq!(body_json(response).await["dreams"], json!([]));

    let response = app
        .oneshot(get(&format!("/api/users/u1/dreams/{}", dream.dream_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// TC-HTTP-018: Reaction toggles are per user and never go below zero
#[tokio::test]
async fn tc_http_018_reaction_toggles() {
    let test = test_app().await;
    let store = test.state.store.clone();
    let dream = store.create_dream("owner", "A red door").await.unwrap();
    store.share_dream("owner", &dream.dream_id).await.unwrap();
    let app = build_router(test.state);
    let uri = format!("/api/shared/owner_{}/reactions", dream.dream_id);

    // Given: u1 hearts twice; the toggles cancel out
    let response = app
        .clone()
        .oneshot(post_json(&uri, json!({"uid": "u1", "key": "heart"})))
        .await
        .unwrap();
    let first = body_json(response).await;
    assert_eq!(first["on"], true);
    assert_eq!(first["reactions"]["heart"], 1);

    let response = app
        .clone()
        .oneshot(post_json(&uri, json!({"uid": "u1", "key": "heart"})))
        .await
        .unwrap();
    let second = body_json(response).await;
    assert_eq!(second["on"], false);
    assert_eq!(second["reactions"]["heart"], 0);

    // When: two users like it
    for uid in ["u1", "u2"] {
        app.clone()
            .oneshot(post_json(&uri, json!({"uid": uid, "key": "like"})))
            .await
            .unwrap();
    }

    // Then: the feed shows the count and the viewer's own state
    let response = app.clone().oneshot(get("/api/shared?uid=u2")).await.unwrap();
    let feed = body_json(response).await;
    assert_eq!(feed["dreams"][0]["reactions"], json!({"heart": 0, "like": 2, "star": 0}));
    assert_eq!(
        feed["dreams"][0]["myReactions"],
        json!({"heart": false, "like": true, "star": false})
    );

    // And: bad keys and unknown shares are rejected
    let response = app
        .clone()
        .oneshot(post_json(&uri, json!({"uid": "u1", "key": "clap"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/api/shared/owner_missing/reactions",
            json!({"uid": "u1", "key": "star"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
