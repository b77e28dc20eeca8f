//! HTTP surface tests driving the axum router in-process with fake
//! upstreams for the chat model and the result store.

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use car_match::catalog::Catalog;
use car_match::clients::{ChatMessage, ChatModel, LlmError};
use car_match::config::Config;
use car_match::error::Result as CmResult;
use car_match::http::{AppState, SOURCE_HEADER, router};
use car_match::scoring::Scorer;
use car_match::store::{AuthUser, ListQuery, Page, Profile, ResultRecord, ResultStore, Table};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

struct FakeChat {
    reply: std::result::Result<String, String>,
    calls: Mutex<usize>,
}

impl FakeChat {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("connection reset".to_string()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _json_mode: bool,
    ) -> std::result::Result<String, LlmError> {
        *self.calls.lock().unwrap() += 1;
        self.reply.clone().map_err(LlmError::Transport)
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

#[derive(Default)]
struct FakeStore {
    inserted: Mutex<Vec<(Table, ResultRecord)>>,
    profiles: Mutex<Vec<Profile>>,
    rows: Vec<ResultRecord>,
}

fn user_for(token: &str) -> Option<AuthUser> {
    match token {
        "admin-token" => Some(AuthUser {
            id: "admin-1".into(),
            email: Some("Boss@Example.com".into()),
        }),
        "user-token" => Some(AuthUser {
            id: "user-1".into(),
            email: Some("someone@example.com".into()),
        }),
        _ => None,
    }
}

#[async_trait]
impl ResultStore for FakeStore {
    async fn user_for_token(&self, token: &str) -> CmResult<Option<AuthUser>> {
        Ok(user_for(token))
    }

    async fn upsert_profile(&self, profile: &Profile) -> CmResult<()> {
        self.profiles.lock().unwrap().push(profile.clone());
        Ok(())
    }

    async fn insert_result(&self, table: Table, record: &ResultRecord) -> CmResult<()> {
        self.inserted.lock().unwrap().push((table, record.clone()));
        Ok(())
    }

    async fn list_results(&self, _table: Table, query: &ListQuery) -> CmResult<Page<ResultRecord>> {
        let term = query.search_term().map(|t| t.to_lowercase());
        let matching: Vec<ResultRecord> = self
            .rows
            .iter()
            .filter(|r| match &term {
                Some(t) => r.top_pick.to_lowercase().contains(t),
                None => true,
            })
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let rows = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size() as usize)
            .collect();
        Ok(Page {
            rows,
            total,
            page: query.page(),
            page_size: query.page_size(),
        })
    }

    async fn count(&self, table: Table) -> CmResult<u64> {
        Ok(match table {
            Table::Results => self.rows.len() as u64,
            Table::GuestResults => 2,
            Table::Profiles => 5,
        })
    }

    async fn cached_image(&self, slug: &str) -> CmResult<Option<String>> {
        Ok((slug == "toyota-rav4").then(|| "https://cdn.example.com/toyota-rav4.png".to_string()))
    }
}

fn sample_rows() -> Vec<ResultRecord> {
    let scorer = Scorer::new(Arc::new(Catalog::default()));
    let picks = scorer.recommend(&car_match::AnswerSet::text("family suv"));
    let mut a = ResultRecord::new(json!({}), picks.clone(), "scorer");
    a.id = Some(json!(1));
    a.email = Some("x@example.com".into());
    let mut b = ResultRecord::new(json!({}), picks.into_iter().rev().collect(), "llm");
    b.id = Some(json!(2));
    vec![a, b]
}

fn config() -> Config {
    let mut config = Config::default();
    config.runtime.admin_emails = vec!["boss@example.com".to_string()];
    config
}

fn base_state() -> AppState {
    AppState::new(config(), Scorer::new(Arc::new(Catalog::default())))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, _, body) = send(router(base_state()), get_with_token("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn recommend_returns_three_picks_offline() {
    let body = json!({"answers": [
        {"question": "usage", "answer": "family road trips, need space"},
        {"question": "budget", "answer": "around 900 a month"}
    ]})
    .to_string();
    let (status, headers, bytes) = send(router(base_state()), post_json("/recommend", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[SOURCE_HEADER], "scorer");
    let picks = json_body(&bytes);
    let picks = picks.as_array().unwrap();
    assert_eq!(picks.len(), 3);
    assert_eq!(picks[0]["brand"], "Toyota");
    assert_eq!(picks[0]["model"], "RAV4");
    assert!(picks.iter().all(|p| p["reason"].as_str().is_some_and(|r| !r.is_empty())));
    assert!(picks.iter().all(|p| p["image"].as_str().is_some_and(|r| !r.is_empty())));
}

#[tokio::test]
async fn recommend_with_empty_answers_still_answers() {
    let (status, _, bytes) =
        send(router(base_state()), post_json("/recommend", r#"{"answers": {}}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&bytes).as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn recommend_rejects_bad_input() {
    let (status, _, bytes) = send(router(base_state()), post_json("/recommend", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&bytes)["error"], "invalid_json");

    let (status, _, bytes) = send(
        router(base_state()),
        post_json("/recommend", r#"{"other": 1}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&bytes)["error"], "missing_answers");
    assert!(json_body(&bytes)["detail"].is_string());
}

#[tokio::test]
async fn llm_picks_are_used_when_valid() {
    let chat = FakeChat::replying(
        r#"{"picks":[
            {"brand":"Kia","model":"EV6","reason":"Quick and efficient."},
            {"brand":"BYD","model":"Dolphin"}
        ]}"#,
    );
    let state = base_state().with_chat_model(chat.clone());
    let (status, headers, bytes) =
        send(router(state), post_json("/recommend", r#"{"answers": "electric"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[SOURCE_HEADER], "llm");
    let picks = json_body(&bytes);
    assert_eq!(picks[0]["reason"], "Quick and efficient.");
    assert_eq!(picks[1]["image"], "/image/byd-dolphin");
    assert!(picks[1]["reason"].as_str().unwrap().contains("electric"));
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn llm_failures_fall_back_to_scorer() {
    let offline = base_state();
    let expected = {
        let (_, _, bytes) = send(
            router(offline),
            post_json("/recommend?offline=1", r#"{"answers": "cheap hatch for the city"}"#),
        )
        .await;
        json_body(&bytes)
    };

    for chat in [
        FakeChat::failing(),
        FakeChat::replying("I think you should buy a Corolla!"),
        FakeChat::replying("[]"),
        FakeChat::replying(r#"[{"brand":"Toyota"}]"#),
        FakeChat::replying(r#"[{"brand":"!!","model":"??"}]"#),
    ] {
        let state = base_state().with_chat_model(chat.clone());
        let (status, headers, bytes) = send(
            router(state),
            post_json("/recommend", r#"{"answers": "cheap hatch for the city"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[SOURCE_HEADER], "scorer");
        assert_eq!(json_body(&bytes), expected);
        assert_eq!(chat.calls(), 1);
    }
}

#[tokio::test]
async fn offline_flag_skips_llm() {
    let chat = FakeChat::replying(r#"[{"brand":"Kia","model":"EV6"}]"#);
    let state = base_state().with_chat_model(chat.clone());
    let (_, headers, _) = send(
        router(state),
        post_json("/recommend?mode=offline", r#"{"answers": "electric"}"#),
    )
    .await;
    assert_eq!(headers[SOURCE_HEADER], "scorer");
    assert_eq!(chat.calls(), 0);
}

#[tokio::test]
async fn results_are_persisted_for_users_and_guests() {
    let store = Arc::new(FakeStore::default());
    let state = base_state().with_store(store.clone());

    let mut request = post_json("/recommend", r#"{"answers": "suv"}"#);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer user-token".parse().unwrap());
    send(router(state.clone()), request).await;
    send(router(state), post_json("/recommend", r#"{"answers": "suv"}"#)).await;

    let inserted = store.inserted.lock().unwrap();
    assert_eq!(inserted.len(), 2);
    assert_eq!(inserted[0].0, Table::Results);
    assert_eq!(inserted[0].1.user_id.as_deref(), Some("user-1"));
    assert_eq!(inserted[0].1.source, "scorer");
    assert_eq!(inserted[1].0, Table::GuestResults);
    assert!(inserted[1].1.guest_id.is_some());
    assert_eq!(inserted[1].1.picks.len(), 3);
}

#[tokio::test]
async fn chat_requires_model_and_message() {
    let (status, _, bytes) =
        send(router(base_state()), post_json("/chat", r#"{"message": "hi"}"#)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(&bytes)["error"], "unavailable");

    let state = base_state().with_chat_model(FakeChat::replying("Try a hatchback."));
    let (status, _, _) = send(
        router(state.clone()),
        post_json("/chat", r#"{"messages": []}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, bytes) = send(
        router(state),
        post_json("/chat", r#"{"messages": [{"role": "user", "content": "small car?"}]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&bytes)["reply"], "Try a hatchback.");
}

#[tokio::test]
async fn chat_upstream_error_is_surfaced() {
    let state = base_state().with_chat_model(FakeChat::failing());
    let (status, _, bytes) = send(router(state), post_json("/chat", r#"{"message": "hi"}"#)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(&bytes)["error"], "upstream_error");
}

#[tokio::test]
async fn admin_routes_are_gated() {
    let (status, _, _) = send(
        router(base_state()),
        get_with_token("/admin/stats", Some("admin-token")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let state = base_state().with_store(Arc::new(FakeStore::default()));
    let (status, _, _) = send(router(state.clone()), get_with_token("/admin/stats", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(
        router(state.clone()),
        get_with_token("/admin/stats", Some("bogus")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, bytes) =
        send(router(state.clone()), get_with_token("/admin/stats", Some("user-token"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json_body(&bytes)["error"], "forbidden");

    let (status, _, bytes) = send(
        router(state),
        get_with_token("/admin/stats", Some("admin-token")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stats = json_body(&bytes);
    assert_eq!(stats["guest_results"], 2);
    assert_eq!(stats["profiles"], 5);
}

#[tokio::test]
async fn admin_listing_paginates_searches_and_exports() {
    let store = Arc::new(FakeStore {
        rows: sample_rows(),
        ..Default::default()
    });
    let state = base_state().with_store(store);

    let (status, _, bytes) = send(
        router(state.clone()),
        get_with_token("/admin/results?page=1&page_size=1", Some("admin-token")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page = json_body(&bytes);
    assert_eq!(page["total"], 2);
    assert_eq!(page["rows"].as_array().unwrap().len(), 1);
    assert_eq!(page["page_size"], 1);

    let (_, _, bytes) = send(
        router(state.clone()),
        get_with_token("/admin/results?search=RAV4", Some("admin-token")),
    )
    .await;
    assert_eq!(json_body(&bytes)["total"], 1);

    let (status, headers, bytes) = send(
        router(state),
        get_with_token("/admin/results?format=csv", Some("admin-token")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let csv = String::from_utf8(bytes).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,created_at,email"));
    assert!(lines[1].starts_with("1,,x@example.com,,scorer,Toyota RAV4"));
}

#[tokio::test]
async fn profile_upsert_uses_token_identity() {
    let store = Arc::new(FakeStore::default());
    let state = base_state().with_store(store.clone());

    let (status, _, _) = send(
        router(state.clone()),
        post_json("/profile", r#"{"city": "Lisbon"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = post_json("/profile", r#"{"city": "Lisbon", "full_name": "Sam"}"#);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer user-token".parse().unwrap());
    let (status, _, _) = send(router(state), request).await;
    assert_eq!(status, StatusCode::OK);

    let profiles = store.profiles.lock().unwrap();
    assert_eq!(profiles[0].id, "user-1");
    assert_eq!(profiles[0].city.as_deref(), Some("Lisbon"));
}

#[tokio::test]
async fn images_redirect_or_render_placeholder() {
    let state = base_state().with_store(Arc::new(FakeStore::default()));

    let (status, headers, _) = send(
        router(state.clone()),
        get_with_token("/image/toyota-rav4", None),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "https://cdn.example.com/toyota-rav4.png");

    let (status, headers, bytes) = send(
        router(state),
        get_with_token("/image/kia-ev6", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
    assert!(String::from_utf8(bytes).unwrap().contains("Kia Ev6"));
}
