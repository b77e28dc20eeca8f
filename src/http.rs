//! HTTP transport for car-match
//!
//! Axum router with the recommendation, chat, profile, admin listing and
//! image endpoints. Errors render as `{error, detail}` JSON.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::answers::AnswerSet;
use crate::catalog::Catalog;
use crate::clients::{ChatMessage, ChatModel, OpenAiClient};
use crate::config::Config;
use crate::error::{CarMatchError, Result};
use crate::export::results_to_csv;
use crate::images::{label_from_slug, placeholder_svg, slugify};
use crate::recommend::{EnrichedRecommender, Recommender, ScorerRecommender};
use crate::scoring::Scorer;
use crate::store::{AuthUser, ListQuery, Profile, ResultRecord, ResultStore, SupabaseStore, Table};

const CHAT_SYSTEM_PROMPT: &str = "You are a friendly assistant helping people choose a car. \
Answer briefly and practically. If asked about something unrelated to cars, steer back politely.";

/// Header carrying which path produced the picks
pub const SOURCE_HEADER: &str = "x-recommendation-source";

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scorer: ScorerRecommender,
    pub enriched: Option<Arc<dyn Recommender>>,
    pub chat: Option<Arc<dyn ChatModel>>,
    pub store: Option<Arc<dyn ResultStore>>,
}

impl AppState {
    pub fn new(config: Config, scorer: Scorer) -> Self {
        Self {
            config: Arc::new(config),
            scorer: ScorerRecommender::new(Arc::new(scorer)),
            enriched: None,
            chat: None,
            store: None,
        }
    }

    /// Enables both LLM enrichment and the chat endpoint
    pub fn with_chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.enriched = Some(Arc::new(EnrichedRecommender::new(
            model.clone(),
            self.scorer.clone(),
        )));
        self.chat = Some(model);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Wire catalog, scorer, LLM client and store from configuration
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let catalog = match &config.scoring.catalog_path {
            Some(path) => Catalog::from_toml_file(path)?,
            None => Catalog::default(),
        };
        tracing::info!("Catalog loaded with {} items", catalog.len());

        let scorer = Scorer::new(Arc::new(catalog))
            .with_weights(config.scoring.weights.clone())
            .with_image_base_url(config.images.base_url.clone());

        let chat_model: Option<Arc<dyn ChatModel>> = match &config.runtime.openai_api_key {
            Some(key) if config.llm.enabled => Some(Arc::new(OpenAiClient::new(
                key.clone(),
                &config.llm,
                config.runtime.llm_timeout_ms,
            )?)),
            _ => None,
        };

        let store: Option<Arc<dyn ResultStore>> = match (
            &config.runtime.supabase_url,
            &config.runtime.supabase_service_key,
        ) {
            (Some(url), Some(key)) => Some(Arc::new(
                SupabaseStore::new(
                    url,
                    key.clone(),
                    config.store.clone(),
                    &config.images,
                    config.runtime.store_timeout_ms,
                )
                .map_err(|e| anyhow::anyhow!(e.to_string()))?,
            )),
            _ => None,
        };

        let mut state = Self::new(config, scorer);
        if let Some(model) = chat_model {
            state = state.with_chat_model(model);
        }
        if let Some(store) = store {
            state = state.with_store(store);
        }
        Ok(state)
    }

    fn store(&self) -> Result<&Arc<dyn ResultStore>> {
        self.store.as_ref().ok_or_else(|| CarMatchError::Unavailable {
            message: "database is not configured".to_string(),
        })
    }

    fn is_admin(&self, user: &AuthUser) -> bool {
        user.email
            .as_deref()
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.config.runtime.admin_emails.contains(&e))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser> {
    let store = state.store()?;
    let token = bearer_token(headers).ok_or_else(|| CarMatchError::Unauthorized {
        message: "missing bearer token".to_string(),
    })?;
    store
        .user_for_token(token)
        .await?
        .ok_or_else(|| CarMatchError::Unauthorized {
            message: "invalid or expired token".to_string(),
        })
}

/// Admin gate: valid user token whose email is on the admin list
async fn admin_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let user = match require_user(&state, req.headers()).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };
    if !state.is_admin(&user) {
        tracing::warn!(user = %user.id, "non-admin attempted admin access");
        return CarMatchError::Forbidden {
            message: "admin access required".to_string(),
        }
        .into_response();
    }
    next.run(req).await
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

pub async fn catalog_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scorer.scorer().catalog().items().to_vec())
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendParams {
    pub offline: Option<String>,
    pub mode: Option<String>,
}

impl RecommendParams {
    fn force_offline(&self) -> bool {
        self.offline
            .as_deref()
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            || self.mode.as_deref() == Some("offline")
    }
}

fn parse_json_body(body: &Bytes) -> Result<Value> {
    serde_json::from_slice(body)
        .map_err(|e| CarMatchError::validation("invalid_json", e.to_string()))
}

pub async fn recommend_handler(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let mut payload = parse_json_body(&body)?;
    let raw_answers = match payload.get_mut("answers").map(Value::take) {
        Some(Value::Null) | None => {
            return Err(CarMatchError::validation(
                "missing_answers",
                "request body must contain `answers`",
            ));
        }
        Some(value) => value,
    };
    let answers: AnswerSet = serde_json::from_value(raw_answers.clone())
        .map_err(|e| CarMatchError::validation("invalid_answers", e.to_string()))?;

    let recommendation = match (&state.enriched, params.force_offline()) {
        (Some(enriched), false) => enriched.recommend(&answers).await,
        _ => state.scorer.recommend(&answers).await,
    };

    if let Some(store) = &state.store {
        persist(store.as_ref(), &headers, raw_answers, &recommendation).await;
    }

    let mut response = Json(&recommendation.picks).into_response();
    response.headers_mut().insert(
        SOURCE_HEADER,
        HeaderValue::from_static(recommendation.source.as_str()),
    );
    Ok(response)
}

/// Best-effort save; failures are logged and never reach the caller
async fn persist(
    store: &dyn ResultStore,
    headers: &HeaderMap,
    answers: Value,
    recommendation: &crate::recommend::Recommendation,
) {
    let record = ResultRecord::new(
        answers,
        recommendation.picks.clone(),
        recommendation.source.as_str(),
    );
    let user = match bearer_token(headers) {
        Some(token) => store.user_for_token(token).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "token lookup failed, saving as guest");
            None
        }),
        None => None,
    };
    let (table, record) = match &user {
        Some(user) => (Table::Results, record.for_user(user)),
        None => {
            let guest_id = headers
                .get("x-guest-id")
                .and_then(|h| h.to_str().ok())
                .and_then(|v| Uuid::parse_str(v).ok())
                .unwrap_or_else(Uuid::new_v4);
            (Table::GuestResults, record.for_guest(guest_id.to_string()))
        }
    };
    if let Err(e) = store.insert_result(table, &record).await {
        tracing::warn!(error = %e, "failed to persist recommendation");
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    message: Option<String>,
}

pub async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let request: ChatRequest = serde_json::from_value(parse_json_body(&body)?)
        .map_err(|e| CarMatchError::validation("invalid_messages", e.to_string()))?;

    let mut messages = vec![ChatMessage::system(CHAT_SYSTEM_PROMPT)];
    messages.extend(
        request
            .messages
            .into_iter()
            .filter(|m| m.role == "user" || m.role == "assistant")
            .filter(|m| !m.content.trim().is_empty()),
    );
    if let Some(message) = request.message.filter(|m| !m.trim().is_empty()) {
        messages.push(ChatMessage::user(message));
    }
    if messages.len() == 1 {
        return Err(CarMatchError::validation(
            "missing_message",
            "provide `messages` or `message`",
        ));
    }

    let model = state.chat.as_ref().ok_or_else(|| CarMatchError::Unavailable {
        message: "chat model is not configured".to_string(),
    })?;
    let reply = model
        .complete(&messages, false)
        .await
        .map_err(|e| CarMatchError::upstream("openai", e.to_string()))?;
    Ok(Json(json!({ "reply": reply })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileBody {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

pub async fn profile_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let user = require_user(&state, &headers).await?;
    let fields: ProfileBody = if body.is_empty() {
        ProfileBody::default()
    } else {
        serde_json::from_value(parse_json_body(&body)?)
            .map_err(|e| CarMatchError::validation("invalid_profile", e.to_string()))?
    };
    let profile = Profile {
        id: user.id.clone(),
        email: user.email.clone(),
        full_name: fields.full_name,
        phone: fields.phone,
        city: fields.city,
    };
    state.store()?.upsert_profile(&profile).await?;
    Ok(Json(json!({ "ok": true, "id": profile.id })))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub format: Option<String>,
    pub guest: Option<String>,
}

pub async fn admin_results_handler(
    State(state): State<AppState>,
    Query(params): Query<AdminListParams>,
) -> Result<Response> {
    let table = if params
        .guest
        .as_deref()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    {
        Table::GuestResults
    } else {
        Table::Results
    };
    let query = ListQuery {
        page: params.page,
        page_size: params.page_size,
        search: params.search,
    };
    let page = state.store()?.list_results(table, &query).await?;

    if params.format.as_deref() == Some("csv") {
        let csv = results_to_csv(&page.rows)?;
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"results.csv\"",
                ),
            ],
            csv,
        )
            .into_response());
    }
    Ok(Json(page).into_response())
}

pub async fn admin_stats_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    let store = state.store()?;
    let results = store.count(Table::Results).await?;
    let guest_results = store.count(Table::GuestResults).await?;
    let profiles = store.count(Table::Profiles).await?;
    Ok(Json(json!({
        "results": results,
        "guest_results": guest_results,
        "profiles": profiles,
        "total_results": results + guest_results
    })))
}

/// Redirect to a cached image, or render the placeholder
pub async fn image_handler(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let slug = slugify(slug.trim_end_matches(".png"));
    if let Some(store) = &state.store {
        match store.cached_image(&slug).await {
            Ok(Some(url)) => {
                return (StatusCode::FOUND, [(header::LOCATION, url)]).into_response();
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, slug = %slug, "image lookup failed"),
        }
    }
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        placeholder_svg(&label_from_slug(&slug)),
    )
        .into_response()
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match config
        .runtime
        .allowed_origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
    {
        Some(value) => AllowOrigin::exact(value),
        None => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin/results", get(admin_results_handler))
        .route("/admin/stats", get(admin_stats_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate));

    Router::new()
        .route("/health", get(health_handler))
        .route("/catalog", get(catalog_handler))
        .route("/recommend", post(recommend_handler))
        .route("/chat", post(chat_handler))
        .route("/profile", post(profile_handler))
        .route("/image/:slug", get(image_handler))
        .merge(admin)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(config: Config) -> anyhow::Result<()> {
    let bind = config.runtime.http_bind;
    let state = AppState::from_config(config)?;
    tracing::info!(
        llm = state.enriched.is_some(),
        store = state.store.is_some(),
        "recommendation service configured"
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
