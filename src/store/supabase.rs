//! Supabase (PostgREST + Auth + Storage) implementation of [`ResultStore`]

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::{AuthUser, ListQuery, Page, Profile, ResultRecord, ResultStore, Table};
use crate::config::{ImageConfig, StoreConfig};
use crate::error::{CarMatchError, Result};
use crate::images::object_key;

pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    tables: StoreConfig,
    bucket: String,
}

impl SupabaseStore {
    pub fn new(
        base_url: &str,
        service_key: String,
        tables: StoreConfig,
        images: &ImageConfig,
        timeout_ms: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| CarMatchError::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            tables,
            bucket: images.bucket.clone(),
        })
    }

    fn table_name(&self, table: Table) -> &str {
        match table {
            Table::Results => &self.tables.results_table,
            Table::GuestResults => &self.tables.guest_results_table,
            Table::Profiles => &self.tables.profiles_table,
        }
    }

    /// Request authenticated with the service-role key
    fn rest(&self, method: Method, table: Table) -> RequestBuilder {
        self.client
            .request(
                method,
                format!("{}/rest/v1/{}", self.base_url, self.table_name(table)),
            )
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    pub fn public_object_url(&self, slug: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            object_key(slug)
        )
    }
}

async fn ensure_success(response: Response, op: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(op, %status, "supabase request failed");
    Err(CarMatchError::upstream(
        "supabase",
        format!("{op} failed with {status}: {body}"),
    ))
}

/// Total from a PostgREST `Content-Range` header such as `0-19/123` or `*/0`
pub fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// PostgREST `or=(...)` filter matching `term` in any of `columns`
pub fn search_filter(columns: &[&str], term: &str) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|col| format!("{col}.ilike.\"*{term}*\""))
        .collect();
    format!("({})", parts.join(","))
}

fn total_from(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
}

#[async_trait]
impl ResultStore for SupabaseStore {
    async fn user_for_token(&self, token: &str) -> Result<Option<AuthUser>> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let response = ensure_success(response, "auth lookup").await?;
        let user: AuthUser = response.json().await?;
        Ok(Some(user))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let response = self
            .rest(Method::POST, Table::Profiles)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(profile)
            .send()
            .await?;
        ensure_success(response, "profile upsert").await?;
        debug!(user = %profile.id, "profile upserted");
        Ok(())
    }

    async fn insert_result(&self, table: Table, record: &ResultRecord) -> Result<()> {
        let response = self
            .rest(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        ensure_success(response, "result insert").await?;
        Ok(())
    }

    async fn list_results(&self, table: Table, query: &ListQuery) -> Result<Page<ResultRecord>> {
        let mut params: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("offset", query.offset().to_string()),
            ("limit", query.page_size().to_string()),
        ];
        if let Some(term) = query.search_term() {
            params.push(("or", search_filter(table.search_columns(), &term)));
        }

        let response = self
            .rest(Method::GET, table)
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = ensure_success(response, "result listing").await?;
        let total = total_from(&response);
        let rows: Vec<ResultRecord> = response.json().await?;

        Ok(Page {
            total: total.unwrap_or(rows.len() as u64),
            rows,
            page: query.page(),
            page_size: query.page_size(),
        })
    }

    async fn count(&self, table: Table) -> Result<u64> {
        let response = self
            .rest(Method::HEAD, table)
            .query(&[("select", "*")])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = ensure_success(response, "count").await?;
        total_from(&response).ok_or_else(|| {
            CarMatchError::upstream("supabase", "count response missing Content-Range")
        })
    }

    async fn cached_image(&self, slug: &str) -> Result<Option<String>> {
        let url = self.public_object_url(slug);
        let response = self.client.head(&url).send().await?;
        if response.status().is_success() {
            Ok(Some(url))
        } else {
            debug!(slug, status = %response.status(), "image not cached");
            Ok(None)
        }
    }
}
