//! Persistence pass-through to the managed database
//!
//! The service never owns a schema; it reads and writes a handful of tables
//! through [`ResultStore`]. [`SupabaseStore`] talks PostgREST/Auth/Storage.

pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::scoring::Pick;

pub use supabase::SupabaseStore;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Results,
    GuestResults,
    Profiles,
}

impl Table {
    /// Text columns matched by case-insensitive search
    pub fn search_columns(self) -> &'static [&'static str] {
        match self {
            Table::Results => &["email", "top_pick", "source"],
            Table::GuestResults => &["guest_id", "top_pick", "source"],
            Table::Profiles => &["email", "full_name", "city"],
        }
    }
}

/// Identity resolved from a bearer token by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// One persisted recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
    pub answers: Value,
    pub picks: Vec<Pick>,
    pub top_pick: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ResultRecord {
    pub fn new(answers: Value, picks: Vec<Pick>, source: &str) -> Self {
        let top_pick = picks
            .first()
            .map(|p| format!("{} {}", p.brand, p.model))
            .unwrap_or_default();
        Self {
            id: None,
            user_id: None,
            email: None,
            guest_id: None,
            answers,
            picks,
            top_pick,
            source: source.to_string(),
            created_at: None,
        }
    }

    pub fn for_user(mut self, user: &AuthUser) -> Self {
        self.user_id = Some(user.id.clone());
        self.email = user.email.clone();
        self
    }

    pub fn for_guest(mut self, guest_id: impl Into<String>) -> Self {
        self.guest_id = Some(guest_id.into());
        self
    }
}

/// Offset/limit pagination with optional substring search
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }

    /// Search term with PostgREST syntax characters removed; None when blank
    pub fn search_term(&self) -> Option<String> {
        let cleaned: String = self
            .search
            .as_deref()?
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '@' | '.' | '-' | '_'))
            .collect();
        let cleaned = cleaned.trim().to_string();
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Resolve a user access token; `None` when the token is not valid
    async fn user_for_token(&self, token: &str) -> Result<Option<AuthUser>>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    async fn insert_result(&self, table: Table, record: &ResultRecord) -> Result<()>;

    async fn list_results(&self, table: Table, query: &ListQuery) -> Result<Page<ResultRecord>>;

    async fn count(&self, table: Table) -> Result<u64>;

    /// Public URL of a cached image for `slug`, if one exists
    async fn cached_image(&self, slug: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pagination_defaults_and_clamping() {
        let q = ListQuery::default();
        assert_eq!((q.page(), q.page_size(), q.offset()), (1, 20, 0));

        let q = ListQuery {
            page: Some(3),
            page_size: Some(500),
            search: None,
        };
        assert_eq!(q.page_size(), 100);
        assert_eq!(q.offset(), 200);

        let q = ListQuery {
            page: Some(0),
            page_size: Some(0),
            search: None,
        };
        assert_eq!((q.page(), q.page_size()), (1, 1));
    }

    #[test]
    fn search_term_strips_filter_syntax() {
        let q = ListQuery {
            search: Some(" rav4),or=(id.gt.0 ".to_string()),
            ..Default::default()
        };
        assert_eq!(q.search_term().as_deref(), Some("rav4orid.gt.0"));

        let blank = ListQuery {
            search: Some("  *** ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.search_term(), None);
    }

    #[test]
    fn record_top_pick_from_first_pick() {
        let picks = vec![Pick {
            brand: "Toyota".into(),
            model: "RAV4".into(),
            reason: "r".into(),
            image: "/image/toyota-rav4".into(),
        }];
        let user = AuthUser {
            id: "u1".into(),
            email: Some("a@b.c".into()),
        };
        let record = ResultRecord::new(json!({}), picks, "scorer").for_user(&user);
        assert_eq!(record.top_pick, "Toyota RAV4");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["user_id"], "u1");
        assert!(value.get("guest_id").is_none());
        assert!(value.get("id").is_none());
    }
}
