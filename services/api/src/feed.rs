//! Feed query parsing and SQL composition
//!
//! The feed is the set of posts written by the caller or by accounts the
//! caller follows, with comment counts and author details, narrowed by an
//! optional, fixed set of filters. Filters are composed as parameterized
//! fragments on a [`QueryBuilder`]: caller-supplied values only ever reach
//! the database as bind parameters.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_LIMIT: i64 = 5;
pub const MAX_LIMIT: i64 = 100;
pub const MAX_SEARCH_LEN: usize = 100;

/// Feed ordering by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    fn parse(raw: &str) -> Result<Self, FeedQueryError> {
        match raw {
            "asc" => Ok(SortDirection::Ascending),
            "desc" => Ok(SortDirection::Descending),
            other => Err(FeedQueryError::InvalidSort(other.to_string())),
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Rejections raised while turning raw parameters into a [`FeedQuery`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedQueryError {
    #[error("limit must be an integer between 1 and {MAX_LIMIT}, got '{0}'")]
    InvalidLimit(String),

    #[error("offset must be a non-negative integer, got '{0}'")]
    InvalidOffset(String),

    #[error("sort must be 'asc' or 'desc', got '{0}'")]
    InvalidSort(String),

    #[error("search must be at most {MAX_SEARCH_LEN} characters")]
    SearchTooLong,
}

/// Raw feed parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort: Option<String>,
    /// Comma-separated tag list
    pub tags: Option<String>,
    pub search: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
}

/// Validated feed query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub limit: i64,
    pub offset: i64,
    pub sort: SortDirection,
    /// A post must carry every one of these tags
    pub tags: Vec<String>,
    /// Case-insensitive substring of title or content
    pub search: Option<String>,
    /// Inclusive lower bound on creation time
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time
    pub until: Option<DateTime<Utc>>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: SortDirection::default(),
            tags: Vec::new(),
            search: None,
            since: None,
            until: None,
        }
    }
}

/// Treat empty query-string values as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl FeedQuery {
    /// Validate raw parameters, filling in defaults for anything absent.
    ///
    /// Unparsable `since`/`until` values are dropped, not rejected.
    pub fn from_params(params: &FeedParams) -> Result<Self, FeedQueryError> {
        let mut query = FeedQuery::default();

        if let Some(raw) = present(&params.limit) {
            query.limit = raw
                .trim()
                .parse()
                .ok()
                .filter(|limit| (1..=MAX_LIMIT).contains(limit))
                .ok_or_else(|| FeedQueryError::InvalidLimit(raw.to_string()))?;
        }

        if let Some(raw) = present(&params.offset) {
            query.offset = raw
                .trim()
                .parse()
                .ok()
                .filter(|offset| *offset >= 0)
                .ok_or_else(|| FeedQueryError::InvalidOffset(raw.to_string()))?;
        }

        if let Some(raw) = present(&params.sort) {
            query.sort = SortDirection::parse(raw)?;
        }

        if let Some(raw) = present(&params.tags) {
            for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                if !query.tags.iter().any(|t| t == tag) {
                    query.tags.push(tag.to_string());
                }
            }
        }

        if let Some(raw) = present(&params.search) {
            if raw.chars().count() > MAX_SEARCH_LEN {
                return Err(FeedQueryError::SearchTooLong);
            }
            query.search = Some(raw.to_string());
        }

        query.since = present(&params.since).and_then(|raw| parse_bound("since", raw));
        query.until = present(&params.until).and_then(|raw| parse_bound("until", raw));

        Ok(query)
    }
}

fn parse_bound(name: &str, raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            debug!("Ignoring unparsable {} bound '{}': {}", name, raw, e);
            None
        }
    }
}

/// Escape LIKE metacharacters so the fragment matches literally
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Compose the feed query for `caller_id`.
///
/// Column order in the result: `id, user_id, title, content, tags, version,
/// created_at, updated_at, username, email, comments_count`.
pub fn build_feed_query(caller_id: i64, query: &FeedQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT p.id, p.user_id, p.title, p.content, p.tags, p.version,
               p.created_at, p.updated_at,
               u.username, u.email,
               COUNT(c.id) AS comments_count
        FROM posts p
        JOIN users u ON u.id = p.user_id
        LEFT JOIN comments c ON c.post_id = p.id
        WHERE (p.user_id = "#,
    );
    builder.push_bind(caller_id);
    builder.push(" OR p.user_id IN (SELECT f.user_id FROM followers f WHERE f.follower_id = ");
    builder.push_bind(caller_id);
    builder.push("))");

    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder.push(" AND (p.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR p.content ILIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }

    if !query.tags.is_empty() {
        builder.push(" AND p.tags @> ");
        builder.push_bind(query.tags.clone());
    }

    if let Some(since) = query.since {
        builder.push(" AND p.created_at >= ");
        builder.push_bind(since);
    }

    if let Some(until) = query.until {
        builder.push(" AND p.created_at <= ");
        builder.push_bind(until);
    }

    let direction = query.sort.keyword();
    builder.push(" GROUP BY p.id, u.id");
    builder.push(format!(
        " ORDER BY p.created_at {direction}, p.id {direction}"
    ));
    builder.push(" LIMIT ");
    builder.push_bind(query.limit);
    builder.push(" OFFSET ");
    builder.push_bind(query.offset);

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FeedParams {
        FeedParams::default()
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let query = FeedQuery::from_params(&params()).unwrap();
        assert_eq!(query, FeedQuery::default());
        assert_eq!(query.limit, 5);
        assert_eq!(query.offset, 0);
        assert_eq!(query.sort, SortDirection::Descending);
    }

    #[test]
    fn empty_values_count_as_absent() {
        let p = FeedParams {
            limit: Some(String::new()),
            sort: Some(String::new()),
            search: Some(String::new()),
            tags: Some(String::new()),
            ..params()
        };
        assert_eq!(FeedQuery::from_params(&p).unwrap(), FeedQuery::default());
    }

    #[test]
    fn limit_must_be_within_bounds() {
        for bad in ["0", "101", "-1", "ten"] {
            let p = FeedParams {
                limit: Some(bad.to_string()),
                ..params()
            };
            assert_eq!(
                FeedQuery::from_params(&p),
                Err(FeedQueryError::InvalidLimit(bad.to_string()))
            );
        }

        for good in ["1", "100"] {
            let p = FeedParams {
                limit: Some(good.to_string()),
                ..params()
            };
            assert!(FeedQuery::from_params(&p).is_ok());
        }
    }

    #[test]
    fn offset_must_be_non_negative() {
        let p = FeedParams {
            offset: Some("-5".to_string()),
            ..params()
        };
        assert_eq!(
            FeedQuery::from_params(&p),
            Err(FeedQueryError::InvalidOffset("-5".to_string()))
        );
    }

    #[test]
    fn sort_accepts_only_asc_and_desc() {
        let p = FeedParams {
            sort: Some("asc".to_string()),
            ..params()
        };
        assert_eq!(
            FeedQuery::from_params(&p).unwrap().sort,
            SortDirection::Ascending
        );

        let p = FeedParams {
            sort: Some("random(); DROP TABLE posts".to_string()),
            ..params()
        };
        assert!(matches!(
            FeedQuery::from_params(&p),
            Err(FeedQueryError::InvalidSort(_))
        ));
    }

    #[test]
    fn tags_are_split_trimmed_and_deduplicated() {
        let p = FeedParams {
            tags: Some(" rust, ,go,rust ".to_string()),
            ..params()
        };
        assert_eq!(FeedQuery::from_params(&p).unwrap().tags, vec!["rust", "go"]);
    }

    #[test]
    fn overlong_search_is_rejected() {
        let p = FeedParams {
            search: Some("x".repeat(MAX_SEARCH_LEN + 1)),
            ..params()
        };
        assert_eq!(
            FeedQuery::from_params(&p),
            Err(FeedQueryError::SearchTooLong)
        );
    }

    #[test]
    fn unparsable_time_bounds_are_dropped() {
        let p = FeedParams {
            since: Some("yesterday".to_string()),
            until: Some("2024-05-01T10:00:00+02:00".to_string()),
            ..params()
        };
        let query = FeedQuery::from_params(&p).unwrap();
        assert_eq!(query.since, None);
        assert_eq!(
            query.until.map(|t| t.to_rfc3339()),
            Some("2024-05-01T08:00:00+00:00".to_string())
        );
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_\\"), "%100\\%\\_\\\\%");
    }

    #[test]
    fn base_query_has_only_relationship_and_paging_binds() {
        let builder = build_feed_query(9, &FeedQuery::default());
        let sql = builder.sql();

        assert!(sql.contains("WHERE (p.user_id = $1 OR p.user_id IN"));
        assert!(sql.contains("f.follower_id = $2"));
        assert!(sql.contains("ORDER BY p.created_at DESC, p.id DESC"));
        assert!(sql.contains("LIMIT $3 OFFSET $4"));
        assert!(!sql.contains("ILIKE"));
        assert!(!sql.contains("@>"));
    }

    #[test]
    fn all_filters_compose_in_order() {
        let query = FeedQuery {
            sort: SortDirection::Ascending,
            tags: vec!["rust".to_string()],
            search: Some("async".to_string()),
            since: Some(Utc::now()),
            until: Some(Utc::now()),
            ..FeedQuery::default()
        };
        let builder = build_feed_query(1, &query);
        let sql = builder.sql();

        assert!(sql.contains("p.title ILIKE $3 ESCAPE '\\' OR p.content ILIKE $4"));
        assert!(sql.contains("p.tags @> $5"));
        assert!(sql.contains("p.created_at >= $6"));
        assert!(sql.contains("p.created_at <= $7"));
        assert!(sql.contains("ORDER BY p.created_at ASC, p.id ASC"));
        assert!(sql.contains("LIMIT $8 OFFSET $9"));
    }

    #[test]
    fn caller_values_never_reach_the_sql_text() {
        let query = FeedQuery {
            tags: vec!["'); DELETE FROM posts; --".to_string()],
            search: Some("' OR 1=1 --".to_string()),
            ..FeedQuery::default()
        };
        let builder = build_feed_query(1, &query);
        let sql = builder.sql();

        assert!(!sql.contains("DELETE FROM posts"));
        assert!(!sql.contains("1=1"));
    }
}
