//! Pagination across backend revisions.
//!
//! Requests carry a 1-based page and a limit; depending on the revision they
//! go out as `page`/`limit` or `offset`/`limit`. Responses come back in one of
//! several list shapes and are normalised into [`Page`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::envelope;
use super::error::ApiError;

/// Largest page the backend serves.
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// `offset` + `limit`
    Offset,
    /// `page` + `limit`, 1-based
    Page,
}

/// A page to fetch. `page` is 1-based, `limit` is clamped to `1..=MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn first(limit: u32) -> Self {
        Self::new(1, limit)
    }

    /// The page containing `offset`. Unaligned offsets round down.
    pub fn from_offset(offset: u64, limit: u32) -> Self {
        let limit = limit.clamp(1, MAX_LIMIT);
        let page = offset / u64::from(limit) + 1;
        Self::new(u32::try_from(page).unwrap_or(u32::MAX), limit)
    }

    pub fn page(self) -> u32 {
        self.page
    }

    pub fn limit(self) -> u32 {
        self.limit
    }

    pub fn offset(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn next(self) -> Self {
        Self::new(self.page.saturating_add(1), self.limit)
    }

    pub fn query_pairs(self, style: PaginationStyle) -> Vec<(String, String)> {
        match style {
            PaginationStyle::Offset => vec![
                ("offset".to_string(), self.offset().to_string()),
                ("limit".to_string(), self.limit.to_string()),
            ],
            PaginationStyle::Page => vec![
                ("page".to_string(), self.page.to_string()),
                ("limit".to_string(), self.limit.to_string()),
            ],
        }
    }
}

/// Position of a page within the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub total: Option<u64>,
    pub offset: u64,
    pub limit: u32,
    pub has_next: bool,
}

impl PageInfo {
    pub fn page_number(&self) -> u64 {
        self.offset / u64::from(self.limit.max(1)) + 1
    }

    pub fn total_pages(&self) -> Option<u64> {
        self.total
            .map(|total| total.div_ceil(u64::from(self.limit.max(1))).max(1))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

impl<T> Page<T> {
    /// Drops items that fail `keep`. Used to enforce filters the backend ignored.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Default)]
struct Meta {
    total: Option<u64>,
    limit: Option<u32>,
    offset: Option<u64>,
    page: Option<u32>,
    has_next: Option<bool>,
}

impl Meta {
    fn merge_from(&mut self, map: &Map<String, Value>) {
        let num = |key: &str| map.get(key).and_then(Value::as_u64);
        self.total = self.total.or(num("total"));
        self.limit = self.limit.or(num("limit").and_then(|n| u32::try_from(n).ok()));
        self.offset = self.offset.or(num("offset"));
        self.page = self.page.or(num("page").and_then(|n| u32::try_from(n).ok()));
        self.has_next = self
            .has_next
            .or(map.get("has_next").and_then(Value::as_bool));
    }
}

/// Decodes a paginated list body of any known shape.
///
/// Accepted shapes: `{data: [..], pagination: {..}}`, `{items: [..], total,
/// page, limit}`, a bare array, and any of these inside a
/// `{success, data}` envelope.
pub fn decode_page<T: DeserializeOwned>(
    value: Value,
    requested: PageRequest,
) -> Result<Page<T>, ApiError> {
    let mut meta = Meta::default();
    let items = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => {
            if map.get("success") == Some(&Value::Bool(false)) {
                return Err(envelope::open(Value::Object(map)).err().unwrap_or_else(|| {
                    ApiError::Rejected("backend reported failure".to_string())
                }));
            }
            let list = match map.remove("data") {
                Some(list @ Value::Array(_)) => list,
                Some(inner @ Value::Object(_)) => return decode_page(inner, requested),
                _ => match map.remove("items").or_else(|| map.remove("results")) {
                    Some(list @ Value::Array(_)) => list,
                    _ => {
                        return Err(ApiError::Decode(
                            "expected a list under `data` or `items`".to_string(),
                        ));
                    }
                },
            };
            if let Some(Value::Object(pagination)) = map.get("pagination") {
                meta.merge_from(pagination);
            }
            meta.merge_from(&map);
            list
        }
        other => {
            return Err(ApiError::Decode(format!(
                "expected a paginated list, got {other}"
            )));
        }
    };

    let items: Vec<T> = serde_json::from_value(items)?;
    let limit = meta.limit.unwrap_or(requested.limit()).max(1);
    let offset = meta
        .offset
        .or(meta
            .page
            .map(|p| u64::from(p.max(1) - 1) * u64::from(limit)))
        .unwrap_or(requested.offset());
    let len = items.len() as u64;
    let has_next = meta.has_next.unwrap_or(match meta.total {
        Some(total) => offset.saturating_add(len) < total,
        None => len >= u64::from(limit),
    });

    Ok(Page {
        items,
        info: PageInfo {
            total: meta.total,
            offset,
            limit,
            has_next,
        },
    })
}
