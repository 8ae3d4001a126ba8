use serde::{Deserialize, Serialize};

/// Page size used when the client does not send `limit`.
pub const DEFAULT_LIMIT: u64 = 20;
/// Upper bound applied to any requested `limit`.
pub const MAX_LIMIT: u64 = 100;

#[must_use]
pub const fn default_offset() -> u64 {
    0
}

#[must_use]
pub const fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

/// Clamp a requested page size into `1..=MAX_LIMIT`.
#[must_use]
pub const fn clamp_limit(limit: u64) -> u64 {
    if limit == 0 {
        1
    } else if limit > MAX_LIMIT {
        MAX_LIMIT
    } else {
        limit
    }
}

/// `?offset=&limit=` for list endpoints without extra filters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_offset")]
    pub offset: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl PaginationQuery {
    #[must_use]
    pub const fn limit(&self) -> u64 {
        clamp_limit(self.limit)
    }
}

/// Envelope returned by every paginated list endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
}

impl<T> Paginated<T> {
    #[must_use]
    pub fn new(data: Vec<T>, total: u64, offset: u64, limit: u64) -> Self {
        Self {
            data,
            total,
            offset,
            limit,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more_iff_offset_plus_limit_below_total() {
        assert!(Paginated::<u8>::new(Vec::new(), 25, 0, 20).has_more);
        assert!(!Paginated::<u8>::new(Vec::new(), 20, 0, 20).has_more);
        assert!(!Paginated::<u8>::new(Vec::new(), 25, 20, 20).has_more);
        assert!(Paginated::<u8>::new(Vec::new(), 41, 20, 20).has_more);
        assert!(!Paginated::<u8>::new(Vec::new(), 0, 0, 20).has_more);
    }

    #[test]
    fn test_has_more_does_not_overflow() {
        assert!(!Paginated::<u8>::new(Vec::new(), 10, u64::MAX, 20).has_more);
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(15), 15);
        assert_eq!(clamp_limit(1000), MAX_LIMIT);
    }

    #[test]
    fn test_serializes_camel_case() {
        let page = Paginated::new(vec![1, 2], 3, 0, 2);
        let json = serde_json::to_value(&page).unwrap_or_default();
        assert_eq!(json["hasMore"], true);
        assert_eq!(json["total"], 3);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(2));
    }
}
