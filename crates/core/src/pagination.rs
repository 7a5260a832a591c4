//! Keyset pagination over `(created_at DESC, id DESC)`.
//!
//! A [`Cursor`] names a position in the ordering and a direction. Forward
//! cursors select rows strictly after the key; backward cursors select rows
//! strictly before it, which the database returns in ascending order and
//! [`Page::from_rows`] flips back. Queries fetch [`PageRequest::fetch_limit`]
//! rows, one more than the page size, to learn whether another page exists.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size used when none is requested.
pub const DEFAULT_LIMIT: u32 = 20;
/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 100;

/// Errors decoding a cursor string.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("cursor is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("cursor is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Which side of the key a cursor selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Rows after the key (older rows, the next page).
    After,
    /// Rows before the key (newer rows, the previous page).
    Before,
}

/// Sort key of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SortKey {
    pub created_at: DateTime<Utc>,
    pub id: i32,
}

impl SortKey {
    #[must_use]
    pub const fn new(created_at: DateTime<Utc>, id: i32) -> Self {
        Self { created_at, id }
    }
}

/// An opaque page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(rename = "d")]
    pub direction: Direction,
    #[serde(rename = "k")]
    pub key: SortKey,
}

impl Cursor {
    #[must_use]
    pub const fn after(key: SortKey) -> Self {
        Self {
            direction: Direction::After,
            key,
        }
    }

    #[must_use]
    pub const fn before(key: SortKey) -> Self {
        Self {
            direction: Direction::Before,
            key,
        }
    }

    /// Encode as base64url JSON.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing a struct of plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a string produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns `CursorError` if the string is not a valid cursor.
    pub fn decode(s: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD.decode(s.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Requested page size and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub cursor: Option<Cursor>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            cursor: None,
        }
    }
}

impl PageRequest {
    /// Build a request from query-string values.
    ///
    /// The limit is clamped to `1..=MAX_LIMIT`; an empty cursor means the
    /// first page.
    ///
    /// # Errors
    ///
    /// Returns `CursorError` if the cursor cannot be decoded.
    pub fn from_query(limit: Option<u32>, cursor: Option<&str>) -> Result<Self, CursorError> {
        let cursor = match cursor.map(str::trim) {
            Some(s) if !s.is_empty() => Some(Cursor::decode(s)?),
            _ => None,
        };
        Ok(Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            cursor,
        })
    }

    /// Rows to fetch: one more than the page size.
    #[must_use]
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.limit) + 1
    }

    /// Returns true when rows must be fetched in ascending order.
    #[must_use]
    pub fn is_backward(&self) -> bool {
        self.cursor
            .is_some_and(|c| c.direction == Direction::Before)
    }
}

/// One page of results with cursors to its neighbours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Assemble a page from up to `fetch_limit` rows.
    ///
    /// Forward and first-page rows arrive newest first; backward rows arrive
    /// oldest first and are reversed here.
    pub fn from_rows<F>(mut rows: Vec<T>, request: &PageRequest, key: F) -> Self
    where
        F: Fn(&T) -> SortKey,
    {
        let limit = request.limit as usize;
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let (more_after, more_before) = if request.is_backward() {
            rows.reverse();
            (true, has_more)
        } else {
            (has_more, request.cursor.is_some())
        };

        let next_cursor = rows
            .last()
            .filter(|_| more_after)
            .map(|row| Cursor::after(key(row)).encode());
        let prev_cursor = rows
            .first()
            .filter(|_| more_before)
            .map(|row| Cursor::before(key(row)).encode());

        Self {
            items: rows,
            next_cursor,
            prev_cursor,
        }
    }

    /// Transform the items, keeping the cursors.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            prev_cursor: self.prev_cursor,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    /// Rows sorted newest first, with ties on `created_at` broken by id.
    fn dataset(n: i32) -> Vec<SortKey> {
        let mut rows: Vec<SortKey> = (1..=n)
            .map(|id| {
                let secs = i64::from(id / 3) * 60;
                SortKey::new(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(), id)
            })
            .collect();
        rows.sort_by(|a, b| b.cmp(a));
        rows
    }

    /// What the SQL query returns for `request`.
    fn query(data: &[SortKey], request: &PageRequest) -> Vec<SortKey> {
        let take = usize::try_from(request.fetch_limit()).unwrap();
        match request.cursor {
            None => data.iter().copied().take(take).collect(),
            Some(Cursor {
                direction: Direction::After,
                key,
            }) => data.iter().copied().filter(|r| *r < key).take(take).collect(),
            Some(Cursor {
                direction: Direction::Before,
                key,
            }) => data
                .iter()
                .rev()
                .copied()
                .filter(|r| *r > key)
                .take(take)
                .collect(),
        }
    }

    fn fetch(data: &[SortKey], limit: u32, cursor: Option<&str>) -> Page<SortKey> {
        let request = PageRequest::from_query(Some(limit), cursor).unwrap();
        Page::from_rows(query(data, &request), &request, |k| *k)
    }

    #[test]
    fn test_cursor_round_trip() {
        let cursor = Cursor::before(SortKey::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap(), 7));
        assert_eq!(Cursor::decode(&cursor.encode()).unwrap(), cursor);
        assert!(Cursor::decode("not a cursor!").is_err());
        assert!(Cursor::decode("e30").is_err());
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PageRequest::from_query(None, None).unwrap().limit, DEFAULT_LIMIT);
        assert_eq!(PageRequest::from_query(Some(0), None).unwrap().limit, 1);
        assert_eq!(PageRequest::from_query(Some(1000), Some("")).unwrap().limit, MAX_LIMIT);
    }

    #[test]
    fn test_first_page_has_no_prev() {
        let data = dataset(10);
        let page = fetch(&data, 4, None);
        assert_eq!(page.items, data[..4]);
        assert!(page.prev_cursor.is_none());
        assert!(page.next_cursor.is_some());
    }

    #[test]
    fn test_single_page_has_no_cursors() {
        let data = dataset(3);
        let page = fetch(&data, 20, None);
        assert_eq!(page.items.len(), 3);
        assert!(page.next_cursor.is_none());
        assert!(page.prev_cursor.is_none());
    }

    #[test]
    fn test_forward_pages_are_disjoint_and_ordered() {
        for n in [0, 1, 7, 20, 23] {
            for limit in [1, 3, 5, 20] {
                let data = dataset(n);
                let mut seen = Vec::new();
                let mut cursor = None;
                loop {
                    let page = fetch(&data, limit, cursor.as_deref());
                    seen.extend(page.items.iter().copied());
                    match page.next_cursor {
                        Some(next) => cursor = Some(next),
                        None => break,
                    }
                }
                assert_eq!(seen, data, "n={n} limit={limit}");
            }
        }
    }

    #[test]
    fn test_next_then_prev_returns_same_page() {
        let data = dataset(23);
        let mut pages = vec![fetch(&data, 5, None)];
        while let Some(next) = pages.last().and_then(|p| p.next_cursor.clone()) {
            pages.push(fetch(&data, 5, Some(&next)));
        }
        assert_eq!(pages.len(), 5);

        for window in pages.windows(2) {
            let back = fetch(&data, 5, window[1].prev_cursor.as_deref());
            assert_eq!(back.items, window[0].items);
            assert_eq!(back.next_cursor.is_some(), window[0].next_cursor.is_some());
            assert_eq!(back.prev_cursor.is_some(), window[0].prev_cursor.is_some());
        }
    }

    #[test]
    fn test_map_keeps_cursors() {
        let data = dataset(5);
        let page = fetch(&data, 2, None);
        let next = page.next_cursor.clone();
        let ids = page.map(|k| k.id);
        assert_eq!(ids.items.len(), 2);
        assert_eq!(ids.next_cursor, next);
    }
}
