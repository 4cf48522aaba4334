//! # Session Text
//!
//! The simulator publishes session metadata (track, weekend options, the
//! driver list and so on) as text inside the shared memory region, together
//! with an update counter that changes whenever the text is rewritten.
//!
//! [`SessionText`] borrows that text straight from the mapped view and answers
//! path queries against it without copying:
//!
//! ```rust
//! use ira_telemetry::SessionText;
//!
//! let text = SessionText::new(b"WeekendInfo:\n TrackID: 163\n TrackLength: 6.93 km\n", 4);
//! assert_eq!(text.as_int("WeekendInfo:TrackID").unwrap(), 163);
//! let (length, unit) = text.as_measure("WeekendInfo:TrackLength").unwrap();
//! assert_eq!((length, unit.as_ref()), (6.93, "km"));
//! ```
//!
//! Parsed results are never cached here; re-run queries whenever
//! [`SessionText::update`] differs from the last value seen.

mod query;
mod summary;

pub use query::{QueryError, query, query_into};
pub use summary::SessionSummary;

use std::borrow::Cow;

/// Session text borrowed from the mapped view plus its update counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionText<'a> {
    text: &'a [u8],
    update: i32,
}

impl<'a> SessionText<'a> {
    pub fn new(text: &'a [u8], update: i32) -> Self {
        Self { text, update }
    }

    /// Update counter the text was published with.
    pub fn update(&self) -> i32 {
        self.update
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The whole text, replacing invalid UTF-8.
    pub fn to_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.text)
    }

    /// Raw value at `path`, borrowed from the text.
    pub fn query(&self, path: &str) -> Result<&'a [u8], QueryError> {
        query::query(self.text, path)
    }

    /// Value at `path` as text.
    pub fn value(&self, path: &str) -> Result<Cow<'a, str>, QueryError> {
        self.query(path).map(String::from_utf8_lossy)
    }

    /// Copy the value at `path` into `buf` with a trailing NUL.
    ///
    /// Returns the number of value bytes written; see [`query_into`].
    pub fn as_string(&self, path: &str, buf: &mut [u8]) -> Result<usize, QueryError> {
        query::query_into(self.text, path, buf)
    }

    /// Owned copy of a non-empty value at `path`.
    pub fn as_owned_string(&self, path: &str) -> Result<String, QueryError> {
        let value = self.query(path)?;
        if value.is_empty() {
            return Err(QueryError::EmptyValue { path: path.to_string() });
        }
        Ok(String::from_utf8_lossy(value).into_owned())
    }

    pub fn as_int(&self, path: &str) -> Result<i32, QueryError> {
        query::query_number(self.text, path, "integer")
    }

    pub fn as_float(&self, path: &str) -> Result<f32, QueryError> {
        query::query_number(self.text, path, "float")
    }

    pub fn as_double(&self, path: &str) -> Result<f64, QueryError> {
        query::query_number(self.text, path, "double")
    }

    /// Leading number and trailing unit of a value such as `"6.93 km"`.
    pub fn as_measure(&self, path: &str) -> Result<(f64, Cow<'a, str>), QueryError> {
        let value = self.query(path)?;
        let (number, unit) = query::parse_measure(value, path)?;
        Ok((number, String::from_utf8_lossy(unit)))
    }
}
