//! Path queries over the session text
//!
//! The session text is indentation-significant `key: value` text with `-`
//! sequence items. A query path is a list of keys separated by `:`; a key may
//! carry an index clause, `Key:{literal}`, which selects the sequence entry
//! whose `Key` field equals `literal` and continues matching inside it.
//!
//! ```text
//! DriverInfo:
//!  DriverCarIdx: 1
//!  Drivers:
//!  - CarIdx: 0
//!    UserName: Ann
//!  - CarIdx: 1
//!    UserName: Bob
//!
//! DriverInfo:Drivers:CarIdx:{1}UserName   ->  Bob
//! ```
//!
//! The scan is a single pass over the text, one line at a time, and never
//! allocates: a match is a slice of the original text.
//!
//! Matching rules:
//! - the first segment matches the first line carrying that key;
//! - after a plain key matched at depth `d`, only lines at the first depth
//!   below `d` are candidates, and a line at depth `<= d` ends the search;
//! - after an index clause matched at depth `d`, the fields of that entry
//!   (depth `d`, not starting a new `-` item) are candidates, and a shallower
//!   line or the next `-` item at depth `d` ends the search.
//!
//! Depth counts the leading spaces and dashes of a line.

use thiserror::Error;

/// Failure of a path query or of converting its value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Path not found in session text: {path}")]
    NotFound { path: String },

    #[error("Path has an empty value: {path}")]
    EmptyValue { path: String },

    #[error("Value of {path} truncated: copied {written} of {needed} bytes")]
    Truncated { path: String, written: usize, needed: usize },

    #[error("Value of {path} is not a valid {expected}: {value:?}")]
    InvalidNumber { path: String, value: String, expected: &'static str },

    #[error("Malformed query path: {path:?}")]
    MalformedPath { path: String },
}

impl QueryError {
    fn not_found(path: &str) -> Self {
        QueryError::NotFound { path: path.to_string() }
    }

    fn malformed(path: &str) -> Self {
        QueryError::MalformedPath { path: path.to_string() }
    }
}

/// One path segment: a key, optionally with an index clause literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'p> {
    pub key: &'p [u8],
    pub literal: Option<&'p [u8]>,
}

/// Lazily splits a query path into segments.
#[derive(Debug, Clone)]
pub(crate) struct PathCursor<'p> {
    path: &'p str,
    rest: &'p [u8],
}

impl<'p> PathCursor<'p> {
    pub fn new(path: &'p str) -> Self {
        Self { path, rest: path.as_bytes() }
    }

    /// Check every segment of `path` without scanning any text.
    pub fn validate(path: &'p str) -> Result<(), QueryError> {
        let mut cursor = Self::new(path);
        if cursor.next_segment()?.is_none() {
            return Err(QueryError::malformed(path));
        }
        while cursor.next_segment()?.is_some() {}
        Ok(())
    }

    pub fn next_segment(&mut self) -> Result<Option<Segment<'p>>, QueryError> {
        if self.rest.is_empty() {
            return Ok(None);
        }

        let (key, after) = match self.rest.iter().position(|&b| b == b':') {
            Some(colon) => (&self.rest[..colon], &self.rest[colon + 1..]),
            None => (self.rest, &self.rest[self.rest.len()..]),
        };

        if key.is_empty() || key.iter().any(|&b| b == b'{' || b == b'}') {
            return Err(QueryError::malformed(self.path));
        }

        if after.first() == Some(&b'{') {
            let close = after
                .iter()
                .position(|&b| b == b'}')
                .ok_or_else(|| QueryError::malformed(self.path))?;
            let literal = &after[1..close];
            let rest = &after[close + 1..];
            self.rest = rest.strip_prefix(b":").unwrap_or(rest);
            return Ok(Some(Segment { key, literal: Some(literal) }));
        }

        self.rest = after;
        Ok(Some(Segment { key, literal: None }))
    }
}

/// A `key: value` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line<'a> {
    depth: usize,
    item: bool,
    key: &'a [u8],
    value: &'a [u8],
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn trim(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !is_blank(*first) {
            break;
        }
        bytes = rest;
    }
    trim_end(bytes)
}

fn trim_end(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., last] = bytes {
        if !is_blank(*last) {
            break;
        }
        bytes = rest;
    }
    bytes
}

/// Split a line into depth, key and value. Lines without a key are `None`.
fn parse_line(raw: &[u8]) -> Option<Line<'_>> {
    let depth = raw.iter().take_while(|&&b| b == b' ' || b == b'-').count();
    let item = raw[..depth].contains(&b'-');
    let body = &raw[depth..];
    let colon = body.iter().position(|&b| b == b':')?;
    let key = trim_end(&body[..colon]);
    if key.is_empty() {
        return None;
    }
    Some(Line { depth, item, key, value: trim(&body[colon + 1..]) })
}

/// Where candidates for the next segment may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Nothing matched yet
    Root,
    /// Children of a key matched at `parent`; `depth` is fixed by the first child
    Children { parent: usize, depth: Option<usize> },
    /// Fields of a sequence entry selected at `depth`
    Entry { depth: usize },
}

enum Candidate {
    Yes,
    Skip,
    End,
}

impl Scope {
    fn admit(&mut self, line: &Line<'_>) -> Candidate {
        match *self {
            Scope::Root => Candidate::Yes,
            Scope::Children { parent, depth } => {
                if line.depth <= parent {
                    return Candidate::End;
                }
                match depth {
                    None => {
                        *self = Scope::Children { parent, depth: Some(line.depth) };
                        Candidate::Yes
                    }
                    Some(child) if line.depth > child => Candidate::Skip,
                    Some(_) => Candidate::Yes,
                }
            }
            Scope::Entry { depth } => {
                if line.depth < depth || (line.depth == depth && line.item) {
                    Candidate::End
                } else if line.depth > depth {
                    Candidate::Skip
                } else {
                    Candidate::Yes
                }
            }
        }
    }
}

/// Resolve `path` against `text`, returning the value as a slice of `text`.
///
/// A path that ends on a key without an inline value resolves to an empty
/// slice.
pub fn query<'a>(text: &'a [u8], path: &str) -> Result<&'a [u8], QueryError> {
    PathCursor::validate(path)?;

    let mut cursor = PathCursor::new(path);
    let Some(mut segment) = cursor.next_segment()? else {
        return Err(QueryError::malformed(path));
    };
    let mut scope = Scope::Root;

    for raw in text.split(|&b| b == b'\n') {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let Some(line) = parse_line(raw) else {
            continue;
        };

        match scope.admit(&line) {
            Candidate::End => return Err(QueryError::not_found(path)),
            Candidate::Skip => continue,
            Candidate::Yes => {}
        }

        if line.key != segment.key {
            continue;
        }
        if let Some(literal) = segment.literal {
            if line.value != literal {
                continue;
            }
        }

        match cursor.next_segment()? {
            None => return Ok(line.value),
            Some(next) => {
                scope = if segment.literal.is_some() {
                    Scope::Entry { depth: line.depth }
                } else {
                    Scope::Children { parent: line.depth, depth: None }
                };
                segment = next;
            }
        }
    }

    Err(QueryError::not_found(path))
}

/// Resolve `path` and copy the value into `buf` followed by a NUL.
///
/// Returns the number of value bytes written. A value that does not fit is
/// still copied as far as it goes and reported as [`QueryError::Truncated`].
pub fn query_into(text: &[u8], path: &str, buf: &mut [u8]) -> Result<usize, QueryError> {
    let value = query(text, path)?;
    if value.is_empty() {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        return Err(QueryError::EmptyValue { path: path.to_string() });
    }

    let Some(capacity) = buf.len().checked_sub(1) else {
        return Err(QueryError::Truncated { path: path.to_string(), written: 0, needed: value.len() + 1 });
    };
    let written = value.len().min(capacity);
    buf[..written].copy_from_slice(&value[..written]);
    buf[written] = 0;

    if written < value.len() {
        return Err(QueryError::Truncated { path: path.to_string(), written, needed: value.len() + 1 });
    }
    Ok(written)
}

/// Resolve `path` and parse its value as a number.
pub(crate) fn query_number<T: std::str::FromStr>(
    text: &[u8],
    path: &str,
    expected: &'static str,
) -> Result<T, QueryError> {
    let value = query(text, path)?;
    parse_number(value, path, expected)
}

pub(crate) fn parse_number<T: std::str::FromStr>(
    value: &[u8],
    path: &str,
    expected: &'static str,
) -> Result<T, QueryError> {
    if value.is_empty() {
        return Err(QueryError::EmptyValue { path: path.to_string() });
    }
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok()).ok_or_else(|| {
        QueryError::InvalidNumber {
            path: path.to_string(),
            value: String::from_utf8_lossy(value).into_owned(),
            expected,
        }
    })
}

/// Split a value such as `"5.89 km"` into its leading number and the unit.
pub(crate) fn parse_measure<'a>(value: &'a [u8], path: &str) -> Result<(f64, &'a [u8]), QueryError> {
    if value.is_empty() {
        return Err(QueryError::EmptyValue { path: path.to_string() });
    }
    let end = value
        .iter()
        .position(|&b| !(b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E')))
        .unwrap_or(value.len());
    let number = parse_number(&value[..end], path, "number")?;
    Ok((number, trim(&value[end..])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DRIVERS: &str = "Drivers:\n  - CarIdx: 3\n    UserName: Bob\n  - CarIdx: 5\n    UserName: Ann\n";

    const SESSION: &str = concat!(
        "---\n",
        "WeekendInfo:\n",
        " TrackName: spa up\n",
        " TrackLength: 6.93 km\n",
        " TrackID: 163\n",
        " WeekendOptions:\n",
        "  NumStarters: 20\n",
        "DriverInfo:\n",
        " DriverCarIdx: 1\n",
        " Drivers:\n",
        " - CarIdx: 0\n",
        "   UserName: Pace Car\n",
        "   CarScreenName: safety pcporsche911cup\n",
        " - CarIdx: 1\n",
        "   UserName: Ann Example\n",
        "   CarScreenName: Porsche 911 GT3 Cup (992)\n",
        "   CarPath: porsche992cup\n",
        "\n",
        "...\n",
    );

    fn q<'a>(text: &'a str, path: &str) -> Result<&'a str, QueryError> {
        query(text.as_bytes(), path).map(|v| std::str::from_utf8(v).unwrap())
    }

    #[test]
    fn nested_key_resolves() {
        assert_eq!(q("A:\n  B: 7\n", "A:B"), Ok("7"));
        assert_eq!(q("A:\n  B: 7\n", "A:B:"), Ok("7"));
    }

    #[test]
    fn index_clause_selects_entry() {
        assert_eq!(q(DRIVERS, "Drivers:CarIdx:{5}UserName"), Ok("Ann"));
        assert_eq!(q(DRIVERS, "Drivers:CarIdx:{3}UserName"), Ok("Bob"));
        assert_eq!(q(DRIVERS, "Drivers:CarIdx:{5}:UserName"), Ok("Ann"));
        assert!(matches!(q(DRIVERS, "Drivers:CarIdx:{7}UserName"), Err(QueryError::NotFound { .. })));
    }

    #[test]
    fn depth_violation_is_not_found() {
        let text = "A:\n  B: 1\n  C: 2\n";
        assert!(matches!(q(text, "A:B:C"), Err(QueryError::NotFound { .. })));

        let text = "A:\n  B:\n    D: 3\n  C: 2\n";
        assert!(matches!(q(text, "A:B:C"), Err(QueryError::NotFound { .. })));
    }

    #[test]
    fn entry_fields_do_not_leak_into_next_entry() {
        let text = "Drivers:\n  - CarIdx: 3\n    UserName: Bob\n  - CarIdx: 5\n    CarName: x\n";
        assert!(matches!(q(text, "Drivers:CarIdx:{5}UserName"), Err(QueryError::NotFound { .. })));

        let text = "Drivers:\n  - CarIdx: 3\n  - UserName: Bob\n";
        assert!(matches!(q(text, "Drivers:CarIdx:{3}UserName"), Err(QueryError::NotFound { .. })));
    }

    #[test]
    fn keys_match_whole_tokens() {
        let text = "TrackNameShort: spa\nTrackName: spa up\n";
        assert_eq!(q(text, "TrackName"), Ok("spa up"));
        assert!(matches!(q(text, "Track"), Err(QueryError::NotFound { .. })));
    }

    #[test]
    fn grandchildren_are_not_children() {
        let text = "A:\n  B:\n    C: deep\n  C: shallow\n";
        assert_eq!(q(text, "A:C"), Ok("shallow"));
    }

    #[test]
    fn session_like_text() {
        assert_eq!(q(SESSION, "WeekendInfo:TrackName"), Ok("spa up"));
        assert_eq!(q(SESSION, "WeekendInfo:WeekendOptions:NumStarters"), Ok("20"));
        assert_eq!(q(SESSION, "DriverInfo:Drivers:CarIdx:{1}UserName"), Ok("Ann Example"));
        assert_eq!(q(SESSION, "DriverInfo:Drivers:CarIdx:{1}CarPath"), Ok("porsche992cup"));
        assert!(matches!(
            q(SESSION, "DriverInfo:Drivers:CarIdx:{0}CarPath"),
            Err(QueryError::NotFound { .. })
        ));
        assert_eq!(q(SESSION, "WeekendInfo"), Ok(""));
    }

    #[test]
    fn crlf_and_missing_final_newline() {
        assert_eq!(q("A:\r\n  B: 7  \r\n", "A:B"), Ok("7"));
        assert_eq!(q("A:\n  B: 7", "A:B"), Ok("7"));
    }

    #[test]
    fn values_keep_inner_colons() {
        assert_eq!(q("Time: 12:30:00\n", "Time"), Ok("12:30:00"));
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for path in ["", ":", "A::B", "A:{5", "A:{5}B{"] {
            assert!(
                matches!(query(b"A: 1\n", path), Err(QueryError::MalformedPath { .. })),
                "path {:?}",
                path
            );
        }
    }

    #[test]
    fn copy_into_buffer() {
        let mut buf = [0xffu8; 8];
        assert_eq!(query_into(DRIVERS.as_bytes(), "Drivers:CarIdx:{5}UserName", &mut buf), Ok(3));
        assert_eq!(&buf[..4], b"Ann\0");

        let mut small = [0xffu8; 3];
        assert_eq!(
            query_into(DRIVERS.as_bytes(), "Drivers:CarIdx:{5}UserName", &mut small),
            Err(QueryError::Truncated {
                path: "Drivers:CarIdx:{5}UserName".into(),
                written: 2,
                needed: 4
            })
        );
        assert_eq!(&small, b"An\0");

        let mut empty: [u8; 0] = [];
        assert!(matches!(
            query_into(DRIVERS.as_bytes(), "Drivers:CarIdx:{5}UserName", &mut empty),
            Err(QueryError::Truncated { written: 0, .. })
        ));

        assert!(matches!(
            query_into(b"A:\n  B: 1\n", "A", &mut buf),
            Err(QueryError::EmptyValue { .. })
        ));
    }

    #[test]
    fn numbers_parse_strictly() {
        let text = b"A:\n  B: 7\n  C: 6.93 km\n  D: -0.25\n";
        assert_eq!(query_number::<i32>(text, "A:B", "integer"), Ok(7));
        assert_eq!(query_number::<f64>(text, "A:D", "double"), Ok(-0.25));
        assert!(matches!(
            query_number::<i32>(text, "A:C", "integer"),
            Err(QueryError::InvalidNumber { expected: "integer", .. })
        ));
        assert_eq!(parse_measure(b"6.93 km", "A:C"), Ok((6.93, &b"km"[..])));
        assert_eq!(parse_measure(b"20", "x"), Ok((20.0, &b""[..])));
        assert!(parse_measure(b"km", "x").is_err());
    }

    #[test]
    fn agrees_with_yaml_parser_on_plain_documents() {
        let doc = "WeekendInfo:\n  TrackName: spa\n  TrackID: 163\n  Options:\n    NumStarters: 20\nSessionInfo:\n  Laps: 12\n";
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(doc).unwrap();

        let expect = |path: &[&str]| {
            let mut node = &value;
            for key in path {
                node = &node[*key];
            }
            match node {
                serde_yaml_ng::Value::String(s) => s.clone(),
                serde_yaml_ng::Value::Number(n) => n.to_string(),
                other => panic!("unexpected {:?}", other),
            }
        };

        for path in [
            &["WeekendInfo", "TrackName"][..],
            &["WeekendInfo", "TrackID"][..],
            &["WeekendInfo", "Options", "NumStarters"][..],
            &["SessionInfo", "Laps"][..],
        ] {
            assert_eq!(q(doc, &path.join(":")).unwrap(), expect(path));
        }
    }

    proptest! {
        #[test]
        fn arbitrary_text_never_panics(text in prop::collection::vec(any::<u8>(), 0..512), path in "[A-Za-z:{}0-9]{0,24}") {
            let _ = query(&text, &path);
        }

        #[test]
        fn match_is_a_slice_of_the_input(key in "[A-Z][a-z]{1,8}", value in "[a-z0-9]{1,12}") {
            let text = format!("Root:\n  other: x\n  {}: {}\n", key, value);
            let path = format!("Root:{}", key);
            let found = query(text.as_bytes(), &path).unwrap();
            prop_assert_eq!(found, value.as_bytes());
            let start = found.as_ptr() as usize - text.as_ptr() as usize;
            prop_assert!(start + found.len() <= text.len());
        }
    }
}
