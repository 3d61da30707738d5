//! Field path expressions for locating values inside a document.
//!
//! A path is a sequence of segments, each either a map key or a sequence
//! index. The textual form follows the usual Kubernetes field-path style:
//!
//! - `spec.parameters.region` — dotted keys
//! - `spec.containers[0].image` — sequence index
//! - `status.conditions[-1]` — negative index, counted from the end
//! - `metadata.labels['app.kubernetes.io/name']` — bracket-quoted key

use crate::fieldpath::errors::FieldPathError;
use std::fmt;
use std::str::FromStr;

/// A single segment in a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Map key access.
    Field(String),
    /// Sequence index access. Negative values count from the end.
    Index(i64),
}

impl Segment {
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => write!(f, "{name}"),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn new(segments: Vec<Segment>) -> Result<Self, FieldPathError> {
        if segments.is_empty() {
            return Err(FieldPathError::InvalidPath {
                input: String::new(),
                message: "empty field path".to_string(),
            });
        }
        Ok(Self { segments })
    }

    pub fn parse(input: &str) -> Result<Self, FieldPathError> {
        let segments = parse_segments(input)?;
        if segments.is_empty() {
            return Err(invalid(input, "empty field path"));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render the first `n` segments, used to attribute errors to the
    /// intermediate position where they occurred.
    pub(crate) fn prefix_string(&self, n: usize) -> String {
        render(&self.segments[..n.min(self.segments.len())])
    }
}

impl FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render(&self.segments))
    }
}

fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            Segment::Field(name) if needs_brackets(name) => {
                out.push_str("['");
                out.push_str(name);
                out.push_str("']");
            }
            Segment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            Segment::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    out
}

fn needs_brackets(name: &str) -> bool {
    name.is_empty() || name.contains(['.', '[', ']'])
}

fn invalid(input: &str, message: &str) -> FieldPathError {
    FieldPathError::InvalidPath {
        input: input.to_string(),
        message: message.to_string(),
    }
}

fn parse_segments(input: &str) -> Result<Vec<Segment>, FieldPathError> {
    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    // True right after a '.', where a field name must follow.
    let mut expect_field = true;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if expect_field {
                    return Err(invalid(input, "empty path segment"));
                }
                if !current.is_empty() {
                    segments.push(Segment::Field(std::mem::take(&mut current)));
                }
                expect_field = true;
                i += 1;
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Field(std::mem::take(&mut current)));
                } else if expect_field && !segments.is_empty() {
                    return Err(invalid(input, "empty path segment"));
                }
                let (segment, next) = parse_bracket(input, &chars, i + 1)?;
                segments.push(segment);
                i = next;
                expect_field = false;
                if i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    return Err(invalid(input, "expected '.' or '[' after ']'"));
                }
            }
            ']' => return Err(invalid(input, "unexpected ']'")),
            ch => {
                current.push(ch);
                expect_field = false;
                i += 1;
            }
        }
    }

    if expect_field && !input.is_empty() {
        return Err(invalid(input, "trailing '.'"));
    }
    if !current.is_empty() {
        segments.push(Segment::Field(current));
    }

    Ok(segments)
}

/// Parse the body of a bracket starting just after `[`. Returns the segment
/// and the position just after the closing `]`.
fn parse_bracket(
    input: &str,
    chars: &[char],
    start: usize,
) -> Result<(Segment, usize), FieldPathError> {
    let Some(&first) = chars.get(start) else {
        return Err(invalid(input, "unterminated '['"));
    };

    if first == '\'' || first == '"' {
        let mut key = String::new();
        let mut i = start + 1;
        loop {
            match chars.get(i) {
                None => return Err(invalid(input, "unterminated quoted key")),
                Some(&ch) if ch == first => break,
                Some(&ch) => key.push(ch),
            }
            i += 1;
        }
        if chars.get(i + 1) != Some(&']') {
            return Err(invalid(input, "expected ']' after quoted key"));
        }
        return Ok((Segment::Field(key), i + 2));
    }

    let mut body = String::new();
    let mut i = start;
    loop {
        match chars.get(i) {
            None => return Err(invalid(input, "unterminated '['")),
            Some(']') => break,
            Some(&ch) => body.push(ch),
        }
        i += 1;
    }

    let index = body
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid(input, &format!("invalid sequence index '{body}'")))?;
    Ok((Segment::Index(index), i + 1))
}
