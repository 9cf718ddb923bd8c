use log::debug;
use thiserror::Error;

use crate::mail::decoders::{self, DecodeError};
use crate::mail::headers::{HeaderMap, MessageParseError};
use crate::mail::media_type::MediaType;

/// Multipart nesting allowed before a walk gives up.
pub const DEFAULT_MAX_DEPTH: usize = 20;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("multipart part has no boundary parameter")]
    MissingBoundary,
    #[error("multipart nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },
    #[error("multipart body ended before closing boundary {boundary:?}")]
    Unterminated { boundary: String },
    #[error("malformed part headers")]
    PartHeaders(#[from] MessageParseError),
    #[error("failed to decode part")]
    Decode(#[from] DecodeError),
}

/// A node of the multipart tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub headers: HeaderMap,
    pub body: PartBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    /// Still transfer-encoded content; `encoding` is empty when unset.
    Leaf { encoding: String, content: Vec<u8> },
    Multipart { boundary: String, parts: Vec<Part> },
}

impl Part {
    pub fn leaf_count(&self) -> usize {
        match &self.body {
            PartBody::Leaf { .. } => 1,
            PartBody::Multipart { parts, .. } => parts.iter().map(Part::leaf_count).sum(),
        }
    }
}

/// Recursive descent over multipart bodies with a hard nesting limit.
#[derive(Debug, Clone, Copy)]
pub struct Walker {
    max_depth: usize,
}

impl Default for Walker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Walker {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Decoded leaf texts of `body`, depth-first and left-to-right.
    ///
    /// Any failure aborts the whole walk; no partial result is returned.
    pub fn walk(&self, body: &[u8], boundary: &str) -> Result<Vec<String>, WalkError> {
        let parts = self.parse(body, boundary)?;
        let mut texts = Vec::with_capacity(parts.iter().map(Part::leaf_count).sum());
        for part in &parts {
            collect_leaves(part, &mut texts)?;
        }
        Ok(texts)
    }

    /// Builds the part tree of a multipart body without decoding any leaf.
    pub fn parse(&self, body: &[u8], boundary: &str) -> Result<Vec<Part>, WalkError> {
        self.parse_at(body, boundary, 1)
    }

    fn parse_at(&self, body: &[u8], boundary: &str, depth: usize) -> Result<Vec<Part>, WalkError> {
        if depth > self.max_depth {
            return Err(WalkError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        split_parts(body, boundary)?
            .into_iter()
            .map(|raw| self.parse_part(raw, depth))
            .collect()
    }

    fn parse_part(&self, raw: &[u8], depth: usize) -> Result<Part, WalkError> {
        let (headers, body_offset) = HeaderMap::parse(raw)?;
        let content = raw.get(body_offset..).unwrap_or_default();

        let body = match headers.get("Content-Type").and_then(MediaType::parse) {
            Some(media_type) if media_type.is_multipart() => {
                let boundary = media_type
                    .boundary()
                    .ok_or(WalkError::MissingBoundary)?
                    .to_string();
                debug!("descending into {} at depth {}", media_type.essence(), depth + 1);
                let parts = self.parse_at(content, &boundary, depth + 1)?;
                PartBody::Multipart { boundary, parts }
            }
            _ => PartBody::Leaf {
                encoding: headers
                    .get("Content-Transfer-Encoding")
                    .unwrap_or_default()
                    .to_string(),
                content: content.to_vec(),
            },
        };

        Ok(Part { headers, body })
    }
}

fn collect_leaves(part: &Part, texts: &mut Vec<String>) -> Result<(), WalkError> {
    match &part.body {
        PartBody::Leaf { encoding, content } => {
            let decoded = decoders::decode(encoding, content)?;
            texts.push(String::from_utf8_lossy(&decoded).into_owned());
        }
        PartBody::Multipart { parts, .. } => {
            for child in parts {
                collect_leaves(child, texts)?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Open,
    Close,
}

impl Delimiter {
    /// Classifies a line (including its line break) as a boundary delimiter.
    fn classify(line: &[u8], dash_boundary: &[u8]) -> Option<Self> {
        let rest = line.strip_prefix(dash_boundary)?;
        let (rest, kind) = match rest.strip_prefix(b"--") {
            Some(rest) => (rest, Self::Close),
            None => (rest, Self::Open),
        };
        rest.iter()
            .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .then_some(kind)
    }
}

/// Splits a multipart body into the raw bytes of each part (headers included).
///
/// The preamble and epilogue are dropped, and the line break before each
/// delimiter belongs to the delimiter, not to the preceding part.
fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>, WalkError> {
    let dash_boundary = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut part_start = None;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|b| *b == b'\n')
            .map_or(body.len(), |i| pos + i + 1);

        if let Some(delimiter) = Delimiter::classify(&body[pos..line_end], dash_boundary.as_bytes())
        {
            if let Some(start) = part_start.take() {
                parts.push(&body[start..content_end(body, start, pos)]);
            }
            match delimiter {
                Delimiter::Open => part_start = Some(line_end),
                Delimiter::Close => return Ok(parts),
            }
        }

        pos = line_end;
    }

    Err(WalkError::Unterminated {
        boundary: boundary.to_string(),
    })
}

fn content_end(body: &[u8], start: usize, delimiter_start: usize) -> usize {
    let mut end = delimiter_start;
    if end > start && body[end - 1] == b'\n' {
        end -= 1;
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}
