use std::collections::HashMap;

/// A parsed `Content-Type` value.
///
/// Parsing is deliberately lenient at the call sites: a malformed header yields
/// `None`, which callers treat exactly like a missing header (a leaf part /
/// non-multipart message) instead of reporting an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    params: HashMap<String, String>,
}

impl MediaType {
    pub fn parse(value: &str) -> Option<Self> {
        let (essence, mut rest) = match value.split_once(';') {
            Some((essence, rest)) => (essence, Some(rest)),
            None => (value, None),
        };
        let essence = essence.trim().to_ascii_lowercase();
        if !is_valid_essence(&essence) {
            return None;
        }

        let mut params = HashMap::new();
        while let Some(input) = rest {
            let input = input.trim_start();
            if input.is_empty() {
                break;
            }
            if let Some(next) = input.strip_prefix(';') {
                // stray or trailing separator
                rest = Some(next);
                continue;
            }
            let (name, value, next) = parse_param(input)?;
            if params.insert(name.to_ascii_lowercase(), value).is_some() {
                return None;
            }
            rest = next;
        }

        Some(Self { essence, params })
    }

    /// Lowercased `type/subtype`.
    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn is_multipart(&self) -> bool {
        self.essence.starts_with("multipart/")
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }
}

fn is_valid_essence(essence: &str) -> bool {
    match essence.split_once('/') {
        Some((ty, subtype)) => is_token(ty) && is_token(subtype),
        None => is_token(essence),
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b)
}

/// Parses `name=value` at the head of `input`, returning what follows the
/// next `;` if there is one.
fn parse_param(input: &str) -> Option<(&str, String, Option<&str>)> {
    let (name, after) = input.split_once('=')?;
    let name = name.trim_end();
    if !is_token(name) {
        return None;
    }
    let after = after.trim_start();

    let (value, tail) = if let Some(quoted) = after.strip_prefix('"') {
        parse_quoted(quoted)?
    } else {
        let end = after
            .bytes()
            .position(|b| !is_token_char(b))
            .unwrap_or(after.len());
        if end == 0 {
            return None;
        }
        (after[..end].to_string(), &after[end..])
    };

    let tail = tail.trim_start();
    if tail.is_empty() {
        Some((name, value, None))
    } else {
        tail.strip_prefix(';').map(|next| (name, value, Some(next)))
    }
}

fn parse_quoted(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, &input[i + 1..])),
            '\\' => value.push(chars.next()?.1),
            c => value.push(c),
        }
    }
    None
}
