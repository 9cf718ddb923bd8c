use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageParseError {
    #[error("malformed message headers")]
    Headers(#[from] mailparse::MailParseError),
    #[error("malformed header line {line:?}")]
    MalformedLine { line: String },
}

/// Header block of a message or MIME part.
///
/// Lookups are case-insensitive and return the first occurrence of a key.
/// Values are unfolded but otherwise raw: encoded-words are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    /// Parse a header block, returning it with the offset where the body starts.
    pub fn parse(raw: &[u8]) -> Result<(Self, usize), MessageParseError> {
        let (headers, body_offset) = mailparse::parse_headers(raw)?;
        check_field_lines(raw.get(..body_offset).unwrap_or(raw))?;
        let entries = headers
            .iter()
            .map(|h| (h.get_key().trim().to_string(), unfold(h.get_value_raw())))
            .collect();
        Ok((Self { entries }, body_offset))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every line of the header block must be `name: value` or a folded
/// continuation of the previous line. mailparse turns anything else into a
/// bogus header and swallows the body.
fn check_field_lines(block: &[u8]) -> Result<(), MessageParseError> {
    for (index, line) in block.split(|b| *b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        match line.first() {
            None => break,
            Some(b' ' | b'\t') if index > 0 => continue,
            Some(_) => {}
        }
        let valid = line
            .iter()
            .position(|b| *b == b':')
            .is_some_and(|colon| is_field_name(trim_end(&line[..colon])));
        if !valid {
            return Err(MessageParseError::MalformedLine {
                line: String::from_utf8_lossy(line).into_owned(),
            });
        }
    }
    Ok(())
}

fn is_field_name(name: &[u8]) -> bool {
    !name.is_empty() && name.iter().all(|b| matches!(b, 33..=57 | 59..=126))
}

fn trim_end(mut name: &[u8]) -> &[u8] {
    while let [rest @ .., b' ' | b'\t'] = name {
        name = rest;
    }
    name
}

fn unfold(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// An RFC 5322 message split into its headers and the still-undecoded body.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub headers: HeaderMap,
    body: Vec<u8>,
}

impl RawMessage {
    pub fn parse(raw: &[u8]) -> Result<Self, MessageParseError> {
        let (headers, body_offset) = HeaderMap::parse(raw)?;
        Ok(Self {
            headers,
            body: raw.get(body_offset..).unwrap_or_default().to_vec(),
        })
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
