use std::borrow::Cow;

use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine as _, alphabet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid base64 content")]
    Base64(#[from] base64::DecodeError),
    #[error("malformed quoted-printable escape at byte {offset}")]
    QuotedPrintable { offset: usize },
}

/// Standard alphabet with required padding; stray bits in the final symbol
/// are ignored.
const MIME_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Value of a `Content-Transfer-Encoding` header, as far as decoding cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary`, unset, and anything we don't recognize.
    Identity,
}

impl TransferEncoding {
    pub fn from_header(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("base64") {
            Self::Base64
        } else if value.eq_ignore_ascii_case("quoted-printable") {
            Self::QuotedPrintable
        } else {
            Self::Identity
        }
    }
}

/// Decode a part payload according to its transfer encoding.
///
/// Unknown or empty encodings pass the bytes through untouched and never fail.
pub fn decode<'a>(encoding: &str, raw: &'a [u8]) -> Result<Cow<'a, [u8]>, DecodeError> {
    match TransferEncoding::from_header(encoding) {
        TransferEncoding::Base64 => decode_base64(raw).map(Cow::Owned),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(raw).map(Cow::Owned),
        TransferEncoding::Identity => Ok(Cow::Borrowed(raw)),
    }
}

pub fn decode_base64(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    // MIME wraps base64 at 76 columns
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| *b != b'\r' && *b != b'\n')
        .collect();
    Ok(MIME_BASE64.decode(compact)?)
}

pub fn decode_quoted_printable(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut line_offset = 0;

    for line in raw.split_inclusive(|b| *b == b'\n') {
        let (content, eol) = split_line_ending(line);
        let content = trim_trailing_whitespace(content);

        match content.strip_suffix(b"=") {
            Some(content) => unescape(content, line_offset, &mut out)?,
            None => {
                unescape(content, line_offset, &mut out)?;
                out.extend_from_slice(eol);
            }
        }

        line_offset += line.len();
    }

    Ok(out)
}

fn unescape(content: &[u8], base: usize, out: &mut Vec<u8>) -> Result<(), DecodeError> {
    let mut i = 0;
    while i < content.len() {
        if content[i] != b'=' {
            out.push(content[i]);
            i += 1;
            continue;
        }
        let byte = content
            .get(i + 1..i + 3)
            .and_then(|hex| Some((hex_value(hex[0])? << 4) | hex_value(hex[1])?))
            .ok_or(DecodeError::QuotedPrintable { offset: base + i })?;
        out.push(byte);
        i += 3;
    }
    Ok(())
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

fn split_line_ending(line: &[u8]) -> (&[u8], &[u8]) {
    if let Some(content) = line.strip_suffix(b"\r\n") {
        (content, &line[content.len()..])
    } else if let Some(content) = line.strip_suffix(b"\n") {
        (content, &line[content.len()..])
    } else {
        (line, &line[line.len()..])
    }
}

fn trim_trailing_whitespace(mut content: &[u8]) -> &[u8] {
    while let [rest @ .., b' ' | b'\t' | b'\r'] = content {
        content = rest;
    }
    content
}
