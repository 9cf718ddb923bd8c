use log::debug;
use thiserror::Error;

use crate::domain::email::{ConvertedMessage, DecodedBody};
use crate::mail::decoders::{self, DecodeError};
use crate::mail::headers::RawMessage;
use crate::mail::media_type::MediaType;
use crate::mail::multipart::{WalkError, Walker};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("multipart message has no boundary parameter")]
    MissingBoundary,
    #[error("failed to parse parts")]
    Walk(#[from] WalkError),
    #[error("failed to decode body")]
    Decode(#[from] DecodeError),
}

impl ConvertError {
    /// True for a missing boundary at the top level or in any nested part.
    pub fn is_missing_boundary(&self) -> bool {
        matches!(
            self,
            ConvertError::MissingBoundary | ConvertError::Walk(WalkError::MissingBoundary)
        )
    }
}

/// Flattens a raw message into a subject and a single body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Converter {
    walker: Walker,
}

impl Converter {
    pub fn new(walker: Walker) -> Self {
        Self { walker }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self::new(Walker::new(max_depth))
    }

    /// Multipart messages always come out as HTML, whatever their leaves are;
    /// everything else is transfer-decoded and returned as text.
    pub fn convert(&self, message: RawMessage) -> Result<ConvertedMessage, ConvertError> {
        let subject = message.header("Subject").unwrap_or_default().to_string();

        // An unparsable Content-Type is the same as none at all.
        let media_type = message.header("Content-Type").and_then(MediaType::parse);

        let body = match media_type {
            Some(media_type) if media_type.is_multipart() => {
                let boundary = media_type
                    .boundary()
                    .ok_or(ConvertError::MissingBoundary)?;
                let texts = self.walker.walk(message.body(), boundary)?;
                debug!("joined {} leaf parts of {}", texts.len(), media_type.essence());
                DecodedBody::Html(texts.concat())
            }
            _ => {
                let encoding = message
                    .header("Content-Transfer-Encoding")
                    .unwrap_or_default();
                let decoded = decoders::decode(encoding, message.body())?;
                DecodedBody::Text(String::from_utf8_lossy(&decoded).into_owned())
            }
        };

        Ok(ConvertedMessage { subject, body })
    }
}
