use serde::Serialize;

/// The single flattened body produced from an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodedBody {
    Text(String),
    Html(String),
}

impl DecodedBody {
    pub fn kind(&self) -> &'static str {
        match self {
            DecodedBody::Text(_) => "text",
            DecodedBody::Html(_) => "html",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DecodedBody::Text(s) | DecodedBody::Html(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedMessage {
    pub subject: String,
    pub body: DecodedBody,
}

/// What gets handed to the mail-sending API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardableMessage {
    pub subject: String,
    pub body: DecodedBody,
    pub source: String,
    pub reply_to: Vec<String>,
    pub destinations: Vec<String>,
}

/// Location of a raw message in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}
