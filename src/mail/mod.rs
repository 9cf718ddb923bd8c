pub mod convert;
pub mod decoders;
pub mod headers;
pub mod media_type;
pub mod multipart;

pub use convert::{ConvertError, Converter};
pub use headers::{HeaderMap, MessageParseError, RawMessage};
pub use multipart::{DEFAULT_MAX_DEPTH, Walker};
