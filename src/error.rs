//! Error taxonomy
//!
//! A single closed error enumeration shared by every service in the crate.
//! The transport layer maps variants onto HTTP status classes via
//! [`Error::status_class`].

use thiserror::Error;

/// All failures the core can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// A conversation or model does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request cannot be satisfied with the resources at hand
    /// (insufficient memory budget, invalid parameters).
    #[error("invalid resource: {0}")]
    InvalidResource(String),

    /// The underlying inference engine failed to load a model or to
    /// generate. Always a server fault; logged in full at the call site.
    #[error("engine failure: {0}")]
    EngineFailure(String),

    /// Durable-store I/O failed. Never retried automatically; surfaced
    /// so callers do not mistake a lost write for success.
    #[error("storage I/O failure: {0}")]
    TransientIo(#[from] std::io::Error),

    /// A persisted record could not be encoded or decoded.
    #[error("storage encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl Error {
    /// HTTP-equivalent status class for the boundary layer.
    pub fn status_class(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::InvalidResource(_) => 400,
            Error::EngineFailure(_) | Error::TransientIo(_) | Error::Encoding(_) => 500,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class_mapping() {
        assert_eq!(Error::NotFound("model x".into()).status_class(), 404);
        assert_eq!(Error::InvalidResource("too big".into()).status_class(), 400);
        assert_eq!(Error::EngineFailure("boom".into()).status_class(), 500);
        let io = Error::TransientIo(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.status_class(), 500);
    }

    #[test]
    fn test_display_includes_cause() {
        let err = Error::NotFound("conversation 42".into());
        assert_eq!(err.to_string(), "not found: conversation 42");
    }
}
