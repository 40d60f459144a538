//! Error taxonomy shared by every component of the engine.

/// Errors surfaced by the learner engine.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    /// Bad input shape or range (score out of bounds, malformed date, unknown learner).
    #[error("validation error: {0}")]
    Validation(String),

    /// An external capability (embedding, translation, generation) failed or timed out.
    #[error("{capability} capability unavailable: {reason}")]
    CapabilityUnavailable {
        /// Which capability failed.
        capability: &'static str,
        /// Provider-side reason, never shown to a learner.
        reason: String,
    },

    /// A persisted invariant would be, or has been, violated.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    /// SQLite error.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Encoding or decoding of stored payloads failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem error while preparing the database location.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TutorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unavailable(capability: &'static str, reason: impl ToString) -> Self {
        Self::CapabilityUnavailable {
            capability,
            reason: reason.to_string(),
        }
    }

    /// True for failures the caller is expected to absorb with a fallback.
    pub fn is_capability_unavailable(&self) -> bool {
        matches!(self, Self::CapabilityUnavailable { .. })
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for TutorError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for TutorError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TutorError>;
