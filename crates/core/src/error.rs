/// Result alias that carries the custom [`PoseCoachError`] type.
pub type Result<T> = std::result::Result<T, PoseCoachError>;

/// Common error type for the core crate.
///
/// Frame processing never fails; these variants only surface while parsing
/// names, loading configuration, or decoding landmark streams.
#[derive(Debug, thiserror::Error)]
pub enum PoseCoachError {
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON in a configuration file or landmark stream.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown exercise `{0}`")]
    UnknownExercise(String),
    #[error("unknown persona `{0}`")]
    UnknownPersona(String),
    #[error("unknown yoga pose `{0}`")]
    UnknownPose(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PoseCoachError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
