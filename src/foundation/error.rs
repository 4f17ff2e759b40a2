/// Convenience result type used across the crate.
pub type RecapResult<T> = Result<T, RecapError>;

/// Top-level error taxonomy for replay scheduling, rendering and encoding.
#[derive(thiserror::Error, Debug)]
pub enum RecapError {
    /// Invalid configuration or input shape.
    #[error("validation error: {0}")]
    Validation(String),

    /// A replay carries no sample frames; nothing can be rendered for it.
    #[error("missing data: {0}")]
    MissingData(String),

    /// A single event record lacks a required field.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The rasterizer failed for one output frame.
    #[error("render error: {0}")]
    Render(String),

    /// The external encoder failed or could not be started.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RecapError {
    /// Build a [`RecapError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RecapError::MissingData`] value.
    pub fn missing_data(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    /// Build a [`RecapError::MalformedEvent`] value.
    pub fn malformed_event(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }

    /// Build a [`RecapError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`RecapError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`RecapError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether the failure is scoped to a single replay.
    ///
    /// Batch drivers record these and move on to the next replay.
    pub fn is_batch_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingData(_) | Self::MalformedEvent(_) | Self::Render(_) | Self::Encode(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
