use std::fmt;

/// Crate-wide result alias.
pub type LoomResult<T> = Result<T, LoomError>;

/// Coarse failure taxonomy surfaced to hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad configuration or input; fails before any resource is allocated.
    Validation,
    /// A capture or encode facility is unavailable in this environment.
    Capability,
    /// The encoder failed while producing output.
    Encode,
    /// Filesystem or pipe failure.
    Io,
    /// Anything else (bugs, unexpected states).
    Internal,
}

impl ErrorCategory {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Capability => "capability",
            Self::Encode => "encode",
            Self::Io => "io",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by timelines, renderers, and exports.
#[derive(thiserror::Error, Debug)]
pub enum LoomError {
    /// Bad input or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// A required facility (recorder, encoder) is unavailable.
    #[error("capability error ({format}): {message}")]
    Capability {
        /// Export format that needed the facility.
        format: &'static str,
        /// What is missing.
        message: String,
    },

    /// The encoder failed while producing output.
    #[error("encode error: {0}")]
    Encode(String),

    /// Malformed serialized state.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Filesystem or pipe failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An inner error annotated with the operation that failed.
    #[error("{op} failed [{context}]: {source}")]
    Context {
        /// Failing operation.
        op: &'static str,
        /// `key=value` metadata.
        context: String,
        /// Underlying error.
        #[source]
        source: Box<LoomError>,
    },

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LoomError {
    /// Build a [`LoomError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LoomError::Capability`] for `format`.
    pub fn capability(format: &'static str, msg: impl Into<String>) -> Self {
        Self::Capability {
            format,
            message: msg.into(),
        }
    }

    /// Build a [`LoomError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`LoomError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Wrap `self` with the failing operation and `key=value` metadata.
    pub fn in_op(self, op: &'static str, meta: &[(&str, String)]) -> Self {
        let context = meta
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        Self::Context {
            op,
            context,
            source: Box::new(self),
        }
    }

    /// Coarse category, looking through [`LoomError::Context`] wrappers.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::Serde(_) => ErrorCategory::Validation,
            Self::Capability { .. } => ErrorCategory::Capability,
            Self::Encode(_) => ErrorCategory::Encode,
            Self::Io(_) => ErrorCategory::Io,
            Self::Context { source, .. } => source.category(),
            Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the caller may reasonably retry the same request.
    ///
    /// Validation and capability failures repeat deterministically.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Encode | ErrorCategory::Io)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
