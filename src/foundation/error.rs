/// Convenience result type used across batchrender.
pub type BatchResult<T> = Result<T, BatchError>;

/// Top-level error taxonomy.
///
/// `Validation` and `NotFound` are raised before any host interaction and abort the whole run.
/// `HostInteraction` and `Render` abort only the variation that raised them.
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    /// Malformed or missing plan fields.
    #[error("validation error: {0}")]
    Validation(String),

    /// A plan file or baseline scene file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A scene lookup or host call failed.
    #[error("host interaction error: {0}")]
    HostInteraction(String),

    /// Rendering or writing the output frame failed.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing plan or scene documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BatchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostInteraction(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Prefix the message with `ctx`, keeping the variant.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            Self::Validation(m) => Self::Validation(format!("{ctx}: {m}")),
            Self::NotFound(m) => Self::NotFound(format!("{ctx}: {m}")),
            Self::HostInteraction(m) => Self::HostInteraction(format!("{ctx}: {m}")),
            Self::Render(m) => Self::Render(format!("{ctx}: {m}")),
            Self::Serde(m) => Self::Serde(format!("{ctx}: {m}")),
            Self::Other(e) => Self::Other(e.context(ctx.to_string())),
        }
    }

    /// True for errors that abort a run before any variation executes.
    pub fn is_fatal_before_execution(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Serde(_)
        )
    }

    /// Process exit code: 1 for plan problems, 2 for execution problems.
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal_before_execution() {
            1
        } else {
            2
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
