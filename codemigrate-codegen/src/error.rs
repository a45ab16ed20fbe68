use thiserror::Error;

/// Errors raised while rendering a driver program.
///
/// These indicate bad generator inputs rather than runtime conditions; the
/// migration never starts when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("invalid driver parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("migration source does not define entry point `{entry_point}`")]
    MissingEntryPoint { entry_point: String },
}

impl RenderError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        RenderError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
