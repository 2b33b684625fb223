//! Error types for get.

use thiserror::Error;

use crate::adapter::AdapterError;

/// Message used when a parameter-less `All` query is called with arguments.
pub const OPTIONS_NOT_PERMITTED: &str = "Options not supported with 'All' queries";

/// Message used when an identifier carries more than one `By` token.
pub const MULTIPLE_BY: &str = "You have multiple instances of \"By\" in your identifier. \
     Please use the open-ended form, ie. UserBy with a condition map";

/// The main error type for get operations.
#[derive(Debug, Error)]
pub enum GetError {
    /// Generic domain failure, usually an expected adapter error.
    #[error("{0}")]
    Base(String),

    /// The active adapter does not implement a capability it was asked for.
    #[error("Method not implemented: {0}")]
    MethodNotImplemented(String),

    /// An ancestor walk could not traverse its relation chain.
    #[error("Invalid ancestry: {0}")]
    InvalidAncestry(String),

    /// No record satisfied a scalar lookup.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// The identifier failed grammar validation.
    #[error("Invalid identifier '{identifier}': {message}")]
    InvalidClassName { identifier: String, message: String },

    /// Runtime arguments were passed to a parameter-less query.
    #[error("{0}")]
    OptionsNotPermitted(String),

    /// Wrong runtime arguments for a compiled query.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Adapter failure outside the adapter's expected set. Not normalized.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless view of [`GetError`], for matching on the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Base,
    MethodNotImplemented,
    InvalidAncestry,
    RecordNotFound,
    InvalidClassName,
    OptionsNotPermitted,
    Arguments,
    Adapter,
    Config,
    Io,
}

impl GetError {
    /// Create a generic domain error.
    pub fn base(message: impl Into<String>) -> Self {
        Self::Base(message.into())
    }

    /// Create a grammar error for `identifier`.
    pub fn invalid_class_name(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidClassName {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    pub fn arguments(message: impl Into<String>) -> Self {
        Self::Arguments(message.into())
    }

    pub fn options_not_permitted() -> Self {
        Self::OptionsNotPermitted(OPTIONS_NOT_PERMITTED.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Base(_) => ErrorKind::Base,
            Self::MethodNotImplemented(_) => ErrorKind::MethodNotImplemented,
            Self::InvalidAncestry(_) => ErrorKind::InvalidAncestry,
            Self::RecordNotFound(_) => ErrorKind::RecordNotFound,
            Self::InvalidClassName { .. } => ErrorKind::InvalidClassName,
            Self::OptionsNotPermitted(_) => ErrorKind::OptionsNotPermitted,
            Self::Arguments(_) => ErrorKind::Arguments,
            Self::Adapter(_) => ErrorKind::Adapter,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the non-raising entry point turns this error into `None`.
    pub fn is_swallowed(&self) -> bool {
        matches!(self, Self::Base(_) | Self::RecordNotFound(_))
    }
}

/// Result type alias for get operations.
pub type GetResult<T> = Result<T, GetError>;
