//! Error types for Spoolsync

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("slicer not yet supported: {0}")]
    UnsupportedSlicer(String),

    #[error("suffix '{suffix}' is not in the configured suffix set")]
    UnknownSuffix { suffix: String },

    #[error("no usable template for suffix '{suffix}': {name} not found")]
    TemplateMissing { suffix: String, name: String },

    #[error("template error: {name} - {message}")]
    TemplateError { name: String, message: String },

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn unknown_suffix(suffix: impl Into<String>) -> Self {
        Self::UnknownSuffix {
            suffix: suffix.into(),
        }
    }

    pub fn template_missing(suffix: impl Into<String>, name: impl Into<String>) -> Self {
        Self::TemplateMissing {
            suffix: suffix.into(),
            name: name.into(),
        }
    }

    pub fn template_error(name: impl Into<String>, message: impl ToString) -> Self {
        Self::TemplateError {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Deployment and configuration errors that must stop the process.
    /// Everything else only spoils the event being handled.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSlicer(_)
                | Self::UnknownSuffix { .. }
                | Self::TemplateMissing { .. }
                | Self::ConfigError(_)
        )
    }
}
