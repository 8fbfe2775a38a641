use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unsupported file extension {extension:?}, expected one of jpeg, jpg, png")]
    UnsupportedFormat { extension: String },

    #[error("invalid image")]
    InvalidImage {
        #[source]
        source: BoxError,
    },

    #[error("model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("cannot load model")]
    ModelLoad {
        #[source]
        source: BoxError,
    },

    #[error("labels file not found: {}", path.display())]
    LabelsNotFound { path: PathBuf },

    #[error("{message}")]
    Labels { message: String },

    /// Forward pass failures and outputs that do not fit the labels. The
    /// reason is shown to users as is.
    #[error("{reason}")]
    Classification { reason: String },

    #[error("invalid options: {message}")]
    InvalidOptions { message: String },
}

impl Error {
    pub(crate) fn invalid_image(source: impl Into<BoxError>) -> Self {
        Self::InvalidImage {
            source: source.into(),
        }
    }

    pub(crate) fn model_load(source: impl Into<BoxError>) -> Self {
        Self::ModelLoad {
            source: source.into(),
        }
    }

    pub(crate) fn classification(reason: impl Into<String>) -> Self {
        Self::Classification {
            reason: reason.into(),
        }
    }

    pub(crate) fn labels(message: impl Into<String>) -> Self {
        Self::Labels {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }
}
