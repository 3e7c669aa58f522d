use crate::services::order_session::SessionView;
use thiserror::Error;

/// Errors raised by an inference collaborator
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Server not reachable or detector never initialised
    #[error("inference unavailable: {0}")]
    Unavailable(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("inference server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("invalid inference response: {0}")]
    InvalidResponse(String),
}

impl DetectorError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<reqwest::Error> for DetectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            Self::Unavailable(e.to_string())
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    NoConfigDir,

    #[error("config io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

/// Failure reasons surfaced at the order session boundary.
///
/// Every variant carries the session view as it stood before the scan, so the
/// presentation layer can keep rendering the unchanged cart.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("detector unavailable")]
    Unavailable { view: SessionView },

    #[error("scan failed: {message}")]
    Failed { message: String, view: SessionView },
}

impl ScanError {
    pub fn view(&self) -> &SessionView {
        match self {
            Self::Unavailable { view } | Self::Failed { view, .. } => view,
        }
    }

    pub fn into_view(self) -> SessionView {
        match self {
            Self::Unavailable { view } | Self::Failed { view, .. } => view,
        }
    }
}
