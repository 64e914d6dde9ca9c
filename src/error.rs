use thiserror::Error;

use crate::expr::EvalError;

pub type ChartResult<T> = Result<T, ChartError>;

/// Everything that can go wrong between a request and a PNG.
///
/// The `Display` text is what ends up in the error image after the
/// `Chart Error: ` prefix, so keep it short and human readable.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Invalid request")]
    InvalidRequest,

    #[error("URI malformed\n{0}")]
    MalformedInput(String),

    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error("Failed to fetch chart\n{source}")]
    RemoteFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to retrieve data\n{0}")]
    InvalidChartSpec(String),

    #[error("Invalid chart options\n{0}")]
    Render(String),
}

impl ChartError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedInput(detail.into())
    }

    pub fn invalid_spec(detail: impl Into<String>) -> Self {
        Self::InvalidChartSpec(detail.into())
    }

    pub fn render(detail: impl Into<String>) -> Self {
        Self::Render(detail.into())
    }

    /// Stable short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::InvalidRequest => "invalid_request",
            ChartError::MalformedInput(_) => "malformed_input",
            ChartError::Evaluation(_) => "evaluation",
            ChartError::RemoteFetch { .. } => "remote_fetch",
            ChartError::InvalidChartSpec(_) => "invalid_chart_spec",
            ChartError::Render(_) => "render",
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Transport(String),

    #[error("response is not a chart: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_message_is_bare() {
        assert_eq!(ChartError::InvalidRequest.to_string(), "Invalid request");
    }

    #[test]
    fn remote_fetch_message_includes_cause() {
        let err = ChartError::RemoteFetch {
            url: "http://example.invalid".into(),
            source: FetchError::Timeout(10),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch chart\nrequest timed out after 10s"
        );
        assert_eq!(err.kind(), "remote_fetch");
    }
}
